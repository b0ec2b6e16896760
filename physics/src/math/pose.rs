use glam::{Mat3, Quat, Vec3};

/// Rigid transform, rotation followed by translation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pose {
    pub p: Vec3,
    pub q: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        p: Vec3::ZERO,
        q: Quat::IDENTITY,
    };

    pub fn new(p: Vec3, q: Quat) -> Self {
        Self { p, q }
    }

    pub fn from_translation(p: Vec3) -> Self {
        Self {
            p,
            q: Quat::IDENTITY,
        }
    }

    #[inline]
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        self.q * v
    }

    #[inline]
    pub fn inv_rotate(&self, v: Vec3) -> Vec3 {
        self.q.conjugate() * v
    }

    #[inline]
    pub fn transform(&self, v: Vec3) -> Vec3 {
        self.q * v + self.p
    }

    #[inline]
    pub fn inv_transform(&self, v: Vec3) -> Vec3 {
        self.inv_rotate(v - self.p)
    }

    pub fn transform_pose(&self, pose: &Pose) -> Pose {
        Pose {
            p: self.transform(pose.p),
            q: self.q * pose.q,
        }
    }

    pub fn rotation_matrix(&self) -> Mat3 {
        Mat3::from_quat(self.q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_transform() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_x(0.7));
        let v = Vec3::new(-0.5, 0.25, 4.0);
        assert!(pose.inv_transform(pose.transform(v)).abs_diff_eq(v, 1e-5));
        let outer = Pose::new(Vec3::X, Quat::from_rotation_z(0.3));
        let combined = outer.transform_pose(&pose);
        assert!(combined
            .transform(v)
            .abs_diff_eq(outer.transform(pose.transform(v)), 1e-5));
    }
}
