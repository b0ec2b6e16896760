use super::{MassInfo, Ray, ShapeHull, ShapeTrait};
use crate::{bounds::Bounds, error::PhysicsError, math::Pose};
use glam::{Mat3, Vec3};

// vertex `i` has +x when bit 0 is set, +y for bit 1 and +z for bit 2
const BOX_FACES: [[usize; 4]; 6] = [
    [0, 4, 6, 2],
    [1, 3, 7, 5],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 2, 3, 1],
    [4, 5, 7, 6],
];

/// An oriented box, a hull with its axes and half extents kept alongside.
#[derive(Clone, Debug)]
pub struct ShapeBox {
    hull: ShapeHull,
    local_center: Vec3,
    local_axes: [Vec3; 3],
    pub half_size: Vec3,
    pub center: Vec3,
    /// Unit axes in world space.
    pub axes: [Vec3; 3],
    /// Half extent vectors in world space, `axes[i] * half_size[i]`.
    pub extents: [Vec3; 3],
}

impl ShapeBox {
    /// Axis aligned box centered on the origin.
    pub fn new(half_size: Vec3) -> Result<Self, PhysicsError> {
        Self::oriented(
            Vec3::ZERO,
            Vec3::X * half_size.x,
            Vec3::Y * half_size.y,
            Vec3::Z * half_size.z,
        )
    }

    /// Axis aligned box spanning `corner` to `corner + size`.
    pub fn from_corner(corner: Vec3, size: Vec3) -> Result<Self, PhysicsError> {
        let half = size * 0.5;
        Self::oriented(
            corner + half,
            Vec3::X * half.x,
            Vec3::Y * half.y,
            Vec3::Z * half.z,
        )
    }

    /// Box from a center and three orthogonal half extent vectors.
    pub fn oriented(center: Vec3, dx: Vec3, dy: Vec3, dz: Vec3) -> Result<Self, PhysicsError> {
        let (dy, dz) = if dx.cross(dy).dot(dz) < 0.0 {
            (dz, dy)
        } else {
            (dy, dz)
        };
        let half_size = Vec3::new(dx.length(), dy.length(), dz.length());
        if !half_size.is_finite() || half_size.min_element() <= 0.0 {
            return Err(PhysicsError::InvalidHull(format!(
                "box half extents must be positive, got {}",
                half_size
            )));
        }
        let extents = [dx, dy, dz];
        let axes = [dx / half_size.x, dy / half_size.y, dz / half_size.z];

        let vertices = (0..8)
            .map(|i| {
                let sign = |bit: usize| if i & bit != 0 { 1.0 } else { -1.0 };
                center + dx * sign(1) + dy * sign(2) + dz * sign(4)
            })
            .collect();
        let faces = BOX_FACES.iter().map(|f| f.to_vec()).collect();
        let hull = ShapeHull::new(vertices, faces)?;

        Ok(Self {
            hull,
            local_center: center,
            local_axes: axes,
            half_size,
            center,
            axes,
            extents,
        })
    }

    pub fn hull(&self) -> &ShapeHull {
        &self.hull
    }

    /// Half width of the box projected on `axis`.
    pub fn extents_along(&self, axis: Vec3) -> f32 {
        self.extents.iter().map(|e| axis.dot(*e).abs()).sum()
    }

    pub fn support_index(&self, dir: Vec3) -> usize {
        let mut i = 0;
        if dir.dot(self.extents[0]) > 0.0 {
            i += 1;
        }
        if dir.dot(self.extents[1]) > 0.0 {
            i += 2;
        }
        if dir.dot(self.extents[2]) > 0.0 {
            i += 4;
        }
        i
    }

    pub fn support(&self, dir: Vec3) -> Vec3 {
        self.hull.vertices[self.support_index(dir)]
    }

    /// World to box local coordinates, with the box center at the origin.
    pub fn to_local(&self, pt: Vec3) -> Vec3 {
        let rel = pt - self.center;
        Vec3::new(
            rel.dot(self.axes[0]),
            rel.dot(self.axes[1]),
            rel.dot(self.axes[2]),
        )
    }
}

impl ShapeTrait for ShapeBox {
    fn update(&mut self, pose: &Pose) {
        self.hull.update_pose(pose);
        self.center = pose.transform(self.local_center);
        for i in 0..3 {
            self.axes[i] = pose.rotate(self.local_axes[i]);
            self.extents[i] = self.axes[i] * self.half_size[i];
        }
    }

    fn bounds(&self) -> Bounds {
        let e = Vec3::new(
            self.extents_along(Vec3::X),
            self.extents_along(Vec3::Y),
            self.extents_along(Vec3::Z),
        );
        Bounds::from_min_max(self.center - e, self.center + e)
    }

    fn mass_info(&self, density: f32) -> MassInfo {
        let Vec3 { x, y, z } = self.half_size;
        let mass = 8.0 * x * y * z * density;
        let diagonal = Mat3::from_diagonal(Vec3::new(
            mass * (y * y + z * z) / 3.0,
            mass * (x * x + z * z) / 3.0,
            mass * (x * x + y * y) / 3.0,
        ));
        let orient = Mat3::from_cols(self.local_axes[0], self.local_axes[1], self.local_axes[2]);
        MassInfo {
            mass,
            center: self.local_center,
            inertia: orient * diagonal * orient.transpose(),
        }
    }

    fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.hull.ray_cast(ray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_box_faces_point_outwards() {
        let cube = ShapeBox::new(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let expected = [-Vec3::X, Vec3::X, -Vec3::Y, Vec3::Y, -Vec3::Z, Vec3::Z];
        for (face, n) in cube.hull().faces.iter().zip(expected.iter()) {
            assert!(face.normal.abs_diff_eq(*n, 1e-6));
        }
        assert_eq!(cube.hull().edges.len(), 12);
    }

    #[test]
    fn test_box_matches_hull_mass() {
        let cube = ShapeBox::from_corner(Vec3::ZERO, Vec3::new(1.0, 2.0, 4.0)).unwrap();
        let boxed = cube.mass_info(1.5);
        let polyhedron = cube.hull().polyhedron_mass(1.5);
        assert!((boxed.mass - 12.0).abs() < 1e-4);
        assert!((boxed.mass - polyhedron.mass).abs() < 1e-3);
        assert!(boxed.center.abs_diff_eq(Vec3::new(0.5, 1.0, 2.0), 1e-5));
        assert!(boxed.center.abs_diff_eq(polyhedron.center, 1e-4));
        assert!(boxed.inertia.abs_diff_eq(polyhedron.inertia, 1e-2));
    }

    #[test]
    fn test_box_support_and_extents() {
        let mut cube = ShapeBox::new(Vec3::splat(0.5)).unwrap();
        let pose = Pose::new(Vec3::new(0.0, 0.0, 2.0), Quat::from_rotation_z(0.25 * std::f32::consts::PI));
        cube.update(&pose);
        let along_x = cube.extents_along(Vec3::X);
        assert!((along_x - 0.5 * 2f32.sqrt()).abs() < 1e-5);
        let support = cube.support(Vec3::new(1.0, 0.1, 1.0));
        assert!((support.z - 2.5).abs() < 1e-5);
        assert!((support.x - along_x).abs() < 1e-5);
        assert!(cube.to_local(cube.center).abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn test_left_handed_axes_are_fixed() {
        let cube = ShapeBox::oriented(Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::Y).unwrap();
        assert!(cube.axes[0].cross(cube.axes[1]).abs_diff_eq(cube.axes[2], 1e-6));
        assert!(ShapeBox::new(Vec3::new(1.0, 0.0, 1.0)).is_err());
    }
}
