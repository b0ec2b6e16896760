use glam::{Mat3, Mat4, Quat, Vec3};

pub trait Mat4Ext {
    fn minor(&self, i: usize, j: usize) -> Mat3;
    fn cofactor(&self, i: usize, j: usize) -> f32;
}

impl Mat4Ext for Mat4 {
    fn minor(&self, i: usize, j: usize) -> Mat3 {
        let mut minor = Mat3::ZERO;
        let mut yy = 0;
        for y in 0..4 {
            if y == j {
                continue;
            }

            let mut xx = 0;
            for x in 0..4 {
                if x == i {
                    continue;
                }

                minor.col_mut(xx)[yy] = self.col(x)[y];
                xx += 1;
            }

            yy += 1;
        }
        minor
    }

    fn cofactor(&self, i: usize, j: usize) -> f32 {
        let minor = self.minor(i, j);
        i32::pow(-1, (i + 1 + j + 1) as u32) as f32 * minor.determinant()
    }
}

pub trait Mat3Ext {
    /// Cross product matrix, `skew(a) * b == a.cross(b)`.
    fn skew(v: Vec3) -> Mat3;
    /// Outer product `a * b^T`.
    fn outer(a: Vec3, b: Vec3) -> Mat3;
}

impl Mat3Ext for Mat3 {
    fn skew(v: Vec3) -> Mat3 {
        Mat3::from_cols(
            Vec3::new(0.0, v.z, -v.y),
            Vec3::new(-v.z, 0.0, v.x),
            Vec3::new(v.y, -v.x, 0.0),
        )
    }

    fn outer(a: Vec3, b: Vec3) -> Mat3 {
        Mat3::from_cols(a * b.x, a * b.y, a * b.z)
    }
}

pub trait Vec3Ext {
    /// Two unit vectors that form a right handed orthonormal basis with `self`.
    /// `self` must be normalized.
    fn make_basis(self) -> (Vec3, Vec3);
    /// Normalizes, or returns `fallback` when the length is below `min_length`.
    fn normalize_or(self, min_length: f32, fallback: Vec3) -> Vec3;
}

impl Vec3Ext for Vec3 {
    fn make_basis(self) -> (Vec3, Vec3) {
        let x = self;
        if x.x.abs() > x.y.abs() {
            let s = (x.x * x.x + x.z * x.z).sqrt().recip();
            let z = Vec3::new(-x.z * s, 0.0, x.x * s);
            let y = Vec3::new(-x.y * z.z, x.x * z.z - x.z * z.x, x.y * z.x);
            (y, z)
        } else {
            let s = (x.y * x.y + x.z * x.z).sqrt().recip();
            let z = Vec3::new(0.0, x.z * s, -x.y * s);
            let y = Vec3::new(x.z * z.y - x.y * z.z, x.x * z.z, -x.x * z.y);
            (y, z)
        }
    }

    fn normalize_or(self, min_length: f32, fallback: Vec3) -> Vec3 {
        let length = self.length();
        if length > min_length {
            self / length
        } else {
            fallback
        }
    }
}

pub trait QuatExt {
    /// First order integration of an angular velocity, `q += 0.5 * dt * (w, 0) * q`.
    fn integrate(self, angular: Vec3, dt: f32) -> Quat;
}

impl QuatExt for Quat {
    fn integrate(self, angular: Vec3, dt: f32) -> Quat {
        // (h, 0) * q is not a rotation, so the product is expanded here
        let h = angular * (0.5 * dt);
        let v = Vec3::new(self.x, self.y, self.z);
        let dv = h * self.w + h.cross(v);
        let dw = -h.dot(v);
        Quat::from_xyzw(
            self.x + dv.x,
            self.y + dv.y,
            self.z + dv.z,
            self.w + dw,
        )
        .normalize()
    }
}
