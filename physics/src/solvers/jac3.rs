use crate::{body::Body, math::glam_ext::Mat3Ext};
use glam::{Mat3, Vec3};

/// Three rows keeping two anchor points together, solved with a vector impulse.
#[derive(Clone, Debug, Default)]
pub struct Jac3 {
    r1: Vec3,
    r2: Vec3,
    inv_mass1: Mat3,
    inv_mass2: Mat3,
    inv_inertia1: Mat3,
    inv_inertia2: Mat3,
    mass: Mat3,
    lambda: Vec3,
    /// Velocity bias added to the relative anchor velocity.
    pub bias: Vec3,
    /// Optional bound on the accumulated impulse magnitude.
    pub limit: Option<f32>,
}

impl Jac3 {
    pub fn lambda(&self) -> Vec3 {
        self.lambda
    }

    /// Builds the effective mass at the anchors. Returns false when the 3x3 system is singular,
    /// in which case nothing is applied and the caller should fall back to a single row.
    pub fn linear(&mut self, body1: &mut Body, body2: &mut Body, pos1: Vec3, pos2: Vec3) -> bool {
        self.r1 = pos1 - body1.position;
        self.r2 = pos2 - body2.position;
        self.inv_mass1 = body1.inv_mass();
        self.inv_mass2 = body2.inv_mass();
        self.inv_inertia1 = body1.inv_inertia();
        self.inv_inertia2 = body2.inv_inertia();

        // K = M1^-1 + M2^-1 - [r1] I1^-1 [r1] - [r2] I2^-1 [r2]
        let s1 = Mat3::skew(self.r1);
        let s2 = Mat3::skew(self.r2);
        let k = self.inv_mass1 + self.inv_mass2
            - s1 * self.inv_inertia1 * s1
            - s2 * self.inv_inertia2 * s2;
        // singularity test relative to the scale of K
        let trace = k.x_axis.x + k.y_axis.y + k.z_axis.z;
        if trace <= 1e-9 || k.determinant().abs() < 1e-6 * trace * trace * trace {
            self.mass = Mat3::ZERO;
            return false;
        }
        self.mass = k.inverse();

        // apply warm starting from the last frame
        self.apply(body1, body2, self.lambda);
        true
    }

    fn apply(&self, body1: &mut Body, body2: &mut Body, impulse: Vec3) {
        body1.velocity += self.inv_mass1 * impulse;
        body1.angular_velocity += self.inv_inertia1 * self.r1.cross(impulse);
        body2.velocity -= self.inv_mass2 * impulse;
        body2.angular_velocity -= self.inv_inertia2 * self.r2.cross(impulse);
    }

    /// Relative velocity of the first anchor with respect to the second.
    pub fn velocity(&self, body1: &Body, body2: &Body) -> Vec3 {
        body1.velocity + body1.angular_velocity.cross(self.r1)
            - body2.velocity
            - body2.angular_velocity.cross(self.r2)
    }

    pub fn resolve(&mut self, body1: &mut Body, body2: &mut Body) {
        let c = self.velocity(body1, body2) + self.bias;
        let mut lambda = self.lambda - self.mass * c;
        if let Some(limit) = self.limit {
            let len = lambda.length();
            if len > limit {
                lambda *= limit / len;
            }
        }
        let delta = lambda - self.lambda;
        self.lambda = lambda;
        self.apply(body1, body2, delta);
    }

    pub fn force(&self) -> Vec3 {
        self.lambda
    }

    pub fn reset(&mut self) {
        self.lambda = Vec3::ZERO;
    }
}
