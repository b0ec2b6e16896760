use crate::body::Body;
use glam::{Mat2, Vec2, Vec3};

#[derive(Clone, Copy, Debug, Default)]
struct Row {
    v1: Vec3,
    w1: Vec3,
    v2: Vec3,
    w2: Vec3,
    v1a: Vec3,
    w1a: Vec3,
    v2a: Vec3,
    w2a: Vec3,
}

impl Row {
    fn linear(body1: &Body, body2: &Body, r1: Vec3, r2: Vec3, axis: Vec3) -> Self {
        let v1 = axis;
        let w1 = r1.cross(axis);
        let v2 = -axis;
        let w2 = axis.cross(r2);
        Self {
            v1,
            w1,
            v2,
            w2,
            v1a: body1.inv_mass() * v1,
            w1a: body1.inv_inertia() * w1,
            v2a: body2.inv_mass() * v2,
            w2a: body2.inv_inertia() * w2,
        }
    }

    /// `J_self * M^-1 * J_other^T`
    fn coupling(&self, other: &Row) -> f32 {
        self.v1a.dot(other.v1) + self.w1a.dot(other.w1) + self.v2a.dot(other.v2) + self.w2a.dot(other.w2)
    }

    fn velocity(&self, body1: &Body, body2: &Body) -> f32 {
        self.v1.dot(body1.velocity)
            + self.w1.dot(body1.angular_velocity)
            + self.v2.dot(body2.velocity)
            + self.w2.dot(body2.angular_velocity)
    }
}

/// Two coupled rows solved together, used for the friction plane of a contact.
#[derive(Clone, Debug, Default)]
pub struct Jac2 {
    row1: Row,
    row2: Row,
    mass: Mat2,
    lambda: Vec2,
    active: bool,
}

impl Jac2 {
    pub fn lambda(&self) -> Vec2 {
        self.lambda
    }

    pub fn linear(
        &mut self,
        body1: &mut Body,
        body2: &mut Body,
        pos1: Vec3,
        pos2: Vec3,
        axis1: Vec3,
        axis2: Vec3,
    ) {
        let r1 = pos1 - body1.position;
        let r2 = pos2 - body2.position;
        self.row1 = Row::linear(body1, body2, r1, r2, axis1);
        self.row2 = Row::linear(body1, body2, r1, r2, axis2);

        let k = Mat2::from_cols(
            Vec2::new(self.row1.coupling(&self.row1), self.row2.coupling(&self.row1)),
            Vec2::new(self.row1.coupling(&self.row2), self.row2.coupling(&self.row2)),
        );
        self.active = k.determinant().abs() > 1e-12;
        self.mass = if self.active { k.inverse() } else { Mat2::ZERO };

        // apply warm starting from the last frame
        self.apply(body1, body2, self.lambda);
    }

    fn apply(&self, body1: &mut Body, body2: &mut Body, t: Vec2) {
        body1.velocity += self.row1.v1a * t.x + self.row2.v1a * t.y;
        body1.angular_velocity += self.row1.w1a * t.x + self.row2.w1a * t.y;
        body2.velocity += self.row1.v2a * t.x + self.row2.v2a * t.y;
        body2.angular_velocity += self.row1.w2a * t.x + self.row2.w2a * t.y;
    }

    /// Solves both rows and clamps the accumulated impulse to a disc of radius `limit`.
    pub fn resolve(&mut self, body1: &mut Body, body2: &mut Body, limit: f32) {
        if !self.active {
            return;
        }
        let c = Vec2::new(
            self.row1.velocity(body1, body2),
            self.row2.velocity(body1, body2),
        );
        let prev = self.lambda;
        self.lambda -= self.mass * c;
        let len = self.lambda.length();
        if len > 1e-4 && len > limit {
            self.lambda *= limit / len;
        }
        self.apply(body1, body2, self.lambda - prev);
    }

    /// Linear impulse applied to the first body by both rows.
    pub fn force(&self) -> Vec3 {
        self.row1.v1 * self.lambda.x + self.row2.v1 * self.lambda.y
    }
}
