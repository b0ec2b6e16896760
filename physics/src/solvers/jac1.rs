use super::UNBOUNDED;
use crate::body::Body;
use glam::Vec3;

/// A single constraint row between two bodies.
#[derive(Clone, Debug)]
pub struct Jac1 {
    v1: Vec3,
    w1: Vec3,
    v2: Vec3,
    w2: Vec3,
    v1a: Vec3,
    w1a: Vec3,
    v2a: Vec3,
    w2a: Vec3,
    mass: f32,
    lambda: f32,
    active: bool,
    /// Velocity bias added to the relative velocity before solving.
    pub bias: f32,
    pub lower: f32,
    pub upper: f32,
}

impl Default for Jac1 {
    fn default() -> Self {
        Self {
            v1: Vec3::ZERO,
            w1: Vec3::ZERO,
            v2: Vec3::ZERO,
            w2: Vec3::ZERO,
            v1a: Vec3::ZERO,
            w1a: Vec3::ZERO,
            v2a: Vec3::ZERO,
            w2a: Vec3::ZERO,
            mass: 0.0,
            lambda: 0.0,
            active: false,
            bias: 0.0,
            lower: -UNBOUNDED,
            upper: UNBOUNDED,
        }
    }
}

impl Jac1 {
    pub fn new(lower: f32, upper: f32) -> Self {
        Self {
            lower,
            upper,
            ..Self::default()
        }
    }

    /// Accumulated impulse along the row.
    pub fn lambda(&self) -> f32 {
        self.lambda
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Row keeping `pos1` on `body1` and `pos2` on `body2` from separating along `axis`.
    pub fn linear(&mut self, body1: &mut Body, body2: &mut Body, pos1: Vec3, pos2: Vec3, axis: Vec3) {
        self.v1 = axis;
        self.w1 = (pos1 - body1.position).cross(axis);
        self.v2 = -axis;
        self.w2 = axis.cross(pos2 - body2.position);
        self.premultiply(body1, body2);
        self.warm_start(body1, body2);
    }

    /// Row acting on the relative angular velocity about `axis`.
    pub fn angular(&mut self, body1: &mut Body, body2: &mut Body, axis: Vec3) {
        self.v1 = Vec3::ZERO;
        self.w1 = axis;
        self.v2 = Vec3::ZERO;
        self.w2 = -axis;
        self.premultiply(body1, body2);
        self.warm_start(body1, body2);
    }

    fn premultiply(&mut self, body1: &Body, body2: &Body) {
        self.v1a = body1.inv_mass() * self.v1;
        self.w1a = body1.inv_inertia() * self.w1;
        self.v2a = body2.inv_mass() * self.v2;
        self.w2a = body2.inv_inertia() * self.w2;
        let inv_mass = self.v1a.dot(self.v1)
            + self.w1a.dot(self.w1)
            + self.v2a.dot(self.v2)
            + self.w2a.dot(self.w2);
        // nothing can move along this row
        self.active = inv_mass >= 1e-6;
        self.mass = if self.active { inv_mass.recip() } else { 0.0 };
    }

    fn warm_start(&mut self, body1: &mut Body, body2: &mut Body) {
        self.apply(body1, body2, self.lambda);
    }

    fn apply(&self, body1: &mut Body, body2: &mut Body, t: f32) {
        body1.velocity += self.v1a * t;
        body1.angular_velocity += self.w1a * t;
        body2.velocity += self.v2a * t;
        body2.angular_velocity += self.w2a * t;
    }

    /// Relative velocity along the row.
    pub fn velocity(&self, body1: &Body, body2: &Body) -> f32 {
        self.v1.dot(body1.velocity)
            + self.w1.dot(body1.angular_velocity)
            + self.v2.dot(body2.velocity)
            + self.w2.dot(body2.angular_velocity)
    }

    /// One projected Gauss-Seidel step.
    pub fn resolve(&mut self, body1: &mut Body, body2: &mut Body) {
        if !self.active {
            return;
        }
        let c = self.velocity(body1, body2) + self.bias;
        let prev = self.lambda;
        self.lambda = (self.lambda - self.mass * c).max(self.lower).min(self.upper);
        self.apply(body1, body2, self.lambda - prev);
    }

    /// Linear impulse applied to the first body by this row.
    pub fn force(&self) -> Vec3 {
        self.v1 * self.lambda
    }

    pub fn reset(&mut self) {
        self.lambda = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Shape, ShapeArena};

    fn sphere_body(shapes: &mut ShapeArena, pos: Vec3) -> Body {
        let mut body = Body::from_translation(pos);
        body.attach_shape(shapes.add(Shape::make_sphere(Vec3::ZERO, 0.5)));
        body.update_shape(shapes);
        body
    }

    #[test]
    fn test_contact_row_stops_approach() {
        let mut shapes = ShapeArena::new();
        let mut a = sphere_body(&mut shapes, Vec3::new(-0.5, 0.0, 0.0));
        let mut b = sphere_body(&mut shapes, Vec3::new(0.5, 0.0, 0.0));
        a.velocity = Vec3::new(1.0, 0.0, 0.0);
        b.velocity = Vec3::new(-1.0, 0.0, 0.0);

        // normal pushes the first body out, towards -x
        let mut row = Jac1::new(0.0, UNBOUNDED);
        row.linear(&mut a, &mut b, Vec3::ZERO, Vec3::ZERO, -Vec3::X);
        assert!(row.is_active());
        row.resolve(&mut a, &mut b);
        assert!(row.velocity(&a, &b).abs() < 1e-5);
        assert!(row.lambda() > 0.0);
        assert!(a.velocity.abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(b.velocity.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn test_lower_bound_never_pulls() {
        let mut shapes = ShapeArena::new();
        let mut a = sphere_body(&mut shapes, Vec3::new(-0.5, 0.0, 0.0));
        let mut b = sphere_body(&mut shapes, Vec3::new(0.5, 0.0, 0.0));
        a.velocity = Vec3::new(-1.0, 0.0, 0.0);

        let mut row = Jac1::new(0.0, UNBOUNDED);
        row.linear(&mut a, &mut b, Vec3::ZERO, Vec3::ZERO, -Vec3::X);
        row.resolve(&mut a, &mut b);
        assert_eq!(row.lambda(), 0.0);
        assert_eq!(a.velocity, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_static_pair_is_inactive() {
        let mut a = Body::new_static();
        let mut b = Body::new_static();
        let mut row = Jac1::default();
        row.linear(&mut a, &mut b, Vec3::ZERO, Vec3::ZERO, Vec3::Z);
        assert!(!row.is_active());
        row.resolve(&mut a, &mut b);
        assert_eq!(row.lambda(), 0.0);
    }

    #[test]
    fn test_warm_start_reapplies_impulse() {
        let mut shapes = ShapeArena::new();
        let mut a = sphere_body(&mut shapes, Vec3::new(0.0, 0.0, 1.0));
        let mut ground = Body::new_static();
        a.velocity = Vec3::new(0.0, 0.0, -2.0);

        let mut row = Jac1::new(0.0, UNBOUNDED);
        row.linear(&mut a, &mut ground, Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.0, 0.0, 0.5), Vec3::Z);
        row.resolve(&mut a, &mut ground);
        let lambda = row.lambda();
        assert!(a.velocity.z.abs() < 1e-5);

        // same approach speed next frame, the cached impulse already cancels it
        a.velocity = Vec3::new(0.0, 0.0, -2.0);
        row.linear(&mut a, &mut ground, Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.0, 0.0, 0.5), Vec3::Z);
        assert!(a.velocity.z.abs() < 1e-5);
        assert_eq!(row.lambda(), lambda);
    }
}
