use crate::{
    body::Body,
    config::{Config, Material},
    math::glam_ext::{QuatExt, Vec3Ext},
    solvers::{Jac1, Jac2, UNBOUNDED},
};
use glam::Vec3;

// friction below this is treated as frictionless
const MIN_FRICTION: f32 = 1e-4;
// closing speed needed before restitution kicks in
const RESTITUTION_SPEED: f32 = 0.5;
// fraction of the remaining penetration removed per correction pass
const CORRECTION: f32 = 0.2;

/// Identifies the pair of features a contact point was generated from, so the same point can be
/// found again on the next frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureId {
    /// A vertex, end cap or other single point of the pair.
    Point(u32),
    /// Deepest face of a hull.
    Face(u32),
    /// A point produced by clipping one face against another.
    Clip(u32),
    /// Closest points between two edges.
    Edges(u32, u32),
    /// One end of the overlap of two parallel segments.
    Parallel(u32, u8),
}

#[derive(Clone, Debug)]
pub struct Contact {
    pub position: Vec3,
    /// Points from the second shape towards the first.
    pub normal: Vec3,
    pub penetration: f32,
    pub feature: FeatureId,
    friction: f32,
    restitution: f32,
    normal_row: Jac1,
    friction_rows: Jac2,
    // anchors relative to each center of mass in body space
    local1: Vec3,
    local2: Vec3,
}

impl Contact {
    pub(crate) fn new(
        position: Vec3,
        normal: Vec3,
        penetration: f32,
        feature: FeatureId,
        material1: &Material,
        material2: &Material,
    ) -> Self {
        Self {
            position,
            normal,
            penetration,
            feature,
            friction: material1
                .friction_combine
                .apply(material1.friction, material2.friction),
            restitution: material1
                .restitution_combine
                .apply(material1.restitution, material2.restitution),
            normal_row: Jac1::new(0.0, UNBOUNDED),
            friction_rows: Jac2::default(),
            local1: Vec3::ZERO,
            local2: Vec3::ZERO,
        }
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Accumulated normal impulse.
    pub fn normal_impulse(&self) -> f32 {
        self.normal_row.lambda()
    }

    /// Builds the solver rows for the current frame and reapplies the cached impulses.
    pub(crate) fn init(&mut self, body1: &mut Body, body2: &mut Body, config: &Config) {
        let pos = self.position;
        self.normal_row
            .linear(body1, body2, pos, pos, self.normal);
        if self.friction > MIN_FRICTION {
            let (tangent1, tangent2) = self.normal.make_basis();
            self.friction_rows
                .linear(body1, body2, pos, pos, tangent1, tangent2);
        }

        // closing speed from the start of the frame, before gravity and solving
        let rel_vel = (body1.last_velocity_at(pos) - body2.last_velocity_at(pos)).dot(self.normal);
        let mut bias = if rel_vel < -RESTITUTION_SPEED {
            self.restitution * rel_vel
        } else {
            0.0
        };
        if config.position_iterations == 0 {
            let baumgarte =
                -CORRECTION * (self.penetration - config.delta).max(0.0) / config.step;
            bias = bias.min(baumgarte);
        }
        self.normal_row.bias = bias;
    }

    pub(crate) fn resolve(&mut self, body1: &mut Body, body2: &mut Body) {
        self.normal_row.resolve(body1, body2);
        if self.friction > MIN_FRICTION {
            let limit = self.normal_row.lambda() * self.friction;
            self.friction_rows.resolve(body1, body2, limit);
        }
    }

    /// Total impulse applied to the first body, for visualisation.
    pub fn force(&self) -> Vec3 {
        let mut force = self.normal_row.force();
        if self.friction > MIN_FRICTION {
            force += self.friction_rows.force();
        }
        force
    }

    pub(crate) fn init_position(&mut self, body1: &Body, body2: &Body) {
        self.local1 = body1.world_to_local(self.position) - body1.center();
        self.local2 = body2.world_to_local(self.position) - body2.center();
    }

    /// Pushes the bodies apart along the normal, returns the penetration left before the push.
    pub(crate) fn resolve_position(
        &self,
        body1: &mut Body,
        body2: &mut Body,
        config: &Config,
    ) -> f32 {
        let n = self.normal;
        let r1 = body1.orientation * self.local1;
        let r2 = body2.orientation * self.local2;
        let p1 = r1 + body1.position;
        let p2 = r2 + body2.position;
        let penetration = self.penetration - (p1 - p2).dot(n);
        if penetration < config.delta {
            return penetration;
        }

        let torque1 = r1.cross(n);
        let torque2 = r2.cross(n);
        let rot1 = body1.inv_inertia() * torque1;
        let rot2 = body2.inv_inertia() * torque2;
        let lin1 = body1.inv_mass() * n;
        let lin2 = body2.inv_mass() * n;
        let mass = lin1.dot(n) + lin2.dot(n) + rot1.dot(torque1) + rot2.dot(torque2);
        if mass < 1e-9 {
            return penetration;
        }
        let lambda = (penetration - config.delta) * CORRECTION / mass;

        body1.position += lin1 * lambda;
        body1.orientation = body1.orientation.integrate(rot1, lambda);
        body2.position -= lin2 * lambda;
        body2.orientation = body2.orientation.integrate(rot2, -lambda);
        body1.calculate_inertia(config.inertia_mode);
        body2.calculate_inertia(config.inertia_mode);
        penetration
    }
}
