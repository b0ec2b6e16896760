use super::Constraint;
use crate::{
    body::{Body, BodyArena, BodyHandle},
    config::Config,
    math::{glam_ext::QuatExt, EPSILON},
    solvers::{Jac1, Jac3, UNBOUNDED},
};
use glam::Vec3;

// fraction of the error removed per position pass
const CORRECTION: f32 = 0.2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    /// Within the allowed range, nothing to solve this step.
    Slack,
    /// Anchors held together by a 3x3 block.
    Weld,
    /// A single row along the line between the anchors.
    Axis,
}

/// Keeps an anchor on each body together, or their distance within
/// `[min_distance, max_distance]` when `max_distance` is not zero.
#[derive(Clone, Debug)]
pub struct ConstraintPoint {
    body1: BodyHandle,
    body2: BodyHandle,
    /// anchors relative to each body origin
    local1: Vec3,
    local2: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    mode: Mode,
    normal: Vec3,
    row: Jac1,
    weld: Jac3,
}

impl ConstraintPoint {
    pub fn new(body1: BodyHandle, body2: BodyHandle, local1: Vec3, local2: Vec3) -> Self {
        Self {
            body1,
            body2,
            local1,
            local2,
            min_distance: 0.0,
            max_distance: 0.0,
            mode: Mode::Slack,
            normal: Vec3::Z,
            row: Jac1::default(),
            weld: Jac3::default(),
        }
    }

    /// Distance constraint, `max_distance` defaults to `min_distance`.
    pub fn with_distance(mut self, min_distance: f32, max_distance: Option<f32>) -> Self {
        self.min_distance = min_distance;
        self.max_distance = max_distance.unwrap_or(min_distance);
        self
    }

    pub fn anchors(&self) -> (Vec3, Vec3) {
        (self.local1, self.local2)
    }

    fn world_anchors(&self, body1: &Body, body2: &Body) -> (Vec3, Vec3) {
        (
            body1.local_to_world(self.local1),
            body2.local_to_world(self.local2),
        )
    }

    fn init_axis(&mut self, body1: &mut Body, body2: &mut Body, pos1: Vec3, pos2: Vec3, config: &Config) {
        let diff = pos1 - pos2;
        let distance = diff.length();
        let mut use_min = self.min_distance > 1e-4 && distance < self.min_distance + config.delta;
        let mut use_max = distance > self.max_distance - config.delta;
        if !use_min && !use_max {
            self.mode = Mode::Slack;
            return;
        }
        if self.max_distance - self.min_distance < 2.0 * config.delta {
            use_min = true;
            use_max = true;
        }

        self.normal = if distance > EPSILON { diff / distance } else { Vec3::Z };
        self.row.linear(body1, body2, pos1, pos2, self.normal);
        let mut target = self.max_distance;
        if use_min && use_max {
            self.row.lower = -UNBOUNDED;
            self.row.upper = UNBOUNDED;
        } else if use_min {
            // pushes only
            self.row.lower = 0.0;
            self.row.upper = UNBOUNDED;
            target = self.min_distance;
        } else {
            // pulls only
            self.row.lower = -UNBOUNDED;
            self.row.upper = 0.0;
        }
        self.row.bias = axis_bias(distance - target, config);
        self.mode = Mode::Axis;
    }

    fn resolve_weld_position(
        &self,
        body1: &mut Body,
        body2: &mut Body,
        r1: Vec3,
        r2: Vec3,
        config: &Config,
    ) -> Option<f32> {
        let p1 = body1.position + r1;
        let p2 = body2.position + r2;
        let diff = p1 - p2;
        let distance = diff.length();
        if distance < config.delta {
            return Some(distance);
        }
        let k = body1.unit_impulse_matrix(p1) + body2.unit_impulse_matrix(p2);
        if k.determinant().abs() < 1e-9 {
            return None;
        }
        let impulse = k.inverse() * (diff * (-CORRECTION * (distance - config.delta) / distance));
        let rot1 = body1.inv_inertia() * r1.cross(impulse);
        let rot2 = body2.inv_inertia() * r2.cross(impulse);
        body1.position += body1.inv_mass() * impulse;
        body2.position -= body2.inv_mass() * impulse;
        body1.orientation = body1.orientation.integrate(rot1, 1.0);
        body2.orientation = body2.orientation.integrate(rot2, -1.0);
        Some(distance)
    }
}

fn axis_bias(error: f32, config: &Config) -> f32 {
    if error > config.delta {
        CORRECTION * (error - config.delta) / config.step
    } else if error < -config.delta {
        CORRECTION * (error + config.delta) / config.step
    } else {
        0.0
    }
}

impl Constraint for ConstraintPoint {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body1, self.body2)
    }

    fn init(&mut self, bodies: &mut BodyArena, config: &Config) {
        let (body1, body2) = bodies.get_body_pair_mut(self.body1, self.body2);
        let (pos1, pos2) = self.world_anchors(body1, body2);
        if self.max_distance > 1e-4 {
            self.init_axis(body1, body2, pos1, pos2, config);
            return;
        }

        let diff = pos1 - pos2;
        let distance = diff.length();
        if self.weld.linear(body1, body2, pos1, pos2) {
            self.weld.bias = if distance > config.delta {
                diff * (CORRECTION * (distance - config.delta) / distance / config.step)
            } else {
                Vec3::ZERO
            };
            self.mode = Mode::Weld;
        } else {
            // degenerate mass, only hold the distance
            self.normal = if distance > EPSILON { diff / distance } else { Vec3::Z };
            self.row.linear(body1, body2, pos1, pos2, self.normal);
            self.row.lower = -UNBOUNDED;
            self.row.upper = UNBOUNDED;
            self.row.bias = axis_bias(distance, config);
            self.mode = Mode::Axis;
        }
    }

    fn resolve(&mut self, bodies: &mut BodyArena) {
        if self.mode == Mode::Slack {
            return;
        }
        let (body1, body2) = bodies.get_body_pair_mut(self.body1, self.body2);
        match self.mode {
            Mode::Weld => self.weld.resolve(body1, body2),
            Mode::Axis => self.row.resolve(body1, body2),
            Mode::Slack => {}
        }
    }

    fn force(&self) -> Vec3 {
        match self.mode {
            Mode::Weld => self.weld.force(),
            Mode::Axis => self.row.force(),
            Mode::Slack => Vec3::ZERO,
        }
    }

    fn resolve_position(&mut self, bodies: &mut BodyArena, config: &Config) -> f32 {
        let (body1, body2) = bodies.get_body_pair_mut(self.body1, self.body2);
        let r1 = body1.orientation * (self.local1 - body1.center());
        let r2 = body2.orientation * (self.local2 - body2.center());

        let (min_distance, max_distance) = if self.max_distance < 1e-4 {
            match self.resolve_weld_position(body1, body2, r1, r2, config) {
                Some(error) => {
                    body1.calculate_inertia(config.inertia_mode);
                    body2.calculate_inertia(config.inertia_mode);
                    return error;
                }
                None => (0.0, 0.0),
            }
        } else {
            (self.min_distance, self.max_distance)
        };

        let diff = body1.position + r1 - body2.position - r2;
        let distance = diff.length();
        let error = if distance > max_distance + config.delta {
            distance - max_distance
        } else if distance < min_distance - config.delta {
            min_distance - distance
        } else {
            return 0.0;
        };

        let dir = if distance < EPSILON { Vec3::Z } else { diff / distance };
        let lin1 = body1.inv_mass() * dir;
        let lin2 = body2.inv_mass() * dir;
        let torque1 = r1.cross(dir);
        let torque2 = r2.cross(dir);
        let rot1 = body1.inv_inertia() * torque1;
        let rot2 = body2.inv_inertia() * torque2;
        let mass = dir.dot(lin1) + dir.dot(lin2) + rot1.dot(torque1) + rot2.dot(torque2);
        if mass < 1e-9 {
            return error;
        }
        let lambda = if distance > max_distance {
            -CORRECTION * (distance - max_distance - config.delta) / mass
        } else {
            CORRECTION * (min_distance - distance - config.delta) / mass
        };
        body1.position += lin1 * lambda;
        body1.orientation = body1.orientation.integrate(rot1, lambda);
        body2.position -= lin2 * lambda;
        body2.orientation = body2.orientation.integrate(rot2, -lambda);
        body1.calculate_inertia(config.inertia_mode);
        body2.calculate_inertia(config.inertia_mode);
        error
    }
}
