use crate::{
    config::{Config, InertiaMode},
    math::{
        glam_ext::{Mat3Ext, QuatExt},
        Pose,
    },
    shapes::{ShapeArena, ShapeHandle},
};
use glam::{Mat3, Quat, Vec3};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

impl Default for BodyHandle {
    // default to invalid value
    fn default() -> Self {
        Self(u32::MAX)
    }
}

#[derive(Debug, Default)]
pub struct BodyArena {
    bodies: Vec<Option<Body>>,
}

impl BodyArena {
    pub fn new() -> Self {
        BodyArena { bodies: Vec::new() }
    }

    pub fn add(&mut self, body: Body) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Some(body));
        handle
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Option<Body> {
        self.bodies
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.take())
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|body| (BodyHandle(i as u32), body)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut Body)> {
        self.bodies
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|body| (BodyHandle(i as u32), body)))
    }

    pub fn handles(&self) -> Vec<BodyHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
    }

    pub fn len(&self) -> usize {
        self.bodies.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies
            .get(handle.0 as usize)
            .and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.as_mut())
    }

    pub fn get_body(&self, handle: BodyHandle) -> &Body {
        match self.get(handle) {
            Some(body) => body,
            None => panic!("invalid body handle {}", handle.0),
        }
    }

    pub fn get_body_mut(&mut self, handle: BodyHandle) -> &mut Body {
        match self.get_mut(handle) {
            Some(body) => body,
            None => panic!("invalid body handle {}", handle.0),
        }
    }

    /// Disjoint mutable borrows of two different bodies.
    pub fn get_body_pair_mut(
        &mut self,
        handle_a: BodyHandle,
        handle_b: BodyHandle,
    ) -> (&mut Body, &mut Body) {
        let (index_a, index_b) = (handle_a.0 as usize, handle_b.0 as usize);
        let (slot_a, slot_b) = match index_a.cmp(&index_b) {
            std::cmp::Ordering::Less => {
                let (head, tail) = self.bodies.split_at_mut(index_b);
                (&mut head[index_a], &mut tail[0])
            }
            std::cmp::Ordering::Greater => {
                let (head, tail) = self.bodies.split_at_mut(index_a);
                (&mut tail[0], &mut head[index_b])
            }
            std::cmp::Ordering::Equal => {
                panic!("get_body_pair_mut called with the same index {}", index_a)
            }
        };
        match (slot_a.as_mut(), slot_b.as_mut()) {
            (Some(body_a), Some(body_b)) => (body_a, body_b),
            _ => panic!("invalid body pair {} {}", index_a, index_b),
        }
    }

    pub fn log_bodies(&self, frame: u64) {
        for (handle, body) in self.iter() {
            if body.moves() {
                log::info!(
                    "frame: {} body: {} pos: {} rot: {} lin: {} ang: {} sleeping: {}",
                    frame,
                    handle.0,
                    body.position,
                    body.orientation,
                    body.velocity,
                    body.angular_velocity,
                    body.sleeping
                );
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Body {
    moves_enabled: bool,
    rotates_enabled: bool,
    lock_axis: Option<Vec3>,
    shapes: Vec<ShapeHandle>,
    dirty: bool,

    mass: f32,
    inv_mass: Mat3,
    /// center of mass in local coordinates
    center: Vec3,
    /// center of mass in world coordinates
    pub position: Vec3,
    pub orientation: Quat,
    /// local to world transform of the body origin
    transform: Pose,
    local_inv_inertia: Mat3,
    inv_inertia: Mat3,

    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    last_velocity: Vec3,
    last_angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,
    angular_momentum: Vec3,

    sleep_time: f32,
    motion: f32,
    sleeping: bool,

    /// Overrides the world gravity.
    pub gravity: Option<Vec3>,
    pub linear_damping: Option<f32>,
    pub angular_damping: Option<f32>,
    pub can_sleep: bool,
    animated: bool,
    prev_pose: Option<(Vec3, Quat)>,
    /// Bodies never collide with their parent.
    pub parent: Option<BodyHandle>,
}

impl Default for Body {
    fn default() -> Self {
        Self::new(Pose::IDENTITY)
    }
}

impl Body {
    pub fn new(transform: Pose) -> Self {
        Self {
            moves_enabled: true,
            rotates_enabled: true,
            lock_axis: None,
            shapes: Vec::new(),
            dirty: true,
            mass: 0.0,
            inv_mass: Mat3::ZERO,
            center: Vec3::ZERO,
            position: transform.p,
            orientation: transform.q,
            transform,
            local_inv_inertia: Mat3::ZERO,
            inv_inertia: Mat3::ZERO,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            last_velocity: Vec3::ZERO,
            last_angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            angular_momentum: Vec3::ZERO,
            sleep_time: 0.0,
            motion: 0.0,
            sleeping: false,
            gravity: None,
            linear_damping: None,
            angular_damping: None,
            can_sleep: true,
            animated: false,
            prev_pose: None,
            parent: None,
        }
    }

    pub fn from_translation(p: Vec3) -> Self {
        Self::new(Pose::from_translation(p))
    }

    /// A body that never moves.
    pub fn new_static() -> Self {
        let mut body = Self::default();
        body.set_moves(false, false);
        body
    }

    pub fn set_moves(&mut self, moves: bool, rotates: bool) {
        self.moves_enabled = moves;
        self.rotates_enabled = rotates;
        self.dirty = true;
    }

    /// Restricts linear motion to `axis`, or lifts the restriction.
    pub fn set_lock_axis(&mut self, axis: Option<Vec3>) {
        self.lock_axis = axis.map(|a| a.normalize());
        self.dirty = true;
    }

    /// Animated bodies follow an externally driven transform.
    pub fn set_animated(&mut self, animated: bool) {
        self.animated = animated;
        if animated {
            self.set_moves(false, false);
        }
        self.prev_pose = None;
    }

    pub fn moves(&self) -> bool {
        self.moves_enabled && !self.shapes.is_empty()
    }

    pub fn rotates(&self) -> bool {
        self.rotates_enabled && !self.shapes.is_empty()
    }

    pub fn is_animated(&self) -> bool {
        self.animated
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn sleep_time(&self) -> f32 {
        self.sleep_time
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn transform(&self) -> &Pose {
        &self.transform
    }

    pub fn shapes(&self) -> &[ShapeHandle] {
        &self.shapes
    }

    pub fn last_velocity(&self) -> Vec3 {
        self.last_velocity
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    /// Inverse mass tensor, zero while asleep or static.
    pub fn inv_mass(&self) -> Mat3 {
        if self.sleeping || !self.moves() {
            Mat3::ZERO
        } else {
            self.inv_mass
        }
    }

    /// World inverse inertia tensor, zero while asleep or not rotating.
    pub fn inv_inertia(&self) -> Mat3 {
        if self.sleeping || !self.rotates() {
            Mat3::ZERO
        } else {
            self.inv_inertia
        }
    }

    pub fn local_inv_inertia(&self) -> Mat3 {
        self.local_inv_inertia
    }

    /// Smoothed squared speed used for sleep detection.
    pub fn motion(&self) -> f32 {
        let speed = self.velocity.length_squared() + self.angular_velocity.length_squared();
        self.motion * 0.9 + speed * 0.1
    }

    pub(crate) fn attach_shape(&mut self, shape: ShapeHandle) {
        self.shapes.push(shape);
        self.dirty = true;
    }

    pub(crate) fn detach_shape(&mut self, shape: ShapeHandle) {
        self.shapes.retain(|&s| s != shape);
        self.dirty = true;
    }

    /// Recomputes mass, center of mass and inertia when the shape set changed.
    pub fn update_shape(&mut self, shapes: &ShapeArena) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.mass = 0.0;
        self.inv_mass = Mat3::ZERO;
        self.local_inv_inertia = Mat3::ZERO;
        self.inv_inertia = Mat3::ZERO;

        if !self.moves() {
            self.center = Vec3::ZERO;
            self.position = self.transform.transform(self.center);
            return;
        }

        let infos: Vec<_> = self
            .shapes
            .iter()
            .filter_map(|&h| shapes.get(h))
            .map(|shape| shape.mass_info())
            .collect();
        let mass: f32 = infos.iter().map(|info| info.mass).sum();
        if mass <= 0.0 {
            log::warn!("moving body has no mass, it will stay in place");
            self.center = infos.first().map_or(Vec3::ZERO, |info| info.center);
            self.position = self.transform.transform(self.center);
            return;
        }

        let center = infos
            .iter()
            .fold(Vec3::ZERO, |acc, info| acc + info.center * info.mass)
            / mass;
        // parallel axis theorem about the combined center
        let inertia = infos.iter().fold(Mat3::ZERO, |acc, info| {
            let d = info.center - center;
            let offset = Mat3::from_diagonal(Vec3::splat(d.length_squared())) - Mat3::outer(d, d);
            acc + info.inertia + offset * info.mass
        });

        self.mass = mass;
        self.center = center;
        self.inv_mass = match self.lock_axis {
            Some(axis) => Mat3::outer(axis, axis) * mass.recip(),
            None => Mat3::from_diagonal(Vec3::splat(mass.recip())),
        };
        self.position = self.transform.transform(self.center);
        if self.rotates() && inertia.determinant().abs() > 1e-12 {
            self.local_inv_inertia = inertia.inverse();
        }
        self.calculate_inertia(InertiaMode::Velocity);
    }

    pub fn begin_frame(&mut self, dt: f32, config: &Config, shapes: &ShapeArena) {
        self.update_shape(shapes);
        if self.moves() {
            if !self.sleeping {
                self.last_velocity = self.velocity;
                self.last_angular_velocity = self.angular_velocity;
                self.force += self.gravity.unwrap_or(config.gravity) * self.mass;
            }
            self.calculate_inertia(config.inertia_mode);
        } else if self.animated {
            let prev = self.prev_pose;
            self.position = self.transform.transform(self.center);
            self.orientation = self.transform.q.normalize();
            match prev {
                Some((prev_position, prev_orientation)) if dt > 1e-6 => {
                    self.velocity = (self.position - prev_position) / dt;
                    let delta = self.orientation * prev_orientation.conjugate();
                    self.angular_velocity = delta.to_scaled_axis() / dt;
                }
                _ => {
                    self.velocity = Vec3::ZERO;
                    self.angular_velocity = Vec3::ZERO;
                }
            }
            self.prev_pose = Some((self.position, self.orientation));
            self.last_velocity = self.velocity;
            self.last_angular_velocity = self.angular_velocity;
        }
    }

    pub fn apply_forces(&mut self, dt: f32, config: &Config) {
        if self.moves() && !self.sleeping {
            self.velocity += self.inv_mass * self.force * dt;
            match config.inertia_mode {
                InertiaMode::Velocity => {
                    self.angular_velocity += self.inv_inertia * self.torque * dt;
                }
                InertiaMode::AngularMomentum => {
                    self.angular_momentum += self.torque * dt;
                    self.angular_velocity = self.inv_inertia * self.angular_momentum;
                }
            }
        }
    }

    /// Integrates the body and updates its sleep state, returns true when it fell asleep.
    pub fn end_frame(&mut self, dt: f32, config: &Config, shapes: &mut ShapeArena) -> bool {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
        if self.moves() && !self.sleeping {
            if let Some(damping) = self.linear_damping {
                self.velocity *= damping.powf(dt);
            }
            if let Some(damping) = self.angular_damping {
                self.angular_velocity *= damping.powf(dt);
            }

            self.position += self.velocity * dt;
            self.orientation = self.orientation.integrate(self.angular_velocity, dt);
            self.calculate_transform(shapes);
            self.calculate_inertia(config.inertia_mode);

            self.motion = self.motion();
            if self.motion < config.sleep_threshold {
                self.sleep_time += dt;
                if self.can_sleep && config.sleep_time > 0.0 && self.sleep_time > config.sleep_time
                {
                    self.motion = 0.0;
                    self.sleeping = true;
                    self.velocity = Vec3::ZERO;
                    self.angular_velocity = Vec3::ZERO;
                    return true;
                }
            } else {
                self.wake();
            }
        } else if !self.moves() && !self.animated {
            self.motion = 0.0;
            self.sleeping = true;
        }
        false
    }

    /// Resets the sleep timer, returns true if the body was asleep.
    pub fn wake(&mut self) -> bool {
        self.sleep_time = 0.0;
        if self.sleeping {
            self.sleeping = false;
            true
        } else {
            false
        }
    }

    pub fn calculate_inertia(&mut self, mode: InertiaMode) {
        let conserve = mode == InertiaMode::AngularMomentum
            && self.inv_inertia.determinant().abs() > 1e-12;
        if conserve {
            self.angular_momentum = self.inv_inertia.inverse() * self.angular_velocity;
        }
        let orientation = Mat3::from_quat(self.orientation);
        self.inv_inertia = orientation * self.local_inv_inertia * orientation.transpose();
        if conserve {
            self.angular_velocity = self.inv_inertia * self.angular_momentum;
        }
    }

    /// Rebuilds the origin transform from the center of mass pose and moves the shapes.
    pub fn calculate_transform(&mut self, shapes: &mut ShapeArena) {
        self.transform.q = self.orientation;
        self.transform.p = self.position - self.orientation * self.center;
        for &handle in &self.shapes {
            if let Some(shape) = shapes.get_mut(handle) {
                shape.update(&self.transform);
            }
        }
    }

    /// Teleports the center of mass.
    pub fn set_position(&mut self, position: Vec3, shapes: &mut ShapeArena) {
        self.position = position;
        self.calculate_transform(shapes);
    }

    pub fn set_orientation(&mut self, orientation: Quat, shapes: &mut ShapeArena) {
        self.orientation = orientation.normalize();
        self.calculate_transform(shapes);
        self.calculate_inertia(InertiaMode::Velocity);
    }

    /// Drives an animated body, velocities are derived on the next frame.
    pub fn set_animated_pose(&mut self, pose: Pose, shapes: &mut ShapeArena) {
        self.transform = pose;
        for &handle in &self.shapes {
            if let Some(shape) = shapes.get_mut(handle) {
                shape.update(&self.transform);
            }
        }
    }

    pub fn local_to_world(&self, pt: Vec3) -> Vec3 {
        self.transform.transform(pt)
    }

    pub fn world_to_local(&self, pt: Vec3) -> Vec3 {
        self.transform.inv_transform(pt)
    }

    pub fn add_impulse(&mut self, impulse: Vec3) {
        self.velocity += self.inv_mass() * impulse;
    }

    pub fn add_impulse_at(&mut self, impulse: Vec3, pos: Vec3) {
        self.velocity += self.inv_mass() * impulse;
        self.angular_velocity += self.inv_inertia() * (pos - self.position).cross(impulse);
    }

    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    pub fn add_force_at(&mut self, force: Vec3, pos: Vec3) {
        self.force += force;
        self.torque += (pos - self.position).cross(force);
    }

    pub fn velocity_at(&self, pos: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(pos - self.position)
    }

    pub fn last_velocity_at(&self, pos: Vec3) -> Vec3 {
        self.last_velocity + self.last_angular_velocity.cross(pos - self.position)
    }

    /// Velocity change at `point` per unit impulse applied there.
    pub fn unit_impulse_matrix(&self, point: Vec3) -> Mat3 {
        let r = Mat3::skew(point - self.position);
        self.inv_mass() - r * self.inv_inertia() * r
    }
}
