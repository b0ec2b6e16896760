use crate::{
    body::{Body, BodyArena, BodyHandle},
    broadphase::BroadPhase,
    config::Config,
    constraints::{Constraint, ConstraintArena, ConstraintHandle},
    generators::{ForceGenerator, GeneratorArena, GeneratorHandle},
    manifold::ContactSet,
    perf::Perf,
    shapes::{Ray, Shape, ShapeArena, ShapeHandle},
};
use glam::{Quat, Vec3};
use std::{collections::BTreeSet, time::Instant};

/// Decides whether a pair of bodies needs solving, waking one body when its partner moves
/// fast enough.
pub(crate) fn check_sleep(
    bodies: &mut BodyArena,
    b1: BodyHandle,
    b2: BodyHandle,
    config: &Config,
) -> bool {
    let (sleeping1, sleeping2, motion1, motion2, both_move) =
        match (bodies.get(b1), bodies.get(b2)) {
            (Some(body1), Some(body2)) => (
                body1.is_sleeping(),
                body2.is_sleeping(),
                body1.motion(),
                body2.motion(),
                body1.moves() && body2.moves(),
            ),
            _ => return false,
        };
    if sleeping1 && sleeping2 {
        return false;
    }
    if both_move {
        if motion1 > config.sleep_wake_threshold && bodies.get_body_mut(b2).wake() {
            log::debug!("body {} woken by body {}", b2.0, b1.0);
        }
        if motion2 > config.sleep_wake_threshold && bodies.get_body_mut(b1).wake() {
            log::debug!("body {} woken by body {}", b1.0, b2.0);
        }
    }
    true
}

/// Something the solver iterates over.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SolveItem {
    /// Index into the broad phase pair list, stable until the next broad phase run.
    Contact(usize),
    Constraint(ConstraintHandle),
}

pub struct World {
    config: Config,
    bodies: BodyArena,
    shapes: ShapeArena,
    broadphase: BroadPhase,
    constraints: ConstraintArena,
    generators: GeneratorArena,
    /// Items solved by the last `begin_step`, corrected in `end_step`.
    awake: Vec<SolveItem>,
    frame: u64,
    time: f32,
    pending: bool,
    perf: Perf,
}

impl World {
    pub fn new(config: Config) -> Self {
        let margin = config.broadphase_margin;
        Self {
            config,
            bodies: BodyArena::new(),
            shapes: ShapeArena::new(),
            broadphase: BroadPhase::new(margin),
            constraints: ConstraintArena::new(),
            generators: GeneratorArena::new(),
            awake: Vec::new(),
            frame: 0,
            time: 0.0,
            pending: false,
            perf: Perf::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bodies(&self) -> &BodyArena {
        &self.bodies
    }

    pub fn body(&self, handle: BodyHandle) -> &Body {
        self.bodies.get_body(handle)
    }

    /// Direct access for velocities and flags. Use `set_position` to teleport.
    pub fn body_mut(&mut self, handle: BodyHandle) -> &mut Body {
        self.bodies.get_body_mut(handle)
    }

    pub fn shapes(&self) -> &ShapeArena {
        &self.shapes
    }

    pub fn shape(&self, handle: ShapeHandle) -> &Shape {
        &self.shapes[handle]
    }

    pub fn broadphase(&self) -> &BroadPhase {
        &self.broadphase
    }

    pub fn constraints(&self) -> &ConstraintArena {
        &self.constraints
    }

    pub fn generators(&self) -> &GeneratorArena {
        &self.generators
    }

    /// Active contact sets, each with the contacts found on the last step.
    pub fn contacts(&self) -> &[ContactSet] {
        self.broadphase.pairs()
    }

    /// Contact sets involving `shape`.
    pub fn shape_contacts(&self, shape: ShapeHandle) -> impl Iterator<Item = &ContactSet> {
        self.broadphase
            .pairs()
            .iter()
            .filter(move |pair| pair.contains(shape))
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Clock value passed to the last `update`.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn perf(&self) -> &Perf {
        &self.perf
    }

    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        self.bodies.add(body)
    }

    /// Removes the body with its shapes and every constraint and generator using it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<Body> {
        let shapes = self.bodies.get(handle)?.shapes().to_vec();
        for shape in shapes {
            self.broadphase.remove_shape(shape);
            self.shapes.remove(shape);
        }
        let constraints = self.constraints.remove_body(handle);
        let generators = self.generators.remove_body(handle);
        if constraints + generators > 0 {
            log::debug!(
                "removed body {} with {} constraints and {} generators",
                handle.0,
                constraints,
                generators
            );
        }
        // pair indices are no longer valid
        self.awake.clear();
        self.bodies.remove(handle)
    }

    /// Attaches `shape` to `body` and registers it with the broad phase.
    pub fn add_shape(&mut self, body: BodyHandle, mut shape: Shape) -> ShapeHandle {
        shape.body = Some(body);
        let handle = self.shapes.add(shape);
        let owner = self.bodies.get_body_mut(body);
        owner.attach_shape(handle);
        owner.update_shape(&self.shapes);
        owner.calculate_transform(&mut self.shapes);
        self.broadphase
            .add_shape(handle, &self.shapes, &self.bodies);
        handle
    }

    pub fn remove_shape(&mut self, handle: ShapeHandle) -> Option<Shape> {
        let shape = self.shapes.remove(handle)?;
        self.broadphase.remove_shape(handle);
        let bodies = &mut self.bodies;
        if let Some(body) = shape.body().and_then(|b| bodies.get_mut(b)) {
            body.detach_shape(handle);
            body.update_shape(&self.shapes);
            body.calculate_transform(&mut self.shapes);
        }
        self.awake.clear();
        Some(shape)
    }

    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) -> ConstraintHandle {
        self.constraints.add(constraint)
    }

    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Option<Box<dyn Constraint>> {
        self.awake.retain(|&item| item != SolveItem::Constraint(handle));
        self.constraints.remove(handle)
    }

    pub fn add_generator(&mut self, generator: Box<dyn ForceGenerator>) -> GeneratorHandle {
        self.generators.add(generator)
    }

    pub fn remove_generator(&mut self, handle: GeneratorHandle) -> Option<Box<dyn ForceGenerator>> {
        self.generators.remove(handle)
    }

    /// Moves the center of mass of a body and wakes it.
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) {
        let body = self.bodies.get_body_mut(handle);
        body.set_position(position, &mut self.shapes);
        body.wake();
    }

    pub fn set_orientation(&mut self, handle: BodyHandle, orientation: Quat) {
        let body = self.bodies.get_body_mut(handle);
        body.set_orientation(orientation, &mut self.shapes);
        body.wake();
    }

    /// Nearest shape hit by the ray and the distance along it.
    pub fn raycast(&self, ray: &Ray) -> Option<(ShapeHandle, f32)> {
        self.shapes
            .iter()
            .filter(|(_, shape)| shape.body().is_some())
            .filter_map(|(handle, shape)| shape.intersect(ray).map(|t| (handle, t)))
            .fold(None, |best: Option<(ShapeHandle, f32)>, hit| match best {
                Some(best) if best.1 <= hit.1 => Some(best),
                _ => Some(hit),
            })
    }

    /// Advances the world by one fixed step.
    ///
    /// The positions computed by the previous call are committed first, so body transforms lag
    /// one step behind the forces and contacts. Use `step` for the combined update.
    ///
    /// `time` is the caller's running clock. It is stored for `time()` and never sets the step
    /// length, which is always `Config::step`.
    pub fn update(&mut self, time: f32) {
        let start = Instant::now();
        self.time = time;
        let step = self.config.step;
        if self.pending {
            self.end_step(step);
        }
        self.begin_step(step);
        self.perf.add_total(start.elapsed());
        log::trace!(
            "frame {}: total {:.3}ms broad {:.3}ms resolve {:.3}ms position {:.3}ms",
            self.frame,
            self.perf.total,
            self.perf.broad,
            self.perf.resolve,
            self.perf.position
        );
    }

    /// Completes any pending step, then runs a whole step.
    pub fn step(&mut self) {
        let step = self.config.step;
        self.flush();
        self.begin_step(step);
        self.end_step(step);
    }

    /// Commits the positions of a step started by `update`.
    pub fn flush(&mut self) {
        if self.pending {
            self.end_step(self.config.step);
        }
    }

    /// Forces, broad phase and velocity solve.
    pub fn begin_step(&mut self, dt: f32) {
        self.frame += 1;
        self.pending = true;

        for (_, body) in self.bodies.iter_mut() {
            body.begin_frame(dt, &self.config, &self.shapes);
        }
        for generator in self.generators.iter_mut() {
            let (b1, b2) = generator.bodies();
            if check_sleep(&mut self.bodies, b1, b2, &self.config) {
                generator.apply(&mut self.bodies);
            }
        }
        for (_, body) in self.bodies.iter_mut() {
            body.apply_forces(dt, &self.config);
        }

        let start = Instant::now();
        self.broadphase
            .run(&self.shapes, &mut self.bodies, &self.config);
        self.perf.add_broad(start.elapsed());

        let start = Instant::now();
        let mut sleeping: Vec<SolveItem> = (0..self.broadphase.pairs().len())
            .map(SolveItem::Contact)
            .chain(
                self.constraints
                    .handles()
                    .into_iter()
                    .map(SolveItem::Constraint),
            )
            .collect();
        self.awake.clear();
        for _ in 0..self.config.iterations {
            // items can wake up between passes
            let mut still_sleeping = Vec::with_capacity(sleeping.len());
            for item in sleeping.drain(..) {
                match self.item_bodies(item) {
                    Some((b1, b2)) if check_sleep(&mut self.bodies, b1, b2, &self.config) => {
                        self.init_item(item);
                        self.awake.push(item);
                    }
                    Some(_) => still_sleeping.push(item),
                    None => {}
                }
            }
            sleeping = still_sleeping;

            for i in 0..self.awake.len() {
                let item = self.awake[i];
                if !self.skip_resolve(item) {
                    self.resolve_item(item);
                }
            }
        }
        self.perf.add_resolve(start.elapsed());
    }

    /// Position correction, integration and sleep bookkeeping.
    pub fn end_step(&mut self, dt: f32) {
        self.pending = false;
        let start = Instant::now();
        if self.config.position_iterations > 0 {
            let mut touched = BTreeSet::new();
            for i in 0..self.awake.len() {
                let item = self.awake[i];
                if let Some((b1, b2)) = self.item_bodies(item) {
                    touched.insert(b1);
                    touched.insert(b2);
                }
                match item {
                    SolveItem::Contact(index) => {
                        if let Some(pair) = self.broadphase.pairs_mut().get_mut(index) {
                            pair.init_position(&self.bodies);
                        }
                    }
                    SolveItem::Constraint(handle) => {
                        if let Some(constraint) = self.constraints.get_mut(handle) {
                            constraint.init_position(&self.bodies);
                        }
                    }
                }
            }
            for _ in 0..self.config.position_iterations {
                for i in 0..self.awake.len() {
                    match self.awake[i] {
                        SolveItem::Contact(index) => {
                            if let Some(pair) = self.broadphase.pairs_mut().get_mut(index) {
                                pair.resolve_position(&mut self.bodies, &self.config);
                            }
                        }
                        SolveItem::Constraint(handle) => {
                            if let Some(constraint) = self.constraints.get_mut(handle) {
                                constraint.resolve_position(&mut self.bodies, &self.config);
                            }
                        }
                    }
                }
            }
            for handle in touched {
                if let Some(body) = self.bodies.get_mut(handle) {
                    body.calculate_transform(&mut self.shapes);
                }
            }
        }
        self.perf.add_position(start.elapsed());

        for (handle, body) in self.bodies.iter_mut() {
            let was_moving = body.moves();
            if body.end_frame(dt, &self.config, &mut self.shapes) && was_moving {
                log::debug!("body {} fell asleep on frame {}", handle.0, self.frame);
            }
        }
    }

    fn item_bodies(&self, item: SolveItem) -> Option<(BodyHandle, BodyHandle)> {
        match item {
            SolveItem::Contact(index) => self.broadphase.pairs().get(index).map(|p| p.bodies()),
            SolveItem::Constraint(handle) => self.constraints.get(handle).map(|c| c.bodies()),
        }
    }

    fn init_item(&mut self, item: SolveItem) {
        match item {
            SolveItem::Contact(index) => {
                if let Some(pair) = self.broadphase.pairs_mut().get_mut(index) {
                    pair.init(&self.shapes, &mut self.bodies, &self.config);
                }
            }
            SolveItem::Constraint(handle) => {
                if let Some(constraint) = self.constraints.get_mut(handle) {
                    constraint.init(&mut self.bodies, &self.config);
                }
            }
        }
    }

    fn resolve_item(&mut self, item: SolveItem) {
        match item {
            SolveItem::Contact(index) => {
                if let Some(pair) = self.broadphase.pairs_mut().get_mut(index) {
                    pair.resolve(&mut self.bodies);
                }
            }
            SolveItem::Constraint(handle) => {
                if let Some(constraint) = self.constraints.get_mut(handle) {
                    constraint.resolve(&mut self.bodies);
                }
            }
        }
    }

    /// A fast body next to a sleeping one waits for the sleeper to be woken.
    fn skip_resolve(&self, item: SolveItem) -> bool {
        let (b1, b2) = match self.item_bodies(item) {
            Some(pair) => pair,
            None => return true,
        };
        let (body1, body2) = match (self.bodies.get(b1), self.bodies.get(b2)) {
            (Some(body1), Some(body2)) => (body1, body2),
            _ => return true,
        };
        if !(body1.moves() && body2.moves()) {
            return false;
        }
        let threshold = self.config.sleep_wake_threshold;
        (body1.motion() > threshold && body2.is_sleeping())
            || (body2.motion() > threshold && body1.is_sleeping())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
