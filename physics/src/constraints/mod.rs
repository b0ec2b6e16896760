mod constraint_point;

pub use constraint_point::ConstraintPoint;

use crate::{
    body::{BodyArena, BodyHandle},
    config::Config,
};
use glam::Vec3;

/// A joint between two bodies, solved alongside the contacts.
pub trait Constraint: std::fmt::Debug + Send + Sync {
    fn bodies(&self) -> (BodyHandle, BodyHandle);
    /// Builds the solver rows for this step and warm starts them.
    fn init(&mut self, bodies: &mut BodyArena, config: &Config);
    fn resolve(&mut self, bodies: &mut BodyArena);
    /// Impulse applied to the first body.
    fn force(&self) -> Vec3;
    fn init_position(&mut self, _bodies: &BodyArena) {}
    /// One position correction pass, returns the remaining error.
    fn resolve_position(&mut self, bodies: &mut BodyArena, config: &Config) -> f32;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(pub u32);

#[derive(Debug, Default)]
pub struct ConstraintArena {
    constraints: Vec<Option<Box<dyn Constraint>>>,
}

impl ConstraintArena {
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    pub fn add(&mut self, constraint: Box<dyn Constraint>) -> ConstraintHandle {
        let handle = ConstraintHandle(self.constraints.len() as u32);
        self.constraints.push(Some(constraint));
        handle
    }

    pub fn remove(&mut self, handle: ConstraintHandle) -> Option<Box<dyn Constraint>> {
        self.constraints
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.take())
    }

    /// Removes every constraint attached to `body`, returns how many were removed.
    pub fn remove_body(&mut self, body: BodyHandle) -> usize {
        let mut removed = 0;
        for slot in self.constraints.iter_mut() {
            let attached = match slot {
                Some(constraint) => {
                    let (b1, b2) = constraint.bodies();
                    b1 == body || b2 == body
                }
                None => false,
            };
            if attached {
                *slot = None;
                removed += 1;
            }
        }
        removed
    }

    pub fn get(&self, handle: ConstraintHandle) -> Option<&dyn Constraint> {
        self.constraints
            .get(handle.0 as usize)
            .and_then(|slot| slot.as_deref())
    }

    pub(crate) fn get_mut(&mut self, handle: ConstraintHandle) -> Option<&mut Box<dyn Constraint>> {
        self.constraints
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.as_mut())
    }

    pub fn handles(&self) -> Vec<ConstraintHandle> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| ConstraintHandle(i as u32))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.constraints.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.constraints.clear();
    }
}
