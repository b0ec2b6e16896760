use crate::{
    body::{BodyArena, BodyHandle},
    math::EPSILON,
};
use glam::Vec3;

/// Adds forces to bodies at the start of each step.
pub trait ForceGenerator: std::fmt::Debug + Send + Sync {
    fn bodies(&self) -> (BodyHandle, BodyHandle);
    fn apply(&mut self, bodies: &mut BodyArena);
}

/// Linear spring between two local anchors.
#[derive(Clone, Debug)]
pub struct Spring {
    pub body1: BodyHandle,
    pub body2: BodyHandle,
    pub local1: Vec3,
    pub local2: Vec3,
    pub rest_length: f32,
    pub stiffness: f32,
}

impl Spring {
    pub fn new(
        body1: BodyHandle,
        body2: BodyHandle,
        local1: Vec3,
        local2: Vec3,
        rest_length: f32,
        stiffness: f32,
    ) -> Self {
        Self {
            body1,
            body2,
            local1,
            local2,
            rest_length,
            stiffness,
        }
    }
}

impl ForceGenerator for Spring {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body1, self.body2)
    }

    fn apply(&mut self, bodies: &mut BodyArena) {
        let (body1, body2) = bodies.get_body_pair_mut(self.body1, self.body2);
        let pos1 = body1.local_to_world(self.local1);
        let pos2 = body2.local_to_world(self.local2);
        let rel = pos1 - pos2;
        let length = rel.length();
        let coeff = self.stiffness * (self.rest_length - length);
        let force = if length > EPSILON {
            rel * (coeff / length)
        } else {
            Vec3::new(0.0, 0.0, coeff)
        };
        body1.add_force_at(force, pos1);
        body2.add_force_at(-force, pos2);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratorHandle(pub u32);

#[derive(Debug, Default)]
pub struct GeneratorArena {
    generators: Vec<Option<Box<dyn ForceGenerator>>>,
}

impl GeneratorArena {
    pub fn new() -> Self {
        Self {
            generators: Vec::new(),
        }
    }

    pub fn add(&mut self, generator: Box<dyn ForceGenerator>) -> GeneratorHandle {
        let handle = GeneratorHandle(self.generators.len() as u32);
        self.generators.push(Some(generator));
        handle
    }

    pub fn remove(&mut self, handle: GeneratorHandle) -> Option<Box<dyn ForceGenerator>> {
        self.generators
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.take())
    }

    /// Removes every generator acting on `body`.
    pub fn remove_body(&mut self, body: BodyHandle) -> usize {
        let mut removed = 0;
        for slot in self.generators.iter_mut() {
            let attached = slot.as_ref().map_or(false, |generator| {
                let (b1, b2) = generator.bodies();
                b1 == body || b2 == body
            });
            if attached {
                *slot = None;
                removed += 1;
            }
        }
        removed
    }

    pub fn get(&self, handle: GeneratorHandle) -> Option<&dyn ForceGenerator> {
        self.generators
            .get(handle.0 as usize)
            .and_then(|slot| slot.as_deref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ForceGenerator>> {
        self.generators.iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn len(&self) -> usize {
        self.generators.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.generators.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        body::Body,
        shapes::{Shape, ShapeArena},
    };

    fn ball(shapes: &mut ShapeArena, bodies: &mut BodyArena, pos: Vec3) -> BodyHandle {
        let handle = bodies.add(Body::from_translation(pos));
        let mut shape = Shape::make_sphere(Vec3::ZERO, 0.5);
        shape.body = Some(handle);
        let shape = shapes.add(shape);
        let body = bodies.get_body_mut(handle);
        body.attach_shape(shape);
        body.update_shape(shapes);
        body.calculate_transform(shapes);
        handle
    }

    #[test]
    fn test_stretched_spring_pulls_together() {
        let mut shapes = ShapeArena::new();
        let mut bodies = BodyArena::new();
        let a = ball(&mut shapes, &mut bodies, Vec3::new(-1.0, 0.0, 0.0));
        let b = ball(&mut shapes, &mut bodies, Vec3::new(1.0, 0.0, 0.0));
        let mut spring = Spring::new(a, b, Vec3::ZERO, Vec3::ZERO, 1.0, 10.0);
        spring.apply(&mut bodies);
        // stretched by one unit
        assert!(bodies
            .get_body(a)
            .force()
            .abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-5));
        assert!(bodies
            .get_body(b)
            .force()
            .abs_diff_eq(Vec3::new(-10.0, 0.0, 0.0), 1e-5));
        assert!(bodies.get_body(a).torque().abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn test_coincident_anchors_push_along_z() {
        let mut shapes = ShapeArena::new();
        let mut bodies = BodyArena::new();
        let a = ball(&mut shapes, &mut bodies, Vec3::ZERO);
        let b = ball(&mut shapes, &mut bodies, Vec3::ZERO);
        let mut spring = Spring::new(a, b, Vec3::ZERO, Vec3::ZERO, 0.5, 4.0);
        spring.apply(&mut bodies);
        assert!(bodies
            .get_body(a)
            .force()
            .abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-6));
    }

    #[test]
    fn test_remove_body_drops_generators() {
        let mut arena = GeneratorArena::new();
        let (a, b, c) = (BodyHandle(0), BodyHandle(1), BodyHandle(2));
        arena.add(Box::new(Spring::new(a, b, Vec3::ZERO, Vec3::ZERO, 1.0, 1.0)));
        let kept = arena.add(Box::new(Spring::new(b, c, Vec3::ZERO, Vec3::ZERO, 1.0, 1.0)));
        assert_eq!(arena.remove_body(a), 1);
        assert_eq!(arena.len(), 1);
        assert!(arena.get(kept).is_some());
    }
}
