mod hull_builder;
mod shape_box;
mod shape_capsule;
mod shape_hull;
mod shape_plane;
mod shape_sphere;

use crate::{body::BodyHandle, bounds::Bounds, config::Material, math::Pose};
use glam::{Mat3, Vec3};

pub use shape_box::ShapeBox;
pub use shape_capsule::ShapeCapsule;
pub use shape_hull::{Edge, Face, ShapeHull};
pub use shape_plane::ShapePlane;
pub use shape_sphere::ShapeSphere;

/// Mass properties of a single shape, inertia is about `center`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MassInfo {
    pub mass: f32,
    pub center: Vec3,
    pub inertia: Mat3,
}

impl Default for MassInfo {
    fn default() -> Self {
        Self {
            mass: 0.0,
            center: Vec3::ZERO,
            inertia: Mat3::ZERO,
        }
    }
}

/// A ray with a normalized direction.
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub pos: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(pos: Vec3, dir: Vec3) -> Self {
        Self {
            pos,
            dir: dir.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.pos + self.dir * t
    }
}

trait ShapeTrait {
    /// Recompute world geometry from the owning body's origin transform.
    fn update(&mut self, pose: &Pose);
    fn bounds(&self) -> Bounds;
    fn mass_info(&self, density: f32) -> MassInfo;
    /// Distance along the ray to the first hit.
    fn intersect(&self, ray: &Ray) -> Option<f32>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Sphere = 0,
    Capsule = 1,
    Hull = 2,
    Box = 3,
    Plane = 4,
}

impl ShapeType {
    pub const COUNT: usize = 5;
}

#[derive(Clone, Debug)]
pub enum ShapeKind {
    Sphere(ShapeSphere),
    Capsule(ShapeCapsule),
    Hull(ShapeHull),
    Box(ShapeBox),
    Plane(ShapePlane),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeHandle(pub u32);

impl Default for ShapeHandle {
    // default to invalid value
    fn default() -> Self {
        Self(u32::MAX)
    }
}

#[derive(Clone, Debug)]
pub struct Shape {
    pub kind: ShapeKind,
    pub material: Material,
    bounds: Bounds,
    pub(crate) body: Option<BodyHandle>,
}

impl Shape {
    pub fn new(kind: ShapeKind) -> Self {
        let mut shape = Self {
            kind,
            material: Material::default(),
            bounds: Bounds::new(),
            body: None,
        };
        shape.update(&Pose::IDENTITY);
        shape
    }

    pub fn make_sphere(center: Vec3, radius: f32) -> Self {
        Self::new(ShapeKind::Sphere(ShapeSphere::new(center, radius)))
    }

    pub fn make_capsule(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self::new(ShapeKind::Capsule(ShapeCapsule::new(start, end, radius)))
    }

    pub fn make_hull(hull: ShapeHull) -> Self {
        Self::new(ShapeKind::Hull(hull))
    }

    pub fn make_box(data: ShapeBox) -> Self {
        Self::new(ShapeKind::Box(data))
    }

    pub fn make_plane(normal: Vec3, offset: f32) -> Self {
        Self::new(ShapeKind::Plane(ShapePlane::new(normal, offset)))
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    fn shape_trait(&self) -> &dyn ShapeTrait {
        match &self.kind {
            ShapeKind::Sphere(data) => data,
            ShapeKind::Capsule(data) => data,
            ShapeKind::Hull(data) => data,
            ShapeKind::Box(data) => data,
            ShapeKind::Plane(data) => data,
        }
    }

    fn shape_trait_mut(&mut self) -> &mut dyn ShapeTrait {
        match &mut self.kind {
            ShapeKind::Sphere(data) => data,
            ShapeKind::Capsule(data) => data,
            ShapeKind::Hull(data) => data,
            ShapeKind::Box(data) => data,
            ShapeKind::Plane(data) => data,
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        match self.kind {
            ShapeKind::Sphere(_) => ShapeType::Sphere,
            ShapeKind::Capsule(_) => ShapeType::Capsule,
            ShapeKind::Hull(_) => ShapeType::Hull,
            ShapeKind::Box(_) => ShapeType::Box,
            ShapeKind::Plane(_) => ShapeType::Plane,
        }
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    /// World space bounding box, valid after the last `update`.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn update(&mut self, pose: &Pose) {
        self.shape_trait_mut().update(pose);
        self.bounds = self.shape_trait().bounds();
    }

    pub fn mass_info(&self) -> MassInfo {
        self.shape_trait().mass_info(self.material.density)
    }

    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.shape_trait().intersect(ray)
    }

    pub fn sphere(&self) -> Option<&ShapeSphere> {
        match &self.kind {
            ShapeKind::Sphere(data) => Some(data),
            _ => None,
        }
    }

    pub fn capsule(&self) -> Option<&ShapeCapsule> {
        match &self.kind {
            ShapeKind::Capsule(data) => Some(data),
            _ => None,
        }
    }

    /// The polyhedron of either a hull or a box.
    pub fn hull(&self) -> Option<&ShapeHull> {
        match &self.kind {
            ShapeKind::Hull(data) => Some(data),
            ShapeKind::Box(data) => Some(data.hull()),
            _ => None,
        }
    }

    pub fn cuboid(&self) -> Option<&ShapeBox> {
        match &self.kind {
            ShapeKind::Box(data) => Some(data),
            _ => None,
        }
    }

    pub fn plane(&self) -> Option<&ShapePlane> {
        match &self.kind {
            ShapeKind::Plane(data) => Some(data),
            _ => None,
        }
    }
}

/// Slot storage for shapes, handles stay valid until the shape is removed.
#[derive(Clone, Debug, Default)]
pub struct ShapeArena {
    shapes: Vec<Option<Shape>>,
}

impl ShapeArena {
    pub fn new() -> Self {
        Self { shapes: Vec::new() }
    }

    pub fn add(&mut self, shape: Shape) -> ShapeHandle {
        let handle = ShapeHandle(self.shapes.len() as u32);
        self.shapes.push(Some(shape));
        handle
    }

    pub fn remove(&mut self, handle: ShapeHandle) -> Option<Shape> {
        self.shapes
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.take())
    }

    pub fn get(&self, handle: ShapeHandle) -> Option<&Shape> {
        self.shapes
            .get(handle.0 as usize)
            .and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, handle: ShapeHandle) -> Option<&mut Shape> {
        self.shapes
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShapeHandle, &Shape)> {
        self.shapes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|shape| (ShapeHandle(i as u32), shape)))
    }

    pub fn len(&self) -> usize {
        self.shapes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::ops::Index<ShapeHandle> for ShapeArena {
    type Output = Shape;
    fn index(&self, handle: ShapeHandle) -> &Shape {
        match self.get(handle) {
            Some(shape) => shape,
            None => panic!("invalid shape handle {}", handle.0),
        }
    }
}

impl std::ops::IndexMut<ShapeHandle> for ShapeArena {
    fn index_mut(&mut self, handle: ShapeHandle) -> &mut Shape {
        match self.get_mut(handle) {
            Some(shape) => shape,
            None => panic!("invalid shape handle {}", handle.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_handles_survive_removal() {
        let mut arena = ShapeArena::new();
        let a = arena.add(Shape::make_sphere(Vec3::ZERO, 1.0));
        let b = arena.add(Shape::make_sphere(Vec3::X, 0.5));
        assert_eq!(arena.remove(a).map(|s| s.shape_type()), Some(ShapeType::Sphere));
        assert!(arena.get(a).is_none());
        assert_eq!(arena[b].sphere().map(|s| s.radius), Some(0.5));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_unattached_shape_bounds() {
        let shape = Shape::make_sphere(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let bounds = shape.bounds();
        assert!(bounds
            .mins
            .abs_diff_eq(Vec3::new(0.5, 1.5, 2.5), 1e-6));
        assert!(bounds.maxs.abs_diff_eq(Vec3::new(1.5, 2.5, 3.5), 1e-6));
        assert!(shape.body().is_none());
    }
}
