//! Contact generation for every pair of shape types.
//!
//! Each generator handles one ordered pair of types. The dispatch table fills in the missing
//! orders by swapping the arguments, and treats a box as a hull when no box specific generator
//! exists.

pub mod clip;
mod hull;
mod primitives;
pub mod sat;
pub mod segment;

use crate::{manifold::ContactSet, shapes::Shape, shapes::ShapeType};
use glam::Vec3;

/// Selects one of the two shapes passed to a generator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

pub(crate) type Generator = fn(&mut ContactSet, &Shape, &Shape, f32);

#[derive(Copy, Clone)]
pub(crate) struct Dispatch {
    pub func: Generator,
    /// The generator expects the shapes in the other order.
    pub flipped: bool,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("flipped", &self.flipped)
            .finish()
    }
}

fn generator(t1: ShapeType, t2: ShapeType) -> Option<Generator> {
    use ShapeType::*;
    let func: Generator = match (t1, t2) {
        (Sphere, Sphere) => primitives::sphere_sphere,
        (Plane, Sphere) => primitives::plane_sphere,
        (Capsule, Sphere) => primitives::capsule_sphere,
        (Capsule, Capsule) => primitives::capsule_capsule,
        (Capsule, Plane) => primitives::capsule_plane,
        (Hull, Plane) => hull::hull_plane,
        (Hull, Sphere) => hull::hull_sphere,
        (Box, Sphere) => hull::box_sphere,
        (Hull, Hull) => hull::hull_hull,
        (Capsule, Hull) => hull::capsule_hull,
        _ => return None,
    };
    Some(func)
}

fn resolve(t1: ShapeType, t2: ShapeType) -> Option<Dispatch> {
    if let Some(func) = generator(t1, t2) {
        return Some(Dispatch {
            func,
            flipped: false,
        });
    }
    if let Some(func) = generator(t2, t1) {
        return Some(Dispatch {
            func,
            flipped: true,
        });
    }
    if t1 == ShapeType::Box {
        if let Some(dispatch) = resolve(ShapeType::Hull, t2) {
            return Some(dispatch);
        }
    }
    if t2 == ShapeType::Box {
        return resolve(t1, ShapeType::Hull);
    }
    None
}

/// Generator lookup by the ordered pair of shape types. Pairs without an entry, such as two
/// planes, never collide.
#[derive(Debug)]
pub(crate) struct DispatchTable {
    entries: [[Option<Dispatch>; ShapeType::COUNT]; ShapeType::COUNT],
}

impl DispatchTable {
    pub fn new() -> Self {
        use ShapeType::*;
        let types = [Sphere, Capsule, Hull, Box, Plane];
        let mut entries = [[None; ShapeType::COUNT]; ShapeType::COUNT];
        for &t1 in types.iter() {
            for &t2 in types.iter() {
                entries[t1 as usize][t2 as usize] = resolve(t1, t2);
            }
        }
        Self { entries }
    }

    pub fn get(&self, t1: ShapeType, t2: ShapeType) -> Option<Dispatch> {
        self.entries[t1 as usize][t2 as usize]
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum CachedFeature {
    None,
    Face(usize),
    Edges(usize, usize),
}

/// Separating axis found on the last frame between two hulls.
#[derive(Copy, Clone, Debug)]
pub(crate) struct CachedAxis {
    /// Points out of the reference shape.
    pub axis: Vec3,
    pub reference: Side,
    pub feature: CachedFeature,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{manifold::ContactPoint, shapes::ShapeHandle};

    pub(crate) fn contact_set(a: &Shape, b: &Shape) -> ContactSet {
        ContactSet::new(ShapeHandle(0), a, ShapeHandle(1), b, &DispatchTable::new())
    }

    pub(crate) fn collide(a: &Shape, b: &Shape) -> Vec<ContactPoint> {
        let mut set = contact_set(a, b);
        set.generate(a, b, 0.01);
        set.points().to_vec()
    }

    #[test]
    fn test_dispatch_table() {
        use ShapeType::*;
        let table = DispatchTable::new();
        assert!(!table.get(Sphere, Sphere).unwrap().flipped);
        assert!(table.get(Sphere, Plane).unwrap().flipped);
        assert!(!table.get(Plane, Sphere).unwrap().flipped);
        // boxes fall back to the hull generators
        assert!(!table.get(Box, Plane).unwrap().flipped);
        assert!(table.get(Plane, Box).unwrap().flipped);
        assert!(!table.get(Box, Box).unwrap().flipped);
        assert!(table.get(Box, Capsule).unwrap().flipped);
        assert!(table.get(Plane, Plane).is_none());
    }
}
