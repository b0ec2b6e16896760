pub mod body;
pub mod bounds;
pub mod broadphase;
pub mod config;
pub mod constraints;
pub mod contact;
pub mod error;
pub mod generators;
pub mod gjk;
pub mod manifold;
pub mod math;
pub mod narrowphase;
mod perf;
pub mod scene;
pub mod scene_shapes;
pub mod shapes;
pub mod solvers;
pub mod world;

pub use body::{Body, BodyArena, BodyHandle};
pub use config::{Combine, Config, InertiaMode, Material};
pub use constraints::{Constraint, ConstraintHandle, ConstraintPoint};
pub use error::PhysicsError;
pub use generators::{ForceGenerator, GeneratorHandle, Spring};
pub use manifold::ContactSet;
pub use math::Pose;
pub use perf::Perf;
pub use shapes::{Ray, Shape, ShapeBox, ShapeHandle, ShapeHull};
pub use world::World;
