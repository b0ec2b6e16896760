//! Jacobian row blocks shared by contacts and constraints.
//!
//! Every row caches its Jacobian and the Jacobian premultiplied by the inverse mass of each body,
//! so applying an impulse is a scaled add. The accumulated impulse survives re-initialisation and
//! is reapplied on `init`, which is what warm starts the solver between frames.

mod jac1;
mod jac2;
mod jac3;

pub use jac1::Jac1;
pub use jac2::Jac2;
pub use jac3::Jac3;

/// Impulse bound used for rows without a limit.
pub const UNBOUNDED: f32 = 1e9;
