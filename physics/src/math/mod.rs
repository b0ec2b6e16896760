pub mod glam_ext;
mod pose;

pub use pose::Pose;

/// Lengths below this are treated as zero when normalizing.
pub(crate) const EPSILON: f32 = 1e-4;
