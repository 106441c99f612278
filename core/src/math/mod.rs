pub mod interp;
pub mod matrix;
pub mod quaternion;
pub mod stats;

pub use interp::lagrange4;
pub use matrix::MatrixHelper;
pub use quaternion::{Quaternion, RotationVector};
pub use stats::StatsHelper;
