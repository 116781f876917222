//! Schema inference for uploaded tables.

mod detector;

pub use detector::{feature_weight, SchemaDetector};
