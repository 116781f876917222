//! Schema types and the typed per-call frame.

mod frame;
mod time;
mod types;

pub use frame::Frame;
pub use time::parse_timestamp;
pub use types::{ColumnKind, ColumnSchema, Schema, TargetColumn, TargetOrigin, SYNTHETIC_TARGET};
