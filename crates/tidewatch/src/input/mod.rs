//! Input parsing and raw table handling.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig};
pub use source::{DataTable, Record, Scalar, SourceMetadata};
