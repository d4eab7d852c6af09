//! Column schema inference
//!
//! Scans flattened rows and produces one typed descriptor per column path,
//! with ISO timestamp detection and a fixed conflict policy.

pub mod collation;
pub mod detect;
pub mod inference;
pub mod types;

pub use detect::{detect_type, detect_value_type};
pub use inference::{infer_schema, merge};
pub use types::{ColumnDescriptor, Schema, TypeTag};
