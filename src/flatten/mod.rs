//! JSON flattening - project nested JSON into flat rows
//!
//! Every top-level item becomes one row. Nested values are addressed by
//! column paths: dotted segments for object keys and bracketed indices for
//! array elements, e.g. `orders[0].items[2].sku`.

pub mod flattener;
pub mod types;

pub use flattener::{flatten, index_path, key_path};
pub use types::{Cell, FlatRow, ROW_ID_COLUMN};
