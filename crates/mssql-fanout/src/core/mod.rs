//! Core metadata types and traits shared by every stage of a transfer.
//!
//! - [`schema`]: source types, columns and table specs
//! - [`identifier`]: identifier validation and quoting primitives
//! - [`traits`]: the `Dialect` and `TypeMapper` strategies

pub mod identifier;
pub mod schema;
pub mod traits;

pub use schema::{ColumnDefinition, SourceType, TableSpec, TypeFamily, UNBOUNDED_LENGTH};
pub use traits::{Dialect, TypeMapper};
