//! JSON-to-SQL: query IR, operator registry, value encoder, and the compiler.
//! Identifiers come from the caller (validated against the loaded model); values are escaped
//! or bound as parameters.

pub mod compiler;
pub mod document;
pub mod encoder;
mod ir;
pub mod operators;
pub mod params;

pub use crate::error::QueryError;
pub use compiler::{ColumnTypes, Compiler, QueryBuf};
pub use document::{parse_query, QueryDocument};
pub use ir::*;
pub use operators::{standard_registry, OperatorRegistry};
pub use params::PgBindValue;
