//! HTTP handlers for model CRUD and query documents.

pub mod entity;
pub mod query;
