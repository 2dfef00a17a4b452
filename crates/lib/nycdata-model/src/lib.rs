//! Canonical data model for nycdata-mcp.
//!
//! This crate defines the wire shapes shared by the reliability core, the
//! dataset operations, and the MCP tool surface, along with the catalogue of
//! NYC Open Data datasets the server knows how to query.

pub mod models;
pub mod schema;

pub use models::*;
