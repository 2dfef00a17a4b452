//! Reliability and data-shaping core for nycdata-mcp.
//!
//! This crate validates tool parameters, computes query windows, fetches rows
//! from NYC Open Data through a cached, retried, paginated path, enriches them
//! with borough and neighborhood geography, and collapses duplicates before
//! wrapping everything in a uniform response envelope. The per-dataset
//! operations live on [`control::OpenDataControl`].

pub mod config;
pub mod control;
pub mod dedup;
pub mod envelope;
pub mod error;
pub mod fields;
pub mod geo;
pub mod metrics;
pub mod reliability;
pub mod soql;
pub mod source;
pub mod trend;
pub mod validate;
pub mod window;

pub use config::{CacheTtl, Limits, ReliabilityConfig};
pub use control::OpenDataControl;
pub use error::{CoreError, CoreResult, InvalidInput};
pub use source::{RowSource, SocrataClient, SocrataConfig};
