//! Reliability layer between dataset operations and the open-data API.
//!
//! Four composable pieces: a TTL query cache, an exponential-backoff retry
//! combinator, an auto-paginator, and an advisory rate tracker that also
//! enforces hard caps before a request is issued.

pub mod cache;
pub mod paginate;
pub mod rate;
pub mod retry;

pub use cache::{Cached, QueryCache, cache_key};
pub use paginate::{PageOptions, auto_paginate};
pub use rate::{RateSnapshot, RateTracker};
pub use retry::{RetryPolicy, with_retry};
