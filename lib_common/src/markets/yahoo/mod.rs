//! # Yahoo Finance Integration Module
//!
//! ## Contained Modules:
//!
//! - **`apicall`**: `YahooChartClient`, the HTTP client for the v8 chart endpoint.
//! - **`chart`**: serde schema of the chart response and its projections into
//!   quotes and daily changes.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Client for the Yahoo v8 chart endpoint.
pub mod apicall;
/// Chart response schema.
pub mod chart;

pub use apicall::{YahooChartClient, DEFAULT_CHART_URL};
