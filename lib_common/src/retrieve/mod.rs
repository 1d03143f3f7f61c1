//! # Data Retrieval Module
//!
//! This module provides a centralized location for generic data retrieval
//! clients and utilities, primarily focused on HTTP-based interactions.
//!
//! ## Purpose:
//! The goal of the `retrieve` module is to offer a consistent and robust way
//! to fetch data from external services, encapsulating common concerns such
//! as HTTP request building, timeouts, error handling, and retry mechanisms.
//! This prevents duplication of networking logic across the market-data and
//! chat clients.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, with optional transport retries.
//! - **`retry`**: `retry_with_backoff`, a bounded exponential-backoff wrapper for
//!   operations whose success is decided by the caller.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with retry middleware for resilient network requests.
pub mod ky_http;
/// Bounded retry with exponential backoff around a single async operation.
pub mod retry;

pub use ky_http::{ApiClient, ApiClientOptions, ApiResponse, RetrieveError};
pub use retry::{retry_with_backoff, RetryPolicy};
