//! # Financial Market APIs Module
//!
//! This module groups together all logic and client implementations related to
//! market data providers. Its purpose is to abstract the details of interacting
//! with external market services, providing normalized quotes, movers and
//! session status to the rest of the system.
//!
//! ## Contained Modules:
//!
//! - **`quote`**: `Quote`, `DailyChange`, the `FetchError` taxonomy and the
//!   `QuoteSource` trait.
//! - **`yahoo`**: the Yahoo Finance chart client implementing `QuoteSource`.
//! - **`movers`**: top gainer / loser selection over a reference basket.
//! - **`session`**: the weekday time-of-day trading window and hour buckets.
//! - **`profiles`**: the table of monitored indices and their baskets.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Top movers ranking.
pub mod movers;
/// Index profile table.
pub mod profiles;
/// Quote types, fetch errors and the `QuoteSource` trait.
pub mod quote;
/// Trading window checks.
pub mod session;
/// Client for the Yahoo Finance chart API.
pub mod yahoo;

pub use movers::{MoverEntry, MoversRanker, MoversReport};
pub use profiles::{BasketEntry, IndexProfile};
pub use quote::{DailyChange, FetchError, Quote, QuoteSource};
pub use session::SessionClock;
