//! # Alerts Module
//!
//! The hourly summary: rendering (`formatter`) and the session-gated,
//! once-per-hour polling loop that drives fetching and delivery (`polling`).

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Markdown rendering of index sections.
pub mod formatter;
/// The polling state machine.
pub mod polling;

pub use formatter::{AlertFormatter, Locale};
pub use polling::{AlertState, PollingLoop, TickOutcome, DEFAULT_POLL_INTERVAL};
