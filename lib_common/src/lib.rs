//! Shared building blocks for the index alert bots.
//!
//! Every top-level module sits behind a cargo feature of the same name; `full`
//! (the default) enables them all.

#[cfg(feature = "alerts")]
pub mod alerts;
#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "markets")]
pub mod markets;
#[cfg(feature = "notifiers")]
pub mod notifiers;
#[cfg(feature = "retrieve")]
pub mod retrieve;
