//! # Hourly Alert Polling Loop
//!
//! Ticks on a fixed sleep measured from the end of the previous tick:
//!
//! 1. **Checking**: skip when the session is closed, or when this hour bucket
//!    has already been alerted.
//! 2. **Fetching**: quote every configured index and rank its basket. A failed
//!    index quote becomes a placeholder section; an empty movers report just
//!    omits the movers block.
//! 3. **Sending**: compose and deliver. Only a confirmed delivery records the
//!    hour, so a failed send is retried on the next tick of the same hour.
//!
//! A tick that fails or panics is logged and the loop carries on.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use log::{debug, error, info, warn};

use crate::alerts::formatter::AlertFormatter;
use crate::markets::{IndexProfile, MoversRanker, QuoteSource, SessionClock};
use crate::notifiers::AlertSink;

/// Default sleep between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// The only state that survives between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    /// Hour bucket of the last confirmed delivery.
    pub last_alerted_hour: Option<u32>,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Outside the trading window; nothing fetched.
    SessionClosed,
    /// This hour was already delivered; nothing fetched.
    AlreadyAlerted {
        /// Current hour bucket.
        hour: u32,
    },
    /// Every index quote failed; nothing sent.
    NoData {
        /// Current hour bucket.
        hour: u32,
    },
    /// Alert delivered and the hour recorded.
    Sent {
        /// Hour bucket now recorded.
        hour: u32,
    },
    /// Delivery failed after all retries; the hour stays unrecorded.
    SendFailed {
        /// Hour bucket that will be retried.
        hour: u32,
    },
}

/// Orchestrates quote fetching, movers ranking, formatting and delivery.
pub struct PollingLoop<Q: QuoteSource, S: AlertSink> {
    source: Arc<Q>,
    ranker: MoversRanker<Q>,
    sink: S,
    clock: SessionClock,
    formatter: AlertFormatter,
    profiles: Vec<IndexProfile>,
    poll_interval: Duration,
    state: AlertState,
    now: fn() -> DateTime<Utc>,
}

impl<Q: QuoteSource, S: AlertSink> PollingLoop<Q, S> {
    /// Creates a loop with an empty [`AlertState`].
    pub fn new(
        source: Arc<Q>,
        sink: S,
        clock: SessionClock,
        formatter: AlertFormatter,
        profiles: Vec<IndexProfile>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            ranker: MoversRanker::new(Arc::clone(&source)),
            source,
            sink,
            clock,
            formatter,
            profiles,
            poll_interval,
            state: AlertState::default(),
            now: Utc::now,
        }
    }

    /// Replaces the wall clock `run` reads at the start of every tick.
    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Replaces the alert state, e.g. to resume a known hour.
    pub fn with_state(mut self, state: AlertState) -> Self {
        self.state = state;
        self
    }

    /// Current alert state.
    pub fn state(&self) -> AlertState {
        self.state
    }

    /// The delivery sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Runs one Checking → Fetching → Sending pass for `now`.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> anyhow::Result<TickOutcome> {
        if !self.clock.is_session_open(&now) {
            info!("Market session closed at {}, skipping", now.with_timezone(&self.clock.timezone()));
            return Ok(TickOutcome::SessionClosed);
        }

        let hour = self.clock.hour_bucket(&now);
        if self.state.last_alerted_hour == Some(hour) {
            debug!("Alert for hour {} already sent", hour);
            return Ok(TickOutcome::AlreadyAlerted { hour });
        }

        if self.profiles.is_empty() {
            anyhow::bail!("no index profiles configured");
        }

        let mut sections = Vec::with_capacity(self.profiles.len());
        let mut quoted = 0usize;
        for profile in &self.profiles {
            match self.source.fetch_quote(&profile.symbol).await {
                Ok(quote) => {
                    info!("Current {} price: {:.2}", profile.display_name, quote.price);
                    let movers = self.ranker.rank(&profile.basket).await;
                    if movers.is_none() && !profile.basket.is_empty() {
                        warn!("No movers data available for {}", profile.display_name);
                    }
                    sections.push(self.formatter.format(&profile.display_name, &quote, movers.as_ref()));
                    quoted += 1;
                }
                Err(e) => {
                    warn!("Failed to retrieve {} price data: {}", profile.display_name, e);
                    sections.push(self.formatter.unavailable(&profile.display_name));
                }
            }
        }

        if quoted == 0 {
            warn!("No index data available for hour {}, nothing sent", hour);
            return Ok(TickOutcome::NoData { hour });
        }

        let message = self
            .formatter
            .compose(&sections, &now.with_timezone(&self.clock.timezone()));

        if self.sink.send(&message).await {
            self.state.last_alerted_hour = Some(hour);
            info!("Alert sent for hour {}", hour);
            Ok(TickOutcome::Sent { hour })
        } else {
            error!("Alert for hour {} was not delivered, will retry on next tick", hour);
            Ok(TickOutcome::SendFailed { hour })
        }
    }

    /// Ticks forever, sleeping the poll interval after each tick ends.
    pub async fn run(&mut self) {
        info!(
            "Polling every {}s, session {}-{} {}",
            self.poll_interval.as_secs(),
            self.clock.open().format("%H:%M"),
            self.clock.close().format("%H:%M"),
            self.clock.timezone().name()
        );

        loop {
            let now = (self.now)();
            match AssertUnwindSafe(self.tick(now)).catch_unwind().await {
                Ok(Ok(outcome)) => debug!("Tick finished: {:?}", outcome),
                Ok(Err(e)) => error!("Error in main loop: {:#}", e),
                Err(_) => error!("Tick panicked, continuing with next tick"),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
