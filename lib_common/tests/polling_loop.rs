//! Drives `PollingLoop::tick` with in-memory market data and a recording sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::time::{timeout, Instant};

use lib_common::alerts::{AlertFormatter, AlertState, Locale, PollingLoop, TickOutcome};
use lib_common::markets::profiles::builtin_profiles;
use lib_common::markets::{BasketEntry, DailyChange, FetchError, IndexProfile, Quote, QuoteSource, SessionClock};
use lib_common::notifiers::AlertSink;

#[derive(Default)]
struct FakeMarket {
    prices: HashMap<String, (f64, f64)>,
    changes: HashMap<String, f64>,
    calls: AtomicUsize,
}

impl FakeMarket {
    fn with_price(mut self, symbol: &str, price: f64, previous_close: f64) -> Self {
        self.prices.insert(symbol.to_string(), (price, previous_close));
        self
    }

    fn with_change(mut self, symbol: &str, change_percent: f64) -> Self {
        self.changes.insert(symbol.to_string(), change_percent);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for FakeMarket {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.prices.get(symbol) {
            Some((price, prev)) => Quote::from_prices(symbol, *price, *prev, Utc::now()),
            None => Err(FetchError::Network(format!("no route to {}", symbol))),
        }
    }

    async fn fetch_daily_change(&self, symbol: &str) -> Result<DailyChange, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.changes.get(symbol) {
            Some(pct) => Ok(DailyChange {
                price: 100.0,
                change_percent: *pct,
            }),
            None => Err(FetchError::Upstream {
                status: 404,
                detail: "No data found".to_string(),
            }),
        }
    }
}

struct RecordingSink {
    accept: AtomicBool,
    sent: Mutex<Vec<String>>,
    attempts: AtomicUsize,
}

impl RecordingSink {
    fn new(accept: bool) -> Self {
        Self {
            accept: AtomicBool::new(accept),
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, message: &str) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.accept.load(Ordering::SeqCst) {
            self.sent.lock().unwrap().push(message.to_string());
            true
        } else {
            false
        }
    }
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap()
}

fn sp500() -> IndexProfile {
    builtin_profiles().into_iter().find(|p| p.key == "sp500").unwrap()
}

fn full_market() -> FakeMarket {
    FakeMarket::default()
        .with_price("^GSPC", 5050.0, 5000.0)
        .with_change("AAPL", 1.2)
        .with_change("TSLA", -3.4)
        .with_change("NVDA", 4.1)
        .with_change("AMZN", 0.3)
        .with_change("GOOGL", -0.5)
        .with_change("META", 2.0)
}

fn polling(
    market: FakeMarket,
    sink: RecordingSink,
    profiles: Vec<IndexProfile>,
) -> (Arc<FakeMarket>, PollingLoop<FakeMarket, RecordingSink>) {
    let market = Arc::new(market);
    let lp = PollingLoop::new(
        Arc::clone(&market),
        sink,
        SessionClock::default(),
        AlertFormatter::new(Locale::En),
        profiles,
        Duration::from_secs(60),
    );
    (market, lp)
}

#[tokio::test]
async fn closed_session_fetches_nothing() {
    let (market, mut lp) = polling(full_market(), RecordingSink::new(true), vec![sp500()]);

    // Wednesday before the open, and a Saturday inside the usual hours.
    assert_eq!(lp.tick(at(15, 14, 29)).await.unwrap(), TickOutcome::SessionClosed);
    assert_eq!(lp.tick(at(18, 16, 0)).await.unwrap(), TickOutcome::SessionClosed);

    assert_eq!(market.calls(), 0);
    assert!(lp.sink().messages().is_empty());
    assert_eq!(lp.state().last_alerted_hour, None);
}

#[tokio::test]
async fn already_alerted_hour_is_skipped_without_fetching() {
    let (market, lp) = polling(full_market(), RecordingSink::new(true), vec![sp500()]);
    let mut lp = lp.with_state(AlertState {
        last_alerted_hour: Some(15),
    });

    assert_eq!(lp.tick(at(15, 15, 40)).await.unwrap(), TickOutcome::AlreadyAlerted { hour: 15 });
    assert_eq!(market.calls(), 0);
    assert!(lp.sink().messages().is_empty());
}

#[tokio::test]
async fn new_hour_sends_summary_and_records_hour() {
    let (_market, lp) = polling(full_market(), RecordingSink::new(true), vec![sp500()]);
    let mut lp = lp.with_state(AlertState {
        last_alerted_hour: Some(15),
    });

    assert_eq!(lp.tick(at(15, 16, 1)).await.unwrap(), TickOutcome::Sent { hour: 16 });
    assert_eq!(lp.state().last_alerted_hour, Some(16));

    let messages = lp.sink().messages();
    assert_eq!(messages.len(), 1);
    let text = &messages[0];
    assert!(text.contains("S&P 500 Hourly Update"));
    assert!(text.contains("$5050.00"));
    assert!(text.contains("+50.00 (+1.00%)"));
    assert!(text.contains("NVIDIA (NVDA) +4.10%"), "{}", text);
    assert!(text.contains("(TSLA) -3.40%"), "{}", text);
    assert!(text.contains("2024-05-15 16:01:00"));

    // Second tick in the same hour does nothing.
    assert_eq!(lp.tick(at(15, 16, 30)).await.unwrap(), TickOutcome::AlreadyAlerted { hour: 16 });
    assert_eq!(lp.sink().messages().len(), 1);
}

#[tokio::test]
async fn failed_send_is_retried_on_next_tick() {
    let (_market, lp) = polling(full_market(), RecordingSink::new(false), vec![sp500()]);
    let mut lp = lp.with_state(AlertState {
        last_alerted_hour: Some(15),
    });

    assert_eq!(lp.tick(at(15, 16, 5)).await.unwrap(), TickOutcome::SendFailed { hour: 16 });
    assert_eq!(lp.state().last_alerted_hour, Some(15));

    lp.sink().accept.store(true, Ordering::SeqCst);
    assert_eq!(lp.tick(at(15, 16, 6)).await.unwrap(), TickOutcome::Sent { hour: 16 });
    assert_eq!(lp.state().last_alerted_hour, Some(16));
    assert_eq!(lp.sink().attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn every_quote_failing_sends_nothing() {
    let market = FakeMarket::default().with_change("AAPL", 1.0);
    let (_market, mut lp) = polling(market, RecordingSink::new(true), vec![sp500()]);

    assert_eq!(lp.tick(at(15, 17, 0)).await.unwrap(), TickOutcome::NoData { hour: 17 });
    assert_eq!(lp.state().last_alerted_hour, None);
    assert_eq!(lp.sink().attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn partial_failure_sends_placeholder_section() {
    let dow = builtin_profiles().into_iter().find(|p| p.key == "dow").unwrap();
    let (_market, mut lp) = polling(full_market(), RecordingSink::new(true), vec![sp500(), dow]);

    assert_eq!(lp.tick(at(15, 18, 0)).await.unwrap(), TickOutcome::Sent { hour: 18 });
    let text = &lp.sink().messages()[0];
    assert!(text.contains("S&P 500 Hourly Update"));
    assert!(text.contains("Dow Jones:* data unavailable"), "{}", text);
}

#[tokio::test]
async fn missing_movers_omit_the_movers_block() {
    let market = FakeMarket::default().with_price("^TEST", 99.0, 100.0);
    let profile = IndexProfile {
        key: "test".to_string(),
        symbol: "^TEST".to_string(),
        display_name: "Test Index".to_string(),
        basket: vec![BasketEntry::new("AAA", "Alpha"), BasketEntry::new("BBB", "Beta")],
    };
    let (_market, mut lp) = polling(market, RecordingSink::new(true), vec![profile]);

    assert_eq!(lp.tick(at(15, 19, 0)).await.unwrap(), TickOutcome::Sent { hour: 19 });
    let text = &lp.sink().messages()[0];
    assert!(text.contains("📉"));
    assert!(text.contains("-1.00 (-1.00%)"));
    assert!(!text.contains("Market Movers"));
}

#[tokio::test]
async fn no_profiles_is_a_tick_error() {
    let (_market, mut lp) = polling(full_market(), RecordingSink::new(true), Vec::new());
    assert!(lp.tick(at(15, 16, 0)).await.is_err());
    assert_eq!(lp.state().last_alerted_hour, None);
}

/// Panics on the first quote, fails the second after 10s of work, then serves a price.
struct UnstableMarket {
    calls: AtomicUsize,
    started: Mutex<Vec<Instant>>,
}

#[async_trait]
impl QuoteSource for UnstableMarket {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        self.started.lock().unwrap().push(Instant::now());
        match self.calls.fetch_add(1, Ordering::SeqCst) {
            0 => panic!("malformed payload for {}", symbol),
            1 => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Err(FetchError::Network("connection reset".to_string()))
            }
            _ => Quote::from_prices(symbol, 5050.0, 5000.0, Utc::now()),
        }
    }

    async fn fetch_daily_change(&self, _symbol: &str) -> Result<DailyChange, FetchError> {
        Err(FetchError::Parse("no closes".to_string()))
    }
}

fn wednesday_afternoon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, 16, 0, 0).unwrap()
}

#[tokio::test(start_paused = true)]
async fn run_survives_panicking_and_failing_ticks() {
    let market = Arc::new(UnstableMarket {
        calls: AtomicUsize::new(0),
        started: Mutex::new(Vec::new()),
    });
    let mut lp = PollingLoop::new(
        Arc::clone(&market),
        RecordingSink::new(true),
        SessionClock::default(),
        AlertFormatter::new(Locale::En),
        vec![sp500()],
        Duration::from_secs(60),
    )
    .with_clock(wednesday_afternoon);

    let origin = Instant::now();
    assert!(timeout(Duration::from_secs(250), lp.run()).await.is_err());

    // Panic at 0s, failed tick 60s..70s, sent at 130s, then only hour checks.
    let offsets: Vec<Duration> = market.started.lock().unwrap().iter().map(|t| *t - origin).collect();
    assert_eq!(
        offsets,
        vec![Duration::from_secs(0), Duration::from_secs(60), Duration::from_secs(130)]
    );
    assert_eq!(lp.sink().messages().len(), 1);
    assert_eq!(lp.state().last_alerted_hour, Some(16));
}

static CLOCK_READS: AtomicUsize = AtomicUsize::new(0);

fn counting_clock() -> DateTime<Utc> {
    CLOCK_READS.fetch_add(1, Ordering::SeqCst);
    wednesday_afternoon()
}

#[tokio::test(start_paused = true)]
async fn run_keeps_ticking_after_tick_errors() {
    // No profiles: every open-session tick returns an error.
    let (_market, lp) = polling(full_market(), RecordingSink::new(true), Vec::new());
    let mut lp = lp.with_clock(counting_clock);

    assert!(timeout(Duration::from_secs(185), lp.run()).await.is_err());

    // Ticks at 0s, 60s, 120s and 180s.
    assert_eq!(CLOCK_READS.load(Ordering::SeqCst), 4);
    assert!(lp.sink().messages().is_empty());
}
