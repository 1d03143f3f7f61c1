//! Quote data shared by every market-data consumer, and the [`QuoteSource`]
//! seam that the ranker and the polling loop are written against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retrieve::RetrieveError;

/// Why a single market-data fetch produced nothing usable.
///
/// Every variant is recovered by the caller: the symbol is skipped, never
/// propagated as a crash.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    /// Timeout, connection refused, DNS failure.
    #[error("network failure: {0}")]
    Network(String),

    /// Non-success status, or an error object reported by the API.
    #[error("upstream failure (status {status}): {detail}")]
    Upstream {
        /// HTTP status of the response.
        status: u16,
        /// Provider description, or the raw body when none was given.
        detail: String,
    },

    /// Missing or malformed fields in an otherwise successful response.
    #[error("parse failure: {0}")]
    Parse(String),
}

impl From<RetrieveError> for FetchError {
    fn from(err: RetrieveError) -> Self {
        match err {
            RetrieveError::Decode(e) => FetchError::Parse(e.to_string()),
            other => FetchError::Network(other.to_string()),
        }
    }
}

/// Latest price of one instrument against its prior close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker, e.g. `^GSPC`.
    pub symbol: String,
    /// Regular-market price.
    pub price: f64,
    /// Prior session close.
    pub previous_close: f64,
    /// `price - previous_close`.
    pub change: f64,
    /// `change / previous_close * 100`.
    pub change_percent: f64,
    /// When the quote was fetched.
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    /// Derives change and change percent from the two prices.
    ///
    /// A zero or non-finite previous close leaves the percentage undefined and is
    /// reported as [`FetchError::Parse`].
    pub fn from_prices(
        symbol: &str,
        price: f64,
        previous_close: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        if !price.is_finite() || !previous_close.is_finite() {
            return Err(FetchError::Parse(format!(
                "non-finite prices for {}: price={} previousClose={}",
                symbol, price, previous_close
            )));
        }
        if previous_close == 0.0 {
            return Err(FetchError::Parse(format!("previousClose is zero for {}", symbol)));
        }

        let change = price - previous_close;
        Ok(Self {
            symbol: symbol.to_string(),
            price,
            previous_close,
            change,
            change_percent: change / previous_close * 100.0,
            observed_at,
        })
    }
}

/// Close-to-close move of a basket stock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChange {
    /// Most recent close.
    pub price: f64,
    /// Percent change between the last two closes.
    pub change_percent: f64,
}

impl DailyChange {
    /// Computes the change between the last two valid closes.
    ///
    /// Null entries are skipped. Fewer than two valid closes, or a zero prior
    /// close, is a [`FetchError::Parse`].
    pub fn from_closes(closes: &[Option<f64>]) -> Result<Self, FetchError> {
        let valid: Vec<f64> = closes
            .iter()
            .filter_map(|c| *c)
            .filter(|c| c.is_finite())
            .collect();

        if valid.len() < 2 {
            return Err(FetchError::Parse(format!(
                "need two valid closes, got {}",
                valid.len()
            )));
        }

        let current = valid[valid.len() - 1];
        let previous = valid[valid.len() - 2];
        if previous == 0.0 {
            return Err(FetchError::Parse("previous close is zero".to_string()));
        }

        Ok(Self {
            price: current,
            change_percent: (current - previous) / previous * 100.0,
        })
    }
}

/// A provider of index quotes and basket daily changes.
///
/// Implementations log their own failures; callers treat `Err` as "skip this
/// symbol".
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Latest price and previous close for `symbol`.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError>;

    /// Percent change between the last two daily closes of `symbol`.
    async fn fetch_daily_change(&self, symbol: &str) -> Result<DailyChange, FetchError>;
}
