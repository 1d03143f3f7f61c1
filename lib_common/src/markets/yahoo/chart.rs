//! Schema of the Yahoo Finance v8 chart endpoint, and the two projections the
//! bots need from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::markets::quote::{DailyChange, FetchError, Quote};

/// Top-level envelope: `{"chart": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartResponse {
    /// The chart payload.
    pub chart: Chart,
}

/// Either a result list or an error object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chart {
    /// One entry per requested symbol. Null when the API reports an error.
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    /// API-reported error, e.g. an unknown symbol.
    #[serde(default)]
    pub error: Option<ChartError>,
}

/// A single symbol's series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartResult {
    /// Market metadata.
    #[serde(default)]
    pub meta: Option<ChartMeta>,
    /// OHLCV series.
    #[serde(default)]
    pub indicators: Option<Indicators>,
}

/// The subset of `meta` used for quotes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    /// Symbol echoed back.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Trading currency.
    #[serde(default)]
    pub currency: Option<String>,
    /// Latest regular-session price.
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    /// Prior session close.
    #[serde(default)]
    pub previous_close: Option<f64>,
    /// Close preceding the chart range, sent when `previousClose` is not.
    #[serde(default)]
    pub chart_previous_close: Option<f64>,
}

/// Indicator block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Indicators {
    /// Quote series; the first entry is the one for the requested symbol.
    #[serde(default)]
    pub quote: Vec<IndicatorQuote>,
}

/// Per-bar quote values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorQuote {
    /// Closes in bar order; `null` for bars without trades.
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

/// API error object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartError {
    /// Short code such as `Not Found`.
    #[serde(default)]
    pub code: Option<String>,
    /// Human readable description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ChartError {
    /// Best available text for logs.
    pub fn detail(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(desc)) => format!("{}: {}", code, desc),
            (None, Some(desc)) => desc.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown chart error".to_string(),
        }
    }
}

impl ChartResponse {
    /// First result, or the API error converted to a [`FetchError`].
    pub fn first_result(&self, status: u16) -> Result<&ChartResult, FetchError> {
        if let Some(err) = &self.chart.error {
            return Err(FetchError::Upstream {
                status,
                detail: err.detail(),
            });
        }
        self.chart
            .result
            .as_ref()
            .and_then(|r| r.first())
            .ok_or_else(|| FetchError::Parse("chart.result is empty".to_string()))
    }

    /// Builds a [`Quote`] from `meta.regularMarketPrice` and `meta.previousClose`.
    pub fn to_quote(&self, symbol: &str, status: u16, observed_at: DateTime<Utc>) -> Result<Quote, FetchError> {
        let meta = self
            .first_result(status)?
            .meta
            .as_ref()
            .ok_or_else(|| FetchError::Parse("chart.result[0].meta missing".to_string()))?;

        let price = meta
            .regular_market_price
            .ok_or_else(|| FetchError::Parse("meta.regularMarketPrice missing".to_string()))?;
        let previous = meta
            .previous_close
            .or(meta.chart_previous_close)
            .ok_or_else(|| FetchError::Parse("meta.previousClose missing".to_string()))?;

        Quote::from_prices(symbol, price, previous, observed_at)
    }

    /// Builds a [`DailyChange`] from `indicators.quote[0].close`.
    pub fn to_daily_change(&self, status: u16) -> Result<DailyChange, FetchError> {
        let closes = self
            .first_result(status)?
            .indicators
            .as_ref()
            .and_then(|i| i.quote.first())
            .map(|q| q.close.as_slice())
            .ok_or_else(|| FetchError::Parse("indicators.quote[0].close missing".to_string()))?;

        DailyChange::from_closes(closes)
    }
}
