//! # Yahoo Chart API Client
//!
//! Fetches index quotes (`interval=1m&range=1d`) and basket daily changes
//! (`interval=1d&range=2d`) from the v8 chart endpoint. There is no retry at this
//! layer: a failed symbol is logged and skipped by the caller.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::header::RETRY_AFTER;

use crate::markets::quote::{DailyChange, FetchError, Quote, QuoteSource};
use crate::markets::yahoo::chart::ChartResponse;
use crate::retrieve::{ApiClient, ApiClientOptions, ApiResponse, RetrieveError};

/// Production chart endpoint.
pub const DEFAULT_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// The endpoint answers requests without a browser-like agent with 429s.
const USER_AGENT: &str = "Mozilla/5.0";

/// Chart endpoint client implementing [`QuoteSource`].
pub struct YahooChartClient {
    client: ApiClient,
}

impl YahooChartClient {
    /// Creates a client for `base_url`.
    ///
    /// `api_key`, when present, is sent as a bearer token for proxies that require one.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, RetrieveError> {
        let options = ApiClientOptions {
            timeout,
            user_agent: Some(USER_AGENT.to_string()),
            auth_token: api_key,
            transport_retries: 0,
        };
        Ok(Self {
            client: ApiClient::new(base_url, options)?,
        })
    }

    /// Requests the chart for `symbol` and returns the decoded body with its status.
    async fn fetch_chart(&self, symbol: &str, interval: &str, range: &str) -> Result<(ChartResponse, u16), FetchError> {
        let response: ApiResponse<ChartResponse> = self
            .client
            .get(symbol, &[("interval", interval), ("range", range)])
            .await?;
        chart_from_response(response)
    }
}

/// Splits a chart response into its body or a [`FetchError`].
///
/// Non-2xx responses become [`FetchError::Upstream`], carrying the API's own
/// error description when the body has one and the raw body otherwise. A
/// `Retry-After` header on a throttled response is appended to the detail.
fn chart_from_response(response: ApiResponse<ChartResponse>) -> Result<(ChartResponse, u16), FetchError> {
    if !response.success {
        let raw = response.error_body.unwrap_or_default();
        let mut detail = serde_json::from_str::<ChartResponse>(&raw)
            .ok()
            .and_then(|body| body.chart.error.map(|e| e.detail()))
            .unwrap_or(raw);
        if let Some(wait) = response.headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok()) {
            detail = format!("{} (retry after {}s)", detail, wait);
        }
        return Err(FetchError::Upstream {
            status: response.status,
            detail,
        });
    }

    let body = response
        .data
        .ok_or_else(|| FetchError::Parse("empty response body".to_string()))?;
    Ok((body, response.status))
}

#[async_trait]
impl QuoteSource for YahooChartClient {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let result = match self.fetch_chart(symbol, "1m", "1d").await {
            Ok((body, status)) => body.to_quote(symbol, status, Utc::now()),
            Err(e) => Err(e),
        };

        match &result {
            Ok(quote) => debug!("Quote {}: price={:.2} previousClose={:.2}", symbol, quote.price, quote.previous_close),
            Err(e) => warn!("Error fetching price for {}: {}", symbol, e),
        }
        result
    }

    async fn fetch_daily_change(&self, symbol: &str) -> Result<DailyChange, FetchError> {
        let result = match self.fetch_chart(symbol, "1d", "2d").await {
            Ok((body, status)) => body.to_daily_change(status),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!("Error fetching data for {}: {}", symbol, e);
        }
        result
    }
}
