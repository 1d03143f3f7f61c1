//! # Top Movers
//!
//! Fetches the daily change of every basket stock and picks the extreme gainer
//! and loser. A basket stock whose fetch fails is dropped; one bad symbol never
//! aborts the ranking.

use std::sync::Arc;

use futures_util::future::join_all;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::markets::profiles::BasketEntry;
use crate::markets::quote::QuoteSource;

/// One ranked basket stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoverEntry {
    /// Ticker.
    pub symbol: String,
    /// Display name from the basket.
    pub display_name: String,
    /// Latest close.
    pub price: f64,
    /// Close-to-close change in percent.
    pub change_percent: f64,
}

/// Extreme gainer and loser of a basket. Both may be the same entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoversReport {
    /// Highest change percent, first seen on ties.
    pub top_gainer: MoverEntry,
    /// Lowest change percent, first seen on ties.
    pub top_loser: MoverEntry,
}

/// Picks max and min change percent in a single pass each.
///
/// Only a strictly greater (or smaller) value replaces the current pick, so
/// ties resolve to the earliest entry. Returns `None` for an empty slice.
pub fn select_movers(entries: &[MoverEntry]) -> Option<MoversReport> {
    let first = entries.first()?;

    let mut gainer = first;
    for entry in entries {
        if entry.change_percent > gainer.change_percent {
            gainer = entry;
        }
    }

    let mut loser = first;
    for entry in entries {
        if entry.change_percent < loser.change_percent {
            loser = entry;
        }
    }

    Some(MoversReport {
        top_gainer: gainer.clone(),
        top_loser: loser.clone(),
    })
}

/// Ranks a basket against a [`QuoteSource`].
pub struct MoversRanker<Q: QuoteSource> {
    source: Arc<Q>,
}

impl<Q: QuoteSource> MoversRanker<Q> {
    /// Creates a ranker reading from `source`.
    pub fn new(source: Arc<Q>) -> Self {
        Self { source }
    }

    /// Fetches every basket entry concurrently, drops failures, then ranks.
    ///
    /// Results are aggregated in basket order before ranking, so tie breaking is
    /// independent of completion order. `None` means no movers data is available.
    pub async fn rank(&self, basket: &[BasketEntry]) -> Option<MoversReport> {
        let fetches = basket.iter().map(|entry| {
            let source = Arc::clone(&self.source);
            async move { (entry, source.fetch_daily_change(&entry.symbol).await) }
        });

        let entries: Vec<MoverEntry> = join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(entry, result)| match result {
                Ok(change) => Some(MoverEntry {
                    symbol: entry.symbol.clone(),
                    display_name: entry.display_name.clone(),
                    price: change.price,
                    change_percent: change.change_percent,
                }),
                Err(_) => None,
            })
            .collect();

        debug!("Movers: {}/{} basket symbols available", entries.len(), basket.len());
        select_movers(&entries)
    }
}
