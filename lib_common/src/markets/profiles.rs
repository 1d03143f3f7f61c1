//! Index profiles: which instrument to quote and which reference basket stands in
//! for its constituents when picking top movers. Variants of the bot differ only
//! in this table.

use serde::{Deserialize, Serialize};

/// A basket stock with the name shown in alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketEntry {
    /// Ticker, e.g. `AAPL`.
    pub symbol: String,
    /// Display name, e.g. `Apple`.
    pub display_name: String,
}

impl BasketEntry {
    /// Shorthand constructor.
    pub fn new(symbol: &str, display_name: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// One monitored index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexProfile {
    /// Lookup key used in configuration (`sp500`, `nasdaq`, ...).
    pub key: String,
    /// Instrument quoted for the price line, e.g. `^GSPC`.
    pub symbol: String,
    /// Title used in the alert header.
    pub display_name: String,
    /// Reference basket in ranking order.
    #[serde(default)]
    pub basket: Vec<BasketEntry>,
}

fn basket(entries: &[(&str, &str)]) -> Vec<BasketEntry> {
    entries.iter().map(|(s, n)| BasketEntry::new(s, n)).collect()
}

/// The built-in profile table.
pub fn builtin_profiles() -> Vec<IndexProfile> {
    vec![
        IndexProfile {
            key: "sp500".to_string(),
            symbol: "^GSPC".to_string(),
            display_name: "S&P 500".to_string(),
            basket: basket(&[
                ("AAPL", "Apple"),
                ("TSLA", "Tesla"),
                ("NVDA", "NVIDIA"),
                ("AMZN", "Amazon"),
                ("GOOGL", "Google"),
                ("META", "Meta"),
            ]),
        },
        IndexProfile {
            key: "nasdaq".to_string(),
            symbol: "^IXIC".to_string(),
            display_name: "Nasdaq Composite".to_string(),
            basket: basket(&[
                ("AAPL", "Apple"),
                ("MSFT", "Microsoft"),
                ("NVDA", "NVIDIA"),
                ("AMZN", "Amazon"),
                ("META", "Meta"),
            ]),
        },
        IndexProfile {
            key: "dow".to_string(),
            symbol: "^DJI".to_string(),
            display_name: "Dow Jones".to_string(),
            basket: basket(&[
                ("UNH", "UnitedHealth"),
                ("GS", "Goldman Sachs"),
                ("MSFT", "Microsoft"),
                ("HD", "Home Depot"),
                ("CAT", "Caterpillar"),
                ("V", "Visa"),
            ]),
        },
    ]
}

/// Finds `key` (case-insensitive) in `table`.
pub fn find_profile<'a>(table: &'a [IndexProfile], key: &str) -> Option<&'a IndexProfile> {
    table.iter().find(|p| p.key.eq_ignore_ascii_case(key.trim()))
}

/// Returns `base` with every entry of `overrides` replacing the profile of the
/// same key, or appended when the key is new.
pub fn merge_profiles(mut base: Vec<IndexProfile>, overrides: Vec<IndexProfile>) -> Vec<IndexProfile> {
    for profile in overrides {
        match base.iter_mut().find(|p| p.key.eq_ignore_ascii_case(&profile.key)) {
            Some(existing) => *existing = profile,
            None => base.push(profile),
        }
    }
    base
}
