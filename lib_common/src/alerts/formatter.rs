//! # Alert Formatter
//!
//! Pure rendering of the hourly summary in Telegram Markdown. Field order:
//! header, price, change, then the optional movers block. Sections of several
//! indices are joined by [`AlertFormatter::compose`], which appends the time line
//! and the footer.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::markets::{MoversReport, Quote};

/// Language of user-facing alert text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English.
    #[default]
    En,
    /// Brazilian Portuguese.
    Pt,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Ok(Locale::En),
            "pt" | "pt-br" | "portuguese" => Ok(Locale::Pt),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

struct Labels {
    hourly_update: &'static str,
    current_price: &'static str,
    change: &'static str,
    market_movers: &'static str,
    top_gainer: &'static str,
    top_loser: &'static str,
    unavailable: &'static str,
    time: &'static str,
    footer: &'static str,
    startup: &'static str,
}

const EN: Labels = Labels {
    hourly_update: "Hourly Update",
    current_price: "Current Price",
    change: "Change",
    market_movers: "Market Movers",
    top_gainer: "Top Gainer",
    top_loser: "Top Loser",
    unavailable: "data unavailable",
    time: "Time",
    footer: "Powered by Yahoo Finance",
    startup: "Monitoring Bot is now active!\n\nYou will receive hourly updates during market hours.",
};

const PT: Labels = Labels {
    hourly_update: "Atualização Horária",
    current_price: "Preço Atual",
    change: "Variação",
    market_movers: "Destaques do Mercado",
    top_gainer: "Maior Alta",
    top_loser: "Maior Baixa",
    unavailable: "dados indisponíveis",
    time: "Horário",
    footer: "Dados: Yahoo Finance",
    startup: "Bot de Monitoramento ativo!\n\nVocê receberá atualizações a cada hora durante o pregão.",
};

/// `+` for values at or above zero; negatives keep their own `-`. Two decimals.
pub fn signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{:.2}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Backslash-escapes the characters legacy Telegram Markdown treats as entity
/// delimiters (`_`, `*`, `` ` ``, `[`), so configured names render literally.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders alert text in one locale.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertFormatter {
    locale: Locale,
}

impl AlertFormatter {
    /// Creates a formatter for `locale`.
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    fn labels(&self) -> &'static Labels {
        match self.locale {
            Locale::En => &EN,
            Locale::Pt => &PT,
        }
    }

    /// One index section: header, price, change and, when present, movers.
    pub fn format(&self, title: &str, quote: &Quote, movers: Option<&MoversReport>) -> String {
        let l = self.labels();
        let trend = if quote.change_percent >= 0.0 { "📈" } else { "📉" };

        let mut message = format!(
            "🔔 *{} {}*\n\n💰 *{}:* ${:.2}\n{} *{}:* {} ({}%)",
            escape_markdown(title),
            l.hourly_update,
            l.current_price,
            quote.price,
            trend,
            l.change,
            signed(quote.change),
            signed(quote.change_percent),
        );

        if let Some(report) = movers {
            message.push_str(&format!("\n\n📊 *{}:*", l.market_movers));
            message.push_str(&format!(
                "\n🟢 *{}:* {} ({}) {}%",
                l.top_gainer,
                escape_markdown(&report.top_gainer.display_name),
                escape_markdown(&report.top_gainer.symbol),
                signed(report.top_gainer.change_percent),
            ));
            message.push_str(&format!(
                "\n🔴 *{}:* {} ({}) {}%",
                l.top_loser,
                escape_markdown(&report.top_loser.display_name),
                escape_markdown(&report.top_loser.symbol),
                signed(report.top_loser.change_percent),
            ));
        }

        message
    }

    /// Placeholder section for an index whose quote could not be fetched.
    pub fn unavailable(&self, title: &str) -> String {
        format!("⚠️ *{}:* {}", escape_markdown(title), self.labels().unavailable)
    }

    /// Joins sections and appends the time line and footer.
    pub fn compose<T>(&self, sections: &[String], at: &DateTime<T>) -> String
    where
        T: TimeZone,
        T::Offset: Display,
    {
        let l = self.labels();
        format!(
            "{}\n\n📅 *{}:* {}\n\n_{}_",
            sections.join("\n\n"),
            l.time,
            at.format("%Y-%m-%d %H:%M:%S %Z"),
            l.footer,
        )
    }

    /// Message announcing the bot, naming the monitored indices.
    pub fn startup(&self, titles: &[String]) -> String {
        let names: Vec<String> = titles.iter().map(|t| escape_markdown(t)).collect();
        format!("🤖 *{}*\n\n{}", names.join(", "), self.labels().startup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::MoverEntry;
    use chrono::Utc;

    fn quote(price: f64, previous: f64) -> Quote {
        Quote::from_prices("^GSPC", price, previous, Utc::now()).unwrap()
    }

    fn report() -> MoversReport {
        MoversReport {
            top_gainer: MoverEntry {
                symbol: "NVDA".to_string(),
                display_name: "NVIDIA".to_string(),
                price: 900.0,
                change_percent: 3.456,
            },
            top_loser: MoverEntry {
                symbol: "TSLA".to_string(),
                display_name: "Tesla".to_string(),
                price: 170.0,
                change_percent: -2.1,
            },
        }
    }

    #[test]
    fn positive_change_gets_plus_sign() {
        let text = AlertFormatter::default().format("S&P 500", &quote(5000.0, 4950.0), None);
        assert!(text.contains("+50.00"));
        assert!(text.contains("+1.01%"));
        assert!(text.contains("$5000.00"));
        assert!(text.contains("📈"));
    }

    #[test]
    fn negative_change_keeps_own_sign() {
        let text = AlertFormatter::default().format("S&P 500", &quote(4900.0, 4950.0), None);
        assert!(text.contains("(-1.01%)"));
        assert!(text.contains("-50.00"));
        assert!(!text.contains("+-"));
        assert!(text.contains("📉"));
    }

    #[test]
    fn zero_change_is_positive() {
        assert_eq!(signed(0.0), "+0.00");
        assert_eq!(signed(-0.5), "-0.50");
    }

    #[test]
    fn field_order_is_header_price_change_movers() {
        let text = AlertFormatter::default().format("S&P 500", &quote(5000.0, 4950.0), Some(&report()));
        let header = text.find("S&P 500 Hourly Update").unwrap();
        let price = text.find("Current Price").unwrap();
        let change = text.find("Change:").unwrap();
        let gainer = text.find("Top Gainer:* NVIDIA (NVDA) +3.46%").unwrap();
        let loser = text.find("Top Loser:* Tesla (TSLA) -2.10%").unwrap();
        assert!(header < price && price < change && change < gainer && gainer < loser);
    }

    #[test]
    fn movers_block_is_omitted_without_report() {
        let text = AlertFormatter::default().format("S&P 500", &quote(5000.0, 4950.0), None);
        assert!(!text.contains("Market Movers"));
        assert!(!text.contains("Top Gainer"));
    }

    #[test]
    fn portuguese_labels() {
        let fmt = AlertFormatter::new(Locale::Pt);
        let text = fmt.format("Ibovespa", &quote(5000.0, 4950.0), Some(&report()));
        assert!(text.contains("Preço Atual"));
        assert!(text.contains("Maior Alta"));
        assert_eq!(fmt.unavailable("Dow Jones"), "⚠️ *Dow Jones:* dados indisponíveis");
    }

    #[test]
    fn compose_appends_time_and_footer() {
        let at = Utc.with_ymd_and_hms(2024, 5, 15, 15, 0, 0).unwrap();
        let fmt = AlertFormatter::default();
        let text = fmt.compose(&["one".to_string(), fmt.unavailable("Dow Jones")], &at);
        assert!(text.starts_with("one\n\n⚠️ *Dow Jones:* data unavailable"));
        assert!(text.contains("2024-05-15 15:00:00 UTC"));
        assert!(text.ends_with("_Powered by Yahoo Finance_"));
    }

    #[test]
    fn locale_parsing() {
        assert_eq!("PT-BR".parse::<Locale>().unwrap(), Locale::Pt);
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::En);
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn configured_names_are_markdown_escaped() {
        assert_eq!(escape_markdown("FTSE_100 *x* [y] `z`"), "FTSE\\_100 \\*x\\* \\[y] \\`z\\`");

        let mut movers = report();
        movers.top_gainer.display_name = "Berkshire_B".to_string();
        movers.top_gainer.symbol = "BRK_B".to_string();
        let fmt = AlertFormatter::default();
        let text = fmt.format("Top_10 *Tech*", &quote(5000.0, 4950.0), Some(&movers));
        assert!(text.starts_with("🔔 *Top\\_10 \\*Tech\\* Hourly Update*"), "{}", text);
        assert!(text.contains("Berkshire\\_B (BRK\\_B) +3.46%"));
        assert_eq!(fmt.unavailable("Dow_Jones"), "⚠️ *Dow\\_Jones:* data unavailable");
        assert!(fmt.startup(&["A_B".to_string()]).starts_with("🤖 *A\\_B*"));
    }
}
