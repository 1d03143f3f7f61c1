//! # Index Quote Live Data Test
//!
//! Fetches the current quote of one index profile and ranks its basket against
//! the live Yahoo chart API, printing both as JSON.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use lib_common::markets::profiles::{builtin_profiles, find_profile};
use lib_common::markets::yahoo::{YahooChartClient, DEFAULT_CHART_URL};
use lib_common::markets::{MoversRanker, QuoteSource};

#[derive(Parser, Debug)]
#[clap(about = "Live probe of an index quote and its top movers")]
struct Args {
    /// Profile key (sp500, nasdaq, dow).
    #[clap(default_value = "sp500")]
    index: String,

    #[clap(long, default_value = DEFAULT_CHART_URL)]
    url: String,
}

/// Executes the live quote and movers fetch.
///
/// // Statement: Exits with status 1 when the index quote cannot be fetched.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let table = builtin_profiles();
    let Some(profile) = find_profile(&table, &args.index) else {
        eprintln!("[ERROR] Unknown index profile '{}'", args.index);
        std::process::exit(1);
    };

    let source = Arc::new(YahooChartClient::new(&args.url, None, Duration::from_secs(10))?);

    println!("[*] Requesting {} ({}) from {}...", profile.display_name, profile.symbol, args.url);

    match source.fetch_quote(&profile.symbol).await {
        Ok(quote) => {
            println!("\n[SUCCESS] Quote received:");
            println!("-----------------------------------------------");
            println!("{}", serde_json::to_string_pretty(&quote)?);
            println!("-----------------------------------------------");
        }
        Err(e) => {
            eprintln!("\n[ERROR] Quote retrieval failed:");
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    }

    let ranker = MoversRanker::new(Arc::clone(&source));
    match ranker.rank(&profile.basket).await {
        Some(report) => {
            println!("\n[SUCCESS] Movers:");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        None => println!("\n[INFO] No movers data available for {}", profile.display_name),
    }

    Ok(())
}
