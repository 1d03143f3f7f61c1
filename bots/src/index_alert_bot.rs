use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::signal;

use lib_common::alerts::{AlertFormatter, PollingLoop};
use lib_common::configs::{load_config, ResolvedConfig};
use lib_common::loggers::{log_system_info, setup_logging};
use lib_common::markets::yahoo::YahooChartClient;
use lib_common::notifiers::{Notifier, TelegramClient};

const APP_NAME: &str = "index_alert_bot";

fn startup_config() -> ResolvedConfig {
    let resolved = load_config().and_then(|config| config.resolve());
    match resolved {
        Ok(config) => config,
        Err(e) => {
            // Logging is configured from these values, so report straight to stderr.
            eprintln!("{}: configuration error: {}", APP_NAME, e);
            process::exit(1);
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Ctrl-C received, initiating shutdown."),
                    _ = term_signal.recv() => info!("SIGTERM received, initiating shutdown."),
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                let _ = signal::ctrl_c().await;
                info!("Ctrl-C received, initiating shutdown.");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Ctrl-C received, initiating shutdown.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = startup_config();

    let log_path = setup_logging(&config.log_dir, APP_NAME, &config.log_level)?;
    log_system_info(APP_NAME, env!("CARGO_PKG_VERSION"));
    info!("Logging to {}", log_path.display());
    info!("{}", config);

    let source = Arc::new(
        YahooChartClient::new(&config.market_data_url, config.data_api_key.clone(), config.http_timeout)
            .context("building market data client")?,
    );
    let telegram = TelegramClient::new(
        &config.telegram_api_url,
        &config.telegram_token,
        &config.telegram_chat_id,
        config.http_timeout,
    )
    .context("building Telegram client")?;

    if !telegram.check_connection().await {
        error!("Telegram connection check failed, alerts may not be delivered");
    }

    let notifier = Notifier::new(telegram, config.retry.clone());
    let formatter = AlertFormatter::new(config.locale);

    if config.announce {
        let titles: Vec<String> = config.profiles.iter().map(|p| p.display_name.clone()).collect();
        if !notifier.send_startup_message(&formatter.startup(&titles)).await {
            warn!("Startup message was not delivered");
        }
    }

    let mut polling = PollingLoop::new(
        source,
        notifier,
        config.session,
        formatter,
        config.profiles.clone(),
        config.poll_interval,
    );

    info!("Index alert bot started");
    tokio::select! {
        _ = polling.run() => {}
        _ = shutdown_signal() => {}
    }

    info!("Shutdown complete.");
    Ok(())
}
