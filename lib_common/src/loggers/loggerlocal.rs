use anyhow::Result;
use chrono::Local;
use colored::*;
use glob::glob;
use log::{info, Level, LevelFilter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Maps a textual level (trace, debug, info, warn, error) to a filter; unknown values mean info.
pub fn parse_level(log_level: &str) -> LevelFilter {
    match log_level.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" | "warning" => LevelFilter::Warn,
        "error" | "fatal" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

fn colored_level(level: Level) -> ColoredString {
    let text = level.to_string();
    match level {
        Level::Error => text.bright_red(),
        Level::Warn => text.bright_yellow(),
        Level::Info => text.bright_green(),
        Level::Debug => text.bright_white(),
        Level::Trace => text.bright_cyan(),
    }
}

/// Rotates log files for a given application and log directory.
///
/// Keeps only the most recent log file (based on the timestamp in the filename)
/// and deletes older log files for `app_name` within `log_dir`.
pub fn rotate_logs(app_name: &str, log_dir: &Path) -> Result<()> {
    let pattern = format!("{}/{}_*.log", log_dir.display(), app_name);
    let mut log_files: Vec<PathBuf> = glob(&pattern)?.filter_map(|entry| entry.ok()).collect();

    // Newest first; the timestamp suffix sorts lexicographically.
    log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    for old_file in log_files.iter().skip(1) {
        if let Err(e) = fs::remove_file(old_file) {
            eprintln!("Error deleting old log file {}: {}", old_file.display(), e);
        }
    }

    Ok(())
}

/// Creates `log_dir` if needed and opens `<app_name>_<timestamp>.log` in it.
///
/// Rotation runs after the new file exists, so it is the only file of the app
/// left in the directory.
pub fn open_log_file(log_dir: &Path, app_name: &str) -> Result<(PathBuf, File)> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    let log_file_name = format!("{}_{}.log", app_name, Local::now().format("%Y-%m-%d_%H-%M-%S"));
    let log_path = log_dir.join(log_file_name);
    let file = fern::log_file(&log_path)?;

    rotate_logs(app_name, log_dir)?;

    Ok((log_path, file))
}

/// Installs the global `log` dispatcher.
///
/// Records go to stdout with colored levels and to
/// `<log_dir>/<app_name>_<timestamp>.log` without colors. Older log files of the
/// same app are removed. Returns the path of the new log file.
pub fn setup_logging(log_dir: &Path, app_name: &str, log_level: &str) -> Result<PathBuf> {
    let (log_path, log_file) = open_log_file(log_dir, app_name)?;

    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                Local::now().format("[%Y-%m-%d %H:%M:%S]").to_string().truecolor(128, 128, 128),
                record.target(),
                colored_level(record.level()),
                message
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(parse_level(log_level))
        // Connection pool chatter drowns the per-tick lines.
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(console)
        .chain(file)
        .apply()?;

    Ok(log_path)
}

/// Logs platform, architecture, package version and pid for debugging purposes.
pub fn log_system_info(app_name: &str, version: &str) {
    info!("=== System Information ===");
    info!("Application: {} {}", app_name, version);
    info!("Platform: {} ({})", std::env::consts::OS, std::env::consts::FAMILY);
    info!("Architecture: {}", std::env::consts::ARCH);
    info!("Pid: {}", std::process::id());
    info!("=== End System Information ===");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("fatal"), LevelFilter::Error);
        assert_eq!(parse_level("whatever"), LevelFilter::Info);
    }

    #[test]
    fn rotation_keeps_only_newest_file_of_the_app() {
        let dir = tempdir().unwrap();
        for name in [
            "index_alert_bot_2024-05-01_10-00-00.log",
            "index_alert_bot_2024-05-02_10-00-00.log",
            "index_alert_bot_2024-05-03_10-00-00.log",
            "other_app_2024-05-01_10-00-00.log",
        ] {
            fs::write(dir.path().join(name), "x").unwrap();
        }

        rotate_logs("index_alert_bot", dir.path()).unwrap();

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "index_alert_bot_2024-05-03_10-00-00.log".to_string(),
                "other_app_2024-05-01_10-00-00.log".to_string(),
            ]
        );
    }

    #[test]
    fn new_log_file_survives_rotation() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("index_alert_bot_2020-01-01_00-00-00.log"), "old").unwrap();

        let (path, _file) = open_log_file(&logs, "index_alert_bot").unwrap();

        let remaining: Vec<PathBuf> = fs::read_dir(&logs).unwrap().filter_map(|e| e.ok()).map(|e| e.path()).collect();
        assert_eq!(remaining, vec![path]);
    }
}
