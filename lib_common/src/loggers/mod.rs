/// fern dispatch to a colored console and a rotated log file.
pub mod loggerlocal;

pub use loggerlocal::{log_system_info, open_log_file, parse_level, rotate_logs, setup_logging};
