use std::fs::OpenOptions;
use std::str::FromStr;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use crate::config::{LoggingConfig, expand_path};

/// Configured level, raised by one step per `-v`.
pub fn level(config: &LoggingConfig, verbosity: u8) -> LevelFilter {
    let base = LevelFilter::from_str(&config.level).unwrap_or(LevelFilter::Warn);
    (0..verbosity).fold(base, |level, _| match level {
        LevelFilter::Off => LevelFilter::Error,
        LevelFilter::Error => LevelFilter::Warn,
        LevelFilter::Warn => LevelFilter::Info,
        LevelFilter::Info => LevelFilter::Debug,
        LevelFilter::Debug | LevelFilter::Trace => LevelFilter::Trace,
    })
}

/// Log to stderr, and append to the configured log file when it can be opened.
/// Best-effort: failures are silently ignored (logging must never block compilation).
pub fn init(config: &LoggingConfig, level: LevelFilter) {
    let log_config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        log_config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if !config.file.is_empty() {
        let path = expand_path(&config.file);
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
            loggers.push(WriteLogger::new(level, ConfigBuilder::new().build(), file));
        }
    }

    let _ = CombinedLogger::init(loggers);
}
