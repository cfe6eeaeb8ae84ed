// Copyright 2019 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use log::{Log, Metadata, Record, SetLoggerError};
use serde_derive::*;

#[derive(Copy, Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Level {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            Level::Error => log::LevelFilter::Error,
            Level::Warn => log::LevelFilter::Warn,
            Level::Info => log::LevelFilter::Info,
            Level::Debug => log::LevelFilter::Debug,
            Level::Trace => log::LevelFilter::Trace,
        }
    }
}

pub struct Logger {
    label: String,
    level: Level,
}

impl Logger {
    pub fn new() -> Logger {
        Default::default()
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn init(self) -> Result<(), SetLoggerError> {
        let filter = self.level.to_filter();
        log::set_boxed_logger(Box::new(SimpleLogger { label: self.label }))?;
        log::set_max_level(filter);
        Ok(())
    }
}

impl Default for Logger {
    fn default() -> Logger {
        Logger {
            label: env!("CARGO_PKG_NAME").to_string(),
            level: Level::Info,
        }
    }
}

struct SimpleLogger {
    label: String,
}

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let target = if record.level() >= log::Level::Debug {
                record.target()
            } else {
                &self.label
            };
            println!(
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                target,
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct TestConfig {
        logging: Level,
    }

    #[test]
    fn level_from_str() {
        let config: TestConfig = toml::from_str("logging = \"debug\"").unwrap();
        assert_eq!(config.logging, Level::Debug);
    }

    #[test]
    fn level_filters() {
        assert_eq!(Level::Info.to_filter(), log::LevelFilter::Info);
        assert_eq!(Level::Trace.to_filter(), log::LevelFilter::Trace);
    }
}
