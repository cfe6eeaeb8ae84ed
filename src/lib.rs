// Copyright 2019 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod chart;
pub mod config;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod table;

pub use crate::error::{Error, Result};

use crate::config::Config;
use crate::metrics::Comparison;

use log::info;

/// Runs the whole pipeline: load both result sets, extract the four
/// comparison metrics, and render the figure to the configured path.
pub fn run(config: &Config) -> Result<()> {
    let (baseline, candidate) = table::load_pair(&config.baseline(), &config.candidate())?;
    info!("loaded {} time steps from each input", baseline.rows());

    let comparison = Comparison::extract(&baseline, &candidate, &config.services())?;

    chart::save_comparison(&comparison, &config.output(), config.width(), config.height())?;
    info!("comparison complete: saved as {}", config.output());
    Ok(())
}
