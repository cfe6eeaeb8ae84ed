// Copyright 2019 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::{Error, Result};
use crate::table::Table;

use log::debug;

pub const REJECTED_PREFIX: &str = "rejected_req_";
pub const UNSATISFIED_PREFIX: &str = "unsatisf_req_";
pub const DELAY_PREFIX: &str = "delay_";
pub const ENERGY_COLUMNS: &[&str] = &["dynamic_W_servers", "idle_W_servers", "W_links"];
pub const DELAY_PERCENTILE: f64 = 95.0;

/// One reduction computed for both input tables.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesPair {
    pub baseline: Vec<f64>,
    pub candidate: Vec<f64>,
}

/// All four comparison metrics, ready for rendering. `rejected` and `energy`
/// are aligned to `time`; `unsatisfied` and `delay_p95` are aligned to
/// `services`.
#[derive(Clone, Debug)]
pub struct Comparison {
    pub time: Vec<f64>,
    pub services: Vec<String>,
    pub rejected: SeriesPair,
    pub energy: SeriesPair,
    pub unsatisfied: SeriesPair,
    pub delay_p95: SeriesPair,
}

impl Comparison {
    pub fn extract(baseline: &Table, candidate: &Table, services: &[String]) -> Result<Comparison> {
        let time = baseline.column("time")?.to_vec();

        let comparison = Comparison {
            time,
            services: services.to_vec(),
            rejected: rejected_series(baseline, candidate)?,
            energy: SeriesPair {
                baseline: energy_series(baseline)?,
                candidate: energy_series(candidate)?,
            },
            unsatisfied: SeriesPair {
                baseline: unsatisfied_totals(baseline, services)?,
                candidate: unsatisfied_totals(candidate, services)?,
            },
            delay_p95: SeriesPair {
                baseline: delay_p95(baseline, services)?,
                candidate: delay_p95(candidate, services)?,
            },
        };

        debug!(
            "extracted metrics: {} time steps, {} services",
            comparison.time.len(),
            comparison.services.len()
        );

        Ok(comparison)
    }
}

/// Row-wise sum of every `rejected_req_*` column. The column set is selected
/// from the baseline header and applied to both tables.
pub fn rejected_series(baseline: &Table, candidate: &Table) -> Result<SeriesPair> {
    let names = baseline.names_with_prefix(REJECTED_PREFIX);
    if names.is_empty() {
        return Err(Error::NoMatchingColumns(format!("{}*", REJECTED_PREFIX)));
    }
    Ok(SeriesPair {
        baseline: baseline.sum_rows(&names)?,
        candidate: candidate.sum_rows(&names)?,
    })
}

/// Elementwise sum of dynamic server power, idle server power, and link
/// power.
pub fn energy_series(table: &Table) -> Result<Vec<f64>> {
    let names: Vec<String> = ENERGY_COLUMNS.iter().map(|s| s.to_string()).collect();
    table.sum_rows(&names)
}

/// Full-column sum of `unsatisf_req_{service}` for each service.
pub fn unsatisfied_totals(table: &Table, services: &[String]) -> Result<Vec<f64>> {
    services
        .iter()
        .map(|service| table.column_total(&format!("{}{}", UNSATISFIED_PREFIX, service)))
        .collect()
}

/// 95th percentile of the pooled values of every `delay_*{service}` column,
/// for each service.
pub fn delay_p95(table: &Table, services: &[String]) -> Result<Vec<f64>> {
    services
        .iter()
        .map(|service| {
            let names = table.names_matching(DELAY_PREFIX, service);
            if names.is_empty() {
                return Err(Error::NoMatchingColumns(format!(
                    "{}*{}",
                    DELAY_PREFIX, service
                )));
            }
            let mut pool = Vec::with_capacity(names.len() * table.rows());
            for name in &names {
                pool.extend_from_slice(table.column(name)?);
            }
            percentile(&pool, DELAY_PERCENTILE).ok_or_else(|| Error::NoSamples(service.clone()))
        })
        .collect()
}

/// Percentile with linear interpolation between closest ranks. Values must
/// be finite; `Table` guarantees this for loaded data.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|x, y| x.partial_cmp(y).unwrap());

    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        Some(sorted[lower])
    } else {
        Some(sorted[lower] + (rank - lower as f64) * (sorted[upper] - sorted[lower]))
    }
}
