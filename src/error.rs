// Copyright 2019 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use thiserror::Error;

/// Result type alias for comparison runs.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{source_name}: line {line}, column {column}: invalid value {value:?}")]
    InvalidValue {
        source_name: String,
        line: usize,
        column: String,
        value: String,
    },

    #[error(
        "row count mismatch: {baseline} has {baseline_rows} rows, {candidate} has {candidate_rows} rows"
    )]
    RowCountMismatch {
        baseline: String,
        baseline_rows: usize,
        candidate: String,
        candidate_rows: usize,
    },

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("no columns matching {0}")]
    NoMatchingColumns(String),

    #[error("no samples for service: {0}")]
    NoSamples(String),

    #[error("png encoding error: {0}")]
    Png(#[from] png::EncodingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_mismatch_names_both_files() {
        let e = Error::RowCountMismatch {
            baseline: "base.csv".to_string(),
            baseline_rows: 10,
            candidate: "cand.csv".to_string(),
            candidate_rows: 8,
        };
        let msg = e.to_string();
        assert!(msg.contains("base.csv"));
        assert!(msg.contains("10"));
        assert!(msg.contains("cand.csv"));
        assert!(msg.contains("8"));
    }

    #[test]
    fn invalid_value_points_at_location() {
        let e = Error::InvalidValue {
            source_name: "results.csv".to_string(),
            line: 3,
            column: "delay_net_svc".to_string(),
            value: "oops".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("results.csv"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains("delay_net_svc"));
        assert!(msg.contains("\"oops\""));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
    }
}
