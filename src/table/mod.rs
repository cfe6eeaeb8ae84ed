// Copyright 2019 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::{Error, Result};

use csv::ReaderBuilder;
use log::debug;

use std::collections::HashMap;
use std::io::Read;

/// A column-oriented table of finite `f64` values parsed from a CSV file
/// with a header row. All columns have the same length.
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
}

impl Table {
    pub fn from_path(path: &str) -> Result<Table> {
        let reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
        Self::from_csv(reader, path)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Table> {
        let reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        Self::from_csv(reader, "<reader>")
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>, source_name: &str) -> Result<Table> {
        let names: Vec<String> = reader
            .headers()?
            .iter()
            .map(|name| name.trim().to_string())
            .collect();

        let mut columns = vec![Vec::new(); names.len()];
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for (col, field) in record.iter().enumerate() {
                let value = field
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| Error::InvalidValue {
                        source_name: source_name.to_string(),
                        // header occupies line 1
                        line: row + 2,
                        column: names.get(col).cloned().unwrap_or_default(),
                        value: field.to_string(),
                    })?;
                columns[col].push(value);
            }
        }

        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        debug!(
            "{}: parsed {} columns x {} rows",
            source_name,
            names.len(),
            columns.first().map_or(0, Vec::len)
        );

        Ok(Table {
            names,
            columns,
            index,
        })
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.index
            .get(name)
            .map(|&i| self.columns[i].as_slice())
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Column names starting with `prefix`, in header order.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Column names starting with `prefix` and ending with `suffix`, in
    /// header order.
    pub fn names_matching(&self, prefix: &str, suffix: &str) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| name.starts_with(prefix) && name.ends_with(suffix))
            .cloned()
            .collect()
    }

    /// Row-wise sum across the named columns.
    pub fn sum_rows(&self, names: &[String]) -> Result<Vec<f64>> {
        let mut sums = vec![0.0; self.rows()];
        for name in names {
            for (sum, value) in sums.iter_mut().zip(self.column(name)?) {
                *sum += value;
            }
        }
        Ok(sums)
    }

    /// Sum of every value in the named column.
    pub fn column_total(&self, name: &str) -> Result<f64> {
        Ok(self.column(name)?.iter().sum())
    }
}

/// Loads the baseline and candidate tables and enforces that they cover the
/// same timeline. A row-count mismatch fails the load before any metric is
/// computed.
pub fn load_pair(baseline_path: &str, candidate_path: &str) -> Result<(Table, Table)> {
    let baseline = Table::from_path(baseline_path)?;
    let candidate = Table::from_path(candidate_path)?;
    if baseline.rows() != candidate.rows() {
        return Err(Error::RowCountMismatch {
            baseline: baseline_path.to_string(),
            baseline_rows: baseline.rows(),
            candidate: candidate_path.to_string(),
            candidate_rows: candidate.rows(),
        });
    }
    Ok((baseline, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn parse_basic() {
        let t = table("time,a,b\n0,1.5,2\n1,3,4\n");
        assert_eq!(t.rows(), 2);
        assert_eq!(t.names(), &["time", "a", "b"]);
        assert_eq!(t.column("a").unwrap(), &[1.5, 3.0]);
        assert_eq!(t.column("b").unwrap(), &[2.0, 4.0]);
    }

    #[test]
    fn parse_empty_body() {
        let t = table("time,a\n");
        assert_eq!(t.rows(), 0);
        assert_eq!(t.names().len(), 2);
    }

    #[test]
    fn missing_column() {
        let t = table("time,a\n0,1\n");
        match t.column("nope") {
            Err(Error::MissingColumn(name)) => assert_eq!(name, "nope"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn invalid_value_names_location() {
        let result = Table::from_reader("time,a\n0,1\n1,oops\n".as_bytes());
        match result {
            Err(Error::InvalidValue { line, column, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "a");
            }
            _ => panic!("expected InvalidValue"),
        }
    }

    #[test]
    fn non_finite_values_are_rejected() {
        for bad in &["NaN", "inf", "-inf"] {
            let csv = format!("time,a\n0,{}\n", bad);
            match Table::from_reader(csv.as_bytes()) {
                Err(Error::InvalidValue { line, column, value, .. }) => {
                    assert_eq!(line, 2);
                    assert_eq!(column, "a");
                    assert_eq!(&value, bad);
                }
                _ => panic!("expected InvalidValue for {}", bad),
            }
        }
    }

    #[test]
    fn prefix_and_suffix_matching() {
        let t = table("time,rejected_req_a,rejected_req_b,delay_net_svc,delay_cpu_svc,other\n0,1,2,3,4,5\n");
        assert_eq!(
            t.names_with_prefix("rejected_req_"),
            vec!["rejected_req_a", "rejected_req_b"]
        );
        assert_eq!(
            t.names_matching("delay_", "svc"),
            vec!["delay_net_svc", "delay_cpu_svc"]
        );
        assert!(t.names_matching("delay_", "nope").is_empty());
    }

    #[test]
    fn sum_rows_and_totals() {
        let t = table("a,b\n1,10\n2,20\n3,30\n");
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(t.sum_rows(&names).unwrap(), vec![11.0, 22.0, 33.0]);
        assert_eq!(t.column_total("b").unwrap(), 60.0);
    }

    #[test]
    fn load_pair_row_count_mismatch() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.csv");
        let cand = dir.path().join("cand.csv");
        let mut f = std::fs::File::create(&base).unwrap();
        write!(f, "time,a\n0,1\n1,2\n").unwrap();
        let mut f = std::fs::File::create(&cand).unwrap();
        write!(f, "time,a\n0,1\n").unwrap();

        match load_pair(base.to_str().unwrap(), cand.to_str().unwrap()) {
            Err(Error::RowCountMismatch {
                baseline_rows,
                candidate_rows,
                ..
            }) => {
                assert_eq!(baseline_rows, 2);
                assert_eq!(candidate_rows, 1);
            }
            _ => panic!("expected RowCountMismatch"),
        }
    }
}
