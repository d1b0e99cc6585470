//! Reading records, configurations and rules from files.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use plansync_model::{FieldValue, MappingConfiguration, Record, ValidationRule};

/// Read source records from a JSON array of objects or, for `.csv` files,
/// a delimited file with a header row.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let records = if is_csv {
        let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
        records_from_csv(file).with_context(|| format!("parse {}", path.display()))?
    } else {
        read_json(path)?
    };
    debug!(path = %path.display(), records = records.len(), "records loaded");
    Ok(records)
}

/// Parse delimited text into records.
///
/// Every cell becomes a text value; empty cells become null.
pub fn records_from_csv<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let headers = reader.headers().context("read header row")?.clone();
    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let row_values = result.with_context(|| format!("read row {}", row + 1))?;
        let record: Record = headers
            .iter()
            .zip(row_values.iter())
            .map(|(header, cell)| {
                let value = if cell.is_empty() {
                    FieldValue::Null
                } else {
                    FieldValue::text(cell)
                };
                (header, value)
            })
            .collect();
        records.push(record);
    }
    Ok(records)
}

pub fn read_configuration(path: &Path) -> Result<MappingConfiguration> {
    read_json(path)
}

/// Read a single rule or an array of rules.
pub fn read_rules(path: &Path) -> Result<Vec<ValidationRule>> {
    let value: serde_json::Value = read_json(path)?;
    let rules = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|rule| vec![rule])
    };
    rules.with_context(|| format!("parse rules in {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))
}
