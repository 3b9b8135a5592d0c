// 📥 Raw Records - government settlement/street tables as published
// JSON arrays, data.gov.il datastore envelopes, or CSV exports

use crate::error::LoadError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// ============================================================================
// CORE TYPES
// ============================================================================

/// A symbol cell. The published tables mix numbers and strings for the same
/// column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Text form of the cell, trimmed.
    pub fn to_trimmed_string(&self) -> String {
        match self {
            RawValue::Int(n) => n.to_string(),
            RawValue::Float(f) => f.to_string(),
            RawValue::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// Name cells are kept as text. A JSON number or bool is rendered back
/// into its literal form.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextCell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn text_cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<TextCell>::deserialize(deserializer)?.map(|cell| match cell {
        TextCell::Text(s) => s,
        TextCell::Int(n) => n.to_string(),
        TextCell::Float(f) => f.to_string(),
        TextCell::Bool(b) => b.to_string(),
    }))
}

/// One row of the settlements table. Columns we don't use are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCity {
    #[serde(rename = "סמל_ישוב", default)]
    pub symbol: Option<RawValue>,

    #[serde(rename = "שם_ישוב", default, deserialize_with = "text_cell")]
    pub name: Option<String>,

    #[serde(rename = "שם_מועצה", default, deserialize_with = "text_cell")]
    pub council_name: Option<String>,
}

/// One row of the streets table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStreet {
    #[serde(rename = "סמל_ישוב", default)]
    pub city_symbol: Option<RawValue>,

    #[serde(rename = "שם_רחוב", default, deserialize_with = "text_cell")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Csv,
}

/// Either a bare array or the `datastore_search` response shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonDocument<T> {
    Records(Vec<T>),
    Envelope { result: RecordSet<T> },
}

#[derive(Deserialize)]
struct RecordSet<T> {
    records: Vec<T>,
}

// ============================================================================
// LOADING
// ============================================================================

/// Pick the decoder from the file extension.
pub fn detect_format(path: &Path) -> Result<SourceFormat, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => Ok(SourceFormat::Json),
        Some("csv") => Ok(SourceFormat::Csv),
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

pub fn load_cities(path: &Path) -> Result<Vec<RawCity>> {
    load_records(path).with_context(|| format!("Failed to load cities from {}", path.display()))
}

pub fn load_streets(path: &Path) -> Result<Vec<RawStreet>> {
    load_records(path).with_context(|| format!("Failed to load streets from {}", path.display()))
}

fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let format = detect_format(path)?;
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    match format {
        SourceFormat::Json => parse_json(BufReader::new(file)),
        SourceFormat::Csv => parse_csv(file),
    }
}

pub fn parse_json<T: DeserializeOwned, R: std::io::Read>(reader: R) -> Result<Vec<T>> {
    let document: JsonDocument<T> =
        serde_json::from_reader(reader).context("Failed to parse JSON records")?;

    Ok(match document {
        JsonDocument::Records(records) => records,
        JsonDocument::Envelope { result } => result.records,
    })
}

/// Every CSV cell is handed over as a JSON string, so CSV and JSON rows go
/// through the same decoding and empty cells read as `""`.
pub fn parse_csv<T: DeserializeOwned, R: std::io::Read>(reader: R) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();

    let mut records = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        // +2: header row, 1-based lines
        let line = line_num + 2;
        let row = result.with_context(|| format!("Failed to parse CSV line {}", line))?;

        let cells: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();

        let record: T = serde_json::from_value(Value::Object(cells))
            .with_context(|| format!("Failed to parse CSV line {}", line))?;
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
