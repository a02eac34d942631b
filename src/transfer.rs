// 📦 Import / Export - JSON array of {text, category} records
// CSV export is a flat dump of the same two columns

use crate::quote::{Quote, QuoteRecord};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "quotes.json",
            ExportFormat::Csv => "quotes.csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => bail!("Unknown export format '{}' (expected json or csv)", other),
        }
    }
}

// ============================================================================
// IMPORT
// ============================================================================

/// Parse an import document. The top level must be a JSON array;
/// elements that are not objects are skipped.
pub fn parse_import(json: &str) -> Result<Vec<QuoteRecord>> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("Import file is not valid JSON")?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => bail!("Import file must contain a JSON array of quotes"),
    };

    let records = items
        .into_iter()
        .filter(|item| item.is_object())
        .map(serde_json::from_value::<QuoteRecord>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read quote records")?;

    Ok(records)
}

pub fn read_import_file(path: &Path) -> Result<Vec<QuoteRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file {}", path.display()))?;
    parse_import(&content)
}

// ============================================================================
// EXPORT
// ============================================================================

pub fn export_json(quotes: &[Quote]) -> Result<String> {
    serde_json::to_string_pretty(quotes).context("Failed to serialize quotes")
}

pub fn export_csv(quotes: &[Quote]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for quote in quotes {
        writer.serialize(quote).context("Failed to write CSV row")?;
    }
    // Header is written with the first row; keep it for empty exports too
    if quotes.is_empty() {
        writer.write_record(["text", "category"])?;
    }
    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

pub fn export(quotes: &[Quote], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => export_json(quotes),
        ExportFormat::Csv => export_csv(quotes),
    }
}

pub fn write_export_file(path: &Path, quotes: &[Quote], format: ExportFormat) -> Result<()> {
    let content = export(quotes, format)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write export file {}", path.display()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_skips_non_objects() {
        let json = r#"[{"text": "A", "category": "x"}, 5, "B", {"category": "y"}]"#;

        let records = parse_import(json).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], QuoteRecord::new("A", "x"));
        assert!(!records[1].is_usable());
    }

    #[test]
    fn test_parse_import_rejects_non_array() {
        let err = parse_import(r#"{"text": "A"}"#).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn test_parse_import_rejects_invalid_json() {
        assert!(parse_import("not json").is_err());
    }

    #[test]
    fn test_export_json_reads_back() {
        let quotes = vec![Quote::new("A", "x"), Quote::new("B", "")];

        let json = export_json(&quotes).unwrap();
        let records = parse_import(&json).unwrap();

        let back: Vec<Quote> = records.iter().filter_map(|r| r.to_quote()).collect();
        assert_eq!(back, quotes);
        assert!(json.contains("\n  "));
    }

    #[test]
    fn test_export_csv() {
        let quotes = vec![Quote::new("Hello, world", "x")];

        let csv = export_csv(&quotes).unwrap();

        assert_eq!(csv, "text,category\n\"Hello, world\",x\n");
    }

    #[test]
    fn test_export_csv_empty_has_header() {
        assert_eq!(export_csv(&[]).unwrap(), "text,category\n");
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.json");
        let quotes = vec![Quote::new("A", "x")];

        write_export_file(&path, &quotes, ExportFormat::Json).unwrap();
        let records = read_import_file(&path).unwrap();

        assert_eq!(records, vec![QuoteRecord::new("A", "x")]);
    }
}
