use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::join::{DataRow, RawValue};

/// Parse a delimiter argument: a single ASCII character, or `tab`.
pub fn parse_delimiter(input: &str) -> Result<u8> {
    match input {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        s => Err(anyhow!("Delimiter must be a single ASCII character or 'tab', got '{}'", s)),
    }
}

/// Read delimited text with a header row into rows keyed by column name.
///
/// Empty cells are missing values; every other cell stays text until a
/// number normalizer reads it. Short records leave their trailing columns missing.
pub fn read_rows<R: Read>(reader: R, delimiter: u8) -> Result<Vec<DataRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV record {}", index + 1))?;
        let mut row = DataRow::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            let value = if cell.trim().is_empty() {
                RawValue::Missing
            } else {
                RawValue::Text(cell.to_string())
            };
            row.insert(header.as_str(), value);
        }
        rows.push(row);
    }

    Ok(rows)
}

pub fn read_rows_from_stdin(delimiter: u8) -> Result<Vec<DataRow>> {
    read_rows(io::stdin(), delimiter).context("Failed to read data from stdin")
}

pub fn read_rows_from_path(path: &Path, delimiter: u8) -> Result<Vec<DataRow>> {
    let file = File::open(path).with_context(|| format!("Failed to open data file {}", path.display()))?;
    read_rows(file, delimiter).with_context(|| format!("Failed to read data file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn rows_from_string(content: &str, delimiter: u8) -> Result<Vec<DataRow>> {
        read_rows(Cursor::new(content), delimiter)
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn test_read_rows_basic() {
        let rows = rows_from_string("DEP,valeur\n01,\"10,5\"\n75,20", b',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("DEP").as_deref(), Some("01"));
        assert_eq!(rows[0].text("valeur").as_deref(), Some("10,5"));
        assert_eq!(rows[1].get("valeur"), &RawValue::Text("20".into()));
    }

    #[test]
    fn test_read_rows_semicolon() {
        let rows = rows_from_string("dep;mediane\n2A;7,5\n", b';').unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("mediane").as_deref(), Some("7,5"));
    }

    #[test]
    fn test_empty_cells_are_missing() {
        let rows = rows_from_string("DEP,v,w\n01,,3\n02,4", b',').unwrap();
        assert_eq!(rows[0].get("v"), &RawValue::Missing);
        assert_eq!(rows[1].get("w"), &RawValue::Missing);
        assert_eq!(rows[1].text("v").as_deref(), Some("4"));
    }

    #[test]
    fn test_headers_are_trimmed() {
        let rows = rows_from_string("\u{feff}DEP , température\n01,20.5", b',').unwrap();
        assert_eq!(rows[0].text("DEP").as_deref(), Some("01"));
        assert_eq!(rows[0].text("température").as_deref(), Some("20.5"));
    }

    #[test]
    fn test_read_rows_empty_data() {
        let rows = rows_from_string("DEP,v\n", b',').unwrap();
        assert!(rows.is_empty());
    }
}
