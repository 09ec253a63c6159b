use crate::error::{EtlError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// One raw row keyed by header name.
pub type Row = HashMap<String, String>;

/// Tabular content of one source file.
#[derive(Debug, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows the reader could not parse, with their line number.
    pub malformed: Vec<String>,
}

/// Capability the ingestor consumes: turn a file into header-keyed rows.
pub trait DataSource {
    fn kind(&self) -> SourceKind;
    fn read(&self, path: &Path) -> Result<Table>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
}

impl FromStr for SourceKind {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceKind::Csv),
            _ => Err(EtlError::UnsupportedSource(s.to_string())),
        }
    }
}

pub fn create_source(kind: &str) -> Result<Box<dyn DataSource>> {
    match kind.parse::<SourceKind>()? {
        SourceKind::Csv => Ok(Box::new(CsvSource)),
    }
}

/// Header-first CSV. Bytes that are not valid UTF-8 are decoded as Latin-1.
pub struct CsvSource;

impl CsvSource {
    fn decode(bytes: Vec<u8>) -> String {
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!("Input is not valid UTF-8, decoding as Latin-1");
                e.into_bytes().into_iter().map(char::from).collect()
            }
        };
        match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        }
    }
}

impl DataSource for CsvSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Csv
    }

    fn read(&self, path: &Path) -> Result<Table> {
        let text = Self::decode(fs::read(path)?);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut table = Table {
            columns,
            ..Table::default()
        };
        for (idx, result) in reader.records().enumerate() {
            // header is line 1
            let line = idx + 2;
            match result {
                Ok(record) => {
                    let row: Row = table
                        .columns
                        .iter()
                        .zip(record.iter())
                        .map(|(column, value)| (column.clone(), value.to_string()))
                        .collect();
                    table.rows.push(row);
                }
                Err(e) => table.malformed.push(format!("line {}: {}", line, e)),
            }
        }
        Ok(table)
    }
}
