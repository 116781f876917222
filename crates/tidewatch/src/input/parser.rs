//! Delimited-text parser for sensor uploads.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::source::{DataTable, SourceMetadata};
use crate::error::{Result, TidewatchError};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Parses delimited upload files into a [`DataTable`].
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the data table and metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();

        let contents = fs::read(path).map_err(|e| TidewatchError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let hash = format!("sha256:{:x}", Sha256::digest(&contents));

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(&contents)?,
        };

        let table = self.parse_bytes(&contents, delimiter)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        tracing::debug!(
            file = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            format = %format,
            "parsed upload"
        );

        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            contents.len() as u64,
            format,
            table.row_count(),
            table.column_count(),
        );

        Ok((table, metadata))
    }

    /// Parse bytes with a known delimiter. The first row is the header.
    pub fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(TidewatchError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        let mut grid = Vec::new();

        for (row_idx, result) in reader.records().enumerate() {
            if self.config.max_rows.is_some_and(|max| row_idx >= max) {
                break;
            }

            let record = result?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();

            // Ragged rows are padded or truncated to the header width
            row.resize(expected_cols, String::new());
            grid.push(row);
        }

        if grid.is_empty() {
            return Err(TidewatchError::EmptyData("No data rows found".to_string()));
        }

        Ok(DataTable::from_grid(headers, grid))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let lines: Vec<String> = BufReader::new(bytes)
        .lines()
        .take(10)
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(TidewatchError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);

        // Tab gets a slight bonus as it rarely appears inside values
        let score = if consistent {
            first_count * 1000 + if delim == b'\t' { 100 } else { 0 }
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Scalar;

    #[test]
    fn test_detect_delimiter_csv() {
        let data = b"a,b,c\n1,2,3\n4,5,6";
        assert_eq!(detect_delimiter(data).unwrap(), b',');
    }

    #[test]
    fn test_detect_delimiter_tsv() {
        let data = b"a\tb\tc\n1\t2\t3\n4\t5\t6";
        assert_eq!(detect_delimiter(data).unwrap(), b'\t');
    }

    #[test]
    fn test_parse_csv() {
        let parser = Parser::new();
        let data = b"station,wind_speed,tide_level\nA,12.5,1.1\nB,NA,0.9";
        let table = parser.parse_bytes(data, b',').unwrap();

        assert_eq!(table.columns, vec!["station", "wind_speed", "tide_level"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0]["station"], Scalar::Text("A".into()));
        assert_eq!(table.rows[1]["wind_speed"], Scalar::Null);
    }

    #[test]
    fn test_parse_pads_ragged_rows() {
        let parser = Parser::new();
        let data = b"a,b,c\n1,2\n4,5,6,7";
        let table = parser.parse_bytes(data, b',').unwrap();

        assert_eq!(table.rows[0]["c"], Scalar::Null);
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn test_parse_header_only_is_empty() {
        let parser = Parser::new();
        let err = parser.parse_bytes(b"a,b\n", b',').unwrap_err();
        assert!(matches!(err, TidewatchError::EmptyData(_)));
    }

    #[test]
    fn test_max_rows() {
        let parser = Parser::with_config(ParserConfig {
            max_rows: Some(1),
            ..ParserConfig::default()
        });
        let table = parser.parse_bytes(b"a\n1\n2\n3", b',').unwrap();
        assert_eq!(table.row_count(), 1);
    }
}
