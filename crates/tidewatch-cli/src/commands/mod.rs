//! CLI command implementations.

pub mod analyze;
pub mod events;
pub mod schema;
pub mod show;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use colored::{ColoredString, Colorize};
use tidewatch::{DataTable, Parser, RiskLevel};

/// Risk level colored by severity.
pub(crate) fn paint_level(level: RiskLevel) -> ColoredString {
    match level {
        RiskLevel::Low => level.label().green(),
        RiskLevel::Medium => level.label().yellow(),
        RiskLevel::High => level.label().red(),
        RiskLevel::Critical => level.label().red().bold(),
    }
}

/// Load a delimited or JSON (array of objects) file.
pub(crate) fn load_table(path: &Path) -> Result<DataTable, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let file = File::open(path)?;
        let value: serde_json::Value = serde_json::from_reader(BufReader::new(file))?;
        return Ok(DataTable::from_json(value)?);
    }

    let (table, _source) = Parser::new().parse_file(path)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_json_rows() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(br#"[{"tide_level": 1.2}, {"tide_level": 1.4, "station": "pier"}]"#)
            .unwrap();

        let table = load_table(file.path()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns, vec!["tide_level", "station"]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_table(Path::new("/nonexistent/harbor.csv")).is_err());
    }
}
