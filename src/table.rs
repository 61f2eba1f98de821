//! Flat string tables and their CSV round-trip.
//!
//! Scraped tables have source-defined columns, so everything between the
//! fetchers and the typed parsers stays stringly: one header row plus data
//! rows. Typing happens at the parser layer with lenient numeric parsing.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column, if the header has it.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (row, column index); short rows yield None.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("open {} for writing", path.display()))?;
        writer
            .write_record(&self.columns)
            .context("write header row")?;
        for row in &self.rows {
            writer.write_record(row).context("write data row")?;
        }
        writer.flush().context("flush csv")?;
        Ok(())
    }

    /// Reads a CSV written by `save` (or by hand). Rows may be ragged; an
    /// empty file loads as an empty table.
    pub fn load(path: &Path) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("open {}", path.display()))?;
        let mut records = reader.records();
        let columns = match records.next() {
            Some(first) => first
                .context("read header row")?
                .iter()
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };
        let mut rows = Vec::new();
        for record in records {
            let record = record.context("read data row")?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Table { columns, rows })
    }
}

/// Lenient numeric cell parse: trims, drops decorations, treats `-` and
/// empty as absent, tolerates thousands separators ("1,234").
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == ',')
        .collect();
    let cleaned = cleaned.replace(',', "");
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Number rendering for CSV cells: integral values without decimals,
/// everything else with up to two, trailing zeros trimmed.
pub fn fmt_num(value: f64) -> String {
    if value.fract().abs() < 0.005 {
        return format!("{value:.0}");
    }
    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    rendered.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_handles_decorated_cells() {
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number(" 55.4 "), Some(55.4));
        assert_eq!(parse_number("55.4%"), Some(55.4));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn fmt_num_trims_integral_and_trailing_zeros() {
        assert_eq!(fmt_num(113.0), "113");
        assert_eq!(fmt_num(13.52), "13.52");
        assert_eq!(fmt_num(55.4), "55.4");
        assert_eq!(fmt_num(0.0), "0");
    }

    #[test]
    fn column_lookup_and_cells() {
        let table = Table {
            columns: vec!["stat".into(), "shots".into()],
            rows: vec![vec!["Normal".into(), "113".into()], vec!["Fast".into()]],
        };
        assert_eq!(table.column("shots"), Some(1));
        assert_eq!(table.column("goals"), None);
        assert_eq!(table.cell(0, 1), Some("113"));
        assert_eq!(table.cell(1, 1), None);
    }
}
