use chrono::NaiveDateTime;
use serde::Serialize;

use crate::timestamp::Stamp;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A pre-loaded tabular dataset: one header row plus string cells.
///
/// Readers in `fuelcheck-io` produce this for both the readings file and
/// the bunker report; the engine never touches files.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, trimming header names (and a leading byte-order mark)
    /// and padding short rows so every row has exactly one cell per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, String::new());
                r
            })
            .collect();
        Self { headers, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Text of `column` in `record`; empty when the record is shorter than the
/// header. Tables built field-by-field skip the padding [`Table::new`] does.
pub fn field(record: &[String], column: usize) -> &str {
    record.get(column).map_or("", String::as_str)
}

/// Both datasets a run consumes.
pub struct ReconInput {
    pub readings: Table,
    pub bunkers: Table,
}

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// A single input cell, classified once at load time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Blank,
    Text(String),
}

impl Cell {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Blank;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    /// Value as an arithmetic operand: blanks count as zero, text is undefined.
    pub fn operand(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Blank => Some(0.0),
            Self::Text(_) => None,
        }
    }

    /// Contribution to a column sum: text is ignored.
    pub fn summand(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            _ => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Readings + deliveries
// ---------------------------------------------------------------------------

/// One time-stamped observation row from the readings dataset.
#[derive(Debug, Clone)]
pub struct Reading {
    /// Zero-based position in the source table.
    pub row: usize,
    pub stamp: Stamp,
    /// One classified cell per source column, in source column order.
    pub cells: Vec<Cell>,
}

impl Reading {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.stamp.at
    }

    pub fn cell(&self, column: usize) -> &Cell {
        static BLANK: Cell = Cell::Blank;
        self.cells.get(column).unwrap_or(&BLANK)
    }
}

/// One discrete refueling event from the bunker report.
#[derive(Debug, Clone, Serialize)]
pub struct BunkerDelivery {
    /// Zero-based position in the bunker report; the tie-break order.
    pub id: usize,
    #[serde(flatten)]
    pub stamp: Stamp,
    pub fuel_type: String,
    pub mass: f64,
}

impl BunkerDelivery {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.stamp.at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_classification() {
        assert_eq!(Cell::parse(" 12.5 "), Cell::Number(12.5));
        assert_eq!(Cell::parse(""), Cell::Blank);
        assert_eq!(Cell::parse("   "), Cell::Blank);
        assert_eq!(Cell::parse("n/a"), Cell::Text("n/a".into()));
        assert_eq!(Cell::parse("NaN"), Cell::Text("NaN".into()));
    }

    #[test]
    fn operands_and_summands() {
        assert_eq!(Cell::Blank.operand(), Some(0.0));
        assert_eq!(Cell::Text("x".into()).operand(), None);
        assert_eq!(Cell::Text("x".into()).summand(), 0.0);
        assert_eq!(Cell::Number(-3.0).summand(), -3.0);
    }

    #[test]
    fn field_and_cell_out_of_range_are_blank() {
        let record = vec!["x".to_string()];
        assert_eq!(field(&record, 0), "x");
        assert_eq!(field(&record, 3), "");

        let reading = Reading {
            row: 0,
            stamp: Stamp::parse("01.01.2024", "12:00"),
            cells: vec![Cell::Number(1.0)],
        };
        assert_eq!(reading.cell(0), &Cell::Number(1.0));
        assert_eq!(reading.cell(5), &Cell::Blank);
    }

    #[test]
    fn table_pads_short_rows() {
        let table = Table::new(
            vec![" a ".into(), "b".into(), "c".into()],
            vec![vec!["1".into()], vec!["1".into(), "2".into(), "3".into()]],
        );
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.column("b"), Some(1));
        assert_eq!(table.column("z"), None);
        assert_eq!(table.len(), 2);
    }
}
