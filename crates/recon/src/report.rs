//! Ledger sheets and the run report.
//!
//! A [`Sheet`] is the fully computed form of one output tab: every cell is
//! a value, and the column roles the writer needs to re-emit formulas are
//! recorded as indices.

use serde::Serialize;

use crate::config::PassOrder;
use crate::ledger::{column_sum, compute_totals, rob_differences, ColumnTotal, Totals};
use crate::matcher::{Attribution, MatchOutput};
use crate::model::{BunkerDelivery, Cell, Reading};
use crate::schema::{BdnColumns, FuelColumns};

pub const COLUMN_BUNKERS: &str = "Bunkers";
pub const COLUMN_ROB_DIFFERENCE: &str = "ROB_Difference";

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    Fuel,
    Bdn,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerRow {
    /// Zero-based row in the readings table.
    pub source_row: usize,
    pub timestamp_valid: bool,
    /// One cell per sheet column.
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sheet {
    pub name: String,
    pub kind: SheetKind,
    pub columns: Vec<String>,
    pub rows: Vec<LedgerRow>,
    pub rob_column: usize,
    pub bunkers_column: usize,
    pub rob_difference_column: usize,
    pub consumption_columns: Vec<usize>,
    pub totals: Totals,
    pub attributions: Vec<Attribution>,
}

impl Sheet {
    pub fn rob_difference(&self, row: usize) -> f64 {
        self.rows[row].cells[self.rob_difference_column].summand()
    }

    pub fn bunkers(&self, row: usize) -> f64 {
        self.rows[row].cells[self.bunkers_column].summand()
    }

    /// Rows whose ROB difference is negative: ROB rose without a matching bunker.
    pub fn negative_rows(&self) -> Vec<usize> {
        (0..self.rows.len()).filter(|&i| self.rob_difference(i) < 0.0).collect()
    }
}

/// Column layout under construction: header names plus the source of each
/// value column.
struct Layout {
    columns: Vec<String>,
    sources: Vec<Source>,
}

enum Source {
    Date,
    Time,
    Column(Option<usize>),
    Bunkers,
    RobDifference,
}

impl Layout {
    fn new(date_header: &str, time_header: &str) -> Self {
        Self {
            columns: vec![date_header.to_string(), time_header.to_string()],
            sources: vec![Source::Date, Source::Time],
        }
    }

    fn push(&mut self, name: &str, source: Source) -> usize {
        self.columns.push(name.to_string());
        self.sources.push(source);
        self.columns.len() - 1
    }

    fn build(
        self,
        name: String,
        kind: SheetKind,
        readings: &[Reading],
        rob_column: usize,
        consumption_columns: Vec<usize>,
        matched: MatchOutput,
    ) -> Sheet {
        let bunkers_column = self.position(|s| matches!(s, Source::Bunkers));
        let rob_difference_column = self.position(|s| matches!(s, Source::RobDifference));

        let mut rows: Vec<LedgerRow> = readings
            .iter()
            .zip(&matched.bunkers)
            .map(|(reading, &bunkered)| LedgerRow {
                source_row: reading.row,
                timestamp_valid: reading.stamp.is_valid(),
                cells: self
                    .sources
                    .iter()
                    .map(|source| match source {
                        Source::Date => text_cell(reading.stamp.display_date()),
                        Source::Time => text_cell(reading.stamp.time_text.clone()),
                        Source::Column(Some(index)) => reading.cell(*index).clone(),
                        Source::Column(None) => Cell::Number(0.0),
                        Source::Bunkers => Cell::Number(bunkered),
                        Source::RobDifference => Cell::Number(0.0),
                    })
                    .collect(),
            })
            .collect();

        let rob: Vec<Cell> = rows.iter().map(|r| r.cells[rob_column].clone()).collect();
        let differences = rob_differences(&rob, &matched.bunkers);
        for (row, diff) in rows.iter_mut().zip(&differences) {
            row.cells[rob_difference_column] = Cell::Number(*diff);
        }

        let consumption = consumption_columns
            .iter()
            .map(|&c| ColumnTotal {
                label: self.columns[c].clone(),
                sum: column_sum(rows.iter().map(|r| &r.cells[c])),
            })
            .collect();
        let totals = compute_totals(consumption, &matched.bunkers, &differences);

        Sheet {
            name,
            kind,
            columns: self.columns,
            rows,
            rob_column,
            bunkers_column,
            rob_difference_column,
            consumption_columns,
            totals,
            attributions: matched.attributions,
        }
    }

    fn position(&self, pred: impl Fn(&Source) -> bool) -> usize {
        self.sources.iter().position(pred).unwrap_or(0)
    }
}

fn text_cell(s: String) -> Cell {
    if s.trim().is_empty() {
        Cell::Blank
    } else {
        Cell::Text(s)
    }
}

/// Per-fuel sheet: date, time, the fuel's metric columns, `<Code>_ROB`,
/// `Bunkers`, `ROB_Difference`.
pub fn assemble_fuel_sheet(
    readings: &[Reading],
    date_header: &str,
    time_header: &str,
    fuel: &FuelColumns,
    matched: MatchOutput,
) -> Sheet {
    let mut layout = Layout::new(date_header, time_header);
    let mut consumption_columns = Vec::new();
    for metric in &fuel.metrics {
        let at = layout.push(&metric.name, Source::Column(Some(metric.index)));
        if fuel.consumption.contains(metric) {
            consumption_columns.push(at);
        }
    }
    let rob_column = layout.push(&fuel.rob.name, Source::Column(Some(fuel.rob.index)));
    layout.push(COLUMN_BUNKERS, Source::Bunkers);
    layout.push(COLUMN_ROB_DIFFERENCE, Source::RobDifference);

    layout.build(fuel.code.clone(), SheetKind::Fuel, readings, rob_column, consumption_columns, matched)
}

/// Combined BDN sheet: date, time, equipment categories, the aggregate ROB,
/// `Bunkers`, trailing pass-through columns, `ROB_Difference`. Absent
/// source columns are written as zeros.
pub fn assemble_bdn_sheet(
    readings: &[Reading],
    date_header: &str,
    time_header: &str,
    name: &str,
    bdn: &BdnColumns,
    matched: MatchOutput,
) -> Sheet {
    let mut layout = Layout::new(date_header, time_header);
    let consumption_columns = bdn
        .categories
        .iter()
        .map(|(column, index)| layout.push(column, Source::Column(*index)))
        .collect();
    let rob_column = layout.push(&bdn.rob.0, Source::Column(bdn.rob.1));
    layout.push(COLUMN_BUNKERS, Source::Bunkers);
    for (column, index) in &bdn.trailing {
        layout.push(column, Source::Column(*index));
    }
    layout.push(COLUMN_ROB_DIFFERENCE, Source::RobDifference);

    layout.build(name.to_string(), SheetKind::Bdn, readings, rob_column, consumption_columns, matched)
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub engine_version: String,
    pub run_at: String,
    pub window_hours: u32,
    pub pass_order: PassOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// Delivery date/time did not parse.
    InvalidTimestamp,
    /// Fuel type has no sheet and is not a blend.
    FuelNotTracked,
    /// No reading within the matching window claimed it.
    NoReadingInWindow,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedDelivery {
    #[serde(flatten)]
    pub delivery: BunkerDelivery,
    pub reason: UnmatchedReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub meta: ReportMeta,
    /// Fuel sheets in code order, then the BDN sheet.
    pub sheets: Vec<Sheet>,
    pub skipped_fuels: Vec<String>,
    pub unmatched_deliveries: Vec<UnmatchedDelivery>,
    pub invalid_reading_rows: Vec<usize>,
}

impl Report {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Every attribution across all sheets.
    pub fn attributions(&self) -> impl Iterator<Item = &Attribution> {
        self.sheets.iter().flat_map(|s| s.attributions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnRef;
    use crate::timestamp::Stamp;

    fn reading(row: usize, time: &str, cells: &[&str]) -> Reading {
        Reading {
            row,
            stamp: Stamp::parse("01.01.2024", time),
            cells: cells.iter().map(|c| Cell::parse(c)).collect(),
        }
    }

    fn col(index: usize, name: &str) -> ColumnRef {
        ColumnRef { index, name: name.into() }
    }

    #[test]
    fn fuel_sheet_layout_and_values() {
        // source columns: Date_UTC, Time_UTC, ME_Consumption_HFO, HFO_ROB
        let readings = vec![
            reading(0, "00:00", &["01.01.2024", "00:00", "5", "100"]),
            reading(1, "12:00", &["01.01.2024", "12:00", "6", "140"]),
            reading(2, "bad", &["01.01.2024", "bad", "4", "134"]),
        ];
        let fuel = FuelColumns {
            code: "HFO".into(),
            metrics: vec![col(2, "ME_Consumption_HFO")],
            consumption: vec![col(2, "ME_Consumption_HFO")],
            rob: col(3, "HFO_ROB"),
        };
        let matched = MatchOutput { bunkers: vec![0.0, 50.0, 0.0], attributions: vec![] };
        let sheet = assemble_fuel_sheet(&readings, "Date_UTC", "Time_UTC", &fuel, matched);

        assert_eq!(
            sheet.columns,
            vec!["Date_UTC", "Time_UTC", "ME_Consumption_HFO", "HFO_ROB", "Bunkers", "ROB_Difference"]
        );
        assert_eq!(sheet.rob_column, 3);
        assert_eq!(sheet.bunkers_column, 4);
        assert_eq!(sheet.rob_difference_column, 5);
        assert_eq!(sheet.consumption_columns, vec![2]);

        // 100 - 140 + 50 = 10; 140 - 134 + 0 = 6; last row 0
        assert_eq!(sheet.rob_difference(0), 10.0);
        assert_eq!(sheet.rob_difference(1), 6.0);
        assert_eq!(sheet.rob_difference(2), 0.0);

        assert_eq!(sheet.totals.consumption[0].sum, 15.0);
        assert_eq!(sheet.totals.total_bunkered, 50.0);
        assert_eq!(sheet.totals.total_consumed_rob, 16.0);
        assert_eq!(sheet.totals.missing, -1.0);

        assert!(!sheet.rows[2].timestamp_valid);
        assert_eq!(sheet.rows[2].cells[1], Cell::Text("bad".into()));
        assert!(sheet.negative_rows().is_empty());
    }

    #[test]
    fn bdn_sheet_fills_absent_columns_with_zero() {
        // source columns: Date_UTC, Time_UTC, ME_Consumption, BDN_ROB
        let readings = vec![
            reading(0, "00:00", &["01.01.2024", "00:00", "3", "50"]),
            reading(1, "12:00", &["01.01.2024", "12:00", "2", "60"]),
        ];
        let bdn = BdnColumns {
            categories: vec![("ME_Consumption".into(), Some(2)), ("AE_Consumption".into(), None)],
            rob: ("BDN_ROB".into(), Some(3)),
            trailing: vec![("ROB_Fuel_BDN".into(), None)],
        };
        let matched = MatchOutput { bunkers: vec![0.0, 0.0], attributions: vec![] };
        let sheet = assemble_bdn_sheet(&readings, "Date_UTC", "Time_UTC", "BDN", &bdn, matched);

        assert_eq!(
            sheet.columns,
            vec![
                "Date_UTC",
                "Time_UTC",
                "ME_Consumption",
                "AE_Consumption",
                "BDN_ROB",
                "Bunkers",
                "ROB_Fuel_BDN",
                "ROB_Difference"
            ]
        );
        assert_eq!(sheet.rows[0].cells[3], Cell::Number(0.0));
        assert_eq!(sheet.rows[0].cells[6], Cell::Number(0.0));
        assert_eq!(sheet.consumption_columns, vec![2, 3]);
        assert_eq!(sheet.kind, SheetKind::Bdn);

        // ROB rose from 50 to 60 with nothing bunkered
        assert_eq!(sheet.rob_difference(0), -10.0);
        assert_eq!(sheet.negative_rows(), vec![0]);
        assert_eq!(sheet.totals.total_consumption, 5.0);
        assert_eq!(sheet.totals.missing, 15.0);
    }
}
