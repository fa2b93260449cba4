//! Per-ledger derivations: ROB difference per row and the totals block.

use serde::Serialize;

use crate::model::Cell;

pub const LABEL_TOTAL_CONSUMPTION: &str = "TOTAL CONSUMPTION";
pub const LABEL_TOTAL_BUNKERED: &str = "TOTAL BUNKERED";
pub const LABEL_TOTAL_CONSUMED_ROB: &str = "TOTAL CONSUMED (ROB)";
pub const LABEL_MISSING: &str = "MISSING";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnTotal {
    pub label: String,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    /// One entry per consumption column, in column order.
    pub consumption: Vec<ColumnTotal>,
    pub total_consumption: f64,
    pub total_bunkered: f64,
    pub total_consumed_rob: f64,
    /// `total_consumption - total_consumed_rob`.
    pub missing: f64,
}

/// `ROB[i] - ROB[i+1] + Bunkers[i+1]` for every row.
///
/// The last row has no successor and yields 0, as does any row where one
/// of the ROB operands is text. Blank ROB cells count as 0.
pub fn rob_differences(rob: &[Cell], bunkers: &[f64]) -> Vec<f64> {
    debug_assert_eq!(rob.len(), bunkers.len());
    (0..rob.len())
        .map(|i| {
            if i + 1 >= rob.len() {
                return 0.0;
            }
            match (rob[i].operand(), rob[i + 1].operand()) {
                (Some(current), Some(next)) => current - next + bunkers[i + 1],
                _ => 0.0,
            }
        })
        .collect()
}

/// Sum of a column; text cells are ignored.
pub fn column_sum<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> f64 {
    cells.into_iter().map(Cell::summand).sum()
}

pub fn compute_totals(consumption: Vec<ColumnTotal>, bunkers: &[f64], rob_difference: &[f64]) -> Totals {
    let total_consumption: f64 = consumption.iter().map(|c| c.sum).sum();
    let total_bunkered: f64 = bunkers.iter().sum();
    let total_consumed_rob: f64 = rob_difference.iter().sum();
    Totals {
        consumption,
        total_consumption,
        total_bunkered,
        total_consumed_rob,
        missing: total_consumption - total_consumed_rob,
    }
}
