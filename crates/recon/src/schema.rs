//! Column discovery.
//!
//! Reading datasets name their columns `<Category>_<...>_<Code>` (e.g.
//! `ME_Consumption_HFO`) plus one `<Code>_ROB` column per tracked fuel.
//! [`Schema::discover`] resolves those names to column indices once; the
//! rest of the engine works on indices only.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::model::Table;

pub const ROB_SUFFIX: &str = "_ROB";
const CONSUMPTION_SEGMENT: &str = "Consumption";

/// A column reference: source index plus header text (the output label).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub index: usize,
    pub name: String,
}

/// Physical columns backing one fuel's sheet.
#[derive(Debug, Clone)]
pub struct FuelColumns {
    pub code: String,
    /// Every column whose last segment is the code, in source order.
    pub metrics: Vec<ColumnRef>,
    /// Subset of `metrics` carrying a `Consumption` segment.
    pub consumption: Vec<ColumnRef>,
    pub rob: ColumnRef,
}

/// BDN column slots; `None` means absent from the source, read as zero.
#[derive(Debug, Clone)]
pub struct BdnColumns {
    pub categories: Vec<(String, Option<usize>)>,
    pub rob: (String, Option<usize>),
    pub trailing: Vec<(String, Option<usize>)>,
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub date: usize,
    pub time: usize,
    /// Tracked fuels keyed by code (lexicographic order).
    pub fuels: BTreeMap<String, FuelColumns>,
    /// Detected from metric columns but without a `<Code>_ROB` column.
    pub skipped_fuels: Vec<String>,
    pub bdn: BdnColumns,
}

impl Schema {
    /// Resolve the readings table against the configured vocabularies.
    ///
    /// Fails only when the date or time column is missing.
    pub fn discover(table: &Table, config: &ReconConfig) -> Result<Self, ReconError> {
        let required = |name: &str| {
            table.column(name).ok_or_else(|| ReconError::MissingColumn {
                dataset: "readings".into(),
                column: name.into(),
            })
        };
        let date = required(&config.readings.date_column)?;
        let time = required(&config.readings.time_column)?;

        let detected = detect_fuel_types(&table.headers, &config.fuels.recognized);

        let mut fuels = BTreeMap::new();
        let mut skipped_fuels = Vec::new();
        for code in detected {
            let rob_name = format!("{code}{ROB_SUFFIX}");
            let Some(rob_index) = table.column(&rob_name) else {
                log::debug!("fuel {code}: no {rob_name} column, skipping");
                skipped_fuels.push(code);
                continue;
            };

            let metrics: Vec<ColumnRef> = table
                .headers
                .iter()
                .enumerate()
                .filter(|(_, h)| last_segment(h) == code)
                .map(|(index, h)| ColumnRef { index, name: h.clone() })
                .collect();
            let consumption = metrics
                .iter()
                .filter(|c| c.name.split('_').any(|seg| seg == CONSUMPTION_SEGMENT))
                .cloned()
                .collect();

            fuels.insert(
                code.clone(),
                FuelColumns {
                    code,
                    metrics,
                    consumption,
                    rob: ColumnRef { index: rob_index, name: rob_name },
                },
            );
        }

        let slot = |name: &String| (name.clone(), table.column(name));
        let bdn = BdnColumns {
            categories: config.bdn.categories.iter().map(slot).collect(),
            rob: slot(&config.bdn.rob_column),
            trailing: config.bdn.trailing_columns.iter().map(slot).collect(),
        };

        Ok(Self { date, time, fuels, skipped_fuels, bdn })
    }
}

/// Distinct fuel codes named by columns of the form `<A>_<B>_..._<Code>`
/// (at least three segments, last segment in `vocabulary`).
pub fn detect_fuel_types(headers: &[String], vocabulary: &[String]) -> BTreeSet<String> {
    headers
        .iter()
        .filter_map(|h| {
            let parts: Vec<&str> = h.split('_').collect();
            match parts.last() {
                Some(last) if parts.len() > 2 && vocabulary.iter().any(|v| v == last) => {
                    Some((*last).to_string())
                }
                _ => None,
            }
        })
        .collect()
}

fn last_segment(name: &str) -> &str {
    name.rsplit('_').next().unwrap_or(name)
}
