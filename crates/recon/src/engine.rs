use std::collections::BTreeSet;

use crate::config::{PassOrder, ReconConfig};
use crate::error::ReconError;
use crate::matcher::{match_blends, match_fuel};
use crate::model::{field, BunkerDelivery, Cell, Reading, ReconInput, Table};
use crate::pool::DeliveryPool;
use crate::report::{
    assemble_bdn_sheet, assemble_fuel_sheet, Report, ReportMeta, Sheet, UnmatchedDelivery, UnmatchedReason,
};
use crate::schema::Schema;
use crate::timestamp::Stamp;

/// Run reconciliation per config. Returns one sheet per tracked fuel plus
/// the BDN sheet.
///
/// All passes share one delivery pool; a delivery attributed in an earlier
/// pass is gone for every later one.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<Report, ReconError> {
    config.validate()?;

    // Preconditions first: nothing is computed if a required column is missing
    let schema = Schema::discover(&input.readings, config)?;
    let deliveries = load_bunkers(&input.bunkers, config)?;
    let readings = load_readings(&input.readings, &schema);

    let invalid_reading_rows: Vec<usize> = readings
        .iter()
        .filter(|r| !r.stamp.is_valid())
        .map(|r| r.row)
        .collect();
    if !invalid_reading_rows.is_empty() {
        log::warn!(
            "{} of {} readings have no valid timestamp and will not be matched",
            invalid_reading_rows.len(),
            readings.len()
        );
    }

    log::info!(
        "{} readings, {} deliveries, fuels: [{}]",
        readings.len(),
        deliveries.len(),
        schema.fuels.keys().cloned().collect::<Vec<_>>().join(", ")
    );

    let mut pool = DeliveryPool::new(deliveries);
    let window = config.matching.window();
    let date_header = &config.readings.date_column;
    let time_header = &config.readings.time_column;

    let run_fuels = |pool: &mut DeliveryPool| -> Vec<Sheet> {
        schema
            .fuels
            .values()
            .map(|fuel| {
                let matched = match_fuel(&readings, pool, &fuel.code, window);
                log::info!(
                    "{}: {} deliveries attributed, {:.3} bunkered",
                    fuel.code,
                    matched.attributions.len(),
                    matched.total()
                );
                assemble_fuel_sheet(&readings, date_header, time_header, fuel, matched)
            })
            .collect()
    };
    let run_bdn = |pool: &mut DeliveryPool| -> Sheet {
        let matched = match_blends(&readings, pool, &config.fuels.blends, window);
        log::info!(
            "{}: {} blend deliveries attributed, {:.3} bunkered",
            config.bdn.sheet_name,
            matched.attributions.len(),
            matched.total()
        );
        assemble_bdn_sheet(
            &readings,
            date_header,
            time_header,
            &config.bdn.sheet_name,
            &schema.bdn,
            matched,
        )
    };

    let (fuel_sheets, bdn_sheet) = match config.matching.pass_order {
        PassOrder::FuelFirst => {
            let fuel_sheets = run_fuels(&mut pool);
            (fuel_sheets, run_bdn(&mut pool))
        }
        PassOrder::BdnFirst => {
            let bdn_sheet = run_bdn(&mut pool);
            (run_fuels(&mut pool), bdn_sheet)
        }
    };

    let tracked: BTreeSet<&str> = schema.fuels.keys().map(String::as_str).collect();
    let unmatched_deliveries: Vec<UnmatchedDelivery> = pool
        .into_remaining()
        .into_iter()
        .map(|delivery| {
            let reason = if !delivery.stamp.is_valid() {
                UnmatchedReason::InvalidTimestamp
            } else if !tracked.contains(delivery.fuel_type.as_str()) && !config.fuels.is_blend(&delivery.fuel_type) {
                UnmatchedReason::FuelNotTracked
            } else {
                UnmatchedReason::NoReadingInWindow
            };
            UnmatchedDelivery { delivery, reason }
        })
        .collect();
    if !unmatched_deliveries.is_empty() {
        log::info!("{} deliveries left unmatched", unmatched_deliveries.len());
    }

    let mut sheets = fuel_sheets;
    sheets.push(bdn_sheet);

    Ok(Report {
        meta: ReportMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            window_hours: config.matching.window_hours,
            pass_order: config.matching.pass_order,
        },
        sheets,
        skipped_fuels: schema.skipped_fuels,
        unmatched_deliveries,
        invalid_reading_rows,
    })
}

/// Materialize readings in source row order.
pub fn load_readings(table: &Table, schema: &Schema) -> Vec<Reading> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(row, record)| Reading {
            row,
            stamp: Stamp::parse(field(record, schema.date), field(record, schema.time)),
            cells: (0..table.headers.len()).map(|i| Cell::parse(field(record, i))).collect(),
        })
        .collect()
}

/// Parse delimited text (header row required) into a [`Table`].
///
/// Records may be shorter or longer than the header; [`Table::new`] pads
/// or truncates them.
pub fn load_csv_table(dataset: &str, csv_data: &str, delimiter: u8) -> Result<Table, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(format!("{dataset}: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(format!("{dataset}: {e}")))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(Table::new(headers, rows))
}

/// Load bunker deliveries, applying the configured column mapping.
///
/// Missing columns abort the run. A blank mass is read as zero; any other
/// non-numeric mass is an error.
pub fn load_bunkers(table: &Table, config: &ReconConfig) -> Result<Vec<BunkerDelivery>, ReconError> {
    let col = &config.bunkers;

    let idx = |name: &str| -> Result<usize, ReconError> {
        table.column(name).ok_or_else(|| ReconError::MissingColumn {
            dataset: "bunkers".into(),
            column: name.into(),
        })
    };

    let date_idx = idx(&col.date_column)?;
    let time_idx = idx(&col.time_column)?;
    let fuel_idx = idx(&col.fuel_type_column)?;
    let mass_idx = idx(&col.mass_column)?;

    let mut deliveries = Vec::with_capacity(table.len());

    for (row, record) in table.rows.iter().enumerate() {
        let mass = match Cell::parse(field(record, mass_idx)) {
            Cell::Number(n) => n,
            Cell::Blank => 0.0,
            Cell::Text(value) => return Err(ReconError::MassParse { row: row + 1, value }),
        };

        let stamp = Stamp::parse(field(record, date_idx), field(record, time_idx));
        if !stamp.is_valid() {
            log::warn!(
                "bunkers row {}: unparsable delivery time '{} {}', delivery cannot be matched",
                row + 1,
                stamp.date_text,
                stamp.time_text
            );
        }

        deliveries.push(BunkerDelivery {
            id: row,
            stamp,
            fuel_type: field(record, fuel_idx).trim().to_string(),
            mass,
        });
    }

    Ok(deliveries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        load_csv_table("test", csv, b',').unwrap()
    }

    #[test]
    fn load_csv_table_pads_and_strips_bom() {
        let t = table("\u{feff}Date_UTC,Time_UTC,HFO_ROB\n01.01.2024,12:00\n");
        assert_eq!(t.headers[0], "Date_UTC");
        assert_eq!(t.rows[0], vec!["01.01.2024", "12:00", ""]);
    }

    #[test]
    fn load_csv_table_other_delimiter() {
        let t = load_csv_table("test", "Date_UTC;Time_UTC\n01.01.2024;12:00\n", b';').unwrap();
        assert_eq!(t.headers, vec!["Date_UTC", "Time_UTC"]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn load_bunkers_basic() {
        let t = table(
            "\
Bunker_Delivery_Date,Bunker_Delivery_Time,Fuel_Type,Mass
01.01.2024,10:00,HFO,50.5
02.01.2024,xx,MGO,
",
        );
        let deliveries = load_bunkers(&t, &ReconConfig::default()).unwrap();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].fuel_type, "HFO");
        assert_eq!(deliveries[0].mass, 50.5);
        assert!(deliveries[0].stamp.is_valid());
        assert_eq!(deliveries[1].mass, 0.0);
        assert!(!deliveries[1].stamp.is_valid());
    }

    #[test]
    fn load_bunkers_missing_column() {
        let t = table("Bunker_Delivery_Date,Bunker_Delivery_Time,Fuel_Type\n01.01.2024,10:00,HFO\n");
        let err = load_bunkers(&t, &ReconConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "bunkers: missing column 'Mass'");
    }

    #[test]
    fn load_bunkers_bad_mass() {
        let t = table(
            "Bunker_Delivery_Date,Bunker_Delivery_Time,Fuel_Type,Mass\n01.01.2024,10:00,HFO,lots\n",
        );
        let err = load_bunkers(&t, &ReconConfig::default()).unwrap_err();
        assert!(matches!(err, ReconError::MassParse { row: 1, .. }));
    }

    #[test]
    fn missing_time_column_aborts_before_processing() {
        let input = ReconInput {
            readings: table("Date_UTC,HFO_ROB\n01.01.2024,100\n"),
            bunkers: table("Bunker_Delivery_Date,Bunker_Delivery_Time,Fuel_Type,Mass\n"),
        };
        let err = run(&ReconConfig::default(), &input).unwrap_err();
        assert_eq!(err.to_string(), "readings: missing column 'Time_UTC'");
    }

    #[test]
    fn load_readings_keeps_row_order_and_text() {
        let t = table("Date_UTC,Time_UTC,HFO_ROB\n01.01.2024,12:00,100\nbad,13:00,n/a\n");
        let schema = Schema::discover(&t, &ReconConfig::default()).unwrap();
        let readings = load_readings(&t, &schema);
        assert_eq!(readings.len(), 2);
        assert!(readings[0].stamp.is_valid());
        assert_eq!(readings[0].cell(2), &Cell::Number(100.0));
        assert!(!readings[1].stamp.is_valid());
        assert_eq!(readings[1].stamp.display_date(), "bad");
        assert_eq!(readings[1].cell(2), &Cell::Text("n/a".into()));
    }

    #[test]
    fn hand_built_short_rows_read_as_blank() {
        // Fields set directly, bypassing Table::new padding
        let input = ReconInput {
            readings: Table {
                headers: vec![
                    "Date_UTC".into(),
                    "Time_UTC".into(),
                    "ME_Consumption_HFO".into(),
                    "HFO_ROB".into(),
                ],
                rows: vec![vec!["01.01.2024".into()], vec![]],
            },
            bunkers: Table {
                headers: vec![
                    "Bunker_Delivery_Date".into(),
                    "Bunker_Delivery_Time".into(),
                    "Fuel_Type".into(),
                    "Mass".into(),
                ],
                rows: vec![vec!["01.01.2024".into(), "10:00".into()]],
            },
        };
        let report = run(&ReconConfig::default(), &input).unwrap();
        assert_eq!(report.invalid_reading_rows, vec![0, 1]);
        let hfo = report.sheet("HFO").unwrap();
        assert_eq!(hfo.rows.len(), 2);
        assert_eq!(hfo.rows[0].cells[hfo.rob_column], Cell::Blank);
        assert_eq!(report.unmatched_deliveries.len(), 1);
        assert_eq!(report.unmatched_deliveries[0].delivery.mass, 0.0);
    }

    #[test]
    fn unmatched_reasons() {
        let input = ReconInput {
            readings: table(
                "\
Date_UTC,Time_UTC,ME_Consumption_HFO,HFO_ROB
01.01.2024,12:00,1,100
",
            ),
            bunkers: table(
                "\
Bunker_Delivery_Date,Bunker_Delivery_Time,Fuel_Type,Mass
??,10:00,HFO,10
01.01.2024,11:00,LNG,20
05.01.2024,11:00,HFO,30
",
            ),
        };
        let report = run(&ReconConfig::default(), &input).unwrap();
        let reasons: Vec<UnmatchedReason> = report.unmatched_deliveries.iter().map(|u| u.reason).collect();
        assert_eq!(
            reasons,
            vec![
                UnmatchedReason::InvalidTimestamp,
                UnmatchedReason::FuelNotTracked,
                UnmatchedReason::NoReadingInWindow
            ]
        );
    }
}
