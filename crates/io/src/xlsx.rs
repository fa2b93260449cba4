// Excel file import (xlsx, xls, xlsb, ods) and ledger workbook export (xlsx only)
//
// Import: first worksheet only, every cell rendered to text so the engine
//         sees the same shape it gets from CSV.
// Export: one worksheet per ledger sheet. Derived cells are written as live
//         formulas carrying the engine's value as the cached result.

use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_xlsxwriter::{
    Color, ConditionalFormatCell, ConditionalFormatCellRule, Format, Formula, Workbook as XlsxWorkbook, Worksheet,
};

use fuelcheck_recon::ledger::{
    LABEL_MISSING, LABEL_TOTAL_BUNKERED, LABEL_TOTAL_CONSUMED_ROB, LABEL_TOTAL_CONSUMPTION,
};
use fuelcheck_recon::{Cell, Report, Sheet, Table};

pub const OUTPUT_SUFFIX: &str = "_FUEL.xlsx";
pub const LABEL_TOTALS: &str = "TOTALS";

const NUMBER_FORMAT: &str = "0.000";

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Import the first worksheet of an Excel/ODS file as a [`Table`].
///
/// The first non-empty row is the header. Fully empty rows are dropped.
pub fn import(path: &Path) -> Result<Table, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let Some(sheet_name) = sheet_names.first() else {
        return Err("Excel file contains no sheets".to_string());
    };

    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(data_to_text).collect::<Vec<String>>())
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()));

    let Some(headers) = rows.next() else {
        return Ok(Table::default());
    };
    let body: Vec<Vec<String>> = rows.collect();

    log::debug!("{}: sheet '{}', {} rows", path.display(), sheet_name, body.len());
    Ok(Table::new(headers, body))
}

fn data_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        // Assumes the 1900 date system
        Data::DateTime(dt) => serial_to_text(dt.as_f64()),
        // ODS date-value cells
        Data::DateTimeIso(s) => iso_datetime_to_text(s).unwrap_or_else(|| s.clone()),
        // ODS time-value cells
        Data::DurationIso(s) => iso_duration_to_text(s).unwrap_or_else(|| s.clone()),
    }
}

fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Render an Excel date/time serial the way the engine's parsers read it:
/// `dd.mm.yyyy`, `HH:MM` (or `HH:MM:SS`), or both separated by a space.
fn serial_to_text(serial: f64) -> String {
    let total_seconds = (serial * 86_400.0).round() as i64;
    let days = total_seconds.div_euclid(86_400);
    let seconds = total_seconds.rem_euclid(86_400) as u32;

    let date = Duration::try_days(days)
        .and_then(|offset| excel_epoch().and_then(|epoch| epoch.checked_add_signed(offset)));
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0);
    match (date, time) {
        (Some(date), Some(time)) => stamp_text(days > 0, date, time),
        _ => format!("{}", serial),
    }
}

/// `2024-03-01T12:00:00` (or a bare `2024-03-01`) rendered like a serial.
fn iso_datetime_to_text(s: &str) -> Option<String> {
    let s = s.trim();
    let stamp = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    // A time-only cell anchored on the epoch carries no date
    Some(stamp_text(Some(stamp.date()) != excel_epoch(), stamp.date(), stamp.time()))
}

/// `PT12H00M00S` rendered as a time of day. Durations of a day or more
/// are not clock times and stay as they are.
fn iso_duration_to_text(s: &str) -> Option<String> {
    let body = s.trim().strip_prefix("PT")?;
    let mut total = 0.0_f64;
    let mut number = String::new();
    for c in body.chars() {
        match c {
            '0'..='9' | '.' => number.push(c),
            'H' | 'M' | 'S' => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                total += match c {
                    'H' => value * 3600.0,
                    'M' => value * 60.0,
                    _ => value,
                };
            }
            _ => return None,
        }
    }
    if !number.is_empty() || !(0.0..86_400.0).contains(&total) {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(total.round() as u32, 0).map(clock_text)
}

fn stamp_text(has_date: bool, date: NaiveDate, time: NaiveTime) -> String {
    let date_text = date.format("%d.%m.%Y").to_string();
    match (has_date, time.num_seconds_from_midnight() > 0) {
        (true, true) => format!("{} {}", date_text, clock_text(time)),
        (true, false) => date_text,
        (false, _) => clock_text(time),
    }
}

fn clock_text(time: NaiveTime) -> String {
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Write derived cells as formulas (with cached results) instead of plain values.
    pub formulas: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { formulas: true }
    }
}

/// Result of an Excel export operation
#[derive(Debug, Default)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub cells_exported: usize,
    /// Derived cells written as formulas
    pub formulas_exported: usize,
}

/// `<readings stem>_FUEL.xlsx` next to the readings file.
pub fn default_output_path(readings: &Path) -> PathBuf {
    let stem = readings
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "readings".to_string());
    readings.with_file_name(format!("{}{}", stem, OUTPUT_SUFFIX))
}

/// Export every ledger sheet of a report to an xlsx workbook.
///
/// The workbook is serialized in memory and written with
/// [`crate::write_atomic`]; a failed export never leaves a partial file.
pub fn export_report(report: &Report, path: &Path, options: &ExportOptions) -> Result<ExportResult, String> {
    let start_time = Instant::now();
    let mut result = ExportResult::default();

    let mut xlsx_workbook = XlsxWorkbook::new();

    for sheet in &report.sheets {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", sheet.name, e))?;

        let (cells, formulas) = export_sheet(sheet, worksheet, options)?;
        result.cells_exported += cells;
        result.formulas_exported += formulas;
        result.sheets_exported += 1;
    }

    let buffer = xlsx_workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    crate::write_atomic(path, &buffer)?;

    log::debug!(
        "wrote {} ({} sheets, {} cells, {} formulas) in {} ms",
        path.display(),
        result.sheets_exported,
        result.cells_exported,
        result.formulas_exported,
        start_time.elapsed().as_millis()
    );
    Ok(result)
}

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

fn cell_address(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letter(col), row + 1)
}

/// Write one ledger sheet. Returns (cells_exported, formulas_exported).
fn export_sheet(sheet: &Sheet, worksheet: &mut Worksheet, options: &ExportOptions) -> Result<(usize, usize), String> {
    let bold = Format::new().set_bold();
    let number = Format::new().set_num_format(NUMBER_FORMAT);
    let red_bold = Format::new().set_bold().set_font_color(Color::Red).set_num_format(NUMBER_FORMAT);

    let mut cells = 0;
    let mut formulas = 0;
    let mut widths: Vec<usize> = sheet.columns.iter().map(|c| c.len()).collect();

    let err = |row: usize, col: usize, e: rust_xlsxwriter::XlsxError| {
        format!("Failed to write cell {} on '{}': {}", cell_address(row, col), sheet.name, e)
    };

    // Header
    for (col, name) in sheet.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &bold)
            .map_err(|e| err(0, col, e))?;
        cells += 1;
    }

    // Ledger rows
    let rob = col_to_letter(sheet.rob_column);
    let bunkers = col_to_letter(sheet.bunkers_column);
    let last = sheet.rows.len().saturating_sub(1);

    for (i, row) in sheet.rows.iter().enumerate() {
        let r = i + 1;
        for (col, cell) in row.cells.iter().enumerate() {
            if col == sheet.rob_difference_column && options.formulas && i < last {
                // Excel rows are 1-based: this row is r + 1, the next one r + 2
                let formula = format!("=IFERROR({rob}{a}-{rob}{b}+{bunkers}{b},0)", a = r + 1, b = r + 2);
                write_formula(worksheet, r, col, &formula, cell.summand(), &number).map_err(|e| err(r, col, e))?;
                formulas += 1;
                cells += 1;
                continue;
            }

            match cell {
                Cell::Blank => continue,
                Cell::Text(s) => {
                    worksheet
                        .write_string(r as u32, col as u16, s)
                        .map_err(|e| err(r, col, e))?;
                }
                Cell::Number(n) => {
                    worksheet
                        .write_number(r as u32, col as u16, *n)
                        .map_err(|e| err(r, col, e))?;
                }
            }
            widths[col] = widths[col].max(render(cell).len());
            cells += 1;
        }
    }

    // Negative ROB differences in yellow
    if !sheet.rows.is_empty() {
        let col = sheet.rob_difference_column as u16;
        let highlight = ConditionalFormatCell::new()
            .set_rule(ConditionalFormatCellRule::LessThan(0))
            .set_format(Format::new().set_background_color(Color::Yellow));
        worksheet
            .add_conditional_format(1, col, sheet.rows.len() as u32, col, &highlight)
            .map_err(|e| format!("Failed to add conditional format on '{}': {}", sheet.name, e))?;
    }

    // Column widths: longest rendered value + 2
    for (col, width) in widths.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, (*width + 2) as f64)
            .map_err(|e| format!("Failed to set column width on '{}': {}", sheet.name, e))?;
    }

    let (totals_cells, totals_formulas) = export_totals(sheet, worksheet, options, &bold, &number, &red_bold)?;

    Ok((cells + totals_cells, formulas + totals_formulas))
}

/// TOTALS block, one blank column right of `ROB_Difference`: labels in the
/// first column, values in the second.
///
/// ```text
/// TOTALS
/// <consumption column>    SUM(...)
/// ...
/// TOTAL CONSUMPTION       SUM(of the sums)
///
/// TOTAL BUNKERED          SUM(Bunkers)
///
/// TOTAL CONSUMED (ROB)    SUM(ROB_Difference)
///
/// MISSING                 TOTAL CONSUMPTION - TOTAL CONSUMED (ROB)
/// ```
fn export_totals(
    sheet: &Sheet,
    worksheet: &mut Worksheet,
    options: &ExportOptions,
    bold: &Format,
    number: &Format,
    red_bold: &Format,
) -> Result<(usize, usize), String> {
    let label_col = sheet.rob_difference_column + 2;
    let value_col = label_col + 1;
    let value_letter = col_to_letter(value_col);
    // Last data row, 1-based
    let last_row = sheet.rows.len() + 1;

    let err = |row: usize, col: usize, e: rust_xlsxwriter::XlsxError| {
        format!("Failed to write cell {} on '{}': {}", cell_address(row, col), sheet.name, e)
    };

    let mut cells = 0;
    let mut formulas = 0;
    let mut label_width = LABEL_TOTALS.len();

    worksheet
        .write_string_with_format(0, label_col as u16, LABEL_TOTALS, bold)
        .map_err(|e| err(0, label_col, e))?;
    cells += 1;

    let mut put = |row: usize, label: &str, formula: String, value: f64, format: &Format, label_format: Option<&Format>| {
        let written = match label_format {
            Some(f) => worksheet.write_string_with_format(row as u32, label_col as u16, label, f),
            None => worksheet.write_string(row as u32, label_col as u16, label),
        };
        written.map_err(|e| err(row, label_col, e))?;
        label_width = label_width.max(label.len());

        if options.formulas {
            write_formula(worksheet, row, value_col, &formula, value, format).map_err(|e| err(row, value_col, e))?;
            formulas += 1;
        } else {
            worksheet
                .write_number_with_format(row as u32, value_col as u16, value, format)
                .map_err(|e| err(row, value_col, e))?;
        }
        cells += 2;
        Ok::<(), String>(())
    };

    let totals = &sheet.totals;
    let mut row = 1;
    for (&col, total) in sheet.consumption_columns.iter().zip(&totals.consumption) {
        let letter = col_to_letter(col);
        put(row, &total.label, format!("=SUM({letter}2:{letter}{last_row})"), total.sum, number, None)?;
        row += 1;
    }

    // An empty SUM range would read backwards; with no consumption columns
    // the total is a plain zero formula.
    let consumption_formula = if totals.consumption.is_empty() {
        "=0".to_string()
    } else {
        format!("=SUM({value_letter}2:{value_letter}{row})")
    };
    let consumption_row = row;
    put(consumption_row, LABEL_TOTAL_CONSUMPTION, consumption_formula, totals.total_consumption, number, None)?;

    let bunkers = col_to_letter(sheet.bunkers_column);
    let bunkered_row = consumption_row + 2;
    put(
        bunkered_row,
        LABEL_TOTAL_BUNKERED,
        format!("=SUM({bunkers}2:{bunkers}{last_row})"),
        totals.total_bunkered,
        number,
        None,
    )?;

    let diff = col_to_letter(sheet.rob_difference_column);
    let consumed_row = bunkered_row + 2;
    put(
        consumed_row,
        LABEL_TOTAL_CONSUMED_ROB,
        format!("=SUM({diff}2:{diff}{last_row})"),
        totals.total_consumed_rob,
        number,
        None,
    )?;

    let missing_row = consumed_row + 2;
    put(
        missing_row,
        LABEL_MISSING,
        format!("=({value_letter}{}-{value_letter}{})", consumption_row + 1, consumed_row + 1),
        totals.missing,
        red_bold,
        Some(red_bold),
    )?;

    worksheet
        .set_column_width(label_col as u16, (label_width + 2) as f64)
        .map_err(|e| format!("Failed to set column width on '{}': {}", sheet.name, e))?;
    worksheet
        .set_column_width(value_col as u16, 14)
        .map_err(|e| format!("Failed to set column width on '{}': {}", sheet.name, e))?;

    Ok((cells, formulas))
}

fn write_formula(
    worksheet: &mut Worksheet,
    row: usize,
    col: usize,
    formula: &str,
    cached: f64,
    format: &Format,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    let formula = Formula::new(formula).set_result(render_number(cached));
    worksheet.write_formula_with_format(row as u32, col as u16, formula, format)?;
    Ok(())
}

fn render(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) => render_number(*n),
        Cell::Text(s) => s.clone(),
        Cell::Blank => String::new(),
    }
}

fn render_number(n: f64) -> String {
    format!("{}", n)
}
