// File I/O: tabular input (CSV, Excel/ODS) and the ledger workbook

pub mod csv;
pub mod xlsx;

use std::io::Write;
use std::path::{Path, PathBuf};

use fuelcheck_recon::Table;

/// Extensions read through calamine
pub const EXCEL_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Load a readings or bunker table, choosing the reader by file extension.
pub fn read_table(path: &Path) -> Result<Table, String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "tsv" | "txt" => csv::import(path),
        e if EXCEL_EXTENSIONS.contains(&e) => xlsx::import(path),
        "" => Err(format!("{}: no file extension, expected .csv or an Excel workbook", path.display())),
        other => Err(format!(
            "{}: unsupported format '.{}', expected .csv, .tsv, .xlsx, .xlsm, .xls, .xlsb or .ods",
            path.display(),
            other
        )),
    }
}

/// Write `bytes` to `path` through a temporary file in the destination
/// directory that is renamed into place. A failed write leaves neither a
/// partial file nor the staging file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), String> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut staging = tempfile::Builder::new()
        .prefix(".fuelcheck-")
        .tempfile_in(&dir)
        .map_err(|e| format!("Failed to create temporary file in {}: {}", dir.display(), e))?;

    staging
        .write_all(bytes)
        .and_then(|()| staging.as_file().sync_all())
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    staging
        .persist(path)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e.error))?;
    Ok(())
}
