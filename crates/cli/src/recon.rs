//! `fuelcheck run` - reconcile readings against bunker deliveries.

use std::path::{Path, PathBuf};

use clap::Args;

use fuelcheck_io::xlsx::{default_output_path, export_report, ExportOptions};
use fuelcheck_recon::{ReconConfig, ReconError, ReconInput, Report, Table};

use crate::exit_codes::{
    recon_exit_code, EXIT_ERROR, EXIT_INPUT_READ, EXIT_INVALID_CONFIG, EXIT_MISSING_FUEL, EXIT_OUTPUT_WRITE,
};
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Readings table (OVD export): .csv, .xlsx, .xls, .xlsb or .ods
    pub readings: PathBuf,

    /// Bunker delivery report: .csv, .xlsx, .xls, .xlsb or .ods
    pub bunkers: PathBuf,

    /// Engine config (TOML). Defaults apply when omitted.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Workbook path [default: <READINGS stem>_FUEL.xlsx next to READINGS]
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Write computed values instead of live formulas
    #[arg(long)]
    pub values_only: bool,

    /// Print the JSON report to stdout
    #[arg(long)]
    pub json: bool,

    /// Write the JSON report to a file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Exit 64 when any sheet's |MISSING| exceeds this many tonnes
    #[arg(long, value_name = "TOL")]
    pub fail_on_missing: Option<f64>,
}

fn run_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError::new(code, msg)
}

/// Load `--config`, or the stock defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| run_err(EXIT_INPUT_READ, format!("cannot read config {}: {e}", path.display())))?;
    ReconConfig::from_toml(&config_str)
        .map_err(|e| run_err(EXIT_INVALID_CONFIG, format!("{}: {e}", path.display())))
}

fn load_table(path: &Path) -> Result<Table, CliError> {
    fuelcheck_io::read_table(path).map_err(|e| run_err(EXIT_INPUT_READ, format!("cannot read {}: {e}", path.display())))
}

fn engine_err(err: ReconError) -> CliError {
    let hint = match &err {
        ReconError::MissingColumn { dataset, .. } if dataset == "readings" => {
            Some("set [readings] date_column / time_column in --config")
        }
        ReconError::MissingColumn { .. } => Some("set the [bunkers] column names in --config"),
        _ => None,
    };
    let cli_err = run_err(recon_exit_code(&err), err.to_string());
    match hint {
        Some(h) => cli_err.with_hint(h),
        None => cli_err,
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    if let Some(tol) = args.fail_on_missing {
        if !tol.is_finite() || tol < 0.0 {
            return Err(CliError::args(format!("--fail-on-missing must be a non-negative number, got {tol}")));
        }
    }

    let config = load_config(args.config.as_deref())?;

    let input = ReconInput {
        readings: load_table(&args.readings)?,
        bunkers: load_table(&args.bunkers)?,
    };

    let report = fuelcheck_recon::run(&config, &input).map_err(engine_err)?;

    // Workbook
    let output = args.output.clone().unwrap_or_else(|| default_output_path(&args.readings));
    let options = ExportOptions { formulas: !args.values_only };
    export_report(&report, &output, &options).map_err(|e| run_err(EXIT_OUTPUT_WRITE, e))?;
    eprintln!("wrote {}", output.display());

    // JSON report
    if args.json || args.report.is_some() {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| run_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = args.report {
            fuelcheck_io::write_atomic(path, json_str.as_bytes())
                .map_err(|e| run_err(EXIT_OUTPUT_WRITE, format!("cannot write report: {e}")))?;
            eprintln!("wrote {}", path.display());
        }

        if args.json {
            println!("{json_str}");
        }
    }

    // Human summary to stderr
    for line in summary_lines(&report) {
        eprintln!("{line}");
    }

    if let Some(tol) = args.fail_on_missing {
        let over: Vec<String> = report
            .sheets
            .iter()
            .filter(|s| s.totals.missing.abs() > tol)
            .map(|s| format!("{} ({:.3})", s.name, s.totals.missing))
            .collect();
        if !over.is_empty() {
            return Err(run_err(
                EXIT_MISSING_FUEL,
                format!("missing fuel above {tol:.3}: {}", over.join(", ")),
            ));
        }
    }

    Ok(())
}

fn summary_lines(report: &Report) -> Vec<String> {
    let mut lines: Vec<String> = report
        .sheets
        .iter()
        .map(|sheet| {
            let mut line = format!(
                "{}: {} rows, bunkered {:.3}, missing {:.3}",
                sheet.name,
                sheet.rows.len(),
                sheet.totals.total_bunkered,
                sheet.totals.missing
            );
            let negative = sheet.negative_rows().len();
            if negative > 0 {
                line.push_str(&format!(", {negative} negative ROB difference(s)"));
            }
            line
        })
        .collect();

    if !report.skipped_fuels.is_empty() {
        lines.push(format!("skipped (no ROB column): {}", report.skipped_fuels.join(", ")));
    }
    if !report.invalid_reading_rows.is_empty() {
        lines.push(format!("{} reading(s) with unparsable date/time", report.invalid_reading_rows.len()));
    }
    if !report.unmatched_deliveries.is_empty() {
        lines.push(format!("{} delivery(ies) not attributed", report.unmatched_deliveries.len()));
    }
    lines
}
