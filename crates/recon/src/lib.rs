//! `fuelcheck-recon` - ROB vs bunker-delivery reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns computed ledger
//! sheets. No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod model;
pub mod pool;
pub mod report;
pub mod schema;
pub mod timestamp;

pub use config::ReconConfig;
pub use engine::{load_csv_table, run};
pub use error::ReconError;
pub use model::{Cell, ReconInput, Table};
pub use report::{Report, Sheet, SheetKind};
