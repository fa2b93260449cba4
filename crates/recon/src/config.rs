use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine configuration. Every field has a default, so an empty TOML
/// document yields the stock OVD / bunker-report layout.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub readings: ReadingColumns,
    pub bunkers: BunkerColumns,
    pub matching: MatchingConfig,
    pub fuels: FuelVocabulary,
    pub bdn: BdnConfig,
}

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadingColumns {
    pub date_column: String,
    pub time_column: String,
}

impl Default for ReadingColumns {
    fn default() -> Self {
        Self {
            date_column: "Date_UTC".into(),
            time_column: "Time_UTC".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BunkerColumns {
    pub date_column: String,
    pub time_column: String,
    pub fuel_type_column: String,
    pub mass_column: String,
}

impl Default for BunkerColumns {
    fn default() -> Self {
        Self {
            date_column: "Bunker_Delivery_Date".into(),
            time_column: "Bunker_Delivery_Time".into(),
            fuel_type_column: "Fuel_Type".into(),
            mass_column: "Mass".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub window_hours: u32,
    pub pass_order: PassOrder,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            window_hours: 12,
            pass_order: PassOrder::FuelFirst,
        }
    }
}

impl MatchingConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.window_hours as i64)
    }
}

/// Order in which the per-fuel passes and the BDN pass draw from the
/// shared delivery pool. Outcome-affecting whenever a delivery would be
/// eligible for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOrder {
    #[default]
    FuelFirst,
    BdnFirst,
}

impl std::fmt::Display for PassOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FuelFirst => write!(f, "fuel_first"),
            Self::BdnFirst => write!(f, "bdn_first"),
        }
    }
}

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FuelVocabulary {
    /// Codes that get their own per-fuel sheet when a `<code>_ROB` column exists.
    pub recognized: Vec<String>,
    /// Blend codes whose deliveries feed the BDN ledger only.
    pub blends: Vec<String>,
}

impl Default for FuelVocabulary {
    fn default() -> Self {
        Self {
            recognized: ["HFO", "LFO", "MGO", "MDO", "LNG", "LPGP", "LPGB", "M", "E"]
                .into_iter()
                .map(String::from)
                .collect(),
            blends: ["HVO", "FAME", "Bio"].into_iter().map(String::from).collect(),
        }
    }
}

impl FuelVocabulary {
    pub fn is_recognized(&self, code: &str) -> bool {
        self.recognized.iter().any(|c| c == code)
    }

    pub fn is_blend(&self, code: &str) -> bool {
        self.blends.iter().any(|c| c == code)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BdnConfig {
    pub sheet_name: String,
    /// Equipment consumption columns, in output order. Absent columns read as zero.
    pub categories: Vec<String>,
    pub rob_column: String,
    /// Carried through after `Bunkers`, not used in any derivation.
    pub trailing_columns: Vec<String>,
}

impl Default for BdnConfig {
    fn default() -> Self {
        Self {
            sheet_name: "BDN".into(),
            categories: [
                "ME_Consumption",
                "AE_Consumption",
                "Boiler_Consumption",
                "IGG_Consumption",
                "DPP_Consumption",
                "Incinerator_Consumption",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            rob_column: "BDN_ROB".into(),
            trailing_columns: vec!["ROB_Fuel_BDN".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.matching.window_hours == 0 {
            return Err(ReconError::ConfigValidation(
                "matching.window_hours must be greater than 0".into(),
            ));
        }

        for (field, value) in [
            ("readings.date_column", &self.readings.date_column),
            ("readings.time_column", &self.readings.time_column),
            ("bunkers.date_column", &self.bunkers.date_column),
            ("bunkers.time_column", &self.bunkers.time_column),
            ("bunkers.fuel_type_column", &self.bunkers.fuel_type_column),
            ("bunkers.mass_column", &self.bunkers.mass_column),
            ("bdn.sheet_name", &self.bdn.sheet_name),
            ("bdn.rob_column", &self.bdn.rob_column),
        ] {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("{field} must not be empty")));
            }
        }

        if self.fuels.recognized.is_empty() {
            return Err(ReconError::ConfigValidation(
                "fuels.recognized must list at least one fuel code".into(),
            ));
        }

        // Codes are matched against the last `_` segment of a column name,
        // so a code containing `_` could never be detected.
        for code in self.fuels.recognized.iter().chain(&self.fuels.blends) {
            if code.is_empty() || code.contains('_') {
                return Err(ReconError::ConfigValidation(format!(
                    "invalid fuel code '{code}': must be non-empty and contain no '_'"
                )));
            }
        }

        // A delivery must never be eligible for both the per-fuel passes
        // and the BDN pass.
        let recognized: BTreeSet<&str> = self.fuels.recognized.iter().map(String::as_str).collect();
        let overlap: Vec<&str> = self
            .fuels
            .blends
            .iter()
            .map(String::as_str)
            .filter(|c| recognized.contains(c))
            .collect();
        if !overlap.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "fuels.recognized and fuels.blends must be disjoint, both contain: {}",
                overlap.join(", ")
            )));
        }

        if recognized.contains(self.bdn.sheet_name.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "bdn.sheet_name '{}' collides with a fuel sheet",
                self.bdn.sheet_name
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
