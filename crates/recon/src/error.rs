use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (overlapping vocabularies, zero window, etc.).
    ConfigValidation(String),
    /// Missing required column in one of the input datasets.
    MissingColumn { dataset: String, column: String },
    /// A bunker delivery mass that is present but not numeric.
    MassParse { row: usize, value: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { dataset, column } => {
                write!(f, "{dataset}: missing column '{column}'")
            }
            Self::MassParse { row, value } => {
                write!(f, "bunkers row {row}: cannot parse mass '{value}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
