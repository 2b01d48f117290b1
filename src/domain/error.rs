//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for trendsim.
///
/// Only configuration and data-integrity failures abort a run; a rejected
/// entry or an undefined indicator is a `Hold`, never an error.
#[derive(Debug, thiserror::Error)]
pub enum TrendsimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid argument {name}: {reason}")]
    Argument { name: String, reason: String },

    #[error("data integrity violation at bar {index} ({timestamp}): {reason}")]
    DataIntegrity {
        index: usize,
        timestamp: NaiveDateTime,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrendsimError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TrendsimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TrendsimError> for std::process::ExitCode {
    fn from(err: &TrendsimError) -> Self {
        let code: u8 = match err {
            TrendsimError::Io(_) => 1,
            TrendsimError::ConfigParse { .. }
            | TrendsimError::ConfigMissing { .. }
            | TrendsimError::ConfigInvalid { .. }
            | TrendsimError::Argument { .. } => 2,
            TrendsimError::Data { .. } | TrendsimError::Report { .. } => 3,
            TrendsimError::DataIntegrity { .. } => 4,
            TrendsimError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
