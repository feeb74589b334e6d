use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlujoError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source '{origin}' is unreadable: {reason}")]
    SourceUnreadable { origin: String, reason: String },

    #[error("Rule source '{origin}' contains no usable rules")]
    NoUsableRules { origin: String },

    #[error("Rule not found: {0}")]
    RuleNotFound(i64),

    #[error("Ledger '{origin}' has no {missing} column")]
    LedgerColumns { origin: String, missing: String },
}

impl FlujoError {
    pub fn unreadable(origin: impl Into<String>, reason: impl ToString) -> Self {
        FlujoError::SourceUnreadable {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the failure came from the rule source itself rather than
    /// from the environment around it.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            FlujoError::SourceUnreadable { .. } | FlujoError::NoUsableRules { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FlujoError>;
