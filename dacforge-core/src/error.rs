use thiserror::Error;

#[derive(Debug, Error)]
pub enum DacError {
    #[error("Invalid value for '{field}' ({context}): {reason}")]
    InvalidInput {
        field: String,
        context: String,
        reason: String,
    },

    #[error("Required input '{field}' is missing ({context})")]
    MissingInput { field: String, context: String },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Simulation was cancelled before all iterations completed")]
    Cancelled,

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to write CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),
}

impl DacError {
    pub(crate) fn invalid_input(field: &str, context: &str, reason: impl Into<String>) -> Self {
        DacError::InvalidInput {
            field: field.to_string(),
            context: context.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_input(field: &str, context: impl Into<String>) -> Self {
        DacError::MissingInput {
            field: field.to_string(),
            context: context.into(),
        }
    }
}
