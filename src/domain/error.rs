//! Domain error types.

/// Top-level error type for trendangle.
#[derive(Debug, thiserror::Error)]
pub enum TrendangleError {
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

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("malformed bar stream at index {index}: {reason}")]
    MalformedStream { index: usize, reason: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrendangleError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TrendangleError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        TrendangleError::MalformedStream {
            index,
            reason: reason.into(),
        }
    }
}

impl From<&TrendangleError> for std::process::ExitCode {
    fn from(err: &TrendangleError) -> Self {
        let code: u8 = match err {
            TrendangleError::Io(_) => 1,
            TrendangleError::ConfigParse { .. }
            | TrendangleError::ConfigMissing { .. }
            | TrendangleError::ConfigInvalid { .. } => 2,
            TrendangleError::DataSource { .. } => 3,
            TrendangleError::MalformedStream { .. } => 4,
            TrendangleError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
