use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing value for argument: {flag}")]
    MissingValue { flag: String },
    #[error("missing required argument: {field}")]
    MissingRequired { field: String },
    #[error("invalid value for {flag}={value}: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },
    #[error("unsupported argument: {arg}")]
    UnsupportedArgument { arg: String },
    #[error("failed to open {kind} {path}: {reason}")]
    OpenResource {
        kind: &'static str,
        path: String,
        reason: String,
    },
    #[error("{count} input resource(s) could not be opened")]
    ResourcesUnavailable { count: usize },
    #[error("invalid ROI: {line} ({reason})")]
    InvalidRoi { line: String, reason: String },
    #[error("chromosome {chromosome} not found in {source_name}")]
    UnknownChromosome {
        chromosome: String,
        source_name: String,
    },
    #[error("htslib error: {message}")]
    Htslib { message: String },
    #[error("parse error: {message}")]
    ParseError { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Errors that only invalidate the current ROI; the run carries on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidRoi { .. } | Self::UnknownChromosome { .. }
        )
    }
}
