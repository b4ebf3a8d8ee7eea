use std::path::PathBuf;

/// An `AnyValue` was built with more than one populated variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("AnyValue must have at most one populated field, found {}", .fields.join(", "))]
pub struct ValueShapeError {
    /// OTLP/JSON names of the populated fields, in declaration order.
    pub fields: Vec<&'static str>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported trace document: {0}")]
    Document(String),

    #[error("trace {0} not found")]
    TraceNotFound(String),

    #[error("invalid trace id {0:?}")]
    InvalidTraceId(String),

    #[error("{failed} of {total} traces failed")]
    TracesFailed { failed: usize, total: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
