//! Error types for parsing, evaluating and cataloguing expressions.

use thiserror::Error;

/// Result type alias using the crate `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building or evaluating an expression tree.
///
/// Parse errors are fatal to the individual that produced the text, never to the process.
/// Numeric domain errors are not represented here: operations return NaN instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("unknown operation `{symbol}` at offset {offset}")]
    UnknownOperation { symbol: String, offset: usize },

    #[error("malformed expression at offset {offset}: {reason}")]
    MalformedExpression { offset: usize, reason: String },

    #[error("operation `{symbol}` at offset {offset} expects {expected} argument(s), found {found}")]
    ArityMismatch {
        symbol: String,
        offset: usize,
        expected: u32,
        found: u32,
    },

    #[error("invalid constant `{text}` at offset {offset}")]
    InvalidConstant { text: String, offset: usize },

    #[error("expression at offset {offset} exceeds the maximum depth of {max}")]
    DepthExceeded { max: u32, offset: usize },

    #[error("sensor index {index} out of range for {len} sensor(s)")]
    SensorIndexOutOfRange { index: usize, len: usize },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Errors produced while validating an operations catalog.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("operation symbol `{0}` is not a valid symbol")]
    InvalidSymbol(String),

    #[error("operation symbol `{0}` is reserved")]
    ReservedSymbol(String),

    #[error("operation `{0}` appears more than once")]
    DuplicateSymbol(String),

    #[error("operation `{symbol}` has unsupported arity {arity}")]
    InvalidArity { symbol: String, arity: u32 },

    #[error("template for `{symbol}` does not match arity {arity}: {reason}")]
    TemplateMismatch {
        symbol: String,
        arity: u32,
        reason: String,
    },
}

impl Error {
    /// Whether the error was raised while parsing text, as opposed to while evaluating.
    pub fn is_parse_error(&self) -> bool {
        match *self {
            Error::UnknownOperation { .. }
            | Error::MalformedExpression { .. }
            | Error::ArityMismatch { .. }
            | Error::InvalidConstant { .. }
            | Error::DepthExceeded { .. } => true,
            Error::SensorIndexOutOfRange { .. } | Error::Catalog(_) => false,
        }
    }

    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Error::MalformedExpression { offset, reason: reason.into() }
    }
}
