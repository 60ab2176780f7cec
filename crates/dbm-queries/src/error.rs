//! Filter compilation errors

use dbm_core::DbmError;

use crate::builder::BuildError;

/// Error raised while parsing or compiling a filter or order-by expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("failed to parse filter {filter:?}, error: {message}")]
    Parse { filter: String, message: String },

    #[error("unsupported variable {0:?}")]
    UnknownField(String),

    #[error("\">=\" and \"<=\" are only supported for \"{0}\"")]
    RangeOperator(String),

    #[error("{operator:?} is not supported for {field:?}")]
    UnsupportedOperator { operator: String, field: String },

    #[error("{0} should be bool")]
    ExpectBool(String),

    #[error("{field} should be a string, got {kind}")]
    ExpectString { field: String, kind: &'static str },

    #[error("failed to parse time {value:?}, error: {message}")]
    InvalidTime { value: String, message: String },

    #[error("empty value for {0:?}")]
    EmptyValue(String),

    #[error("invalid {field} value {value:?}")]
    InvalidEnumValue { field: String, value: String },

    #[error("invalid {field} filter {value:?}")]
    InvalidFilterValue { field: String, value: String },

    #[error("unsupported order by key {0:?}")]
    UnsupportedOrderBy(String),

    #[error("invalid order by {0:?}")]
    InvalidOrderBy(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl FilterError {
    pub(crate) fn unsupported_operator(operator: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
            field: field.into(),
        }
    }
}

/// Result alias for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

impl From<FilterError> for DbmError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::Build(e) => DbmError::Internal(e.to_string()),
            other => DbmError::invalid_argument(other.to_string()),
        }
    }
}
