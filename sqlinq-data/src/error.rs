use crate::query::QueryError;

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// The entity has no persisted fields, a requested field is not
    /// persisted, or a result row does not match the requested shape.
    Schema(String),
    /// Invalid caller-supplied parameters (batch sizes, page numbers,
    /// missing key field, empty mutation condition).
    Configuration(String),
    /// The underlying statement failed. `offset` is set by batch
    /// operations to the first entity index of the failing window.
    Execution {
        source: Box<dyn std::error::Error + Send + Sync>,
        offset: Option<usize>,
    },
    /// Operation attempted on a unit of work in the wrong state.
    InvalidState(String),
    /// Operation aborted by a cancellation token or deadline.
    Cancelled(CancelReason),
    /// No row matched where exactly one was required.
    NotFound(String),
    /// The statement could not be rendered.
    Query(QueryError),
    /// The transaction body failed and the rollback failed too.
    RollbackFailed {
        original: Box<DataError>,
        rollback: Box<DataError>,
    },
}

/// Why an operation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Token,
    Deadline,
}

/// Coarse classification of a [`DataError`], for callers that branch on
/// the kind of failure rather than its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Configuration,
    Execution,
    InvalidState,
    Cancelled,
    NotFound,
}

impl DataError {
    /// Construct an `Execution` variant from any driver error.
    ///
    /// Used by backend crates (e.g. `sqlinq-data-sqlx`) to wrap
    /// driver-specific errors.
    pub fn execution(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Execution {
            source: Box::new(err),
            offset: None,
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        DataError::Schema(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        DataError::Configuration(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        DataError::InvalidState(msg.into())
    }

    /// Attach the failing batch offset to an execution error. Other
    /// variants are returned unchanged.
    pub fn at_offset(self, at: usize) -> Self {
        match self {
            DataError::Execution { source, .. } => DataError::Execution {
                source,
                offset: Some(at),
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::Schema(_) => ErrorKind::Schema,
            DataError::Configuration(_) => ErrorKind::Configuration,
            DataError::Execution { .. } => ErrorKind::Execution,
            DataError::InvalidState(_) => ErrorKind::InvalidState,
            DataError::Cancelled(_) => ErrorKind::Cancelled,
            DataError::NotFound(_) => ErrorKind::NotFound,
            DataError::Query(_) => ErrorKind::Schema,
            DataError::RollbackFailed { original, .. } => original.kind(),
        }
    }

    /// Offset of the failing batch window, if this error came from one.
    pub fn batch_offset(&self) -> Option<usize> {
        match self {
            DataError::Execution { offset, .. } => *offset,
            DataError::RollbackFailed { original, .. } => original.batch_offset(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Schema(msg) => write!(f, "Schema error: {msg}"),
            DataError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            DataError::Execution {
                source,
                offset: Some(at),
            } => write!(f, "Execution error: batch failed at offset {at}: {source}"),
            DataError::Execution { source, .. } => write!(f, "Execution error: {source}"),
            DataError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            DataError::Cancelled(CancelReason::Token) => write!(f, "Cancelled: token fired"),
            DataError::Cancelled(CancelReason::Deadline) => write!(f, "Cancelled: deadline exceeded"),
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::Query(err) => write!(f, "Query error: {err}"),
            DataError::RollbackFailed { original, rollback } => {
                write!(f, "{original} (rollback also failed: {rollback})")
            }
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Execution { source, .. } => Some(source.as_ref()),
            DataError::Query(err) => Some(err),
            DataError::RollbackFailed { original, .. } => Some(original.as_ref()),
            _ => None,
        }
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct DriverError;

    impl std::fmt::Display for DriverError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("disk I/O error")
        }
    }

    impl std::error::Error for DriverError {}

    #[test]
    fn test_execution_keeps_driver_error() {
        let err = DataError::execution(DriverError);
        assert_eq!(err.kind(), ErrorKind::Execution);
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<DriverError>().is_some());
    }

    #[test]
    fn test_at_offset() {
        let err = DataError::execution(DriverError).at_offset(2000);
        assert_eq!(err.batch_offset(), Some(2000));
        assert_eq!(
            err.to_string(),
            "Execution error: batch failed at offset 2000: disk I/O error"
        );

        let untouched = DataError::schema("no fields").at_offset(5);
        assert_eq!(untouched.batch_offset(), None);
    }

    #[test]
    fn test_rollback_failed_reports_original_kind() {
        let err = DataError::RollbackFailed {
            original: Box::new(DataError::NotFound("user 7".into())),
            rollback: Box::new(DataError::execution(DriverError)),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "Not found: user 7 (rollback also failed: Execution error: disk I/O error)"
        );
    }
}
