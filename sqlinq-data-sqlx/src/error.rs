use sqlinq_data::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Use `.into_data_error()` instead.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".into()),
            sqlx::Error::ColumnNotFound(column) => {
                DataError::schema(format!("column `{column}` not found in result"))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DataError::schema(format!("cannot decode column {index}: {source}"))
            }
            _ => DataError::execution(self),
        }
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sqlinq_data::ErrorKind;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(sqlx::Error::RowNotFound.into_data_error().is_not_found());
    }

    #[test]
    fn test_driver_errors_stay_inspectable() {
        let err = sqlx::Error::PoolTimedOut.into_data_error();
        assert_eq!(err.kind(), ErrorKind::Execution);
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<sqlx::Error>().is_some());
    }
}
