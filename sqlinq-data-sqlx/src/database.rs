//! [`Database`](sqlinq_data::Database) over an `sqlx::Pool`.
//!
//! Each enabled driver feature implements the backend traits for its
//! concrete pool type; binding and row decoding live in the per-driver
//! codec modules.

use sqlinq_data::Dialect;
use sqlx::{Pool, Transaction};

/// A connection pool exposed as a sqlinq database.
///
/// ```ignore
/// let db = SqlxDatabase::<Sqlite>::connect("sqlite://app.db").await?;
/// let users = Repository::<User>::new(Arc::new(db));
/// ```
pub struct SqlxDatabase<DB: sqlx::Database> {
    pool: Pool<DB>,
    dialect: Dialect,
}

impl<DB: sqlx::Database> Clone for SqlxDatabase<DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            dialect: self.dialect,
        }
    }
}

impl<DB: sqlx::Database> SqlxDatabase<DB> {
    /// Render with `dialect` instead of the driver's default, e.g.
    /// [`Dialect::StarRocks`] over the MySQL driver.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &Pool<DB> {
        &self.pool
    }
}

/// An open transaction handed to a unit of work. Dropping it without
/// commit rolls back.
pub struct SqlxTransaction<DB: sqlx::Database> {
    tx: Transaction<'static, DB>,
}

/// Implements the backend traits for one driver. `$codec` names a module
/// providing `DIALECT`, `build`, `decode_row` and `last_insert_id`.
macro_rules! sqlx_backend {
    ($db:ty, $codec:ident) => {
        impl $crate::database::SqlxDatabase<$db> {
            pub fn new(pool: ::sqlx::Pool<$db>) -> Self {
                Self {
                    pool,
                    dialect: $crate::$codec::DIALECT,
                }
            }

            /// Open a pool for `url` with default pool options.
            pub async fn connect(url: &str) -> ::std::result::Result<Self, ::sqlinq_data::DataError> {
                let pool = ::sqlx::Pool::<$db>::connect(url)
                    .await
                    .map_err($crate::SqlxErrorExt::into_data_error)?;
                Ok(Self::new(pool))
            }
        }

        #[::async_trait::async_trait]
        impl ::sqlinq_data::Database for $crate::database::SqlxDatabase<$db> {
            fn dialect(&self) -> ::sqlinq_data::Dialect {
                self.dialect
            }

            async fn execute(
                &self,
                stmt: &::sqlinq_data::Statement,
            ) -> ::std::result::Result<::sqlinq_data::ExecResult, ::sqlinq_data::DataError> {
                let result = $crate::$codec::build(stmt)
                    .execute(&self.pool)
                    .await
                    .map_err($crate::SqlxErrorExt::into_data_error)?;
                Ok(::sqlinq_data::ExecResult {
                    rows_affected: result.rows_affected(),
                    last_insert_id: $crate::$codec::last_insert_id(&result),
                })
            }

            async fn query_many(
                &self,
                stmt: &::sqlinq_data::Statement,
            ) -> ::std::result::Result<::std::vec::Vec<::sqlinq_data::Row>, ::sqlinq_data::DataError> {
                let rows = $crate::$codec::build(stmt)
                    .fetch_all(&self.pool)
                    .await
                    .map_err($crate::SqlxErrorExt::into_data_error)?;
                rows.iter().map($crate::$codec::decode_row).collect()
            }

            async fn query_one(
                &self,
                stmt: &::sqlinq_data::Statement,
            ) -> ::std::result::Result<::std::option::Option<::sqlinq_data::Row>, ::sqlinq_data::DataError> {
                let row = $crate::$codec::build(stmt)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::SqlxErrorExt::into_data_error)?;
                row.as_ref().map($crate::$codec::decode_row).transpose()
            }

            async fn begin(
                &self,
            ) -> ::std::result::Result<::std::boxed::Box<dyn ::sqlinq_data::TransactionHandle>, ::sqlinq_data::DataError> {
                let tx = self
                    .pool
                    .begin()
                    .await
                    .map_err($crate::SqlxErrorExt::into_data_error)?;
                ::tracing::debug!(dialect = ?self.dialect, "Transaction opened");
                Ok(::std::boxed::Box::new($crate::database::SqlxTransaction::<$db> { tx }))
            }
        }

        #[::async_trait::async_trait]
        impl ::sqlinq_data::TransactionHandle for $crate::database::SqlxTransaction<$db> {
            async fn execute(
                &mut self,
                stmt: &::sqlinq_data::Statement,
            ) -> ::std::result::Result<::sqlinq_data::ExecResult, ::sqlinq_data::DataError> {
                let result = $crate::$codec::build(stmt)
                    .execute(&mut *self.tx)
                    .await
                    .map_err($crate::SqlxErrorExt::into_data_error)?;
                Ok(::sqlinq_data::ExecResult {
                    rows_affected: result.rows_affected(),
                    last_insert_id: $crate::$codec::last_insert_id(&result),
                })
            }

            async fn query_many(
                &mut self,
                stmt: &::sqlinq_data::Statement,
            ) -> ::std::result::Result<::std::vec::Vec<::sqlinq_data::Row>, ::sqlinq_data::DataError> {
                let rows = $crate::$codec::build(stmt)
                    .fetch_all(&mut *self.tx)
                    .await
                    .map_err($crate::SqlxErrorExt::into_data_error)?;
                rows.iter().map($crate::$codec::decode_row).collect()
            }

            async fn query_one(
                &mut self,
                stmt: &::sqlinq_data::Statement,
            ) -> ::std::result::Result<::std::option::Option<::sqlinq_data::Row>, ::sqlinq_data::DataError> {
                let row = $crate::$codec::build(stmt)
                    .fetch_optional(&mut *self.tx)
                    .await
                    .map_err($crate::SqlxErrorExt::into_data_error)?;
                row.as_ref().map($crate::$codec::decode_row).transpose()
            }

            async fn commit(self: ::std::boxed::Box<Self>) -> ::std::result::Result<(), ::sqlinq_data::DataError> {
                self.tx.commit().await.map_err($crate::SqlxErrorExt::into_data_error)
            }

            async fn rollback(self: ::std::boxed::Box<Self>) -> ::std::result::Result<(), ::sqlinq_data::DataError> {
                self.tx.rollback().await.map_err($crate::SqlxErrorExt::into_data_error)
            }
        }
    };
}

#[cfg(feature = "sqlite")]
sqlx_backend!(::sqlx::Sqlite, sqlite);

#[cfg(feature = "postgres")]
sqlx_backend!(::sqlx::Postgres, postgres);

#[cfg(feature = "mysql")]
sqlx_backend!(::sqlx::MySql, mysql);
