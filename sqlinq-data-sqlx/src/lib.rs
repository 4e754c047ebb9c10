//! # sqlinq-data-sqlx: SQLx backend for the sqlinq data layer
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)-specific
//! implementations of [`sqlinq_data::Database`] and
//! [`sqlinq_data::TransactionHandle`]. Statements rendered by the query
//! builders are bound positionally and result rows are decoded into
//! dynamically typed [`sqlinq_data::Row`]s.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlxDatabase`] | Pool wrapper implementing `Database` for the enabled drivers |
//! | [`SqlxTransaction`] | Open transaction handed to a `UnitOfWork` |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Feature flags
//!
//! | Feature    | Driver | Dialect |
//! |------------|--------|---------|
//! | `sqlite` (default) | SQLite via `sqlx/sqlite` | `Dialect::Sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` | `Dialect::Postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` | `Dialect::MySql` (or `StarRocks` with [`SqlxDatabase::with_dialect`]) |
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! sqlinq-data-sqlx = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use sqlinq_data_sqlx::prelude::*;
//! use sqlx::Postgres;
//!
//! let db = Arc::new(SqlxDatabase::<Postgres>::connect(&url).await?);
//! let users = Repository::<User>::new(db.clone());
//!
//! let adults = users
//!     .query()
//!     .filter(col("age").gte(18))
//!     .order_by(["name"])
//!     .to_list()
//!     .await?;
//! ```
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use sqlinq_data_sqlx::SqlxErrorExt;
//!
//! let pool = sqlx::SqlitePool::connect(url)
//!     .await
//!     .map_err(|e| e.into_data_error())?;
//! ```

pub mod database;
pub mod error;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use database::{SqlxDatabase, SqlxTransaction};
pub use error::{SqlxErrorExt, SqlxResult};

/// Re-exports of the most commonly used types from both `sqlinq-data` and this crate.
pub mod prelude {
    pub use crate::{SqlxDatabase, SqlxErrorExt};
    pub use sqlinq_data::prelude::*;
}
