//! sqlinq: typed, composable data access for Rust.
//!
//! This facade crate re-exports the sqlinq sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use sqlinq::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature     | Default | Crate                        |
//! |-------------|---------|------------------------------|
//! | `data-sqlx` | no      | `sqlinq-data-sqlx`           |
//! | `sqlite`    | **yes** | `sqlinq-data-sqlx/sqlite`    |
//! | `postgres`  | no      | `sqlinq-data-sqlx/postgres`  |
//! | `mysql`     | no      | `sqlinq-data-sqlx/mysql`     |
//!
//! The data core (`sqlinq-data`) and the derives (`sqlinq-macros`) are
//! always available.
//!
//! ```ignore
//! use sqlinq::prelude::*;
//!
//! #[derive(Entity)]
//! #[entity(table = "orders")]
//! struct Order {
//!     #[column(generated)]
//!     id: i64,
//!     customer: String,
//!     total: f64,
//! }
//!
//! let db = Arc::new(SqlxDatabase::<sqlx::Sqlite>::connect("sqlite://shop.db").await?);
//! let orders = Repository::<Order>::new(db);
//! let big = orders.query().filter(col("total").gt(100.0)).count().await?;
//! ```

// The derives use `proc-macro-crate` to detect whether the user depends on
// `sqlinq` (facade) or `sqlinq-data`, and generate the correct paths.
pub extern crate sqlinq_data;
pub extern crate sqlinq_macros;

// Re-export everything from sqlinq-data at the top level for convenience.
pub use sqlinq_data::*;

#[cfg(feature = "data-sqlx")]
pub use sqlinq_data_sqlx;

#[cfg(feature = "data-sqlx")]
pub use sqlinq_data_sqlx::{SqlxDatabase, SqlxErrorExt, SqlxTransaction};

/// Unified prelude. Import everything with `use sqlinq::prelude::*`.
pub mod prelude {
    pub use sqlinq_data::prelude::*;

    #[cfg(feature = "data-sqlx")]
    pub use sqlinq_data_sqlx::prelude::*;
}
