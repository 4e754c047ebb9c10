//! Typed data access over relational databases.
//!
//! Entities derive their schema at compile time, queries are built through
//! chainable capability traits, batch mutations stay under backend
//! parameter limits, and a [`UnitOfWork`] scopes statements to one
//! transaction. Drivers plug in behind the [`Database`] trait; see
//! `sqlinq-data-sqlx` for the sqlx backend.

// Lets `#[derive(Entity)]` expand to `::sqlinq_data::…` inside this crate too.
extern crate self as sqlinq_data;

pub mod batch;
pub mod cancel;
pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod expr;
pub mod group;
pub mod log;
pub mod page;
pub mod query;
pub mod queryable;
pub mod repository;
pub mod row;
pub mod uow;
pub mod value;

mod session;

pub use self::entity as introspect;

pub use batch::{safe_batch_size, BatchInsertOptions, BatchUpdateOptions, DEFAULT_BATCH_SIZE, DEFAULT_PARAM_BUDGET};
pub use cancel::Cancellation;
pub use config::DataConfig;
pub use entity::{Entity, EntitySchema};
pub use error::{CancelReason, DataError, ErrorKind};
pub use executor::{Database, ExecResult, TransactionHandle};
pub use expr::{col, Cond, Order, Window};
pub use group::{AggregateBuilder, GroupKey, GroupTotals, GroupingQuery};
pub use log::{NoopLogger, QueryEvent, QueryLogger, TracingLogger};
pub use page::{Page, Pageable};
pub use query::{Assignments, Dialect, IdentifierPolicy, QueryError, Statement};
pub use queryable::{Filterable, Joinable, Orderable, Paginate, Projectable, QueryState, Queryable};
pub use repository::{ReadRepository, Repository, WriteRepository};
pub use row::{FromRow, Row};
pub use uow::{UnitOfWork, UnitOfWorkState};
pub use value::{FromValue, ToValue, Value};

pub use sqlinq_macros::{Entity, FromRow};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        col, AggregateBuilder, Assignments, BatchInsertOptions, BatchUpdateOptions, Cond, DataError, Entity,
        Filterable, FromRow, GroupKey, Joinable, Orderable, Page, Pageable, Paginate, Projectable, Queryable,
        ReadRepository, Repository, UnitOfWork, Value, WriteRepository,
    };
}
