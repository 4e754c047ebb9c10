extern crate proc_macro;
use proc_macro::TokenStream;

pub(crate) mod attrs;
pub(crate) mod crate_path;
pub(crate) mod entity_derive;
pub(crate) mod from_row_derive;

/// Derive macro mapping a struct to a table.
///
/// Generates `impl Entity` (table, ordered column list, per-field value
/// access) and `impl FromRow`, so the struct must not also derive
/// `FromRow`.
///
/// # Struct-level attribute
///
/// `#[entity(...)]`:
///
/// | Parameter | Required | Description |
/// |-----------|----------|-------------|
/// | `table`   | no       | Table name. Defaults to the snake_case struct name. |
/// | `key`     | no       | Key column for key-matched updates and lookups. |
///
/// # Field attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[column(name = "...")]` | Column name, when it differs from the field name. |
/// | `#[column(key)]` | Marks the key column. A field named `id` is the key by default. |
/// | `#[column(generated)]` | Database-assigned; omitted from INSERT, populated by `create_returning_id` when it is the key. |
/// | `#[column(skip)]` | Not persisted. Read back as `Default::default()`. |
///
/// Persisted field types must implement `ToValue` and `FromValue`.
///
/// # Example
///
/// ```ignore
/// use sqlinq::prelude::*;
///
/// #[derive(Debug, Clone, Entity)]
/// #[entity(table = "users")]
/// pub struct User {
///     #[column(generated)]
///     pub id: i64,
///     pub name: String,
///     #[column(name = "mail")]
///     pub email: String,
///     #[column(skip)]
///     pub display: String,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity_derive::expand(input)
}

/// Derive macro materialising a struct from a result row by column name.
///
/// For projections and aggregate results read with `to_result::<R>()`,
/// `first_as::<R>()` or `to_paged_result::<R>()`. Honors
/// `#[column(name = "...")]` and `#[column(skip)]`.
///
/// ```ignore
/// #[derive(FromRow)]
/// struct StatusCount {
///     status: i64,
///     count: i64,
/// }
/// ```
#[proc_macro_derive(FromRow, attributes(column))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    from_row_derive::expand(input)
}
