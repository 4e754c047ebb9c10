use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use crate::attrs::{column_fields, parse_entity_attrs, snake_case, ColumnField};
use crate::crate_path::sqlinq_data_path;
use crate::from_row_derive;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let krate = sqlinq_data_path();

    let entity = parse_entity_attrs(&input.attrs)?;
    let fields = column_fields(input, "Entity")?;
    let persisted: Vec<&ColumnField> = fields.iter().filter(|f| !f.attrs.skip).collect();

    if persisted.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "#[derive(Entity)] requires at least one persisted field",
        ));
    }

    let table = entity.table.unwrap_or_else(|| snake_case(&name.to_string()));
    let key = resolve_key(name, entity.key, &persisted)?;

    let columns: Vec<&str> = persisted.iter().map(|f| f.column.as_str()).collect();
    let insert_columns: Vec<&str> = persisted
        .iter()
        .filter(|f| !f.attrs.generated)
        .map(|f| f.column.as_str())
        .collect();
    let generated: Vec<&str> = persisted
        .iter()
        .filter(|f| f.attrs.generated)
        .map(|f| f.column.as_str())
        .collect();

    let value_arms = persisted.iter().map(|f| {
        let ident = &f.ident;
        let column = &f.column;
        quote! { #column => ::core::option::Option::Some(#krate::ToValue::to_value(&self.#ident)) }
    });

    let key_fn = match &key {
        Some(key) => quote! {
            fn key_column() -> ::core::option::Option<&'static str> {
                ::core::option::Option::Some(#key)
            }
        },
        None => quote! {},
    };

    let set_key_fn = match key.as_ref().and_then(|k| persisted.iter().find(|f| &f.column == k)) {
        Some(field) => {
            let ident = &field.ident;
            let ty = &field.ty;
            quote! {
                fn set_generated_key(&mut self, key: i64) -> ::core::result::Result<(), #krate::DataError> {
                    self.#ident = <#ty as #krate::FromValue>::from_value(#krate::Value::Int(key))?;
                    ::core::result::Result::Ok(())
                }
            }
        }
        None => quote! {},
    };

    let from_row = from_row_derive::generate_impl(input, &fields, &krate);

    Ok(quote! {
        impl #impl_generics #krate::Entity for #name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table
            }

            fn columns() -> &'static [&'static str] {
                &[#(#columns),*]
            }

            fn insert_columns() -> &'static [&'static str] {
                &[#(#insert_columns),*]
            }

            fn generated_columns() -> &'static [&'static str] {
                &[#(#generated),*]
            }

            #key_fn

            fn field_value(&self, column: &str) -> ::core::option::Option<#krate::Value> {
                match column {
                    #(#value_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            #set_key_fn
        }

        #from_row
    })
}

/// Key precedence: `#[entity(key = ...)]`, then `#[column(key)]`, then a
/// field whose column is `id`.
fn resolve_key(
    name: &syn::Ident,
    declared: Option<String>,
    persisted: &[&ColumnField],
) -> syn::Result<Option<String>> {
    let marked: Vec<&&ColumnField> = persisted.iter().filter(|f| f.attrs.key).collect();
    if marked.len() > 1 {
        return Err(syn::Error::new_spanned(
            &marked[1].ident,
            "only one field may carry #[column(key)]",
        ));
    }
    if let Some(key) = declared {
        if !persisted.iter().any(|f| f.column == key) {
            return Err(syn::Error::new_spanned(
                name,
                format!("#[entity(key = \"{key}\")] does not name a persisted column"),
            ));
        }
        return Ok(Some(key));
    }
    if let Some(field) = marked.first() {
        return Ok(Some(field.column.clone()));
    }
    Ok(persisted
        .iter()
        .find(|f| f.column == "id")
        .map(|f| f.column.clone()))
}
