use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

use crate::attrs::{column_fields, ColumnField};
use crate::crate_path::sqlinq_data_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let krate = sqlinq_data_path();
    match column_fields(&input, "FromRow") {
        Ok(fields) => generate_impl(&input, &fields, &krate).into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// `impl FromRow`: each persisted field is read by column name, skipped
/// fields take `Default::default()`.
pub fn generate_impl(input: &DeriveInput, fields: &[ColumnField], krate: &TokenStream2) -> TokenStream2 {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let inits = fields.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let column = &f.column;
        if f.attrs.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! { #ident: row.get::<#ty>(#column)? }
        }
    });

    quote! {
        impl #impl_generics #krate::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &#krate::Row) -> ::core::result::Result<Self, #krate::DataError> {
                ::core::result::Result::Ok(Self {
                    #(#inits,)*
                })
            }
        }
    }
}
