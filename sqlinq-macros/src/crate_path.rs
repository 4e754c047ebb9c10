//! Crate path resolution for generated code.
//!
//! Detects whether the user depends on `sqlinq` (facade) or `sqlinq-data`
//! directly, and returns the appropriate path prefix for generated code.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

/// Returns the token stream for accessing `sqlinq_data` types.
///
/// If the user depends on `sqlinq`, returns `::sqlinq`.
/// Otherwise returns `::sqlinq_data`. Inside `sqlinq-data` itself the
/// crate aliases itself as `sqlinq_data`, so `::sqlinq_data` works there too.
pub fn sqlinq_data_path() -> TokenStream {
    if let Ok(FoundCrate::Name(name)) = crate_name("sqlinq") {
        let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
        return quote!(::#ident);
    }
    match crate_name("sqlinq-data") {
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        // `Itself`, or unresolved (error messages still point somewhere sensible)
        _ => quote!(::sqlinq_data),
    }
}
