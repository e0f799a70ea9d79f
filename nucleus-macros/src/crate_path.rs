//! Crate path resolution for generated code.
//!
//! Detects whether the user depends on `nucleus-core` directly or re-exports
//! it under another name, and returns the appropriate path prefix.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

pub fn nucleus_core_path() -> TokenStream {
    match crate_name("nucleus-core") {
        Ok(FoundCrate::Itself) => quote!(crate),
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::nucleus_core),
    }
}
