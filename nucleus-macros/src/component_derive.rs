use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

use crate::crate_path::nucleus_core_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(_) | Fields::Unit => {}
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Component)] does not support tuple structs",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Component)] only works on structs — enums and unions are not supported",
            ))
        }
    }

    let krate = nucleus_core_path();

    let mut kind: Option<String> = None;
    for attr in &input.attrs {
        if attr.path().is_ident("component") {
            let lit: LitStr = attr.parse_args()?;
            kind = Some(lit.value());
        }
    }

    let kind = kind.ok_or_else(|| {
        syn::Error::new_spanned(
            name,
            "#[derive(Component)] requires a #[component(\"kind\")] attribute naming the slot kind",
        )
    })?;

    Ok(quote! {
        impl #krate::component::Tagged for #name {
            fn tag() -> #krate::component::ComponentTag {
                #krate::component::ComponentTag::with_kind(#kind)
            }
        }
    })
}
