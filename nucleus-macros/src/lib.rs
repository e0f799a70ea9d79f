extern crate proc_macro;
use proc_macro::TokenStream;

pub(crate) mod component_derive;
pub(crate) mod crate_path;

/// Derive macro that stamps a type as a component of a declared kind.
///
/// ```ignore
/// #[derive(Component)]
/// #[component("command")]
/// struct Greet;
/// ```
///
/// Generates an `impl Tagged for Greet` returning a `ComponentTag` whose
/// metadata carries `{"type": "command"}`, matching the tag a catalogue
/// produces for objects declared with `ComponentCatalogue::declare("command", ..)`.
#[proc_macro_derive(Component, attributes(component))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    component_derive::expand(input)
}
