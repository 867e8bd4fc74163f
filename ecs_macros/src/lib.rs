mod component;

use proc_macro::TokenStream;

/// Derives [`rusty_ecs::component::Component`] for a struct.
///
/// The derived impl carries no behavior of its own; it only marks the type
/// as eligible for registration with a world's component registry.
#[proc_macro_derive(Component)]
pub fn derive_component(item: TokenStream) -> TokenStream {
    component::derive_component(item)
}
