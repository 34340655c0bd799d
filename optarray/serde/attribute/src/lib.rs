mod optional;

use proc_macro::TokenStream;
use syn::DeriveInput;

///
/// Annotates all `Option<T>` fields with Serde attributes to code them as arrays of zero or one
/// element.
///
/// By default, `serde_json` maps `None` to `null` and `Some(T)` to `T`.  This attribute maps
/// `None` to `[]` and `Some(T)` to `[T]` instead, so that `Some(None)` (`[null]`) is
/// distinguishable from `None` (`[]`).
///
/// It adds the following attributes:
///
/// * `with = "..."`: Points Serde at the array codec for the field.
///
/// * `default` (named fields only): Enables Serde to treat missing fields as `None` during
///   deserialization.  This is necessary because using `with = "..."` disables Serde's built-in
///   support for optional fields [1], so an explicit `default` annotation is required.
///
/// Container arguments:
///
/// * `strict`: Reject arrays of more than one element in every field.
/// * `lenient`: Keep the last element of such arrays (the default).
///
/// Field arguments, written as `#[optional(...)]`:
///
/// * `skip`: Leave the field alone.
/// * `with = "Codec"`: Code the element with `Codec`, which implements `optarray_serde::SerdeWith`.
/// * `strict` and `lenient`: Override the container policy.
///
/// [1]: https://github.com/serde-rs/serde/blob/master/serde/src/private/de.rs#L23
///
#[proc_macro_attribute]
pub fn optional(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = syn::parse_macro_input!(args with optional::ContainerArgs::parse_terminated);
    optional::optional(args, syn::parse_macro_input!(input as DeriveInput))
        .unwrap_or_else(|error| {
            let compile_errors = error.to_compile_error();
            quote::quote!(#compile_errors)
        })
        .into()
}
