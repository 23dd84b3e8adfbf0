//! `#[derive(Error)]` expansion.
//!
//! Every enum variant (or the struct itself) carries an `#[error("...")]`
//! attribute holding a format string. Tuple fields are referenced positionally
//! (`{0}`), named fields by name (`{address}`).
//!
//! ```ignore
//! use hybrid_vm_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum VMError {
//!     #[error("no instruction at address {address}")]
//!     NoInstruction { address: i64 },
//!     #[error("undefined label: {0}")]
//!     UndefinedLabel(String),
//!     #[error("division by zero")]
//!     DivisionByZero,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::{Ident, TokenStream as TokenStream2};
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let message = message_from(&variant.attrs, &variant.ident)?;
                    let ident = &variant.ident;
                    let (pattern, write) = render(&variant.fields, &message);
                    Ok(quote! { Self::#ident #pattern => #write, })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message = message_from(&input.attrs, name)?;
            let (pattern, write) = render(&data.fields, &message);
            quote! {
                let Self #pattern = self;
                #write
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Error)] supports enums and structs only",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds the destructuring pattern for `fields` and the `write!` call that
/// formats `message` with the bound names.
fn render(fields: &Fields, message: &LitStr) -> (TokenStream2, TokenStream2) {
    match fields {
        Fields::Unit => (quote! {}, quote! { write!(f, #message) }),
        Fields::Named(named) => {
            let idents: Vec<&Ident> = named.named.iter().filter_map(|f| f.ident.as_ref()).collect();
            (
                quote! { { #(#idents),* } },
                quote! { write!(f, #message, #(#idents = #idents),*) },
            )
        }
        Fields::Unnamed(unnamed) => {
            let idents: Vec<Ident> = (0..unnamed.unnamed.len())
                .map(|i| format_ident!("_{}", i))
                .collect();
            let format = LitStr::new(&positional_to_named(&message.value(), idents.len()), message.span());
            (
                quote! { ( #(#idents),* ) },
                quote! { write!(f, #format, #(#idents = #idents),*) },
            )
        }
    }
}

/// Finds the `#[error("...")]` attribute among `attrs`.
fn message_from<T: ToTokens>(attrs: &[Attribute], target: &T) -> syn::Result<LitStr> {
    let attr = attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                target,
                "missing #[error(\"...\")] attribute; every error needs a display message",
            )
        })?;

    attr.parse_args::<LitStr>().map_err(|_| {
        syn::Error::new_spanned(
            &attr.meta,
            "expected a string literal, e.g. #[error(\"no instruction at {address}\")]",
        )
    })
}

/// Rewrites `{0}`, `{1:?}`, ... into `{_0}`, `{_1:?}` so tuple fields can be
/// passed to `write!` as named arguments.
fn positional_to_named(format: &str, field_count: usize) -> String {
    let mut out = format.to_string();
    for i in (0..field_count).rev() {
        out = out
            .replace(&format!("{{{i}}}"), &format!("{{_{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{_{i}:"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_placeholders_become_named() {
        assert_eq!(positional_to_named("bad {0} at {1}", 2), "bad {_0} at {_1}");
        assert_eq!(positional_to_named("{0:?}", 1), "{_0:?}");
    }

    #[test]
    fn braces_without_index_are_untouched() {
        assert_eq!(positional_to_named("{{literal}} {0}", 1), "{{literal}} {_0}");
        assert_eq!(positional_to_named("no fields", 0), "no fields");
    }

    #[test]
    fn double_digit_index_is_not_clobbered_by_single_digit() {
        let format = (0..11).map(|i| format!("{{{i}}}")).collect::<String>();
        let named = positional_to_named(&format, 11);
        assert!(named.ends_with("{_10}"));
        assert!(named.starts_with("{_0}{_1}"));
    }
}
