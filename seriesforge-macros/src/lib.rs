//! Procedural macros for seriesforge.
//!
//! This crate provides the `#[series_transform]` attribute macro, which
//! attaches a registry name and description to a transform type.

use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, LitStr, parse_macro_input};

/// Attribute macro for declaring a transform type.
///
/// Implements `seriesforge::transform::TransformKind` for the struct, so it
/// can be registered with a `TransformFactory`. The name defaults to the
/// lowercased struct name.
///
/// # Example
///
/// ```ignore
/// use seriesforge::prelude::*;
/// use seriesforge::series_transform;
///
/// #[series_transform(name = "negate", description = "Flips the sign of y")]
/// #[derive(Default)]
/// pub struct Negate {
///     state: TransformState,
/// }
///
/// impl TimeSeriesTransform for Negate {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn series_transform(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    let args = parse_macro_input!(attr as TransformArgs);

    let struct_name = &input.ident;
    let transform_name = args
        .name
        .unwrap_or_else(|| struct_name.to_string().to_lowercase());
    let transform_desc = args
        .description
        .unwrap_or_else(|| format!("{} transform", struct_name));

    if transform_name.is_empty() {
        return syn::Error::new(struct_name.span(), "transform name must not be empty")
            .to_compile_error()
            .into();
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        #input

        impl #impl_generics ::seriesforge::transform::TransformKind
            for #struct_name #ty_generics #where_clause
        {
            const NAME: &'static str = #transform_name;
            const DESCRIPTION: &'static str = #transform_desc;
        }
    };

    TokenStream::from(expanded)
}

/// Arguments for the series_transform attribute.
struct TransformArgs {
    name: Option<String>,
    description: Option<String>,
}

impl syn::parse::Parse for TransformArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut description = None;

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;

            match ident.to_string().as_str() {
                "name" => {
                    let lit: LitStr = input.parse()?;
                    name = Some(lit.value());
                }
                "description" => {
                    let lit: LitStr = input.parse()?;
                    description = Some(lit.value());
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            }
        }

        Ok(TransformArgs { name, description })
    }
}
