//! Procedural macros for aviator-script's built-in catalog.
//!
//! Provides the `#[builtin(name = "...", category = "...", returns = "...")]`
//! attribute. It leaves the annotated function untouched and additionally
//! emits a `register_<fn>` function that binds the function into an
//! [`Environment`](https://docs.rs/aviator-script) under its dotted catalog
//! name, plus a `meta_<fn>` function returning the catalog metadata the
//! static analyzer seeds its root symbol table with.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Expr, ItemFn, Lit, MetaNameValue, Token};

struct BuiltinArgs {
    name: String,
    category: String,
    returns: String,
}

impl syn::parse::Parse for BuiltinArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let pairs = Punctuated::<MetaNameValue, Token![,]>::parse_terminated(input)?;

        let mut name = None;
        let mut category = None;
        let mut returns = None;

        for pair in pairs {
            let key = pair
                .path
                .get_ident()
                .map(|ident| ident.to_string())
                .unwrap_or_default();
            let value = match &pair.value {
                Expr::Lit(syn::ExprLit {
                    lit: Lit::Str(lit_str),
                    ..
                }) => lit_str.value(),
                other => {
                    return Err(syn::Error::new_spanned(other, "expected a string literal"));
                }
            };

            match key.as_str() {
                "name" => name = Some(value),
                "category" => category = Some(value),
                "returns" => returns = Some(value),
                other => {
                    return Err(syn::Error::new_spanned(
                        &pair.path,
                        format!("unknown `builtin` argument `{other}`"),
                    ));
                }
            }
        }

        let name = name.ok_or_else(|| {
            syn::Error::new(Span::call_site(), "`#[builtin]` requires `name = \"...\"`")
        })?;

        Ok(BuiltinArgs {
            name,
            category: category.unwrap_or_else(|| "other".to_string()),
            returns: returns.unwrap_or_else(|| "any".to_string()),
        })
    }
}

/// Registers a function as a catalog entry.
///
/// The dotted `name` is what `env.get("math.sqrt")` and the interpreter's
/// flattened-name call lookup see; `category`/`returns` feed the catalog
/// metadata the static analyzer's root symbol table is seeded with.
#[proc_macro_attribute]
pub fn builtin(attr: TokenStream, item: TokenStream) -> TokenStream {
    let func = parse_macro_input!(item as ItemFn);
    let args = parse_macro_input!(attr as BuiltinArgs);

    let fn_name = func.sig.ident.clone();
    let register_fn = format_ident!("register_{}", fn_name);
    let meta_fn = format_ident!("meta_{}", fn_name);

    let lisp_name = args.name;
    let category = args.category;
    let returns = args.returns;

    let expanded = quote! {
        #func

        #[allow(dead_code)]
        pub fn #register_fn(env: &::std::rc::Rc<crate::env::Environment>) {
            env.define(#lisp_name.to_string(), crate::value::Value::Native(#fn_name));
        }

        #[allow(dead_code)]
        pub fn #meta_fn() -> crate::builtins::CatalogMeta {
            crate::builtins::CatalogMeta {
                name: #lisp_name,
                category: #category,
                returns: #returns,
            }
        }
    };

    TokenStream::from(expanded)
}
