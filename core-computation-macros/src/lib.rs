use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Expr, GenericArgument, ItemFn, LitStr, PathArguments, ReturnType, Type,
};

/// Turns an `async fn` returning `Result<T>` into a plain `fn` returning
/// `core_computation::Task<T>`. The body starts running as soon as the
/// function is called.
///
/// Options:
///
/// - `name = "..."`: name used in log fields, defaults to the function name
/// - `tracker = expr`: a `Tracker` to record the computation in; the
///   expression may refer to the function's parameters
/// - `policy = expr`: the `AbandonPolicy` applied when the handle is dropped
#[proc_macro_attribute]
pub fn computation(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = ComputationOptions::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            options.name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("tracker") {
            options.tracker = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("policy") {
            options.policy = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error(
                "unsupported computation option, expected `name`, `tracker` or `policy`",
            ))
        }
    });
    parse_macro_input!(attr with parser);

    let input = parse_macro_input!(item as ItemFn);
    match expand_computation(input, options) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand_driver(attr, item, DriverKind::Test)
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand_driver(attr, item, DriverKind::Main)
}

enum DriverKind {
    Test,
    Main,
}

#[derive(Default)]
struct ComputationOptions {
    name: Option<LitStr>,
    tracker: Option<Expr>,
    policy: Option<Expr>,
}

fn expand_computation(input: ItemFn, options: ComputationOptions) -> syn::Result<TokenStream2> {
    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            input.sig.fn_token,
            "#[computation] requires `async fn`",
        ));
    }

    let output_ty = match &input.sig.output {
        ReturnType::Type(_, ty) => ty.as_ref().clone(),
        ReturnType::Default => {
            return Err(syn::Error::new_spanned(
                &input.sig,
                "#[computation] functions must return `Result<T>`",
            ))
        }
    };
    let value_ty = result_value_type(&output_ty)?;

    let name = options.name.unwrap_or_else(|| {
        LitStr::new(&input.sig.ident.to_string(), input.sig.ident.span())
    });
    let tracker = options
        .tracker
        .map(|tracker| quote!(.tracker(&#tracker)));
    let policy = options.policy.map(|policy| quote!(.policy(#policy)));

    let mut sig = input.sig;
    sig.asyncness = None;
    sig.output = syn::parse_quote!(-> core_computation::Task<#value_ty>);

    let attrs = input.attrs;
    let vis = input.vis;
    let block = input.block;

    Ok(quote! {
        #(#attrs)*
        #vis #sig {
            core_computation::Builder::new()
                .name(#name)
                #tracker
                #policy
                .start(async move {
                    let output: #output_ty = #block;
                    output
                })
        }
    })
}

/// Extracts `T` from `Result<T>` or `Result<T, E>`.
fn result_value_type(ty: &Type) -> syn::Result<Type> {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Result" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(value)) = args.args.first() {
                        return Ok(value.clone());
                    }
                }
            }
        }
    }
    Err(syn::Error::new_spanned(
        ty,
        "#[computation] functions must return `Result<T>`",
    ))
}

fn expand_driver(attr: TokenStream, item: TokenStream, kind: DriverKind) -> TokenStream {
    if !attr.is_empty() {
        let tokens = TokenStream2::from(attr);
        return syn::Error::new_spanned(
            tokens,
            "core_computation driver macros do not accept arguments",
        )
        .to_compile_error()
        .into();
    }

    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "core_computation driver macros require `async fn`",
        )
        .to_compile_error()
        .into();
    }

    let mut sync_sig = input.sig.clone();
    sync_sig.asyncness = None;

    let attrs = input.attrs;
    let vis = input.vis;
    let block = input.block;

    let test_attr = match kind {
        DriverKind::Test => quote!(#[::core::prelude::v1::test]),
        DriverKind::Main => quote!(),
    };

    quote! {
        #test_attr
        #(#attrs)*
        #vis #sync_sig {
            core_computation::runtime::block_on(async move #block)
        }
    }
    .into()
}
