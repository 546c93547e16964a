//! `#[handler]` expansion
//!
//! Parses the attributed function with `syn`, checks that it fits the
//! handler shape, moves its body into an inner function and emits a factory
//! that wraps the inner function with `hostlink_server::from_typed_fn`.

use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse_macro_input, FnArg, ItemFn, ReturnType};

pub fn handler_impl(input: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(input as ItemFn);

    match expand(&input_fn) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

fn expand(input_fn: &ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    let sig = &input_fn.sig;

    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "command handlers run synchronously inside the host step; remove `async`",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(sig.generics.span(), "command handlers cannot be generic"));
    }
    if sig.inputs.len() > 1 {
        return Err(syn::Error::new(
            sig.inputs.span(),
            "command handlers take at most one parameter",
        ));
    }

    let (param_pat, param_type) = match sig.inputs.first() {
        Some(FnArg::Typed(pat_type)) => {
            let pat = &pat_type.pat;
            let ty = &pat_type.ty;
            (quote! { #pat }, quote! { #ty })
        }
        Some(FnArg::Receiver(receiver)) => {
            return Err(syn::Error::new(
                receiver.span(),
                "command handlers are free functions and cannot take `self`",
            ))
        }
        None => (quote! { _: () }, quote! { () }),
    };

    let return_type = match &sig.output {
        ReturnType::Type(_, ty) => quote! { #ty },
        ReturnType::Default => {
            return Err(syn::Error::new(
                sig.span(),
                "command handlers must return a Result",
            ))
        }
    };

    let fn_name = &sig.ident;
    let fn_vis = &input_fn.vis;
    let fn_block = &input_fn.block;
    let fn_attrs = &input_fn.attrs;

    // The zero-parameter form binds `_: ()`, so only add the type annotation
    // when the user wrote a pattern.
    let inner_params = if sig.inputs.is_empty() {
        quote! { #param_pat }
    } else {
        quote! { #param_pat: #param_type }
    };

    Ok(quote! {
        #(#fn_attrs)*
        #fn_vis fn #fn_name() -> ::std::boxed::Box<dyn hostlink_server::Handler> {
            fn inner_handler(#inner_params) -> #return_type #fn_block

            hostlink_server::from_typed_fn(move |params: #param_type| {
                inner_handler(params).map_err(::core::convert::Into::into)
            })
        }
    })
}
