#![recursion_limit = "128"]

//! `#[remote_signature]`: generates the `relay_core::remote::Serializer`
//! boilerplate for a remote delegate's argument struct (spec §4.5) so
//! callers don't hand-write a codec type per signature.
//!
//! Applied to a struct already deriving `serde::Serialize`/`Deserialize`
//! (and typically `Default`, since the receiver side default-constructs its
//! argument slot before `Serializer::read` fills it in), this emits a
//! zero-sized `{Name}Codec` implementing `Serializer<{Name}>` over
//! `bincode`, plus an inherent `{Name}::serializer()` constructor handing
//! back a boxed trait object ready to pass to `RemoteDelegate::with_serializer`.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::DeriveInput;

#[proc_macro_attribute]
pub fn remote_signature(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input: DeriveInput = syn::parse(item).expect("#[remote_signature] expects a struct");
    let name = &input.ident;
    let codec_ident = syn::Ident::new(&format!("{}Codec", name), name.span());

    let expanded = quote! {
        #input

        #[doc(hidden)]
        #[derive(Default)]
        pub struct #codec_ident;

        impl ::relay_core::remote::Serializer<#name> for #codec_ident {
            fn write(&self, sink: &mut dyn ::std::io::Write, args: &#name) -> ::std::io::Result<()> {
                ::bincode::serialize_into(sink, args)
                    .map_err(|e| ::std::io::Error::new(::std::io::ErrorKind::Other, e))
            }

            fn read(&self, source: &mut dyn ::std::io::Read, slots: &mut #name) -> ::std::io::Result<()> {
                *slots = ::bincode::deserialize_from(source)
                    .map_err(|e| ::std::io::Error::new(::std::io::ErrorKind::Other, e))?;
                Ok(())
            }
        }

        impl #name {
            /// A ready-to-use serializer for this signature, for
            /// `RemoteDelegate::with_serializer`.
            pub fn serializer() -> ::std::sync::Arc<dyn ::relay_core::remote::Serializer<#name>> {
                ::std::sync::Arc::new(#codec_ident::default())
            }
        }
    };

    expanded.into()
}
