use bae::TryFromAttributes;
use proc_macro2::TokenStream;
use quote::ToTokens;

use crate::error::Error;

const OPTION_PREFIXES: [&str; 3] = ["std::option::Option<", "option::Option<", "Option<"];

pub trait DeriveMacro: Sized {
    fn new(input: syn::DeriveInput) -> Result<Self, Error>;

    fn expand(&self) -> syn::Result<TokenStream>;
}

pub struct Field<Attr> {
    pub attrs: Attr,
    pub ident: syn::Ident,
    pub field: syn::Field,
}

pub fn parse_struct_fields<Attr>(data: syn::Data) -> Result<Vec<Field<Attr>>, Error>
where
    Attr: Default + TryFromAttributes,
{
    let fields = match data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(syn::FieldsNamed { named, .. }),
            ..
        }) => named,
        _ => return Err(Error::InputNotStruct),
    };

    fields
        .into_iter()
        .map(|field| {
            Ok(Field {
                attrs: Attr::try_from_attributes(&field.attrs)
                    .map_err(Error::Syn)?
                    .unwrap_or_default(),
                ident: field.ident.clone().ok_or(Error::InputNotStruct)?,
                field,
            })
        })
        .collect::<Result<_, _>>()
}

/// Type path without whitespace, eg. `Option<chrono::NaiveDate>`.
pub fn type_string(ty: &syn::Type) -> String {
    let ty = match ty {
        syn::Type::Reference(reference) => reference.elem.as_ref(),
        other => other,
    };
    ty.to_token_stream().to_string().replace(' ', "")
}

pub fn strip_ty_option(ty: &str) -> &str {
    for prefix in OPTION_PREFIXES.iter() {
        if ty.starts_with(prefix) && ty.ends_with('>') {
            return &ty[prefix.len()..(ty.len() - 1)];
        }
    }

    ty
}

pub fn is_ty_option(ty: &str) -> bool {
    OPTION_PREFIXES.iter().any(|prefix| ty.starts_with(prefix))
}
