use std::iter::FromIterator;

use bae::TryFromAttributes;
use heck::SnakeCase;
use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;

use crate::{
    attributes::{ItemAttrs, RootAttrs},
    error::Error,
    util::{is_ty_option, parse_struct_fields, strip_ty_option, type_string, DeriveMacro, Field},
};

const INTEGER_TYPES: [&str; 4] = ["TinyInt", "SmallInt", "Integer", "BigInt"];
const CHARACTER_TYPES: [&str; 2] = ["VarChar", "Char"];

pub struct DeriveDatabaseModel {
    attrs: RootAttrs,
    fields: Vec<Field<ItemAttrs>>,
    ident: syn::Ident,
}

impl DeriveDatabaseModel {
    fn expand_impl_database_schema(&self) -> syn::Result<TokenStream> {
        let Self {
            attrs,
            fields,
            ident,
        } = self;

        let model_name = ident.to_string();
        let table_name = attrs
            .table
            .as_ref()
            .map(|table| table.value())
            .unwrap_or_else(|| model_name.to_snake_case());

        if !fields.iter().any(|field| field.attrs.primary_key.is_some()) {
            return Err(syn::Error::new(
                ident.span(),
                "database models must have a `#[shelf(primary_key)]` column",
            ));
        }

        let mut auto_increment = fields
            .iter()
            .filter(|field| field.attrs.auto_increment.is_some());
        auto_increment.next();
        if let Some(field) = auto_increment.next() {
            return Err(syn::Error::new(
                field.ident.span(),
                "only one column can be `auto_increment`",
            ));
        }

        let mut columns = fields
            .iter()
            .map(Self::expand_column)
            .collect::<syn::Result<Vec<_>>>()?;

        if attrs.timestamps.is_some() {
            for name in ["created_at", "updated_at"].iter() {
                if fields.iter().any(|field| field.ident == *name) {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("`{}` is added by `timestamps` and cannot be declared", name),
                    ));
                }
                columns.push(quote!(
                    shelf::database::DatabaseColumn {
                        default: Some(shelf::database::DatabaseDefault::Raw("CURRENT_TIMESTAMP".to_string())),
                        ..shelf::database::DatabaseColumn::new(#name, shelf::database::DatabaseType::DateTime)
                    }
                ));
            }
        }

        Ok(quote!(
            impl shelf::database::IntoDatabaseSchema for #ident {
                fn database_schema() -> shelf::database::DatabaseSchema {
                    shelf::database::DatabaseSchema {
                        model_name: #model_name.to_string(),
                        table_name: #table_name.to_string(),
                        columns: vec![ #( #columns, )* ],
                    }
                }
            }
        ))
    }

    fn expand_column(field: &Field<ItemAttrs>) -> syn::Result<TokenStream> {
        let name = field.ident.to_string();
        let ty_span = field.field.ty.span();
        let ty_string = type_string(&field.field.ty);

        let type_name = if let Some(db_type) = &field.attrs.db_type {
            db_type.value()
        } else if let Some(type_name) = Self::rust_to_db_type(strip_ty_option(&ty_string)) {
            type_name.to_string()
        } else {
            return Err(syn::Error::new(ty_span, "type is not supported"));
        };
        let base_type = type_name.split('(').next().unwrap_or_default().trim();

        let type_tokens: TokenStream = type_name.parse().map_err(|_| {
            syn::Error::new(
                field.attrs.db_type.as_ref().map(|lit| lit.span()).unwrap_or(ty_span),
                "invalid db_type",
            )
        })?;
        let is_character = CHARACTER_TYPES.contains(&base_type) && base_type == type_name;
        let ty = match &field.attrs.max_len {
            Some(max_len) if is_character => {
                quote!(shelf::database::DatabaseType::#type_tokens(#max_len))
            }
            Some(max_len) => {
                return Err(syn::Error::new(
                    max_len.span(),
                    "max_len can only be used on varchar & char types",
                ))
            }
            None if is_character => quote!(
                shelf::database::DatabaseType::#type_tokens(shelf::database::DEFAULT_VARCHAR_LEN)
            ),
            None => quote!(shelf::database::DatabaseType::#type_tokens),
        };

        let nullable = is_ty_option(&ty_string);
        let primary_key = field.attrs.primary_key.is_some();
        let auto_increment = field.attrs.auto_increment.is_some();
        let unique = field.attrs.unique.is_some();

        if nullable && primary_key {
            return Err(syn::Error::new(ty_span, "a primary key cannot be an Option"));
        }
        if unique && primary_key {
            return Err(syn::Error::new(
                field.ident.span(),
                "a primary key is already unique",
            ));
        }
        if auto_increment {
            if !INTEGER_TYPES.contains(&base_type) {
                return Err(syn::Error::new(
                    ty_span,
                    "auto_increment can only be used on integer types",
                ));
            }
            if !primary_key && !unique {
                return Err(syn::Error::new(
                    field.ident.span(),
                    "an auto_increment column must be a primary key or unique",
                ));
            }
        }

        let has_default = field.attrs.default_raw.is_some() || field.attrs.default.is_some();
        if has_default && (primary_key || auto_increment) {
            return Err(syn::Error::new(
                field.ident.span(),
                "primary key and auto_increment columns cannot have a custom default",
            ));
        }

        let default = if let Some(default_raw) = &field.attrs.default_raw {
            quote!(Some(shelf::database::DatabaseDefault::Raw(#default_raw.to_string())))
        } else if let Some(default) = &field.attrs.default {
            match Self::lit_to_db_default(default) {
                Some(db_default) => quote!(Some(#db_default)),
                None => {
                    return Err(syn::Error::new(
                        default.span(),
                        "default not supported: use a primitive type only",
                    ))
                }
            }
        } else {
            quote!(None)
        };

        Ok(quote!(
            shelf::database::DatabaseColumn {
                name: #name.to_string(),
                ty: #ty,
                nullable: #nullable,
                default: #default,
                unique: #unique,
                primary_key: #primary_key,
                auto_increment: #auto_increment,
            }
        ))
    }

    fn lit_to_db_default(lit: &syn::Lit) -> Option<TokenStream> {
        let db_default = match lit {
            syn::Lit::Bool(b) => quote!(shelf::database::DatabaseDefault::Bool(#b)),
            syn::Lit::Float(f) => quote!(shelf::database::DatabaseDefault::Float(#f)),
            syn::Lit::Int(i) => quote!(shelf::database::DatabaseDefault::Int(#i)),
            syn::Lit::Str(s) => {
                quote!(shelf::database::DatabaseDefault::String(#s.to_string()))
            }
            _ => return None,
        };
        Some(db_default)
    }

    fn rust_to_db_type(ty: &str) -> Option<&'static str> {
        let db_type = match ty {
            // Numeric types
            "i8" | "u8" => "TinyInt",
            "i16" | "u16" => "SmallInt",
            "i32" | "u32" => "Integer",
            "i64" | "u64" => "BigInt",
            "f32" => "Float",
            "f64" => "Double",

            // Character types
            "String" | "str" => "VarChar",

            // Binary data types
            "Vec<u8>" | "[u8]" => "Blob",

            // Date/Time types
            "chrono::NaiveDateTime" | "NaiveDateTime" => "DateTime",
            "chrono::DateTime<chrono::Utc>"
            | "chrono::DateTime<Utc>"
            | "DateTime<chrono::Utc>"
            | "DateTime<Utc>" => "Timestamp",
            "chrono::NaiveDate" | "NaiveDate" => "Date",
            "chrono::NaiveTime" | "NaiveTime" => "Time",

            // Boolean type
            "bool" => "Bool",

            _ => return None,
        };

        Some(db_type)
    }
}

impl DeriveMacro for DeriveDatabaseModel {
    fn new(input: syn::DeriveInput) -> Result<Self, Error> {
        let attrs = RootAttrs::try_from_attributes(&input.attrs)?.unwrap_or_default();
        let fields = parse_struct_fields::<ItemAttrs>(input.data)?;

        let ident = input.ident;

        Ok(DeriveDatabaseModel {
            attrs,
            fields,
            ident,
        })
    }

    fn expand(&self) -> syn::Result<TokenStream> {
        let expanded_impl_database_schema = self.expand_impl_database_schema()?;

        Ok(TokenStream::from_iter([expanded_impl_database_schema]))
    }
}

pub fn expand_derive_database_model(input: syn::DeriveInput) -> syn::Result<TokenStream> {
    let ident_span = input.ident.span();

    match DeriveDatabaseModel::new(input) {
        Ok(model) => model.expand(),
        Err(Error::InputNotStruct) => Ok(quote_spanned! {
            ident_span => compile_error!("you can only derive DatabaseModel on structs with named fields");
        }),
        Err(Error::Syn(err)) => Err(err),
    }
}
