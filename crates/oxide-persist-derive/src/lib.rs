//! Derive macro for storable types.
//!
//! This crate provides the `#[derive(Storable)]` macro, which generates the
//! static schema descriptor and the record conversions the conversion
//! engine in `oxide-persist-core` works from.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, ExprUnary, Fields, Ident, Lit,
    LitStr, Meta, Path, Type, UnOp,
};

/// Derives `Persist` and `Storable` for a struct with named fields.
///
/// # Attributes
///
/// - `#[table(name = "table_name")]` - Specifies the SQL table name (optional,
///   defaults to snake_case of struct name)
///
/// # Field Attributes
///
/// - `#[column(primary_key)]` - Marks the field as part of the primary key
/// - `#[column(name = "column_name")]` - Specifies the column name
/// - `#[column(unique)]` - Marks the column as UNIQUE
/// - `#[column(not_null)]` - Declares NOT NULL explicitly
/// - `#[column(default = 0)]` - Sets a literal default (integer, float,
///   string or boolean)
/// - `#[column(sql_type = "string64")]` - Overrides the column type
/// - `#[column(embedded)]` - Flattens a nested storable type into this table
/// - `#[column(references)]`, `#[column(references = "column")]` - Stores a
///   nested storable type as a foreign key to its table
/// - `#[column(on_delete = "cascade")]`, `#[column(on_update = "restrict")]` -
///   Referential actions of a reference
/// - `#[column(check = path::to::fn)]` - Adds a CHECK built by a
///   `fn(&ColumnName) -> BooleanExpr`
///
/// Nested storable types without `references` are embedded.
#[proc_macro_derive(Storable, attributes(table, column))]
pub fn derive_storable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_storable_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_storable_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let type_name = struct_name.to_string();
    let table_name = get_table_name(&input.attrs, struct_name)?;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Storable derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Storable derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Storable derive only supports structs",
            ));
        }
    };

    let mut members = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let attrs = parse_column_attrs(&field.attrs)?;
        members.push(MemberInfo {
            field_name,
            field_type: field.ty.clone(),
            attrs,
        });
    }

    let core = quote!(::oxide_persist_core);
    let member_exprs: Vec<TokenStream2> = members.iter().map(|m| member_expr(m, &core)).collect();
    let field_names: Vec<&Ident> = members.iter().map(|m| &m.field_name).collect();
    let field_types: Vec<&Type> = members.iter().map(|m| &m.field_type).collect();

    let expanded = quote! {
        impl #core::schema::Persist for #struct_name {
            fn member_type() -> #core::schema::MemberType {
                #core::schema::MemberType::Composite(
                    <Self as #core::schema::Storable>::descriptor,
                )
            }

            fn null_datum() -> #core::schema::Datum {
                #core::schema::Datum::Record(None)
            }

            fn to_datum(&self) -> #core::schema::Datum {
                #core::schema::Datum::Record(Some(
                    <Self as #core::schema::Storable>::to_record(self),
                ))
            }

            fn from_datum(datum: #core::schema::Datum) -> #core::error::Result<Self> {
                match datum {
                    #core::schema::Datum::Record(Some(record)) => {
                        <Self as #core::schema::Storable>::from_record(record)
                    }
                    #core::schema::Datum::Record(None) => Err(
                        #core::error::PersistError::UnexpectedNull(
                            ::std::string::String::from(#type_name),
                        ),
                    ),
                    other => Err(#core::error::PersistError::UnsupportedOperation(
                        ::std::format!("{} cannot be read from {}", #type_name, other.kind()),
                    )),
                }
            }
        }

        impl #core::schema::Storable for #struct_name {
            fn descriptor() -> #core::schema::TypeDescriptor {
                #core::schema::TypeDescriptor::new::<Self>(
                    #type_name,
                    #table_name,
                    ::std::vec![#(#member_exprs),*],
                )
            }

            fn to_record(&self) -> #core::schema::Record {
                #core::schema::Record::new(::std::vec![
                    #(#core::schema::Persist::to_datum(&self.#field_names)),*
                ])
            }

            fn from_record(record: #core::schema::Record) -> #core::error::Result<Self> {
                #[allow(unused_mut)]
                let mut reader = record.reader();
                Ok(Self {
                    #(#field_names: reader.read::<#field_types>()?),*
                })
            }
        }
    };

    Ok(expanded)
}

fn member_expr(member: &MemberInfo, core: &TokenStream2) -> TokenStream2 {
    let field_name = member.field_name.to_string();
    let field_type = &member.field_type;
    let attrs = &member.attrs;

    let mut expr = quote! {
        #core::schema::Member::of::<#field_type>(#field_name)
    };
    if let Some(name) = &attrs.name {
        expr = quote!(#expr.column(#name));
    }
    if let Some(sql_type) = &attrs.sql_type {
        expr = quote!(#expr.sql_type(#core::ast::SqlType::#sql_type));
    }

    let mut annotations = Vec::new();
    if attrs.primary_key {
        annotations.push(quote!(#core::schema::Annotation::PrimaryKey));
    }
    if attrs.not_null {
        annotations.push(quote!(#core::schema::Annotation::NotNull));
    }
    if attrs.unique {
        annotations.push(quote!(#core::schema::Annotation::Unique));
    }
    if let Some(default) = &attrs.default {
        annotations.push(quote!(#core::schema::Annotation::Default(#default)));
    }
    if attrs.embedded {
        annotations.push(quote!(#core::schema::Annotation::Embedded));
    }
    if let Some(reference) = &attrs.references {
        let column = match &reference.column {
            Some(column) => quote!(Some(#column)),
            None => quote!(None),
        };
        let action = |action: &Option<Ident>| match action {
            Some(action) => quote!(Some(#core::ast::ForeignKeyAction::#action)),
            None => quote!(None),
        };
        let on_delete = action(&reference.on_delete);
        let on_update = action(&reference.on_update);
        annotations.push(quote! {
            #core::schema::Annotation::References {
                column: #column,
                on_delete: #on_delete,
                on_update: #on_update,
            }
        });
    }
    if let Some(check) = &attrs.check {
        annotations.push(quote!(#core::schema::Annotation::Check(#check)));
    }

    quote!(#expr #(.annotate(#annotations))*)
}

struct MemberInfo {
    field_name: Ident,
    field_type: Type,
    attrs: ColumnAttrs,
}

#[derive(Default)]
struct ReferenceAttrs {
    column: Option<String>,
    on_delete: Option<Ident>,
    on_update: Option<Ident>,
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    primary_key: bool,
    not_null: bool,
    unique: bool,
    embedded: bool,
    sql_type: Option<Ident>,
    default: Option<TokenStream2>,
    references: Option<ReferenceAttrs>,
    check: Option<Path>,
}

fn get_table_name(attrs: &[Attribute], struct_name: &Ident) -> syn::Result<String> {
    for attr in attrs {
        if attr.path().is_ident("table") {
            let mut table_name = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    table_name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported table attribute"))
                }
            })?;
            if let Some(name) = table_name {
                return Ok(name);
            }
        }
    }
    // Default to snake_case of struct name
    Ok(to_snake_case(&struct_name.to_string()))
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("column") {
            // Handle empty attribute like #[column]
            if matches!(attr.meta, Meta::Path(_)) {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    result.primary_key = true;
                } else if meta.path.is_ident("not_null") {
                    result.not_null = true;
                } else if meta.path.is_ident("unique") {
                    result.unique = true;
                } else if meta.path.is_ident("embedded") {
                    result.embedded = true;
                } else if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else if meta.path.is_ident("sql_type") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.sql_type = Some(sql_type_variant(&value)?);
                } else if meta.path.is_ident("default") {
                    let value: Expr = meta.value()?.parse()?;
                    result.default = Some(default_literal(&value)?);
                } else if meta.path.is_ident("references") {
                    let reference = result.references.get_or_insert_with(Default::default);
                    if meta.input.peek(syn::Token![=]) {
                        let value: LitStr = meta.value()?.parse()?;
                        reference.column = Some(value.value());
                    }
                } else if meta.path.is_ident("on_delete") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.references.get_or_insert_with(Default::default).on_delete =
                        Some(action_variant(&value)?);
                } else if meta.path.is_ident("on_update") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.references.get_or_insert_with(Default::default).on_update =
                        Some(action_variant(&value)?);
                } else if meta.path.is_ident("check") {
                    result.check = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error("unsupported column attribute"));
                }
                Ok(())
            })?;
        }
    }

    Ok(result)
}

fn sql_type_variant(value: &LitStr) -> syn::Result<Ident> {
    let variant = match value.value().to_ascii_lowercase().as_str() {
        "boolean" => "Boolean",
        "integer08" => "Integer08",
        "integer16" => "Integer16",
        "integer32" => "Integer32",
        "integer64" => "Integer64",
        "integer" => "Integer",
        "decimal32" => "Decimal32",
        "decimal64" => "Decimal64",
        "string01" => "String01",
        "string64" => "String64",
        "string" => "String",
        "binary128" => "Binary128",
        "binary256" => "Binary256",
        "binary" => "Binary",
        _ => return Err(syn::Error::new_spanned(value, "unknown SQL type")),
    };
    Ok(Ident::new(variant, Span::call_site()))
}

fn action_variant(value: &LitStr) -> syn::Result<Ident> {
    let variant = match value.value().to_ascii_lowercase().replace(' ', "_").as_str() {
        "no_action" => "NoAction",
        "restrict" => "Restrict",
        "cascade" => "Cascade",
        "set_null" => "SetNull",
        "set_default" => "SetDefault",
        _ => return Err(syn::Error::new_spanned(value, "unknown referential action")),
    };
    Ok(format_ident!("{}", variant))
}

fn default_literal(value: &Expr) -> syn::Result<TokenStream2> {
    let literal = quote!(::oxide_persist_core::ast::Literal);
    match value {
        Expr::Lit(ExprLit { lit, .. }) => match lit {
            Lit::Int(i) => {
                let v: i64 = i.base10_parse()?;
                Ok(quote!(#literal::Integer(#v)))
            }
            Lit::Float(f) => {
                let v: f64 = f.base10_parse()?;
                Ok(quote!(#literal::Float(#v)))
            }
            Lit::Str(s) => Ok(quote!(#literal::String(::std::string::String::from(#s)))),
            Lit::Bool(b) => Ok(quote!(#literal::Boolean(#b))),
            other => Err(syn::Error::new_spanned(other, "unsupported default literal")),
        },
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => match expr.as_ref() {
            Expr::Lit(ExprLit {
                lit: Lit::Int(i), ..
            }) => {
                let v: i64 = i.base10_parse::<i64>()?.checked_neg().ok_or_else(|| {
                    syn::Error::new_spanned(i, "default out of range")
                })?;
                Ok(quote!(#literal::Integer(#v)))
            }
            Expr::Lit(ExprLit {
                lit: Lit::Float(f), ..
            }) => {
                let v: f64 = -f.base10_parse::<f64>()?;
                Ok(quote!(#literal::Float(#v)))
            }
            _ => Err(syn::Error::new_spanned(value, "unsupported default literal")),
        },
        Expr::Path(path) if path.path.is_ident("NULL") => Ok(quote!(#literal::Null)),
        _ => Err(syn::Error::new_spanned(value, "unsupported default literal")),
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
