//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
extern crate proc_macro;
extern crate proc_macro2;
extern crate syn;
#[macro_use]
extern crate quote;

use proc_macro::TokenStream;
use proc_macro2::{TokenStream as TokenStream2, TokenTree};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Meta, Type};

/// Derive macro for a struct that can be written directly into, and read
/// directly from, a container row.
///
/// Each named field maps to the column of the same name. The `griddb`
/// attribute renames a field's column with the `column` key:
/// ```text
/// #[derive(Default, GridRow)]
/// struct Reading {
///     #[griddb(column = ts)]
///     taken_at: DateTime<Utc>,
///     value: f64,
/// }
/// ```
///
/// Field types must implement `GridColumnToField` and `GridColumnFromField`.
/// See [`Container::put_struct()`](../griddb_rust_client/struct.Container.html#method.put_struct).
#[proc_macro_derive(GridRow, attributes(griddb))]
pub fn derive_grid_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    impl_grid_row(input)
}

// value of `column = name` in a `griddb` attribute, if any
fn column_alias(attrs: &[syn::Attribute]) -> Option<String> {
    for a in attrs {
        let l = match &a.meta {
            Meta::List(l) => l,
            _ => continue,
        };
        if !l.path.is_ident("griddb") {
            continue;
        }
        let mut is_column = false;
        for t in l.tokens.clone() {
            match t {
                TokenTree::Ident(i) => {
                    if is_column {
                        return Some(i.to_string());
                    }
                    is_column = i == "column";
                }
                TokenTree::Literal(lit) if is_column => {
                    return Some(lit.to_string().trim_matches('"').to_string());
                }
                _ => (),
            }
        }
    }
    None
}

fn impl_grid_row(input: DeriveInput) -> TokenStream {
    let name = &input.ident;

    let fields = match input.data {
        Data::Struct(d) => match d.fields {
            Fields::Named(f) => f.named,
            _ => panic!("GridRow only supports structs with named fields"),
        },
        _ => panic!("GridRow only supports Struct datatypes"),
    };

    struct Column {
        ident: syn::Ident,
        ty: Type,
        column: String,
    }

    let mut columns: Vec<Column> = Vec::new();
    for field in fields {
        let ident = match field.ident {
            Some(id) => id,
            None => panic!("Field in GridRow is missing ident"),
        };
        let column = column_alias(&field.attrs).unwrap_or_else(|| ident.to_string());
        columns.push(Column {
            ident,
            ty: field.ty,
            column,
        });
    }

    let names: Vec<&String> = columns.iter().map(|c| &c.column).collect();
    let mut tbody = TokenStream2::default();
    let mut fbody = TokenStream2::default();
    for (i, c) in columns.iter().enumerate() {
        let ident = &c.ident;
        let ty = &c.ty;
        tbody.extend(quote! {
            row.put(&self.#ident);
        });
        fbody.extend(quote! {
            self.#ident = <#ty as ::griddb_rust_client::GridColumnFromField>::from_field(
                row.get(#i).unwrap_or(&::griddb_rust_client::Field::Null),
            )?;
        });
    }
    let count = columns.len();

    let expanded = quote! {
        impl ::griddb_rust_client::GridRow for #name {
            fn column_names() -> Vec<&'static str> {
                vec![#(#names),*]
            }

            fn to_row(&self) -> Result<::griddb_rust_client::Row, ::griddb_rust_client::GridError> {
                let mut row = ::griddb_rust_client::Row::new();
                #tbody
                Ok(row)
            }

            fn from_row(&mut self, row: &::griddb_rust_client::Row) -> Result<(), ::griddb_rust_client::GridError> {
                if row.len() != #count {
                    return Err(::griddb_rust_client::GridError::new(
                        ::griddb_rust_client::GridErrorCode::ColumnCountMismatch,
                        &format!("row has {} fields, {} has {}", row.len(), stringify!(#name), #count),
                    ));
                }
                #fbody
                Ok(())
            }
        }
    };

    TokenStream::from(expanded)
}
