//! Parsing of `#[entity(...)]` and `#[column(...)]` attributes.

use syn::{Attribute, DeriveInput, Field, Fields, Ident, LitStr, Type};

/// Struct-level `#[entity(table = "...", key = "...")]`.
#[derive(Default)]
pub struct EntityAttrs {
    pub table: Option<String>,
    pub key: Option<String>,
}

/// Field-level `#[column(...)]` flags.
#[derive(Default)]
pub struct ColumnAttrs {
    pub name: Option<String>,
    pub skip: bool,
    pub generated: bool,
    pub key: bool,
}

pub struct ColumnField {
    pub ident: Ident,
    pub ty: Type,
    pub column: String,
    pub attrs: ColumnAttrs,
}

pub fn parse_entity_attrs(attrs: &[Attribute]) -> syn::Result<EntityAttrs> {
    let mut out = EntityAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                out.table = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("key") {
                let lit: LitStr = meta.value()?.parse()?;
                out.key = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("expected `table = \"...\"` or `key = \"...\"` in #[entity(...)]"))
            }
        })?;
    }
    Ok(out)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut out = ColumnAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("column")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                out.name = Some(lit.value());
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("generated") {
                out.generated = true;
            } else if meta.path.is_ident("key") {
                out.key = true;
            } else {
                return Err(meta.error(
                    "expected one of `name = \"...\"`, `skip`, `generated`, `key` in #[column(...)]",
                ));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Named fields of `input` with their resolved column names.
pub fn column_fields(input: &DeriveInput, derive: &str) -> syn::Result<Vec<ColumnField>> {
    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    format!("#[derive({derive})] only works on structs with named fields"),
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                format!("#[derive({derive})] only works on structs with named fields"),
            ))
        }
    };
    fields.iter().map(column_field).collect()
}

fn column_field(field: &Field) -> syn::Result<ColumnField> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
    let attrs = parse_column_attrs(&field.attrs)?;
    if attrs.skip && (attrs.generated || attrs.key || attrs.name.is_some()) {
        return Err(syn::Error::new_spanned(
            &ident,
            "#[column(skip)] cannot be combined with other column options",
        ));
    }
    let column = attrs
        .name
        .clone()
        .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
    Ok(ColumnField {
        ident,
        ty: field.ty.clone(),
        column,
        attrs,
    })
}

/// `UserProfile` → `user_profile`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if i > 0 && (prev_lower || (next_lower && chars[i - 1].is_uppercase())) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
