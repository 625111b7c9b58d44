//! Structured-value mapper over `toml`.
//!
//! Values go out through [`value_from`] and come back through [`to`]. Text editing uses
//! one of three layouts: an inline TOML value, a non-inline table document, or an
//! array of tables under a single key.

use crate::value::{ColorRepr, EnumValue, PrefValue, Rgba, StructType, ValueType};
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("value contains a table and has no inline form")]
    NotInline,
    #[error("no text form for {0} shaped value")]
    UnsupportedShape(&'static str),
    #[error("serializing: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("parsing: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: &'static str },
    #[error("{value} is out of range for {expected}")]
    OutOfRange { expected: String, value: String },
    #[error("'{text}' is not a value of {enum_name}")]
    UnknownEnumName { enum_name: String, text: String },
    #[error("missing key '{0}'")]
    MissingKey(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("expected a single value")]
    ExpectedSingleValue,
}

/// Generic structured form of a preference value.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredValue(toml::Value);

impl StructuredValue {
    pub fn new(value: toml::Value) -> Self {
        Self(value)
    }

    pub fn as_toml(&self) -> &toml::Value {
        &self.0
    }

    pub fn into_toml(self) -> toml::Value {
        self.0
    }

    /// Inline text of the value. Anything holding a table is refused; those go
    /// through the table serializers instead.
    pub fn serialized_value(&self) -> Result<String, MapperError> {
        if contains_table(&self.0) {
            return Err(MapperError::NotInline);
        }
        Ok(self.0.to_string())
    }

    pub fn is_table(&self) -> bool {
        self.0.is_table()
    }

    /// A non-empty array whose elements are all tables.
    pub fn is_table_array(&self) -> bool {
        match &self.0 {
            toml::Value::Array(items) => !items.is_empty() && items.iter().all(toml::Value::is_table),
            _ => false,
        }
    }

    /// `[[key]]` sections, one per element.
    pub fn serialize_table_array(&self, key: &str) -> Result<String, MapperError> {
        if !self.is_table_array() {
            return Err(MapperError::UnsupportedShape(self.0.type_str()));
        }
        let mut doc = toml::Table::new();
        doc.insert(key.to_string(), self.0.clone());
        Ok(toml::to_string_pretty(&doc)?)
    }

    /// The table written as a document body (`key = value` lines and `[sub]` sections).
    pub fn serialize_non_inline_table(&self) -> Result<String, MapperError> {
        match &self.0 {
            toml::Value::Table(table) => Ok(toml::to_string_pretty(table)?),
            other => Err(MapperError::UnsupportedShape(other.type_str())),
        }
    }
}

fn contains_table(value: &toml::Value) -> bool {
    match value {
        toml::Value::Table(_) => true,
        toml::Value::Array(items) => items.iter().any(contains_table),
        _ => false,
    }
}

pub fn value_from(value: &PrefValue) -> Result<StructuredValue, MapperError> {
    Ok(StructuredValue(toml::Value::try_from(value)?))
}

fn mismatch(expected: &ValueType, found: &toml::Value) -> MapperError {
    MapperError::TypeMismatch {
        expected: expected.to_string(),
        found: found.type_str(),
    }
}

fn number(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Float(f) => Some(*f),
        toml::Value::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

fn to_color(ty: &ValueType, repr: ColorRepr, value: &toml::Value) -> Result<Rgba, MapperError> {
    let channels: Vec<&toml::Value> = match value {
        toml::Value::Table(table) => ["r", "g", "b", "a"]
            .iter()
            .map(|k| table.get(*k).ok_or_else(|| MapperError::MissingKey(k.to_string())))
            .collect::<Result<_, _>>()?,
        toml::Value::Array(items) if items.len() == 4 => items.iter().collect(),
        other => return Err(mismatch(ty, other)),
    };

    let mut out = [0f64; 4];
    for (slot, channel) in out.iter_mut().zip(channels) {
        *slot = number(channel).ok_or_else(|| mismatch(ty, channel))?;
    }

    match repr {
        ColorRepr::Float => Ok(Rgba::Float(out.map(|v| v as f32))),
        ColorRepr::Byte => {
            if let Some(bad) = out.iter().find(|v| !(0.0..=255.0).contains(*v)) {
                return Err(MapperError::OutOfRange {
                    expected: ty.to_string(),
                    value: bad.to_string(),
                });
            }
            Ok(Rgba::Byte(out.map(|v| v.round() as u8)))
        }
    }
}

fn to_struct(
    ty: &ValueType,
    st: &StructType,
    value: &toml::Value,
) -> Result<PrefValue, MapperError> {
    let toml::Value::Table(table) = value else {
        return Err(mismatch(ty, value));
    };

    if st.open {
        let mut map = IndexMap::new();
        for (key, item) in table {
            let converted = match st.field(key) {
                Some(field_ty) => to(field_ty, item)?,
                None => infer(item).1,
            };
            map.insert(key.clone(), converted);
        }
        return Ok(PrefValue::Table(map));
    }

    if let Some(unknown) = table.keys().find(|k| st.field(k).is_none()) {
        return Err(MapperError::UnknownKey(unknown.clone()));
    }
    let mut map = IndexMap::new();
    for (key, field_ty) in &st.fields {
        let item = table
            .get(key)
            .ok_or_else(|| MapperError::MissingKey(key.clone()))?;
        map.insert(key.clone(), to(field_ty, item)?);
    }
    Ok(PrefValue::Table(map))
}

/// Converts a structured value into a native value of type `ty`.
pub fn to(ty: &ValueType, value: &toml::Value) -> Result<PrefValue, MapperError> {
    match (ty, value) {
        (ValueType::Bool, toml::Value::Boolean(b)) => Ok(PrefValue::Bool(*b)),
        (ValueType::Integer, toml::Value::Integer(i)) => Ok(PrefValue::Integer(*i)),
        (ValueType::Float, v) => number(v)
            .map(PrefValue::Float)
            .ok_or_else(|| mismatch(ty, v)),
        (ValueType::String, toml::Value::String(s)) => Ok(PrefValue::String(s.clone())),
        (ValueType::String, toml::Value::Datetime(dt)) => Ok(PrefValue::String(dt.to_string())),
        (ValueType::Color(repr), v) => to_color(ty, *repr, v).map(PrefValue::Color),
        (ValueType::Enum(enum_ty), toml::Value::String(s)) => enum_ty
            .parse(s)
            .map(|bits| PrefValue::Enum(EnumValue::new(enum_ty.clone(), bits)))
            .ok_or_else(|| MapperError::UnknownEnumName {
                enum_name: enum_ty.name().to_string(),
                text: s.clone(),
            }),
        (ValueType::Enum(enum_ty), toml::Value::Integer(bits)) => {
            Ok(PrefValue::Enum(EnumValue::new(enum_ty.clone(), *bits)))
        }
        (ValueType::Array(inner), toml::Value::Array(items)) => items
            .iter()
            .map(|item| to(inner, item))
            .collect::<Result<Vec<_>, _>>()
            .map(PrefValue::Array),
        (ValueType::Struct(st), v) => to_struct(ty, st, v),
        (_, v) => Err(mismatch(ty, v)),
    }
}

/// How a generic value is laid out as editable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextLayout {
    Inline,
    Table,
    TableArray { key: String },
}

const INLINE_KEY: &str = "value";

/// Parses text written in `layout` back into a value of type `ty`.
pub fn parse_text(ty: &ValueType, text: &str, layout: &TextLayout) -> Result<PrefValue, MapperError> {
    match layout {
        TextLayout::Inline => {
            let mut doc: toml::Table = toml::from_str(&format!("{INLINE_KEY} = {text}"))?;
            if doc.len() != 1 {
                return Err(MapperError::ExpectedSingleValue);
            }
            let value = doc
                .remove(INLINE_KEY)
                .ok_or(MapperError::ExpectedSingleValue)?;
            to(ty, &value)
        }
        TextLayout::Table => {
            let doc: toml::Table = toml::from_str(text)?;
            to(ty, &toml::Value::Table(doc))
        }
        TextLayout::TableArray { key } => {
            let mut doc: toml::Table = toml::from_str(text)?;
            if doc.is_empty() {
                return to(ty, &toml::Value::Array(Vec::new()));
            }
            if doc.len() != 1 {
                return Err(MapperError::ExpectedSingleValue);
            }
            let value = doc
                .remove(key)
                .ok_or_else(|| MapperError::MissingKey(key.clone()))?;
            to(ty, &value)
        }
    }
}

/// Types an untyped TOML value. Tables become open structs.
pub fn infer(value: &toml::Value) -> (ValueType, PrefValue) {
    match value {
        toml::Value::Boolean(b) => (ValueType::Bool, PrefValue::Bool(*b)),
        toml::Value::Integer(i) => (ValueType::Integer, PrefValue::Integer(*i)),
        toml::Value::Float(f) => (ValueType::Float, PrefValue::Float(*f)),
        toml::Value::String(s) => (ValueType::String, PrefValue::String(s.clone())),
        toml::Value::Datetime(dt) => (ValueType::String, PrefValue::String(dt.to_string())),
        toml::Value::Array(items) => {
            let inferred: Vec<(ValueType, PrefValue)> = items.iter().map(infer).collect();
            let element = inferred
                .first()
                .map_or(ValueType::String, |(ty, _)| ty.clone());
            (
                ValueType::Array(Box::new(element)),
                PrefValue::Array(inferred.into_iter().map(|(_, v)| v).collect()),
            )
        }
        toml::Value::Table(table) => {
            let mut fields = Vec::with_capacity(table.len());
            let mut map = IndexMap::with_capacity(table.len());
            for (key, item) in table {
                let (ty, v) = infer(item);
                fields.push((key.clone(), ty));
                map.insert(key.clone(), v);
            }
            (
                ValueType::Struct(Arc::new(StructType::open("table", fields))),
                PrefValue::Table(map),
            )
        }
    }
}
