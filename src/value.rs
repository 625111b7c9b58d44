use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::{fmt, sync::Arc};
use thiserror::Error;

/// Errors raised while reflecting over an enum declaration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("enum {enum_name}: '{variant}' = {raw} does not fit the underlying {repr:?}")]
    OutOfRange {
        enum_name: String,
        variant: String,
        raw: i128,
        repr: IntRepr,
    },
    #[error("enum {enum_name}: '{variant}' = {raw} cannot be represented as i64")]
    NotI64 {
        enum_name: String,
        variant: String,
        raw: i128,
    },
}

/// Underlying integral representation of an enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntRepr {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

impl IntRepr {
    fn bounds(self) -> (i128, i128) {
        match self {
            IntRepr::I8 => (i8::MIN.into(), i8::MAX.into()),
            IntRepr::U8 => (0, u8::MAX.into()),
            IntRepr::I16 => (i16::MIN.into(), i16::MAX.into()),
            IntRepr::U16 => (0, u16::MAX.into()),
            IntRepr::I32 => (i32::MIN.into(), i32::MAX.into()),
            IntRepr::U32 => (0, u32::MAX.into()),
            IntRepr::I64 => (i64::MIN.into(), i64::MAX.into()),
            IntRepr::U64 => (0, u64::MAX.into()),
        }
    }
}

/// A named enum type with its declared `(name, raw value)` pairs.
/// Several names may share one value (aliases); the first declared name wins for display.
#[derive(Debug)]
pub struct EnumType {
    name: String,
    flags: bool,
    repr: IntRepr,
    declared: Vec<(String, i128)>,
}

impl EnumType {
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        repr: IntRepr,
        declared: impl IntoIterator<Item = (N, i128)>,
    ) -> Self {
        Self {
            name: name.into(),
            flags: false,
            repr,
            declared: declared.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }

    /// Same as [`EnumType::new`] but marks the type as a bit-flags enum.
    pub fn flags<N: Into<String>>(
        name: impl Into<String>,
        repr: IntRepr,
        declared: impl IntoIterator<Item = (N, i128)>,
    ) -> Self {
        Self {
            flags: true,
            ..Self::new(name, repr, declared)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_flags(&self) -> bool {
        self.flags
    }

    pub fn repr(&self) -> IntRepr {
        self.repr
    }

    pub fn declared(&self) -> &[(String, i128)] {
        &self.declared
    }

    /// Converts a declared raw value into the stable i64 identity used by editors.
    pub fn to_bits(&self, variant: &str, raw: i128) -> Result<i64, ValueError> {
        let (min, max) = self.repr.bounds();
        if raw < min || raw > max {
            return Err(ValueError::OutOfRange {
                enum_name: self.name.clone(),
                variant: variant.to_string(),
                raw,
                repr: self.repr,
            });
        }
        i64::try_from(raw).map_err(|_| ValueError::NotI64 {
            enum_name: self.name.clone(),
            variant: variant.to_string(),
            raw,
        })
    }

    /// First declared name whose value equals `bits`.
    pub fn name_of(&self, bits: i64) -> Option<&str> {
        self.declared
            .iter()
            .find(|(name, raw)| self.to_bits(name, *raw).ok() == Some(bits))
            .map(|(name, _)| name.as_str())
    }

    fn bits_of(&self, name: &str) -> Option<i64> {
        self.declared
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(n, raw)| self.to_bits(n, *raw).ok())
    }

    /// Name for `bits`, or for flags a ", "-joined list of the set flags.
    /// `None` when the value cannot be described by names.
    pub fn describe(&self, bits: i64) -> Option<String> {
        if let Some(name) = self.name_of(bits) {
            return Some(name.to_string());
        }
        if !self.flags {
            return None;
        }

        let mut remaining = bits;
        let mut names = Vec::new();
        for (name, raw) in &self.declared {
            let Ok(flag) = self.to_bits(name, *raw) else {
                continue;
            };
            if flag == 0 || flag == -1 || bits & flag != flag {
                continue;
            }
            if names.contains(&name.as_str()) {
                continue;
            }
            names.push(name.as_str());
            remaining &= !flag;
        }
        (remaining == 0 && !names.is_empty()).then(|| names.join(", "))
    }

    pub fn format(&self, bits: i64) -> String {
        self.describe(bits).unwrap_or_else(|| bits.to_string())
    }

    /// Inverse of [`EnumType::format`]. Accepts names, ", "-joined flag names and integers.
    pub fn parse(&self, text: &str) -> Option<i64> {
        let text = text.trim();
        if let Ok(bits) = text.parse::<i64>() {
            return Some(bits);
        }
        if !self.flags {
            return self.bits_of(text);
        }
        text.split(',')
            .map(str::trim)
            .try_fold(0i64, |acc, name| self.bits_of(name).map(|b| acc | b))
    }
}

// Enum types are nominal.
impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.flags == other.flags
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub ty: Arc<EnumType>,
    pub bits: i64,
}

impl EnumValue {
    pub fn new(ty: Arc<EnumType>, bits: i64) -> Self {
        Self { ty, bits }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ty.format(self.bits))
    }
}

/// Storage layout of a colour value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorRepr {
    /// Normalized channels in `[0, 1]`.
    Float,
    /// Byte channels in `[0, 255]`.
    Byte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorChannel {
    R,
    G,
    B,
    A,
}

impl ColorChannel {
    pub const ALL: [ColorChannel; 4] = [
        ColorChannel::R,
        ColorChannel::G,
        ColorChannel::B,
        ColorChannel::A,
    ];

    pub fn index(self) -> usize {
        match self {
            ColorChannel::R => 0,
            ColorChannel::G => 1,
            ColorChannel::B => 2,
            ColorChannel::A => 3,
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            ColorChannel::R => "r",
            ColorChannel::G => "g",
            ColorChannel::B => "b",
            ColorChannel::A => "a",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColorChannel::R => "R",
            ColorChannel::G => "G",
            ColorChannel::B => "B",
            ColorChannel::A => "A",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Rgba {
    Float([f32; 4]),
    Byte([u8; 4]),
}

// Float channels compare by bit pattern so a NaN channel still equals itself.
impl PartialEq for Rgba {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Rgba::Float(a), Rgba::Float(b)) => a.map(f32::to_bits) == b.map(f32::to_bits),
            (Rgba::Byte(a), Rgba::Byte(b)) => a == b,
            _ => false,
        }
    }
}

impl Rgba {
    pub fn zero(repr: ColorRepr) -> Self {
        match repr {
            ColorRepr::Float => Rgba::Float([0.0; 4]),
            ColorRepr::Byte => Rgba::Byte([0; 4]),
        }
    }

    pub fn repr(&self) -> ColorRepr {
        match self {
            Rgba::Float(_) => ColorRepr::Float,
            Rgba::Byte(_) => ColorRepr::Byte,
        }
    }

    pub fn channel(&self, channel: ColorChannel) -> f32 {
        match self {
            Rgba::Float(c) => c[channel.index()],
            Rgba::Byte(c) => f32::from(c[channel.index()]),
        }
    }

    /// Returns a copy with one channel replaced; the value is clamped to the channel range.
    pub fn with_channel(self, channel: ColorChannel, value: f32) -> Self {
        match self {
            Rgba::Float(mut c) => {
                c[channel.index()] = value.clamp(0.0, 1.0);
                Rgba::Float(c)
            }
            Rgba::Byte(mut c) => {
                c[channel.index()] = value.round().clamp(0.0, 255.0) as u8;
                Rgba::Byte(c)
            }
        }
    }

    pub fn to_srgba_bytes(&self) -> [u8; 4] {
        match self {
            Rgba::Byte(c) => *c,
            Rgba::Float(c) => c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8),
        }
    }
}

/// Declared shape of a struct-like value (a TOML table with known keys).
/// An open struct accepts any keys and types them from the data.
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<(String, ValueType)>,
    pub open: bool,
}

impl StructType {
    pub fn new<K: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (K, ValueType)>,
    ) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
            open: false,
        }
    }

    pub fn open<K: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (K, ValueType)>,
    ) -> Self {
        Self {
            open: true,
            ..Self::new(name, fields)
        }
    }

    pub fn field(&self, key: &str) -> Option<&ValueType> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }
}

/// Declared or runtime type of a preference value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    Bool,
    Integer,
    Float,
    String,
    Color(ColorRepr),
    Enum(Arc<EnumType>),
    Array(Box<ValueType>),
    Struct(Arc<StructType>),
}

impl ValueType {
    pub fn is_flags_enum(&self) -> bool {
        matches!(self, ValueType::Enum(ty) if ty.is_flags())
    }

    /// Type-appropriate placeholder for an absent value: empty string, empty array,
    /// otherwise a zero-initialized instance.
    pub fn empty_instance(&self) -> PrefValue {
        match self {
            ValueType::Bool => PrefValue::Bool(false),
            ValueType::Integer => PrefValue::Integer(0),
            ValueType::Float => PrefValue::Float(0.0),
            ValueType::String => PrefValue::String(String::new()),
            ValueType::Color(repr) => PrefValue::Color(Rgba::zero(*repr)),
            ValueType::Enum(ty) => PrefValue::Enum(EnumValue::new(ty.clone(), 0)),
            ValueType::Array(_) => PrefValue::Array(Vec::new()),
            ValueType::Struct(st) => PrefValue::Table(
                st.fields
                    .iter()
                    .map(|(k, t)| (k.clone(), t.empty_instance()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("bool"),
            ValueType::Integer => f.write_str("i64"),
            ValueType::Float => f.write_str("f64"),
            ValueType::String => f.write_str("string"),
            ValueType::Color(ColorRepr::Float) => f.write_str("Color"),
            ValueType::Color(ColorRepr::Byte) => f.write_str("Color32"),
            ValueType::Enum(ty) => f.write_str(ty.name()),
            ValueType::Array(inner) => write!(f, "{inner}[]"),
            ValueType::Struct(st) => f.write_str(&st.name),
        }
    }
}

/// A preference value of dynamic type.
#[derive(Debug, Clone)]
pub enum PrefValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Color(Rgba),
    Enum(EnumValue),
    Array(Vec<PrefValue>),
    Table(IndexMap<String, PrefValue>),
}

/// Floats compare by bit pattern: `NaN == NaN`, and `0.0 != -0.0` since they are
/// written differently. Dirty tracking relies on every value equalling its own clone.
impl PartialEq for PrefValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PrefValue::Bool(a), PrefValue::Bool(b)) => a == b,
            (PrefValue::Integer(a), PrefValue::Integer(b)) => a == b,
            (PrefValue::Float(a), PrefValue::Float(b)) => a.to_bits() == b.to_bits(),
            (PrefValue::String(a), PrefValue::String(b)) => a == b,
            (PrefValue::Color(a), PrefValue::Color(b)) => a == b,
            (PrefValue::Enum(a), PrefValue::Enum(b)) => a == b,
            (PrefValue::Array(a), PrefValue::Array(b)) => a == b,
            (PrefValue::Table(a), PrefValue::Table(b)) => a == b,
            _ => false,
        }
    }
}

impl PrefValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PrefValue::Float(v) => Some(*v),
            PrefValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PrefValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            PrefValue::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            PrefValue::Bool(_) => "bool",
            PrefValue::Integer(_) => "integer",
            PrefValue::Float(_) => "float",
            PrefValue::String(_) => "string",
            PrefValue::Color(_) => "color",
            PrefValue::Enum(_) => "enum",
            PrefValue::Array(_) => "array",
            PrefValue::Table(_) => "table",
        }
    }

    /// Actual type of this value. Arrays and tables carry no element type of their own,
    /// so a matching declared type is reused; otherwise the shape is inferred.
    pub fn runtime_type(&self, declared: &ValueType) -> ValueType {
        match self {
            PrefValue::Bool(_) => ValueType::Bool,
            PrefValue::Integer(_) => ValueType::Integer,
            PrefValue::Float(_) => ValueType::Float,
            PrefValue::String(_) => ValueType::String,
            PrefValue::Color(c) => ValueType::Color(c.repr()),
            PrefValue::Enum(e) => ValueType::Enum(e.ty.clone()),
            PrefValue::Array(items) => match declared {
                ValueType::Array(_) => declared.clone(),
                _ => ValueType::Array(Box::new(
                    items
                        .first()
                        .map_or(ValueType::String, |v| v.runtime_type(&ValueType::String)),
                )),
            },
            PrefValue::Table(map) => match declared {
                ValueType::Struct(_) => declared.clone(),
                _ => ValueType::Struct(Arc::new(StructType::open(
                    "table",
                    map.iter()
                        .map(|(k, v)| (k.clone(), v.runtime_type(&ValueType::String))),
                ))),
            },
        }
    }
}

struct ChannelMap<'a>(&'a Rgba);

impl Serialize for ChannelMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        for channel in ColorChannel::ALL {
            match self.0 {
                Rgba::Float(c) => map.serialize_entry(channel.field_name(), &c[channel.index()])?,
                Rgba::Byte(c) => map.serialize_entry(channel.field_name(), &c[channel.index()])?,
            }
        }
        map.end()
    }
}

impl Serialize for PrefValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PrefValue::Bool(v) => serializer.serialize_bool(*v),
            PrefValue::Integer(v) => serializer.serialize_i64(*v),
            PrefValue::Float(v) => serializer.serialize_f64(*v),
            PrefValue::String(s) => serializer.serialize_str(s),
            PrefValue::Color(c) => ChannelMap(c).serialize(serializer),
            PrefValue::Enum(e) => match e.ty.describe(e.bits) {
                Some(name) => serializer.serialize_str(&name),
                None => serializer.serialize_i64(e.bits),
            },
            PrefValue::Array(values) => values.serialize(serializer),
            PrefValue::Table(map) => map.serialize(serializer),
        }
    }
}
