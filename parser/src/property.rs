//! Self-describing named properties.
//!
//! The header carries a list of properties, each tagged with the name of its
//! type. Lists have no count prefix; they end at the first entry named
//! [`SENTINEL`](crate::text::SENTINEL).

use std::fmt;
use std::str::FromStr;

use kinded::Kinded;
use nom::combinator::map;
use nom::multi::count;
use nom::number::complete::{le_f32, le_i32, le_i64, le_u8};
use nom::sequence::pair;
use serde::Serialize;
use strum_macros::{Display, EnumString, IntoStaticStr};
use tracing::{debug, trace};
use variantly::Variantly;

use crate::error::{ErrorKind, IResult, failure};
use crate::text::{parse_list_entry_name, parse_long_string};
use crate::types::parse_count;

/// The closed set of type tags a property may carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, IntoStaticStr, Display,
)]
pub enum PropertyType {
    #[strum(serialize = "ArrayProperty")]
    #[serde(rename = "ArrayProperty")]
    Array,
    #[strum(serialize = "IntProperty")]
    #[serde(rename = "IntProperty")]
    Int,
    #[strum(serialize = "StrProperty")]
    #[serde(rename = "StrProperty")]
    Str,
    #[strum(serialize = "NameProperty")]
    #[serde(rename = "NameProperty")]
    Name,
    #[strum(serialize = "FloatProperty")]
    #[serde(rename = "FloatProperty")]
    Float,
    #[strum(serialize = "ByteProperty")]
    #[serde(rename = "ByteProperty")]
    Byte,
    #[strum(serialize = "BoolProperty")]
    #[serde(rename = "BoolProperty")]
    Bool,
    #[strum(serialize = "QWordProperty")]
    #[serde(rename = "QWordProperty")]
    QWord,
}

impl PropertyType {
    /// The wire tag, e.g. `"IntProperty"`.
    pub fn tag(self) -> &'static str {
        self.into()
    }

    /// Which value arm a property with this tag decodes into.
    pub fn value_kind(self) -> PropertyValueKind {
        match self {
            PropertyType::Array => PropertyValueKind::Array,
            PropertyType::Int => PropertyValueKind::Int,
            PropertyType::Str | PropertyType::Name => PropertyValueKind::Str,
            PropertyType::Float => PropertyValueKind::Float,
            PropertyType::Byte => PropertyValueKind::BytePair,
            PropertyType::Bool => PropertyValueKind::Bool,
            PropertyType::QWord => PropertyValueKind::Long,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Kinded, Variantly)]
#[kinded(derive(Serialize))]
pub enum PropertyValue {
    /// One inner list of named properties per array element.
    Array(Vec<Vec<Property>>),
    Int(i32),
    /// Shared by `StrProperty` and `NameProperty`.
    Str(String),
    Float(f32),
    /// Enum-like pair of (type name, value).
    BytePair(String, String),
    /// Raw byte; normally 0 or 1, but not checked.
    Bool(u8),
    Long(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    name: String,
    #[serde(rename = "type")]
    typ: PropertyType,
    declared_length: i32,
    reserved: i32,
    value: PropertyValue,
    /// Bytes the payload actually spanned.
    #[serde(skip)]
    payload_size: usize,
}

/// A property whose declared length disagrees with the bytes its payload took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LengthMismatch {
    pub name: String,
    pub typ: PropertyType,
    pub declared: i32,
    pub actual: usize,
}

impl Property {
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    pub fn property_type(&self) -> PropertyType {
        self.typ
    }

    pub fn type_tag(&self) -> &'static str {
        self.typ.tag()
    }

    pub fn declared_length(&self) -> i32 {
        self.declared_length
    }

    /// Second length-like field of the property header. Its meaning is
    /// unknown; it is kept verbatim.
    pub fn reserved(&self) -> i32 {
        self.reserved
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub fn into_value(self) -> PropertyValue {
        self.value
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Whether this property has the given name and type tag.
    pub fn is(&self, name: &str, typ: PropertyType) -> bool {
        self.typ == typ && self.name == name
    }

    fn wrong_type(&self, expected: PropertyValueKind) -> ErrorKind {
        ErrorKind::WrongPropertyType {
            name: self.name.clone(),
            expected,
            found: self.value.kind(),
        }
    }

    pub fn as_array(&self) -> Result<&[Vec<Property>], ErrorKind> {
        self.value
            .array_ref()
            .map(Vec::as_slice)
            .ok_or_else(|| self.wrong_type(PropertyValueKind::Array))
    }

    pub fn as_int(&self) -> Result<i32, ErrorKind> {
        self.value
            .int_ref()
            .copied()
            .ok_or_else(|| self.wrong_type(PropertyValueKind::Int))
    }

    pub fn as_str(&self) -> Result<&str, ErrorKind> {
        self.value
            .str_ref()
            .map(String::as_str)
            .ok_or_else(|| self.wrong_type(PropertyValueKind::Str))
    }

    pub fn as_float(&self) -> Result<f32, ErrorKind> {
        self.value
            .float_ref()
            .copied()
            .ok_or_else(|| self.wrong_type(PropertyValueKind::Float))
    }

    /// Returns `(type name, value)`.
    pub fn as_byte_pair(&self) -> Result<(&str, &str), ErrorKind> {
        self.value
            .byte_pair_ref()
            .map(|(typ, value)| (typ.as_str(), value.as_str()))
            .ok_or_else(|| self.wrong_type(PropertyValueKind::BytePair))
    }

    pub fn as_bool(&self) -> Result<u8, ErrorKind> {
        self.value
            .bool_ref()
            .copied()
            .ok_or_else(|| self.wrong_type(PropertyValueKind::Bool))
    }

    pub fn as_long(&self) -> Result<i64, ErrorKind> {
        self.value
            .long_ref()
            .copied()
            .ok_or_else(|| self.wrong_type(PropertyValueKind::Long))
    }

    /// Children of every array element, in stream order. Empty for
    /// non-array properties.
    pub fn array_children(&self) -> impl Iterator<Item = &Property> {
        let elements: &[Vec<Property>] = match &self.value {
            PropertyValue::Array(elements) => elements,
            _ => &[],
        };
        elements.iter().flatten()
    }

    pub fn length_mismatch(&self) -> Option<LengthMismatch> {
        // Booleans declare zero bytes but are followed by one.
        if self.typ == PropertyType::Bool {
            return None;
        }
        if usize::try_from(self.declared_length) == Ok(self.payload_size) {
            return None;
        }
        Some(LengthMismatch {
            name: self.name.clone(),
            typ: self.typ,
            declared: self.declared_length,
            actual: self.payload_size,
        })
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = depth * 2;
        write!(f, "{:indent$}{}: {}", "", self.name, self.type_tag())?;
        match &self.value {
            PropertyValue::Array(elements) => {
                writeln!(f, " [{}]", elements.len())?;
                for (idx, element) in elements.iter().enumerate() {
                    writeln!(f, "{:width$}[{idx}]", "", width = indent + 2)?;
                    for child in element {
                        child.fmt_indented(f, depth + 2)?;
                    }
                }
                Ok(())
            }
            PropertyValue::Int(v) => writeln!(f, " = {v}"),
            PropertyValue::Str(v) => writeln!(f, " = {v:?}"),
            PropertyValue::Float(v) => writeln!(f, " = {v}"),
            PropertyValue::BytePair(typ, value) => writeln!(f, " = {typ}::{value}"),
            PropertyValue::Bool(v) => writeln!(f, " = {v}"),
            PropertyValue::Long(v) => writeln!(f, " = {v}"),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// First property in `properties` with the given name and type tag.
pub fn find_property<'a>(
    properties: &'a [Property],
    name: &str,
    typ: PropertyType,
) -> Option<&'a Property> {
    properties.iter().find(|p| p.is(name, typ))
}

/// Every length mismatch in `properties` and their array children.
pub fn length_mismatches(properties: &[Property]) -> Vec<LengthMismatch> {
    let mut out = Vec::new();
    let mut stack: Vec<&Property> = properties.iter().rev().collect();
    while let Some(property) = stack.pop() {
        out.extend(property.length_mismatch());
        let children: Vec<&Property> = property.array_children().collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

/// Deepest array element list accepted below a top-level property list.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parses one property. When `name` is `None` the name is read from the
/// stream first.
pub fn parse_property(i: &[u8], name: Option<String>) -> IResult<&[u8], Property> {
    parse_nested_property(i, name, 0)
}

fn parse_nested_property(
    i: &[u8],
    name: Option<String>,
    depth: usize,
) -> IResult<&[u8], Property> {
    let (i, name) = match name {
        Some(name) => (i, name),
        None => parse_long_string(i)?,
    };
    let (i, tag) = parse_long_string(i)?;
    let (i, declared_length) = le_i32(i)?;
    let (i, reserved) = le_i32(i)?;
    let typ = PropertyType::from_str(&tag)
        .map_err(|_| failure(ErrorKind::UnknownPropertyType { tag }))?;

    let payload = i;
    let (i, value) = parse_value(i, typ, depth)?;
    let property = Property {
        name,
        typ,
        declared_length,
        reserved,
        value,
        payload_size: payload.len() - i.len(),
    };

    trace!(name = property.name(), tag = property.type_tag(), "parsed property");
    if let Some(mismatch) = property.length_mismatch() {
        debug!(
            name = %mismatch.name,
            declared = mismatch.declared,
            actual = mismatch.actual,
            "property length mismatch"
        );
    }

    Ok((i, property))
}

fn parse_value(i: &[u8], typ: PropertyType, depth: usize) -> IResult<&[u8], PropertyValue> {
    match typ {
        PropertyType::Array => map(|i| parse_array(i, depth), PropertyValue::Array)(i),
        PropertyType::Int => map(le_i32, PropertyValue::Int)(i),
        PropertyType::Str | PropertyType::Name => map(parse_long_string, PropertyValue::Str)(i),
        PropertyType::Float => map(le_f32, PropertyValue::Float)(i),
        PropertyType::Byte => map(pair(parse_long_string, parse_long_string), |(typ, value)| {
            PropertyValue::BytePair(typ, value)
        })(i),
        PropertyType::Bool => map(le_u8, PropertyValue::Bool)(i),
        PropertyType::QWord => map(le_i64, PropertyValue::Long)(i),
    }
}

fn parse_array(i: &[u8], depth: usize) -> IResult<&[u8], Vec<Vec<Property>>> {
    let depth = depth + 1;
    if depth > MAX_NESTING_DEPTH {
        return Err(failure(ErrorKind::NestingTooDeep { depth }));
    }
    let (i, elements) = parse_count(i)?;
    count(|i| parse_nested_list(i, depth), elements)(i)
}

/// Parses named properties up to and including the `"None"` sentinel.
pub fn parse_property_list(i: &[u8]) -> IResult<&[u8], Vec<Property>> {
    parse_nested_list(i, 0)
}

fn parse_nested_list(mut i: &[u8], depth: usize) -> IResult<&[u8], Vec<Property>> {
    let mut properties = Vec::new();
    loop {
        let (rest, name) = parse_list_entry_name(i)?;
        let Some(name) = name else {
            return Ok((rest, properties));
        };
        let (rest, property) = parse_nested_property(rest, Some(name), depth)?;
        properties.push(property);
        i = rest;
    }
}
