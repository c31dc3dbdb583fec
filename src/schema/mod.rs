//! Schemas and typed records.
//!
//! A [`Schema`] is an ordered list of field names with their declared types.
//! The [`mapper::SchemaMapper`] uses it to turn the string fields read from a
//! channel into a [`TypedRecord`].
//!
//! Schemas can be built in code, parsed from a compact text form, or loaded
//! from JSON:
//!
//! ```
//! use record_channel_rs::schema::{DeclaredType, FieldType, Schema};
//!
//! let built = Schema::new()
//!     .field("id", FieldType::Int)
//!     .field("name", FieldType::String)
//!     .nullable_field("score", FieldType::Decimal);
//!
//! let parsed: Schema = "id:int, name:string, score:decimal?".parse().unwrap();
//!
//! let loaded: Schema = serde_json::from_str(
//!     r#"[{"name":"id","type":"int"},
//!         {"name":"name","type":"string"},
//!         {"name":"score","type":["decimal","null"]}]"#,
//! )
//! .unwrap();
//!
//! assert_eq!(built, parsed);
//! assert_eq!(built, loaded);
//! assert_eq!(
//!     built.fields()[2].declared,
//!     DeclaredType::Union(vec![FieldType::Decimal, FieldType::Null])
//! );
//! ```

use std::{fmt, str::FromStr};

use bigdecimal::BigDecimal;
use serde::{
    Deserialize, Serialize, Serializer,
    de::DeserializeOwned,
    ser::SerializeMap,
};

use crate::error::ChannelError;

/// Field mapping from string fields to typed records.
pub mod mapper;

/// Type tag of a schema field.
///
/// Only `String`, `Int`, `Float`, `Decimal` and `Boolean` can be mapped;
/// `Null` is only meaningful inside a nullable union. The remaining tags are
/// recognised so that schemas declaring them fail with a precise error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Decimal,
    Boolean,
    Null,
    Byte,
    Json,
    Xml,
    Map,
    Array,
}

impl FieldType {
    /// Whether values of this type can be coerced from text.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::Int
                | FieldType::Float
                | FieldType::Decimal
                | FieldType::Boolean
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Null => "null",
            FieldType::Byte => "byte",
            FieldType::Json => "json",
            FieldType::Xml => "xml",
            FieldType::Map => "map",
            FieldType::Array => "array",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field_type = match s.trim().to_ascii_lowercase().as_str() {
            "string" => FieldType::String,
            "int" => FieldType::Int,
            "float" => FieldType::Float,
            "decimal" => FieldType::Decimal,
            "boolean" => FieldType::Boolean,
            "null" | "()" => FieldType::Null,
            "byte" => FieldType::Byte,
            "json" => FieldType::Json,
            "xml" => FieldType::Xml,
            "map" => FieldType::Map,
            "array" => FieldType::Array,
            other => {
                return Err(ChannelError::InvalidConfiguration(format!(
                    "unknown field type `{}`",
                    other
                )));
            }
        };
        Ok(field_type)
    }
}

/// Declared type of a schema field: a single type or a union of types.
///
/// A union of exactly one supported type with `Null` is a nullable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclaredType {
    Single(FieldType),
    Union(Vec<FieldType>),
}

impl DeclaredType {
    pub fn nullable(field_type: FieldType) -> Self {
        DeclaredType::Union(vec![field_type, FieldType::Null])
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Single(field_type) => write!(f, "{}", field_type),
            DeclaredType::Union(members) => {
                let names: Vec<&str> = members.iter().map(FieldType::name).collect();
                f.write_str(&names.join("|"))
            }
        }
    }
}

impl FromStr for DeclaredType {
    type Err = ChannelError;

    /// Parses `int`, `decimal?` (nullable) or `int|string|null` (union).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(base) = s.strip_suffix('?') {
            return Ok(DeclaredType::nullable(base.parse()?));
        }
        if s.contains('|') {
            let members = s
                .split('|')
                .map(str::parse)
                .collect::<Result<Vec<FieldType>, _>>()?;
            return Ok(DeclaredType::Union(members));
        }
        Ok(DeclaredType::Single(s.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub declared: DeclaredType,
}

/// Ordered mapping of field names to declared types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<S: Into<String>>(self, name: S, field_type: FieldType) -> Self {
        self.declare(name, DeclaredType::Single(field_type))
    }

    pub fn nullable_field<S: Into<String>>(self, name: S, field_type: FieldType) -> Self {
        self.declare(name, DeclaredType::nullable(field_type))
    }

    pub fn declare<S: Into<String>>(mut self, name: S, declared: DeclaredType) -> Self {
        self.fields.push(SchemaField {
            name: name.into(),
            declared,
        });
        self
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromStr for Schema {
    type Err = ChannelError;

    /// Parses `name:type` pairs separated by commas, e.g.
    /// `"id:int, name:string, score:decimal?"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut schema = Schema::new();
        for entry in s.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (name, declared) = entry.split_once(':').ok_or_else(|| {
                ChannelError::InvalidConfiguration(format!(
                    "schema entry `{}` is not of the form name:type",
                    entry
                ))
            })?;
            schema = schema.declare(name.trim(), declared.parse()?);
        }
        Ok(schema)
    }
}

/// A field value coerced to its declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Null,
    Int(i64),
    Float(f64),
    Decimal(BigDecimal),
    Boolean(bool),
    String(String),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }
}

impl fmt::Display for TypedValue {
    /// Formats the value as field text; `Null` is empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => Ok(()),
            TypedValue::Int(value) => write!(f, "{}", value),
            TypedValue::Float(value) => write!(f, "{}", value),
            TypedValue::Decimal(value) => write!(f, "{}", value),
            TypedValue::Boolean(value) => write!(f, "{}", value),
            TypedValue::String(value) => f.write_str(value),
        }
    }
}

/// A record whose fields carry typed values, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedRecord {
    entries: Vec<(String, TypedValue)>,
}

impl TypedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(&mut self, name: S, value: TypedValue) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &TypedValue> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field values formatted as text, in record order.
    pub fn to_fields(&self) -> Vec<String> {
        self.values().map(ToString::to_string).collect()
    }

    pub fn to_json(&self) -> Result<serde_json::Value, ChannelError> {
        serde_json::to_value(self).map_err(|error| ChannelError::Deserialize(error.to_string()))
    }

    /// Converts the record into a user type, matching fields by name.
    ///
    /// # Examples
    ///
    /// ```
    /// use record_channel_rs::schema::{TypedRecord, TypedValue};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Player {
    ///     id: i64,
    ///     score: Option<f64>,
    /// }
    ///
    /// let mut record = TypedRecord::new();
    /// record.push("id", TypedValue::Int(7));
    /// record.push("score", TypedValue::Null);
    ///
    /// let player: Player = record.deserialize().unwrap();
    /// assert_eq!(player.id, 7);
    /// assert_eq!(player.score, None);
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ChannelError> {
        let value = self.to_json()?;
        serde_json::from_value(value).map_err(|error| ChannelError::Deserialize(error.to_string()))
    }
}

impl Serialize for TypedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
