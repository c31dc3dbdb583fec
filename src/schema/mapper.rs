use std::str::FromStr;

use log::debug;
use bigdecimal::BigDecimal;

use crate::error::MappingError;

use super::{DeclaredType, FieldType, Schema, TypedRecord, TypedValue};

/// Maps rows of string fields to [`TypedRecord`]s following a [`Schema`].
///
/// Without headers, field `i` of a row feeds schema field `i`. Once headers
/// are set, each schema field takes its value from the column carrying its
/// name, so the column order of the input does not matter.
///
/// # Examples
///
/// ```
/// use record_channel_rs::schema::{mapper::SchemaMapper, TypedValue};
///
/// let schema = "id:int, name:string, score:decimal?".parse().unwrap();
/// let mapper = SchemaMapper::with_headers(schema, &["id", "name", "score"]).unwrap();
///
/// let record = mapper.map_fields(&["7", "Alice", ""]).unwrap();
/// assert_eq!(record.get("id"), Some(&TypedValue::Int(7)));
/// assert_eq!(record.get("name"), Some(&TypedValue::String("Alice".to_string())));
/// assert_eq!(record.get("score"), Some(&TypedValue::Null));
/// ```
#[derive(Debug, Clone)]
pub struct SchemaMapper {
    schema: Schema,
    /// Column index of each schema field, once headers are known.
    positions: Option<Vec<usize>>,
}

impl SchemaMapper {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            positions: None,
        }
    }

    pub fn with_headers<S: AsRef<str>>(schema: Schema, headers: &[S]) -> Result<Self, MappingError> {
        let mut mapper = Self::new(schema);
        mapper.set_headers(headers)?;
        Ok(mapper)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validates `headers` against the schema and switches to mapping by name.
    pub fn set_headers<S: AsRef<str>>(&mut self, headers: &[S]) -> Result<(), MappingError> {
        self.positions = Some(validate_headers(&self.schema, headers)?);
        debug!("Header validated against a schema of {} fields", self.schema.len());
        Ok(())
    }

    /// Maps one row of fields to a typed record.
    pub fn map_fields<S: AsRef<str>>(&self, fields: &[S]) -> Result<TypedRecord, MappingError> {
        if fields.len() != self.schema.len() {
            return Err(MappingError::RecordSchemaMismatch {
                expected: self.schema.len(),
                actual: fields.len(),
            });
        }

        let mut record = TypedRecord::new();
        for (index, field) in self.schema.fields().iter().enumerate() {
            let column = match &self.positions {
                Some(positions) => positions[index],
                None => index,
            };
            let value = coerce(&field.name, &field.declared, fields[column].as_ref())?;
            record.push(field.name.clone(), value);
        }
        Ok(record)
    }
}

/// Maps `fields` positionally against `schema`.
pub fn map_fields<S: AsRef<str>>(fields: &[S], schema: &Schema) -> Result<TypedRecord, MappingError> {
    SchemaMapper::new(schema.clone()).map_fields(fields)
}

/// Checks that `headers` name exactly the schema fields, in any order, and
/// returns the column of each schema field.
pub fn validate_headers<S: AsRef<str>>(
    schema: &Schema,
    headers: &[S],
) -> Result<Vec<usize>, MappingError> {
    if headers.len() != schema.len() {
        return Err(MappingError::SchemaMismatch(format!(
            "the header count ({}) doesn't match the schema field count ({})",
            headers.len(),
            schema.len()
        )));
    }

    schema
        .names()
        .map(|name| {
            let name = name.trim();
            headers
                .iter()
                .position(|header| header.as_ref().trim() == name)
                .ok_or_else(|| {
                    MappingError::SchemaMismatch(format!(
                        "the header does not contain the field `{}`",
                        name
                    ))
                })
        })
        .collect()
}

fn coerce(field: &str, declared: &DeclaredType, raw: &str) -> Result<TypedValue, MappingError> {
    match declared {
        DeclaredType::Single(field_type) => {
            ensure_supported(field, *field_type)?;
            if raw.trim().is_empty() {
                return Err(MappingError::MissingRequiredValue {
                    field: field.to_string(),
                });
            }
            parse_value(field, *field_type, raw)
        }
        DeclaredType::Union(members) => {
            let base = nullable_base(members).ok_or_else(|| {
                MappingError::UnsupportedNullableField {
                    field: field.to_string(),
                }
            })?;
            ensure_supported(field, base)?;
            if raw.trim().is_empty() {
                return Ok(TypedValue::Null);
            }
            parse_value(field, base, raw)
        }
    }
}

/// The non-null member of a two-member union with `Null`.
fn nullable_base(members: &[FieldType]) -> Option<FieldType> {
    match members {
        [FieldType::Null, base] | [base, FieldType::Null] if *base != FieldType::Null => Some(*base),
        _ => None,
    }
}

fn ensure_supported(field: &str, field_type: FieldType) -> Result<(), MappingError> {
    if field_type.is_supported() {
        Ok(())
    } else {
        Err(MappingError::UnsupportedFieldType {
            field: field.to_string(),
            type_name: field_type.to_string(),
        })
    }
}

fn parse_value(field: &str, field_type: FieldType, raw: &str) -> Result<TypedValue, MappingError> {
    let text = raw.trim();
    let parse_error = |reason: String| MappingError::FieldParseError {
        field: field.to_string(),
        value: raw.to_string(),
        reason,
    };

    match field_type {
        FieldType::Int => text
            .parse::<i64>()
            .map(TypedValue::Int)
            .map_err(|error| parse_error(error.to_string())),
        FieldType::Float => text
            .parse::<f64>()
            .map(TypedValue::Float)
            .map_err(|error| parse_error(error.to_string())),
        FieldType::Decimal => BigDecimal::from_str(text)
            .map(TypedValue::Decimal)
            .map_err(|error| parse_error(error.to_string())),
        FieldType::Boolean => {
            if text.eq_ignore_ascii_case("true") {
                Ok(TypedValue::Boolean(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(TypedValue::Boolean(false))
            } else {
                Err(parse_error("expected `true` or `false`".to_string()))
            }
        }
        FieldType::String => Ok(TypedValue::String(text.to_string())),
        other => Err(MappingError::UnsupportedFieldType {
            field: field.to_string(),
            type_name: other.to_string(),
        }),
    }
}
