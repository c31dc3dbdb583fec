use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
/// Record channel error
pub enum ChannelError {
    /// Normal iteration terminator: the channel holds no further records.
    #[error("end of stream reached")]
    EndOfStream,

    #[error("Record channel is already closed.")]
    ChannelClosed,

    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    #[error("invalid channel configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("unable to deserialize record: {0}")]
    Deserialize(String),
}

impl ChannelError {
    /// Returns `true` for the end-of-stream marker, which is not a failure.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, ChannelError::EndOfStream)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
/// Schema mapping error
pub enum MappingError {
    #[error("header does not match schema: {0}")]
    SchemaMismatch(String),

    #[error("Record type and CSV file does not match: expected {expected} fields, found {actual}")]
    RecordSchemaMismatch { expected: usize, actual: usize },

    #[error("unsupported nillable field `{field}`")]
    UnsupportedNullableField { field: String },

    #[error("missing value for required field `{field}`")]
    MissingRequiredValue { field: String },

    #[error(
        "type casting support only for int, float, decimal, boolean and string, found `{type_name}` for field `{field}`"
    )]
    UnsupportedFieldType { field: String, type_name: String },

    #[error("invalid value `{value}` for field `{field}`: {reason}")]
    FieldParseError {
        field: String,
        value: String,
        reason: String,
    },
}
