//! Delimited record channels.
//!
//! This module turns a stream of characters into records split into fields,
//! and writes fields back out as delimited text.
//!
//! # Module Architecture
//!
//! 1. **CharacterSource**: the character stream consumed by a channel, with a
//!    UTF-8 reader and writer over `std::io`.
//!
//! 2. **RecordBuffer**: keeps the text read past the last record boundary and
//!    pulls more from the stream until the next boundary or the end.
//!
//! 3. **FieldSplitter**: splits record text into fields, optionally stripping
//!    quotes, and composes fields back into record text.
//!
//! 4. **DelimitedRecordChannel**: ties the above together behind `has_next`,
//!    `read`, `write` and `close`.
//!
//! Separators come either from a preset [`format::Format`] (`CSV`, `TDF`) or
//! are supplied explicitly through [`delimited::RecordChannelBuilder`].
//!
//! # Limitations
//!
//! Escaped quotes and newlines inside quoted fields are not supported. A
//! quoted field containing the field separator is written with quotes but is
//! split apart again when read.
//!
//! # Examples
//!
//! ```
//! use record_channel_rs::channel::{
//!     character::{CharacterReader, CharacterWriter},
//!     delimited::DelimitedRecordChannel,
//!     format::Format,
//! };
//!
//! let mut writer =
//!     DelimitedRecordChannel::with_format(CharacterWriter::new(Vec::new()), Format::Tdf).unwrap();
//! writer.write(&["name", "age"]).unwrap();
//! writer.write(&["Alice", "30"]).unwrap();
//! let text = writer.into_inner().into_inner();
//!
//! let mut reader =
//!     DelimitedRecordChannel::with_format(CharacterReader::new(text.as_slice()), Format::Tdf)
//!         .unwrap();
//! let records = reader.records().collect::<Result<Vec<_>, _>>().unwrap();
//! assert_eq!(records, vec![vec!["name", "age"], vec!["Alice", "30"]]);
//! ```

/// Record boundary detection over a character stream.
pub mod buffer;

/// Character streams consumed by record channels.
pub mod character;

/// The record channel and its builder.
pub mod delimited;

/// Named separator presets.
pub mod format;

/// Field splitting and record composition.
pub mod splitter;
