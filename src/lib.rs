#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Record Channel for Rust

 Reads and writes delimited text records, such as CSV or tab separated
 files, over any character stream. Input is consumed incrementally: the
 channel only pulls as many characters as it needs to find the next record
 boundary, so arbitrarily large inputs can be processed record by record.

 ## Core Concepts

- **CharacterSource:** A stream of characters. [`CharacterReader`](channel::character::CharacterReader) decodes UTF-8 from any `Read`, [`CharacterWriter`](channel::character::CharacterWriter) encodes into any `Write`.
- **DelimitedRecordChannel:** Splits the stream into records and each record into fields. Records are written back by joining fields with the field separator and terminating them with the record separator.
- **Format:** A named separator preset. `CSV` splits on line breaks and commas and strips quotes around whole fields. `TDF` splits on line breaks and tabs.
- **Schema:** An ordered list of typed fields. Rows of strings are converted into [`TypedRecord`](schema::TypedRecord)s by a [`SchemaMapper`](schema::mapper::SchemaMapper).
- **ItemReader / ItemWriter:** Record-at-a-time reading and batch writing on top of a channel, with header and schema handling.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| csv           | Enables CSV `ItemReader`, `ItemWriter` and whole-file helpers |
| full          | Enables all available features                                |

 ## Getting Started

```toml
[dependencies]
record-channel-rs = { version = "<version>", features = ["csv"] }
```

```rust
# use record_channel_rs::{
#     channel::{character::CharacterReader, delimited::RecordChannelBuilder},
#     error::ChannelError,
# };
fn main() -> Result<(), ChannelError> {
    let text = "1;Alice|2;Bob|3;Carol";

    let mut channel = RecordChannelBuilder::new()
        .record_separator("|")
        .field_separator(";")
        .from_source(CharacterReader::new(text.as_bytes()))?;

    let mut names = Vec::new();
    while channel.has_next()? {
        let fields = channel.read()?;
        names.push(fields[1].clone());
    }
    channel.close()?;

    assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    Ok(())
}
```

 ## License
 Licensed under either of Apache License, Version 2.0 or MIT license at your option.
 */

/// Character streams, separators and the delimited record channel
pub mod channel;

/// Core item reading and writing traits
pub mod core;

/// Error types for channel and mapping operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Item readers / writers built on record channels (for example: csv reader and writer)
pub mod item;

/// Typed schemas and the conversion of rows into typed records
pub mod schema;
