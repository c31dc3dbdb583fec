use log::debug;
use regex::Regex;

use crate::error::ChannelError;

use super::{
    buffer::{INITIAL_CHUNK_SIZE, RecordBuffer},
    character::CharacterSource,
    format::Format,
    splitter::{BlankPolicy, FieldSplitter},
};

/// Lifecycle of a [`DelimitedRecordChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
}

/// Reads and writes delimited records over a [`CharacterSource`].
///
/// A record is the text between two record separators; its fields are the
/// pieces between field separators. The channel owns its buffer and counters,
/// so a single instance must be driven by one caller at a time.
///
/// # Examples
///
/// ```
/// use record_channel_rs::channel::{
///     character::CharacterReader,
///     delimited::RecordChannelBuilder,
/// };
/// use record_channel_rs::ChannelError;
///
/// let source = CharacterReader::new("1,2,3\n4,5,6\n".as_bytes());
/// let mut channel = RecordChannelBuilder::new()
///     .record_separator("\n")
///     .field_separator(",")
///     .from_source(source)
///     .unwrap();
///
/// assert!(channel.has_next().unwrap());
/// assert_eq!(channel.read().unwrap(), vec!["1", "2", "3"]);
/// assert_eq!(channel.read().unwrap(), vec!["4", "5", "6"]);
/// assert!(!channel.has_next().unwrap());
/// assert!(matches!(channel.read(), Err(ChannelError::EndOfStream)));
/// ```
pub struct DelimitedRecordChannel<C> {
    stream: C,
    buffer: RecordBuffer,
    splitter: FieldSplitter,
    write_record_separator: String,
    format: Format,
    state: ChannelState,
    records_read: u64,
    records_written: u64,
}

impl<C: CharacterSource> DelimitedRecordChannel<C> {
    /// Creates a channel using the separators of a preset format.
    pub fn with_format(stream: C, format: Format) -> Result<Self, ChannelError> {
        RecordChannelBuilder::new().format(format).from_source(stream)
    }

    /// Creates a channel with literal record and field separators.
    pub fn with_separators(
        stream: C,
        record_separator: &str,
        field_separator: &str,
    ) -> Result<Self, ChannelError> {
        RecordChannelBuilder::new()
            .record_separator(record_separator)
            .field_separator(field_separator)
            .from_source(stream)
    }

    fn ensure_open(&self) -> Result<(), ChannelError> {
        match self.state {
            ChannelState::Open => Ok(()),
            ChannelState::Closed => Err(ChannelError::ChannelClosed),
        }
    }

    /// Whether another record can be read.
    ///
    /// May pull once from the stream to find out. Once this returns `false`
    /// it keeps returning `false`.
    pub fn has_next(&mut self) -> Result<bool, ChannelError> {
        self.ensure_open()?;
        Ok(self.buffer.has_more(&mut self.stream)?)
    }

    /// Reads the next record and splits it into fields.
    ///
    /// Returns [`ChannelError::EndOfStream`] when no record is left. An empty
    /// record in the middle of the stream yields an empty field list.
    pub fn read(&mut self) -> Result<Vec<String>, ChannelError> {
        self.ensure_open()?;
        if !self.buffer.is_remaining() {
            return Err(ChannelError::EndOfStream);
        }

        match self.buffer.try_extract_record(&mut self.stream)? {
            Some(record) => {
                let fields = self.splitter.split(&record);
                self.records_read += 1;
                Ok(fields)
            }
            None => Err(ChannelError::EndOfStream),
        }
    }

    /// Splits raw record text with this channel's field settings.
    pub fn get_fields(&self, record: &str) -> Vec<String> {
        self.splitter.split(record)
    }

    /// Composes a record from `fields` and writes it with a trailing record
    /// separator in a single write.
    pub fn write<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), ChannelError> {
        self.ensure_open()?;
        let mut record = self.splitter.compose(fields);
        record.push_str(&self.write_record_separator);
        self.stream.write(&record, 0)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ChannelError> {
        self.ensure_open()?;
        Ok(self.stream.flush()?)
    }

    /// Closes the underlying stream. Closing twice is an error.
    pub fn close(&mut self) -> Result<(), ChannelError> {
        self.ensure_open()?;
        self.stream.close()?;
        self.state = ChannelState::Closed;
        debug!(
            "Record channel closed: {} records read, {} records written",
            self.records_read, self.records_written
        );
        Ok(())
    }

    /// `true` once every record was handed out and the stream is exhausted.
    pub fn has_reached_end(&self) -> bool {
        !self.buffer.is_remaining() && self.stream.has_reached_end()
    }

    /// Whether characters are buffered but not yet returned as a record.
    pub fn remaining(&self) -> bool {
        self.buffer.has_pending()
    }

    pub fn records(&mut self) -> Records<'_, C> {
        Records {
            channel: self,
            done: false,
        }
    }
}

impl<C> DelimitedRecordChannel<C> {
    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ChannelState::Closed
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn get_ref(&self) -> &C {
        &self.stream
    }

    pub fn into_inner(self) -> C {
        self.stream
    }
}

/// Iterator over the remaining records of a channel.
///
/// Stops at the end of the stream, and after yielding the first error.
pub struct Records<'a, C> {
    channel: &'a mut DelimitedRecordChannel<C>,
    done: bool,
}

impl<C: CharacterSource> Iterator for Records<'_, C> {
    type Item = Result<Vec<String>, ChannelError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = match self.channel.has_next() {
            Ok(true) => self.channel.read(),
            Ok(false) => Err(ChannelError::EndOfStream),
            Err(error) => Err(error),
        };

        match result {
            Ok(fields) => Some(Ok(fields)),
            Err(ChannelError::EndOfStream) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Separator {
    Literal(String),
    Pattern { pattern: String, write: String },
}

impl Separator {
    fn compile(&self, role: &str) -> Result<(Regex, String), ChannelError> {
        let (pattern, write) = match self {
            Separator::Literal(text) => (regex::escape(text), text.clone()),
            Separator::Pattern { pattern, write } => (pattern.clone(), write.clone()),
        };
        compile_pattern(&pattern, role).map(|regex| (regex, write))
    }
}

fn compile_pattern(pattern: &str, role: &str) -> Result<Regex, ChannelError> {
    let regex = Regex::new(pattern).map_err(|error| {
        ChannelError::InvalidConfiguration(format!("invalid {} separator: {}", role, error))
    })?;
    if regex.is_match("") {
        return Err(ChannelError::InvalidConfiguration(format!(
            "{} separator `{}` matches empty text",
            role, pattern
        )));
    }
    Ok(regex)
}

/// A builder for configuring a [`DelimitedRecordChannel`].
///
/// # Default Configuration
///
/// - Format: `Default` (separators must be given explicitly)
/// - Quote awareness: taken from the format, `false` for `Default`
/// - Blank policy: `Preserve`
/// - Initial chunk size: 100 characters
///
/// Explicit separators override the ones bundled with a preset format.
///
/// # Examples
///
/// ```
/// use record_channel_rs::channel::{
///     character::CharacterWriter,
///     delimited::RecordChannelBuilder,
///     format::Format,
/// };
///
/// let mut channel = RecordChannelBuilder::new()
///     .format(Format::Csv)
///     .field_separator(";")
///     .from_source(CharacterWriter::new(Vec::new()))
///     .unwrap();
///
/// channel.write(&["a", "b;c"]).unwrap();
/// let output = channel.into_inner().into_inner();
/// assert!(String::from_utf8(output).unwrap().starts_with("a;\"b;c\""));
/// ```
#[derive(Debug, Clone)]
pub struct RecordChannelBuilder {
    format: Format,
    record_separator: Option<Separator>,
    field_separator: Option<Separator>,
    quote_aware: Option<bool>,
    blank_policy: BlankPolicy,
    chunk_size: usize,
}

impl Default for RecordChannelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordChannelBuilder {
    pub fn new() -> Self {
        Self {
            format: Format::Default,
            record_separator: None,
            field_separator: None,
            quote_aware: None,
            blank_policy: BlankPolicy::Preserve,
            chunk_size: INITIAL_CHUNK_SIZE,
        }
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Uses `separator` verbatim for both reading and writing records.
    pub fn record_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.record_separator = Some(Separator::Literal(separator.into()));
        self
    }

    /// Reads records cut by the regular expression `pattern` and writes
    /// `write` between records.
    pub fn record_separator_pattern<P: Into<String>, W: Into<String>>(
        mut self,
        pattern: P,
        write: W,
    ) -> Self {
        self.record_separator = Some(Separator::Pattern {
            pattern: pattern.into(),
            write: write.into(),
        });
        self
    }

    /// Uses `separator` verbatim for both reading and writing fields.
    pub fn field_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.field_separator = Some(Separator::Literal(separator.into()));
        self
    }

    /// Splits fields on the regular expression `pattern` and writes `write`
    /// between fields.
    pub fn field_separator_pattern<P: Into<String>, W: Into<String>>(
        mut self,
        pattern: P,
        write: W,
    ) -> Self {
        self.field_separator = Some(Separator::Pattern {
            pattern: pattern.into(),
            write: write.into(),
        });
        self
    }

    pub fn quote_aware(mut self, yes: bool) -> Self {
        self.quote_aware = Some(yes);
        self
    }

    pub fn blank_policy(mut self, policy: BlankPolicy) -> Self {
        self.blank_policy = policy;
        self
    }

    /// Characters requested on the first pull; later pulls grow with the
    /// longest record seen.
    pub fn initial_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    fn resolve(
        &self,
        explicit: &Option<Separator>,
        preset: Option<(&'static str, &'static str)>,
        role: &str,
    ) -> Result<(Regex, String), ChannelError> {
        match (explicit, preset) {
            (Some(separator), _) => separator.compile(role),
            (None, Some((pattern, write))) => {
                compile_pattern(pattern, role).map(|regex| (regex, write.to_string()))
            }
            (None, None) => Err(ChannelError::InvalidConfiguration(format!(
                "a {} separator is required for the `{}` format",
                role, self.format
            ))),
        }
    }

    pub fn from_source<C: CharacterSource>(
        self,
        stream: C,
    ) -> Result<DelimitedRecordChannel<C>, ChannelError> {
        let preset = self.format.separators();

        let (record_regex, write_record_separator) = self.resolve(
            &self.record_separator,
            preset.map(|s| (s.read_record, s.write_record)),
            "record",
        )?;
        let (field_regex, write_field_separator) = self.resolve(
            &self.field_separator,
            preset.map(|s| (s.read_field, s.write_field)),
            "field",
        )?;
        // Preset record separators are line based and accept `\r\n`.
        let trim_final_cr = self.record_separator.is_none() && preset.is_some();
        let quote_aware = self
            .quote_aware
            .unwrap_or_else(|| preset.is_some_and(|s| s.quote_aware));

        debug!(
            "Opening {} record channel (quote aware: {})",
            self.format, quote_aware
        );

        Ok(DelimitedRecordChannel {
            stream,
            buffer: RecordBuffer::with_chunk_size(record_regex, self.chunk_size)
                .trim_final_cr(trim_final_cr),
            splitter: FieldSplitter::new(field_regex, write_field_separator)
                .quote_aware(quote_aware)
                .blank_policy(self.blank_policy),
            write_record_separator,
            format: self.format,
            state: ChannelState::Open,
            records_read: 0,
            records_written: 0,
        })
    }
}
