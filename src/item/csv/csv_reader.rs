use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::Read,
    path::Path,
};

use log::{debug, error};

use crate::{
    channel::{
        character::CharacterReader,
        delimited::{DelimitedRecordChannel, RecordChannelBuilder},
        format::Format,
    },
    core::item::{ItemReader, ItemReaderResult},
    error::ChannelError,
    schema::{Schema, TypedRecord, mapper::SchemaMapper},
};

/// A CSV item reader that implements the `ItemReader` trait.
///
/// Rows are read through a [`DelimitedRecordChannel`]. The reader can hand out
/// raw rows (`Vec<String>`) or, when a schema is configured, typed rows
/// ([`TypedRecord`]).
///
/// # Implementation Details
///
/// - Uses a `RefCell` around the channel so that `read` can take `&self`
/// - Consumes the header row on the first read when headers are enabled, and
///   validates it against the schema
/// - Closes the channel as soon as the input is exhausted; later reads keep
///   returning `Ok(None)`
///
/// # Examples
///
/// ```
/// use record_channel_rs::item::csv::csv_reader::CsvItemReaderBuilder;
/// use record_channel_rs::core::item::{ItemReader, ItemReaderResult};
/// use record_channel_rs::schema::{TypedRecord, TypedValue};
///
/// let data = "\
/// id,name,score
/// 7,Alice,
/// 8,Bob,9.5
/// ";
///
/// let reader = CsvItemReaderBuilder::new()
///     .has_headers(true)
///     .schema("id:int, name:string, score:decimal?".parse().unwrap())
///     .from_reader(data.as_bytes())
///     .unwrap();
///
/// let record: TypedRecord = reader.read().unwrap().unwrap();
/// assert_eq!(record.get("id"), Some(&TypedValue::Int(7)));
/// assert!(record.get("score").unwrap().is_null());
///
/// let record: TypedRecord = reader.read().unwrap().unwrap();
/// assert_eq!(record.get("name"), Some(&TypedValue::String("Bob".to_string())));
///
/// let end: ItemReaderResult<TypedRecord> = reader.read();
/// assert!(end.unwrap().is_none());
/// ```
pub struct CsvItemReader<R> {
    channel: RefCell<DelimitedRecordChannel<CharacterReader<R>>>,
    mapper: RefCell<Option<SchemaMapper>>,
    headers: RefCell<Option<Vec<String>>>,
    has_headers: bool,
    skip_rows: usize,
    /// Rows skipped so far; an interrupted start resumes from here.
    skipped: Cell<usize>,
    started: Cell<bool>,
    exhausted: Cell<bool>,
}

impl<R: Read> CsvItemReader<R> {
    /// Header names read from the first row, trimmed.
    pub fn headers(&self) -> Option<Vec<String>> {
        self.headers.borrow().clone()
    }

    /// Number of rows read through the channel, header and skipped rows included.
    pub fn records_read(&self) -> u64 {
        self.channel.borrow().records_read()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.borrow().is_closed()
    }

    /// Closes the underlying channel.
    ///
    /// Fails with [`ChannelError::ChannelClosed`] when the reader is already
    /// closed, including after it closed itself at the end of the input.
    pub fn close(&self) -> Result<(), ChannelError> {
        self.channel.borrow_mut().close()
    }

    /// Reads every remaining item.
    ///
    /// This is all-or-nothing: when any row fails, the rows already read are
    /// dropped and only the error is returned. The reader is closed afterwards
    /// in every case.
    ///
    /// # Examples
    ///
    /// ```
    /// use record_channel_rs::item::csv::csv_reader::CsvItemReaderBuilder;
    ///
    /// let reader = CsvItemReaderBuilder::new()
    ///     .from_reader("a,b\nc,d\n".as_bytes())
    ///     .unwrap();
    ///
    /// let rows: Vec<Vec<String>> = reader.read_all().unwrap();
    /// assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    /// assert!(reader.is_closed());
    /// ```
    pub fn read_all<T>(&self) -> Result<Vec<T>, ChannelError>
    where
        Self: ItemReader<T>,
    {
        let mut items = Vec::new();
        let outcome = loop {
            match <Self as ItemReader<T>>::read(self) {
                Ok(Some(item)) => items.push(item),
                Ok(None) => break Ok(()),
                Err(error) => break Err(error),
            }
        };

        let closed = if self.is_closed() {
            Ok(())
        } else {
            self.close()
        };

        match outcome {
            Ok(()) => closed.map(|()| items),
            Err(error) => {
                error!("Error occured during bulk read, {} rows discarded: {}", items.len(), error);
                if let Err(close_error) = closed {
                    error!("Error occured while closing reader: {}", close_error);
                }
                Err(error)
            }
        }
    }

    fn next_row(
        channel: &mut DelimitedRecordChannel<CharacterReader<R>>,
    ) -> Result<Option<Vec<String>>, ChannelError> {
        if !channel.has_next()? {
            return Ok(None);
        }
        match channel.read() {
            Ok(fields) => Ok(Some(fields)),
            Err(ChannelError::EndOfStream) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn finish(
        &self,
        channel: &mut DelimitedRecordChannel<CharacterReader<R>>,
    ) -> Result<(), ChannelError> {
        self.exhausted.set(true);
        if !channel.is_closed() {
            debug!("End of CSV input reached, closing channel");
            channel.close()?;
        }
        Ok(())
    }

    /// Reads the header row and skipped rows. Returns `false` when the input
    /// ended before any data row.
    ///
    /// A failed pull leaves the progress made so far in place, so the next
    /// call picks up where this one stopped.
    fn start(
        &self,
        channel: &mut DelimitedRecordChannel<CharacterReader<R>>,
    ) -> Result<bool, ChannelError> {
        if self.has_headers && self.headers.borrow().is_none() {
            let Some(row) = Self::next_row(channel)? else {
                return Ok(false);
            };
            let headers: Vec<String> = row.iter().map(|header| header.trim().to_string()).collect();
            if let Some(mapper) = self.mapper.borrow_mut().as_mut() {
                mapper.set_headers(&headers)?;
            }
            *self.headers.borrow_mut() = Some(headers);
        }

        while self.skipped.get() < self.skip_rows {
            if Self::next_row(channel)?.is_none() {
                return Ok(false);
            }
            self.skipped.set(self.skipped.get() + 1);
        }

        self.started.set(true);
        Ok(true)
    }

    fn next_fields(&self) -> Result<Option<Vec<String>>, ChannelError> {
        if self.exhausted.get() {
            return Ok(None);
        }

        let mut channel = self.channel.borrow_mut();

        if !self.started.get() {
            match self.start(&mut channel) {
                Ok(true) => {}
                Ok(false) => {
                    self.finish(&mut channel)?;
                    return Ok(None);
                }
                Err(error @ ChannelError::Mapping(_)) => {
                    // A header that does not fit the schema ends the input.
                    if let Err(close_error) = self.finish(&mut channel) {
                        error!("Error occured while closing reader: {}", close_error);
                    }
                    return Err(error);
                }
                Err(error) => return Err(error),
            }
        }

        match Self::next_row(&mut channel)? {
            Some(fields) => Ok(Some(fields)),
            None => {
                self.finish(&mut channel)?;
                Ok(None)
            }
        }
    }
}

impl<R: Read> ItemReader<Vec<String>> for CsvItemReader<R> {
    /// Reads the next data row as raw fields.
    fn read(&self) -> ItemReaderResult<Vec<String>> {
        self.next_fields()
    }
}

impl<R: Read> ItemReader<TypedRecord> for CsvItemReader<R> {
    /// Reads the next data row and maps it with the configured schema.
    ///
    /// # Returns
    /// - `Ok(Some(record))` if a row is read and mapped
    /// - `Ok(None)` if there are no more rows
    /// - `Err(ChannelError::InvalidConfiguration(_))` if no schema is configured
    /// - `Err(ChannelError::Mapping(_))` if the header or the row does not fit the schema
    fn read(&self) -> ItemReaderResult<TypedRecord> {
        if self.mapper.borrow().is_none() {
            return Err(ChannelError::InvalidConfiguration(
                "typed reading requires a schema".to_string(),
            ));
        }

        let Some(fields) = self.next_fields()? else {
            return Ok(None);
        };

        let mapper = self.mapper.borrow();
        match mapper.as_ref() {
            Some(mapper) => Ok(Some(mapper.map_fields(&fields)?)),
            None => Ok(None),
        }
    }
}

/// A builder for configuring CSV item reading.
///
/// # Default Configuration
///
/// - Format: CSV (comma separated, `\n` or `\r\n` line endings, quotes stripped)
/// - Headers: disabled
/// - Skipped rows: none
/// - Schema: none (only raw rows can be read)
///
/// # Examples
///
/// ```
/// use record_channel_rs::item::csv::csv_reader::CsvItemReaderBuilder;
/// use record_channel_rs::core::item::ItemReader;
///
/// let reader = CsvItemReaderBuilder::new()
///     .delimiter(";")
///     .has_headers(true)
///     .from_reader("name;age\nAlice;30".as_bytes())
///     .unwrap();
///
/// let row: Vec<String> = reader.read().unwrap().unwrap();
/// assert_eq!(row, vec!["Alice", "30"]);
/// ```
#[derive(Debug, Clone)]
pub struct CsvItemReaderBuilder {
    format: Format,
    delimiter: Option<String>,
    has_headers: bool,
    skip_rows: usize,
    schema: Option<Schema>,
}

impl Default for CsvItemReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvItemReaderBuilder {
    pub fn new() -> Self {
        Self {
            format: Format::Csv,
            delimiter: None,
            has_headers: false,
            skip_rows: 0,
            schema: None,
        }
    }

    /// Sets the preset format; `Format::Default` is read as CSV lines split on
    /// the configured delimiter.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Overrides the field delimiter of the format.
    pub fn delimiter<S: Into<String>>(mut self, delimiter: S) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Treats the first row as column names rather than data.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    /// Skips `rows` data rows after the header row (if any).
    pub fn skip_rows(mut self, rows: usize) -> Self {
        self.skip_rows = rows;
        self
    }

    /// Maps rows to [`TypedRecord`]s with `schema`. With headers enabled, the
    /// header row is validated against it and columns are matched by name.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn from_reader<R: Read>(self, rdr: R) -> Result<CsvItemReader<R>, ChannelError> {
        self.from_source(CharacterReader::new(rdr))
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemReader<File>, ChannelError> {
        let file = File::open(path.as_ref())?;
        debug!("Reading CSV records from {}", path.as_ref().display());
        self.from_reader(file)
    }

    fn from_source<R: Read>(
        self,
        source: CharacterReader<R>,
    ) -> Result<CsvItemReader<R>, ChannelError> {
        let channel = channel_builder(self.format, self.delimiter.as_deref())
            .from_source(source)?;

        Ok(CsvItemReader {
            channel: RefCell::new(channel),
            mapper: RefCell::new(self.schema.map(SchemaMapper::new)),
            headers: RefCell::new(None),
            has_headers: self.has_headers,
            skip_rows: self.skip_rows,
            skipped: Cell::new(0),
            started: Cell::new(false),
            exhausted: Cell::new(false),
        })
    }
}

/// Channel settings shared by the CSV reader and writer.
pub(crate) fn channel_builder(format: Format, delimiter: Option<&str>) -> RecordChannelBuilder {
    let builder = match format {
        Format::Default => RecordChannelBuilder::new().format(Format::Csv),
        preset => RecordChannelBuilder::new().format(preset),
    };
    match delimiter {
        Some(delimiter) => builder.field_separator(delimiter),
        None => builder,
    }
}
