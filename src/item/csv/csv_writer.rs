use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::Write,
    path::Path,
};

use log::debug;

use crate::{
    channel::{character::CharacterWriter, delimited::DelimitedRecordChannel, format::Format},
    core::item::ItemWriter,
    error::ChannelError,
    schema::TypedRecord,
};

use super::csv_reader::channel_builder;

/// A CSV item writer that implements the `ItemWriter` trait.
///
/// Each item becomes one line. Fields containing the delimiter are wrapped in
/// double quotes. An optional header row is written before the first item.
pub struct CsvItemWriter<W: Write> {
    channel: RefCell<DelimitedRecordChannel<CharacterWriter<W>>>,
    headers: RefCell<Option<Vec<String>>>,
    has_headers: bool,
    header_written: Cell<bool>,
}

impl<W: Write> CsvItemWriter<W> {
    fn write_header(&self, fallback: Option<Vec<String>>) -> Result<(), ChannelError> {
        if !self.has_headers || self.header_written.get() {
            return Ok(());
        }

        let headers = self.headers.borrow().clone().or(fallback);
        if let Some(headers) = headers {
            self.channel.borrow_mut().write(&headers)?;
            self.header_written.set(true);
        }
        Ok(())
    }

    /// Number of lines written, header included.
    pub fn records_written(&self) -> u64 {
        self.channel.borrow().records_written()
    }

    /// Writes the header row now, even if no item follows.
    pub fn open(&self) -> Result<(), ChannelError> {
        self.write_header(None)
    }

    pub fn flush(&self) -> Result<(), ChannelError> {
        self.channel.borrow_mut().flush()
    }

    pub fn close(&self) -> Result<(), ChannelError> {
        self.channel.borrow_mut().close()
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, ChannelError> {
        let mut channel = self.channel.into_inner();
        if !channel.is_closed() {
            channel.flush()?;
        }
        Ok(channel.into_inner().into_inner())
    }
}

impl<W: Write, S: AsRef<str>> ItemWriter<Vec<S>> for CsvItemWriter<W> {
    /// Writes each row as one line.
    ///
    /// Raw rows carry no field names, so a header row needs explicit
    /// `headers`; `has_headers(true)` alone is an `InvalidConfiguration`.
    fn write(&self, items: &[Vec<S>]) -> Result<(), ChannelError> {
        if self.has_headers && !self.header_written.get() && self.headers.borrow().is_none() {
            return Err(ChannelError::InvalidConfiguration(
                "writing rows with a header row requires header names".to_string(),
            ));
        }
        self.write_header(None)?;
        let mut channel = self.channel.borrow_mut();
        for item in items {
            channel.write(item)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), ChannelError> {
        CsvItemWriter::flush(self)
    }

    fn open(&self) -> Result<(), ChannelError> {
        CsvItemWriter::open(self)
    }

    fn close(&self) -> Result<(), ChannelError> {
        CsvItemWriter::close(self)
    }
}

impl<W: Write> ItemWriter<TypedRecord> for CsvItemWriter<W> {
    /// Writes the values of each record in field order. Without explicit
    /// headers, the field names of the first record form the header row.
    fn write(&self, items: &[TypedRecord]) -> Result<(), ChannelError> {
        if let Some(first) = items.first() {
            self.write_header(Some(first.names().map(str::to_string).collect()))?;
        }
        let mut channel = self.channel.borrow_mut();
        for item in items {
            channel.write(&item.to_fields())?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), ChannelError> {
        CsvItemWriter::flush(self)
    }

    fn open(&self) -> Result<(), ChannelError> {
        CsvItemWriter::open(self)
    }

    fn close(&self) -> Result<(), ChannelError> {
        CsvItemWriter::close(self)
    }
}

/// A builder for configuring CSV item writing.
///
/// # Default Configuration
///
/// - Format: CSV (comma separated, platform line terminator)
/// - Headers: disabled
///
/// # Examples
///
/// ```
/// use record_channel_rs::item::csv::csv_writer::CsvItemWriterBuilder;
/// use record_channel_rs::core::item::ItemWriter;
///
/// let writer = CsvItemWriterBuilder::new()
///     .headers(vec!["city", "country"])
///     .from_writer(vec![])
///     .unwrap();
///
/// writer.write(&[vec!["Boston", "United States"], vec!["Paris, TX", "United States"]]).unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// let lines: Vec<&str> = data.lines().collect();
/// assert_eq!(lines, vec!["city,country", "Boston,United States", "\"Paris, TX\",United States"]);
/// ```
#[derive(Debug, Clone)]
pub struct CsvItemWriterBuilder {
    format: Format,
    delimiter: Option<String>,
    has_headers: bool,
    headers: Option<Vec<String>>,
}

impl Default for CsvItemWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvItemWriterBuilder {
    pub fn new() -> CsvItemWriterBuilder {
        CsvItemWriterBuilder {
            format: Format::Csv,
            delimiter: None,
            has_headers: false,
            headers: None,
        }
    }

    pub fn format(mut self, format: Format) -> CsvItemWriterBuilder {
        self.format = format;
        self
    }

    pub fn delimiter<S: Into<String>>(mut self, delimiter: S) -> CsvItemWriterBuilder {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Writes a header row. Typed records supply their field names; raw rows
    /// need [`headers`](Self::headers).
    pub fn has_headers(mut self, yes: bool) -> CsvItemWriterBuilder {
        self.has_headers = yes;
        self
    }

    /// Writes `headers` as the first row. Implies `has_headers(true)`.
    pub fn headers<S: Into<String>>(mut self, headers: Vec<S>) -> CsvItemWriterBuilder {
        self.headers = Some(headers.into_iter().map(Into::into).collect());
        self.has_headers = true;
        self
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemWriter<File>, ChannelError> {
        let file = File::create(path.as_ref())?;
        debug!("Writing CSV records to {}", path.as_ref().display());
        self.from_writer(file)
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> Result<CsvItemWriter<W>, ChannelError> {
        let channel = channel_builder(self.format, self.delimiter.as_deref())
            .from_source(CharacterWriter::new(wtr))?;

        Ok(CsvItemWriter {
            channel: RefCell::new(channel),
            headers: RefCell::new(self.headers),
            has_headers: self.has_headers,
            header_written: Cell::new(false),
        })
    }
}
