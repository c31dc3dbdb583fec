//! CSV support for reading and writing tabular data.
//!
//! This module builds item readers and writers on top of
//! [`DelimitedRecordChannel`](crate::channel::delimited::DelimitedRecordChannel),
//! plus a few one-call helpers for whole files.
//!
//! # Module Architecture
//!
//! 1. **CsvItemReader**: reads rows as `Vec<String>`, or as [`TypedRecord`]s
//!    when a [`Schema`] is configured. Header rows are validated against the
//!    schema and leading rows can be skipped.
//!
//! 2. **CsvItemWriter**: writes rows of strings or typed records, with an
//!    optional header row.
//!
//! Both components follow the builder pattern and accept the `CSV` and `TDF`
//! presets or a custom delimiter.
//!
//! # Examples
//!
//! ```
//! use record_channel_rs::item::csv::{file_read_csv, file_write_csv, FileWriteOption};
//!
//! let path = std::env::temp_dir().join("record_channel_doc_cities.csv");
//!
//! file_write_csv(&path, &[vec!["city", "pop"], vec!["Boston", "4628910"]], FileWriteOption::Overwrite).unwrap();
//! file_write_csv(&path, &[vec!["Concord", "42695"]], FileWriteOption::Append).unwrap();
//!
//! let rows = file_read_csv(&path, 1).unwrap();
//! assert_eq!(rows, vec![vec!["Boston", "4628910"], vec!["Concord", "42695"]]);
//! # std::fs::remove_file(&path).unwrap();
//! ```

use std::{
    fs::{File, OpenOptions},
    path::Path,
};

use log::debug;
use tempfile::NamedTempFile;

use crate::{
    core::item::ItemWriter,
    error::ChannelError,
    schema::{Schema, TypedRecord},
};

use self::{
    csv_reader::{CsvItemReader, CsvItemReaderBuilder},
    csv_writer::CsvItemWriterBuilder,
};

/// A module providing facilities for reading CSV data records.
pub mod csv_reader;

/// A module providing facilities for writing CSV data records.
pub mod csv_writer;

/// How [`file_write_csv`] treats an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileWriteOption {
    /// Replace the file. The new content is written to a temporary file in the
    /// same directory and moved into place once complete. The file keeps its
    /// permissions; a missing file is created first, with default permissions.
    #[default]
    Overwrite,
    /// Add records after the existing content, creating the file if needed.
    Append,
}

/// Reads every row of the CSV file at `path`, skipping the first `skip_rows`.
pub fn file_read_csv<P: AsRef<Path>>(
    path: P,
    skip_rows: usize,
) -> Result<Vec<Vec<String>>, ChannelError> {
    CsvItemReaderBuilder::new()
        .skip_rows(skip_rows)
        .from_path(path)?
        .read_all()
}

/// Reads every row of the CSV file at `path` as a typed record. The first row
/// must be a header naming exactly the schema fields.
pub fn file_read_csv_typed<P: AsRef<Path>>(
    path: P,
    schema: Schema,
) -> Result<Vec<TypedRecord>, ChannelError> {
    CsvItemReaderBuilder::new()
        .has_headers(true)
        .schema(schema)
        .from_path(path)?
        .read_all()
}

/// Opens the CSV file at `path` for row by row reading.
pub fn file_read_csv_as_stream<P: AsRef<Path>>(path: P) -> Result<CsvItemReader<File>, ChannelError> {
    CsvItemReaderBuilder::new().from_path(path)
}

/// Writes `records` to the CSV file at `path`.
pub fn file_write_csv<P: AsRef<Path>, S: AsRef<str>>(
    path: P,
    records: &[Vec<S>],
    option: FileWriteOption,
) -> Result<(), ChannelError> {
    let path = path.as_ref();
    match option {
        FileWriteOption::Overwrite => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let target = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
            let temp = NamedTempFile::new_in(dir)?;
            temp.as_file().set_permissions(target.metadata()?.permissions())?;
            drop(target);
            {
                let writer = CsvItemWriterBuilder::new().from_writer(temp.as_file())?;
                writer.write(records)?;
                writer.close()?;
            }
            temp.persist(path).map_err(|error| ChannelError::Io(error.error))?;
        }
        FileWriteOption::Append => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let writer = CsvItemWriterBuilder::new().from_writer(file)?;
            writer.write(records)?;
            writer.close()?;
        }
    }
    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{error::Error, fs};

    use tempfile::tempdir;

    use crate::{
        core::item::ItemReader,
        schema::{Schema, TypedValue},
    };

    use super::{FileWriteOption, file_read_csv, file_read_csv_as_stream, file_read_csv_typed, file_write_csv};

    #[test]
    fn overwrite_replaces_previous_content() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("data.csv");
        fs::write(&path, "stale,content\nmore,stale\n")?;

        file_write_csv(&path, &[vec!["1", "a"]], FileWriteOption::Overwrite)?;

        assert_eq!(file_read_csv(&path, 0)?, vec![vec!["1", "a"]]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn overwrite_keeps_file_permissions() -> Result<(), Box<dyn Error>> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let path = dir.path().join("shared.csv");
        fs::write(&path, "old\n")?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644))?;

        file_write_csv(&path, &[vec!["new"]], FileWriteOption::Overwrite)?;

        assert_eq!(fs::metadata(&path)?.permissions().mode() & 0o777, 0o644);
        assert_eq!(file_read_csv(&path, 0)?, vec![vec!["new"]]);
        Ok(())
    }

    #[test]
    fn append_creates_then_extends() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("log.csv");

        file_write_csv(&path, &[vec!["1", "a"]], FileWriteOption::Append)?;
        file_write_csv(&path, &[vec!["2", "b, c"]], FileWriteOption::Append)?;

        assert_eq!(file_read_csv(&path, 0)?, vec![vec!["1", "a"], vec!["2", "\"b", " c\""]]);
        Ok(())
    }

    #[test]
    fn typed_file_read_uses_the_header() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("players.csv");
        fs::write(&path, "name,id\nAlice,1\nBob,2\n")?;
        let schema: Schema = "id:int, name:string".parse()?;

        let records = file_read_csv_typed(&path, schema)?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("id"), Some(&TypedValue::Int(2)));
        assert_eq!(records[1].get("name"), Some(&TypedValue::String("Bob".to_string())));
        Ok(())
    }

    #[test]
    fn stream_reads_row_by_row() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("stream.csv");
        fs::write(&path, "x,y\n1,2")?;

        let reader = file_read_csv_as_stream(&path)?;
        let first: Option<Vec<String>> = reader.read()?;
        let second: Option<Vec<String>> = reader.read()?;
        let end: Option<Vec<String>> = reader.read()?;

        assert_eq!(first, Some(vec!["x".to_string(), "y".to_string()]));
        assert_eq!(second, Some(vec!["1".to_string(), "2".to_string()]));
        assert_eq!(end, None);
        assert!(reader.is_closed());
        Ok(())
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = file_read_csv("/definitely/not/here.csv", 0);

        assert!(matches!(result, Err(crate::error::ChannelError::Io(_))));
    }
}
