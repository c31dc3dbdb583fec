mod common;

use common::{MockFile, MockSource};

use std::{
    error::Error,
    io::{self, Cursor, ErrorKind, Read},
};

use record_channel_rs::{
    ChannelError, MappingError,
    channel::{
        character::{CharacterReader, CharacterWriter},
        delimited::{DelimitedRecordChannel, RecordChannelBuilder},
        format::Format,
    },
    core::item::{ItemReader, ItemWriter},
    item::csv::{csv_reader::CsvItemReaderBuilder, csv_writer::CsvItemWriterBuilder},
    schema::TypedRecord,
};

#[test]
fn failing_sink_surfaces_an_io_error() -> Result<(), Box<dyn Error>> {
    let mut file = MockFile::default();
    file.expect_write().times(1).returning(|_buf| {
        let err = io::Error::from(ErrorKind::PermissionDenied);
        Result::Err(err)
    });

    let writer = CsvItemWriterBuilder::new().from_writer(file)?;
    let result = writer.write(&[vec!["1", "a"], vec!["2", "b"]]);

    match result {
        Err(ChannelError::Io(error)) => assert_eq!(error.kind(), ErrorKind::PermissionDenied),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(writer.records_written(), 0);
    Ok(())
}

/// A source whose first pull times out, then yields `data`.
fn flaky_source(data: &'static str) -> MockSource {
    let mut source = MockSource::default();
    source.expect_read().times(1).returning(|_buf| {
        let err = io::Error::from(ErrorKind::TimedOut);
        Result::Err(err)
    });
    let mut rest = Cursor::new(data.as_bytes());
    source.expect_read().returning(move |buf| rest.read(buf));
    source
}

#[test]
fn source_failure_while_reading_the_header_can_be_retried() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_reader(flaky_source("h\n1\n2\n"))?;

    let first: Result<Option<Vec<String>>, ChannelError> = reader.read();
    assert!(matches!(first, Err(ChannelError::Io(ref error)) if error.kind() == ErrorKind::TimedOut));
    assert!(!reader.is_closed());

    let rows: Vec<Vec<String>> = reader.read_all()?;

    assert_eq!(reader.headers(), Some(vec!["h".to_string()]));
    assert_eq!(rows, vec![vec!["1"], vec!["2"]]);
    Ok(())
}

#[test]
fn source_failure_while_skipping_rows_resumes_the_skip() -> Result<(), Box<dyn Error>> {
    let mut source = MockSource::default();
    let mut header = Cursor::new("h\n".as_bytes());
    source.expect_read().times(1).returning(move |buf| header.read(buf));
    source.expect_read().times(1).returning(|_buf| {
        let err = io::Error::from(ErrorKind::TimedOut);
        Result::Err(err)
    });
    let mut rest = Cursor::new("skipped\n1\n".as_bytes());
    source.expect_read().returning(move |buf| rest.read(buf));

    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .skip_rows(1)
        .from_reader(source)?;

    let first: Result<Option<Vec<String>>, ChannelError> = reader.read();
    assert!(matches!(first, Err(ChannelError::Io(_))));

    let rows: Vec<Vec<String>> = reader.read_all()?;

    assert_eq!(rows, vec![vec!["1"]]);
    Ok(())
}

#[test]
fn invalid_utf8_is_reported_as_invalid_data() -> Result<(), Box<dyn Error>> {
    let bytes: &[u8] = &[b'a', b',', 0xff, 0xfe, b'\n'];
    let mut channel = DelimitedRecordChannel::with_format(CharacterReader::new(bytes), Format::Csv)?;

    match channel.read() {
        Err(ChannelError::Io(error)) => assert_eq!(error.kind(), ErrorKind::InvalidData),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[test]
fn operations_on_a_closed_channel_fail() -> Result<(), Box<dyn Error>> {
    let mut channel =
        DelimitedRecordChannel::with_format(CharacterReader::new("a,b\n".as_bytes()), Format::Csv)?;

    channel.close()?;

    assert!(channel.is_closed());
    assert!(matches!(channel.has_next(), Err(ChannelError::ChannelClosed)));
    assert!(matches!(channel.read(), Err(ChannelError::ChannelClosed)));
    let second_close = channel.close();
    assert!(matches!(second_close, Err(ChannelError::ChannelClosed)));
    assert_eq!(
        second_close.map_err(|error| error.to_string()),
        Err("Record channel is already closed.".to_string())
    );
    Ok(())
}

#[test]
fn writing_to_a_reading_channel_is_unsupported() -> Result<(), Box<dyn Error>> {
    let mut channel =
        DelimitedRecordChannel::with_format(CharacterReader::new("".as_bytes()), Format::Csv)?;

    match channel.write(&["a"]) {
        Err(ChannelError::Io(error)) => assert_eq!(error.kind(), ErrorKind::Unsupported),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[test]
fn bad_configuration_is_rejected() {
    let missing = RecordChannelBuilder::new().from_source(CharacterWriter::new(Vec::<u8>::new()));
    assert!(matches!(missing, Err(ChannelError::InvalidConfiguration(_))));

    let bad_regex = RecordChannelBuilder::new()
        .record_separator_pattern("(", "\n")
        .field_separator(",")
        .from_source(CharacterWriter::new(Vec::<u8>::new()));
    assert!(matches!(bad_regex, Err(ChannelError::InvalidConfiguration(_))));

    let matches_empty = RecordChannelBuilder::new()
        .record_separator("\n")
        .field_separator_pattern("x*", "x")
        .from_source(CharacterWriter::new(Vec::<u8>::new()));
    assert!(matches!(matches_empty, Err(ChannelError::InvalidConfiguration(_))));

    assert!(matches!(
        "json".parse::<Format>(),
        Err(ChannelError::InvalidConfiguration(_))
    ));
}

#[test]
fn header_not_matching_the_schema_fails_before_any_row() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .schema("a:int, c:string".parse()?)
        .from_reader("a,b\n1,x\n".as_bytes())?;

    let result: Result<Option<TypedRecord>, ChannelError> = reader.read();

    assert!(matches!(
        result,
        Err(ChannelError::Mapping(MappingError::SchemaMismatch(_)))
    ));
    assert_eq!(reader.records_read(), 1);
    let next: Option<TypedRecord> = reader.read()?;
    assert!(next.is_none());
    Ok(())
}

#[test]
fn extra_field_is_a_record_schema_mismatch() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .schema("id:int, name:string, score:decimal?".parse()?)
        .from_reader("id,name,score\n7,Alice,9.5,extra\n".as_bytes())?;

    let result: Result<Option<TypedRecord>, ChannelError> = reader.read();

    match result {
        Err(ChannelError::Mapping(error)) => assert_eq!(
            error,
            MappingError::RecordSchemaMismatch {
                expected: 3,
                actual: 4
            }
        ),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[test]
fn typed_read_without_schema_is_a_configuration_error() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new().from_reader("1,2\n".as_bytes())?;

    let result: Result<Option<TypedRecord>, ChannelError> = reader.read();

    assert!(matches!(result, Err(ChannelError::InvalidConfiguration(_))));
    Ok(())
}

#[test]
fn bulk_read_is_all_or_nothing() -> Result<(), Box<dyn Error>> {
    common::init_logger();
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .schema("year:int, make:string".parse()?)
        .from_reader("year,make\n1948,Porsche\n1995,Peugeot\n20x1,Mazda\n1967,Ford\n".as_bytes())?;

    let result: Result<Vec<TypedRecord>, ChannelError> = reader.read_all();

    match result {
        Err(ChannelError::Mapping(MappingError::FieldParseError { field, value, .. })) => {
            assert_eq!(field, "year");
            assert_eq!(value, "20x1");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(reader.is_closed());
    Ok(())
}

#[test]
fn blank_required_value_is_missing() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new()
        .format(Format::Tdf)
        .schema("id:int, name:string".parse()?)
        .from_reader("1\t\n".as_bytes())?;

    let result: Result<Option<TypedRecord>, ChannelError> = reader.read();

    assert!(matches!(
        result,
        Err(ChannelError::Mapping(MappingError::MissingRequiredValue { ref field })) if field == "name"
    ));
    Ok(())
}

#[test]
fn closing_an_exhausted_reader_twice_fails() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new().from_reader("".as_bytes())?;

    let row: Option<Vec<String>> = reader.read()?;

    assert!(row.is_none());
    assert!(matches!(reader.close(), Err(ChannelError::ChannelClosed)));
    Ok(())
}
