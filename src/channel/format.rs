use std::{fmt, str::FromStr};

use crate::error::ChannelError;

/// Line terminator used when writing records with a preset format.
#[cfg(windows)]
pub const LINE_TERMINATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_TERMINATOR: &str = "\n";

/// Accepts both `\n` and `\r\n` endings when reading.
const LINE_PATTERN: &str = r"\r?\n";

/// Separators bundled by a preset [`Format`].
///
/// Read separators are regular expressions, write separators are literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSeparators {
    pub read_record: &'static str,
    pub read_field: &'static str,
    pub write_record: &'static str,
    pub write_field: &'static str,
    pub quote_aware: bool,
}

/// Named record format.
///
/// `Csv` and `Tdf` are presets; `Default` means the caller supplies the
/// separators explicitly.
///
/// # Examples
///
/// ```
/// use record_channel_rs::channel::format::Format;
///
/// let format: Format = "csv".parse().unwrap();
/// assert_eq!(format, Format::Csv);
/// assert_eq!(format.separators().unwrap().write_field, ",");
/// assert!(Format::Default.separators().is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    Csv,
    Tdf,
    #[default]
    Default,
}

impl Format {
    pub fn separators(&self) -> Option<FormatSeparators> {
        match self {
            Format::Csv => Some(FormatSeparators {
                read_record: LINE_PATTERN,
                read_field: ",",
                write_record: LINE_TERMINATOR,
                write_field: ",",
                quote_aware: true,
            }),
            Format::Tdf => Some(FormatSeparators {
                read_record: LINE_PATTERN,
                read_field: r"\t",
                write_record: LINE_TERMINATOR,
                write_field: "\t",
                quote_aware: false,
            }),
            Format::Default => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Csv => "CSV",
            Format::Tdf => "TDF",
            Format::Default => "default",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "tdf" => Ok(Format::Tdf),
            "default" => Ok(Format::Default),
            other => Err(ChannelError::InvalidConfiguration(format!(
                "unknown record format `{}`",
                other
            ))),
        }
    }
}
