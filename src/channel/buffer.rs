use std::{io, mem};

use log::{debug, trace};
use regex::Regex;

use super::character::CharacterSource;

/// Characters requested from the source before any record length is known.
pub const INITIAL_CHUNK_SIZE: usize = 100;

/// Carries the text read from a [`CharacterSource`] that has not yet been
/// handed out as a record.
///
/// Records are cut on the first match of the record separator. When no
/// separator is buffered, more text is pulled from the source in chunks that
/// grow to the longest record seen so far.
#[derive(Debug, Clone)]
pub struct RecordBuffer {
    pending: String,
    separator: Regex,
    chunk_size: usize,
    remaining: bool,
    trim_final_cr: bool,
}

impl RecordBuffer {
    pub fn new(separator: Regex) -> Self {
        Self::with_chunk_size(separator, INITIAL_CHUNK_SIZE)
    }

    pub fn with_chunk_size(separator: Regex, chunk_size: usize) -> Self {
        Self {
            pending: String::new(),
            separator,
            chunk_size: chunk_size.max(1),
            remaining: true,
            trim_final_cr: false,
        }
    }

    /// Drops a `\r` left at the end of the final record, for line-based
    /// separators that accept `\r\n`.
    pub fn trim_final_cr(mut self, yes: bool) -> Self {
        self.trim_final_cr = yes;
        self
    }

    /// Number of characters requested on the next pull.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// `false` once the source is exhausted and the buffer drained.
    pub fn is_remaining(&self) -> bool {
        self.remaining
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Returns the next record, pulling from `source` until a separator shows
    /// up or the source ends.
    ///
    /// `Ok(None)` means no record is left: the source ended with nothing
    /// buffered. A source ending with unterminated text yields that text as
    /// the final record.
    pub fn try_extract_record<S>(&mut self, source: &mut S) -> io::Result<Option<String>>
    where
        S: CharacterSource + ?Sized,
    {
        if !self.remaining {
            return Ok(None);
        }

        let record = loop {
            if let Some(record) = self.split_pending() {
                break Some(record);
            }

            self.pull(source)?;

            if source.has_reached_end() {
                break match self.split_pending() {
                    Some(record) => Some(record),
                    None => self.take_final_record(),
                };
            }
        };

        if let Some(record) = &record {
            let length = record.chars().count();
            if length > self.chunk_size {
                debug!(
                    "Growing record chunk size from {} to {} characters",
                    self.chunk_size, length
                );
                self.chunk_size = length;
            }
        }

        Ok(record)
    }

    /// Whether another record may follow.
    ///
    /// With an empty buffer this pulls once from the source; a pull that
    /// yields nothing marks the buffer as exhausted for good.
    pub fn has_more<S>(&mut self, source: &mut S) -> io::Result<bool>
    where
        S: CharacterSource + ?Sized,
    {
        if self.remaining && self.pending.is_empty() && self.pull(source)? == 0 {
            self.remaining = false;
        }
        Ok(self.remaining)
    }

    fn pull<S>(&mut self, source: &mut S) -> io::Result<usize>
    where
        S: CharacterSource + ?Sized,
    {
        let text = source.read(self.chunk_size)?;
        trace!(
            "Pulled {} characters ({} requested)",
            text.len(),
            self.chunk_size
        );
        self.pending.push_str(&text);
        Ok(text.len())
    }

    /// Cuts the buffer at the first separator, keeping the remainder.
    fn split_pending(&mut self) -> Option<String> {
        let (start, end) = {
            let found = self.separator.find(&self.pending)?;
            (found.start(), found.end())
        };
        let remainder = self.pending.split_off(end);
        self.pending.truncate(start);
        Some(mem::replace(&mut self.pending, remainder))
    }

    fn take_final_record(&mut self) -> Option<String> {
        self.remaining = false;
        if self.trim_final_cr && self.pending.ends_with('\r') {
            self.pending.pop();
        }
        if self.pending.is_empty() {
            None
        } else {
            Some(mem::take(&mut self.pending))
        }
    }
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use crate::channel::character::CharacterReader;

    use super::{INITIAL_CHUNK_SIZE, RecordBuffer};

    fn newline_buffer() -> RecordBuffer {
        RecordBuffer::new(Regex::new(r"\n").unwrap())
    }

    #[test]
    fn records_are_cut_on_the_separator() {
        let mut source = CharacterReader::new("a\nb\n".as_bytes());
        let mut buffer = newline_buffer();

        assert_eq!(buffer.try_extract_record(&mut source).unwrap().as_deref(), Some("a"));
        assert_eq!(buffer.pending(), "b\n");
        assert_eq!(buffer.try_extract_record(&mut source).unwrap().as_deref(), Some("b"));
        assert!(!buffer.has_pending());
        assert_eq!(buffer.try_extract_record(&mut source).unwrap(), None);
        assert!(!buffer.is_remaining());
    }

    #[test]
    fn trailing_carriage_return_is_trimmed_from_the_final_record() {
        let mut source = CharacterReader::new("a\r\nb\r".as_bytes());
        let mut buffer = RecordBuffer::new(Regex::new(r"\r?\n").unwrap()).trim_final_cr(true);

        assert_eq!(buffer.try_extract_record(&mut source).unwrap().as_deref(), Some("a"));
        assert_eq!(buffer.try_extract_record(&mut source).unwrap().as_deref(), Some("b"));
        assert_eq!(buffer.try_extract_record(&mut source).unwrap(), None);

        let mut lone = CharacterReader::new("a\n\r".as_bytes());
        let mut buffer = RecordBuffer::new(Regex::new(r"\r?\n").unwrap()).trim_final_cr(true);
        assert_eq!(buffer.try_extract_record(&mut lone).unwrap().as_deref(), Some("a"));
        assert_eq!(buffer.try_extract_record(&mut lone).unwrap(), None);
    }

    #[test]
    fn carriage_return_is_kept_without_trimming() {
        let mut source = CharacterReader::new("b\r".as_bytes());
        let mut buffer = newline_buffer();

        assert_eq!(buffer.try_extract_record(&mut source).unwrap().as_deref(), Some("b\r"));
    }

    #[test]
    fn unterminated_text_is_the_final_record() {
        let mut source = CharacterReader::new("a\nlast".as_bytes());
        let mut buffer = newline_buffer();

        buffer.try_extract_record(&mut source).unwrap();
        assert_eq!(
            buffer.try_extract_record(&mut source).unwrap().as_deref(),
            Some("last")
        );
        assert!(!buffer.is_remaining());
        assert_eq!(buffer.try_extract_record(&mut source).unwrap(), None);
    }

    #[test]
    fn long_records_grow_the_chunk_size() {
        let long = "x".repeat(INITIAL_CHUNK_SIZE * 3 + 7);
        let text = format!("{}\nshort\n", long);
        let mut source = CharacterReader::new(text.as_bytes());
        let mut buffer = newline_buffer();

        assert_eq!(buffer.try_extract_record(&mut source).unwrap(), Some(long.clone()));
        assert_eq!(buffer.chunk_size(), long.len());
        assert_eq!(
            buffer.try_extract_record(&mut source).unwrap().as_deref(),
            Some("short")
        );
    }

    #[test]
    fn probe_on_empty_source_exhausts_the_buffer() {
        let mut source = CharacterReader::new("".as_bytes());
        let mut buffer = newline_buffer();

        assert!(!buffer.has_more(&mut source).unwrap());
        assert!(!buffer.has_more(&mut source).unwrap());
        assert!(!buffer.is_remaining());
    }

    #[test]
    fn probe_keeps_pulled_text() {
        let mut source = CharacterReader::new("a\n".as_bytes());
        let mut buffer = newline_buffer();

        assert!(buffer.has_more(&mut source).unwrap());
        assert_eq!(buffer.pending(), "a\n");
        assert_eq!(buffer.try_extract_record(&mut source).unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn separator_split_across_pulls_is_found() {
        let mut source = CharacterReader::new("ab\r\ncd".as_bytes());
        let mut buffer = RecordBuffer::with_chunk_size(Regex::new(r"\r\n").unwrap(), 3);

        assert_eq!(buffer.try_extract_record(&mut source).unwrap().as_deref(), Some("ab"));
        assert_eq!(buffer.try_extract_record(&mut source).unwrap().as_deref(), Some("cd"));
    }
}
