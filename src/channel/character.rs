use std::{
    io::{self, ErrorKind, Read, Write},
    mem,
};

use log::trace;

/// Smallest byte block requested from the underlying reader on each pull.
const MIN_BLOCK_SIZE: usize = 64;

/// A stream of decoded characters a record channel reads from or writes to.
///
/// Implementations may block. A `read` returns at most `max_chars` characters
/// and only returns an empty string once the end of the stream is reached,
/// after which `has_reached_end` reports `true`.
pub trait CharacterSource {
    /// Reads up to `max_chars` characters.
    fn read(&mut self, max_chars: usize) -> io::Result<String>;

    /// Whether the stream is known to be exhausted.
    fn has_reached_end(&self) -> bool;

    /// Writes `content[offset..]` and returns the number of bytes written.
    fn write(&mut self, content: &str, offset: usize) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()>;
}

fn closed_error() -> io::Error {
    io::Error::other("character channel is closed")
}

/// Decodes UTF-8 text from any [`Read`] implementation.
///
/// Multi-byte sequences split across two underlying reads are held back until
/// the rest of the sequence arrives.
///
/// # Examples
///
/// ```
/// use record_channel_rs::channel::character::{CharacterReader, CharacterSource};
///
/// let mut reader = CharacterReader::new("héllo".as_bytes());
/// assert_eq!(reader.read(2).unwrap(), "hé");
/// assert_eq!(reader.read(10).unwrap(), "llo");
/// assert_eq!(reader.read(10).unwrap(), "");
/// assert!(reader.has_reached_end());
/// ```
pub struct CharacterReader<R> {
    inner: R,
    undecoded: Vec<u8>,
    decoded: String,
    eof: bool,
    closed: bool,
}

impl<R: Read> CharacterReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            undecoded: Vec::new(),
            decoded: String::new(),
            eof: false,
            closed: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Pulls blocks from the inner reader until at least one character is
    /// decoded or the inner reader is exhausted.
    fn fill(&mut self, max_chars: usize) -> io::Result<()> {
        let mut block = vec![0u8; max_chars.max(MIN_BLOCK_SIZE)];

        while self.decoded.is_empty() && !self.eof {
            let count = match self.inner.read(&mut block) {
                Ok(count) => count,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            };

            if count == 0 {
                self.eof = true;
                if !self.undecoded.is_empty() {
                    return Err(io::Error::new(
                        ErrorKind::InvalidData,
                        "stream ended inside a multi-byte character",
                    ));
                }
                break;
            }

            trace!("Pulled {} bytes from character stream", count);
            self.undecoded.extend_from_slice(&block[..count]);
            self.decode()?;
        }

        Ok(())
    }

    fn decode(&mut self) -> io::Result<()> {
        match std::str::from_utf8(&self.undecoded) {
            Ok(text) => {
                self.decoded.push_str(text);
                self.undecoded.clear();
            }
            Err(error) => {
                if error.error_len().is_some() {
                    return Err(io::Error::new(ErrorKind::InvalidData, error));
                }
                // Incomplete trailing sequence: keep it for the next block.
                let valid = error.valid_up_to();
                let text = std::str::from_utf8(&self.undecoded[..valid])
                    .map_err(|error| io::Error::new(ErrorKind::InvalidData, error))?;
                self.decoded.push_str(text);
                self.undecoded.drain(..valid);
            }
        }
        Ok(())
    }

    fn take_chars(&mut self, max_chars: usize) -> String {
        match self.decoded.char_indices().nth(max_chars) {
            Some((index, _)) => {
                let rest = self.decoded.split_off(index);
                mem::replace(&mut self.decoded, rest)
            }
            None => mem::take(&mut self.decoded),
        }
    }
}

impl<R: Read> CharacterSource for CharacterReader<R> {
    fn read(&mut self, max_chars: usize) -> io::Result<String> {
        if self.closed {
            return Err(closed_error());
        }
        let max_chars = max_chars.max(1);
        if self.decoded.is_empty() {
            self.fill(max_chars)?;
        }
        Ok(self.take_chars(max_chars))
    }

    fn has_reached_end(&self) -> bool {
        self.eof && self.decoded.is_empty()
    }

    fn write(&mut self, _content: &str, _offset: usize) -> io::Result<usize> {
        Err(io::Error::new(
            ErrorKind::Unsupported,
            "character channel is not writable",
        ))
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        self.closed = true;
        self.decoded.clear();
        self.undecoded.clear();
        Ok(())
    }
}

/// Encodes text as UTF-8 into any [`Write`] implementation.
pub struct CharacterWriter<W: Write> {
    inner: W,
    closed: bool,
}

impl<W: Write> CharacterWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> CharacterSource for CharacterWriter<W> {
    fn read(&mut self, _max_chars: usize) -> io::Result<String> {
        Err(io::Error::new(
            ErrorKind::Unsupported,
            "character channel is not readable",
        ))
    }

    fn has_reached_end(&self) -> bool {
        false
    }

    fn write(&mut self, content: &str, offset: usize) -> io::Result<usize> {
        if self.closed {
            return Err(closed_error());
        }
        let pending = content.get(offset..).ok_or_else(|| {
            io::Error::new(
                ErrorKind::InvalidInput,
                format!("offset {} is not a character boundary", offset),
            )
        })?;
        self.inner.write_all(pending.as_bytes())?;
        Ok(pending.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        self.inner.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        self.inner.flush()?;
        self.closed = true;
        Ok(())
    }
}
