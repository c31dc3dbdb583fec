use crate::error::ChannelError;

/// Result of reading one item: `Ok(None)` once the reader has no more items.
pub type ItemReaderResult<R> = Result<Option<R>, ChannelError>;

/// Retrieves input one item at a time.
pub trait ItemReader<R> {
    fn read(&self) -> ItemReaderResult<R>;
}

/// Sends output, one batch of items at a time.
pub trait ItemWriter<W> {
    fn write(&self, items: &[W]) -> Result<(), ChannelError>;

    fn flush(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn open(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn close(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
