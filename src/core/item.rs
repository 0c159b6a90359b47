use crate::error::BatchError;

/// Represents the result of reading an item from the reader.
///
/// - `Ok(Some(item))` when an item was read
/// - `Ok(None)` when the source is exhausted
/// - `Err(BatchError)` when reading failed
pub type ItemReaderResult<I> = Result<Option<I>, BatchError>;

/// Represents the result of processing an item.
pub type ItemProcessorResult<O> = Result<O, BatchError>;

/// Represents the result of writing a chunk of items.
pub type ItemWriterResult = Result<(), BatchError>;

/// A source of items, consumed one at a time by a chunk-oriented step.
pub trait ItemReader<I> {
    /// Reads the next item, or `Ok(None)` once the source is exhausted.
    fn read(&self) -> ItemReaderResult<I>;
}

/// Business logic applied to every item between reading and writing.
pub trait ItemProcessor<I, O> {
    fn process(&self, item: &I) -> ItemProcessorResult<O>;
}

/// A destination for chunks of items.
///
/// `open` is called once before the first chunk and `close` once after the
/// last one; `flush` is called after every successful `write`.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}

/// Processor that passes every item through unchanged.
#[derive(Default)]
pub struct PassThroughProcessor;

impl<I: Clone> ItemProcessor<I, I> for PassThroughProcessor {
    fn process(&self, item: &I) -> ItemProcessorResult<I> {
        Ok(item.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_through_processor_returns_a_copy() {
        let processor = PassThroughProcessor;
        let item = String::from("customers");

        let processed = processor.process(&item).unwrap();

        assert_eq!(processed, item);
    }
}
