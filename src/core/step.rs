use std::time::{Duration, Instant};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    item::{ItemProcessor, ItemReader, ItemWriter},
};

/// Status of a chunk read from an `ItemReader`.
#[derive(Debug, PartialEq)]
pub enum ChunkStatus {
    /// The chunk holds `chunk_size` items and the reader may have more.
    Full,
    /// The reader is exhausted.
    Finished,
}

/// Status of a step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Created but not finished yet.
    Starting,
    /// Completed without exceeding the skip limit.
    Success,
    /// Read failures exceeded the skip limit.
    ReadError,
    /// Processing failures exceeded the skip limit.
    ProcessorError,
    /// A chunk could not be written.
    WriteError,
    /// A tasklet returned an error, or the writer failed to open.
    Failed,
}

/// Execution record of a single step: identity, timing, status and counters.
#[derive(Debug)]
pub struct StepExecution {
    /// Unique identifier for this step instance
    pub id: Uuid,
    /// Human-readable name for the step
    pub name: String,
    /// Current status of the step execution
    pub status: StepStatus,
    /// When the step started running
    pub start_time: Instant,
    /// When the step finished, successfully or not
    pub end_time: Instant,
    /// `end_time - start_time`
    pub duration: Duration,
    /// Number of items successfully read
    pub read_count: usize,
    /// Number of items successfully written
    pub write_count: usize,
    /// Number of errors encountered during reading
    pub read_error_count: usize,
    /// Number of errors encountered during processing
    pub process_error_count: usize,
    /// Number of errors encountered during writing
    pub write_error_count: usize,
}

impl StepExecution {
    /// A fresh record in the `Starting` status with every counter at zero.
    pub fn new(name: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: StepStatus::Starting,
            start_time: now,
            end_time: now,
            duration: Duration::ZERO,
            read_count: 0,
            write_count: 0,
            read_error_count: 0,
            process_error_count: 0,
            write_error_count: 0,
        }
    }
}

/// An independent, sequential phase of a job.
pub trait Step {
    fn get_name(&self) -> &str;

    /// Executes the step, recording its progress into `step_execution`.
    ///
    /// # Returns
    /// - `Ok(())`: the step completed successfully
    /// - `Err(BatchError)`: the step failed; `step_execution.status` tells where
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError>;
}

/// Tells a `TaskletStep` whether its tasklet wants to be called again.
#[derive(Debug, PartialEq)]
pub enum RepeatStatus {
    /// The tasklet can continue to execute.
    Continuable,
    /// The tasklet has finished executing.
    Finished,
}

/// A single-task unit of work that does not follow the read/process/write
/// pattern (building a report, writing a findings file, ...).
pub trait Tasklet {
    fn execute(&self, step_execution: &StepExecution) -> Result<RepeatStatus, BatchError>;
}

/// Step that runs a tasklet until it reports `RepeatStatus::Finished`.
pub struct TaskletStep<'a> {
    name: String,
    tasklet: &'a dyn Tasklet,
}

impl Step for TaskletStep<'_> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();
        info!("Start of step: {}, id: {}", step_execution.name, step_execution.id);

        let result = loop {
            match self.tasklet.execute(step_execution) {
                Ok(RepeatStatus::Finished) => break Ok(()),
                Ok(RepeatStatus::Continuable) => debug!("Tasklet {} continues", self.name),
                Err(error) => break Err(error),
            }
        };

        step_execution.status = if result.is_ok() {
            StepStatus::Success
        } else {
            StepStatus::Failed
        };
        step_execution.start_time = start_time;
        step_execution.end_time = Instant::now();
        step_execution.duration = start_time.elapsed();

        info!("End of step: {}, id: {}", step_execution.name, step_execution.id);

        result
    }
}

/// Builder for [`TaskletStep`], usually reached through
/// [`StepBuilder::tasklet`].
pub struct TaskletBuilder<'a> {
    name: String,
    tasklet: Option<&'a dyn Tasklet>,
}

impl<'a> TaskletBuilder<'a> {
    /// Starts a tasklet step called `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tasklet: None,
        }
    }

    /// Sets the tasklet the step runs.
    pub fn tasklet(mut self, tasklet: &'a dyn Tasklet) -> Self {
        self.tasklet = Some(tasklet);
        self
    }

    /// Builds the step.
    ///
    /// # Errors
    /// `BatchError::Configuration` when no tasklet was set.
    pub fn build(self) -> Result<TaskletStep<'a>, BatchError> {
        let tasklet = self.tasklet.ok_or_else(|| {
            BatchError::Configuration(format!("step {} has no tasklet", self.name))
        })?;

        Ok(TaskletStep {
            name: self.name,
            tasklet,
        })
    }
}

/// Step reading items in chunks, processing each item and writing every
/// chunk at once.
pub struct ChunkOrientedStep<'a, I, O> {
    name: String,
    /// Component responsible for reading items from the source
    reader: &'a dyn ItemReader<I>,
    /// Component responsible for processing items
    processor: &'a dyn ItemProcessor<I, O>,
    /// Component responsible for writing items to the destination
    writer: &'a dyn ItemWriter<O>,
    /// Number of items to process in each chunk
    chunk_size: u16,
    /// Maximum number of errors allowed before failing the step
    skip_limit: u16,
}

impl<I, O> Step for ChunkOrientedStep<'_, I, O> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Instant::now();
        step_execution.status = StepStatus::Starting;

        info!("Start of step: {}, id: {}", step_execution.name, step_execution.id);

        let result = self
            .writer
            .open()
            .and_then(|()| self.run_chunks(step_execution));

        // The writer is closed even when a chunk failed, its error only logged.
        Self::manage_error(self.writer.close());

        if result.is_ok() {
            step_execution.status = StepStatus::Success;
        } else if step_execution.status == StepStatus::Starting {
            step_execution.status = StepStatus::Failed;
        }

        info!("End of step: {}, id: {}", step_execution.name, step_execution.id);

        step_execution.start_time = start_time;
        step_execution.end_time = Instant::now();
        step_execution.duration = start_time.elapsed();

        result
    }
}

impl<I, O> ChunkOrientedStep<'_, I, O> {
    fn run_chunks(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        loop {
            let (read_items, chunk_status) = self.read_chunk(step_execution)?;

            let processed_items = self.process_chunk(step_execution, &read_items)?;

            self.write_chunk(step_execution, &processed_items)?;

            if chunk_status == ChunkStatus::Finished {
                return Ok(());
            }
        }
    }

    /// Reads up to `chunk_size` items from the reader.
    ///
    /// Stops when the chunk is full, the reader is exhausted, or the skip
    /// limit is exceeded.
    fn read_chunk(
        &self,
        step_execution: &mut StepExecution,
    ) -> Result<(Vec<I>, ChunkStatus), BatchError> {
        debug!("Start reading chunk");

        let mut read_items = Vec::with_capacity(self.chunk_size as usize);

        loop {
            match self.reader.read() {
                Ok(Some(item)) => {
                    read_items.push(item);
                    step_execution.read_count += 1;

                    if read_items.len() >= self.chunk_size as usize {
                        return Ok((read_items, ChunkStatus::Full));
                    }
                }
                Ok(None) => return Ok((read_items, ChunkStatus::Finished)),
                Err(error) => {
                    warn!("Error reading item: {}", error);
                    step_execution.read_error_count += 1;

                    if self.is_skip_limit_reached(step_execution) {
                        step_execution.status = StepStatus::ReadError;
                        return Err(error);
                    }
                }
            }
        }
    }

    fn process_chunk(
        &self,
        step_execution: &mut StepExecution,
        read_items: &[I],
    ) -> Result<Vec<O>, BatchError> {
        debug!("Processing chunk of {} items", read_items.len());
        let mut result = Vec::with_capacity(read_items.len());

        for item in read_items {
            match self.processor.process(item) {
                Ok(processed_item) => result.push(processed_item),
                Err(error) => {
                    warn!("Error processing item: {}", error);
                    step_execution.process_error_count += 1;

                    if self.is_skip_limit_reached(step_execution) {
                        step_execution.status = StepStatus::ProcessorError;
                        return Err(error);
                    }
                }
            }
        }

        Ok(result)
    }

    fn write_chunk(
        &self,
        step_execution: &mut StepExecution,
        processed_items: &[O],
    ) -> Result<(), BatchError> {
        if processed_items.is_empty() {
            debug!("No items to write, skipping write call");
            return Ok(());
        }

        debug!("Writing chunk of {} items", processed_items.len());

        match self.writer.write(processed_items) {
            Ok(()) => {
                step_execution.write_count += processed_items.len();
                self.writer.flush()
            }
            Err(error) => {
                warn!("Error writing items: {}", error);
                step_execution.write_error_count += processed_items.len();

                if self.is_skip_limit_reached(step_execution) {
                    step_execution.status = StepStatus::WriteError;
                    return Err(error);
                }
                Ok(())
            }
        }
    }

    fn is_skip_limit_reached(&self, step_execution: &StepExecution) -> bool {
        step_execution.read_error_count
            + step_execution.write_error_count
            + step_execution.process_error_count
            > self.skip_limit.into()
    }

    fn manage_error(result: Result<(), BatchError>) {
        if let Err(error) = result {
            warn!("Non-fatal error: {}", error);
        }
    }
}

/// Builder for [`ChunkOrientedStep`], usually reached through
/// [`StepBuilder::chunk`]. Chunks default to 10 items and the skip limit to 0.
pub struct ChunkOrientedStepBuilder<'a, I, O> {
    name: String,
    reader: Option<&'a dyn ItemReader<I>>,
    processor: Option<&'a dyn ItemProcessor<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: u16,
    skip_limit: u16,
}

impl<'a, I, O> ChunkOrientedStepBuilder<'a, I, O> {
    /// Starts a chunk step called `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reader: None,
            processor: None,
            writer: None,
            chunk_size: 10,
            skip_limit: 0,
        }
    }

    /// Source of the items.
    pub fn reader(mut self, reader: &'a dyn ItemReader<I>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Transformation applied to each item read.
    pub fn processor(mut self, processor: &'a dyn ItemProcessor<I, O>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Destination receiving each processed chunk.
    pub fn writer(mut self, writer: &'a dyn ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Items per chunk; 0 is raised to 1.
    pub fn chunk_size(mut self, chunk_size: u16) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Read or processing failures tolerated before the step fails.
    pub fn skip_limit(mut self, skip_limit: u16) -> Self {
        self.skip_limit = skip_limit;
        self
    }

    /// Builds the step.
    ///
    /// # Errors
    /// `BatchError::Configuration` when the reader, processor or writer is
    /// missing.
    pub fn build(self) -> Result<ChunkOrientedStep<'a, I, O>, BatchError> {
        let missing =
            |part: &str| BatchError::Configuration(format!("step {} has no {}", self.name, part));

        Ok(ChunkOrientedStep {
            reader: self.reader.ok_or_else(|| missing("reader"))?,
            processor: self.processor.ok_or_else(|| missing("processor"))?,
            writer: self.writer.ok_or_else(|| missing("writer"))?,
            name: self.name,
            chunk_size: self.chunk_size,
            skip_limit: self.skip_limit,
        })
    }
}

/// Entry point for building either kind of step.
///
/// ```
/// use ecommerce_batch::core::item::PassThroughProcessor;
/// use ecommerce_batch::core::step::StepBuilder;
/// # use ecommerce_batch::core::item::{ItemReader, ItemReaderResult, ItemWriter, ItemWriterResult};
/// # struct Empty;
/// # impl ItemReader<u32> for Empty { fn read(&self) -> ItemReaderResult<u32> { Ok(None) } }
/// # impl ItemWriter<u32> for Empty { fn write(&self, _: &[u32]) -> ItemWriterResult { Ok(()) } }
/// # let (reader, writer) = (Empty, Empty);
/// let processor = PassThroughProcessor;
/// let step = StepBuilder::new("load-numbers")
///     .chunk::<u32, u32>(100)
///     .reader(&reader)
///     .processor(&processor)
///     .writer(&writer)
///     .build()
///     .unwrap();
/// ```
pub struct StepBuilder {
    name: String,
}

impl StepBuilder {
    /// Starts a step called `name`; the name keys the step's execution record.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Builder with a random name, for throwaway steps.
    pub fn unnamed() -> Self {
        Self::new(&build_name())
    }

    /// Continues as a tasklet step running `tasklet`.
    pub fn tasklet<'a>(self, tasklet: &'a dyn Tasklet) -> TaskletBuilder<'a> {
        TaskletBuilder::new(&self.name).tasklet(tasklet)
    }

    /// Continues as a chunk step reading `I` and writing `O` in chunks of
    /// `chunk_size` items.
    pub fn chunk<'a, I, O>(self, chunk_size: u16) -> ChunkOrientedStepBuilder<'a, I, O> {
        ChunkOrientedStepBuilder::new(&self.name).chunk_size(chunk_size)
    }
}
