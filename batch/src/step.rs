//! Chunk-oriented read, process, write steps.
//!
//! ```text
//! ┌────────┐  item  ┌───────────┐  Some(out)  ┌────────┐
//! │ Reader │───────▶│ Processor │────────────▶│ chunk  │──▶ Writer (every N items)
//! └────────┘        └───────────┘             └────────┘
//!                         │ None
//!                         ▼
//!                     filtered
//! ```

use crate::error::{BatchError, Result};
use async_trait::async_trait;
use serde::Serialize;

/// Supplies items one at a time until exhausted.
#[async_trait]
pub trait ItemReader<T>: Send {
    /// Next item, or `None` when the input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot be read.
    async fn read(&mut self) -> Result<Option<T>>;
}

/// Transforms one item. Returning `None` filters the item out.
#[async_trait]
pub trait ItemProcessor<I, O>: Send + Sync {
    /// Transform `item`.
    ///
    /// # Errors
    ///
    /// Returns error if the item cannot be processed.
    async fn process(&self, item: I) -> Result<Option<O>>;
}

/// Persists one chunk of items.
#[async_trait]
pub trait ItemWriter<T>: Send + Sync {
    /// Write a chunk.
    ///
    /// # Errors
    ///
    /// Returns error if the chunk cannot be written.
    async fn write(&self, items: &[T]) -> Result<()>;
}

/// Counters for one step run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StepExecution {
    /// Step name
    pub step_name: String,
    /// Items read
    pub read_count: u64,
    /// Items the processor dropped
    pub filter_count: u64,
    /// Items written
    pub write_count: u64,
    /// Chunks written
    pub commit_count: u64,
}

/// A step that processes items in fixed-size chunks.
#[derive(Clone, Debug)]
pub struct ChunkStep {
    name: String,
    chunk_size: usize,
}

impl ChunkStep {
    /// Create a step writing every `chunk_size` items (at least 1).
    #[must_use]
    pub fn new(name: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            name: name.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Items per chunk.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Drain `reader` through `processor` into `writer`.
    ///
    /// Chunks already written stay written if a later chunk fails.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::StepFailed`] on the first read, process or
    /// write failure.
    pub async fn execute<I, O>(
        &self,
        reader: &mut dyn ItemReader<I>,
        processor: &dyn ItemProcessor<I, O>,
        writer: &dyn ItemWriter<O>,
    ) -> Result<StepExecution>
    where
        I: Send,
        O: Send + Sync,
    {
        let mut execution = StepExecution {
            step_name: self.name.clone(),
            ..StepExecution::default()
        };
        let mut chunk = Vec::with_capacity(self.chunk_size);
        let mut exhausted = false;

        while !exhausted {
            while chunk.len() < self.chunk_size {
                let Some(item) = reader.read().await.map_err(|e| self.failed(&e))? else {
                    exhausted = true;
                    break;
                };
                execution.read_count += 1;
                match processor.process(item).await.map_err(|e| self.failed(&e))? {
                    Some(output) => chunk.push(output),
                    None => execution.filter_count += 1,
                }
            }

            if !chunk.is_empty() {
                writer.write(&chunk).await.map_err(|e| self.failed(&e))?;
                execution.write_count += chunk.len() as u64;
                execution.commit_count += 1;
                tracing::debug!(step = %self.name, items = chunk.len(), "Chunk written");
                chunk.clear();
            }
        }

        Ok(execution)
    }

    fn failed(&self, error: &BatchError) -> BatchError {
        match error {
            BatchError::StepFailed { .. } => error.clone(),
            other => BatchError::StepFailed {
                step: self.name.clone(),
                reason: other.to_string(),
            },
        }
    }
}
