use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::filter::{LogFilter, PackageFilter, TagFilter};
use alogview_types::LogRecord;

/// Capacity of the hand-off between adjacent stages. One slot is the closest
/// tokio gets to a rendezvous: a producer can never be more than one record
/// ahead of its consumer.
pub const STAGE_CAPACITY: usize = 1;

/// Create the channel that connects two adjacent stages
pub fn stage_channel() -> (mpsc::Sender<LogRecord>, mpsc::Receiver<LogRecord>) {
    mpsc::channel(STAGE_CAPACITY)
}

/// An ordered series of filters, each run as its own task
#[derive(Default)]
pub struct Pipeline {
    filters: Vec<Box<dyn LogFilter>>,
}

impl Pipeline {
    /// Create an empty pipeline (passes every record)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter as the last stage
    pub fn push(&mut self, filter: impl LogFilter) {
        self.filters.push(Box::new(filter));
    }

    /// Builder-style `push`
    pub fn with(mut self, filter: impl LogFilter) -> Self {
        self.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Names of the stages in the order records visit them
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Spawn one task per filter, chained after `source`
    ///
    /// Returns the receiving end of the last stage together with the stage
    /// handles. With no filters the source itself is returned. Every stage
    /// drains its input before exiting once the source closes.
    pub fn spawn(
        self,
        source: mpsc::Receiver<LogRecord>,
    ) -> (mpsc::Receiver<LogRecord>, Vec<JoinHandle<()>>) {
        let mut input = source;
        let mut tasks = Vec::with_capacity(self.filters.len());

        for (index, filter) in self.filters.into_iter().enumerate() {
            let (tx, rx) = stage_channel();
            tasks.push(tokio::spawn(run_stage(index, filter, input, tx)));
            input = rx;
        }

        (input, tasks)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

async fn run_stage(
    index: usize,
    mut filter: Box<dyn LogFilter>,
    mut input: mpsc::Receiver<LogRecord>,
    output: mpsc::Sender<LogRecord>,
) {
    tracing::debug!("stage {} ({}) started", index, filter.name());
    let mut passed: u64 = 0;
    let mut dropped: u64 = 0;

    while let Some(record) = input.recv().await {
        if !filter.accept(&record) {
            dropped += 1;
            continue;
        }
        if output.send(record).await.is_err() {
            // Downstream went away, nothing left to deliver to
            break;
        }
        passed += 1;
    }

    tracing::debug!(
        "stage {} ({}) finished: {} passed, {} dropped",
        index,
        filter.name(),
        passed,
        dropped
    );
}

/// Assembles the user's filter selection into a pipeline
///
/// The tag filter always runs before the package filter; either is left out
/// when nothing was requested for it.
#[derive(Debug, Default)]
pub struct FilterChain {
    tags: HashSet<String>,
    packages: Option<PackageFilter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict output to these tags (an empty set means no tag filter)
    pub fn tags(mut self, tags: HashSet<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Restrict output to the packages tracked by `filter`
    pub fn packages(mut self, filter: PackageFilter) -> Self {
        self.packages = Some(filter);
        self
    }

    pub fn build(self) -> Pipeline {
        let mut pipeline = Pipeline::new();
        if !self.tags.is_empty() {
            pipeline.push(TagFilter::new(self.tags));
        }
        if let Some(filter) = self.packages {
            pipeline.push(filter);
        }

        tracing::debug!("filter order: {:?}", pipeline.stage_names());
        pipeline
    }
}
