//! Log processing for alogview
//!
//! This crate provides logcat line parsing, the process census used to seed
//! package filtering, the tag and package filters, and the task-per-stage
//! pipeline that strings them together.

mod census;
mod error;
mod filter;
mod parser;
mod pipeline;
mod source;

pub use census::ProcessCensus;
pub use error::ParseError;
pub use filter::{LifecycleGrammar, LogFilter, PackageFilter, TagFilter, DEFAULT_SUPERVISOR_TAG};
pub use parser::{LineParser, is_session_marker};
pub use pipeline::{FilterChain, Pipeline, STAGE_CAPACITY, stage_channel};
pub use source::{LineSource, SourceStats};

// Re-export types used in our public API
pub use alogview_types::{LogLevel, LogRecord};
