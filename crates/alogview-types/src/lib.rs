//! Shared types for alogview
//!
//! This crate contains the log record model used by the parser, the filters,
//! and the renderer.

use crossterm::style::Color;

// ============================================================================
// Log Types
// ============================================================================

/// Logcat priority level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parse the single-letter priority used by logcat (`V D I W E F`)
    pub fn from_letter(s: &str) -> Option<Self> {
        match s {
            "V" => Some(Self::Verbose),
            "D" => Some(Self::Debug),
            "I" => Some(Self::Info),
            "W" => Some(Self::Warn),
            "E" => Some(Self::Error),
            "F" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Get display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Verbose => Color::White,
            Self::Debug => Color::Cyan,
            Self::Info => Color::Green,
            Self::Warn => Color::Yellow,
            Self::Error => Color::Red,
            Self::Fatal => Color::Magenta,
        }
    }
}

/// A single parsed logcat line
///
/// Records are built once by the parser and only ever read afterwards;
/// filters receive them by shared reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Original raw log line
    pub raw: String,

    /// `MM-DD HH:MM:SS.mmm`, kept verbatim
    pub timestamp: String,

    /// Process id of the emitter
    pub pid: u32,

    /// Thread id of the emitter
    pub tid: u32,

    pub level: LogLevel,

    /// Tag with surrounding whitespace trimmed (may be empty)
    pub tag: String,

    pub message: String,
}

impl LogRecord {
    /// Whether this record was emitted under `tag` at info level
    pub fn is_info_from(&self, tag: &str) -> bool {
        self.level == LogLevel::Info && self.tag == tag
    }
}
