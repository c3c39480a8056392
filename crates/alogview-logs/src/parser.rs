use regex::Regex;

use crate::error::ParseError;
use alogview_types::{LogLevel, LogRecord};

/// Prefix of the `--------- beginning of main` lines logcat prints when it
/// switches buffers
const SESSION_MARKER: &str = "--------- beginning of";

/// `${datetime} ${pid} ${tid} ${level}${tag}: ${message}` where the datetime
/// is `MM-DD hh:mm:ss.sss` and the tag may be missing
const LOG_LINE_PATTERN: &str =
    r"(\d\d-\d\d \d\d:\d\d:\d\d\.\d\d\d)\s+(\d+)\s+(\d+)\s+([VDIWEF])(.*?):\s+(.*)$";

/// Check whether a raw line is a buffer boundary marker rather than a log line
pub fn is_session_marker(line: &str) -> bool {
    line.starts_with(SESSION_MARKER)
}

/// Parser for logcat lines in the default `threadtime` format
#[derive(Clone, Debug)]
pub struct LineParser {
    line: Regex,
}

impl LineParser {
    /// Compile the line grammar
    pub fn new() -> Self {
        Self {
            line: Regex::new(LOG_LINE_PATTERN).expect("log line grammar is a valid regex"),
        }
    }

    /// Parse a raw log line into a LogRecord
    pub fn parse(&self, raw: &str) -> Result<LogRecord, ParseError> {
        let caps = self
            .line
            .captures(raw)
            .ok_or_else(|| ParseError::mismatch(raw))?;

        let pid = caps[2]
            .parse()
            .map_err(|e| ParseError::bad_number(raw, "pid", e))?;
        let tid = caps[3]
            .parse()
            .map_err(|e| ParseError::bad_number(raw, "tid", e))?;
        // The character class above only admits valid letters
        let level = LogLevel::from_letter(&caps[4]).ok_or_else(|| ParseError::mismatch(raw))?;

        Ok(LogRecord {
            raw: raw.to_string(),
            timestamp: caps[1].to_string(),
            pid,
            tid,
            level,
            tag: caps[5].trim().to_string(),
            message: caps[6].to_string(),
        })
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}
