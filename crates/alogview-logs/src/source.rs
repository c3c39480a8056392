use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::parser::{LineParser, is_session_marker};
use alogview_types::LogRecord;

/// Counters reported when a source is exhausted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub forwarded: u64,
    pub malformed: u64,
    pub markers: u64,
    /// The pipeline stopped accepting records before the input ended
    pub downstream_closed: bool,
}

/// Turns a raw logcat byte stream into records for the first pipeline stage
#[derive(Clone, Debug, Default)]
pub struct LineSource {
    parser: LineParser,
}

impl LineSource {
    pub fn new(parser: LineParser) -> Self {
        Self { parser }
    }

    /// Read `reader` to the end, forwarding every parsable line to `tx`
    ///
    /// Buffer markers are dropped silently, unparsable lines with a warning.
    /// Returns early (without error) once the receiving side is gone. `tx` is
    /// dropped on return, which lets the downstream stages drain and stop.
    pub async fn pump<R>(&self, reader: R, tx: mpsc::Sender<LogRecord>) -> io::Result<SourceStats>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut stats = SourceStats::default();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(trim_line_ending(&buf));
            if is_session_marker(&line) {
                stats.markers += 1;
                continue;
            }

            let record = match self.parser.parse(&line) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("{}", e);
                    stats.malformed += 1;
                    continue;
                }
            };

            if tx.send(record).await.is_err() {
                tracing::debug!("pipeline closed, stopping log source");
                stats.downstream_closed = true;
                break;
            }
            stats.forwarded += 1;
        }

        Ok(stats)
    }
}

fn trim_line_ending(mut line: &[u8]) -> &[u8] {
    if let [rest @ .., b'\n'] = line {
        line = rest;
    }
    if let [rest @ .., b'\r'] = line {
        line = rest;
    }
    line
}
