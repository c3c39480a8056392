//! Terminal output for filtered records

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Print, ResetColor, SetForegroundColor};
use tokio::sync::mpsc;

use alogview_types::LogRecord;

/// Writes records' raw lines, coloured by level
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    /// Write one record and flush, so lines show up as they arrive
    pub fn render(&mut self, record: &LogRecord) -> io::Result<()> {
        if self.color {
            queue!(
                self.out,
                SetForegroundColor(record.level.color()),
                Print(&record.raw),
                ResetColor,
                Print("\n")
            )?;
        } else {
            writeln!(self.out, "{}", record.raw)?;
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// Render everything arriving on `records` until the pipeline closes
///
/// Blocks the calling thread; run it on a blocking task. A closed stdout
/// (e.g. piping into `head`) ends rendering without an error.
pub fn drain<W: Write>(
    mut records: mpsc::Receiver<LogRecord>,
    mut renderer: Renderer<W>,
) -> io::Result<u64> {
    let mut rendered = 0;

    while let Some(record) = records.blocking_recv() {
        match renderer.render(&record) {
            Ok(()) => rendered += 1,
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("stdout closed after {} lines", rendered);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alogview_logs::LineParser;

    fn record(line: &str) -> LogRecord {
        LineParser::new().parse(line).unwrap()
    }

    #[test]
    fn test_plain_output_is_raw_line() {
        let line = "10-24 22:14:41.150 123 123 E Tag: boom";
        let mut renderer = Renderer::new(Vec::new(), false);
        renderer.render(&record(line)).unwrap();

        assert_eq!(String::from_utf8(renderer.into_inner()).unwrap(), format!("{line}\n"));
    }

    #[test]
    fn test_colored_output_wraps_raw_line() {
        let line = "10-24 22:14:41.150 123 123 I Tag: hello";
        let mut renderer = Renderer::new(Vec::new(), true);
        renderer.render(&record(line)).unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.starts_with("\x1b["));
        assert!(out.contains(line));
        assert!(out.ends_with("\x1b[0m\n"));
    }

    #[test]
    fn test_levels_get_distinct_colors() {
        let render = |level: &str| {
            let mut renderer = Renderer::new(Vec::new(), true);
            renderer
                .render(&record(&format!("10-24 22:14:41.150 1 1 {level} Tag: x")))
                .unwrap();
            renderer.into_inner()
        };

        assert_ne!(render("D"), render("E"));
        assert_ne!(render("W"), render("F"));
    }

    /// A writer whose reader has gone away
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_drain_stops_quietly_on_broken_pipe() {
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(record("10-24 22:14:41.150 1 1 D Tag: one")).unwrap();
        tx.try_send(record("10-24 22:14:41.150 1 1 D Tag: two")).unwrap();
        drop(tx);

        let rendered = drain(rx, Renderer::new(ClosedPipe, false)).unwrap();
        assert_eq!(rendered, 0);
    }

    #[test]
    fn test_drain_renders_until_closed() {
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(record("10-24 22:14:41.150 1 1 D Tag: one")).unwrap();
        tx.try_send(record("10-24 22:14:41.150 1 1 D Tag: two")).unwrap();
        drop(tx);

        let rendered = drain(rx, Renderer::new(Vec::new(), false)).unwrap();
        assert_eq!(rendered, 2);
    }
}
