use std::collections::HashSet;

use regex::Regex;

/// `${user} ${pid} ${ppid} ${vsz} ${rss} ${wchan} ${addr} ${s} ${name}`;
/// the name runs to the end of the line
const PS_LINE_PATTERN: &str = r"\w+\s+(\d+)\s+\d+\s+\d+\s+\d+\s+\w+\s+\w+\s+[A-Z]\s+(.*)$";

/// One-shot snapshot of which running processes belong to a set of packages
#[derive(Clone, Debug)]
pub struct ProcessCensus {
    row: Regex,
}

impl ProcessCensus {
    /// Compile the process listing grammar
    pub fn new() -> Self {
        Self {
            row: Regex::new(PS_LINE_PATTERN).expect("process listing grammar is a valid regex"),
        }
    }

    /// Collect the pids of every listed process whose name is one of `packages`
    ///
    /// Header lines and rows that do not fit the listing grammar are skipped.
    pub fn count<I, S>(&self, lines: I, packages: &HashSet<String>) -> HashSet<u32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pids = HashSet::new();

        for line in lines {
            let line = line.as_ref();
            let Some(caps) = self.row.captures(line) else {
                tracing::trace!("skipping process listing row {:?}", line);
                continue;
            };

            if !packages.contains(&caps[2]) {
                continue;
            }

            match caps[1].parse::<u32>() {
                Ok(pid) => {
                    pids.insert(pid);
                }
                Err(e) => tracing::debug!("skipping process row with bad pid {:?}: {}", line, e),
            }
        }

        if pids.is_empty() {
            tracing::warn!("no running process matches the given package(s)");
        } else {
            tracing::debug!("census found {} matching process(es)", pids.len());
        }

        pids
    }
}

impl Default for ProcessCensus {
    fn default() -> Self {
        Self::new()
    }
}
