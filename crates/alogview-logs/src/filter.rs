use std::collections::HashSet;

use regex::{Captures, Regex};

use alogview_types::LogRecord;

/// Tag under which the system process supervisor announces process lifecycle
pub const DEFAULT_SUPERVISOR_TAG: &str = "ActivityManager";

/// `Start proc ${pid}:${package}/${user} for ...`
const START_PATTERN: &str = r"Start proc (\d+):([A-Za-z0-9_.]+)/\w+";
/// `Process ${package} (pid ${pid}) has died: ${reason}`
const DIED_PATTERN: &str = r"Process ([A-Za-z0-9_.]+) \(pid (\d+)\) has died: .*$";
/// `Killing ${pid}:${package}/${user} (adj ${adj}): ${reason}`
const KILLED_PATTERN: &str = r"Killing (\d+):([A-Za-z0-9_.]+)/\w+ [^:]+: .*$";

/// A pipeline stage that decides, one record at a time, whether a record
/// continues downstream
pub trait LogFilter: Send + 'static {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Decide whether `record` passes; may update private state
    fn accept(&mut self, record: &LogRecord) -> bool;
}

// ============================================================================
// Tag filter
// ============================================================================

/// Passes records whose tag is in a fixed set
#[derive(Clone, Debug)]
pub struct TagFilter {
    tags: HashSet<String>,
}

impl TagFilter {
    pub fn new(tags: HashSet<String>) -> Self {
        Self { tags }
    }
}

impl LogFilter for TagFilter {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn accept(&mut self, record: &LogRecord) -> bool {
        self.tags.contains(&record.tag)
    }
}

// ============================================================================
// Package filter
// ============================================================================

/// A process lifecycle announcement extracted from a supervisor record
#[derive(Clone, Debug, PartialEq, Eq)]
enum Lifecycle<'a> {
    Start { pid: u32, package: &'a str },
    Died { pid: u32, package: &'a str },
    Killed { pid: u32, package: &'a str },
}

/// Compiled grammars for the supervisor's start/died/killed announcements
#[derive(Clone, Debug)]
pub struct LifecycleGrammar {
    supervisor_tag: String,
    start: Regex,
    died: Regex,
    killed: Regex,
}

impl LifecycleGrammar {
    pub fn new(supervisor_tag: impl Into<String>) -> Self {
        Self {
            supervisor_tag: supervisor_tag.into(),
            start: Regex::new(START_PATTERN).expect("start grammar is a valid regex"),
            died: Regex::new(DIED_PATTERN).expect("died grammar is a valid regex"),
            killed: Regex::new(KILLED_PATTERN).expect("killed grammar is a valid regex"),
        }
    }

    /// Match a supervisor message against start, died, then killed; the
    /// first grammar that matches wins
    fn classify<'a>(&self, message: &'a str) -> Option<Lifecycle<'a>> {
        if let Some(caps) = self.start.captures(message) {
            return Some(Lifecycle::Start {
                pid: captured_pid(&caps, 1),
                package: group(&caps, 2),
            });
        }
        if let Some(caps) = self.died.captures(message) {
            return Some(Lifecycle::Died {
                pid: captured_pid(&caps, 2),
                package: group(&caps, 1),
            });
        }
        if let Some(caps) = self.killed.captures(message) {
            return Some(Lifecycle::Killed {
                pid: captured_pid(&caps, 1),
                package: group(&caps, 2),
            });
        }
        None
    }
}

impl Default for LifecycleGrammar {
    fn default() -> Self {
        Self::new(DEFAULT_SUPERVISOR_TAG)
    }
}

fn group<'a>(caps: &Captures<'a>, index: usize) -> &'a str {
    caps.get(index).map_or("", |m| m.as_str())
}

/// The grammars only capture `\d+` here, so a failure means the patterns and
/// the extraction have drifted apart.
fn captured_pid(caps: &Captures<'_>, index: usize) -> u32 {
    let text = group(caps, index);
    match text.parse() {
        Ok(pid) => pid,
        Err(e) => panic!("lifecycle grammar captured an unparseable pid {text:?}: {e}"),
    }
}

/// Passes records that belong to one of a set of packages
///
/// Membership is by pid. The pid set is seeded from a process census and is
/// afterwards maintained from the supervisor's lifecycle announcements seen
/// in the stream itself.
#[derive(Clone, Debug)]
pub struct PackageFilter {
    grammar: LifecycleGrammar,
    packages: HashSet<String>,
    pids: HashSet<u32>,
}

impl PackageFilter {
    pub fn new(grammar: LifecycleGrammar, packages: HashSet<String>, pids: HashSet<u32>) -> Self {
        Self {
            grammar,
            packages,
            pids,
        }
    }

    /// Pids currently believed to belong to a tracked package
    pub fn tracked_pids(&self) -> &HashSet<u32> {
        &self.pids
    }

    /// Apply a lifecycle announcement; `true` if it concerned a tracked process
    fn observe(&mut self, event: Lifecycle<'_>) -> bool {
        match event {
            Lifecycle::Start { pid, package } => {
                if !self.packages.contains(package) {
                    return false;
                }
                tracing::debug!("tracking pid {} for {}", pid, package);
                self.pids.insert(pid);
                true
            }
            Lifecycle::Died { pid, package } | Lifecycle::Killed { pid, package } => {
                // A stale pid still counts, even under another package name
                if !self.packages.contains(package) && !self.pids.contains(&pid) {
                    return false;
                }
                tracing::debug!("untracking pid {} ({})", pid, package);
                self.pids.remove(&pid);
                true
            }
        }
    }
}

impl LogFilter for PackageFilter {
    fn name(&self) -> &'static str {
        "package"
    }

    fn accept(&mut self, record: &LogRecord) -> bool {
        if record.is_info_from(&self.grammar.supervisor_tag) {
            // A matched announcement decides on its own, tracked or not
            if let Some(event) = self.grammar.classify(&record.message) {
                return self.observe(event);
            }
        }

        self.pids.contains(&record.pid)
    }
}
