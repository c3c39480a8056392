use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

/// Executable used when no override is configured
pub const DEFAULT_ADB: &str = "adb";

/// Which device adb should talk to
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Let adb decide (`$ANDROID_SERIAL` or the only device)
    #[default]
    Any,
    /// The single USB device (`-d`)
    Usb,
    /// The single TCP/IP device or emulator (`-e`)
    Tcp,
    /// The device with this serial (`-s <serial>`)
    Serial(String),
}

impl DeviceSelector {
    /// Global adb flags for this selector
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::Any => Vec::new(),
            Self::Usb => vec!["-d".to_string()],
            Self::Tcp => vec!["-e".to_string()],
            Self::Serial(serial) => vec!["-s".to_string(), serial.clone()],
        }
    }
}

/// Handle for invoking adb against one device
#[derive(Clone, Debug)]
pub struct Adb {
    program: String,
    selector: DeviceSelector,
}

impl Adb {
    pub fn new(program: impl Into<String>, selector: DeviceSelector) -> Self {
        Self {
            program: program.into(),
            selector,
        }
    }

    /// Build an adb command with the selector flags followed by `args`
    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.selector.args())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.selector.args());
        parts.extend(args.iter().map(|s| s.to_string()));
        parts.join(" ")
    }

    /// Start `adb logcat`; its stdout is the live log stream
    pub fn logcat(&self) -> Result<LogcatProcess> {
        let description = self.describe(&["logcat"]);
        tracing::info!("Spawning: {}", description);

        let mut child = self
            .command(&["logcat"])
            .spawn()
            .with_context(|| format!("Failed to start '{}'", description))?;
        tracing::debug!("logcat started with PID: {:?}", child.id());

        let stdout = child
            .stdout
            .take()
            .context("logcat stdout was not captured")?;

        Ok(LogcatProcess {
            child,
            stdout: Some(stdout),
            description,
        })
    }

    /// Run `adb shell ps` to completion and return its output lines
    pub async fn list_processes(&self) -> Result<Vec<String>> {
        let args = ["shell", "ps"];
        let description = self.describe(&args);
        tracing::info!("Running: {}", description);

        let mut child = self
            .command(&args)
            .spawn()
            .with_context(|| format!("Failed to start '{}'", description))?;
        let stdout = child
            .stdout
            .take()
            .context("process listing stdout was not captured")?;

        let mut lines = BufReader::new(stdout).lines();
        let mut rows = Vec::new();
        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("Failed to read output of '{}'", description))?
        {
            rows.push(line);
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for '{}'", description))?;
        check_status(&description, status)?;

        tracing::debug!("process listing returned {} rows", rows.len());
        Ok(rows)
    }
}

impl Default for Adb {
    fn default() -> Self {
        Self::new(DEFAULT_ADB, DeviceSelector::Any)
    }
}

/// A running `adb logcat`; the process is killed when this is dropped
pub struct LogcatProcess {
    child: Child,
    stdout: Option<ChildStdout>,
    description: String,
}

impl LogcatProcess {
    /// Take the log stream; `None` if it was already taken
    pub fn stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Wait for adb to exit; a non-zero exit is an error
    pub async fn wait(mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for '{}'", self.description))?;
        check_status(&self.description, status)
    }
}

fn check_status(description: &str, status: ExitStatus) -> Result<()> {
    if !status.success() {
        bail!("'{}' exited with {}", description, status);
    }
    tracing::debug!("'{}' exited successfully", description);
    Ok(())
}
