//! Android Debug Bridge access for alogview
//!
//! This crate launches `adb logcat` for the live log stream and
//! `adb shell ps` for the process census, honouring the device selector.

mod client;

pub use client::{Adb, DeviceSelector, LogcatProcess, DEFAULT_ADB};
