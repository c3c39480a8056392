//! Run configuration assembled from the command line, the environment, and
//! an optional TOML file

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use alogview_adb::{DEFAULT_ADB, DeviceSelector};
use alogview_logs::DEFAULT_SUPERVISOR_TAG;

use crate::Args;

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Path or name of the adb executable
    pub adb: Option<String>,

    /// Tag of the process lifecycle announcements
    pub supervisor_tag: Option<String>,

    /// Colourise output by level
    pub color: Option<bool>,

    /// Tags always shown, in addition to any given with `-t`
    pub tags: Vec<String>,
}

impl FileConfig {
    /// `$XDG_CONFIG_HOME/alogview/config.toml` or the platform equivalent
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("alogview").join("config.toml"))
    }

    /// Load the explicitly given file, or the default one if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}

/// The environment variables alogview honours
#[derive(Debug, Default, Clone)]
pub struct Environment {
    /// `$ADB`
    pub adb: Option<String>,

    /// `$NO_COLOR` is set (to anything)
    pub no_color: bool,
}

impl Environment {
    pub fn capture() -> Self {
        Self {
            adb: std::env::var_os("ADB").map(|v| v.to_string_lossy().into_owned()),
            no_color: std::env::var_os("NO_COLOR").is_some(),
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub adb: String,
    pub selector: DeviceSelector,
    pub supervisor_tag: String,
    pub color: bool,
    pub tags: HashSet<String>,
    pub packages: HashSet<String>,
}

impl Settings {
    /// Merge the sources; command line beats environment beats file
    pub fn resolve(args: &Args, env: &Environment, file: FileConfig) -> Result<Self> {
        let adb = match &env.adb {
            Some(adb) if adb.is_empty() => {
                bail!("ADB environment variable must not be set to an empty string")
            }
            Some(adb) => adb.clone(),
            None => file.adb.unwrap_or_else(|| DEFAULT_ADB.to_string()),
        };

        let selector = if let Some(serial) = &args.serial {
            DeviceSelector::Serial(serial.clone())
        } else if args.usb {
            DeviceSelector::Usb
        } else if args.tcp {
            DeviceSelector::Tcp
        } else {
            DeviceSelector::Any
        };

        let supervisor_tag = args
            .supervisor_tag
            .clone()
            .or(file.supervisor_tag)
            .unwrap_or_else(|| DEFAULT_SUPERVISOR_TAG.to_string());

        let color = !args.no_color && !env.no_color && file.color.unwrap_or(true);

        let tags = file.tags.into_iter().chain(args.tags.iter().cloned()).collect();
        let packages = args.packages.iter().cloned().collect();

        Ok(Self {
            adb,
            selector,
            supervisor_tag,
            color,
            tags,
            packages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("alogview").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings =
            Settings::resolve(&args(&[]), &Environment::default(), FileConfig::default()).unwrap();

        assert_eq!(settings.adb, "adb");
        assert_eq!(settings.selector, DeviceSelector::Any);
        assert_eq!(settings.supervisor_tag, "ActivityManager");
        assert!(settings.color);
        assert!(settings.tags.is_empty());
        assert!(settings.packages.is_empty());
    }

    #[test]
    fn test_cli_selection() {
        let settings = Settings::resolve(
            &args(&["-s", "emulator-5554", "-t", "A", "-t", "B", "com.foo", "com.bar"]),
            &Environment::default(),
            FileConfig::default(),
        )
        .unwrap();

        assert_eq!(settings.selector, DeviceSelector::Serial("emulator-5554".to_string()));
        assert_eq!(settings.tags, HashSet::from(["A".to_string(), "B".to_string()]));
        assert_eq!(
            settings.packages,
            HashSet::from(["com.foo".to_string(), "com.bar".to_string()])
        );
    }

    #[test]
    fn test_precedence() {
        let file: FileConfig = toml::from_str(
            r#"
            adb = "/opt/sdk/platform-tools/adb"
            supervisor_tag = "FromFile"
            color = true
            tags = ["FileTag"]
            "#,
        )
        .unwrap();
        let env = Environment {
            adb: Some("/usr/local/bin/adb".to_string()),
            no_color: true,
        };

        let settings =
            Settings::resolve(&args(&["--supervisor-tag", "FromCli", "-t", "CliTag"]), &env, file)
                .unwrap();

        assert_eq!(settings.adb, "/usr/local/bin/adb");
        assert_eq!(settings.supervisor_tag, "FromCli");
        assert!(!settings.color);
        assert_eq!(settings.tags, HashSet::from(["FileTag".to_string(), "CliTag".to_string()]));
    }

    #[test]
    fn test_file_values_used_without_overrides() {
        let file = FileConfig {
            adb: Some("/opt/adb".to_string()),
            supervisor_tag: Some("Supervisor".to_string()),
            color: Some(false),
            tags: Vec::new(),
        };

        let settings = Settings::resolve(&args(&["-d"]), &Environment::default(), file).unwrap();

        assert_eq!(settings.adb, "/opt/adb");
        assert_eq!(settings.supervisor_tag, "Supervisor");
        assert_eq!(settings.selector, DeviceSelector::Usb);
        assert!(!settings.color);
    }

    #[test]
    fn test_empty_adb_env_is_rejected() {
        let env = Environment {
            adb: Some(String::new()),
            no_color: false,
        };
        let err = Settings::resolve(&args(&[]), &env, FileConfig::default()).unwrap_err();

        assert!(err.to_string().contains("must not be set to an empty string"));
    }

    #[test]
    fn test_unknown_config_key_is_rejected() {
        assert!(toml::from_str::<FileConfig>("colour = false").is_err());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let path = Path::new("/nonexistent/alogview/config.toml");
        let err = FileConfig::load(Some(path)).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
