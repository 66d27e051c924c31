// ABOUTME: Connection profile parsing and settings resolution for remexec.
// ABOUTME: Merges an optional remexec.yml profile with command-line overrides.

mod env_value;
mod init;
mod target;

pub use env_value::EnvValue;
pub use init::init_profile;
pub use target::Target;

use crate::error::{Error, Result};
use crate::ssh::{ConnectionConfig, LineMode};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "remexec.yml";
pub const CONFIG_FILENAME_ALT: &str = "remexec.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".remexec/config.yml";

/// A saved connection profile.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    /// `host`, `user@host`, `host:port`, or `user@host:port`.
    #[serde(deserialize_with = "deserialize_target")]
    pub host: Target,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub identity: Option<PathBuf>,

    #[serde(default)]
    pub password: Option<EnvValue>,

    #[serde(default)]
    pub line_mode: LineMode,

    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,

    #[serde(default)]
    pub working_path: Option<String>,
}

fn deserialize_target<'de, D>(deserializer: D) -> std::result::Result<Target, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Target::parse(&s).map_err(serde::de::Error::custom)
}

impl Profile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    /// Load an explicitly named profile.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Look for a profile in `dir`. A missing profile is not an error.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("using profile {}", path.display());
                return Self::load(path).map(Some);
            }
        }
        Ok(None)
    }
}

/// Values given on the command line. Each one replaces the profile's.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target: Option<Target>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub identity: Option<PathBuf>,
    /// Name of an environment variable holding the password.
    pub password_env: Option<String>,
    pub line_mode: Option<LineMode>,
    pub connect_timeout: Option<Duration>,
}

/// Fully merged settings. Host and credentials may still be missing;
/// the shell prompts for them when it can.
#[derive(Clone, Default)]
pub struct Settings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub identity: Option<PathBuf>,
    pub password: Option<String>,
    pub line_mode: LineMode,
    pub connect_timeout: Option<Duration>,
    pub working_path: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("identity", &self.identity)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("line_mode", &self.line_mode)
            .field("connect_timeout", &self.connect_timeout)
            .field("working_path", &self.working_path)
            .finish()
    }
}

impl Settings {
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        let password = profile
            .password
            .as_ref()
            .map(EnvValue::resolve)
            .transpose()?;

        Ok(Settings {
            host: Some(profile.host.host.clone()),
            port: profile.port.or(profile.host.port),
            user: profile.user.clone().or_else(|| profile.host.user.clone()),
            identity: profile.identity.clone(),
            password,
            line_mode: profile.line_mode,
            connect_timeout: profile.connect_timeout,
            working_path: profile.working_path.clone(),
        })
    }

    /// Apply command-line overrides on top of these settings.
    pub fn apply(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(target) = overrides.target {
            self.host = Some(target.host);
            if target.port.is_some() {
                self.port = target.port;
            }
            if target.user.is_some() {
                self.user = target.user;
            }
        }
        if overrides.port.is_some() {
            self.port = overrides.port;
        }
        if overrides.user.is_some() {
            self.user = overrides.user;
        }
        if overrides.identity.is_some() {
            self.identity = overrides.identity;
        }
        if let Some(var) = overrides.password_env {
            self.password = Some(EnvValue::from_env(var).resolve()?);
        }
        if let Some(mode) = overrides.line_mode {
            self.line_mode = mode;
        }
        if overrides.connect_timeout.is_some() {
            self.connect_timeout = overrides.connect_timeout;
        }
        Ok(self)
    }

    /// Build the connection config.
    ///
    /// Credentials are passed through unchecked; the SSH layer rejects a
    /// config without any before opening a socket.
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        let host = self
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidConfig("no host given".to_string()))?;

        let user = self
            .user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()));

        Ok(ConnectionConfig {
            host: host.to_string(),
            port: self.port.unwrap_or(22),
            user,
            key_path: self.identity.as_deref().map(expand_home),
            password: self.password.clone(),
            connect_timeout: self.connect_timeout,
        })
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var("HOME")) {
        (Ok(rest), Ok(home)) => Path::new(&home).join(rest),
        _ => path.to_path_buf(),
    }
}
