//! # escbox Core Configuration Types
//!
//! This crate holds the user-level configuration for escbox: which Pulumi ESC
//! environment to target by default, which container runtime executes the
//! `esc` client, and how the throwaway container is provisioned.
//!
//! The configuration lives in the system's config directory, typically
//! `~/.config/escbox/config.toml`:
//!
//! ```toml
//! [defaults]
//! environment = "myorg/myproject/dev"
//! runtime = "docker"
//!
//! [container]
//! image = "alpine:latest"
//! install_url = "https://get.pulumi.com/esc/install.sh"
//! client_path = "/root/.pulumi/bin/esc"
//! ```
//!
//! Every field is optional. Missing values fall back to the built-in defaults
//! exported from this crate.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Base image used for the execution container.
pub const DEFAULT_IMAGE: &str = "alpine:latest";

/// Official install script of the Pulumi ESC client.
pub const DEFAULT_INSTALL_URL: &str = "https://get.pulumi.com/esc/install.sh";

/// Location of the `esc` binary after the install script has run as root.
pub const DEFAULT_CLIENT_PATH: &str = "/root/.pulumi/bin/esc";

/// Runtime used when neither a flag, an environment variable nor the config file names one.
pub const DEFAULT_RUNTIME: &str = "docker";

/// Global user configuration for escbox.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(default)]
    pub defaults: GlobalDefaults,
    /// Container provisioning overrides
    #[serde(default)]
    pub container: ContainerSettings,
}

/// Default settings in the global configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GlobalDefaults {
    /// ESC environment to use when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Runtime URI (e.g. "docker", "podman://?platform=linux/amd64")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

/// How the execution container is built.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContainerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_path: Option<String>,
}

impl ContainerSettings {
    pub fn image(&self) -> &str {
        self.image.as_deref().unwrap_or(DEFAULT_IMAGE)
    }

    pub fn install_url(&self) -> &str {
        self.install_url.as_deref().unwrap_or(DEFAULT_INSTALL_URL)
    }

    pub fn client_path(&self) -> &str {
        self.client_path.as_deref().unwrap_or(DEFAULT_CLIENT_PATH)
    }
}

impl GlobalConfig {
    /// Gets the path to the global configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined
    pub fn path() -> Result<PathBuf, io::Error> {
        use directories::ProjectDirs;
        let dirs = ProjectDirs::from("", "", "escbox").ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Could not find config directory")
        })?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Loads the global user configuration.
    ///
    /// If the file doesn't exist, it returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed
    pub fn load() -> Result<Option<Self>, ParseError> {
        let config_path = Self::path().map_err(ParseError::Io)?;
        Self::load_from(&config_path)
    }

    /// Loads the configuration from an explicit path, `Ok(None)` if absent.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ParseError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Saves the global configuration to the default location.
    pub fn save(&self) -> Result<(), io::Error> {
        self.save_to(&Self::path()?)
    }

    /// Saves the global configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Rejects values that would make every remote call fail later.
    pub fn validate(&self) -> Result<(), ParseError> {
        if let Some(env) = &self.defaults.environment {
            if env.trim().is_empty() {
                return Err(ParseError::Validation(
                    "defaults.environment cannot be empty".into(),
                ));
            }
        }
        for (field, value) in [
            ("container.image", &self.container.image),
            ("container.install_url", &self.container.install_url),
            ("container.client_path", &self.container.client_path),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ParseError::Validation(format!("{field} cannot be empty")));
            }
        }
        Ok(())
    }
}

/// Errors that can occur when loading the escbox configuration file.
#[derive(Debug)]
pub enum ParseError {
    /// I/O error when reading the configuration file
    Io(io::Error),
    /// TOML parsing error
    Toml(toml::de::Error),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Io(e) => write!(f, "I/O error: {}", e),
            ParseError::Toml(e) => write!(f, "TOML parsing error: {}", e),
            ParseError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            ParseError::Toml(e) => Some(e),
            ParseError::Validation(_) => None,
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        ParseError::Io(e)
    }
}

impl From<toml::de::Error> for ParseError {
    fn from(e: toml::de::Error) -> Self {
        ParseError::Toml(e)
    }
}
