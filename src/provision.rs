//! Building the execution container for the `esc` client.

use crate::container::Container;
use crate::secret::duplicate;
use crate::{EscError, Result};
use escbox_core::{ContainerSettings, DEFAULT_CLIENT_PATH, DEFAULT_IMAGE, DEFAULT_INSTALL_URL};
use secrecy::SecretString;

/// Environment variable the `esc` client reads its access token from.
pub const TOKEN_VARIABLE: &str = "PULUMI_ACCESS_TOKEN";

/// Packages installed before the client: `curl` fetches the install
/// script, `jq` filters the client's JSON output.
pub const TOOL_PACKAGES: [&str; 2] = ["curl", "jq"];

/// Describes how to build a container with the `esc` client installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioner {
    image: String,
    install_url: String,
    client_path: String,
}

impl Default for Provisioner {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            install_url: DEFAULT_INSTALL_URL.to_string(),
            client_path: DEFAULT_CLIENT_PATH.to_string(),
        }
    }
}

impl From<&ContainerSettings> for Provisioner {
    fn from(settings: &ContainerSettings) -> Self {
        Self {
            image: settings.image().to_string(),
            install_url: settings.install_url().to_string(),
            client_path: settings.client_path().to_string(),
        }
    }
}

impl Provisioner {
    pub fn new(
        image: impl Into<String>,
        install_url: impl Into<String>,
        client_path: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            install_url: install_url.into(),
            client_path: client_path.into(),
        }
    }

    /// Path of the `esc` binary inside the provisioned container.
    pub fn client_path(&self) -> &str {
        &self.client_path
    }

    /// Returns a container with the tools, the token and the client in place.
    ///
    /// Nothing runs here. The token is checked before the environment, and
    /// no container is described at all when either is missing.
    ///
    /// # Errors
    ///
    /// - [`EscError::MissingToken`] when no token is set
    /// - [`EscError::MissingEnvironment`] when the environment is unset or blank
    pub fn provision(
        &self,
        token: Option<&SecretString>,
        environment: Option<&str>,
    ) -> Result<Container> {
        let token = token.ok_or(EscError::MissingToken)?;
        if environment.is_none_or(|env| env.trim().is_empty()) {
            return Err(EscError::MissingEnvironment);
        }

        let mut install = vec!["apk", "add"];
        install.extend(TOOL_PACKAGES);

        Ok(Container::from(self.image.as_str())
            .with_secret_variable(TOKEN_VARIABLE, duplicate(token))
            .with_exec(install)
            .with_pipeline([
                vec!["curl", "-fsSL", self.install_url.as_str()],
                vec!["sh"],
            ]))
    }
}
