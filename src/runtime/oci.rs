use super::Runtime;
use crate::container::Container;
use crate::{EscError, Result};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use url::Url;

/// Configuration for the Docker/Podman runtime.
///
/// Parsed from URIs of the form `docker://` or `podman://?platform=linux/amd64`.
/// The scheme names the engine binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OciConfig {
    /// Engine command-line client, `docker` or `podman`.
    pub engine: String,
    /// Optional `--platform` passed to `run`.
    pub platform: Option<String>,
}

impl Default for OciConfig {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            platform: None,
        }
    }
}

impl TryFrom<&Url> for OciConfig {
    type Error = EscError;

    fn try_from(url: &Url) -> std::result::Result<Self, Self::Error> {
        let engine = match url.scheme() {
            scheme @ ("docker" | "podman") => scheme.to_string(),
            other => {
                return Err(EscError::RuntimeOperationFailed(format!(
                    "Invalid scheme '{}' for oci runtime",
                    other
                )));
            }
        };

        if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
            return Err(EscError::RuntimeOperationFailed(format!(
                "Remote engine hosts are not supported ('{}'); point {} at it through its own environment instead",
                host, engine
            )));
        }

        let platform = url
            .query_pairs()
            .find(|(key, _)| key == "platform")
            .map(|(_, value)| value.to_string());

        Ok(Self { engine, platform })
    }
}

/// Runs containers through the `docker` or `podman` command-line client.
///
/// Each call is one `run --rm -i IMAGE sh -s` with the rendered script on
/// stdin. Plain variables are passed as `-e NAME=VALUE`; secret variables as
/// `-e NAME` with the value placed in the engine's own environment, so it
/// never shows up in a process listing.
pub struct OciRuntime {
    config: OciConfig,
}

crate::register_runtime! {
    OciRuntime {
        name: "oci",
        description: "Docker or Podman containers",
        schemes: ["docker", "podman"],
        examples: ["docker://", "podman://", "docker://?platform=linux/amd64"],
        from_url: OciRuntime::from_url,
    }
}

impl OciRuntime {
    pub fn new(config: OciConfig) -> Self {
        Self { config }
    }

    pub fn from_url(url: &Url) -> Result<Self> {
        OciConfig::try_from(url).map(Self::new)
    }

    pub fn config(&self) -> &OciConfig {
        &self.config
    }

    fn build_command(&self, container: &Container) -> Command {
        let mut cmd = Command::new(&self.config.engine);
        cmd.args(["run", "--rm", "-i"]);

        if let Some(platform) = &self.config.platform {
            cmd.arg("--platform").arg(platform);
        }

        for (name, value) in container.env_variables() {
            cmd.arg("-e").arg(format!("{}={}", name, value));
        }

        for (name, secret) in container.secret_variables() {
            cmd.arg("-e").arg(name);
            cmd.env(name, secret.expose_secret());
        }

        cmd.arg(container.image()).args(["sh", "-s"]);
        cmd
    }
}

impl Runtime for OciRuntime {
    fn stdout(&self, container: &Container) -> Result<String> {
        let script = container.render_script();
        tracing::trace!(engine = %self.config.engine, image = container.image(), steps = container.steps().len(), "running container");

        let mut child = match self
            .build_command(container)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EscError::RuntimeOperationFailed(format!(
                    "Container engine ({0}) is not installed or not on PATH.\n\nTo install it:\n  - Docker: https://docs.docker.com/get-docker/\n  - Podman: https://podman.io/docs/installation\n\nOr pick another engine with --runtime (e.g. 'podman').",
                    self.config.engine
                )));
            }
            Err(e) => return Err(e.into()),
        };

        // An engine that exits early closes the pipe; its stderr explains why.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(script.as_bytes()),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        if let Err(e) = &written {
            tracing::debug!(engine = %self.config.engine, error = %e, "engine did not read the whole script");
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Cannot connect to the Docker daemon") {
                return Err(EscError::RuntimeOperationFailed(
                    "Docker daemon is not running. Start it or use --runtime podman.".to_string(),
                ));
            }
            return Err(EscError::ExecutionFailed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        written?;
        String::from_utf8(output.stdout)
            .map_err(|e| EscError::RuntimeOperationFailed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        Self::RUNTIME_NAME
    }
}
