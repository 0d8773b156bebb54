//! Pulumi ESC session: token, environment and the opened snapshot.

use crate::container::Container;
use crate::extract::{self, lookup_key};
use crate::provision::Provisioner;
use crate::runtime::Runtime;
use crate::secret::SecretHandle;
use crate::{EscError, LookupError, Result};
use chrono::{SecondsFormat, Utc};
use secrecy::SecretString;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Object inside an environment that holds plain key/value settings.
pub const CONFIG_NAMESPACE: &str = "pulumiConfig";

/// Variable set to a unique value on every call so no run is ever reused.
pub const CACHE_BUSTER_VARIABLE: &str = "CACHEBUSTER";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn cache_buster() -> String {
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
        sequence
    )
}

fn config_path(name: &str) -> String {
    format!("{}.{}", CONFIG_NAMESPACE, name)
}

/// A session against one Pulumi ESC environment.
///
/// Every remote operation provisions a new container through the
/// [`Provisioner`], runs one `esc` subcommand in it and discards it.
///
/// The snapshot taken by [`open`](Esc::open) is the only mutable state. A
/// session shared between threads needs external locking around `open`.
///
/// # Example
///
/// ```no_run
/// use escbox::{Esc, runtime::Runtime};
/// use secrecy::SecretString;
///
/// let runtime = Box::<dyn Runtime>::try_from("docker")?;
/// let mut esc = Esc::new(runtime)
///     .with_token(SecretString::from("pul-...".to_string()))
///     .with_env("myorg/myproject/dev");
///
/// let region = esc.get_config("aws:region")?;
/// let password = esc.open().get_secret_env_var("DB_PASSWORD")?;
/// # Ok::<(), escbox::EscError>(())
/// ```
pub struct Esc {
    runtime: Box<dyn Runtime>,
    provisioner: Provisioner,
    environment: Option<String>,
    token: Option<SecretString>,
    snapshot: String,
    open_error: Option<EscError>,
}

impl Esc {
    pub fn new(runtime: Box<dyn Runtime>) -> Self {
        Self {
            runtime,
            provisioner: Provisioner::default(),
            environment: None,
            token: None,
            snapshot: String::new(),
            open_error: None,
        }
    }

    pub fn with_provisioner(mut self, provisioner: Provisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    /// Sets the Pulumi access token.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets the ESC environment, e.g. `myorg/myproject/dev`.
    pub fn with_env(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    /// True once `open` produced a non-empty snapshot.
    pub fn is_open(&self) -> bool {
        !self.snapshot.is_empty()
    }

    /// The failure swallowed by the most recent [`open`](Esc::open), if any.
    pub fn open_error(&self) -> Option<&EscError> {
        self.open_error.as_ref()
    }

    fn container(&self) -> Result<(Container, &str)> {
        let container = self
            .provisioner
            .provision(self.token.as_ref(), self.environment.as_deref())?;
        let environment = self
            .environment
            .as_deref()
            .ok_or(EscError::MissingEnvironment)?;
        Ok((
            container.with_env_variable(CACHE_BUSTER_VARIABLE, cache_buster()),
            environment,
        ))
    }

    /// Reads `pulumiConfig.<name>` from the environment.
    ///
    /// String values come back without quotes; other values as the JSON
    /// text `jq -r` prints for them. Surrounding whitespace is trimmed.
    pub fn get_config(&self, name: &str) -> Result<String> {
        let (container, environment) = self.container()?;
        let path = config_path(name);
        tracing::debug!(environment, path = %path, runtime = self.runtime.name(), "reading config value");

        let client = self.provisioner.client_path();
        let container = container.with_pipeline([
            vec![client, "env", "get", environment, path.as_str(), "--value", "json"],
            vec!["jq", "-r"],
        ]);
        let output = self.runtime.stdout(&container)?;
        Ok(output.trim().to_string())
    }

    /// Writes `value` to `pulumiConfig.<name>`.
    ///
    /// The value is passed as a single argument; shell metacharacters in it
    /// have no effect.
    pub fn set_config(&self, name: &str, value: &str) -> Result<()> {
        let (container, environment) = self.container()?;
        let path = config_path(name);
        tracing::debug!(environment, path = %path, runtime = self.runtime.name(), "writing config value");

        let client = self.provisioner.client_path();
        let container = container.with_exec([client, "env", "set", environment, path.as_str(), value]);
        self.runtime.stdout(&container)?;
        Ok(())
    }

    fn fetch_snapshot(&self) -> Result<String> {
        let (container, environment) = self.container()?;
        tracing::debug!(environment, runtime = self.runtime.name(), "opening environment");

        let client = self.provisioner.client_path();
        let container = container.with_pipeline([
            vec![client, "env", "open", environment],
            vec!["jq", ".environmentVariables"],
        ]);
        let output = self.runtime.stdout(&container)?;
        Ok(output.trim().to_string())
    }

    /// Opens the environment and keeps its exported variables.
    ///
    /// Never fails: on error the snapshot is cleared, the error is kept for
    /// [`open_error`](Esc::open_error), and the next
    /// [`get_secret_env_var`](Esc::get_secret_env_var) reports that the
    /// environment is not open. Use [`try_open`](Esc::try_open) to get the
    /// error directly.
    pub fn open(&mut self) -> &mut Self {
        match self.fetch_snapshot() {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.open_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "opening environment failed");
                self.snapshot.clear();
                self.open_error = Some(e);
            }
        }
        self
    }

    /// Like [`open`](Esc::open) but returns the failure.
    pub fn try_open(&mut self) -> Result<&mut Self> {
        self.open_error = None;
        match self.fetch_snapshot() {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                Ok(self)
            }
            Err(e) => {
                self.snapshot.clear();
                Err(e)
            }
        }
    }

    /// Returns one exported variable of the opened environment as a secret.
    ///
    /// # Errors
    ///
    /// - [`EscError::EnvironmentNotOpened`] before a successful `open`
    /// - [`EscError::FieldUnavailable`] when the variable is absent or null
    pub fn get_secret_env_var(&self, name: &str) -> Result<SecretHandle> {
        if self.snapshot.is_empty() {
            return Err(EscError::EnvironmentNotOpened);
        }

        let value = lookup_key(&self.snapshot, name).map_err(|source| {
            EscError::FieldUnavailable {
                name: name.to_string(),
                source,
            }
        })?;
        Ok(SecretHandle::new(name, value))
    }

    /// Returns every non-null exported variable, sorted by name.
    pub fn secret_env_vars(&self) -> Result<Vec<SecretHandle>> {
        if self.snapshot.is_empty() {
            return Err(EscError::EnvironmentNotOpened);
        }

        let names = extract::keys(&self.snapshot).map_err(EscError::InvalidSnapshot)?;

        let mut secrets = Vec::with_capacity(names.len());
        for name in names {
            match self.get_secret_env_var(&name) {
                Ok(secret) => secrets.push(secret),
                Err(EscError::FieldUnavailable {
                    source: LookupError::KeyNotFound,
                    ..
                }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(secrets)
    }
}

impl fmt::Debug for Esc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Esc")
            .field("runtime", &self.runtime.name())
            .field("provisioner", &self.provisioner)
            .field("environment", &self.environment)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_buster_is_unique() {
        let a = cache_buster();
        let b = cache_buster();
        assert_ne!(a, b);
        assert!(a.contains("Z-"));
    }

    #[test]
    fn test_config_path() {
        assert_eq!(config_path("aws:region"), "pulumiConfig.aws:region");
    }
}
