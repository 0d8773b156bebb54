//! # Runtime System
//!
//! A runtime takes a [`Container`] description, executes all of its steps in a
//! fresh container and returns what the last step printed on stdout.
//!
//! ## Available Runtimes
//!
//! - [`OciRuntime`]: Docker or Podman through their command-line clients
//! - [`Memoized`]: a wrapper that caches results per [`Container::cache_key`]
//!
//! ## URI-Based Configuration
//!
//! ```text
//! docker
//! docker://
//! podman://
//! docker://?platform=linux/amd64
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use escbox::runtime::Runtime;
//!
//! let runtime = Box::<dyn Runtime>::try_from("podman://")?;
//! let out = runtime.stdout(&Container::from("alpine").with_exec(["echo", "hi"]))?;
//! ```

use crate::container::Container;
use crate::{EscError, Result};
use std::convert::TryFrom;
use url::Url;

pub mod memo;
pub mod oci;
#[macro_use]
pub mod macros;


pub use memo::Memoized;
pub use oci::{OciConfig, OciRuntime};

/// Information about a container runtime.
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    /// The canonical name of the runtime.
    pub name: &'static str,
    /// A human-readable description.
    pub description: &'static str,
    /// Example URIs showing how to configure this runtime.
    pub examples: &'static [&'static str],
}

impl RuntimeInfo {
    /// Formats as "name: description (e.g., example1, example2)".
    pub fn display_with_examples(&self) -> String {
        if self.examples.is_empty() {
            format!("{}: {}", self.name, self.description)
        } else {
            format!(
                "{}: {} (e.g., {})",
                self.name,
                self.description,
                self.examples.join(", ")
            )
        }
    }
}

/// Macro support types
pub use macros::{RUNTIME_REGISTRY, RuntimeRegistration};

/// Returns all registered runtimes with their metadata.
pub fn runtimes() -> Vec<RuntimeInfo> {
    RUNTIME_REGISTRY
        .iter()
        .map(|reg| reg.info.clone())
        .collect()
}

/// Executes container descriptions.
///
/// Implementations run every call to completion and return stdout. They
/// must not add any timeout or retry of their own.
pub trait Runtime: Send + Sync {
    /// Runs all steps of `container` and returns the captured stdout.
    ///
    /// # Errors
    ///
    /// Returns [`EscError::ExecutionFailed`] when any step exits non-zero and
    /// [`EscError::RuntimeOperationFailed`] when the runtime itself is unusable.
    fn stdout(&self, container: &Container) -> Result<String>;

    /// Returns the name of this runtime.
    fn name(&self) -> &'static str;
}

impl<R: Runtime + ?Sized> Runtime for Box<R> {
    fn stdout(&self, container: &Container) -> Result<String> {
        (**self).stdout(container)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl TryFrom<String> for Box<dyn Runtime> {
    type Error = EscError;

    fn try_from(s: String) -> Result<Self> {
        Self::try_from(&s as &str)
    }
}

impl TryFrom<&str> for Box<dyn Runtime> {
    type Error = EscError;

    /// Creates a runtime from a name or URI such as `docker`, `podman:` or
    /// `docker://?platform=linux/arm64`.
    fn try_from(s: &str) -> Result<Self> {
        let (scheme, rest) = match s.find(':') {
            Some(pos) => (&s[..pos], &s[pos + 1..]),
            None => (s, ""),
        };

        if !RUNTIME_REGISTRY.iter().any(|reg| reg.handles(scheme)) {
            return Err(EscError::RuntimeNotFound(scheme.to_string()));
        }

        let url_string = match rest {
            "" | ":" => format!("{}://", scheme),
            s if s.starts_with("//") => format!("{}:{}", scheme, s),
            s => format!("{}://{}", scheme, s),
        };

        let url = Url::parse(&url_string).map_err(|e| {
            EscError::RuntimeOperationFailed(format!(
                "Invalid runtime specification '{}': {}",
                s, e
            ))
        })?;

        Self::try_from(&url)
    }
}

impl TryFrom<&Url> for Box<dyn Runtime> {
    type Error = EscError;

    fn try_from(url: &Url) -> Result<Self> {
        let scheme = url.scheme();

        let registration = RUNTIME_REGISTRY
            .iter()
            .find(|reg| reg.handles(scheme))
            .ok_or_else(|| EscError::RuntimeNotFound(scheme.to_string()))?;

        (registration.build)(url)
    }
}
