//! escbox - Pulumi ESC configuration and secrets from a throwaway container
//!
//! This library drives the Pulumi ESC command-line client (`esc`) inside a
//! freshly provisioned container, so the host needs nothing but a container
//! engine and an access token.
//!
//! # Features
//!
//! - **Config values**: read and write `pulumiConfig.<name>` of an environment
//! - **Secrets**: open an environment and pull its exported variables as secrets
//! - **Fresh runs**: every call provisions a new container with a unique marker
//! - **Pluggable runtimes**: Docker or Podman, selected by URI
//!
//! # Example
//!
//! ```no_run
//! use escbox::{Esc, runtime::Runtime};
//! use secrecy::SecretString;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = Box::<dyn Runtime>::try_from("docker")?;
//!     let mut esc = Esc::new(runtime)
//!         .with_token(SecretString::from(std::env::var("PULUMI_ACCESS_TOKEN")?))
//!         .with_env("myorg/myproject/dev");
//!
//!     esc.set_config("replicas", "3")?;
//!     println!("replicas: {}", esc.get_config("replicas")?);
//!
//!     let db = esc.open().get_secret_env_var("DATABASE_URL")?;
//!     println!("got {}", db.name());
//!     Ok(())
//! }
//! ```

mod error;

pub mod container;
pub mod extract;
pub mod logging;
pub mod provision;
pub mod runtime;
pub mod secret;
pub mod session;

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;

// Public API exports
pub use container::Container;
pub use error::{EscError, LookupError, Result};
pub use provision::Provisioner;
pub use secret::SecretHandle;
pub use session::Esc;

#[doc(hidden)]
pub use escbox_core::{ContainerSettings, GlobalConfig, GlobalDefaults};
