//! Secret values handed out by a session.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// A named secret extracted from an opened environment.
///
/// `Debug` never shows the value; [`expose`](SecretHandle::expose) is the
/// only way to read it.
pub struct SecretHandle {
    name: String,
    value: SecretString,
}

impl SecretHandle {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: SecretString::from(value.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }
}

impl fmt::Debug for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHandle")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Copies a secret without exposing it anywhere but the new box.
pub(crate) fn duplicate(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}
