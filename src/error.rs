//! Error types for escbox operations

use thiserror::Error;

use escbox_core::ParseError;

/// The main error type for escbox operations
///
/// Precondition errors are raised before any container is started. Execution
/// errors come from the runtime. Lookup errors come from reading the opened
/// environment snapshot.
#[derive(Error, Debug)]
pub enum EscError {
    #[error("need to set Pulumi token using with-token")]
    MissingToken,
    #[error("need to set ESC environment using with-env")]
    MissingEnvironment,
    #[error("need to open environment using open")]
    EnvironmentNotOpened,
    #[error("requested field {name} is empty or not a string: {source}")]
    FieldUnavailable {
        name: String,
        #[source]
        source: LookupError,
    },
    #[error("opened environment is not usable: {0}")]
    InvalidSnapshot(#[source] LookupError),
    #[error("Command exited with {status}: {stderr}")]
    ExecutionFailed { status: String, stderr: String },
    #[error("Runtime operation failed: {0}")]
    RuntimeOperationFailed(String),
    #[error("Runtime '{0}' not found")]
    RuntimeNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ParseError),
}

/// Why a key could not be turned into a value.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("failed to parse JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("key not found in JSON")]
    KeyNotFound,
    #[error("failed to convert value to string: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl EscError {
    /// True for errors detected before any command was run.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            EscError::MissingToken | EscError::MissingEnvironment | EscError::EnvironmentNotOpened
        )
    }
}

/// A type alias for `Result<T, EscError>`
pub type Result<T> = std::result::Result<T, EscError>;
