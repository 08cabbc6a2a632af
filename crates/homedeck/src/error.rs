//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use homedeck_config::ConfigError;
use homedeck_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Request to the device server failed: {message}")]
    #[diagnostic(
        code(homedeck::network),
        help(
            "Check that the server is running and reachable.\n\
             Try: homedeck rooms list --server <URL> -vv"
        )
    )]
    Network { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(homedeck::not_found),
        help("Run: homedeck {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Device state ─────────────────────────────────────────────────
    #[error("Rejected: {message}")]
    #[diagnostic(
        code(homedeck::rejected),
        help("Run: homedeck device get {device} to see writable characteristics and ranges")
    )]
    Rejected { device: String, message: String },

    #[error("{message}")]
    #[diagnostic(code(homedeck::engine))]
    Engine { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(homedeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(homedeck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: homedeck config init --url <URL> --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device server configured")]
    #[diagnostic(
        code(homedeck::no_config),
        help(
            "Create a profile with: homedeck config init --url <URL>\n\
             Or pass --server <URL>. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Profile '{name}' already exists")]
    #[diagnostic(code(homedeck::profile_exists), help("Use --force to overwrite it."))]
    ProfileExists { name: String },

    #[error(transparent)]
    #[diagnostic(code(homedeck::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(homedeck::serialization))]
    Serialization(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Network { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Rejected { .. } | Self::ProfileExists { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Network { message, .. } => Self::Network { message },

            CoreError::DeviceNotFound { identifier } => Self::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "rooms list".into(),
            },

            CoreError::Validation(e) => Self::Validation {
                field: e.field().to_owned(),
                reason: e.to_string(),
            },

            CoreError::Config { message } => Self::Validation {
                field: "server".into(),
                reason: message,
            },

            CoreError::DeviceNotMounted { identifier } | CoreError::NotBound { identifier } => {
                Self::Rejected {
                    message: format!("device '{identifier}' is not mounted"),
                    device: identifier,
                }
            }

            other => Self::Engine {
                message: other.to_string(),
            },
        }
    }
}
