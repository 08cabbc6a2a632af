// ── Core error types ──
//
// User-facing errors from homedeck-core. Consumers never see raw HTTP or
// JSON failures; the `From<homedeck_api::Error>` impl folds transport-layer
// errors into `Network` / `DeviceNotFound`.

use thiserror::Error;

/// A local edit that was rejected before it reached the write path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: device has no such characteristic")]
    UnknownCharacteristic { field: String },

    #[error("{field}: characteristic is read-only")]
    ReadOnly { field: String },

    #[error("{field}: value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field}: value {value} is not a multiple of step {step} from {base}")]
    StepMismatch {
        field: String,
        value: f64,
        step: f64,
        base: f64,
    },

    #[error("{field}: value is not a finite number")]
    NotFinite { field: String },
}

impl ValidationError {
    /// The characteristic type the rejected edit targeted.
    pub fn field(&self) -> &str {
        match self {
            Self::UnknownCharacteristic { field }
            | Self::ReadOnly { field }
            | Self::OutOfRange { field, .. }
            | Self::StepMismatch { field, .. }
            | Self::NotFinite { field } => field,
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Local rejections ─────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Control '{control}' does not accept {input}")]
    InvalidInput { control: String, input: String },

    #[error("Control '{control}' is disabled")]
    ControlDisabled { control: String },

    // ── Dispatch ─────────────────────────────────────────────────────
    #[error("No control binder registered for device type '{type_tag}'")]
    UnknownDeviceType { type_tag: String },

    #[error("Device '{identifier}' is not mounted")]
    DeviceNotMounted { identifier: String },

    #[error("Control binder for '{identifier}' has not been bound yet")]
    NotBound { identifier: String },

    // ── Remote ───────────────────────────────────────────────────────
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// HTTP status code, when the server answered at all.
        status: Option<u16>,
    },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Configuration / persistence ──────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Action recording failed: {message}")]
    Recording { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for failures that were caught before any network call.
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidInput { .. } | Self::ControlDisabled { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<homedeck_api::Error> for CoreError {
    fn from(err: homedeck_api::Error) -> Self {
        if err.is_not_found() {
            let identifier = match &err {
                homedeck_api::Error::Transport(e) => {
                    e.url().map(|u| u.path().to_string()).unwrap_or_default()
                }
                homedeck_api::Error::Api { message, .. } => message.clone(),
                _ => String::new(),
            };
            return CoreError::DeviceNotFound { identifier };
        }

        match err {
            homedeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            homedeck_api::Error::InvalidBaseUrl(url) => CoreError::Config {
                message: format!("Base URL cannot carry API paths: {url}"),
            },
            homedeck_api::Error::Tls(msg) => CoreError::Network {
                message: format!("TLS error: {msg}"),
                status: None,
            },
            homedeck_api::Error::Deserialization { message, body: _ } => CoreError::Network {
                message: format!("Unexpected response: {message}"),
                status: None,
            },
            other => CoreError::Network {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
