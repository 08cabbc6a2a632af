// ── Runtime controller configuration ──
//
// These types describe a fully resolved connection to a device server.
// They are NOT the on-disk config format (see `homedeck-config`).

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// How to verify the server's TLS certificate.
#[derive(Debug, Clone, Default)]
pub enum TlsVerification {
    /// Use the system certificate store.
    #[default]
    SystemDefaults,
    /// Use a custom CA certificate file.
    CustomCa(PathBuf),
    /// Accept self-signed certificates.
    DangerAcceptInvalid,
}

/// Where and under which name acknowledged writes are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingConfig {
    pub action: String,
    pub path: PathBuf,
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_CONCURRENT_POLLS: usize = 8;

/// Configuration for a `Controller` instance.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Server base URL (e.g. `http://homebridge.local:8581`).
    pub base_url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Quiet period before coalesced edits are written.
    pub debounce: Duration,
    /// How long a field stays suppressed without an acknowledgement.
    /// `None` means twice the poll interval.
    pub suppression_timeout: Option<Duration>,
    pub max_concurrent_polls: usize,
    /// Append a characteristic debug table to every fragment.
    pub debug: bool,
    pub record_action: Option<RecordingConfig>,
}

impl ControllerConfig {
    /// Defaults for everything except the server URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
            suppression_timeout: None,
            max_concurrent_polls: DEFAULT_MAX_CONCURRENT_POLLS,
            debug: false,
            record_action: None,
        }
    }

    pub fn effective_suppression_timeout(&self) -> Duration {
        self.suppression_timeout
            .unwrap_or_else(|| self.poll_interval.saturating_mul(2))
    }

    pub(crate) fn transport(&self) -> homedeck_api::TransportConfig {
        homedeck_api::TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => homedeck_api::TlsMode::System,
                TlsVerification::CustomCa(path) => homedeck_api::TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => homedeck_api::TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
