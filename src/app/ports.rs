//! Port traits — the hexagonal boundary between the setup core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SetupOrchestrator / ProvisioningSession
//! ```
//!
//! Driven adapters (provisioning transport, WiFi credential store,
//! reconnect service, one-shot timer, event sinks) implement these
//! traits. The domain core consumes them via generics, so it is
//! constructible and testable without real hardware.

use crate::config::{NetworkCredentials, SetupConfig};

// ───────────────────────────────────────────────────────────────
// Provisioning transport port
// ───────────────────────────────────────────────────────────────

/// Security scheme the transport negotiates with the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    /// Plaintext exchange (development only).
    Open,
    /// Authenticated key exchange, optionally with proof-of-possession.
    Protected,
}

impl SecurityLevel {
    /// Map the persisted config byte onto a scheme; anything non-zero
    /// is treated as protected.
    pub fn from_config(level: u8) -> Self {
        if level == 0 { Self::Open } else { Self::Protected }
    }
}

/// The out-of-band transport that advertises the device and receives
/// credentials from a peer.
///
/// Events produced by the transport (started, credentials received,
/// failure, accepted, ended) are delivered asynchronously through the
/// system event queue, not through this trait. `request_stop` is a
/// request only — the transport acknowledges by eventually delivering
/// its session-ended event, which is guaranteed to be the last event
/// of the session.
pub trait TransportPort {
    /// Bring up the provisioning manager and register for its events.
    fn init(&mut self) -> Result<(), TransportError>;

    /// Start advertising `service_name` and accept one peer session.
    fn start(
        &mut self,
        security: SecurityLevel,
        service_name: &str,
        pop: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Ask the transport to stop advertising/serving. Asynchronous;
    /// completion is signalled by the session-ended event.
    fn request_stop(&mut self);

    /// Tear down the provisioning manager and release its resources.
    fn deinit(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Credential store port
// ───────────────────────────────────────────────────────────────

/// The persisted network credential record (the WiFi stack's own
/// flash-backed STA config).
pub trait CredentialStorePort {
    fn read(&self) -> Result<NetworkCredentials, StorageError>;
    fn write(&mut self, creds: &NetworkCredentials) -> Result<(), StorageError>;
    fn has_credentials(&self) -> bool;
}

/// Network interface bring-up, separated from the credential record so
/// mocks can implement one without the other.
pub trait NetworkInterfacePort {
    /// Create the station interface, initialise the WiFi stack with
    /// flash-backed credential storage, and set the hostname.
    fn bring_up(&mut self, hostname: &str) -> Result<(), InitError>;
}

// ───────────────────────────────────────────────────────────────
// Reconnect collaborator port
// ───────────────────────────────────────────────────────────────

/// The external component that owns connection attempts and retries.
/// Both calls are idempotent. `start` must run before any connection
/// event can occur, so the collaborator never misses one; `resume` is
/// the single hand-off point after setup or provisioning completes.
pub trait ReconnectPort {
    fn start(&mut self) -> Result<(), InitError>;
    fn resume(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Timer port
// ───────────────────────────────────────────────────────────────

/// Identity of one armed one-shot timer. Generation-counted so a
/// callback from a stale (cancelled or already-consumed) timer can be
/// told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(pub u32);

/// One-shot, cancelable timer service.
///
/// The timer delivers its callback at most once per arm. `cancel` of an
/// already-fired or already-cancelled id is a no-op.
pub trait TimerPort {
    fn arm_once(&mut self, secs: u32) -> Result<TimerId, TimerError>;
    fn cancel(&mut self, id: TimerId);
}

// ───────────────────────────────────────────────────────────────
// Config port
// ───────────────────────────────────────────────────────────────

/// Loads and persists setup configuration.
///
/// Implementations MUST validate before persisting; a zero provisioning
/// timeout would make the device advertise forever-zero and is rejected
/// rather than clamped.
pub trait ConfigPort {
    /// Load configuration; [`SetupConfig::default()`] if none stored.
    fn load(&self) -> Result<SetupConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &SetupConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port; adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Fatal bring-up failure from an interface or collaborator port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitError(pub &'static str);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The provisioning manager could not be initialised.
    StackInitFailed,
    /// `start` called before `init`.
    NotInitialized,
    /// A session is already running; provisioning is single-instance.
    Busy,
    /// The transport rejected the start request.
    StartFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    ReadFailed,
    WriteFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    ArmFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation; the message names it.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::StackInitFailed => write!(f, "provisioning stack init failed"),
            Self::NotInitialized => write!(f, "transport not initialised"),
            Self::Busy => write!(f, "provisioning session already active"),
            Self::StartFailed => write!(f, "transport start rejected"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "credential record read failed"),
            Self::WriteFailed => write!(f, "credential record write failed"),
        }
    }
}

impl core::fmt::Display for TimerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ArmFailed => write!(f, "one-shot timer arm failed"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
