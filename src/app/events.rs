//! Outbound application events.
//!
//! The setup core emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to serial, notify a status
//! characteristic, etc.

use super::session::FailureReason;
use super::setup::ReconcileOutcome;

/// Structured events emitted by the setup core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Setup began; carries the derived device name.
    SetupStarted {
        device_name: heapless::String<32>,
    },

    /// The provisioning session was started.
    ProvisioningStarted {
        service_name: heapless::String<40>,
        timeout_secs: u32,
    },

    /// The peer supplied candidate credentials for `ssid`.
    CredentialsReceived { ssid: heapless::String<32> },

    /// The candidate credentials failed; the session continues.
    CredentialFailure { reason: FailureReason },

    /// The network accepted the candidate credentials.
    CredentialsAccepted,

    /// The session ended and reconciliation ran.
    ProvisioningEnded { outcome: ReconcileOutcome },

    /// Control was handed to the reconnect collaborator.
    ConnectResumed,

    /// No usable credentials exist; connectivity cannot proceed until
    /// the device is re-provisioned.
    NoConnectivity,
}
