//! Provisioning session state machine.
//!
//! ```text
//!  IDLE ──start()──▶ STARTING ──Started──▶ ACTIVE
//!    ▲                   │                    │
//!    │             [timeout fires]      [timeout fires]
//!    │                   ▼                    ▼
//!    │                 ENDING ◀───────────────┘
//!    │                   │
//!    └──────Ended────────┴──(Ended from any non-idle state)
//! ```
//!
//! Termination is centralized in the `Ended` handler regardless of how
//! it was reached — success, timeout, or explicit stop — so cleanup and
//! the caller's reconciliation hook exist in exactly one place. The
//! timeout firing does not tear anything down itself; it only asks the
//! transport to stop, and the transport acknowledges with `Ended`.
//!
//! Credential failures are non-fatal and purely observational: the peer
//! may retry with corrected credentials within the same session window,
//! so the timeout remains the sole authority for ending a failed
//! attempt.

use core::fmt;
use log::{info, warn};

use super::events::AppEvent;
use super::ports::{EventSink, SecurityLevel, TimerId, TimerPort, TransportPort};
use crate::error::Error;

// ───────────────────────────────────────────────────────────────
// States and events
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not provisioning. Terminal state, reused.
    Idle,
    /// Transport start requested; waiting for the session to open.
    Starting,
    /// Serving a peer; credentials may arrive at any time.
    Active,
    /// Stop requested (timeout); waiting for the transport's `Ended`.
    Ending,
}

/// Why the peer's candidate credentials failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    AuthError,
    ApNotFound,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthError => write!(f, "wifi STA authentication failed"),
            Self::ApNotFound => write!(f, "wifi AP not found"),
        }
    }
}

/// Events delivered by the transport's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Started,
    CredentialsReceived { ssid: heapless::String<32> },
    CredentialFailure(FailureReason),
    CredentialsAccepted,
    /// Guaranteed to be the last event observed for a session.
    Ended,
}

/// Returned from [`ProvisioningSession::handle_event`] when the session
/// reached its terminal state; the orchestrator reconciles next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    /// The last network name a peer offered, for observability only.
    pub candidate_ssid: Option<heapless::String<32>>,
}

// ───────────────────────────────────────────────────────────────
// State machine
// ───────────────────────────────────────────────────────────────

/// The provisioning lifecycle state machine.
///
/// At most one session exists at a time; provisioning is never
/// concurrently restarted while a session is active. The armed timeout
/// timer is owned here and is cancelled and released on every path to
/// `Idle` — no path may leak an active timer.
pub struct ProvisioningSession {
    state: SessionState,
    timeout: Option<TimerId>,
    candidate_ssid: Option<heapless::String<32>>,
}

impl ProvisioningSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            timeout: None,
            candidate_ssid: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a session is in flight (anything but `Idle`).
    pub fn is_active(&self) -> bool {
        self.state != SessionState::Idle
    }

    /// Start a provisioning session: subscribe + advertise under
    /// `service_name` and arm the one-shot timeout.
    ///
    /// If the timer cannot be armed the transport is stopped again so a
    /// half-started session never outlives this call.
    pub fn start(
        &mut self,
        transport: &mut impl TransportPort,
        timer: &mut impl TimerPort,
        sink: &mut impl EventSink,
        security: SecurityLevel,
        service_name: &heapless::String<40>,
        pop: Option<&str>,
        timeout_secs: u32,
    ) -> Result<(), Error> {
        if self.state != SessionState::Idle {
            warn!("provisioning: start requested while session active");
            return Err(Error::Transport(super::ports::TransportError::Busy));
        }

        info!(
            "provisioning starting as '{}', timeout {} s",
            service_name, timeout_secs
        );
        transport.start(security, service_name, pop)?;

        match timer.arm_once(timeout_secs) {
            Ok(id) => {
                self.timeout = Some(id);
            }
            Err(e) => {
                // Roll back so no timer-less session can run unbounded.
                transport.request_stop();
                transport.deinit();
                return Err(Error::Timer(e));
            }
        }

        self.candidate_ssid = None;
        self.state = SessionState::Starting;
        sink.emit(&AppEvent::ProvisioningStarted {
            service_name: service_name.clone(),
            timeout_secs,
        });
        Ok(())
    }

    /// The timeout timer fired.
    ///
    /// A stale fire — wrong id, or arriving after the session already
    /// returned to `Idle` — is a guarded no-op. A live fire only asks
    /// the transport to stop; the state change to `Idle` waits for the
    /// transport's own `Ended` acknowledgment.
    pub fn on_timer_fired(&mut self, fired: TimerId, transport: &mut impl TransportPort) {
        if self.timeout != Some(fired) || self.state == SessionState::Idle {
            warn!("provisioning: stale timeout fire ignored ({:?})", fired);
            return;
        }

        info!("provisioning timeout");
        // One-shot: the fire consumed the armed timer.
        self.timeout = None;
        self.state = SessionState::Ending;
        transport.request_stop();
        // Everything else happens in the Ended handler.
    }

    /// Drive one transport event through the machine.
    ///
    /// Returns `Some(SessionEnd)` exactly when the terminal event was
    /// processed: timer released, transport deinitialized, state back
    /// to `Idle`.
    pub fn handle_event(
        &mut self,
        event: TransportEvent,
        transport: &mut impl TransportPort,
        timer: &mut impl TimerPort,
        sink: &mut impl EventSink,
    ) -> Option<SessionEnd> {
        match event {
            TransportEvent::Started => {
                info!("provisioning started");
                if self.state == SessionState::Starting {
                    self.state = SessionState::Active;
                }
                None
            }

            TransportEvent::CredentialsReceived { ssid } => {
                info!("provisioning received ssid '{}'", ssid);
                self.candidate_ssid = Some(ssid.clone());
                sink.emit(&AppEvent::CredentialsReceived { ssid });
                None
            }

            TransportEvent::CredentialFailure(reason) => {
                // Let the timeout kill provisioning, even if this
                // attempt won't connect anyway — the peer may retry
                // within the window.
                log::error!("provisioning failed: {}", reason);
                sink.emit(&AppEvent::CredentialFailure { reason });
                None
            }

            TransportEvent::CredentialsAccepted => {
                // Completion is signalled later by Ended, not here.
                info!("provisioning successful");
                sink.emit(&AppEvent::CredentialsAccepted);
                None
            }

            TransportEvent::Ended => {
                if self.state == SessionState::Idle {
                    warn!("provisioning: stray session-ended event ignored");
                    return None;
                }
                info!("provisioning end");
                if let Some(id) = self.timeout.take() {
                    timer.cancel(id);
                }
                transport.deinit();
                self.state = SessionState::Idle;
                Some(SessionEnd {
                    candidate_ssid: self.candidate_ssid.take(),
                })
            }
        }
    }
}

impl Default for ProvisioningSession {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
