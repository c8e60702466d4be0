//! Startup orchestration and credential reconciliation.
//!
//! [`SetupOrchestrator`] owns the boot-time decision: connect with the
//! persisted credentials, or open a provisioning session to obtain new
//! ones. It also runs the reconciliation policy when a session ends and
//! is the only place that hands control to the reconnect collaborator.

use log::{error, info, warn};

use super::events::AppEvent;
use super::ports::{
    CredentialStorePort, EventSink, NetworkInterfacePort, ReconnectPort, SecurityLevel,
    StorageError, TimerId, TimerPort, TransportPort,
};
use super::session::{ProvisioningSession, TransportEvent};
use crate::config::{NetworkCredentials, SetupConfig};
use crate::error::Error;
use crate::identity::DeviceIdentity;

// ───────────────────────────────────────────────────────────────
// Reconciliation
// ───────────────────────────────────────────────────────────────

/// What reconciliation found (and did) at session end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The persisted record holds credentials; left untouched.
    PersistedKept,
    /// The persisted record was empty; the startup snapshot was written
    /// back.
    SnapshotRestored,
    /// Neither the record nor the snapshot holds credentials.
    NoCredentials,
}

/// Reconcile the persisted credential record against the startup
/// snapshot.
///
/// The network stack drops its stored config once a provisioning
/// session starts, even when the session times out without delivering
/// anything. Restoring the snapshot papers over that, so a timed-out
/// reconfiguration leaves the device on its previous network instead of
/// unprovisioned.
pub fn reconcile(
    store: &mut impl CredentialStorePort,
    snapshot: &NetworkCredentials,
) -> Result<ReconcileOutcome, StorageError> {
    let persisted = store.read()?;
    if persisted.is_set() {
        return Ok(ReconcileOutcome::PersistedKept);
    }
    if snapshot.is_set() {
        info!(
            "restoring pre-session wifi credentials for '{}'",
            snapshot.ssid
        );
        store.write(snapshot)?;
        return Ok(ReconcileOutcome::SnapshotRestored);
    }
    Ok(ReconcileOutcome::NoCredentials)
}

// ───────────────────────────────────────────────────────────────
// Orchestrator
// ───────────────────────────────────────────────────────────────

/// Drives the one-per-boot setup sequence and the provisioning session
/// it may open.
///
/// All hardware access goes through ports, so the orchestrator runs
/// unchanged against mocks on the host.
pub struct SetupOrchestrator {
    identity: DeviceIdentity,
    config: SetupConfig,
    startup_credentials: NetworkCredentials,
    session: ProvisioningSession,
}

impl SetupOrchestrator {
    pub fn new(identity: DeviceIdentity, config: SetupConfig) -> Self {
        Self {
            identity,
            config,
            startup_credentials: NetworkCredentials::unset(),
            session: ProvisioningSession::new(),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Whether a provisioning session is currently in flight.
    pub fn is_provisioning(&self) -> bool {
        self.session.is_active()
    }

    #[cfg(test)]
    fn session_state(&self) -> super::session::SessionState {
        self.session.state()
    }

    /// Run the boot-time setup sequence.
    ///
    /// `reconfigure` forces a provisioning session even when persisted
    /// credentials exist. Bring-up failures are fatal and abort setup;
    /// everything after a successful return is driven asynchronously by
    /// queue events through [`Self::on_timeout`] and
    /// [`Self::on_transport_event`].
    pub fn setup(
        &mut self,
        reconfigure: bool,
        net: &mut (impl NetworkInterfacePort + CredentialStorePort),
        reconnect: &mut impl ReconnectPort,
        transport: &mut impl TransportPort,
        timer: &mut impl TimerPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        info!("device '{}' setting up", self.identity.device_name);
        sink.emit(&AppEvent::SetupStarted {
            device_name: self.identity.device_name.clone(),
        });

        net.bring_up(&self.identity.device_name)?;

        // Must run before any connection event can occur, or the
        // reconnect collaborator would miss it.
        reconnect.start()?;

        // Snapshot the persisted record before provisioning can clobber
        // it. A read failure here is not fatal; it only disables the
        // restore path.
        self.startup_credentials = match net.read() {
            Ok(creds) => creds,
            Err(e) => {
                warn!("startup credential snapshot unavailable: {}", e);
                NetworkCredentials::unset()
            }
        };

        transport.init()?;

        let needs_provisioning = !net.has_credentials() || reconfigure;
        if !needs_provisioning {
            info!("already provisioned, connecting to stored network");
            transport.deinit();
            reconnect.resume();
            sink.emit(&AppEvent::ConnectResumed);
            return Ok(());
        }

        if reconfigure {
            info!("reconfiguration requested, starting provisioning");
        }
        self.session.start(
            transport,
            timer,
            sink,
            SecurityLevel::from_config(self.config.security_level),
            &self.identity.service_name,
            self.config.pop(),
            self.config.provisioning_timeout_secs,
        )
    }

    /// The provisioning timeout fired (delivered via the event queue).
    pub fn on_timeout(&mut self, fired: TimerId, transport: &mut impl TransportPort) {
        self.session.on_timer_fired(fired, transport);
    }

    /// Feed one transport event into the session; when the session
    /// ends, reconcile credentials and hand off to reconnect.
    pub fn on_transport_event(
        &mut self,
        event: TransportEvent,
        transport: &mut impl TransportPort,
        timer: &mut impl TimerPort,
        store: &mut impl CredentialStorePort,
        reconnect: &mut impl ReconnectPort,
        sink: &mut impl EventSink,
    ) {
        let Some(_end) = self.session.handle_event(event, transport, timer, sink) else {
            return;
        };

        match reconcile(store, &self.startup_credentials) {
            Ok(outcome) => {
                sink.emit(&AppEvent::ProvisioningEnded { outcome });
                if outcome == ReconcileOutcome::NoCredentials {
                    warn!("no wifi credentials available");
                    sink.emit(&AppEvent::NoConnectivity);
                }
            }
            Err(e) => {
                // Reconnect still gets control; it will surface the
                // connection failure on its own.
                error!("credential reconciliation failed: {}", e);
            }
        }

        reconnect.resume();
        sink.emit(&AppEvent::ConnectResumed);
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
