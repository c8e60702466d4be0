//! Shared mock adapters for integration tests.
//!
//! Each mock implements one (or two) port traits and records enough of
//! what happened for tests to assert ordering and counts.

use netprov::app::events::AppEvent;
use netprov::app::ports::{
    CredentialStorePort, EventSink, InitError, NetworkInterfacePort, ReconnectPort, SecurityLevel,
    StorageError, TimerError, TimerId, TimerPort, TransportError, TransportPort,
};
use netprov::config::NetworkCredentials;

// ── Network (interface + credential record) ───────────────────

#[derive(Default)]
pub struct MockNet {
    pub record: NetworkCredentials,
    pub hostname: Option<String>,
    pub writes: u32,
    pub fail_bring_up: bool,
    pub fail_read: bool,
}

impl MockNet {
    pub fn provisioned(ssid: &str, secret: &str) -> Self {
        Self {
            record: NetworkCredentials::new(ssid, secret).unwrap(),
            ..Default::default()
        }
    }
}

impl NetworkInterfacePort for MockNet {
    fn bring_up(&mut self, hostname: &str) -> Result<(), InitError> {
        if self.fail_bring_up {
            return Err(InitError("mock bring-up failure"));
        }
        self.hostname = Some(hostname.to_string());
        Ok(())
    }
}

impl CredentialStorePort for MockNet {
    fn read(&self) -> Result<NetworkCredentials, StorageError> {
        if self.fail_read {
            return Err(StorageError::ReadFailed);
        }
        Ok(self.record.clone())
    }

    fn write(&mut self, creds: &NetworkCredentials) -> Result<(), StorageError> {
        self.record = creds.clone();
        self.writes += 1;
        Ok(())
    }

    fn has_credentials(&self) -> bool {
        self.record.is_set()
    }
}

// ── Provisioning transport ────────────────────────────────────

#[derive(Default)]
pub struct MockTransport {
    pub inits: u32,
    pub starts: u32,
    pub stop_requests: u32,
    pub deinits: u32,
    pub last_service: Option<String>,
    pub last_security: Option<SecurityLevel>,
    pub last_pop: Option<String>,
    pub fail_start: bool,
}

impl TransportPort for MockTransport {
    fn init(&mut self) -> Result<(), TransportError> {
        self.inits += 1;
        Ok(())
    }

    fn start(
        &mut self,
        security: SecurityLevel,
        service_name: &str,
        pop: Option<&str>,
    ) -> Result<(), TransportError> {
        if self.fail_start {
            return Err(TransportError::StartFailed);
        }
        self.starts += 1;
        self.last_service = Some(service_name.to_string());
        self.last_security = Some(security);
        self.last_pop = pop.map(str::to_string);
        Ok(())
    }

    fn request_stop(&mut self) {
        self.stop_requests += 1;
    }

    fn deinit(&mut self) {
        self.deinits += 1;
    }
}

// ── Reconnect collaborator ────────────────────────────────────

#[derive(Default)]
pub struct MockReconnect {
    pub starts: u32,
    pub resumes: u32,
    pub started_before_resume: bool,
}

impl ReconnectPort for MockReconnect {
    fn start(&mut self) -> Result<(), InitError> {
        self.starts += 1;
        self.started_before_resume = self.resumes == 0;
        Ok(())
    }

    fn resume(&mut self) {
        self.resumes += 1;
    }
}

// ── One-shot timer ────────────────────────────────────────────

#[derive(Default)]
pub struct MockTimer {
    pub armed: Option<TimerId>,
    pub next: u32,
    pub cancels: u32,
    pub last_secs: Option<u32>,
    pub fail_arm: bool,
}

impl MockTimer {
    /// The armed timer fires; one-shot, so arming state is consumed.
    pub fn fire(&mut self) -> Option<TimerId> {
        self.armed.take()
    }
}

impl TimerPort for MockTimer {
    fn arm_once(&mut self, secs: u32) -> Result<TimerId, TimerError> {
        if self.fail_arm {
            return Err(TimerError::ArmFailed);
        }
        self.next += 1;
        self.last_secs = Some(secs);
        let id = TimerId(self.next);
        self.armed = Some(id);
        Ok(id)
    }

    fn cancel(&mut self, id: TimerId) {
        self.cancels += 1;
        if self.armed == Some(id) {
            self.armed = None;
        }
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    /// Index of the first occurrence, for ordering assertions.
    pub fn position(&self, event: &AppEvent) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
