//! Full provisioning-session lifecycles driven through the orchestrator.
//!
//! These tests walk complete boot-to-handoff sequences and assert the
//! outbound event stream, not just final state.

use netprov::app::events::AppEvent;
use netprov::app::session::{FailureReason, TransportEvent};
use netprov::app::setup::{ReconcileOutcome, SetupOrchestrator};
use netprov::config::{NetworkCredentials, SetupConfig};
use netprov::identity::compute_identity;

use crate::mocks::{MockNet, MockReconnect, MockTimer, MockTransport, RecordingSink};

const MAC: [u8; 6] = [0x24, 0x6F, 0x28, 0x01, 0x02, 0x03];

struct Rig {
    orch: SetupOrchestrator,
    net: MockNet,
    transport: MockTransport,
    reconnect: MockReconnect,
    timer: MockTimer,
    sink: RecordingSink,
}

impl Rig {
    fn new(net: MockNet, config: SetupConfig) -> Self {
        let identity = compute_identity("sensorhub", &MAC).unwrap();
        Self {
            orch: SetupOrchestrator::new(identity, config),
            net,
            transport: MockTransport::default(),
            reconnect: MockReconnect::default(),
            timer: MockTimer::default(),
            sink: RecordingSink::default(),
        }
    }

    fn setup(&mut self, reconfigure: bool) {
        self.orch
            .setup(
                reconfigure,
                &mut self.net,
                &mut self.reconnect,
                &mut self.transport,
                &mut self.timer,
                &mut self.sink,
            )
            .unwrap();
    }

    fn feed(&mut self, event: TransportEvent) {
        self.orch.on_transport_event(
            event,
            &mut self.transport,
            &mut self.timer,
            &mut self.net,
            &mut self.reconnect,
            &mut self.sink,
        );
    }

    fn fire_timeout(&mut self) {
        let fired = self.timer.fire().expect("no timer armed");
        self.orch.on_timeout(fired, &mut self.transport);
    }
}

fn ssid32(s: &str) -> heapless::String<32> {
    let mut out = heapless::String::new();
    out.push_str(s).unwrap();
    out
}

#[test]
fn first_boot_happy_path_event_order() {
    let mut rig = Rig::new(MockNet::default(), SetupConfig::default());
    rig.setup(false);

    rig.feed(TransportEvent::Started);
    // The peer's credentials land in the stack's record before END.
    rig.net.record = NetworkCredentials::new("CoffeeShop", "espresso99").unwrap();
    rig.feed(TransportEvent::CredentialsReceived {
        ssid: ssid32("CoffeeShop"),
    });
    rig.feed(TransportEvent::CredentialsAccepted);
    rig.feed(TransportEvent::Ended);

    let received = rig
        .sink
        .position(&AppEvent::CredentialsReceived {
            ssid: ssid32("CoffeeShop"),
        })
        .unwrap();
    let accepted = rig.sink.position(&AppEvent::CredentialsAccepted).unwrap();
    let ended = rig
        .sink
        .position(&AppEvent::ProvisioningEnded {
            outcome: ReconcileOutcome::PersistedKept,
        })
        .unwrap();
    let resumed = rig.sink.position(&AppEvent::ConnectResumed).unwrap();

    assert!(received < accepted);
    assert!(accepted < ended);
    assert!(ended < resumed, "handoff strictly after reconciliation");

    assert!(!rig.orch.is_provisioning());
    assert_eq!(rig.reconnect.resumes, 1);
    assert_eq!(rig.transport.deinits, 1);
    assert!(rig.timer.armed.is_none());
}

#[test]
fn peer_retries_after_failures_within_one_session() {
    let mut rig = Rig::new(MockNet::default(), SetupConfig::default());
    rig.setup(false);
    rig.feed(TransportEvent::Started);

    // Two failed attempts, then a good one — all inside the same window.
    rig.feed(TransportEvent::CredentialsReceived {
        ssid: ssid32("HomeNet"),
    });
    rig.feed(TransportEvent::CredentialFailure(FailureReason::AuthError));
    rig.feed(TransportEvent::CredentialsReceived {
        ssid: ssid32("HomeNet"),
    });
    rig.feed(TransportEvent::CredentialFailure(FailureReason::ApNotFound));

    assert!(rig.orch.is_provisioning(), "failures never end the session");
    assert_eq!(rig.transport.stop_requests, 0);
    assert_eq!(rig.reconnect.resumes, 0);

    rig.feed(TransportEvent::CredentialsReceived {
        ssid: ssid32("HomeNet"),
    });
    rig.net.record = NetworkCredentials::new("HomeNet", "finally-right").unwrap();
    rig.feed(TransportEvent::CredentialsAccepted);
    rig.feed(TransportEvent::Ended);

    assert!(!rig.orch.is_provisioning());
    assert_eq!(rig.reconnect.resumes, 1);
    assert!(rig.sink.contains(&AppEvent::ProvisioningEnded {
        outcome: ReconcileOutcome::PersistedKept,
    }));
}

#[test]
fn timeout_on_first_boot_reports_no_connectivity() {
    let mut rig = Rig::new(MockNet::default(), SetupConfig::default());
    rig.setup(false);
    rig.feed(TransportEvent::Started);

    rig.fire_timeout();
    assert_eq!(rig.transport.stop_requests, 1);
    assert!(rig.orch.is_provisioning(), "still waiting for Ended");

    rig.feed(TransportEvent::Ended);

    assert!(!rig.orch.is_provisioning());
    assert!(rig.sink.contains(&AppEvent::ProvisioningEnded {
        outcome: ReconcileOutcome::NoCredentials,
    }));
    assert!(rig.sink.contains(&AppEvent::NoConnectivity));
    assert_eq!(rig.reconnect.resumes, 1, "handoff happens regardless");
}

#[test]
fn timed_out_reconfigure_falls_back_to_previous_network() {
    let mut rig = Rig::new(
        MockNet::provisioned("HomeNet", "hunter22"),
        SetupConfig::default(),
    );
    rig.setup(true);
    // The stack wipes its record the moment a session starts.
    rig.net.record = NetworkCredentials::unset();

    rig.feed(TransportEvent::Started);
    rig.fire_timeout();
    rig.feed(TransportEvent::Ended);

    assert_eq!(
        rig.net.record,
        NetworkCredentials::new("HomeNet", "hunter22").unwrap()
    );
    assert_eq!(rig.net.writes, 1);
    assert!(rig.sink.contains(&AppEvent::ProvisioningEnded {
        outcome: ReconcileOutcome::SnapshotRestored,
    }));
}

#[test]
fn late_timer_fire_after_session_end_is_harmless() {
    let mut rig = Rig::new(MockNet::default(), SetupConfig::default());
    rig.setup(false);
    rig.feed(TransportEvent::Started);

    // Session ends normally; the timer was cancelled.
    rig.net.record = NetworkCredentials::new("Net", "password1").unwrap();
    rig.feed(TransportEvent::Ended);
    assert_eq!(rig.timer.cancels, 1);

    // A fire that raced the cancel arrives afterwards.
    rig.orch
        .on_timeout(netprov::app::ports::TimerId(1), &mut rig.transport);

    assert!(!rig.orch.is_provisioning());
    assert_eq!(rig.transport.stop_requests, 0);
    assert_eq!(rig.transport.deinits, 1, "no double teardown");
    assert_eq!(rig.reconnect.resumes, 1, "no second handoff");
}

#[test]
fn custom_timeout_and_pop_reach_the_transport() {
    let mut config = SetupConfig {
        provisioning_timeout_secs: 90,
        ..Default::default()
    };
    config.proof_of_possession.push_str("abcd1234").unwrap();

    let mut rig = Rig::new(MockNet::default(), config);
    rig.setup(false);

    assert_eq!(rig.timer.last_secs, Some(90));
    assert_eq!(rig.transport.last_pop.as_deref(), Some("abcd1234"));
    assert!(rig.sink.contains(&AppEvent::ProvisioningStarted {
        service_name: {
            let mut s = heapless::String::new();
            s.push_str("PROV_sensorhub-246f28010203").unwrap();
            s
        },
        timeout_secs: 90,
    }));
}
