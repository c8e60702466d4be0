//! Boot-time setup decisions: provision, or connect with what we have.

use netprov::app::events::AppEvent;
use netprov::app::ports::SecurityLevel;
use netprov::app::setup::SetupOrchestrator;
use netprov::config::SetupConfig;
use netprov::error::Error;
use netprov::identity::compute_identity;

use crate::mocks::{MockNet, MockReconnect, MockTimer, MockTransport, RecordingSink};

const MAC: [u8; 6] = [0xA0, 0xB1, 0xC2, 0xD3, 0xE4, 0xF5];

fn orchestrator() -> SetupOrchestrator {
    let identity = compute_identity("gateway", &MAC).unwrap();
    SetupOrchestrator::new(identity, SetupConfig::default())
}

fn run_setup(
    orch: &mut SetupOrchestrator,
    net: &mut MockNet,
    reconfigure: bool,
) -> (
    MockTransport,
    MockReconnect,
    MockTimer,
    RecordingSink,
    Result<(), Error>,
) {
    let mut transport = MockTransport::default();
    let mut reconnect = MockReconnect::default();
    let mut timer = MockTimer::default();
    let mut sink = RecordingSink::default();
    let result = orch.setup(
        reconfigure,
        net,
        &mut reconnect,
        &mut transport,
        &mut timer,
        &mut sink,
    );
    (transport, reconnect, timer, sink, result)
}

#[test]
fn provisioned_device_connects_without_advertising() {
    let mut orch = orchestrator();
    let mut net = MockNet::provisioned("HomeNet", "hunter22");
    let (transport, reconnect, timer, sink, result) = run_setup(&mut orch, &mut net, false);

    result.unwrap();
    assert_eq!(transport.starts, 0);
    assert_eq!(transport.deinits, 1, "unused manager released");
    assert_eq!(reconnect.resumes, 1);
    assert!(timer.armed.is_none());
    assert!(!orch.is_provisioning());
    assert!(sink.contains(&AppEvent::ConnectResumed));
}

#[test]
fn unprovisioned_device_advertises_derived_service_name() {
    let mut orch = orchestrator();
    let mut net = MockNet::default();
    let (transport, reconnect, timer, _sink, result) = run_setup(&mut orch, &mut net, false);

    result.unwrap();
    assert_eq!(
        transport.last_service.as_deref(),
        Some("PROV_gateway-a0b1c2d3e4f5")
    );
    assert_eq!(transport.last_security, Some(SecurityLevel::Protected));
    assert_eq!(timer.last_secs, Some(30));
    assert_eq!(reconnect.resumes, 0);
    assert!(orch.is_provisioning());
    assert_eq!(net.hostname.as_deref(), Some("gateway-a0b1c2d3e4f5"));
}

#[test]
fn reconfigure_overrides_existing_credentials() {
    let mut orch = orchestrator();
    let mut net = MockNet::provisioned("HomeNet", "hunter22");
    let (transport, reconnect, _timer, _sink, result) = run_setup(&mut orch, &mut net, true);

    result.unwrap();
    assert_eq!(transport.starts, 1);
    assert_eq!(reconnect.resumes, 0);
    assert!(orch.is_provisioning());
}

#[test]
fn reconnect_is_started_before_any_resume() {
    let mut orch = orchestrator();
    let mut net = MockNet::provisioned("HomeNet", "hunter22");
    let (_transport, reconnect, _timer, _sink, result) = run_setup(&mut orch, &mut net, false);

    result.unwrap();
    assert_eq!(reconnect.starts, 1);
    assert!(reconnect.started_before_resume);
}

#[test]
fn open_security_level_is_passed_through() {
    let identity = compute_identity("gateway", &MAC).unwrap();
    let config = SetupConfig {
        security_level: 0,
        ..Default::default()
    };
    let mut orch = SetupOrchestrator::new(identity, config);
    let mut net = MockNet::default();
    let (transport, _reconnect, _timer, _sink, result) = run_setup(&mut orch, &mut net, false);

    result.unwrap();
    assert_eq!(transport.last_security, Some(SecurityLevel::Open));
    assert_eq!(transport.last_pop, None);
}

#[test]
fn bring_up_failure_aborts_before_reconnect_start() {
    let mut orch = orchestrator();
    let mut net = MockNet {
        fail_bring_up: true,
        ..Default::default()
    };
    let (transport, reconnect, timer, _sink, result) = run_setup(&mut orch, &mut net, false);

    assert!(matches!(result, Err(Error::Init(_))));
    assert_eq!(reconnect.starts, 0);
    assert_eq!(transport.inits, 0);
    assert!(timer.armed.is_none());
    assert!(!orch.is_provisioning());
}

#[test]
fn transport_start_failure_surfaces_and_leaves_idle() {
    let mut orch = orchestrator();
    let mut net = MockNet::default();
    let mut transport = MockTransport {
        fail_start: true,
        ..Default::default()
    };
    let mut reconnect = MockReconnect::default();
    let mut timer = MockTimer::default();
    let mut sink = RecordingSink::default();

    let result = orch.setup(
        false,
        &mut net,
        &mut reconnect,
        &mut transport,
        &mut timer,
        &mut sink,
    );

    assert!(result.is_err());
    assert!(!orch.is_provisioning());
    assert!(timer.armed.is_none(), "no timer armed for a dead session");
}

#[test]
fn timer_arm_failure_rolls_the_transport_back() {
    let mut orch = orchestrator();
    let mut net = MockNet::default();
    let mut transport = MockTransport::default();
    let mut reconnect = MockReconnect::default();
    let mut timer = MockTimer {
        fail_arm: true,
        ..Default::default()
    };
    let mut sink = RecordingSink::default();

    let result = orch.setup(
        false,
        &mut net,
        &mut reconnect,
        &mut transport,
        &mut timer,
        &mut sink,
    );

    assert!(matches!(result, Err(Error::Timer(_))));
    assert!(!orch.is_provisioning());
    assert_eq!(transport.stop_requests, 1);
    assert_eq!(transport.deinits, 1);
}
