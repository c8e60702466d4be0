//! Network provisioning firmware — main entry point.
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │  WifiAdapter        BleProvAdapter    ProvTimeoutTimer   │
//! │  (Netif+CredStore)  (TransportPort)   (TimerPort)        │
//! │  ReconnectAdapter   NvsAdapter        LogEventSink       │
//! │  (ReconnectPort)    (ConfigPort)      (EventSink)        │
//! │                                                          │
//! │  ────────────── Port Trait Boundary ──────────────       │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │  SetupOrchestrator · ProvisioningSession        │      │
//! │  └────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Provisioning manager and timer callbacks push discriminants into the
//! lock-free queue; the main loop drains it and drives the orchestrator
//! one event at a time.
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use netprov::adapters::ble_prov::{self, BleProvAdapter};
use netprov::adapters::device_id;
use netprov::adapters::log_sink::LogEventSink;
use netprov::adapters::nvs::NvsAdapter;
use netprov::adapters::reconnect::ReconnectAdapter;
use netprov::adapters::timer::ProvTimeoutTimer;
use netprov::adapters::wifi::WifiAdapter;
use netprov::app::ports::ConfigPort;
use netprov::app::session::TransportEvent;
use netprov::app::setup::SetupOrchestrator;
use netprov::config::SetupConfig;
use netprov::events::{self, Event};
use netprov::identity::compute_identity;

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  netprov v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            error!("NVS init failed ({}) — aborting", e);
            return Err(anyhow::anyhow!("nvs init: {}", e));
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config load failed ({}), using defaults", e);
            SetupConfig::default()
        }
    };

    // ── 3. Device identity ────────────────────────────────────
    let mac = device_id::read_mac();
    let product = device_id::product_name();
    let identity = compute_identity(&product, &mac)?;
    info!(
        "device '{}' (service '{}')",
        identity.device_name, identity.service_name
    );

    // ── 4. Reconfigure request ────────────────────────────────
    // Either persisted by a companion app, or the boot button held
    // through reset (GPIO0, active low).
    let boot_button = PinDriver::input(peripherals.pins.gpio0)?;
    let reconfigure = nvs.take_reconfigure_flag() || boot_button.is_low();
    if reconfigure {
        info!("reconfiguration requested");
    }

    // ── 5. Construct adapters ─────────────────────────────────
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs_partition)
        .map_err(|e| anyhow::anyhow!("wifi: {}", e))?;
    let mut transport = BleProvAdapter::new();
    let mut reconnect = ReconnectAdapter::new();
    let mut timer = ProvTimeoutTimer::new();
    let mut sink = LogEventSink::new();

    // ── 6. Setup ──────────────────────────────────────────────
    let mut orchestrator = SetupOrchestrator::new(identity, config);
    orchestrator.setup(
        reconfigure,
        &mut wifi,
        &mut reconnect,
        &mut transport,
        &mut timer,
        &mut sink,
    )?;

    info!("setup complete, entering event loop");

    // ── 7. Event loop ─────────────────────────────────────────
    loop {
        events::drain_events(|event| match event {
            Event::ProvTimeout => {
                if let Some(fired) = timer.take_fired() {
                    orchestrator.on_timeout(fired, &mut transport);
                }
            }

            Event::ProvStarted => {
                orchestrator.on_transport_event(
                    TransportEvent::Started,
                    &mut transport,
                    &mut timer,
                    &mut wifi,
                    &mut reconnect,
                    &mut sink,
                );
            }

            Event::ProvCredentialsReceived => {
                if let Some(ssid) = ble_prov::take_candidate_ssid() {
                    orchestrator.on_transport_event(
                        TransportEvent::CredentialsReceived { ssid },
                        &mut transport,
                        &mut timer,
                        &mut wifi,
                        &mut reconnect,
                        &mut sink,
                    );
                }
            }

            Event::ProvCredentialsFailed => {
                if let Some(reason) = ble_prov::take_failure_reason() {
                    orchestrator.on_transport_event(
                        TransportEvent::CredentialFailure(reason),
                        &mut transport,
                        &mut timer,
                        &mut wifi,
                        &mut reconnect,
                        &mut sink,
                    );
                }
            }

            Event::ProvCredentialsAccepted => {
                orchestrator.on_transport_event(
                    TransportEvent::CredentialsAccepted,
                    &mut transport,
                    &mut timer,
                    &mut wifi,
                    &mut reconnect,
                    &mut sink,
                );
            }

            Event::ProvEnded => {
                orchestrator.on_transport_event(
                    TransportEvent::Ended,
                    &mut transport,
                    &mut timer,
                    &mut wifi,
                    &mut reconnect,
                    &mut sink,
                );
            }
        });

        FreeRtos::delay_ms(50);
    }
}
