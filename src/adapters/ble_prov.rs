//! BLE provisioning transport over ESP-IDF's `wifi_prov_mgr`.
//!
//! Implements [`TransportPort`]. The manager owns the GATT service and
//! the credential-exchange handshake; this adapter only starts/stops it
//! and bridges its callback into the system event queue.
//!
//! ## Payload bridging
//!
//! The provisioning callback runs in the manager's own task. The queue
//! carries bare discriminants, so payloads take a side channel: the
//! candidate SSID is parked in a `Mutex`-guarded buffer and the failure
//! reason in an atomic, both collected by the main loop when it drains
//! the matching event. A session delivers at most one of each between
//! queue drains, so single-slot buffers suffice.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real `wifi_prov_mgr_*` calls with the
//!   BLE scheme.
//! - **all other targets**: simulation stub that records calls and lets
//!   tests inject peer behaviour.

use std::sync::Mutex;

use core::sync::atomic::{AtomicU8, Ordering};
use log::info;

use crate::app::ports::{SecurityLevel, TransportError, TransportPort};
use crate::app::session::FailureReason;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::events::{Event, push_event};

// ───────────────────────────────────────────────────────────────
// Payload side channel
// ───────────────────────────────────────────────────────────────

static CANDIDATE_SSID: Mutex<Option<heapless::String<32>>> = Mutex::new(None);

/// 0 = none, 1 = auth error, 2 = AP not found.
static FAILURE_REASON: AtomicU8 = AtomicU8::new(0);

fn stash_candidate_ssid(ssid: heapless::String<32>) {
    let mut slot = match CANDIDATE_SSID.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *slot = Some(ssid);
}

/// Collect the SSID that accompanied the last credentials-received
/// event. Consumed on read.
pub fn take_candidate_ssid() -> Option<heapless::String<32>> {
    let mut slot = match CANDIDATE_SSID.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    slot.take()
}

fn stash_failure_reason(reason: FailureReason) {
    let raw = match reason {
        FailureReason::AuthError => 1,
        FailureReason::ApNotFound => 2,
    };
    FAILURE_REASON.store(raw, Ordering::Release);
}

/// Collect the reason that accompanied the last credential-failure
/// event. Consumed on read.
pub fn take_failure_reason() -> Option<FailureReason> {
    match FAILURE_REASON.swap(0, Ordering::AcqRel) {
        1 => Some(FailureReason::AuthError),
        2 => Some(FailureReason::ApNotFound),
        _ => None,
    }
}

/// First-nul-terminated prefix of a fixed C byte field, as a bounded
/// string. Non-UTF-8 input yields an empty string.
fn c_bytes_to_string<const N: usize>(bytes: &[u8]) -> heapless::String<N> {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let mut s = heapless::String::new();
    if let Ok(text) = core::str::from_utf8(&bytes[..len]) {
        let _ = s.push_str(text);
    }
    s
}

// ───────────────────────────────────────────────────────────────
// Provisioning manager callback (espidf)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn prov_event_cb(
    _user_data: *mut core::ffi::c_void,
    event: wifi_prov_cb_event_t,
    event_data: *mut core::ffi::c_void,
) {
    match event {
        e if e == wifi_prov_cb_event_t_WIFI_PROV_START => {
            push_event(Event::ProvStarted);
        }
        e if e == wifi_prov_cb_event_t_WIFI_PROV_CRED_RECV => {
            // SAFETY: for CRED_RECV the manager passes a wifi_sta_config_t.
            let sta = unsafe { &*(event_data as *const wifi_sta_config_t) };
            stash_candidate_ssid(c_bytes_to_string::<32>(&sta.ssid));
            push_event(Event::ProvCredentialsReceived);
        }
        e if e == wifi_prov_cb_event_t_WIFI_PROV_CRED_FAIL => {
            // SAFETY: for CRED_FAIL the manager passes a
            // wifi_prov_sta_fail_reason_t.
            let raw = unsafe { *(event_data as *const wifi_prov_sta_fail_reason_t) };
            let reason = if raw == wifi_prov_sta_fail_reason_t_WIFI_PROV_STA_AUTH_ERROR {
                FailureReason::AuthError
            } else {
                FailureReason::ApNotFound
            };
            stash_failure_reason(reason);
            push_event(Event::ProvCredentialsFailed);
        }
        e if e == wifi_prov_cb_event_t_WIFI_PROV_CRED_SUCCESS => {
            push_event(Event::ProvCredentialsAccepted);
        }
        e if e == wifi_prov_cb_event_t_WIFI_PROV_END => {
            push_event(Event::ProvEnded);
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct BleProvAdapter {
    initialized: bool,
    #[cfg(not(target_os = "espidf"))]
    advertising: Option<heapless::String<40>>,
    #[cfg(not(target_os = "espidf"))]
    stop_requests: u32,
    #[cfg(not(target_os = "espidf"))]
    deinits: u32,
}

impl BleProvAdapter {
    pub fn new() -> Self {
        Self {
            initialized: false,
            #[cfg(not(target_os = "espidf"))]
            advertising: None,
            #[cfg(not(target_os = "espidf"))]
            stop_requests: 0,
            #[cfg(not(target_os = "espidf"))]
            deinits: 0,
        }
    }
}

impl Default for BleProvAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl TransportPort for BleProvAdapter {
    fn init(&mut self) -> Result<(), TransportError> {
        // SAFETY: wifi_prov_mgr_init is called once from the main task
        // before any other manager call; the BLE scheme frees classic-BT
        // memory it never uses.
        let ret = unsafe {
            let config = wifi_prov_mgr_config_t {
                scheme: wifi_prov_scheme_ble,
                scheme_event_handler: wifi_prov_event_handler_t {
                    event_cb: Some(wifi_prov_scheme_ble_event_cb_free_btdm),
                    user_data: core::ptr::null_mut(),
                },
                app_event_handler: wifi_prov_event_handler_t {
                    event_cb: Some(prov_event_cb),
                    user_data: core::ptr::null_mut(),
                },
            };
            wifi_prov_mgr_init(config)
        };
        if ret != ESP_OK {
            log::error!("ble_prov: manager init failed (rc={})", ret);
            return Err(TransportError::StackInitFailed);
        }
        self.initialized = true;
        Ok(())
    }

    fn start(
        &mut self,
        security: SecurityLevel,
        service_name: &str,
        pop: Option<&str>,
    ) -> Result<(), TransportError> {
        if !self.initialized {
            return Err(TransportError::NotInitialized);
        }

        // Nul-terminated copies for the C API. Service names are
        // bounded at 37 chars by construction.
        let mut name_buf = [0u8; 41];
        let name_bytes = service_name.as_bytes();
        let name_len = name_bytes.len().min(name_buf.len() - 1);
        name_buf[..name_len].copy_from_slice(&name_bytes[..name_len]);

        let mut pop_buf = [0u8; 33];
        let pop_ptr = match pop {
            Some(p) => {
                let pop_bytes = p.as_bytes();
                let pop_len = pop_bytes.len().min(pop_buf.len() - 1);
                pop_buf[..pop_len].copy_from_slice(&pop_bytes[..pop_len]);
                pop_buf.as_ptr() as *const core::ffi::c_void
            }
            None => core::ptr::null(),
        };

        let security_raw = match security {
            SecurityLevel::Open => wifi_prov_security_t_WIFI_PROV_SECURITY_0,
            SecurityLevel::Protected => wifi_prov_security_t_WIFI_PROV_SECURITY_1,
        };

        info!("ble_prov: advertising '{}'", service_name);
        // SAFETY: buffers outlive the call; the manager copies both.
        let ret = unsafe {
            wifi_prov_mgr_start_provisioning(
                security_raw,
                pop_ptr,
                name_buf.as_ptr() as *const _,
                core::ptr::null(),
            )
        };
        if ret != ESP_OK {
            log::error!("ble_prov: start failed (rc={})", ret);
            return Err(TransportError::StartFailed);
        }
        Ok(())
    }

    fn request_stop(&mut self) {
        // Asynchronous: completion arrives as WIFI_PROV_END through the
        // callback.
        unsafe {
            wifi_prov_mgr_stop_provisioning();
        }
    }

    fn deinit(&mut self) {
        if self.initialized {
            unsafe {
                wifi_prov_mgr_deinit();
            }
            self.initialized = false;
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl TransportPort for BleProvAdapter {
    fn init(&mut self) -> Result<(), TransportError> {
        info!("ble_prov(sim): manager initialised");
        self.initialized = true;
        Ok(())
    }

    fn start(
        &mut self,
        _security: SecurityLevel,
        service_name: &str,
        _pop: Option<&str>,
    ) -> Result<(), TransportError> {
        if !self.initialized {
            return Err(TransportError::NotInitialized);
        }
        let mut name = heapless::String::new();
        let _ = name.push_str(service_name);
        info!("ble_prov(sim): advertising '{}'", name);
        self.advertising = Some(name);
        Ok(())
    }

    fn request_stop(&mut self) {
        self.stop_requests += 1;
    }

    fn deinit(&mut self) {
        self.advertising = None;
        self.initialized = false;
        self.deinits += 1;
    }
}

// ── Simulation peer ───────────────────────────────────────────
//
// Drives the same side channels and queue events the real callback
// would, so host tests exercise the full bridge.

#[cfg(not(target_os = "espidf"))]
impl BleProvAdapter {
    pub fn advertised_service(&self) -> Option<&str> {
        self.advertising.as_deref()
    }

    pub fn stop_requests(&self) -> u32 {
        self.stop_requests
    }

    pub fn deinits(&self) -> u32 {
        self.deinits
    }

    pub fn sim_peer_connects(&mut self) {
        crate::events::push_event(crate::events::Event::ProvStarted);
    }

    pub fn sim_peer_sends_credentials(&mut self, ssid: &str) {
        stash_candidate_ssid(c_bytes_to_string::<32>(ssid.as_bytes()));
        crate::events::push_event(crate::events::Event::ProvCredentialsReceived);
    }

    pub fn sim_credentials_fail(&mut self, reason: FailureReason) {
        stash_failure_reason(reason);
        crate::events::push_event(crate::events::Event::ProvCredentialsFailed);
    }

    pub fn sim_credentials_accepted(&mut self) {
        crate::events::push_event(crate::events::Event::ProvCredentialsAccepted);
    }

    pub fn sim_session_ends(&mut self) {
        self.advertising = None;
        crate::events::push_event(crate::events::Event::ProvEnded);
    }
}
