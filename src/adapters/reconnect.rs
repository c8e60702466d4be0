//! Reconnect collaborator adapter.
//!
//! Implements [`ReconnectPort`]. The collaborator owns connection
//! attempts and retries; the setup core only starts it (so it never
//! misses a connection event) and resumes it (the single hand-off
//! point after setup or provisioning completes).
//!
//! `start` registers for WiFi events but leaves retrying gated off, so
//! disconnects during a provisioning session do not trigger connection
//! attempts. `resume` opens the gate, starts the radio and makes the
//! first attempt. Both are idempotent.

use log::info;

use crate::app::ports::{InitError, ReconnectPort};

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Gate for the retry loop; closed until `resume()`.
#[cfg(target_os = "espidf")]
static RESUME_ENABLED: AtomicBool = AtomicBool::new(false);

#[cfg(target_os = "espidf")]
unsafe extern "C" fn wifi_event_cb(
    _arg: *mut core::ffi::c_void,
    _event_base: esp_event_base_t,
    event_id: i32,
    _event_data: *mut core::ffi::c_void,
) {
    if !RESUME_ENABLED.load(Ordering::Acquire) {
        return;
    }
    if event_id == wifi_event_t_WIFI_EVENT_STA_START as i32
        || event_id == wifi_event_t_WIFI_EVENT_STA_DISCONNECTED as i32
    {
        // Retry immediately; the driver rate-limits association storms.
        let ret = unsafe { esp_wifi_connect() };
        if ret != ESP_OK {
            log::warn!("reconnect: connect attempt failed (rc={})", ret);
        }
    }
}

pub struct ReconnectAdapter {
    started: bool,
    resumed: bool,
    #[cfg(not(target_os = "espidf"))]
    start_calls: u32,
    #[cfg(not(target_os = "espidf"))]
    resume_calls: u32,
}

impl ReconnectAdapter {
    pub fn new() -> Self {
        Self {
            started: false,
            resumed: false,
            #[cfg(not(target_os = "espidf"))]
            start_calls: 0,
            #[cfg(not(target_os = "espidf"))]
            resume_calls: 0,
        }
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn start_calls(&self) -> u32 {
        self.start_calls
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn resume_calls(&self) -> u32 {
        self.resume_calls
    }
}

impl Default for ReconnectAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl ReconnectPort for ReconnectAdapter {
    fn start(&mut self) -> Result<(), InitError> {
        if self.started {
            return Ok(());
        }
        // SAFETY: WIFI_EVENT is a static event base; the handler only
        // touches atomics and esp_wifi_connect, both task-safe.
        let ret = unsafe {
            esp_event_handler_register(
                WIFI_EVENT,
                ESP_EVENT_ANY_ID,
                Some(wifi_event_cb),
                core::ptr::null_mut(),
            )
        };
        if ret != ESP_OK {
            return Err(InitError("wifi event handler registration failed"));
        }
        self.started = true;
        Ok(())
    }

    fn resume(&mut self) {
        if self.resumed {
            return;
        }
        self.resumed = true;
        RESUME_ENABLED.store(true, Ordering::Release);
        // SAFETY: main-task context after bring_up; start is idempotent
        // when the provisioning manager already started the radio.
        unsafe {
            let ret = esp_wifi_start();
            if ret != ESP_OK {
                log::warn!("reconnect: wifi start failed (rc={})", ret);
                return;
            }
            let ret = esp_wifi_connect();
            if ret != ESP_OK {
                // The STA_START event retries through the handler.
                log::warn!("reconnect: initial connect failed (rc={})", ret);
            }
        }
        info!("reconnect: resumed");
    }
}

#[cfg(not(target_os = "espidf"))]
impl ReconnectPort for ReconnectAdapter {
    fn start(&mut self) -> Result<(), InitError> {
        self.start_calls += 1;
        if self.started {
            return Ok(());
        }
        self.started = true;
        info!("reconnect(sim): started");
        Ok(())
    }

    fn resume(&mut self) {
        self.resume_calls += 1;
        if self.resumed {
            return;
        }
        self.resumed = true;
        info!("reconnect(sim): resumed");
    }
}
