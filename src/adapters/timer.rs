//! One-shot provisioning timeout timer over ESP-IDF's esp_timer API.
//!
//! The callback executes in the ESP timer task context (not ISR), so it
//! can safely call `push_event()`. The callback carries no payload; the
//! fired generation is parked in an atomic and collected by the main
//! loop via [`ProvTimeoutTimer::take_fired`] when it sees
//! `Event::ProvTimeout` in the queue.
//!
//! Generation counting makes stale fires detectable: each arm hands out
//! a fresh [`TimerId`], and a callback racing a cancel publishes a
//! generation the session no longer owns, which it ignores.

use crate::app::ports::{TimerError, TimerId, TimerPort};

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use crate::events::{Event, push_event};

#[cfg(target_os = "espidf")]
static mut PROV_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// Generation of the currently armed timer; 0 = nothing armed.
#[cfg(target_os = "espidf")]
static CURRENT_GEN: AtomicU32 = AtomicU32::new(0);

/// Generation published by the last callback fire; 0 = none pending.
#[cfg(target_os = "espidf")]
static FIRED_GEN: AtomicU32 = AtomicU32::new(0);

/// SAFETY: PROV_TIMER is written only from the single main-task context
/// in `arm_once`; callbacks never touch the handle.
#[cfg(target_os = "espidf")]
unsafe fn prov_timer() -> esp_timer_handle_t {
    unsafe { PROV_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn prov_timeout_cb(_arg: *mut core::ffi::c_void) {
    // One-shot: consume the armed generation. A cancel that won the
    // race leaves 0 here and the fire evaporates.
    let generation = CURRENT_GEN.swap(0, Ordering::AcqRel);
    if generation != 0 {
        FIRED_GEN.store(generation, Ordering::Release);
        push_event(Event::ProvTimeout);
    }
}

/// One-shot cancelable timeout timer.
pub struct ProvTimeoutTimer {
    next_gen: u32,
    #[cfg(not(target_os = "espidf"))]
    armed: Option<TimerId>,
    #[cfg(not(target_os = "espidf"))]
    fired: Option<TimerId>,
}

impl ProvTimeoutTimer {
    pub fn new() -> Self {
        Self {
            next_gen: 0,
            #[cfg(not(target_os = "espidf"))]
            armed: None,
            #[cfg(not(target_os = "espidf"))]
            fired: None,
        }
    }

    fn bump_gen(&mut self) -> TimerId {
        self.next_gen = self.next_gen.wrapping_add(1);
        if self.next_gen == 0 {
            self.next_gen = 1; // 0 is the "nothing armed" sentinel
        }
        TimerId(self.next_gen)
    }

    /// Collect the identity of a fired timer, if any. Called by the
    /// main loop when it drains an `Event::ProvTimeout`.
    #[cfg(target_os = "espidf")]
    pub fn take_fired(&mut self) -> Option<TimerId> {
        match FIRED_GEN.swap(0, Ordering::AcqRel) {
            0 => None,
            generation => Some(TimerId(generation)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn take_fired(&mut self) -> Option<TimerId> {
        self.fired.take()
    }

    /// Simulation: make the armed timer fire, as the esp_timer task
    /// would.
    #[cfg(not(target_os = "espidf"))]
    pub fn fire_armed(&mut self) {
        if let Some(id) = self.armed.take() {
            self.fired = Some(id);
            crate::events::push_event(crate::events::Event::ProvTimeout);
        }
    }
}

impl Default for ProvTimeoutTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl TimerPort for ProvTimeoutTimer {
    fn arm_once(&mut self, secs: u32) -> Result<TimerId, TimerError> {
        // SAFETY: esp_timer_create / start / stop are called from the
        // single main-task context; the callback only touches atomics
        // and the event queue.
        unsafe {
            if prov_timer().is_null() {
                let args = esp_timer_create_args_t {
                    callback: Some(prov_timeout_cb),
                    arg: core::ptr::null_mut(),
                    dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                    name: c"prov_timeout".as_ptr(),
                    skip_unhandled_events: false,
                };
                let ret = esp_timer_create(&args, &raw mut PROV_TIMER);
                if ret != ESP_OK {
                    log::error!("timer: create failed (rc={})", ret);
                    return Err(TimerError::ArmFailed);
                }
            }

            // A previous run may still be pending; stop is a no-op when
            // the timer is not running.
            esp_timer_stop(prov_timer());

            let id = self.bump_gen();
            CURRENT_GEN.store(id.0, Ordering::Release);
            FIRED_GEN.store(0, Ordering::Release);

            let ret = esp_timer_start_once(prov_timer(), u64::from(secs) * 1_000_000);
            if ret != ESP_OK {
                log::error!("timer: start failed (rc={})", ret);
                CURRENT_GEN.store(0, Ordering::Release);
                return Err(TimerError::ArmFailed);
            }
            Ok(id)
        }
    }

    fn cancel(&mut self, id: TimerId) {
        // Only retire the generation we were asked to cancel; a newer
        // arm keeps its own.
        let _ = CURRENT_GEN.compare_exchange(id.0, 0, Ordering::AcqRel, Ordering::Relaxed);
        // SAFETY: main-task context, handle valid once created.
        unsafe {
            if !prov_timer().is_null() {
                esp_timer_stop(prov_timer());
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl TimerPort for ProvTimeoutTimer {
    fn arm_once(&mut self, _secs: u32) -> Result<TimerId, TimerError> {
        let id = self.bump_gen();
        self.armed = Some(id);
        self.fired = None;
        Ok(id)
    }

    fn cancel(&mut self, id: TimerId) {
        if self.armed == Some(id) {
            self.armed = None;
        }
    }
}
