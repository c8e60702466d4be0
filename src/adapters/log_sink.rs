//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production). A future status
//! LED or companion-app notifier would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::SetupStarted { device_name } => {
                info!("SETUP | device '{}'", device_name);
            }
            AppEvent::ProvisioningStarted {
                service_name,
                timeout_secs,
            } => {
                info!("PROV  | advertising '{}' for {}s", service_name, timeout_secs);
            }
            AppEvent::CredentialsReceived { ssid } => {
                info!("PROV  | credentials received for '{}'", ssid);
            }
            AppEvent::CredentialFailure { reason } => {
                warn!("PROV  | {}", reason);
            }
            AppEvent::CredentialsAccepted => {
                info!("PROV  | credentials accepted");
            }
            AppEvent::ProvisioningEnded { outcome } => {
                info!("PROV  | session ended ({:?})", outcome);
            }
            AppEvent::ConnectResumed => {
                info!("WIFI  | reconnect resumed");
            }
            AppEvent::NoConnectivity => {
                warn!("WIFI  | no credentials, connectivity unavailable");
            }
        }
    }
}
