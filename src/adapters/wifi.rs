//! WiFi station adapter.
//!
//! Implements two ports over the same hardware: [`NetworkInterfacePort`]
//! (netif + WiFi stack bring-up, hostname) and [`CredentialStorePort`]
//! (the stack's flash-backed STA config — the persisted credential
//! record the reconciliation policy operates on).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: driver bring-up via `esp_idf_svc::wifi`
//!   plus raw `esp_wifi_get_config` / `esp_wifi_set_config` for the
//!   credential record.
//! - **all other targets**: in-memory record for host tests.

use log::info;

use crate::app::ports::{CredentialStorePort, InitError, NetworkInterfacePort, StorageError};
use crate::config::NetworkCredentials;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    handle::RawHandle,
    nvs::EspDefaultNvsPartition,
    sys::*,
    wifi::EspWifi,
};

/// First-nul-terminated prefix of a fixed C byte field. Non-UTF-8
/// content reads as empty, which the policy treats as unset.
#[cfg(target_os = "espidf")]
fn c_bytes_to_string<const N: usize>(bytes: &[u8]) -> heapless::String<N> {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let mut s = heapless::String::new();
    if let Ok(text) = core::str::from_utf8(&bytes[..len]) {
        let _ = s.push_str(text);
    }
    s
}

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    record: NetworkCredentials,
    #[cfg(not(target_os = "espidf"))]
    hostname: Option<String>,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    /// Create the STA driver. Takes the modem peripheral; the system
    /// event loop and NVS partition back the driver's event handling
    /// and flash-persisted config.
    pub fn new(
        modem: esp_idf_hal::modem::Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, InitError> {
        let wifi = EspWifi::new(modem, sysloop, Some(nvs))
            .map_err(|_| InitError("wifi driver init failed"))?;
        Ok(Self { wifi })
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            record: NetworkCredentials::unset(),
            hostname: None,
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Simulation: overwrite the record directly, as the provisioning
    /// manager or a session start would on hardware.
    pub fn set_record(&mut self, record: NetworkCredentials) {
        self.record = record;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── NetworkInterfacePort ──────────────────────────────────────

#[cfg(target_os = "espidf")]
impl NetworkInterfacePort for WifiAdapter {
    fn bring_up(&mut self, hostname: &str) -> Result<(), InitError> {
        // SAFETY: single main-task context; the STA netif handle is
        // owned by self.wifi and valid for its lifetime.
        unsafe {
            let ret = esp_wifi_set_storage(wifi_storage_t_WIFI_STORAGE_FLASH);
            if ret != ESP_OK {
                return Err(InitError("wifi flash storage mode failed"));
            }
            let ret = esp_wifi_set_mode(wifi_mode_t_WIFI_MODE_STA);
            if ret != ESP_OK {
                return Err(InitError("wifi STA mode failed"));
            }

            let mut name_buf = [0u8; 33];
            let bytes = hostname.as_bytes();
            let len = bytes.len().min(name_buf.len() - 1);
            name_buf[..len].copy_from_slice(&bytes[..len]);
            let ret =
                esp_netif_set_hostname(self.wifi.sta_netif().handle(), name_buf.as_ptr() as *const _);
            if ret != ESP_OK {
                // Cosmetic; the station still associates without it.
                log::warn!("wifi: hostname set failed (rc={})", ret);
            }
        }
        info!("wifi: STA interface up, hostname '{}'", hostname);
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl NetworkInterfacePort for WifiAdapter {
    fn bring_up(&mut self, hostname: &str) -> Result<(), InitError> {
        info!("wifi(sim): STA interface up, hostname '{}'", hostname);
        self.hostname = Some(hostname.to_string());
        Ok(())
    }
}

// ── CredentialStorePort ───────────────────────────────────────

#[cfg(target_os = "espidf")]
impl CredentialStorePort for WifiAdapter {
    fn read(&self) -> Result<NetworkCredentials, StorageError> {
        // SAFETY: zeroed wifi_config_t is a valid out-param;
        // esp_wifi_get_config fills the union's sta view for WIFI_IF_STA.
        let mut config: wifi_config_t = unsafe { core::mem::zeroed() };
        let ret = unsafe { esp_wifi_get_config(wifi_interface_t_WIFI_IF_STA, &mut config) };
        if ret != ESP_OK {
            return Err(StorageError::ReadFailed);
        }
        let sta = unsafe { config.sta };
        Ok(NetworkCredentials {
            ssid: c_bytes_to_string::<32>(&sta.ssid),
            secret: c_bytes_to_string::<64>(&sta.password),
        })
    }

    fn write(&mut self, creds: &NetworkCredentials) -> Result<(), StorageError> {
        // SAFETY: zeroed wifi_config_t is a valid all-defaults STA
        // config; only the ssid/password fields are populated.
        let mut config: wifi_config_t = unsafe { core::mem::zeroed() };
        unsafe {
            let ssid = creds.ssid.as_bytes();
            config.sta.ssid[..ssid.len()].copy_from_slice(ssid);
            let secret = creds.secret.as_bytes();
            config.sta.password[..secret.len()].copy_from_slice(secret);
        }
        let ret = unsafe { esp_wifi_set_config(wifi_interface_t_WIFI_IF_STA, &mut config) };
        if ret != ESP_OK {
            return Err(StorageError::WriteFailed);
        }
        Ok(())
    }

    fn has_credentials(&self) -> bool {
        self.read().map(|c| c.is_set()).unwrap_or(false)
    }
}

#[cfg(not(target_os = "espidf"))]
impl CredentialStorePort for WifiAdapter {
    fn read(&self) -> Result<NetworkCredentials, StorageError> {
        Ok(self.record.clone())
    }

    fn write(&mut self, creds: &NetworkCredentials) -> Result<(), StorageError> {
        self.record = creds.clone();
        Ok(())
    }

    fn has_credentials(&self) -> bool {
        self.record.is_set()
    }
}
