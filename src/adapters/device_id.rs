//! Platform sources for the device identity.
//!
//! The derivation itself lives in [`crate::identity`]; this module only
//! reads the raw inputs: the factory-burned eFuse MAC and the project
//! name from the running app descriptor. Both are stable across reboots,
//! so the derived name is too.

use crate::identity::{DeviceIdentity, HardwareId, IdentityError, compute_identity};

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> HardwareId {
    let mut mac: HardwareId = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> HardwareId {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Project name from the running firmware image's app descriptor.
#[cfg(target_os = "espidf")]
pub fn product_name() -> heapless::String<32> {
    let mut name = heapless::String::new();
    // SAFETY: esp_app_get_description returns a pointer to a static
    // descriptor embedded in the image; it is never null and its
    // project_name field is a nul-terminated C string.
    unsafe {
        let desc = esp_idf_svc::sys::esp_app_get_description();
        let raw = core::ffi::CStr::from_ptr((*desc).project_name.as_ptr());
        if let Ok(s) = raw.to_str() {
            for c in s.chars() {
                if name.push(c).is_err() {
                    break;
                }
            }
        }
    }
    name
}

/// Simulation: the crate name stands in for the app descriptor.
#[cfg(not(target_os = "espidf"))]
pub fn product_name() -> heapless::String<32> {
    let mut name = heapless::String::new();
    for c in env!("CARGO_PKG_NAME").chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    name
}

/// Read the platform inputs and derive the full device identity.
pub fn identity() -> Result<DeviceIdentity, IdentityError> {
    let mac = read_mac();
    compute_identity(&product_name(), &mac)
}
