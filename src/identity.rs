//! Device identity derived from build metadata and the factory MAC.
//!
//! Produces a stable, human-readable device name in the form
//! `<product>-<mac hex>` (product truncated to 25 chars, full 6-byte MAC
//! as 12 lowercase hex chars, whole name capped at 32 chars). The
//! provisioning service advertises as `PROV_<device name>` — the prefix
//! the companion app scans for.
//!
//! Pure logic only; the platform sources for the product name and MAC
//! live in `adapters::device_id`.

use core::fmt::Write;

/// Product-name portion is capped so the MAC suffix survives truncation
/// on all but pathologically long product names.
const MAX_PRODUCT_CHARS: usize = 25;

/// Advertising name prefix understood by the provisioning peer.
const SERVICE_PREFIX: &str = "PROV_";

/// Hardware-unique identifier: the 6-byte factory MAC.
pub type HardwareId = [u8; 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    /// The hardware identifier was not exactly 6 bytes.
    InvalidHardwareId,
}

impl core::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidHardwareId => write!(f, "hardware id must be exactly 6 bytes"),
        }
    }
}

impl std::error::Error for IdentityError {}

/// Immutable identity computed once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// `<product>-<machex>`, at most 32 chars.
    pub device_name: heapless::String<32>,
    /// `PROV_<device_name>`, at most 37 chars.
    pub service_name: heapless::String<40>,
}

/// Derive the device identity. Pure; no side effects.
///
/// `product_name` may be any length and is truncated; `hardware_id`
/// must be exactly 6 bytes.
pub fn compute_identity(
    product_name: &str,
    hardware_id: &[u8],
) -> Result<DeviceIdentity, IdentityError> {
    if hardware_id.len() != 6 {
        return Err(IdentityError::InvalidHardwareId);
    }

    let mut device_name = heapless::String::<32>::new();
    for c in product_name.chars().take(MAX_PRODUCT_CHARS) {
        if device_name.push(c).is_err() {
            break;
        }
    }
    let _ = device_name.push('-');

    let mut hex = heapless::String::<12>::new();
    for b in hardware_id {
        // Writes to a 12-byte buffer from 6 input bytes cannot overflow.
        let _ = write!(hex, "{b:02x}");
    }
    for c in hex.chars() {
        if device_name.push(c).is_err() {
            break;
        }
    }

    let mut service_name = heapless::String::<40>::new();
    let _ = service_name.push_str(SERVICE_PREFIX);
    let _ = service_name.push_str(&device_name);

    Ok(DeviceIdentity {
        device_name,
        service_name,
    })
}
