//! Persisted setup configuration and the network credential record.
//!
//! `SetupConfig` is persisted as a postcard blob in NVS (see
//! `adapters::nvs`). `NetworkCredentials` is the record the WiFi stack
//! keeps in flash; an empty SSID is the one and only encoding of
//! "no credentials configured".

use serde::{Deserialize, Serialize};

/// Tunables for the network setup flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// How long the device advertises the provisioning service (seconds).
    /// Must be positive; credential failures inside the window never
    /// shorten it.
    pub provisioning_timeout_secs: u32,
    /// Provisioning security scheme: 0 = open, 1 = authenticated
    /// key exchange.
    pub security_level: u8,
    /// Optional proof-of-possession string for security level 1.
    /// Empty means none.
    pub proof_of_possession: heapless::String<32>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            provisioning_timeout_secs: 30,
            security_level: 1,
            proof_of_possession: heapless::String::new(),
        }
    }
}

impl SetupConfig {
    /// Proof-of-possession as an option; empty string means unset.
    pub fn pop(&self) -> Option<&str> {
        if self.proof_of_possession.is_empty() {
            None
        } else {
            Some(self.proof_of_possession.as_str())
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Network credentials
// ───────────────────────────────────────────────────────────────

/// One network identity + secret pair.
///
/// "Unset" is represented uniquely by an empty `ssid` — never by a
/// separate option or flag. This mirrors the WiFi stack's own record,
/// where a zeroed SSID field means unconfigured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCredentials {
    pub ssid: heapless::String<32>,
    pub secret: heapless::String<64>,
}

impl NetworkCredentials {
    /// The empty record.
    pub fn unset() -> Self {
        Self::default()
    }

    /// Build a record from string parts. `None` if either part exceeds
    /// its fixed capacity (SSID 32 bytes, secret 64 bytes).
    pub fn new(ssid: &str, secret: &str) -> Option<Self> {
        let mut c = Self::default();
        c.ssid.push_str(ssid).ok()?;
        c.secret.push_str(secret).ok()?;
        Some(c)
    }

    /// Whether a network is configured.
    pub fn is_set(&self) -> bool {
        !self.ssid.is_empty()
    }
}
