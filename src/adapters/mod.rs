//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements           | Connects to                   |
//! |-------------|----------------------|-------------------------------|
//! | `ble_prov`  | TransportPort        | wifi_prov_mgr BLE scheme      |
//! | `device_id` | (identity sources)   | eFuse MAC, app descriptor     |
//! | `log_sink`  | EventSink            | Serial log output             |
//! | `nvs`       | ConfigPort           | NVS / in-memory store         |
//! | `reconnect` | ReconnectPort        | WiFi event loop + retry       |
//! | `timer`     | TimerPort            | esp_timer one-shot            |
//! | `wifi`      | NetworkInterfacePort | ESP-IDF netif + WiFi STA      |
//! |             | CredentialStorePort  | flash-backed STA config       |
//!
//! On non-espidf targets every adapter compiles to a simulation stub so
//! the whole stack can be exercised by host tests.

pub mod ble_prov;
pub mod device_id;
pub mod log_sink;
pub mod nvs;
pub mod reconnect;
pub mod timer;
pub mod wifi;
