//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`]: the [`SetupConfig`] postcard blob lives in
//! the `netprov` namespace, range-checked before every persist. The same
//! namespace carries the one-shot reconfigure flag a companion app (or a
//! button hold) sets to force provisioning on the next boot; reading the
//! flag clears it, so a single request yields exactly one session.
//!
//! On ESP32 the blobs go through `nvs_get_blob`/`nvs_set_blob` with an
//! `nvs_commit` per write (atomic at the NVS layer). The simulation
//! backend is an in-memory map for host tests.

use log::info;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SetupConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const NAMESPACE: &str = "netprov";
const CONFIG_KEY: &str = "setupcfg";
const RECONFIG_KEY: &str = "reconfig";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash.
    ///
    /// On first boot or after a layout version change the partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase run from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                log::warn!("nvs: erasing and re-initialising flash partition");
                let ret = unsafe { nvs_flash_erase() };
                if ret != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret = unsafe { nvs_flash_init() };
                if ret != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("nvs: flash initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("nvs: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Open an NVS namespace, run a closure with the handle, close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = NAMESPACE.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn nul_key(key: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = key.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    fn read_blob(&self, key: &str) -> Option<Vec<u8>> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow().get(key).cloned()
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(false, |handle| {
                let key_buf = Self::nul_key(key);
                let mut size: usize = 0;

                // First call sizes the blob.
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });
            result.ok()
        }
    }

    fn write_blob(&mut self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().insert(key.to_string(), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(true, |handle| {
                let key_buf = Self::nul_key(key);
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                log::warn!("nvs: write '{}' failed (rc={})", key, e);
                ConfigError::IoError
            })
        }
    }

    fn delete_blob(&mut self, key: &str) {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().remove(key);
        }

        #[cfg(target_os = "espidf")]
        {
            let _ = Self::with_nvs_handle(true, |handle| {
                let key_buf = Self::nul_key(key);
                let ret = unsafe { nvs_erase_key(handle, key_buf.as_ptr() as *const _) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
        }
    }

    // ── Reconfigure flag ──────────────────────────────────────

    /// Request a provisioning session on the next boot.
    pub fn set_reconfigure_flag(&mut self) -> Result<(), ConfigError> {
        self.write_blob(RECONFIG_KEY, &[1])
    }

    /// Read and clear the reconfigure flag. One request, one session.
    pub fn take_reconfigure_flag(&mut self) -> bool {
        let set = self
            .read_blob(RECONFIG_KEY)
            .is_some_and(|blob| blob.first() == Some(&1));
        if set {
            self.delete_blob(RECONFIG_KEY);
        }
        set
    }
}

fn validate_config(config: &SetupConfig) -> Result<(), ConfigError> {
    if config.provisioning_timeout_secs == 0 {
        return Err(ConfigError::ValidationFailed(
            "provisioning_timeout_secs must be positive",
        ));
    }
    if config.security_level > 1 {
        return Err(ConfigError::ValidationFailed(
            "security_level must be 0 or 1",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SetupConfig, ConfigError> {
        match self.read_blob(CONFIG_KEY) {
            Some(bytes) => {
                let config: SetupConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("nvs: config loaded ({} bytes)", bytes.len());
                Ok(config)
            }
            None => {
                info!("nvs: no stored config, using defaults");
                Ok(SetupConfig::default())
            }
        }
    }

    fn save(&mut self, config: &SetupConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(CONFIG_KEY, &bytes)?;
        info!("nvs: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
