//! Unified error types for the setup firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! entry point's error handling uniform. All variants are `Copy` so they
//! pass through the event loop without allocation.

use core::fmt;

use crate::app::ports::{ConfigError, InitError, StorageError, TimerError, TransportError};
use crate::identity::IdentityError;

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Interface or collaborator bring-up failed — unrecoverable,
    /// surfaced to the process boundary.
    Init(&'static str),
    /// The provisioning transport failed.
    Transport(TransportError),
    /// The persisted credential record could not be accessed.
    Storage(StorageError),
    /// The timeout timer could not be armed.
    Timer(TimerError),
    /// Device identity inputs were invalid.
    Identity(IdentityError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Timer(e) => write!(f, "timer: {e}"),
            Self::Identity(e) => write!(f, "identity: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Self::Init(e.0)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<TimerError> for Error {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

impl From<IdentityError> for Error {
    fn from(e: IdentityError) -> Self {
        Self::Identity(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
