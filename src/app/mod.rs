//! Domain core: the provisioning lifecycle, free of hardware types.
//!
//! Everything here talks to the outside world through the port traits
//! in [`ports`], so the whole module runs on the host under `cargo test`
//! with mock adapters.

pub mod events;
pub mod ports;
pub mod session;
pub mod setup;
