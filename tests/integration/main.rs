//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a slice of the setup
//! stack against mock adapters. All tests run on the host (x86_64) with
//! no real hardware required.

mod mocks;
mod session_flow_tests;
mod setup_flow_tests;
