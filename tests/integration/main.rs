//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no hardware.

mod app_service_tests;
mod mock_hw;
mod simulation_tests;
