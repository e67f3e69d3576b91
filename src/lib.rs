//! Accumulator BMS decision core.
//!
//! Exposes the pure-logic modules (state machine, fault engine, controllers)
//! plus the host adapters used by the simulator and integration tests.
//! Nothing in here touches real hardware; the pack side is reached only
//! through the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod fsm;
pub mod safety;
pub mod timer;

pub mod adapters;
pub mod drivers;
