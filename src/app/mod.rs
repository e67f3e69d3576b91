//! Application core: pure decision logic, zero I/O.
//!
//! Per-cycle orchestration, fault evaluation, and the charging, balancing
//! and boost controllers.  All interaction with the pack happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real hardware.

pub mod events;
pub mod messages;
pub mod ports;
pub mod service;
