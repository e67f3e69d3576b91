//! Port traits: the hexagonal boundary between decision logic and the pack.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Telemetry acquisition, relay/GPIO writes, outbound bus messages, event
//! sinks, and configuration storage all live behind these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics, so
//! the control core never touches hardware directly.
//!
//! ## Safety notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **ActuatorPort** writes are fire-and-forget; a driver that cannot
//!   complete a write logs it and leaves the output in its safe state.

use crate::config::BmsConfig;
use crate::control::balancing::BalancePlan;
use crate::error::ConfigError;
use crate::fsm::context::TelemetrySnapshot;

use super::events::AppEvent;
use super::messages::BmsMessage;

// ───────────────────────────────────────────────────────────────
// Telemetry port (driven adapter: analog front end → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the core calls this once per cycle.
pub trait TelemetryPort {
    /// Acquire a fresh snapshot.  Core-owned fields (`fault_mask`,
    /// `boost_setting`) are overwritten later in the cycle.
    fn read_telemetry(&mut self) -> TelemetrySnapshot;

    /// Hook run before fault evaluation.  Adapters may refine the snapshot
    /// here (e.g. open-wire detection).  Default: no-op.
    fn pre_fault_check(&mut self, _snap: &mut TelemetrySnapshot) {}

    /// Live charger-presence input.
    fn charger_connected(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → relay / AFE / fans)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the core calls this to command outputs.
pub trait ActuatorPort {
    /// Close (`true`) or open the charge safety relay.
    fn set_charge_relay(&mut self, closed: bool);

    /// Allow or inhibit charge current.
    fn enable_charging(&mut self, enabled: bool);

    /// Globally enable or disable cell balancing.
    fn enable_balancing(&mut self, enabled: bool);

    /// Apply a per-cell discharge plan.  Implies balancing enabled.
    fn configure_balancing(&mut self, plan: &BalancePlan);

    /// Whether any balancing resistor is currently switched in.
    fn is_balancing(&self) -> bool;

    /// Drive the external fault indicator.
    fn set_fault_indicator(&mut self, on: bool);

    /// Set fan duty (0–100).
    fn set_fan_speed(&mut self, duty: u8);
}

// ───────────────────────────────────────────────────────────────
// Message port (driven adapter: domain → vehicle bus / charger)
// ───────────────────────────────────────────────────────────────

/// Outbound status and charger messages.  Framing is the adapter's business.
pub trait MessagePort {
    fn send(&mut self, msg: &BmsMessage);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists configuration.
///
/// Implementations MUST run [`BmsConfig::validate`] before persisting and
/// reject, not clamp, invalid values.  A bad threshold here disables a
/// protection.
pub trait ConfigPort {
    /// Load configuration.  Returns [`ConfigError::NotFound`] if nothing is
    /// stored; callers fall back to [`BmsConfig::default()`].
    fn load(&self) -> Result<BmsConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &BmsConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Combined hardware bound
// ───────────────────────────────────────────────────────────────

/// Everything the control cycle needs from the pack side.
pub trait PackIo: TelemetryPort + ActuatorPort + MessagePort {}

impl<T: TelemetryPort + ActuatorPort + MessagePort> PackIo for T {}
