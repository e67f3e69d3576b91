//! Shared mutable context threaded through every state handler.
//!
//! `FsmContext` holds this cycle's telemetry snapshot, the configuration,
//! the cycle timestamp, and every piece of state that persists across
//! cycles (controllers, timers, the fault-entry edge flag).  It is owned
//! by the [`AppService`](crate::app::service::AppService); nothing in it
//! is global.

use crate::config::{BmsConfig, CELLS_PER_CHIP, NUM_CHIPS, NUM_SEGMENTS};
use crate::control::balancing::BalancingController;
use crate::control::boost::BoostController;
use crate::control::charging::ChargingController;
use crate::error::{FAULTS_CLEAR, FaultMask};
use crate::timer::SoftTimer;

// ---------------------------------------------------------------------------
// Telemetry snapshot (refreshed every cycle by the telemetry collaborator)
// ---------------------------------------------------------------------------

/// Per-cycle pack state.
///
/// Units follow the acquisition front end: cell voltages in 0.1 mV counts,
/// pack current in 0.1 A counts (positive = discharge), current limits in
/// whole amps, temperatures in °C.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// Instantaneous pack current (0.1 A).
    pub pack_current: i32,
    /// Pack terminal voltage (V).
    pub pack_voltage: f32,
    /// State of charge (%).
    pub soc: u8,

    /// Lowest cell voltage (0.1 mV).
    pub min_voltage: u16,
    /// Highest cell voltage (0.1 mV).
    pub max_voltage: u16,
    /// Mean cell voltage (0.1 mV).
    pub avg_voltage: u16,
    /// `max_voltage - min_voltage` (0.1 mV).
    pub delta_voltage: u16,

    pub max_temp: i16,
    pub min_temp: i16,
    pub avg_temp: i16,
    /// Hottest reading per segment.
    pub segment_temps: [i16; NUM_SEGMENTS],

    /// Charge current limit (A).
    pub charge_limit: u16,
    /// Discharge current limit (A).  Zeroed by the core on fault.
    pub discharge_limit: u16,
    /// Continuous (non-burst) discharge limit (A).
    pub cont_dcl: u16,

    pub is_charger_connected: bool,
    /// Faults raised this cycle.  Written by the core.
    pub fault_mask: FaultMask,

    /// Per-chip, per-cell voltages (0.1 mV).
    pub cell_voltages: [[u16; CELLS_PER_CHIP]; NUM_CHIPS],

    /// Fan duty (0–100) requested by the thermal analyzer.
    pub fan_duty: u8,

    /// Advertised discharge limit after the boost controller (A).  Written by the core.
    pub boost_setting: u16,
}

impl TelemetrySnapshot {
    pub fn has_faults(&self) -> bool {
        self.fault_mask != FAULTS_CLEAR
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every entry action and handler.
pub struct FsmContext {
    // -- Timing --
    /// Monotonic timestamp of the current cycle (ms).
    pub now_ms: u64,

    // -- Telemetry --
    pub snapshot: TelemetrySnapshot,

    // -- Configuration --
    pub config: BmsConfig,

    // -- Controllers (persist across cycles) --
    pub charging: ChargingController,
    pub balancing: BalancingController,
    pub boost: BoostController,
    /// Spaces out charge-request messages.
    pub charge_message_timer: SoftTimer,

    // -- Fault bookkeeping --
    /// Set by the FAULTED entry action, cleared by its first handler run.
    pub entered_fault: bool,
    /// Fault mask captured on the first FAULTED cycle.
    pub previous_fault: FaultMask,
}

impl FsmContext {
    pub fn new(config: BmsConfig) -> Self {
        Self {
            now_ms: 0,
            snapshot: TelemetrySnapshot::default(),
            config,
            charging: ChargingController::new(),
            balancing: BalancingController::new(),
            boost: BoostController::new(),
            charge_message_timer: SoftTimer::new(),
            entered_fault: false,
            previous_fault: FAULTS_CLEAR,
        }
    }

    pub fn has_faults(&self) -> bool {
        self.snapshot.has_faults()
    }
}
