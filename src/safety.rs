//! Fault evaluation engine.
//!
//! A fixed table of [`FaultRule`]s is evaluated **every cycle before the
//! state handlers**.  Each rule owns one [`SoftTimer`] and debounces
//! independently:
//!
//! ```text
//!   condition true,  timer idle     → arm timer
//!   condition true,  timer expired  → rule fires (timer keeps running)
//!   condition false, timer active   → cancel (debounce restarts from zero)
//! ```
//!
//! Fired codes are OR-combined into one [`FaultMask`].  Any nonzero mask
//! sends the state machine to FAULTED, and it stays there until every
//! rule stops firing.
//!
//! The table is a `static` with a compile-time length; nothing here
//! allocates.  Rule order is fixed so traces are reproducible, even though
//! the OR makes the outcome order-independent.

use log::{error, info};

use crate::config::{BmsConfig, CURRENT_SCALE, FaultTimings, VOLT_SCALE};
use crate::error::{FAULTS_CLEAR, FaultCode, FaultMask};
use crate::fsm::context::TelemetrySnapshot;
use crate::timer::SoftTimer;

// ═══════════════════════════════════════════════════════════════
//  Rule description
// ═══════════════════════════════════════════════════════════════

/// Comparison operator applied as `data <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl Operator {
    pub fn apply(self, lhs: f32, rhs: f32) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Lt => lhs < rhs,
            Self::Ge => lhs >= rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

/// Reads one side of a comparison from the snapshot and configuration.
pub type Operand = fn(&TelemetrySnapshot, &BmsConfig) -> f32;

#[derive(Clone, Copy)]
pub struct Comparison {
    pub data: Operand,
    pub op: Operator,
    pub threshold: Operand,
}

impl Comparison {
    pub fn holds(&self, snap: &TelemetrySnapshot, cfg: &BmsConfig) -> bool {
        self.op.apply((self.data)(snap, cfg), (self.threshold)(snap, cfg))
    }
}

/// Which configured window debounces a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debounce {
    OverCurrent,
    OverChargeCurrent,
    UnderVoltage,
    OverVoltage,
    LowCell,
    HighTemp,
}

impl Debounce {
    pub fn window_ms(self, t: &FaultTimings) -> u32 {
        match self {
            Self::OverCurrent => t.over_current_ms,
            Self::OverChargeCurrent => t.over_charge_current_ms,
            Self::UnderVoltage => t.under_voltage_ms,
            Self::OverVoltage => t.over_voltage_ms,
            Self::LowCell => t.low_cell_ms,
            Self::HighTemp => t.high_temp_ms,
        }
    }
}

/// One row of the fault table.  A rule with no secondary comparison
/// depends on the primary alone.
#[derive(Clone, Copy)]
pub struct FaultRule {
    pub label: &'static str,
    pub primary: Comparison,
    pub secondary: Option<Comparison>,
    pub debounce: Debounce,
    pub code: FaultCode,
}

impl FaultRule {
    /// Both comparisons hold this cycle.
    pub fn condition(&self, snap: &TelemetrySnapshot, cfg: &BmsConfig) -> bool {
        self.primary.holds(snap, cfg) && self.secondary.is_none_or(|c| c.holds(snap, cfg))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Operands
// ═══════════════════════════════════════════════════════════════

fn pack_current(s: &TelemetrySnapshot, _: &BmsConfig) -> f32 {
    s.pack_current as f32
}

fn discharge_ceiling(s: &TelemetrySnapshot, c: &BmsConfig) -> f32 {
    (f32::from(s.discharge_limit) + c.aux_current_draw)
        * CURRENT_SCALE
        * c.discharge_overcurrent_margin
}

fn charge_ceiling_current(s: &TelemetrySnapshot, _: &BmsConfig) -> f32 {
    f32::from(s.charge_limit) * CURRENT_SCALE
}

fn zero(_: &TelemetrySnapshot, _: &BmsConfig) -> f32 {
    0.0
}

fn min_cell_voltage(s: &TelemetrySnapshot, _: &BmsConfig) -> f32 {
    f32::from(s.min_voltage)
}

fn max_cell_voltage(s: &TelemetrySnapshot, _: &BmsConfig) -> f32 {
    f32::from(s.max_voltage)
}

fn under_voltage_floor(_: &TelemetrySnapshot, c: &BmsConfig) -> f32 {
    c.min_cell_volt * VOLT_SCALE
}

fn charge_voltage_ceiling(_: &TelemetrySnapshot, c: &BmsConfig) -> f32 {
    c.max_charge_volt * VOLT_SCALE
}

fn absolute_voltage_ceiling(_: &TelemetrySnapshot, c: &BmsConfig) -> f32 {
    c.max_cell_volt * VOLT_SCALE
}

fn charger_connected(s: &TelemetrySnapshot, _: &BmsConfig) -> f32 {
    if s.is_charger_connected { 1.0 } else { 0.0 }
}

fn max_temp(s: &TelemetrySnapshot, _: &BmsConfig) -> f32 {
    f32::from(s.max_temp)
}

fn temp_limit(_: &TelemetrySnapshot, c: &BmsConfig) -> f32 {
    f32::from(c.max_cell_temp)
}

fn damage_floor(_: &TelemetrySnapshot, c: &BmsConfig) -> f32 {
    f32::from(c.extreme_low_cell_raw)
}

// ═══════════════════════════════════════════════════════════════
//  Rule table
// ═══════════════════════════════════════════════════════════════

pub const RULE_COUNT: usize = 7;

/// The fault table, in evaluation order.
///
/// NOTE: "High Temp" is debounced by the low-cell window and "Extremely Low
/// Voltage" by the high-temp window.  The pairing looks swapped but matches
/// the deployed firmware; pending confirmation from the pack owner.
pub static FAULT_RULES: [FaultRule; RULE_COUNT] = [
    FaultRule {
        label: "Discharge Current Limit",
        primary: Comparison { data: pack_current, op: Operator::Gt, threshold: discharge_ceiling },
        secondary: None,
        debounce: Debounce::OverCurrent,
        code: FaultCode::DischargeLimitEnforcement,
    },
    FaultRule {
        label: "Charge Current Limit",
        primary: Comparison { data: pack_current, op: Operator::Gt, threshold: charge_ceiling_current },
        secondary: Some(Comparison { data: pack_current, op: Operator::Lt, threshold: zero }),
        debounce: Debounce::OverChargeCurrent,
        code: FaultCode::ChargeLimitEnforcement,
    },
    FaultRule {
        label: "Low Cell Voltage",
        primary: Comparison { data: min_cell_voltage, op: Operator::Lt, threshold: under_voltage_floor },
        secondary: None,
        debounce: Debounce::UnderVoltage,
        code: FaultCode::CellVoltageTooLow,
    },
    FaultRule {
        label: "High Cell Voltage",
        primary: Comparison { data: max_cell_voltage, op: Operator::Gt, threshold: charge_voltage_ceiling },
        secondary: None,
        debounce: Debounce::OverVoltage,
        code: FaultCode::CellVoltageTooHigh,
    },
    FaultRule {
        label: "High Cell Voltage (absolute)",
        primary: Comparison { data: max_cell_voltage, op: Operator::Gt, threshold: absolute_voltage_ceiling },
        secondary: Some(Comparison { data: charger_connected, op: Operator::Eq, threshold: zero }),
        debounce: Debounce::OverVoltage,
        code: FaultCode::CellVoltageTooHigh,
    },
    FaultRule {
        label: "High Temp",
        primary: Comparison { data: max_temp, op: Operator::Gt, threshold: temp_limit },
        secondary: None,
        debounce: Debounce::LowCell,
        code: FaultCode::PackTooHot,
    },
    FaultRule {
        label: "Extremely Low Voltage",
        primary: Comparison { data: min_cell_voltage, op: Operator::Lt, threshold: damage_floor },
        secondary: None,
        debounce: Debounce::HighTemp,
        code: FaultCode::LowCellVoltage,
    },
];

// ═══════════════════════════════════════════════════════════════
//  Engine
// ═══════════════════════════════════════════════════════════════

/// Evaluates [`FAULT_RULES`], one debounce timer per rule.
pub struct FaultEngine {
    rules: &'static [FaultRule; RULE_COUNT],
    timers: [SoftTimer; RULE_COUNT],
    /// Mask from the previous evaluation, for edge logging.
    last_mask: FaultMask,
}

impl Default for FaultEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultEngine {
    pub fn new() -> Self {
        Self {
            rules: &FAULT_RULES,
            timers: [SoftTimer::new(); RULE_COUNT],
            last_mask: FAULTS_CLEAR,
        }
    }

    /// Evaluate every rule and return the combined fault mask.
    pub fn evaluate(&mut self, snap: &TelemetrySnapshot, cfg: &BmsConfig, now_ms: u64) -> FaultMask {
        let mut mask = FAULTS_CLEAR;
        for (rule, timer) in self.rules.iter().zip(self.timers.iter_mut()) {
            mask |= evaluate_rule(rule, timer, snap, cfg, now_ms);
        }

        for code in FaultCode::iter_mask(mask & !self.last_mask) {
            error!("FAULT SET: {code}");
        }
        for code in FaultCode::iter_mask(self.last_mask & !mask) {
            info!("FAULT CLEARED: {code}");
        }
        self.last_mask = mask;
        mask
    }

    /// Mask produced by the most recent [`evaluate`](Self::evaluate).
    pub fn last_mask(&self) -> FaultMask {
        self.last_mask
    }

    /// Whether rule `index` is currently debouncing or firing.
    pub fn is_armed(&self, index: usize) -> bool {
        self.timers.get(index).is_some_and(SoftTimer::is_active)
    }
}

/// Debounce a single rule against its timer.  Returns the rule's code if it
/// fires this cycle, otherwise [`FAULTS_CLEAR`].
pub fn evaluate_rule(
    rule: &FaultRule,
    timer: &mut SoftTimer,
    snap: &TelemetrySnapshot,
    cfg: &BmsConfig,
    now_ms: u64,
) -> FaultMask {
    let hit = rule.condition(snap, cfg);

    match (timer.is_active(), hit) {
        (false, true) => {
            timer.start(now_ms, rule.debounce.window_ms(&cfg.fault_timings));
            FAULTS_CLEAR
        }
        (true, true) if timer.is_expired(now_ms) => rule.code.mask(),
        (true, false) => {
            timer.cancel();
            FAULTS_CLEAR
        }
        _ => FAULTS_CLEAR,
    }
}
