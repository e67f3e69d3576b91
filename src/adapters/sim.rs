//! Simulated accumulator for host runs.
//!
//! Implements every pack-side port on top of an in-memory cell model and
//! [`SimPin`] outputs.  Physics is deliberately coarse: charge current
//! raises every cell uniformly, load current lowers them, and balancing
//! bleeds marked cells.  Good enough to drive the controller through
//! charge, balance, cutoff, boost, and fault paths.

use log::debug;

use crate::app::messages::BmsMessage;
use crate::app::ports::{ActuatorPort, MessagePort, TelemetryPort};
use crate::config::{CELLS_PER_CHIP, NUM_CELLS, NUM_CHIPS, NUM_SEGMENTS, VOLT_SCALE};
use crate::control::balancing::BalancePlan;
use crate::drivers::relay::{DigitalOutput, SimPin};
use crate::fsm::context::TelemetrySnapshot;

/// Cell voltage rise per second at full charge current (0.1 mV).
const CHARGE_RATE_PER_S: u64 = 20;
/// Cell voltage drop per second per 10 A of load (0.1 mV).
const LOAD_SAG_PER_S: u64 = 2;
/// Balancing bleed per second (0.1 mV).
const BLEED_PER_S: u64 = 10;

/// Empty and full cell voltages used for the SOC estimate (0.1 mV).
const SOC_EMPTY: u16 = 30_000;
const SOC_FULL: u16 = 42_000;

pub struct SimulatedPack {
    cells: [[u16; CELLS_PER_CHIP]; NUM_CHIPS],
    segment_temps: [i16; NUM_SEGMENTS],
    /// Load current (0.1 A, positive = discharge).
    load_current: i32,
    charger_plugged: bool,

    charge_limit: u16,
    discharge_limit: u16,
    cont_dcl: u16,

    relay: DigitalOutput<SimPin>,
    charge_enable: DigitalOutput<SimPin>,
    fault_indicator: DigitalOutput<SimPin>,
    balancing: bool,
    plan: BalancePlan,
    fan_duty: u8,

    outbox: Vec<BmsMessage>,
}

impl Default for SimulatedPack {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPack {
    /// A healthy, mid-charge pack at room temperature.
    pub fn new() -> Self {
        Self {
            cells: [[38_000; CELLS_PER_CHIP]; NUM_CHIPS],
            segment_temps: [25; NUM_SEGMENTS],
            load_current: 0,
            charger_plugged: false,
            charge_limit: 20,
            discharge_limit: 200,
            cont_dcl: 100,
            relay: DigitalOutput::new(SimPin::new(), "charge_relay"),
            charge_enable: DigitalOutput::new(SimPin::new(), "charge_enable"),
            fault_indicator: DigitalOutput::new(SimPin::new(), "fault_indicator"),
            balancing: false,
            plan: BalancePlan::idle(),
            fan_duty: 0,
            outbox: Vec::new(),
        }
    }

    // ── Scenario controls ─────────────────────────────────────

    pub fn plug_charger(&mut self, plugged: bool) {
        self.charger_plugged = plugged;
    }

    /// Set load current in 0.1 A (positive = discharge).
    pub fn set_load_current(&mut self, current: i32) {
        self.load_current = current;
    }

    pub fn set_limits(&mut self, charge: u16, discharge: u16, continuous: u16) {
        self.charge_limit = charge;
        self.discharge_limit = discharge;
        self.cont_dcl = continuous;
    }

    pub fn fill_cells(&mut self, raw: u16) {
        for row in &mut self.cells {
            row.fill(raw);
        }
    }

    pub fn set_cell(&mut self, chip: usize, cell: usize, raw: u16) {
        if let Some(v) = self.cells.get_mut(chip).and_then(|c| c.get_mut(cell)) {
            *v = raw;
        }
    }

    pub fn set_segment_temps(&mut self, temp: i16) {
        self.segment_temps.fill(temp);
    }

    /// Advance the cell model by `dt_ms`.
    pub fn step(&mut self, dt_ms: u64) {
        let charging = self.charger_plugged && self.relay.is_high() && self.charge_enable.is_high();

        let rise = if charging {
            CHARGE_RATE_PER_S.saturating_mul(dt_ms) / 1000
        } else {
            0
        };
        let sag = if self.load_current > 0 {
            (self.load_current as u64 / 100)
                .saturating_mul(LOAD_SAG_PER_S)
                .saturating_mul(dt_ms)
                / 1000
        } else {
            0
        };
        let bleed = BLEED_PER_S.saturating_mul(dt_ms) / 1000;

        for (chip, row) in self.cells.iter_mut().enumerate() {
            for (cell, v) in row.iter_mut().enumerate() {
                let mut next = u64::from(*v).saturating_add(rise);
                next = next.saturating_sub(sag);
                if self.balancing && self.plan.is_marked(chip, cell) {
                    next = next.saturating_sub(bleed);
                }
                *v = next.min(u64::from(u16::MAX)) as u16;
            }
        }
    }

    // ── Observations ──────────────────────────────────────────

    pub fn relay_closed(&self) -> bool {
        self.relay.is_high()
    }

    pub fn charging_enabled(&self) -> bool {
        self.charge_enable.is_high()
    }

    pub fn fault_indicator_on(&self) -> bool {
        self.fault_indicator.is_high()
    }

    pub fn fan_duty(&self) -> u8 {
        self.fan_duty
    }

    /// Drain every message sent since the last call.
    pub fn take_messages(&mut self) -> Vec<BmsMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// Fan duty the thermal analyzer would request for `max_temp`.
    fn fan_for(max_temp: i16) -> u8 {
        match max_temp {
            t if t <= 25 => 0,
            t if t >= 45 => 100,
            t => ((t - 25) * 5) as u8,
        }
    }
}

// ── TelemetryPort implementation ──────────────────────────────

impl TelemetryPort for SimulatedPack {
    fn read_telemetry(&mut self) -> TelemetrySnapshot {
        let flat = || self.cells.iter().flatten().copied();
        let min_voltage = flat().min().unwrap_or(0);
        let max_voltage = flat().max().unwrap_or(0);
        let sum: u32 = flat().map(u32::from).sum();
        let avg_voltage = (sum / NUM_CELLS as u32) as u16;

        let max_temp = self.segment_temps.iter().copied().max().unwrap_or(0);
        let min_temp = self.segment_temps.iter().copied().min().unwrap_or(0);
        let temp_sum: i32 = self.segment_temps.iter().map(|&t| i32::from(t)).sum();
        let avg_temp = (temp_sum / NUM_SEGMENTS as i32) as i16;

        let span = u32::from(SOC_FULL - SOC_EMPTY);
        let soc = (u32::from(avg_voltage.clamp(SOC_EMPTY, SOC_FULL) - SOC_EMPTY) * 100 / span) as u8;

        let charging = self.charger_plugged && self.relay.is_high() && self.charge_enable.is_high();
        let pack_current = if charging {
            -i32::from(self.charge_limit) * 10
        } else {
            self.load_current
        };

        TelemetrySnapshot {
            pack_current,
            pack_voltage: sum as f32 / VOLT_SCALE,
            soc,
            min_voltage,
            max_voltage,
            avg_voltage,
            delta_voltage: max_voltage - min_voltage,
            max_temp,
            min_temp,
            avg_temp,
            segment_temps: self.segment_temps,
            charge_limit: self.charge_limit,
            discharge_limit: self.discharge_limit,
            cont_dcl: self.cont_dcl,
            is_charger_connected: self.charger_plugged,
            cell_voltages: self.cells,
            fan_duty: Self::fan_for(max_temp),
            ..TelemetrySnapshot::default()
        }
    }

    fn charger_connected(&mut self) -> bool {
        self.charger_plugged
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for SimulatedPack {
    fn set_charge_relay(&mut self, closed: bool) {
        self.relay.set(closed);
    }

    fn enable_charging(&mut self, enabled: bool) {
        self.charge_enable.set(enabled);
    }

    fn enable_balancing(&mut self, enabled: bool) {
        self.balancing = enabled;
        if !enabled {
            self.plan = BalancePlan::idle();
        }
    }

    fn configure_balancing(&mut self, plan: &BalancePlan) {
        self.plan = *plan;
        self.balancing = true;
    }

    fn is_balancing(&self) -> bool {
        self.balancing && self.plan.marked_count() > 0
    }

    fn set_fault_indicator(&mut self, on: bool) {
        self.fault_indicator.set(on);
    }

    fn set_fan_speed(&mut self, duty: u8) {
        self.fan_duty = duty.min(100);
    }
}

// ── MessagePort implementation ────────────────────────────────

impl MessagePort for SimulatedPack {
    fn send(&mut self, msg: &BmsMessage) {
        debug!("TX {} {:?}", msg.kind(), msg);
        self.outbox.push(msg.clone());
    }
}
