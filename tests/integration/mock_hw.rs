//! Mock pack adapter for integration tests.
//!
//! Serves a scriptable telemetry snapshot and records every output call
//! and outbound message so tests can assert on the full command history
//! without a cell model in the way.

use bms::app::events::AppEvent;
use bms::app::messages::BmsMessage;
use bms::app::ports::{ActuatorPort, EventSink, MessagePort, TelemetryPort};
use bms::control::balancing::BalancePlan;
use bms::fsm::context::TelemetrySnapshot;

// ── Output call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCall {
    Relay(bool),
    Charging(bool),
    Balancing(bool),
    Plan { marked: usize },
    FaultIndicator(bool),
    Fan(u8),
}

// ── MockPack ──────────────────────────────────────────────────

pub struct MockPack {
    /// Snapshot returned by every `read_telemetry` call.
    pub telemetry: TelemetrySnapshot,
    pub charger: bool,
    /// Overrides `max_temp` from the pre-fault hook when set.
    pub hook_max_temp: Option<i16>,
    pub hook_calls: usize,
    pub calls: Vec<OutputCall>,
    pub messages: Vec<BmsMessage>,
    balancing: bool,
}

#[allow(dead_code)]
impl MockPack {
    /// A healthy pack: mid-range cells, room temperature, no charger.
    pub fn new() -> Self {
        let mut telemetry = TelemetrySnapshot {
            min_voltage: 38_000,
            max_voltage: 38_000,
            avg_voltage: 38_000,
            max_temp: 25,
            min_temp: 25,
            avg_temp: 25,
            segment_temps: [25; 6],
            charge_limit: 20,
            discharge_limit: 200,
            cont_dcl: 100,
            fan_duty: 10,
            ..TelemetrySnapshot::default()
        };
        for row in &mut telemetry.cell_voltages {
            row.fill(38_000);
        }
        Self {
            telemetry,
            charger: false,
            hook_max_temp: None,
            hook_calls: 0,
            calls: Vec::new(),
            messages: Vec::new(),
            balancing: false,
        }
    }

    pub fn set_max_voltage(&mut self, raw: u16) {
        self.telemetry.max_voltage = raw;
        self.telemetry.delta_voltage = raw.saturating_sub(self.telemetry.min_voltage);
        self.telemetry.cell_voltages[0][0] = raw;
    }

    /// Last value written to the relay, if any.
    pub fn relay(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            OutputCall::Relay(v) => Some(*v),
            _ => None,
        })
    }

    pub fn charging(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            OutputCall::Charging(v) => Some(*v),
            _ => None,
        })
    }

    pub fn fault_indicator(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            OutputCall::FaultIndicator(v) => Some(*v),
            _ => None,
        })
    }

    pub fn balancing(&self) -> bool {
        self.balancing
    }

    pub fn charge_requests(&self) -> Vec<(f32, u16)> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                BmsMessage::ChargeRequest { voltage_v, current_a } => Some((*voltage_v, *current_a)),
                _ => None,
            })
            .collect()
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.messages.iter().filter(|m| m.kind() == kind).count()
    }

    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.messages.clear();
    }
}

impl Default for MockPack {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryPort for MockPack {
    fn read_telemetry(&mut self) -> TelemetrySnapshot {
        self.telemetry
    }

    fn pre_fault_check(&mut self, snap: &mut TelemetrySnapshot) {
        self.hook_calls += 1;
        if let Some(t) = self.hook_max_temp {
            snap.max_temp = t;
        }
    }

    fn charger_connected(&mut self) -> bool {
        self.charger
    }
}

impl ActuatorPort for MockPack {
    fn set_charge_relay(&mut self, closed: bool) {
        self.calls.push(OutputCall::Relay(closed));
    }

    fn enable_charging(&mut self, enabled: bool) {
        self.calls.push(OutputCall::Charging(enabled));
    }

    fn enable_balancing(&mut self, enabled: bool) {
        self.balancing = enabled;
        self.calls.push(OutputCall::Balancing(enabled));
    }

    fn configure_balancing(&mut self, plan: &BalancePlan) {
        self.balancing = true;
        self.calls.push(OutputCall::Plan {
            marked: plan.marked_count(),
        });
    }

    fn is_balancing(&self) -> bool {
        self.balancing
    }

    fn set_fault_indicator(&mut self, on: bool) {
        self.calls.push(OutputCall::FaultIndicator(on));
    }

    fn set_fan_speed(&mut self, duty: u8) {
        self.calls.push(OutputCall::Fan(duty));
    }
}

impl MessagePort for MockPack {
    fn send(&mut self, msg: &BmsMessage) {
        self.messages.push(msg.clone());
    }
}

// ── Recording event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
