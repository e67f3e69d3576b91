//! Outbound messages handed to the [`MessagePort`](super::ports::MessagePort).
//!
//! Payloads carry engineering values only.  Bus framing, identifiers and
//! scaling for the wire are left to the adapter.

use serde::Serialize;

use crate::config::NUM_SEGMENTS;
use crate::error::FaultMask;
use crate::fsm::StateId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BmsMessage {
    /// Pack-level summary for the vehicle.
    AccStatus {
        pack_voltage: f32,
        /// 0.1 A
        pack_current: i32,
        soc: u8,
    },
    /// Advertised current limits (A) and instantaneous current (0.1 A).
    Current {
        discharge_limit: u16,
        charge_limit: u16,
        pack_current: i32,
    },
    BmsStatus {
        state: StateId,
        fault_mask: FaultMask,
        avg_temp: i16,
        balancing: bool,
    },
    CellTemps {
        max_temp: i16,
        min_temp: i16,
        avg_temp: i16,
    },
    /// Cell voltage extremes (0.1 mV).
    CellData {
        max_voltage: u16,
        min_voltage: u16,
        avg_voltage: u16,
    },
    SegmentTemps { temps: [i16; NUM_SEGMENTS] },
    /// Charger setpoint.  `current_a == 0` asks the charger to hold off.
    ChargeRequest { voltage_v: f32, current_a: u16 },
}

impl BmsMessage {
    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccStatus { .. } => "acc_status",
            Self::Current { .. } => "current",
            Self::BmsStatus { .. } => "bms_status",
            Self::CellTemps { .. } => "cell_temps",
            Self::CellData { .. } => "cell_data",
            Self::SegmentTemps { .. } => "segment_temps",
            Self::ChargeRequest { .. } => "charge_request",
        }
    }
}
