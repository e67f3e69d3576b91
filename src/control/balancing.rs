//! Passive cell balancing.
//!
//! Balancing only runs while the charger is attached, the pack is cool
//! enough, the top cell is near full, and the pack spread is wide enough
//! to be worth bleeding.  Each cell more than `balancing_max_delta` above
//! the pack minimum is marked for discharge.

use log::debug;

use crate::config::{BmsConfig, CELLS_PER_CHIP, NUM_CHIPS, VOLT_SCALE};
use crate::fsm::context::TelemetrySnapshot;

/// Per-chip, per-cell discharge plan forwarded to the balancing hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalancePlan {
    cells: [[bool; CELLS_PER_CHIP]; NUM_CHIPS],
}

impl BalancePlan {
    /// Plan with no cell marked.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_marked(&self, chip: usize, cell: usize) -> bool {
        self.cells
            .get(chip)
            .and_then(|c| c.get(cell))
            .copied()
            .unwrap_or(false)
    }

    pub fn marked_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&m| m).count()
    }

    pub fn rows(&self) -> &[[bool; CELLS_PER_CHIP]; NUM_CHIPS] {
        &self.cells
    }
}

/// Gates and plans balancing.  Stateless apart from the last plan, which is
/// kept for diagnostics.
#[derive(Debug, Default)]
pub struct BalancingController {
    last_plan: BalancePlan,
}

impl BalancingController {
    pub const fn new() -> Self {
        Self {
            last_plan: BalancePlan {
                cells: [[false; CELLS_PER_CHIP]; NUM_CHIPS],
            },
        }
    }

    /// Whether balancing is permitted this cycle.
    pub fn should_balance(&self, snap: &TelemetrySnapshot, cfg: &BmsConfig) -> bool {
        if !snap.is_charger_connected {
            return false;
        }
        if snap.max_temp > cfg.max_balancing_temp {
            return false;
        }
        if f32::from(snap.max_voltage) <= cfg.balancing_min_volt * VOLT_SCALE {
            return false;
        }
        if f32::from(snap.delta_voltage) <= cfg.balancing_max_delta * VOLT_SCALE {
            return false;
        }
        true
    }

    /// Mark every cell more than the delta threshold above the pack minimum.
    pub fn plan(&mut self, snap: &TelemetrySnapshot, cfg: &BmsConfig) -> BalancePlan {
        let threshold = cfg.balancing_max_delta * VOLT_SCALE;
        let mut plan = BalancePlan::idle();

        for (row, readings) in plan.cells.iter_mut().zip(snap.cell_voltages.iter()) {
            for (marked, &v) in row.iter_mut().zip(readings.iter()) {
                let delta = v.saturating_sub(snap.min_voltage);
                *marked = f32::from(delta) > threshold;
            }
        }

        debug!("BALANCE: {} cells marked", plan.marked_count());
        self.last_plan = plan;
        plan
    }

    pub fn last_plan(&self) -> &BalancePlan {
        &self.last_plan
    }
}
