//! Charge gating and end-of-charge cutoff.
//!
//! ```text
//!   at ceiling ──▶ confirm (charge_cutoff_confirm_ms) ──▶ cooldown (charge_timeout_ms)
//!        ▲               │ voltage drops                      │ elapsed
//!        └───────────────┘ (cancel)                           ▼
//!                                                        permit again
//! ```

use log::{debug, info};

use crate::config::BmsConfig;
use crate::fsm::context::TelemetrySnapshot;
use crate::timer::SoftTimer;

/// Decides, once per CHARGING cycle, whether charge current may flow.
#[derive(Debug, Default)]
pub struct ChargingController {
    /// Confirms the charge ceiling is sustained before cutting off.
    cutoff_timer: SoftTimer,
    /// Cooldown after a cutoff.
    cooldown: SoftTimer,
}

impl ChargingController {
    pub const fn new() -> Self {
        Self {
            cutoff_timer: SoftTimer::new(),
            cooldown: SoftTimer::new(),
        }
    }

    /// Start a charging session from a clean slate (CHARGING entry action).
    /// A confirmation left pending by an earlier session is dropped along
    /// with any cooldown.
    pub fn begin_session(&mut self) {
        self.cutoff_timer.cancel();
        self.cooldown.cancel();
    }

    /// Whether a post-cutoff cooldown is still counting down.
    pub fn in_cooldown(&self, now_ms: u64) -> bool {
        self.cooldown.is_running(now_ms)
    }

    /// Whether the ceiling is currently being confirmed.
    pub fn cutoff_pending(&self) -> bool {
        self.cutoff_timer.is_active()
    }

    /// Returns `true` if charging is permitted this cycle.
    pub fn check(&mut self, snap: &TelemetrySnapshot, cfg: &BmsConfig, now_ms: u64) -> bool {
        if !snap.is_charger_connected {
            self.cutoff_timer.cancel();
            return false;
        }
        if self.cooldown.is_running(now_ms) {
            return false;
        }

        let at_ceiling = f32::from(snap.max_voltage) >= cfg.charge_ceiling_raw();

        // A sample below the ceiling never confirms a cutoff.
        if !at_ceiling {
            if self.cutoff_timer.is_active() {
                debug!("CHARGE: voltage fell below ceiling, cutoff cancelled");
                self.cutoff_timer.cancel();
            }
            return true;
        }

        if !self.cutoff_timer.is_active() {
            debug!("CHARGE: ceiling reached, confirming for {}ms", cfg.charge_cutoff_confirm_ms);
            self.cutoff_timer.start(now_ms, cfg.charge_cutoff_confirm_ms);
        } else if self.cutoff_timer.is_expired(now_ms) {
            info!(
                "CHARGE: cutoff confirmed (max cell {}), cooling down for {}ms",
                snap.max_voltage, cfg.charge_timeout_ms
            );
            self.cutoff_timer.cancel();
            self.cooldown.start(now_ms, cfg.charge_timeout_ms);
            return false;
        }

        true
    }
}
