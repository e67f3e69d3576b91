//! Burst discharge (boost) limiter.
//!
//! ```text
//!  STANDBY ──[current > cont_dcl]──▶ BOOSTING
//!     ▲                                 │ boost_duration_ms
//!     │                                 ▼
//!     └──────[boost_recharge_ms]──── RECHARGE
//! ```
//!
//! STANDBY and BOOSTING advertise `min(dcl, cont_dcl * burst_multiplier)`;
//! RECHARGE advertises `min(dcl, cont_dcl)` until the recovery window ends.

use log::info;
use serde::Serialize;

use crate::config::{BmsConfig, CURRENT_SCALE};
use crate::fsm::context::TelemetrySnapshot;
use crate::timer::SoftTimer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum BoostState {
    #[default]
    Standby,
    Boosting,
    Recharge,
}

#[derive(Debug, Default)]
pub struct BoostController {
    state: BoostState,
    boost_timer: SoftTimer,
    recharge_timer: SoftTimer,
}

impl BoostController {
    pub const fn new() -> Self {
        Self {
            state: BoostState::Standby,
            boost_timer: SoftTimer::new(),
            recharge_timer: SoftTimer::new(),
        }
    }

    pub fn state(&self) -> BoostState {
        self.state
    }

    /// Advance the boost machine and write the advertised discharge limit
    /// into `snap.boost_setting`.  Returns the advertised limit (A).
    pub fn update(&mut self, snap: &mut TelemetrySnapshot, cfg: &BmsConfig, now_ms: u64) -> u16 {
        if self.state == BoostState::Boosting && self.boost_timer.is_expired(now_ms) {
            info!("BOOST: burst window over, recovering for {}ms", cfg.boost_recharge_ms);
            self.state = BoostState::Recharge;
            self.boost_timer.cancel();
            self.recharge_timer.start(now_ms, cfg.boost_recharge_ms);
        }

        if self.state == BoostState::Recharge && self.recharge_timer.is_expired(now_ms) {
            info!("BOOST: recovery complete");
            self.state = BoostState::Standby;
            self.recharge_timer.cancel();
        }

        let continuous = f32::from(snap.cont_dcl) * CURRENT_SCALE;
        if self.state == BoostState::Standby && snap.pack_current as f32 > continuous {
            info!(
                "BOOST: current {} above continuous limit {}A, bursting",
                snap.pack_current, snap.cont_dcl
            );
            self.state = BoostState::Boosting;
            self.boost_timer.start(now_ms, cfg.boost_duration_ms);
        }

        let limit = match self.state {
            BoostState::Standby | BoostState::Boosting => {
                let burst = f32::from(snap.cont_dcl) * cfg.burst_multiplier;
                f32::from(snap.discharge_limit).min(burst) as u16
            }
            BoostState::Recharge => snap.cont_dcl.min(snap.discharge_limit),
        };
        snap.boost_setting = limit;
        limit
    }
}
