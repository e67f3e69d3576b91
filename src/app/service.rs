//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the FSM, the fault engine, and the shared context.
//! It exposes a hardware-agnostic API.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  TelemetryPort ──▶ ┌───────────────────────────┐ ──▶ EventSink
//!                    │        AppService         │
//!   ActuatorPort ◀── │  Faults · FSM · Boost     │ ──▶ MessagePort
//!                    └───────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::BmsConfig;
use crate::control::boost::BoostState;
use crate::diagnostics::TransitionLog;
use crate::error::{ConfigError, FAULTS_CLEAR, FaultMask, TransitionError};
use crate::fsm::context::{FsmContext, TelemetrySnapshot};
use crate::fsm::{Fsm, StateId};
use crate::safety::FaultEngine;
use crate::timer::SoftTimer;

use super::events::AppEvent;
use super::messages::BmsMessage;
use super::ports::{ActuatorPort, ConfigPort, EventSink, MessagePort, PackIo};

/// Quiet period after a config change before it is written to storage.
pub const CONFIG_SAVE_SETTLE_MS: u64 = 5_000;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all decision logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    faults: FaultEngine,
    /// Spaces out the full status broadcast.
    telemetry_timer: SoftTimer,
    rejections: TransitionLog,
    cycle_count: u64,
    config_dirty: bool,
    dirty_since_ms: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: BmsConfig) -> Self {
        Self {
            fsm: Fsm::new(StateId::Boot),
            ctx: FsmContext::new(config),
            faults: FaultEngine::new(),
            telemetry_timer: SoftTimer::new(),
            rejections: TransitionLog::new(),
            cycle_count: 0,
            config_dirty: false,
            dirty_since_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run BOOT's entry action and announce the initial state.
    pub fn start(&mut self, hw: &mut (impl ActuatorPort + MessagePort), sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx, hw);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one control cycle at monotonic time `now_ms`.
    ///
    /// Telemetry → pre-fault hook → charger flag → fault mask → fault
    /// preemption → state handler → fan → current limit → broadcast.
    pub fn tick(&mut self, now_ms: u64, hw: &mut impl PackIo, sink: &mut impl EventSink) {
        self.cycle_count += 1;
        self.ctx.now_ms = now_ms;
        let prev_state = self.fsm.current_state();
        let prev_boost = self.ctx.boost.state();
        let prev_mask = self.ctx.snapshot.fault_mask;

        // 1. Fresh snapshot, adapter hook, live charger input
        let mut snap = hw.read_telemetry();
        hw.pre_fault_check(&mut snap);
        snap.is_charger_connected = hw.charger_connected();

        // 2. Fault mask
        snap.fault_mask = self.faults.evaluate(&snap, &self.ctx.config, now_ms);
        self.ctx.snapshot = snap;

        // 3. Any fault preempts everything else this cycle
        if self.ctx.snapshot.fault_mask != FAULTS_CLEAR {
            self.ctx.snapshot.discharge_limit = 0;
            let res = self.fsm.request_transition(StateId::Faulted, &mut self.ctx, hw);
            self.note_refusal(res, sink);
        }

        // 4. State handler
        let res = self.fsm.tick(&mut self.ctx, hw);
        self.note_refusal(res, sink);

        // 5. Fan
        hw.set_fan_speed(self.ctx.snapshot.fan_duty);

        // 6. Advertised current limit
        self.ctx
            .boost
            .update(&mut self.ctx.snapshot, &self.ctx.config, now_ms);

        // 7. Slow status broadcast
        if !self.telemetry_timer.is_running(now_ms) {
            self.broadcast(hw);
            self.telemetry_timer
                .start(now_ms, self.ctx.config.telemetry_interval_ms);
        }

        // 8. Events
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
        let new_boost = self.ctx.boost.state();
        if new_boost != prev_boost {
            sink.emit(&AppEvent::BoostChanged {
                from: prev_boost,
                to: new_boost,
            });
        }
        let mask = self.ctx.snapshot.fault_mask;
        if mask != prev_mask {
            if mask == FAULTS_CLEAR {
                sink.emit(&AppEvent::FaultCleared);
            } else {
                sink.emit(&AppEvent::FaultDetected(mask));
            }
        }
    }

    /// Request a transition from outside the cycle (service tool, test
    /// harness).  Goes through the same gate as handler requests.
    pub fn request_state(
        &mut self,
        target: StateId,
        hw: &mut (impl ActuatorPort + MessagePort),
        sink: &mut impl EventSink,
    ) -> Result<(), TransitionError> {
        let prev = self.fsm.current_state();
        let res = self.fsm.request_transition(target, &mut self.ctx, hw);
        match res {
            Ok(()) => sink.emit(&AppEvent::StateChanged {
                from: prev,
                to: target,
            }),
            Err(e) => self.note_refusal(Err(e), sink),
        }
        res
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Cycles spent in the current state.
    pub fn ticks_in_state(&self) -> u64 {
        self.fsm.ticks_in_current_state()
    }

    /// Total control cycles executed since startup.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Fault mask from the latest cycle (0 = no faults).
    pub fn fault_mask(&self) -> FaultMask {
        self.ctx.snapshot.fault_mask
    }

    /// Fault mask captured when FAULTED was last entered.
    pub fn previous_fault(&self) -> FaultMask {
        self.ctx.previous_fault
    }

    pub fn boost_state(&self) -> BoostState {
        self.ctx.boost.state()
    }

    /// Advertised discharge limit (A) from the latest cycle.
    pub fn advertised_limit(&self) -> u16 {
        self.ctx.snapshot.boost_setting
    }

    /// The latest snapshot, including core-written fields.
    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.ctx.snapshot
    }

    /// Refused transition history.
    pub fn rejections(&self) -> &TransitionLog {
        &self.rejections
    }

    pub fn config(&self) -> &BmsConfig {
        &self.ctx.config
    }

    // ── Configuration ─────────────────────────────────────────

    /// Replace the live configuration.  Invalid configs are refused and the
    /// previous one stays in force.
    pub fn update_config(&mut self, config: BmsConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.ctx.config = config;
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_ms = self.ctx.now_ms;
        }
        info!("Configuration updated at runtime");
        Ok(())
    }

    /// Persist the config once it has been stable for
    /// [`CONFIG_SAVE_SETTLE_MS`].  Returns `true` if it was saved.
    pub fn auto_save_if_needed(&mut self, storage: &mut impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        if self.ctx.now_ms.saturating_sub(self.dirty_since_ms) < CONFIG_SAVE_SETTLE_MS {
            return false;
        }
        self.save_now(storage)
    }

    /// Save immediately if there are unsaved changes.
    pub fn force_save_if_dirty(&mut self, storage: &mut impl ConfigPort) -> bool {
        self.config_dirty && self.save_now(storage)
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    // ── Internal ──────────────────────────────────────────────

    fn save_now(&mut self, storage: &mut impl ConfigPort) -> bool {
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config saved");
                true
            }
            Err(e) => {
                warn!("Config save failed: {}", e);
                false
            }
        }
    }

    fn note_refusal(&mut self, res: Result<(), TransitionError>, sink: &mut impl EventSink) {
        if let Err(e) = res {
            if self.rejections.record(&e, self.ctx.now_ms) {
                sink.emit(&AppEvent::TransitionRejected(e));
            }
        }
    }

    fn broadcast(&self, hw: &mut (impl ActuatorPort + MessagePort)) {
        let s = &self.ctx.snapshot;
        let messages = [
            BmsMessage::AccStatus {
                pack_voltage: s.pack_voltage,
                pack_current: s.pack_current,
                soc: s.soc,
            },
            BmsMessage::Current {
                discharge_limit: s.boost_setting,
                charge_limit: s.charge_limit,
                pack_current: s.pack_current,
            },
            BmsMessage::BmsStatus {
                state: self.fsm.current_state(),
                fault_mask: s.fault_mask,
                avg_temp: s.avg_temp,
                balancing: hw.is_balancing(),
            },
            BmsMessage::CellTemps {
                max_temp: s.max_temp,
                min_temp: s.min_temp,
                avg_temp: s.avg_temp,
            },
            BmsMessage::CellData {
                max_voltage: s.max_voltage,
                min_voltage: s.min_voltage,
                avg_voltage: s.avg_voltage,
            },
            BmsMessage::SegmentTemps {
                temps: s.segment_temps,
            },
        ];
        for msg in &messages {
            hw.send(msg);
        }
    }
}
