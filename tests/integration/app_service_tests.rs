//! Integration tests for the AppService → faults → FSM → outputs pipeline.
//!
//! Every cycle is driven on a virtual clock with a 100 ms period, so
//! debounce and rate-limit boundaries land on exact cycle times.

use super::mock_hw::{MockPack, OutputCall, RecordingSink};

use bms::app::events::AppEvent;
use bms::app::service::AppService;
use bms::config::BmsConfig;
use bms::control::boost::BoostState;
use bms::error::{FaultCode, TransitionError};
use bms::fsm::StateId;

const PERIOD_MS: u64 = 100;

struct Harness {
    app: AppService,
    pack: MockPack,
    sink: RecordingSink,
    now_ms: u64,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(BmsConfig::default())
    }

    fn with_config(config: BmsConfig) -> Self {
        let mut app = AppService::new(config);
        let mut pack = MockPack::new();
        let mut sink = RecordingSink::new();
        app.start(&mut pack, &mut sink);
        Self {
            app,
            pack,
            sink,
            now_ms: 0,
        }
    }

    /// Run one cycle at `now_ms`, then advance the clock.
    fn tick(&mut self) {
        self.app.tick(self.now_ms, &mut self.pack, &mut self.sink);
        self.now_ms += PERIOD_MS;
    }

    /// Run every cycle up to and including time `t_ms`.
    fn run_until(&mut self, t_ms: u64) {
        while self.now_ms <= t_ms {
            self.tick();
        }
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn boots_into_ready_on_first_cycle() {
    let mut h = Harness::new();
    assert_eq!(h.app.state(), StateId::Boot);
    assert!(h.sink.contains(&AppEvent::Started(StateId::Boot)));

    h.tick();
    assert_eq!(h.app.state(), StateId::Ready);
    assert!(h.sink.contains(&AppEvent::StateChanged {
        from: StateId::Boot,
        to: StateId::Ready
    }));
    assert_eq!(h.pack.charging(), Some(false));
    assert!(!h.pack.balancing());
}

#[test]
fn fan_duty_is_forwarded_every_cycle() {
    let mut h = Harness::new();
    h.run_until(300);
    let fans = h
        .pack
        .calls
        .iter()
        .filter(|c| **c == OutputCall::Fan(10))
        .count();
    assert_eq!(fans, 4);
}

#[test]
fn status_broadcast_is_rate_limited() {
    let mut h = Harness::new();
    h.tick();
    for kind in [
        "acc_status",
        "bms_status",
        "cell_temps",
        "cell_data",
        "segment_temps",
    ] {
        assert_eq!(h.pack.count_kind(kind), 1, "{kind}");
    }

    h.run_until(900);
    assert_eq!(h.pack.count_kind("bms_status"), 1);
    h.run_until(1000);
    assert_eq!(h.pack.count_kind("bms_status"), 2);
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn sustained_fault_forces_faulted_with_zero_discharge_limit() {
    let mut h = Harness::new();
    h.pack.telemetry.max_temp = 60;

    h.run_until(14_900);
    assert_eq!(h.app.state(), StateId::Ready);
    assert_eq!(h.app.fault_mask(), 0);

    h.tick();
    let mask = FaultCode::PackTooHot.mask();
    assert_eq!(h.app.state(), StateId::Faulted);
    assert_eq!(h.app.fault_mask(), mask);
    assert_eq!(h.app.snapshot().discharge_limit, 0);
    assert_eq!(h.app.advertised_limit(), 0);
    assert_eq!(h.app.previous_fault(), mask);
    assert_eq!(h.pack.fault_indicator(), Some(true));
    assert_eq!(h.pack.relay(), Some(false));
    assert!(h.sink.contains(&AppEvent::FaultDetected(mask)));
    assert!(h.sink.contains(&AppEvent::StateChanged {
        from: StateId::Ready,
        to: StateId::Faulted
    }));
}

#[test]
fn fault_preempts_charging() {
    let mut h = Harness::new();
    h.pack.charger = true;
    h.pack.telemetry.max_temp = 60;
    h.run_until(14_900);
    assert_eq!(h.app.state(), StateId::Charging);

    h.tick();
    assert_eq!(h.app.state(), StateId::Faulted);
    assert_eq!(h.pack.charging(), Some(false));
    assert_eq!(h.pack.relay(), Some(false));
    assert!(!h.pack.balancing());
}

#[test]
fn faulted_returns_to_boot_on_first_clear_cycle() {
    let mut h = Harness::new();
    h.pack.telemetry.max_temp = 60;
    h.run_until(15_000);
    assert_eq!(h.app.state(), StateId::Faulted);
    h.run_until(16_000);
    assert_eq!(h.app.state(), StateId::Faulted);

    h.pack.telemetry.max_temp = 25;
    h.pack.clear_log();
    h.tick();
    assert_eq!(h.app.state(), StateId::Boot);
    assert_eq!(h.app.fault_mask(), 0);
    assert_eq!(h.pack.fault_indicator(), Some(false));
    assert_eq!(h.pack.charging(), Some(false));
    assert!(h.pack.calls.contains(&OutputCall::Balancing(false)));
    assert!(h.sink.contains(&AppEvent::FaultCleared));
    assert_eq!(h.app.previous_fault(), FaultCode::PackTooHot.mask());

    h.tick();
    assert_eq!(h.app.state(), StateId::Ready);
}

#[test]
fn brief_fault_condition_never_latches() {
    let mut h = Harness::new();
    h.pack.telemetry.max_temp = 60;
    h.run_until(14_000);
    h.pack.telemetry.max_temp = 25;
    h.tick();
    h.pack.telemetry.max_temp = 60;
    h.run_until(29_000);
    assert_eq!(h.app.state(), StateId::Ready);
}

#[test]
fn absolute_ceiling_without_charger_faults_after_window() {
    let mut h = Harness::new();
    h.pack.set_max_voltage(42_600);

    h.run_until(14_900);
    assert_eq!(h.app.state(), StateId::Ready);

    h.tick();
    assert_eq!(h.app.state(), StateId::Faulted);
    assert_ne!(h.app.fault_mask() & FaultCode::CellVoltageTooHigh.mask(), 0);
    assert_eq!(h.app.snapshot().discharge_limit, 0);
}

#[test]
fn pre_fault_hook_feeds_fault_evaluation() {
    let mut h = Harness::new();
    h.pack.hook_max_temp = Some(70);
    h.run_until(15_000);
    assert_eq!(h.pack.hook_calls, 151);
    assert_eq!(h.app.state(), StateId::Faulted);
    assert_eq!(h.app.fault_mask(), FaultCode::PackTooHot.mask());
}

// ── Charging ──────────────────────────────────────────────────

#[test]
fn charger_drives_ready_to_charging_and_back() {
    let mut h = Harness::new();
    h.pack.charger = true;
    h.run_until(100);
    assert_eq!(h.app.state(), StateId::Charging);

    h.pack.charger = false;
    h.tick();
    assert_eq!(h.app.state(), StateId::Ready);
    assert_eq!(h.pack.charging(), Some(false));
}

#[test]
fn relay_closes_only_on_charge_request_cycles() {
    let mut h = Harness::new();
    h.pack.charger = true;
    h.run_until(100);

    // t=200: first CHARGING cycle sends a request.
    h.tick();
    assert_eq!(h.pack.relay(), Some(true));
    assert_eq!(h.pack.charging(), Some(true));
    assert_eq!(h.pack.charge_requests().len(), 1);

    h.tick();
    assert_eq!(h.pack.relay(), Some(false));
    h.tick();
    assert_eq!(h.pack.relay(), Some(false));
    assert_eq!(h.pack.charge_requests().len(), 1);

    // t=500: 250 ms since the last request.
    h.tick();
    assert_eq!(h.pack.relay(), Some(true));
    assert_eq!(h.pack.charge_requests().len(), 2);

    let cfg = BmsConfig::default();
    let (voltage, current) = h.pack.charge_requests()[0];
    assert!((voltage - cfg.pack_charge_voltage()).abs() < 1e-3);
    assert_eq!(current, 20);
}

#[test]
fn charge_cuts_off_after_confirmation_window() {
    let mut h = Harness::new();
    h.pack.charger = true;
    h.pack.set_max_voltage(42_200);

    h.run_until(5_100);
    assert_eq!(h.pack.charging(), Some(true));

    h.run_until(5_600);
    assert_eq!(h.app.state(), StateId::Charging);
    assert_eq!(h.pack.charging(), Some(false));
    assert_eq!(h.pack.relay(), Some(false));
    let last = h.pack.charge_requests().last().copied();
    assert_eq!(last.map(|(_, a)| a), Some(0));
}

#[test]
fn replugged_charger_starts_a_fresh_session() {
    let mut h = Harness::new();
    h.pack.charger = true;
    h.pack.set_max_voltage(42_200);
    h.run_until(2_000);
    assert_eq!(h.pack.charging(), Some(true));

    // Unplugged mid-confirmation; cells relax well below the ceiling.
    h.pack.charger = false;
    h.pack.set_max_voltage(40_000);
    h.run_until(60_000);
    assert_eq!(h.app.state(), StateId::Ready);

    h.pack.charger = true;
    h.run_until(60_300);
    assert_eq!(h.app.state(), StateId::Charging);
    assert_eq!(h.pack.charging(), Some(true));
    let last = h.pack.charge_requests().last().copied();
    assert_eq!(last.map(|(_, a)| a), Some(20));
}

#[test]
fn balancing_runs_while_charging_a_spread_pack() {
    let mut h = Harness::new();
    h.pack.charger = true;
    h.pack.telemetry.min_voltage = 40_500;
    for row in &mut h.pack.telemetry.cell_voltages {
        row.fill(40_500);
    }
    h.pack.set_max_voltage(41_000);

    h.run_until(200);
    assert!(h.pack.balancing());
    assert!(h.pack.calls.contains(&OutputCall::Plan { marked: 1 }));
}

// ── Boost ─────────────────────────────────────────────────────

#[test]
fn boost_cycle_limits_advertised_current() {
    let cfg = BmsConfig {
        burst_multiplier: 1.2,
        ..BmsConfig::default()
    };
    let mut h = Harness::with_config(cfg);
    h.pack.telemetry.pack_current = 1050;

    h.tick();
    assert_eq!(h.app.boost_state(), BoostState::Boosting);
    assert_eq!(h.app.advertised_limit(), 120);

    h.run_until(4_900);
    assert_eq!(h.app.boost_state(), BoostState::Boosting);

    h.tick();
    assert_eq!(h.app.boost_state(), BoostState::Recharge);
    assert_eq!(h.app.advertised_limit(), 100);
    assert!(h.sink.contains(&AppEvent::BoostChanged {
        from: BoostState::Boosting,
        to: BoostState::Recharge
    }));

    h.pack.telemetry.pack_current = 500;
    h.run_until(34_900);
    assert_eq!(h.app.boost_state(), BoostState::Recharge);
    assert!(h.app.advertised_limit() <= 100);

    h.tick();
    assert_eq!(h.app.boost_state(), BoostState::Standby);
    assert_eq!(h.app.advertised_limit(), 120);
}

// ── Transition gate ───────────────────────────────────────────

#[test]
fn illegal_request_is_refused_and_recorded() {
    let mut h = Harness::new();
    let res = h
        .app
        .request_state(StateId::Charging, &mut h.pack, &mut h.sink);
    let err = TransitionError::Illegal {
        from: StateId::Boot,
        to: StateId::Charging,
    };
    assert_eq!(res, Err(err));
    assert_eq!(h.app.state(), StateId::Boot);
    assert_eq!(h.app.rejections().total(), 1);
    assert!(h.sink.contains(&AppEvent::TransitionRejected(err)));
}

#[test]
fn same_state_request_is_silent() {
    let mut h = Harness::new();
    let events_before = h.sink.events.len();
    let res = h.app.request_state(StateId::Boot, &mut h.pack, &mut h.sink);
    assert_eq!(res, Err(TransitionError::SameState(StateId::Boot)));
    assert_eq!(h.app.rejections().total(), 0);
    assert_eq!(h.sink.events.len(), events_before);
}

#[test]
fn legal_request_runs_entry_action() {
    let mut h = Harness::new();
    h.tick();
    h.app
        .request_state(StateId::Faulted, &mut h.pack, &mut h.sink)
        .unwrap();
    assert_eq!(h.app.state(), StateId::Faulted);
    assert!(!h.pack.balancing());

    // Nothing is actually wrong, so the next cycle reboots.
    h.tick();
    assert_eq!(h.app.state(), StateId::Boot);
}
