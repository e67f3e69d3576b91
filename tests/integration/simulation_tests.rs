//! End-to-end runs against the simulated pack.

use super::mock_hw::RecordingSink;

use bms::adapters::sim::SimulatedPack;
use bms::app::events::AppEvent;
use bms::app::ports::{ActuatorPort, TelemetryPort};
use bms::app::service::AppService;
use bms::config::BmsConfig;
use bms::control::boost::BoostState;
use bms::error::FaultCode;
use bms::fsm::StateId;

const PERIOD_MS: u64 = 100;

fn run(app: &mut AppService, pack: &mut SimulatedPack, sink: &mut RecordingSink, from_ms: u64, to_ms: u64) {
    let mut t = from_ms;
    while t <= to_ms {
        app.tick(t, pack, sink);
        pack.step(PERIOD_MS);
        t += PERIOD_MS;
    }
}

fn started() -> (AppService, SimulatedPack, RecordingSink) {
    let mut app = AppService::new(BmsConfig::default());
    let mut pack = SimulatedPack::new();
    let mut sink = RecordingSink::new();
    app.start(&mut pack, &mut sink);
    (app, pack, sink)
}

#[test]
fn charging_raises_cells_and_balances_the_spread() {
    let (mut app, mut pack, mut sink) = started();
    pack.fill_cells(41_000);
    pack.set_cell(4, 2, 40_500);
    pack.plug_charger(true);

    run(&mut app, &mut pack, &mut sink, 0, 3_000);
    assert_eq!(app.state(), StateId::Charging);
    assert!(pack.is_balancing());
    assert!(pack.read_telemetry().min_voltage > 40_500);
    assert!(pack.take_messages().iter().any(|m| m.kind() == "charge_request"));
}

#[test]
fn overheat_faults_then_recovers() {
    let (mut app, mut pack, mut sink) = started();
    pack.set_segment_temps(60);

    run(&mut app, &mut pack, &mut sink, 0, 15_000);
    assert_eq!(app.state(), StateId::Faulted);
    assert!(pack.fault_indicator_on());
    assert_eq!(app.previous_fault(), FaultCode::PackTooHot.mask());
    assert_eq!(pack.fan_duty(), 100);

    pack.set_segment_temps(30);
    run(&mut app, &mut pack, &mut sink, 15_100, 15_200);
    assert_eq!(app.state(), StateId::Ready);
    assert!(!pack.fault_indicator_on());
    assert!(sink.contains(&AppEvent::FaultCleared));
}

#[test]
fn burst_load_enters_boost() {
    let (mut app, mut pack, mut sink) = started();
    pack.set_load_current(1_200);

    run(&mut app, &mut pack, &mut sink, 0, 1_000);
    assert_eq!(app.boost_state(), BoostState::Boosting);
    assert_eq!(app.advertised_limit(), 150);

    run(&mut app, &mut pack, &mut sink, 1_100, 5_000);
    assert_eq!(app.boost_state(), BoostState::Recharge);
    assert_eq!(app.advertised_limit(), 100);
}
