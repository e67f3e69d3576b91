//! BMS host simulator, main entry point.
//!
//! Drives the decision core against a simulated accumulator on a virtual
//! clock.  No wall-clock sleeping: every cycle advances time by
//! `--period-ms`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  SimulatedPack            LogEventSink / JsonSink    │
//! │  (Telemetry+Actuator+Msg) (EventSink)                │
//! │                                                      │
//! │  ─────────────── Port Trait Boundary ─────────────   │
//! │                                                      │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │            AppService (pure logic)             │  │
//! │  │  Faults · FSM · Charging · Balancing · Boost   │  │
//! │  └────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use bms::adapters::config_store::JsonFileStore;
use bms::adapters::log_sink::{JsonEventSink, LogEventSink};
use bms::adapters::sim::SimulatedPack;
use bms::app::ports::{ConfigPort, EventSink};
use bms::app::service::AppService;
use bms::config::BmsConfig;
use bms::error::{ConfigError, FaultCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Plug in a charger and charge to cutoff.
    Charge,
    /// Draw a burst above the continuous limit.
    Boost,
    /// Heat the pack past its temperature limit, then cool it.
    Overheat,
    /// Push one cell past the absolute ceiling with no charger.
    Overvolt,
}

/// Accumulator BMS simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(short, long, value_enum, default_value = "charge")]
    scenario: Scenario,

    /// Number of control cycles
    #[arg(short, long, default_value = "3000")]
    cycles: u64,

    /// Control period (ms)
    #[arg(short, long, default_value = "100")]
    period_ms: u64,

    /// JSON config file (defaults used if absent)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Emit events as JSON lines
    #[arg(long)]
    json: bool,
}

fn load_config(args: &Args) -> Result<BmsConfig> {
    let Some(path) = &args.config else {
        return Ok(BmsConfig::default());
    };
    let store = JsonFileStore::new(path);
    match store.load() {
        Ok(cfg) => Ok(cfg),
        Err(ConfigError::NotFound) => {
            warn!("{} not found, using defaults", store.path().display());
            Ok(BmsConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", path.display())),
    }
}

fn prepare(pack: &mut SimulatedPack, scenario: Scenario) {
    match scenario {
        Scenario::Charge => {
            pack.fill_cells(41_800);
            pack.set_cell(4, 2, 41_300);
            pack.plug_charger(true);
        }
        Scenario::Boost => pack.set_load_current(1_200),
        Scenario::Overheat => pack.set_segment_temps(60),
        Scenario::Overvolt => pack.set_cell(0, 0, 42_600),
    }
}

/// Mid-run disturbance, applied at the halfway cycle.
fn midpoint(pack: &mut SimulatedPack, scenario: Scenario) {
    match scenario {
        Scenario::Boost => pack.set_load_current(500),
        Scenario::Overheat => pack.set_segment_temps(30),
        Scenario::Overvolt => pack.set_cell(0, 0, 41_000),
        Scenario::Charge => {}
    }
}

fn run(args: &Args, sink: &mut impl EventSink) -> Result<()> {
    let config = load_config(args)?;
    config.validate().context("config validation")?;

    let mut pack = SimulatedPack::new();
    prepare(&mut pack, args.scenario);

    let mut app = AppService::new(config);
    app.start(&mut pack, sink);

    let mut now_ms = 0u64;
    let mut sent = 0usize;
    for cycle in 0..args.cycles {
        if cycle == args.cycles / 2 {
            info!("SIM | midpoint disturbance");
            midpoint(&mut pack, args.scenario);
        }
        app.tick(now_ms, &mut pack, sink);
        sent += pack.take_messages().len();
        pack.step(args.period_ms);
        now_ms += args.period_ms;
    }

    let snap = app.snapshot();
    info!(
        "SIM | done: {} cycles, {}ms, state={:?}, boost={:?}, messages={}",
        app.cycle_count(),
        now_ms,
        app.state(),
        app.boost_state(),
        sent
    );
    info!(
        "SIM | cells {}..{} (0.1 mV), max temp {}°C, advertised {}A",
        snap.min_voltage,
        snap.max_voltage,
        snap.max_temp,
        app.advertised_limit()
    );
    for code in FaultCode::iter_mask(app.previous_fault()) {
        info!("SIM | last fault entry: {}", code);
    }
    if app.rejections().total() > 0 {
        warn!("SIM | {} transition(s) refused", app.rejections().total());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("Accumulator BMS simulator v{}", env!("CARGO_PKG_VERSION"));

    if args.json {
        run(&args, &mut JsonEventSink::new())
    } else {
        run(&args, &mut LogEventSink::new())
    }
}
