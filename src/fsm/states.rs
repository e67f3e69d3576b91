//! Per-state entry actions and handlers.
//!
//! Dispatch is a plain `match` on [`StateId`]; every state has exactly one
//! entry action and one handler.  Handlers return `Some(next)` to request a
//! transition, which the engine then gates through the transition table.
//!
//! ```text
//!  BOOT ──────────────▶ READY ──[charger in]──▶ CHARGING
//!    ▲                    ▲                         │
//!    │                    └──────[charger out]──────┘
//!    │
//!    └──[mask clear]── FAULTED ◀──[any fault]── (any state)
//! ```

use super::StateId;
use super::context::FsmContext;
use crate::app::messages::BmsMessage;
use crate::app::ports::{ActuatorPort, MessagePort};
use log::{debug, info, warn};

/// Run the entry action for `state`.
pub fn enter(state: StateId, ctx: &mut FsmContext, hw: &mut (impl ActuatorPort + MessagePort)) {
    match state {
        StateId::Boot => boot_enter(ctx, hw),
        StateId::Ready => ready_enter(ctx, hw),
        StateId::Charging => charging_enter(ctx, hw),
        StateId::Faulted => faulted_enter(ctx, hw),
    }
}

/// Run the handler for `state`.  Returns the requested next state, if any.
pub fn handle(
    state: StateId,
    ctx: &mut FsmContext,
    hw: &mut (impl ActuatorPort + MessagePort),
) -> Option<StateId> {
    match state {
        StateId::Boot => boot_handle(ctx, hw),
        StateId::Ready => ready_handle(ctx, hw),
        StateId::Charging => charging_handle(ctx, hw),
        StateId::Faulted => faulted_handle(ctx, hw),
    }
}

/// Balancing off, charge current inhibited, relay open.
fn outputs_off(hw: &mut impl ActuatorPort) {
    hw.enable_balancing(false);
    hw.enable_charging(false);
    hw.set_charge_relay(false);
}

// ═══════════════════════════════════════════════════════════════════════════
//  BOOT
// ═══════════════════════════════════════════════════════════════════════════

fn boot_enter(_ctx: &mut FsmContext, hw: &mut impl ActuatorPort) {
    // Re-entry from FAULTED must leave outputs off in the same cycle.
    outputs_off(hw);
    info!("BOOT: outputs disabled");
}

fn boot_handle(_ctx: &mut FsmContext, hw: &mut impl ActuatorPort) -> Option<StateId> {
    outputs_off(hw);
    Some(StateId::Ready)
}

// ═══════════════════════════════════════════════════════════════════════════
//  READY: discharge allowed, waiting for a charger
// ═══════════════════════════════════════════════════════════════════════════

fn ready_enter(_ctx: &mut FsmContext, hw: &mut impl ActuatorPort) {
    outputs_off(hw);
    info!("READY: idle, waiting for charger");
}

fn ready_handle(ctx: &mut FsmContext, hw: &mut impl MessagePort) -> Option<StateId> {
    if ctx.snapshot.is_charger_connected {
        info!("READY: charger connected");
        return Some(StateId::Charging);
    }

    let limit = ctx.boost.update(&mut ctx.snapshot, &ctx.config, ctx.now_ms);
    hw.send(&BmsMessage::Current {
        discharge_limit: limit,
        charge_limit: ctx.snapshot.charge_limit,
        pack_current: ctx.snapshot.pack_current,
    });
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CHARGING: relay, charge enable, balancing, charger requests
// ═══════════════════════════════════════════════════════════════════════════

fn charging_enter(ctx: &mut FsmContext, _hw: &mut impl ActuatorPort) {
    ctx.charging.begin_session();
    info!("CHARGING: session started");
}

fn charging_handle(
    ctx: &mut FsmContext,
    hw: &mut (impl ActuatorPort + MessagePort),
) -> Option<StateId> {
    if !ctx.snapshot.is_charger_connected {
        info!("CHARGING: charger removed");
        return Some(StateId::Ready);
    }

    let permitted = ctx.charging.check(&ctx.snapshot, &ctx.config, ctx.now_ms);
    hw.set_charge_relay(permitted);
    hw.enable_charging(permitted);

    if ctx.balancing.should_balance(&ctx.snapshot, &ctx.config) {
        let plan = ctx.balancing.plan(&ctx.snapshot, &ctx.config);
        hw.configure_balancing(&plan);
    } else {
        hw.enable_balancing(false);
    }

    if ctx.charge_message_timer.is_running(ctx.now_ms) {
        // Relay is only held closed on cycles that carry a fresh request.
        hw.set_charge_relay(false);
    } else {
        let request = BmsMessage::ChargeRequest {
            voltage_v: ctx.config.pack_charge_voltage(),
            current_a: if permitted { ctx.snapshot.charge_limit } else { 0 },
        };
        debug!("CHARGING: sending {request:?}");
        hw.send(&request);
        ctx.charge_message_timer
            .start(ctx.now_ms, ctx.config.charge_message_interval_ms);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAULTED: hold outputs safe until every fault clears
// ═══════════════════════════════════════════════════════════════════════════

fn faulted_enter(ctx: &mut FsmContext, hw: &mut impl ActuatorPort) {
    outputs_off(hw);
    ctx.entered_fault = true;
    warn!("FAULTED: outputs disabled");
}

fn faulted_handle(ctx: &mut FsmContext, hw: &mut impl ActuatorPort) -> Option<StateId> {
    if ctx.entered_fault {
        ctx.previous_fault = ctx.snapshot.fault_mask;
        ctx.entered_fault = false;
        warn!("FAULTED: entry fault mask {:#06x}", ctx.previous_fault);
    }

    if !ctx.has_faults() {
        info!("FAULTED: all faults cleared, rebooting");
        hw.set_fault_indicator(false);
        return Some(StateId::Boot);
    }

    hw.set_fault_indicator(true);
    hw.set_charge_relay(false);
    None
}
