//! Protocol state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  TransitionTable (from → to)                         │
//! │            BOOT   READY  CHARGING  FAULTED           │
//! │  BOOT       ·      ✓       ✗         ✓               │
//! │  READY      ✗      ·       ✓         ✓               │
//! │  CHARGING   ✗      ✓       ·         ✓               │
//! │  FAULTED    ✓      ✗       ✗         ·               │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Each cycle the engine runs the handler for the **current** state
//! ([`states::handle`]).  If it returns `Some(next)`, the request goes
//! through [`Fsm::request_transition`]: requests for the current state or
//! for a transition the table forbids are refused without touching state,
//! timers, or outputs.  An accepted request runs the next state's entry
//! action ([`states::enter`]) and switches the current state.

pub mod context;
pub mod states;

use context::FsmContext;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ActuatorPort, MessagePort};
use crate::error::TransitionError;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Top-level protocol states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StateId {
    Boot = 0,
    Ready = 1,
    Charging = 2,
    Faulted = 3,
}

impl StateId {
    /// Total number of states, used to size the transition table.
    pub const COUNT: usize = 4;

    pub const ALL: [StateId; Self::COUNT] = [Self::Boot, Self::Ready, Self::Charging, Self::Faulted];

    /// Convert an index back to `StateId`.  Out-of-range indices map to
    /// `Faulted` (the safe state) and trip a debug assertion.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Boot,
            1 => Self::Ready,
            2 => Self::Charging,
            3 => Self::Faulted,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Faulted
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Boot => "BOOT",
            Self::Ready => "READY",
            Self::Charging => "CHARGING",
            Self::Faulted => "FAULTED",
        }
    }
}

// ---------------------------------------------------------------------------
// Transition gate
// ---------------------------------------------------------------------------

/// Legal-transition matrix indexed `[from][to]`.  Diagonal entries are
/// never consulted: self-transitions are always no-ops.
pub struct TransitionTable([[bool; StateId::COUNT]; StateId::COUNT]);

impl TransitionTable {
    pub fn allows(&self, from: StateId, to: StateId) -> bool {
        self.0[from as usize][to as usize]
    }
}

/// The fixed transition table.
pub static TRANSITIONS: TransitionTable = TransitionTable([
    //  BOOT   READY  CHARGING FAULTED
    [true, true, false, true],  // BOOT
    [false, true, true, true],  // READY
    [false, true, true, true],  // CHARGING
    [true, false, false, true], // FAULTED
]);

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The protocol state machine.
pub struct Fsm {
    table: &'static TransitionTable,
    current: StateId,
    /// Monotonically increasing cycle counter.
    tick_count: u64,
    /// Cycle at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM starting in `initial`.
    pub fn new(initial: StateId) -> Self {
        Self {
            table: &TRANSITIONS,
            current: initial,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the entry action for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext, hw: &mut (impl ActuatorPort + MessagePort)) {
        info!("FSM starting in state: {}", self.current.name());
        states::enter(self.current, ctx, hw);
    }

    /// Run the current state's handler and apply any transition it requests.
    pub fn tick(
        &mut self,
        ctx: &mut FsmContext,
        hw: &mut (impl ActuatorPort + MessagePort),
    ) -> Result<(), TransitionError> {
        self.tick_count += 1;

        match states::handle(self.current, ctx, hw) {
            Some(next) => self.request_transition(next, ctx, hw),
            None => Ok(()),
        }
    }

    /// Gate a transition request through the table.
    ///
    /// A refused request leaves the state machine untouched.  The caller
    /// decides whether a refusal is worth reporting.
    pub fn request_transition(
        &mut self,
        next: StateId,
        ctx: &mut FsmContext,
        hw: &mut (impl ActuatorPort + MessagePort),
    ) -> Result<(), TransitionError> {
        if next == self.current {
            debug!("FSM: already in {}", next.name());
            return Err(TransitionError::SameState(next));
        }
        if !self.table.allows(self.current, next) {
            warn!(
                "FSM: refused illegal transition {} -> {}",
                self.current.name(),
                next.name()
            );
            return Err(TransitionError::Illegal {
                from: self.current,
                to: next,
            });
        }

        info!("FSM transition: {} -> {}", self.current.name(), next.name());
        states::enter(next, ctx, hw);
        self.current = next;
        self.state_entry_tick = self.tick_count;
        Ok(())
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        self.current
    }

    /// How many cycles the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }
}
