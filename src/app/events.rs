//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them (serial log, JSON lines, a diagnostics bus).

use serde::Serialize;

use crate::control::boost::BoostState;
use crate::error::{FaultMask, TransitionError};
use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// The fault mask changed to a non-zero value.
    FaultDetected(FaultMask),

    /// All faults have been cleared.
    FaultCleared,

    /// An illegal transition was requested and refused.
    TransitionRejected(TransitionError),

    /// The boost sub-machine changed state.
    BoostChanged { from: BoostState, to: BoostState },
}
