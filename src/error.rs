//! Error and fault types for the BMS core.
//!
//! Faults are not errors in the `Result` sense: the fault evaluation engine
//! reports them as a bitmask that the state machine acts on.  The remaining
//! types here cover the few operations that can be refused (transition
//! requests, configuration load/save).

use core::fmt;

use serde::Serialize;

use crate::fsm::StateId;

// ---------------------------------------------------------------------------
// Fault codes
// ---------------------------------------------------------------------------

/// Raw fault bitmask.  Zero means no fault.
pub type FaultMask = u32;

/// Mask value with no fault set.
pub const FAULTS_CLEAR: FaultMask = 0;

/// Each fault code is a distinct bit, so simultaneously-firing rules can be
/// OR-combined into one [`FaultMask`] without losing information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FaultCode {
    /// A cell exceeded the charge ceiling or the absolute ceiling.
    CellVoltageTooHigh = 1 << 0,
    /// A cell dropped below the minimum operating voltage.
    CellVoltageTooLow = 1 << 1,
    /// Hottest cell above the temperature limit.
    PackTooHot = 1 << 2,
    /// Discharge current above the advertised limit (with margin).
    DischargeLimitEnforcement = 1 << 3,
    /// Charge current above the charge limit.
    ChargeLimitEnforcement = 1 << 4,
    /// A cell dropped below the hard damage floor.
    LowCellVoltage = 1 << 5,
}

impl FaultCode {
    pub const ALL: [FaultCode; 6] = [
        Self::CellVoltageTooHigh,
        Self::CellVoltageTooLow,
        Self::PackTooHot,
        Self::DischargeLimitEnforcement,
        Self::ChargeLimitEnforcement,
        Self::LowCellVoltage,
    ];

    /// Return the bitmask for this fault.
    pub const fn mask(self) -> FaultMask {
        self as FaultMask
    }

    /// Decode every fault set in `mask`.
    pub fn iter_mask(mask: FaultMask) -> impl Iterator<Item = FaultCode> {
        Self::ALL.into_iter().filter(move |f| mask & f.mask() != 0)
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CellVoltageTooHigh => write!(f, "cell voltage too high"),
            Self::CellVoltageTooLow => write!(f, "cell voltage too low"),
            Self::PackTooHot => write!(f, "pack too hot"),
            Self::DischargeLimitEnforcement => write!(f, "discharge limit exceeded"),
            Self::ChargeLimitEnforcement => write!(f, "charge limit exceeded"),
            Self::LowCellVoltage => write!(f, "cell below damage floor"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition errors
// ---------------------------------------------------------------------------

/// Why a transition request was refused.  The state machine never raises
/// these; the cycle handler drops them after counting the illegal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitionError {
    /// Requested state is already the current state.
    SameState(StateId),
    /// The transition table forbids `from -> to`.
    Illegal { from: StateId, to: StateId },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameState(s) => write!(f, "already in {s:?}"),
            Self::Illegal { from, to } => write!(f, "illegal transition {from:?} -> {to:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from [`ConfigPort`](crate::app::ports::ConfigPort) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
