//! Log-based event sink adapters.
//!
//! [`LogEventSink`] writes human-readable lines through the `log` facade.
//! [`JsonEventSink`] writes one JSON object per event for tooling that
//! scrapes the console.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::error::FaultCode;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::FaultDetected(mask) => {
                warn!("FAULT | detected, mask=0b{:06b}", mask);
                for code in FaultCode::iter_mask(*mask) {
                    warn!("FAULT |   {}", code);
                }
            }
            AppEvent::FaultCleared => {
                info!("FAULT | all cleared");
            }
            AppEvent::TransitionRejected(err) => {
                warn!("STATE | rejected: {}", err);
            }
            AppEvent::BoostChanged { from, to } => {
                info!("BOOST | {:?} -> {:?}", from, to);
            }
        }
    }
}

/// Adapter that logs every [`AppEvent`] as a single JSON line.
#[derive(Debug, Default)]
pub struct JsonEventSink;

impl JsonEventSink {
    pub fn new() -> Self {
        Self
    }

    /// Render an event as a JSON string.
    pub fn render(event: &AppEvent) -> Option<String> {
        serde_json::to_string(event).ok()
    }
}

impl EventSink for JsonEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match Self::render(event) {
            Some(line) => info!("{}", line),
            None => warn!("EVENT | failed to serialize {:?}", event),
        }
    }
}
