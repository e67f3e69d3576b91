//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `config_store` | ConfigPort         | postcard blob / JSON file   |
//! | `log_sink`     | EventSink          | `log` facade (text or JSON) |
//! | `sim`          | TelemetryPort      | in-memory cell model        |
//! |                | ActuatorPort       | simulated relay pins        |
//! |                | MessagePort        | in-memory outbox            |

pub mod config_store;
pub mod log_sink;
pub mod sim;
