//! Pack configuration parameters
//!
//! All tunable thresholds, debounce windows, and timing for the BMS core.
//! Voltages are in volts and temperatures in degrees Celsius here; the
//! comparisons inside the core scale them to raw telemetry units
//! (0.1 mV per count for cell voltage, 0.1 A per count for pack current).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of analog front-end chips in the pack.
pub const NUM_CHIPS: usize = 12;
/// Cells monitored by each chip.
pub const CELLS_PER_CHIP: usize = 9;
/// Segments (two chips per segment).
pub const NUM_SEGMENTS: usize = NUM_CHIPS / 2;
/// Total series cells.
pub const NUM_CELLS: usize = NUM_CHIPS * CELLS_PER_CHIP;

/// Raw cell-voltage counts per volt.
pub const VOLT_SCALE: f32 = 10_000.0;
/// Raw pack-current counts per amp.
pub const CURRENT_SCALE: f32 = 10.0;

/// Debounce windows for the fault rules, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaultTimings {
    pub over_current_ms: u32,
    pub over_charge_current_ms: u32,
    pub under_voltage_ms: u32,
    pub over_voltage_ms: u32,
    pub low_cell_ms: u32,
    pub high_temp_ms: u32,
}

impl Default for FaultTimings {
    fn default() -> Self {
        Self {
            over_current_ms: 1_000,
            over_charge_current_ms: 1_000,
            under_voltage_ms: 15_000,
            over_voltage_ms: 15_000,
            low_cell_ms: 15_000,
            high_temp_ms: 60_000,
        }
    }
}

/// Core BMS configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BmsConfig {
    // --- Cell voltage limits (V) ---
    /// Lowest acceptable cell voltage
    pub min_cell_volt: f32,
    /// Charge ceiling: end-of-charge cell voltage
    pub max_charge_volt: f32,
    /// Absolute cell voltage ceiling
    pub max_cell_volt: f32,
    /// Hard floor in raw units (0.1 mV), below which a cell is considered damaged
    pub extreme_low_cell_raw: u16,

    // --- Temperature (°C) ---
    /// Maximum cell temperature before faulting
    pub max_cell_temp: i16,
    /// Maximum cell temperature at which balancing is allowed
    pub max_balancing_temp: i16,

    // --- Balancing ---
    /// Balancing only runs when the highest cell is above this voltage (V)
    pub balancing_min_volt: f32,
    /// Cell-to-minimum delta above which a cell is discharged (V)
    pub balancing_max_delta: f32,

    // --- Current ---
    /// Constant auxiliary draw (DC-DC converter) added to the discharge limit (A)
    pub aux_current_draw: f32,
    /// Tolerance applied on top of the discharge limit before faulting
    pub discharge_overcurrent_margin: f32,
    /// Burst multiplier applied to the continuous discharge limit
    pub burst_multiplier: f32,

    // --- Timing (ms) ---
    pub fault_timings: FaultTimings,
    /// How long voltage must sit at the charge ceiling before cutoff
    pub charge_cutoff_confirm_ms: u32,
    /// Cooldown after a charge cutoff before charging may resume
    pub charge_timeout_ms: u32,
    /// Minimum spacing of charge-request messages
    pub charge_message_interval_ms: u32,
    /// Period of the full telemetry broadcast
    pub telemetry_interval_ms: u32,
    /// Maximum duration of a discharge burst
    pub boost_duration_ms: u32,
    /// Mandatory recovery window after a burst
    pub boost_recharge_ms: u32,
}

impl Default for BmsConfig {
    fn default() -> Self {
        Self {
            // Cell voltage
            min_cell_volt: 2.5,
            max_charge_volt: 4.21,
            max_cell_volt: 4.25,
            extreme_low_cell_raw: 900,

            // Temperature
            max_cell_temp: 55,
            max_balancing_temp: 45,

            // Balancing
            balancing_min_volt: 4.0,
            balancing_max_delta: 0.02,

            // Current
            aux_current_draw: 1.0,
            discharge_overcurrent_margin: 1.04,
            burst_multiplier: 1.5,

            // Timing
            fault_timings: FaultTimings::default(),
            charge_cutoff_confirm_ms: 5_000,
            charge_timeout_ms: 300_000,
            charge_message_interval_ms: 250,
            telemetry_interval_ms: 1_000,
            boost_duration_ms: 5_000,
            boost_recharge_ms: 30_000,
        }
    }
}

impl BmsConfig {
    /// Charge ceiling in raw cell-voltage units.
    pub fn charge_ceiling_raw(&self) -> f32 {
        self.max_charge_volt * VOLT_SCALE
    }

    /// Full-pack target voltage requested from the charger (V).
    pub fn pack_charge_voltage(&self) -> f32 {
        self.max_charge_volt * NUM_CELLS as f32
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_cell_volt > 0.0 && self.min_cell_volt < self.max_charge_volt) {
            return Err(ConfigError::ValidationFailed(
                "min_cell_volt must be positive and below max_charge_volt",
            ));
        }
        if self.max_charge_volt > self.max_cell_volt {
            return Err(ConfigError::ValidationFailed(
                "max_charge_volt must not exceed max_cell_volt",
            ));
        }
        if self.max_cell_volt > 5.0 {
            return Err(ConfigError::ValidationFailed("max_cell_volt must be at most 5.0 V"));
        }
        if self.max_balancing_temp > self.max_cell_temp {
            return Err(ConfigError::ValidationFailed(
                "max_balancing_temp must not exceed max_cell_temp",
            ));
        }
        if !(self.balancing_max_delta > 0.0 && self.balancing_max_delta < 1.0) {
            return Err(ConfigError::ValidationFailed(
                "balancing_max_delta must be within (0, 1) V",
            ));
        }
        if self.aux_current_draw < 0.0 {
            return Err(ConfigError::ValidationFailed("aux_current_draw must not be negative"));
        }
        if self.discharge_overcurrent_margin < 1.0 {
            return Err(ConfigError::ValidationFailed(
                "discharge_overcurrent_margin must be at least 1.0",
            ));
        }
        if !(1.0..=10.0).contains(&self.burst_multiplier) {
            return Err(ConfigError::ValidationFailed("burst_multiplier must be 1.0–10.0"));
        }
        let t = &self.fault_timings;
        if [
            t.over_current_ms,
            t.over_charge_current_ms,
            t.under_voltage_ms,
            t.over_voltage_ms,
            t.low_cell_ms,
            t.high_temp_ms,
        ]
        .contains(&0)
        {
            return Err(ConfigError::ValidationFailed("fault debounce windows must be nonzero"));
        }
        if self.charge_message_interval_ms == 0 || self.telemetry_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("message intervals must be nonzero"));
        }
        if self.boost_duration_ms == 0 || self.boost_recharge_ms == 0 {
            return Err(ConfigError::ValidationFailed("boost windows must be nonzero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BmsConfig::default().validate().is_ok());
    }

    #[test]
    fn voltage_ordering_is_enforced() {
        let mut c = BmsConfig::default();
        c.max_charge_volt = 4.3;
        assert!(matches!(c.validate(), Err(ConfigError::ValidationFailed(_))));

        let mut c = BmsConfig::default();
        c.min_cell_volt = 4.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn zero_debounce_rejected() {
        let mut c = BmsConfig::default();
        c.fault_timings.high_temp_ms = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn burst_multiplier_below_one_rejected() {
        let mut c = BmsConfig::default();
        c.burst_multiplier = 0.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn pack_charge_voltage_scales_with_cell_count() {
        let c = BmsConfig::default();
        let expected = c.max_charge_volt * (NUM_CHIPS * CELLS_PER_CHIP) as f32;
        assert!((c.pack_charge_voltage() - expected).abs() < 0.001);
        assert!((c.charge_ceiling_raw() - 42_100.0).abs() < 0.5);
    }

    #[test]
    fn serde_roundtrip() {
        let c = BmsConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: BmsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = BmsConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: BmsConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.fault_timings, c2.fault_timings);
        assert!((c.max_charge_volt - c2.max_charge_volt).abs() < 0.0001);
    }
}
