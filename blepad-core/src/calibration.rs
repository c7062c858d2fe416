//! Coulomb counter drift correction.
//!
//! The PMIC integrates battery current into a charge counter, but the counter
//! drifts and knows nothing about the cell's real capacity. The calibrator
//! keeps a single reference, the counter value at 100 %, and corrects it (and
//! the counter) against points where the true charge is known:
//!
//! 1. Charging: the counter may exceed the reference; raise the reference.
//! 2. Charge complete: the counter now reads exactly "full"; lower the
//!    reference to it.
//! 3. On battery, counter below zero: drift; widen the reference by the
//!    deficit and zero the counter.
//! 4. Near cutoff voltage: the cell is empty whatever the counter says;
//!    shrink the reference by the remainder and zero the counter.
//!
//! Rules run in this order and rule 4 runs last, so it can undo a rule 1
//! raise in the same pass.

use blepad_proto::{ChargeStatus, InputPowerStatus};

use crate::config::CalibrationConfig;

/// One snapshot of the PMIC battery telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerReading {
    /// Battery voltage (V).
    pub voltage_v: f32,
    /// Battery power (mW).
    pub power_mw: f32,
    /// Battery current (mA).
    pub current_ma: f32,
    /// Charge current (mA).
    pub charge_current_ma: f32,
    /// Coulomb counter, charge in minus charge out (mAh).
    pub coulomb_mah: f32,
    pub input: InputPowerStatus,
    pub charge: ChargeStatus,
}

impl PowerReading {
    /// USB power is present.
    #[inline]
    #[must_use]
    pub const fn external_power(&self) -> bool {
        self.input.vbus_present()
    }

    #[inline]
    #[must_use]
    pub fn discharge_current_ma(&self) -> f32 {
        self.current_ma - self.charge_current_ma
    }
}

/// Calibration rule identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Rule {
    /// Charging with the counter above the reference.
    ChargingPeak = 0,
    /// Charge completed below the reference.
    ChargeComplete = 1,
    /// Counter drifted negative on battery.
    NegativeDrift = 2,
    /// Counter still positive near cutoff voltage.
    LowVoltage = 3,
}

impl Rule {
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of rules that fired in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RuleSet(u8);

impl RuleSet {
    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub const fn with(self, rule: Rule) -> Self {
        Self(self.0 | rule.bit())
    }

    pub fn insert(&mut self, rule: Rule) {
        self.0 |= rule.bit();
    }

    #[must_use]
    pub const fn contains(self, rule: Rule) -> bool {
        self.0 & rule.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Result of one calibration pass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationOutcome {
    pub fired: RuleSet,
    /// Reference after the pass (mAh).
    pub max_charge_mah: f32,
    /// Counter value after the pass; 0 when a rule zeroed it (mAh).
    pub coulomb_mah: f32,
    /// The hardware counter must be cleared to match `coulomb_mah`.
    pub clear_counter: bool,
    /// The reference changed and must be written to storage.
    pub persist: bool,
}

/// Run the four rules against one reading.
#[must_use]
pub fn calibrate(
    reading: &PowerReading,
    max_charge_mah: f32,
    config: &CalibrationConfig,
) -> CalibrationOutcome {
    let mut fired = RuleSet::EMPTY;
    let mut max = max_charge_mah;
    let mut coulomb = reading.coulomb_mah;
    let mut clear_counter = false;

    let external = reading.external_power();
    let voltage = reading.voltage_v;
    let charge_current = reading.charge_current_ma;

    if external
        && voltage < config.voltage_high_v
        && charge_current >= config.charge_current_low_ma
        && coulomb > max
    {
        max = coulomb;
        fired.insert(Rule::ChargingPeak);
    }

    if external
        && voltage >= config.voltage_high_v
        && charge_current < config.charge_current_low_ma
        && max > coulomb
    {
        max = coulomb;
        fired.insert(Rule::ChargeComplete);
    }

    if !external && voltage >= config.voltage_low_v && coulomb < config.negative_threshold_mah {
        max -= coulomb;
        coulomb = 0.0;
        clear_counter = true;
        fired.insert(Rule::NegativeDrift);
    }

    if voltage < config.voltage_low_v && coulomb > config.low_voltage_ceiling_mah {
        max -= coulomb;
        coulomb = 0.0;
        clear_counter = true;
        fired.insert(Rule::LowVoltage);
    }

    CalibrationOutcome {
        fired,
        max_charge_mah: max,
        coulomb_mah: coulomb,
        clear_counter,
        persist: !fired.is_empty(),
    }
}

/// `100 * coulomb / max`, 0 when no positive reference exists.
#[must_use]
pub fn battery_percent(coulomb_mah: f32, max_charge_mah: f32) -> f32 {
    if max_charge_mah > 0.0 {
        100.0 * coulomb_mah / max_charge_mah
    } else {
        0.0
    }
}

/// Battery level for the transport, 0..=100.
#[must_use]
pub fn battery_level(coulomb_mah: f32, max_charge_mah: f32) -> u8 {
    // NaN saturates to 0
    battery_percent(coulomb_mah, max_charge_mah).clamp(0.0, 100.0) as u8
}

/// Holds the calibrated reference between passes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoulombCalibrator {
    config: CalibrationConfig,
    max_charge_mah: f32,
}

impl CoulombCalibrator {
    /// New calibrator holding `config.default_max_mah`.
    #[must_use]
    pub const fn new(config: CalibrationConfig) -> Self {
        Self {
            max_charge_mah: config.default_max_mah,
            config,
        }
    }

    /// Calibrate against `reading` and keep the new reference.
    pub fn apply(&mut self, reading: &PowerReading) -> CalibrationOutcome {
        let outcome = calibrate(reading, self.max_charge_mah, &self.config);
        self.max_charge_mah = outcome.max_charge_mah;
        outcome
    }

    #[inline]
    #[must_use]
    pub const fn max_charge_mah(&self) -> f32 {
        self.max_charge_mah
    }

    pub fn set_max_charge_mah(&mut self, max_charge_mah: f32) {
        self.max_charge_mah = max_charge_mah;
    }

    /// Drop back to the configured default.
    pub fn reset(&mut self) {
        self.max_charge_mah = self.config.default_max_mah;
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    #[must_use]
    pub fn level(&self, coulomb_mah: f32) -> u8 {
        battery_level(coulomb_mah, self.max_charge_mah)
    }
}

impl Default for CoulombCalibrator {
    fn default() -> Self {
        Self::new(CalibrationConfig::DEFAULT)
    }
}
