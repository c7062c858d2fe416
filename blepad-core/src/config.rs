//! Tuning values for the input pipeline, calibration engine and scheduler.
//!
//! Every struct has a `DEFAULT` constant holding the values the hardware was
//! tuned with, so firmware can build its configuration in a `const`.

/// One stick axis: raw center reading and direction factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisConfig {
    /// Raw reading with the stick at rest.
    pub center: u8,
    /// +1 keeps the raw direction, -1 inverts it.
    pub factor: i8,
}

/// Stick normalizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StickConfig {
    pub x: AxisConfig,
    pub y: AxisConfig,
    /// Left shift applied to centered values for the 16-bit stick axes.
    pub shift: u32,
}

impl StickConfig {
    /// Centers measured on the joystick unit; Y inverted so up is negative
    /// as HID expects.
    pub const DEFAULT: Self = Self {
        x: AxisConfig {
            center: 122,
            factor: 1,
        },
        y: AxisConfig {
            center: 122,
            factor: -1,
        },
        shift: 8,
    };
}

impl Default for StickConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Thresholds of the coulomb calibration rules.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    /// At or above this voltage the battery counts as full (V).
    pub voltage_high_v: f32,
    /// Below this voltage the battery is near cutoff (V).
    pub voltage_low_v: f32,
    /// Charge current separating "charging" from "charge complete" (mA).
    pub charge_current_low_ma: f32,
    /// Counter values below this are treated as drift (mAh).
    pub negative_threshold_mah: f32,
    /// Largest counter value believable near cutoff voltage (mAh).
    pub low_voltage_ceiling_mah: f32,
    /// Max charge used when no valid record is stored (mAh).
    pub default_max_mah: f32,
}

impl CalibrationConfig {
    pub const DEFAULT: Self = Self {
        voltage_high_v: 4.14,
        voltage_low_v: 3.2,
        charge_current_low_ma: 20.0,
        negative_threshold_mah: -0.5,
        low_voltage_ceiling_mah: 0.9,
        default_max_mah: 0.0,
    };
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Runs a job when `slot % period == phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Periodic {
    pub period: u16,
    pub phase: u16,
}

impl Periodic {
    #[must_use]
    pub const fn new(period: u16, phase: u16) -> Self {
        Self { period, phase }
    }
}

/// Cycle scheduler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduleConfig {
    /// Slots in one full cycle.
    pub slots_per_cycle: u16,
    /// Time budget of one slot in microseconds.
    pub slot_us: u32,
    /// Status display refresh.
    pub status: Periodic,
    /// Connection indicator refresh.
    pub link_indicator: Periodic,
    /// Battery telemetry read and calibration.
    pub battery: Periodic,
}

impl ScheduleConfig {
    /// 200 slots of 25 ms: a 5 s cycle, calibration every 2.5 s.
    pub const DEFAULT: Self = Self {
        slots_per_cycle: 200,
        slot_us: 25_000,
        status: Periodic::new(2, 0),
        link_indicator: Periodic::new(20, 1),
        battery: Periodic::new(100, 3),
    };
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything the application orchestrator needs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AppConfig {
    pub stick: StickConfig,
    pub calibration: CalibrationConfig,
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    pub const DEFAULT: Self = Self {
        stick: StickConfig::DEFAULT,
        calibration: CalibrationConfig::DEFAULT,
        schedule: ScheduleConfig::DEFAULT,
    };
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
