//! Power telemetry published next to the battery level.
//!
//! The device exposes a vendor power service alongside the standard battery
//! service. Each value is a characteristic of its own; this module only
//! builds the payload and defines the sink trait.

use core::future::Future;

use crate::calibration::PowerReading;

/// 1 mAh = 3.6 C.
const COULOMB_PER_MAH: f32 = 3.6;

/// Values of the power service.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerTelemetry {
    /// Battery voltage (V).
    pub voltage_v: f32,
    /// Battery power (mW).
    pub power_mw: f32,
    /// Charge current (mA).
    pub charge_current_ma: f32,
    /// Calibrated counter value (C).
    pub coulomb_c: f32,
    /// Current flows into the battery.
    pub charging: bool,
    pub vbus_present: bool,
    pub acin_present: bool,
}

impl PowerTelemetry {
    /// Flag bits of [`flags`](Self::flags).
    pub const FLAG_CHARGING: u8 = 0x01;
    pub const FLAG_VBUS: u8 = 0x02;
    pub const FLAG_ACIN: u8 = 0x04;

    /// Build from a reading and the counter value left after calibration.
    #[must_use]
    pub fn from_reading(reading: &PowerReading, coulomb_mah: f32) -> Self {
        Self {
            voltage_v: reading.voltage_v,
            power_mw: reading.power_mw,
            charge_current_ma: reading.charge_current_ma,
            coulomb_c: coulomb_mah * COULOMB_PER_MAH,
            charging: reading.input.is_charging_direction(),
            vbus_present: reading.input.vbus_present(),
            acin_present: reading.input.acin_present(),
        }
    }

    /// Status flags packed into one byte.
    #[must_use]
    pub const fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.charging {
            flags |= Self::FLAG_CHARGING;
        }
        if self.vbus_present {
            flags |= Self::FLAG_VBUS;
        }
        if self.acin_present {
            flags |= Self::FLAG_ACIN;
        }
        flags
    }
}

/// Error type for telemetry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryError {
    /// Telemetry not supported by this transport.
    NotSupported,
    /// I/O error during transmission.
    Io,
    /// Notification queue full.
    BufferFull,
}

impl core::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotSupported => write!(f, "telemetry not supported"),
            Self::Io => write!(f, "telemetry I/O error"),
            Self::BufferFull => write!(f, "telemetry buffer full"),
        }
    }
}

/// Trait for publishing power telemetry.
pub trait TelemetrySink {
    /// Publish one telemetry snapshot.
    fn publish(&mut self, data: &PowerTelemetry) -> impl Future<Output = Result<(), TelemetryError>>;

    /// Check if this sink supports telemetry transmission.
    ///
    /// Returns `false` by default.
    fn supports_telemetry(&self) -> bool {
        false
    }
}

/// Null telemetry sink that discards all data.
pub struct NullTelemetrySink;

impl TelemetrySink for NullTelemetrySink {
    async fn publish(&mut self, _data: &PowerTelemetry) -> Result<(), TelemetryError> {
        Err(TelemetryError::NotSupported)
    }
}
