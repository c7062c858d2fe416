//! Platform-agnostic input pipeline, battery calibration and scheduling for
//! the BLE gamepad.
//!
//! This crate holds everything that does not touch hardware. Peripherals,
//! the radio and storage are collaborator traits, implemented on the device
//! by the firmware crate and by mocks in tests.
//!
//! # Overview
//!
//! - [`debounce`]: shift-register debouncing and the press latch shared
//!   with the sampling context ([`Debouncer`], [`ButtonPanel`])
//! - [`stick`]: raw joystick samples to signed axes ([`normalize`])
//! - [`connection`]: link state and connection-gated sends ([`HidLink`])
//! - [`calibration`]: coulomb counter drift correction ([`calibrate`])
//! - [`battery`]: PMIC telemetry plus the persisted reference ([`BatteryMonitor`])
//! - [`scheduler`]: fixed-slot cycle scheduler ([`CycleScheduler`])
//! - [`app`]: wires all of the above into one slot ([`GamepadApp`])
//!
//! # Example
//!
//! ```rust
//! use blepad_core::{calibrate, CalibrationConfig, PowerReading, Rule};
//! use blepad_proto::InputPowerStatus;
//!
//! // Charging on USB with the counter above the stored reference
//! let reading = PowerReading {
//!     voltage_v: 4.10,
//!     charge_current_ma: 25.0,
//!     coulomb_mah: 1200.0,
//!     input: InputPowerStatus(0b0010_0000),
//!     ..PowerReading::default()
//! };
//! let outcome = calibrate(&reading, 1000.0, &CalibrationConfig::DEFAULT);
//! assert!(outcome.fired.contains(Rule::ChargingPeak));
//! assert_eq!(outcome.max_charge_mah, 1200.0);
//! assert!(outcome.persist);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations,
//! making it suitable for embedded systems with limited resources.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod app;
pub mod battery;
pub mod calibration;
pub mod config;
pub mod connection;
pub mod debounce;
pub mod input;
pub mod scheduler;
pub mod stick;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use app::{
    AppError, GamepadApp, InputSnapshot, Job, NullIndicator, SlotReport, StartReport,
    StatusIndicator, STICK_BUTTON,
};
pub use battery::{
    BatteryError, BatteryMonitor, BatteryUpdate, CalibrationStore, LoadStatus, PowerMonitor,
    StorageError,
};
pub use calibration::{
    battery_level, battery_percent, calibrate, CalibrationOutcome, CoulombCalibrator,
    PowerReading, Rule, RuleSet,
};
pub use config::{
    AppConfig, AxisConfig, CalibrationConfig, Periodic, ScheduleConfig, StickConfig,
};
pub use connection::{ConnectionState, ConnectionTracker, Delivery, HidLink, LinkAction};
pub use debounce::{ButtonEvent, ButtonHistory, ButtonLatch, ButtonPanel, Debouncer};
pub use input::{ButtonSampler, InputError, RawStickSample, StickInput};
pub use scheduler::{CycleScheduler, ScheduleError, SlotStats, SlotTiming};
pub use stick::{normalize, normalize_trigger};
pub use telemetry::{NullTelemetrySink, PowerTelemetry, TelemetryError, TelemetrySink};
pub use transport::{LinkEvent, Transport, TransportError};
