//! BLE gamepad firmware for nRF52840 + S140.
//!
//! This crate holds the hardware edge of the gamepad: I2C drivers for the
//! joystick unit and the AXP192 PMIC, GPIO button sampling, the status LED
//! and the BLE HID GATT server. The input pipeline, calibration and
//! scheduling live in `blepad-core`.

#![no_std]

// Re-export core types for convenience
pub use blepad_core::{
    AppConfig, AppError, ButtonPanel, Debouncer, GamepadApp, LinkEvent, LoadStatus, SlotReport,
    SlotTiming,
};
pub use blepad_proto::{Buttons, REPORT_DESCRIPTOR};

pub mod axp192;
pub mod ble;
pub mod buttons;
pub mod config;
pub mod indicator;
pub mod joystick;

mod bus;

pub use axp192::Axp192;
pub use ble::{BleLink, BleTransport, GamepadServer};
pub use buttons::GpioButtons;
pub use indicator::LedIndicator;
pub use joystick::Joystick;
