//! Application-wide constants and compile-time configuration.
//!
//! Pin assignments, bus addresses, timing and the BLE identity live here so
//! they can be tuned in one place. Tuning of the input pipeline, the
//! calibration rules and the scheduler is [`APP_CONFIG`].

use blepad_core::AppConfig;
use blepad_proto::Buttons;

// Input pipeline

/// Core configuration: stick centers, calibration thresholds, schedule.
pub const APP_CONFIG: AppConfig = AppConfig::DEFAULT;

/// Button sampling period (ms). Three equal samples confirm an edge, so a
/// press is seen 15 ms after the contact settles.
pub const BUTTON_SAMPLE_MS: u64 = 5;

/// Report button of each GPIO button, by panel index.
pub const BUTTON_MAP: [Buttons; 2] = [Buttons::A, Buttons::B];

/// 7-bit I2C address of the joystick unit.
pub const JOYSTICK_ADDRESS: u8 = 0x52;

/// Upper bound for one joystick transfer (ms). Keeps a stuck bus from
/// eating the slot.
pub const JOYSTICK_TIMEOUT_MS: u64 = 2;

/// Upper bound for one PMIC register transfer (ms).
pub const PMIC_TIMEOUT_MS: u64 = 2;

// GPIO pin assignments
//
// These are logical names; the actual `embassy_nrf::peripherals::*` pins
// are selected in `main.rs`. Adjust for your custom PCB.
//
//   Button BLUE    → P0.11  (active low, pull-up)
//   Button RED     → P0.12  (active low, pull-up)
//   Stick  SDA     → P0.26  (TWISPI0)
//   Stick  SCL     → P0.27
//   PMIC   SDA     → P0.30  (TWISPI1)
//   PMIC   SCL     → P0.31
//   Link LED       → P0.13  (active low)

// BLE

/// Advertised and GAP device name.
pub const DEVICE_NAME: &str = "blepad";

/// Device information service: manufacturer name string.
pub const MANUFACTURER: &str = "blepad";

/// Device information service: PnP ID (vendor source USB, pid.codes test
/// VID/PID, version 1.0).
pub const PNP_ID: [u8; 7] = [0x02, 0x09, 0x12, 0x01, 0x00, 0x00, 0x01];

/// HID information: bcdHID 1.11, no country code, normally connectable.
pub const HID_INFO: [u8; 4] = [0x11, 0x01, 0x00, 0x02];

/// GAP appearance: HID gamepad.
pub const APPEARANCE_GAMEPAD: u16 = 0x03C4;

/// BLE connection interval range (in 1.25 ms units).
/// 6 = 7.5 ms (lowest latency for HID).
pub const BLE_CONN_INTERVAL_MIN: u16 = 6;
pub const BLE_CONN_INTERVAL_MAX: u16 = 12;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Delay before retrying after an advertising error (ms).
pub const ADVERTISE_RETRY_MS: u64 = 1000;
