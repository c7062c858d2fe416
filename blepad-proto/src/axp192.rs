//! AXP192 power-management IC register map and value decoding.
//!
//! Only the registers needed for battery telemetry are covered. Decoding is
//! pure so it can be tested on the host; the I2C transfers live in the
//! firmware driver.

/// 7-bit I2C address.
pub const I2C_ADDRESS: u8 = 0x34;

/// Input power status.
pub const REG_POWER_STATUS: u8 = 0x00;
/// Power mode / charge status.
pub const REG_CHARGE_STATUS: u8 = 0x01;
/// First of the six battery-backed data buffer registers (0x06..=0x0B).
pub const REG_DATA_BUFFER: u8 = 0x06;
/// ADC enable 1: battery voltage/current, ACIN and VBUS channels.
pub const REG_ADC_ENABLE_1: u8 = 0x82;
/// Battery instantaneous power, 24 bit big-endian (0x70..=0x72).
pub const REG_BAT_POWER: u8 = 0x70;
/// Battery voltage, 12 bit (0x78..=0x79).
pub const REG_BAT_VOLTAGE: u8 = 0x78;
/// Battery charge current, 13 bit (0x7A..=0x7B).
pub const REG_BAT_CHARGE_CURRENT: u8 = 0x7A;
/// Battery discharge current, 13 bit (0x7C..=0x7D).
pub const REG_BAT_DISCHARGE_CURRENT: u8 = 0x7C;
/// Coulomb counter, charge side, 32 bit big-endian (0xB0..=0xB3).
pub const REG_COULOMB_CHARGE: u8 = 0xB0;
/// Coulomb counter, discharge side, 32 bit big-endian (0xB4..=0xB7).
pub const REG_COULOMB_DISCHARGE: u8 = 0xB4;
/// Coulomb counter control.
pub const REG_COULOMB_CONTROL: u8 = 0xB8;

/// Control value: counter enabled.
pub const COULOMB_ENABLE: u8 = 0x80;
/// Control value: counter enabled and cleared.
pub const COULOMB_CLEAR: u8 = 0xA0;

/// Control value: every channel of [`REG_ADC_ENABLE_1`] on.
pub const ADC_ENABLE_ALL: u8 = 0xFF;

const VOLTAGE_LSB_V: f32 = 1.1 / 1000.0;
const CURRENT_LSB_MA: f32 = 0.5;
const POWER_LSB_MW: f32 = 1.1 * 0.5 / 1000.0;
// 65536 * 0.5 mA / 3600 s/h / 25 Hz ADC sample rate
const COULOMB_LSB_MAH: f32 = 65536.0 * 0.5 / 3600.0 / 25.0;

/// Battery voltage in volts from registers 0x78 (high 8 bits) and 0x79
/// (low 4 bits).
#[must_use]
pub fn battery_voltage(bytes: [u8; 2]) -> f32 {
    read_12bit(bytes) as f32 * VOLTAGE_LSB_V
}

/// Current in mA from a 13-bit register pair (0x7A/0x7B or 0x7C/0x7D).
#[must_use]
pub fn current_ma(bytes: [u8; 2]) -> f32 {
    read_13bit(bytes) as f32 * CURRENT_LSB_MA
}

/// Battery power in mW from registers 0x70..=0x72.
#[must_use]
pub fn battery_power(bytes: [u8; 3]) -> f32 {
    let raw = (u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2]);
    raw as f32 * POWER_LSB_MW
}

/// Net accumulated charge in mAh from the charge (0xB0..) and discharge
/// (0xB4..) counters.
///
/// Negative when more charge left the battery than entered it since the last
/// clear.
#[must_use]
pub fn coulomb_mah(charge: [u8; 4], discharge: [u8; 4]) -> f32 {
    let net = i64::from(u32::from_be_bytes(charge)) - i64::from(u32::from_be_bytes(discharge));
    net as f32 * COULOMB_LSB_MAH
}

#[inline]
fn read_12bit(bytes: [u8; 2]) -> u16 {
    (u16::from(bytes[0]) << 4) | u16::from(bytes[1] & 0x0F)
}

#[inline]
fn read_13bit(bytes: [u8; 2]) -> u16 {
    (u16::from(bytes[0]) << 5) | u16::from(bytes[1] & 0x1F)
}

/// Input power status (register 0x00).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputPowerStatus(pub u8);

impl InputPowerStatus {
    const ACIN_PRESENT: u8 = 1 << 7;
    const ACIN_USABLE: u8 = 1 << 6;
    const VBUS_PRESENT: u8 = 1 << 5;
    const VBUS_USABLE: u8 = 1 << 4;
    const CHARGING: u8 = 1 << 2;

    #[inline]
    #[must_use]
    pub const fn acin_present(self) -> bool {
        self.0 & Self::ACIN_PRESENT != 0
    }

    #[inline]
    #[must_use]
    pub const fn acin_usable(self) -> bool {
        self.0 & Self::ACIN_USABLE != 0
    }

    #[inline]
    #[must_use]
    pub const fn vbus_present(self) -> bool {
        self.0 & Self::VBUS_PRESENT != 0
    }

    #[inline]
    #[must_use]
    pub const fn vbus_usable(self) -> bool {
        self.0 & Self::VBUS_USABLE != 0
    }

    /// Battery current direction: `true` while current flows into the battery.
    #[inline]
    #[must_use]
    pub const fn is_charging_direction(self) -> bool {
        self.0 & Self::CHARGING != 0
    }
}

/// Power mode and charge status (register 0x01).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeStatus(pub u8);

impl ChargeStatus {
    const CHARGING: u8 = 1 << 6;
    const BATTERY_PRESENT: u8 = 1 << 5;

    #[inline]
    #[must_use]
    pub const fn is_charging(self) -> bool {
        self.0 & Self::CHARGING != 0
    }

    #[inline]
    #[must_use]
    pub const fn battery_present(self) -> bool {
        self.0 & Self::BATTERY_PRESENT != 0
    }
}
