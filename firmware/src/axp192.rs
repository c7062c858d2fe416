//! AXP192 power-management IC over async I2C.
//!
//! Implements both [`PowerMonitor`] (telemetry and coulomb counter) and
//! [`CalibrationStore`]: the calibration record lives in the PMIC's six
//! battery-backed data buffer registers, so it survives a reset as long as
//! the cell is connected.

use blepad_core::{CalibrationStore, InputError, PowerMonitor, PowerReading, StorageError};
use blepad_proto::axp192::{
    self, ChargeStatus, InputPowerStatus, ADC_ENABLE_ALL, COULOMB_CLEAR, COULOMB_ENABLE,
    I2C_ADDRESS, REG_ADC_ENABLE_1, REG_BAT_CHARGE_CURRENT, REG_BAT_DISCHARGE_CURRENT,
    REG_BAT_POWER, REG_BAT_VOLTAGE, REG_CHARGE_STATUS, REG_COULOMB_CHARGE,
    REG_COULOMB_CONTROL, REG_COULOMB_DISCHARGE, REG_DATA_BUFFER, REG_POWER_STATUS,
};
use blepad_proto::CALIBRATION_RECORD_LEN;
use embassy_time::{with_timeout, Duration};
use embedded_hal_async::i2c::I2c;

use crate::bus::input_error;

/// AXP192 driver. Every transfer is bounded by `timeout`.
pub struct Axp192<I> {
    i2c: I,
    timeout: Duration,
}

impl<I: I2c> Axp192<I> {
    pub fn new(i2c: I, timeout: Duration) -> Self {
        Self { i2c, timeout }
    }

    /// Switch on the battery and input ADC channels.
    ///
    /// The voltage, current and power registers read zero until this ran.
    pub async fn init(&mut self) -> Result<(), InputError> {
        self.write(REG_ADC_ENABLE_1, ADC_ENABLE_ALL).await
    }

    async fn read<const L: usize>(&mut self, reg: u8) -> Result<[u8; L], InputError> {
        let mut buf = [0u8; L];
        match with_timeout(self.timeout, self.i2c.write_read(I2C_ADDRESS, &[reg], &mut buf)).await {
            Ok(Ok(())) => Ok(buf),
            Ok(Err(e)) => Err(input_error(e)),
            Err(_) => Err(InputError::NoResponse),
        }
    }

    async fn write(&mut self, reg: u8, value: u8) -> Result<(), InputError> {
        match with_timeout(self.timeout, self.i2c.write(I2C_ADDRESS, &[reg, value])).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(input_error(e)),
            Err(_) => Err(InputError::NoResponse),
        }
    }
}

impl<I: I2c> PowerMonitor for Axp192<I> {
    async fn read_power(&mut self) -> Result<PowerReading, InputError> {
        let [input] = self.read::<1>(REG_POWER_STATUS).await?;
        let [charge] = self.read::<1>(REG_CHARGE_STATUS).await?;
        let voltage = self.read::<2>(REG_BAT_VOLTAGE).await?;
        let power = self.read::<3>(REG_BAT_POWER).await?;
        let charge_current = self.read::<2>(REG_BAT_CHARGE_CURRENT).await?;
        let discharge_current = self.read::<2>(REG_BAT_DISCHARGE_CURRENT).await?;
        let coulomb_in = self.read::<4>(REG_COULOMB_CHARGE).await?;
        let coulomb_out = self.read::<4>(REG_COULOMB_DISCHARGE).await?;

        let charge_current_ma = axp192::current_ma(charge_current);
        Ok(PowerReading {
            voltage_v: axp192::battery_voltage(voltage),
            power_mw: axp192::battery_power(power),
            current_ma: charge_current_ma - axp192::current_ma(discharge_current),
            charge_current_ma,
            coulomb_mah: axp192::coulomb_mah(coulomb_in, coulomb_out),
            input: InputPowerStatus(input),
            charge: ChargeStatus(charge),
        })
    }

    async fn enable_coulomb_counter(&mut self) -> Result<(), InputError> {
        self.write(REG_COULOMB_CONTROL, COULOMB_ENABLE).await
    }

    async fn clear_coulomb_counter(&mut self) -> Result<(), InputError> {
        self.write(REG_COULOMB_CONTROL, COULOMB_CLEAR).await
    }
}

impl<I: I2c> CalibrationStore for Axp192<I> {
    async fn read_record(&mut self) -> Result<[u8; CALIBRATION_RECORD_LEN], StorageError> {
        self.read::<CALIBRATION_RECORD_LEN>(REG_DATA_BUFFER)
            .await
            .map_err(|_| StorageError::Io)
    }

    async fn write_record(
        &mut self,
        record: &[u8; CALIBRATION_RECORD_LEN],
    ) -> Result<(), StorageError> {
        // One register per transfer; the PMIC does not auto-increment on write
        for (reg, byte) in (REG_DATA_BUFFER..).zip(record.iter()) {
            self.write(reg, *byte).await.map_err(|_| StorageError::Io)?;
        }
        Ok(())
    }
}
