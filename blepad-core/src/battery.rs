//! Battery monitor: PMIC telemetry, calibration and the persisted reference.

use core::future::Future;

use blepad_proto::{CalibrationRecord, RecordError, CALIBRATION_RECORD_LEN, DEFAULT_STORAGE};

use crate::calibration::{CalibrationOutcome, CoulombCalibrator, PowerReading};
use crate::config::CalibrationConfig;
use crate::input::InputError;

/// Error type for the calibration record storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Bus/communication I/O error.
    Io,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "storage I/O error"),
        }
    }
}

/// Power management IC access.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait PowerMonitor {
    /// Read one telemetry snapshot, including the coulomb counter.
    fn read_power(&mut self) -> impl Future<Output = Result<PowerReading, InputError>>;

    /// Start the coulomb counter.
    fn enable_coulomb_counter(&mut self) -> impl Future<Output = Result<(), InputError>>;

    /// Zero the coulomb counter and keep it running.
    fn clear_coulomb_counter(&mut self) -> impl Future<Output = Result<(), InputError>>;
}

/// The 6-byte non-volatile register holding the calibration record.
pub trait CalibrationStore {
    fn read_record(
        &mut self,
    ) -> impl Future<Output = Result<[u8; CALIBRATION_RECORD_LEN], StorageError>>;

    fn write_record(
        &mut self,
        record: &[u8; CALIBRATION_RECORD_LEN],
    ) -> impl Future<Output = Result<(), StorageError>>;
}

/// Error type for battery monitor operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryError {
    /// PMIC telemetry or counter access failed.
    Power(InputError),
    /// Calibration record access failed.
    Storage(StorageError),
}

impl core::fmt::Display for BatteryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Power(e) => write!(f, "power monitor: {}", e),
            Self::Storage(e) => write!(f, "calibration storage: {}", e),
        }
    }
}

impl From<InputError> for BatteryError {
    fn from(e: InputError) -> Self {
        Self::Power(e)
    }
}

impl From<StorageError> for BatteryError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// What loading the stored record did.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadStatus {
    /// Valid record; reference restored (mAh).
    Restored(f32),
    /// Wrong magic key; default reference in use.
    KeyMismatch { found: u16 },
    /// Value outside the plausible range; default reference in use.
    OutOfRange { value: f32 },
    /// Storage unreadable; default reference in use.
    ReadFailed(StorageError),
}

impl LoadStatus {
    #[must_use]
    pub const fn is_restored(&self) -> bool {
        matches!(self, Self::Restored(_))
    }
}

/// One battery refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryUpdate {
    pub reading: PowerReading,
    pub outcome: CalibrationOutcome,
    /// Level after calibration, 0..=100.
    pub level: u8,
    /// First failure of the pass. A failed counter clear leaves the
    /// previous reference in place and nothing is persisted; a failed
    /// write keeps the new reference in RAM.
    pub error: Option<BatteryError>,
}

/// Owns the PMIC and the calibrator.
///
/// Only the main context touches it; nothing here is shared.
pub struct BatteryMonitor<P> {
    pmic: P,
    calibrator: CoulombCalibrator,
    coulomb_mah: f32,
}

impl<P: PowerMonitor + CalibrationStore> BatteryMonitor<P> {
    pub fn new(pmic: P, config: CalibrationConfig) -> Self {
        Self {
            pmic,
            calibrator: CoulombCalibrator::new(config),
            coulomb_mah: 0.0,
        }
    }

    /// Restore the reference from storage, falling back to the default.
    pub async fn load(&mut self) -> LoadStatus {
        let bytes = match self.pmic.read_record().await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.calibrator.reset();
                return LoadStatus::ReadFailed(e);
            }
        };

        match CalibrationRecord::decode(&bytes) {
            Ok(record) => {
                self.calibrator.set_max_charge_mah(record.max_charge_mah);
                LoadStatus::Restored(record.max_charge_mah)
            }
            Err(RecordError::KeyMismatch { found }) => {
                self.calibrator.reset();
                LoadStatus::KeyMismatch { found }
            }
            Err(RecordError::OutOfRange { value }) => {
                self.calibrator.reset();
                LoadStatus::OutOfRange { value }
            }
        }
    }

    /// Load the stored reference, then start the counter.
    ///
    /// The load status is always produced; a counter error is returned
    /// alongside it.
    pub async fn start(&mut self) -> (LoadStatus, Result<(), BatteryError>) {
        let status = self.load().await;
        let counter = self.pmic.enable_coulomb_counter().await.map_err(Into::into);
        (status, counter)
    }

    /// Read telemetry and run one calibration pass.
    ///
    /// A failed read skips calibration entirely; the previous reference and
    /// level stand. A failed counter clear rolls the pass back so the same
    /// drift is not folded into the reference again on the next pass.
    pub async fn refresh(&mut self) -> Result<BatteryUpdate, BatteryError> {
        let reading = self.pmic.read_power().await?;
        let previous = self.calibrator.max_charge_mah();
        let mut outcome = self.calibrator.apply(&reading);

        if outcome.clear_counter {
            if let Err(e) = self.pmic.clear_coulomb_counter().await {
                self.calibrator.set_max_charge_mah(previous);
                outcome.max_charge_mah = previous;
                outcome.coulomb_mah = reading.coulomb_mah;
                outcome.persist = false;
                self.coulomb_mah = reading.coulomb_mah;
                return Ok(BatteryUpdate {
                    reading,
                    outcome,
                    level: self.level(),
                    error: Some(BatteryError::Power(e)),
                });
            }
        }
        self.coulomb_mah = outcome.coulomb_mah;

        let mut error = None;
        if outcome.persist {
            let record = CalibrationRecord::new(outcome.max_charge_mah).encode();
            if let Err(e) = self.pmic.write_record(&record).await {
                error = Some(BatteryError::Storage(e));
            }
        }

        Ok(BatteryUpdate {
            reading,
            outcome,
            level: self.level(),
            error,
        })
    }

    /// Write the documented default register content and forget the
    /// reference.
    pub async fn restore_default_storage(&mut self) -> Result<(), BatteryError> {
        self.calibrator.reset();
        self.pmic.write_record(&DEFAULT_STORAGE).await?;
        Ok(())
    }

    /// Battery level from the last refresh, 0..=100.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.calibrator.level(self.coulomb_mah)
    }

    #[must_use]
    pub fn max_charge_mah(&self) -> f32 {
        self.calibrator.max_charge_mah()
    }

    /// Counter value after the last refresh (mAh).
    #[must_use]
    pub fn coulomb_mah(&self) -> f32 {
        self.coulomb_mah
    }

    pub fn pmic(&self) -> &P {
        &self.pmic
    }

    pub fn pmic_mut(&mut self) -> &mut P {
        &mut self.pmic
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::calibration::Rule;
    use crate::testing::{block_on, MockPmic, PmicCall};
    use blepad_proto::{InputPowerStatus, CALIBRATION_KEY};

    fn monitor(pmic: MockPmic) -> BatteryMonitor<MockPmic> {
        BatteryMonitor::new(pmic, CalibrationConfig::DEFAULT)
    }

    #[test]
    fn test_record_round_trip_through_store() {
        for value in [0.001f32, 1.0, 1200.7, 4999.5, 5000.0] {
            let pmic = MockPmic::new();
            pmic.set_record(CalibrationRecord::new(value).encode());
            let mut m = monitor(pmic);
            assert_eq!(block_on(m.load()), LoadStatus::Restored(value));
            assert_eq!(m.max_charge_mah(), value);
        }
    }

    #[test]
    fn test_invalid_key_uses_default() {
        let pmic = MockPmic::new();
        let mut bytes = CalibrationRecord::new(1000.0).encode();
        bytes[4] ^= 0xFF;
        pmic.set_record(bytes);
        let mut m = monitor(pmic);

        let status = block_on(m.load());
        assert!(matches!(status, LoadStatus::KeyMismatch { found } if found != CALIBRATION_KEY));
        assert_eq!(m.max_charge_mah(), CalibrationConfig::DEFAULT.default_max_mah);
    }

    #[test]
    fn test_default_storage_is_rejected() {
        let pmic = MockPmic::new();
        pmic.set_record(DEFAULT_STORAGE);
        let mut m = monitor(pmic);
        assert_eq!(block_on(m.load()), LoadStatus::KeyMismatch { found: 0 });
    }

    #[test]
    fn test_out_of_range_uses_default() {
        let pmic = MockPmic::new();
        pmic.set_record(CalibrationRecord::new(6000.0).encode());
        let mut m = monitor(pmic);
        assert_eq!(block_on(m.load()), LoadStatus::OutOfRange { value: 6000.0 });
        assert_eq!(m.max_charge_mah(), 0.0);
    }

    #[test]
    fn test_unreadable_storage_uses_default() {
        let pmic = MockPmic::new();
        pmic.fail_storage(true);
        let mut m = monitor(pmic);
        assert_eq!(block_on(m.load()), LoadStatus::ReadFailed(StorageError::Io));
    }

    #[test]
    fn test_start_enables_counter() {
        let pmic = MockPmic::new();
        let calls = pmic.calls.clone();
        pmic.set_record(CalibrationRecord::new(900.0).encode());
        let mut m = monitor(pmic);

        let (status, counter) = block_on(m.start());
        assert!(status.is_restored());
        assert_eq!(counter, Ok(()));
        assert_eq!(*calls.lock().unwrap(), std::vec![PmicCall::EnableCounter]);
    }

    #[test]
    fn test_refresh_persists_only_on_change() {
        let pmic = MockPmic::new();
        let calls = pmic.calls.clone();
        pmic.set_record(CalibrationRecord::new(1000.0).encode());
        let mut m = monitor(pmic.clone());
        block_on(m.load());

        pmic.push_reading(Ok(PowerReading {
            voltage_v: 3.9,
            coulomb_mah: 500.0,
            ..PowerReading::default()
        }));
        let update = block_on(m.refresh()).unwrap();
        assert!(update.outcome.fired.is_empty());
        assert_eq!(update.level, 50);
        assert!(calls.lock().unwrap().is_empty());

        pmic.push_reading(Ok(PowerReading {
            voltage_v: 4.1,
            charge_current_ma: 25.0,
            coulomb_mah: 1200.0,
            input: InputPowerStatus(0b0010_0000),
            ..PowerReading::default()
        }));
        let update = block_on(m.refresh()).unwrap();
        assert!(update.outcome.fired.contains(Rule::ChargingPeak));
        assert_eq!(update.level, 100);
        assert_eq!(
            *calls.lock().unwrap(),
            std::vec![PmicCall::WriteRecord(CalibrationRecord::new(1200.0).encode())]
        );
        assert_eq!(pmic.record(), CalibrationRecord::new(1200.0).encode());
    }

    #[test]
    fn test_refresh_clears_counter_on_drift() {
        let pmic = MockPmic::new();
        let calls = pmic.calls.clone();
        let mut m = monitor(pmic.clone());
        m.calibrator.set_max_charge_mah(1200.0);

        pmic.push_reading(Ok(PowerReading {
            voltage_v: 3.5,
            coulomb_mah: -0.7,
            ..PowerReading::default()
        }));
        let update = block_on(m.refresh()).unwrap();
        assert!(update.outcome.clear_counter);
        assert_eq!(m.coulomb_mah(), 0.0);

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], PmicCall::ClearCounter);
        assert!(matches!(calls[1], PmicCall::WriteRecord(_)));
    }

    #[test]
    fn test_refresh_read_error_skips_calibration() {
        let pmic = MockPmic::new();
        let calls = pmic.calls.clone();
        let mut m = monitor(pmic.clone());
        m.calibrator.set_max_charge_mah(1000.0);

        pmic.push_reading(Err(InputError::NoResponse));
        assert_eq!(
            block_on(m.refresh()),
            Err(BatteryError::Power(InputError::NoResponse))
        );
        assert_eq!(m.max_charge_mah(), 1000.0);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_persist_failure_keeps_reference() {
        let pmic = MockPmic::new();
        pmic.fail_storage(true);
        let mut m = monitor(pmic.clone());

        pmic.push_reading(Ok(PowerReading {
            voltage_v: 4.0,
            charge_current_ma: 100.0,
            coulomb_mah: 300.0,
            input: InputPowerStatus(0b0010_0000),
            ..PowerReading::default()
        }));
        let update = block_on(m.refresh()).unwrap();
        assert_eq!(update.error, Some(BatteryError::Storage(StorageError::Io)));
        assert_eq!(m.max_charge_mah(), 300.0);
    }

    #[test]
    fn test_failed_clear_rolls_back_reference() {
        let pmic = MockPmic::new();
        let calls = pmic.calls.clone();
        pmic.fail_clear(true);
        let mut m = monitor(pmic.clone());
        m.calibrator.set_max_charge_mah(1200.0);

        let drifted = PowerReading {
            voltage_v: 3.5,
            coulomb_mah: -0.7,
            ..PowerReading::default()
        };
        for _ in 0..10 {
            pmic.push_reading(Ok(drifted));
            let update = block_on(m.refresh()).unwrap();
            assert_eq!(update.error, Some(BatteryError::Power(InputError::Io)));
            assert!(!update.outcome.persist);
            assert_eq!(update.outcome.max_charge_mah, 1200.0);
        }
        assert_eq!(m.max_charge_mah(), 1200.0);
        assert_eq!(m.coulomb_mah(), -0.7);
        assert!(calls
            .lock()
            .unwrap()
            .iter()
            .all(|call| !matches!(call, PmicCall::WriteRecord(_))));

        // Bus recovers: the drift is folded in once
        pmic.fail_clear(false);
        pmic.push_reading(Ok(drifted));
        let update = block_on(m.refresh()).unwrap();
        assert_eq!(update.error, None);
        assert!(update.outcome.persist);
        assert!((m.max_charge_mah() - 1200.7).abs() < 1e-3);
        let writes = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, PmicCall::WriteRecord(_)))
            .count();
        assert_eq!(writes, 1);
    }

    #[test]
    fn test_restore_default_storage() {
        let pmic = MockPmic::new();
        pmic.set_record(CalibrationRecord::new(800.0).encode());
        let mut m = monitor(pmic.clone());
        block_on(m.load());

        assert_eq!(block_on(m.restore_default_storage()), Ok(()));
        assert_eq!(pmic.record(), DEFAULT_STORAGE);
        assert_eq!(m.max_charge_mah(), 0.0);
    }
}
