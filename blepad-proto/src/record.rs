//! Persisted calibration record.
//!
//! Six bytes kept in the PMIC's battery-backed data buffer:
//!
//! ```text
//! byte 0..4  calibrated max charge, f32 LE (mAh)
//! byte 4..6  magic key 0x1a7c, u16 LE
//! ```

/// Length of the persisted record.
pub const CALIBRATION_RECORD_LEN: usize = 6;

/// Magic key marking a record written by this firmware.
pub const CALIBRATION_KEY: u16 = 0x1a7c;

/// Register content after a PMIC power-on reset.
pub const DEFAULT_STORAGE: [u8; CALIBRATION_RECORD_LEN] = [0xF0, 0x0F, 0x00, 0xFF, 0x00, 0x00];

/// Largest max charge accepted on load (mAh).
pub const MAX_PLAUSIBLE_CHARGE_MAH: f32 = 5000.0;

/// Why a stored record was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Bytes 4-5 do not hold [`CALIBRATION_KEY`].
    KeyMismatch { found: u16 },
    /// Value outside (0, 5000] mAh, including NaN.
    OutOfRange { value: f32 },
}

impl core::fmt::Display for RecordError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::KeyMismatch { found } => {
                write!(f, "storage key {:#06x} does not match {:#06x}", found, CALIBRATION_KEY)
            }
            Self::OutOfRange { value } => write!(f, "stored value {} mAh out of range", value),
        }
    }
}

/// Calibrated maximum charge as stored in the PMIC data buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationRecord {
    pub max_charge_mah: f32,
}

impl CalibrationRecord {
    #[must_use]
    pub const fn new(max_charge_mah: f32) -> Self {
        Self { max_charge_mah }
    }

    /// Serialize with the magic key appended.
    #[must_use]
    pub fn encode(&self) -> [u8; CALIBRATION_RECORD_LEN] {
        let value = self.max_charge_mah.to_le_bytes();
        let key = CALIBRATION_KEY.to_le_bytes();
        [value[0], value[1], value[2], value[3], key[0], key[1]]
    }

    /// Parse and validate a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::KeyMismatch`] if the key is wrong (checked first)
    /// and [`RecordError::OutOfRange`] if the value is not in (0, 5000].
    pub fn decode(bytes: &[u8; CALIBRATION_RECORD_LEN]) -> Result<Self, RecordError> {
        let found = u16::from_le_bytes([bytes[4], bytes[5]]);
        if found != CALIBRATION_KEY {
            return Err(RecordError::KeyMismatch { found });
        }

        let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if !(value > 0.0 && value <= MAX_PLAUSIBLE_CHARGE_MAH) {
            return Err(RecordError::OutOfRange { value });
        }

        Ok(Self::new(value))
    }
}
