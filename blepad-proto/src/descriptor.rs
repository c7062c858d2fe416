//! HID report descriptor for the gamepad and a minimal descriptor walker.
//!
//! The walker only tracks what it needs to size input reports: the global
//! Report Size, Report Count and Report ID items and the Input main item.
//! Push/Pop are not supported; the gamepad descriptor does not use them.

use crate::report::{GAMEPAD_REPORT_ID, GAMEPAD_REPORT_SIZE};

/// HID report map served to the host.
///
/// This descriptor defines report ID 1 with:
/// - 14 buttons + 2 bits padding
/// - X, Y, Z, Rz as signed 16-bit (left and right stick)
/// - Rx, Ry as signed 8-bit (-127..127, triggers)
/// - 2 hat switches, 4 bits each (1..8)
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x85, GAMEPAD_REPORT_ID, // Report ID (1)
    //
    // --- Buttons (14) ---
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (Button 1)
    0x29, 0x0E, //     Usage Maximum (Button 14)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x0E, //     Report Count (14)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    // --- Padding ---
    0x75, 0x01, //     Report Size (1)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x03, //     Input (Constant, Variable, Absolute)
    //
    // --- Sticks ---
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x32, //     Usage (Z)
    0x09, 0x35, //     Usage (Rz)
    0x16, 0x00, 0x80, // Logical Minimum (-32768)
    0x26, 0xFF, 0x7F, // Logical Maximum (32767)
    0x75, 0x10, //     Report Size (16)
    0x95, 0x04, //     Report Count (4)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    // --- Triggers ---
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x33, //     Usage (Rx) - Left trigger
    0x09, 0x34, //     Usage (Ry) - Right trigger
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    // --- Hat switches ---
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x39, //     Usage (Hat switch)
    0x09, 0x39, //     Usage (Hat switch)
    0x15, 0x01, //     Logical Minimum (1)
    0x25, 0x08, //     Logical Maximum (8)
    0x75, 0x04, //     Report Size (4)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    //
    0xC0, //   End Collection
    0xC0, // End Collection
];

const ITEM_INPUT: u8 = 0x80;
const ITEM_REPORT_SIZE: u8 = 0x74;
const ITEM_REPORT_ID: u8 = 0x84;
const ITEM_REPORT_COUNT: u8 = 0x94;
const LONG_ITEM_PREFIX: u8 = 0xFE;

/// Error walking a report descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorError {
    /// An item's data runs past the end of the descriptor.
    Truncated,
}

impl core::fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated report descriptor"),
        }
    }
}

/// The descriptor declares a different input report size than the encoder
/// produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// Descriptor could not be walked.
    Descriptor(DescriptorError),
    /// Sizes disagree (bytes, excluding the report ID).
    SizeMismatch { declared: usize, encoded: usize },
}

impl From<DescriptorError> for LayoutError {
    fn from(err: DescriptorError) -> Self {
        LayoutError::Descriptor(err)
    }
}

impl core::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Descriptor(e) => write!(f, "{}", e),
            Self::SizeMismatch { declared, encoded } => write!(
                f,
                "report descriptor declares {} bytes, encoder produces {}",
                declared, encoded
            ),
        }
    }
}

/// Total bits of all Input items declared for `report_id`.
///
/// Descriptors without any Report ID item put everything under ID 0.
pub const fn input_report_bits(
    descriptor: &[u8],
    report_id: u8,
) -> Result<u32, DescriptorError> {
    let mut pos = 0;
    let mut report_size: u32 = 0;
    let mut report_count: u32 = 0;
    let mut current_id: u32 = 0;
    let mut bits: u32 = 0;

    while pos < descriptor.len() {
        let prefix = descriptor[pos];

        if prefix == LONG_ITEM_PREFIX {
            if pos + 1 >= descriptor.len() {
                return Err(DescriptorError::Truncated);
            }
            pos += 3 + descriptor[pos + 1] as usize;
            continue;
        }

        let len = match prefix & 0x03 {
            3 => 4,
            n => n as usize,
        };
        if pos + 1 + len > descriptor.len() {
            return Err(DescriptorError::Truncated);
        }

        let mut value: u32 = 0;
        let mut i = 0;
        while i < len {
            value |= (descriptor[pos + 1 + i] as u32) << (8 * i);
            i += 1;
        }

        match prefix & 0xFC {
            ITEM_REPORT_SIZE => report_size = value,
            ITEM_REPORT_COUNT => report_count = value,
            ITEM_REPORT_ID => current_id = value,
            ITEM_INPUT => {
                if current_id == report_id as u32 {
                    bits += report_size * report_count;
                }
            }
            _ => {}
        }

        pos += 1 + len;
    }

    Ok(bits)
}

/// Input report length in bytes (excluding the report ID), rounded up.
pub const fn input_report_len(descriptor: &[u8], report_id: u8) -> Result<usize, DescriptorError> {
    match input_report_bits(descriptor, report_id) {
        Ok(bits) => Ok(bits.div_ceil(8) as usize),
        Err(e) => Err(e),
    }
}

/// Check that `descriptor` declares exactly the report the encoder writes.
///
/// A mismatch must stop the HID service from being registered.
pub fn verify_report_layout(descriptor: &[u8]) -> Result<(), LayoutError> {
    let declared = input_report_len(descriptor, GAMEPAD_REPORT_ID)?;
    if declared != GAMEPAD_REPORT_SIZE {
        return Err(LayoutError::SizeMismatch {
            declared,
            encoded: GAMEPAD_REPORT_SIZE,
        });
    }
    Ok(())
}

const _: () = assert!(
    matches!(
        input_report_len(REPORT_DESCRIPTOR, GAMEPAD_REPORT_ID),
        Ok(GAMEPAD_REPORT_SIZE)
    ),
    "REPORT_DESCRIPTOR does not match GAMEPAD_REPORT_SIZE"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamepad_descriptor_declares_104_bits() {
        assert_eq!(input_report_bits(REPORT_DESCRIPTOR, 1), Ok(104));
        assert_eq!(input_report_len(REPORT_DESCRIPTOR, 1), Ok(13));
        assert_eq!(verify_report_layout(REPORT_DESCRIPTOR), Ok(()));
    }

    #[test]
    fn test_other_report_id_is_empty() {
        assert_eq!(input_report_bits(REPORT_DESCRIPTOR, 2), Ok(0));
    }

    #[test]
    fn test_descriptor_without_report_id() {
        // 8 buttons, no Report ID item
        let desc = [
            0x05, 0x09, 0x19, 0x01, 0x29, 0x08, 0x75, 0x01, 0x95, 0x08, 0x81, 0x02,
        ];
        assert_eq!(input_report_bits(&desc, 0), Ok(8));
        assert_eq!(input_report_bits(&desc, 1), Ok(0));
    }

    #[test]
    fn test_mismatched_descriptor_rejected() {
        // 16 buttons and four 8-bit axes: 6 bytes
        let desc = [
            0x85, 0x01, 0x75, 0x01, 0x95, 0x10, 0x81, 0x02, 0x75, 0x08, 0x95, 0x04, 0x81,
            0x02,
        ];
        assert_eq!(
            verify_report_layout(&desc),
            Err(LayoutError::SizeMismatch {
                declared: 6,
                encoded: 13
            })
        );
    }

    #[test]
    fn test_output_items_not_counted() {
        let desc = [0x85, 0x01, 0x75, 0x08, 0x95, 0x02, 0x91, 0x02, 0x81, 0x02];
        assert_eq!(input_report_bits(&desc, 1), Ok(16));
    }

    #[test]
    fn test_truncated_descriptor() {
        assert_eq!(
            input_report_bits(&[0x05, 0x01, 0x26, 0xFF], 0),
            Err(DescriptorError::Truncated)
        );
        assert_eq!(
            verify_report_layout(&[0x16, 0x00]),
            Err(LayoutError::Descriptor(DescriptorError::Truncated))
        );
    }

    #[test]
    fn test_long_item_skipped() {
        let desc = [0xFE, 0x02, 0x10, 0xAA, 0xBB, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02];
        assert_eq!(input_report_bits(&desc, 0), Ok(8));
    }
}
