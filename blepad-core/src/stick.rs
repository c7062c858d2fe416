//! Raw stick samples to signed, centered axis values.

use blepad_proto::AnalogStick;

use crate::config::{AxisConfig, StickConfig};
use crate::input::RawStickSample;

/// Logical minimum of the 8-bit trigger axes.
pub const TRIGGER_MIN: i8 = -127;
/// Logical maximum of the 8-bit trigger axes.
pub const TRIGGER_MAX: i8 = 127;

/// `factor * (raw - center)`, unscaled.
#[inline]
#[must_use]
pub const fn centered(raw: u8, axis: AxisConfig) -> i32 {
    axis.factor as i32 * (raw as i32 - axis.center as i32)
}

/// One 16-bit stick axis: centered, shifted and clamped to `i16`.
#[must_use]
pub fn stick_axis(raw: u8, axis: AxisConfig, shift: u32) -> i16 {
    let value = centered(raw, axis) << shift.min(16);
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// One 8-bit trigger axis: centered and clamped to -127..=127.
#[must_use]
pub fn normalize_trigger(raw: u8, axis: AxisConfig) -> i8 {
    centered(raw, axis).clamp(i32::from(TRIGGER_MIN), i32::from(TRIGGER_MAX)) as i8
}

/// Normalize a raw sample into a report stick.
///
/// # Example
///
/// ```
/// use blepad_core::{normalize, RawStickSample, StickConfig};
///
/// let stick = normalize(RawStickSample::new(122, 122, false), &StickConfig::DEFAULT);
/// assert_eq!((stick.x, stick.y), (0, 0));
///
/// // Y is inverted: pushing up (larger raw value) gives a negative axis
/// let stick = normalize(RawStickSample::new(132, 132, false), &StickConfig::DEFAULT);
/// assert_eq!((stick.x, stick.y), (2560, -2560));
/// ```
#[must_use]
pub fn normalize(sample: RawStickSample, config: &StickConfig) -> AnalogStick {
    AnalogStick::new(
        stick_axis(sample.x, config.x, config.shift),
        stick_axis(sample.y, config.y, config.shift),
    )
}
