//! Core gamepad types: Buttons, AnalogStick, HatSwitch, GamepadState.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Button state represented as a bitfield.
///
/// The report carries 14 buttons; bit `n` is HID button `n + 1`.
/// Bits 14 and 15 are report padding and are never set by the constructors
/// or operators below.
///
/// # Example
///
/// ```
/// use blepad_proto::Buttons;
///
/// let buttons = Buttons::A | Buttons::B;
/// assert!(buttons.contains(Buttons::A));
/// assert!(buttons.contains(Buttons::B));
/// assert!(!buttons.contains(Buttons::X));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(u16);

impl Buttons {
    pub const A: Self = Self(1 << 0);
    pub const B: Self = Self(1 << 1);
    pub const X: Self = Self(1 << 2);
    pub const Y: Self = Self(1 << 3);
    pub const LB: Self = Self(1 << 4); // Left bumper
    pub const RB: Self = Self(1 << 5); // Right bumper
    pub const BACK: Self = Self(1 << 6);
    pub const START: Self = Self(1 << 7);
    pub const LS: Self = Self(1 << 8); // Left stick press
    pub const RS: Self = Self(1 << 9); // Right stick press
    pub const BUTTON_11: Self = Self(1 << 10);
    pub const BUTTON_12: Self = Self(1 << 11);
    pub const BUTTON_13: Self = Self(1 << 12);
    pub const BUTTON_14: Self = Self(1 << 13);

    /// Number of buttons carried in the report.
    pub const COUNT: usize = 14;

    /// Mask of the bits that map to report buttons.
    pub const MASK: u16 = (1 << Self::COUNT) - 1;

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Build from a raw bitfield, dropping the padding bits.
    #[inline]
    #[must_use]
    pub const fn from_bits_truncate(bits: u16) -> Self {
        Self(bits & Self::MASK)
    }

    /// Button for a zero-based report index, `None` past the last button.
    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(1 << index))
        } else {
            None
        }
    }

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Check if the given button is pressed (alias for contains).
    #[inline]
    #[must_use]
    pub const fn is_pressed(self, button: Buttons) -> bool {
        self.contains(button)
    }

    /// Set or clear button(s).
    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    /// Get the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0 & Self::MASK)
    }
}

/// Analog stick with X/Y axes.
///
/// Range: [-32768, 32767], the logical range declared for the stick axes.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogStick {
    pub x: i16,
    pub y: i16,
}

impl AnalogStick {
    #[must_use]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub const NEUTRAL: Self = Self { x: 0, y: 0 };
}

/// Eight-way hat switch.
///
/// Directions encode as 1 (up) through 8 (up-left), clockwise. Centered
/// encodes as 0, which lies outside the declared logical range and is the
/// HID null state.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HatSwitch {
    #[default]
    Centered = 0,
    Up = 1,
    UpRight = 2,
    Right = 3,
    DownRight = 4,
    Down = 5,
    DownLeft = 6,
    Left = 7,
    UpLeft = 8,
}

impl HatSwitch {
    /// 4-bit wire value.
    #[inline]
    #[must_use]
    pub const fn nibble(self) -> u8 {
        self as u8
    }

    /// Decode a 4-bit wire value; anything outside 1..=8 is centered.
    #[must_use]
    pub const fn from_nibble(value: u8) -> Self {
        match value & 0x0F {
            1 => Self::Up,
            2 => Self::UpRight,
            3 => Self::Right,
            4 => Self::DownRight,
            5 => Self::Down,
            6 => Self::DownLeft,
            7 => Self::Left,
            8 => Self::UpLeft,
            _ => Self::Centered,
        }
    }

    /// Combine four direction pads into a hat position.
    ///
    /// Opposing directions cancel out.
    #[must_use]
    pub const fn from_dpad(up: bool, down: bool, left: bool, right: bool) -> Self {
        let vertical = (up as i8) - (down as i8);
        let horizontal = (right as i8) - (left as i8);
        match (vertical, horizontal) {
            (1, 0) => Self::Up,
            (1, 1) => Self::UpRight,
            (0, 1) => Self::Right,
            (-1, 1) => Self::DownRight,
            (-1, 0) => Self::Down,
            (-1, -1) => Self::DownLeft,
            (0, -1) => Self::Left,
            (1, -1) => Self::UpLeft,
            _ => Self::Centered,
        }
    }
}

/// Complete gamepad state snapshot.
///
/// Contains every field of the input report:
/// - 14 buttons (bitfield)
/// - 2 analog sticks (left/right, each with X/Y, 16-bit signed)
/// - 2 triggers (left/right, 8-bit signed, -127..=127)
/// - 2 hat switches
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadState {
    pub buttons: Buttons,
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    pub left_trigger: i8,
    pub right_trigger: i8,
    pub hat1: HatSwitch,
    pub hat2: HatSwitch,
}

impl GamepadState {
    /// Create a neutral gamepad state (no buttons pressed, sticks centered).
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: Buttons::NONE,
            left_stick: AnalogStick::NEUTRAL,
            right_stick: AnalogStick::NEUTRAL,
            left_trigger: 0,
            right_trigger: 0,
            hat1: HatSwitch::Centered,
            hat2: HatSwitch::Centered,
        }
    }
}
