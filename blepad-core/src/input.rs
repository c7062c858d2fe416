//! Input collaborator traits and error types.

use core::future::Future;

/// Error type for peripheral reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// Bus/communication I/O error.
    Io,
    /// Peripheral did not answer (NACK or timeout).
    NoResponse,
    /// Peripheral answered with a short or malformed frame.
    Malformed,
}

impl core::fmt::Display for InputError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::NoResponse => write!(f, "no response"),
            Self::Malformed => write!(f, "malformed response"),
        }
    }
}

/// One joystick reading: raw axes and the stick's push button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawStickSample {
    pub x: u8,
    pub y: u8,
    pub pressed: bool,
}

impl RawStickSample {
    #[must_use]
    pub const fn new(x: u8, y: u8, pressed: bool) -> Self {
        Self { x, y, pressed }
    }
}

/// Raw digital button levels, read from the sampling context.
///
/// Levels are already inverted for pull-ups: `true` means pressed. Reads
/// must not block; the sampling tick runs at interrupt priority.
pub trait ButtonSampler {
    fn read_level(&mut self, index: usize) -> Result<bool, InputError>;
}

/// Async trait for the analog stick.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait StickInput {
    /// Read the current stick position.
    ///
    /// Implementations must bound the transfer time; the caller keeps the
    /// previous sample when this fails.
    fn read_stick(&mut self) -> impl Future<Output = Result<RawStickSample, InputError>>;
}
