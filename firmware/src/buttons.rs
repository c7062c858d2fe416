//! GPIO buttons wired to ground with internal pull-ups.

use blepad_core::{ButtonSampler, InputError};
use embassy_nrf::gpio::Input;

/// `N` active-low buttons, sampled by panel index.
pub struct GpioButtons<'d, const N: usize> {
    pins: [Input<'d>; N],
}

impl<'d, const N: usize> GpioButtons<'d, N> {
    pub fn new(pins: [Input<'d>; N]) -> Self {
        Self { pins }
    }
}

impl<const N: usize> ButtonSampler for GpioButtons<'_, N> {
    fn read_level(&mut self, index: usize) -> Result<bool, InputError> {
        // Low level = pressed
        self.pins.get(index).map(Input::is_low).ok_or(InputError::Io)
    }
}
