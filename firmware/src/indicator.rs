//! Status LED as the link indicator.

use blepad_core::{InputSnapshot, StatusIndicator};
use defmt::trace;
use embassy_nrf::gpio::Output;

/// Active-low LED: lit while a host is connected.
///
/// With no display on the board, the input snapshot only goes to the trace
/// log.
pub struct LedIndicator<'d> {
    led: Output<'d>,
}

impl<'d> LedIndicator<'d> {
    pub fn new(led: Output<'d>) -> Self {
        Self { led }
    }
}

impl StatusIndicator for LedIndicator<'_> {
    fn show_inputs(&mut self, snapshot: &InputSnapshot) {
        trace!(
            "buttons={=u16:#06x} stick=({},{}) battery={}% connected={}",
            snapshot.buttons.raw(),
            snapshot.stick.x,
            snapshot.stick.y,
            snapshot.battery_level,
            snapshot.connected
        );
    }

    fn show_link(&mut self, connected: bool) {
        if connected {
            self.led.set_low();
        } else {
            self.led.set_high();
        }
    }
}
