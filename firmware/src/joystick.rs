//! I2C joystick unit: three bytes per read, X, Y and the push button.

use blepad_core::{InputError, RawStickSample, StickInput};
use embassy_time::{with_timeout, Duration};
use embedded_hal_async::i2c::I2c;

use crate::bus::input_error;

pub struct Joystick<I> {
    i2c: I,
    address: u8,
    timeout: Duration,
}

impl<I: I2c> Joystick<I> {
    pub fn new(i2c: I, address: u8, timeout: Duration) -> Self {
        Self {
            i2c,
            address,
            timeout,
        }
    }
}

impl<I: I2c> StickInput for Joystick<I> {
    async fn read_stick(&mut self) -> Result<RawStickSample, InputError> {
        let mut buf = [0u8; 3];
        match with_timeout(self.timeout, self.i2c.read(self.address, &mut buf)).await {
            Ok(Ok(())) => Ok(RawStickSample::new(buf[0], buf[1], buf[2] != 0)),
            Ok(Err(e)) => Err(input_error(e)),
            Err(_) => Err(InputError::NoResponse),
        }
    }
}
