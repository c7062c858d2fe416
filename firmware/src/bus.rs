use blepad_core::InputError;
use embedded_hal::i2c::{Error, ErrorKind};

/// Map an I2C bus error onto the core's input error.
pub(crate) fn input_error<E: Error>(error: E) -> InputError {
    match error.kind() {
        ErrorKind::NoAcknowledge(_) => InputError::NoResponse,
        _ => InputError::Io,
    }
}
