//! Wireless transport trait and error types.

use core::future::Future;

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Radio/stack I/O error.
    Io,
    /// The link dropped before the transport noticed.
    NotConnected,
    /// Notification queue full; the value will be superseded next slot.
    Busy,
    /// Advertising could not be (re)started.
    Advertising,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "transport I/O error"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Busy => write!(f, "transport busy"),
            Self::Advertising => write!(f, "advertising failed"),
        }
    }
}

/// Link callback delivered by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    Connected,
    Disconnected,
}

/// Async trait for the HID transport (BLE HID-over-GATT on the device).
///
/// Callbacks are not pushed into the core; the main loop drains them with
/// [`poll_link_event`](Transport::poll_link_event) once per slot, keeping all
/// connection state on the main context.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait Transport {
    /// Send one input report payload.
    fn send_report(&mut self, report: &[u8]) -> impl Future<Output = Result<(), TransportError>>;

    /// Publish the battery level (0..=100).
    fn send_battery_level(&mut self, percent: u8)
        -> impl Future<Output = Result<(), TransportError>>;

    /// Make the device discoverable again after a disconnect.
    fn resume_advertising(&mut self) -> impl Future<Output = Result<(), TransportError>>;

    /// Next pending link callback, if any.
    fn poll_link_event(&mut self) -> Option<LinkEvent>;
}
