//! Link state tracking and connection-gated delivery.

use crate::transport::{LinkEvent, Transport, TransportError};

/// Link state as seen by the main loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Side effect requested by a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkAction {
    ResumeAdvertising,
}

/// Tracks Connected/Disconnected from transport callbacks.
///
/// Every disconnect callback asks for advertising to resume, even a repeated
/// one, so a missed restart is retried on the next callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionTracker {
    state: ConnectionState,
}

impl ConnectionTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
        }
    }

    pub fn on_event(&mut self, event: LinkEvent) -> Option<LinkAction> {
        match event {
            LinkEvent::Connected => {
                self.state = ConnectionState::Connected;
                None
            }
            LinkEvent::Disconnected => {
                self.state = ConnectionState::Disconnected;
                Some(LinkAction::ResumeAdvertising)
            }
        }
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected)
    }
}

/// Result of a gated send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    Sent,
    /// Disconnected; the transport was not called.
    Skipped,
}

/// Transport wrapped with a [`ConnectionTracker`].
///
/// Sends are no-ops while disconnected: they return [`Delivery::Skipped`]
/// instead of an error.
pub struct HidLink<T> {
    transport: T,
    tracker: ConnectionTracker,
}

impl<T: Transport> HidLink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Drain pending link callbacks and restart advertising on disconnect.
    ///
    /// Returns the last event seen this call, for logging and indicators.
    pub async fn poll_link(&mut self) -> Result<Option<LinkEvent>, TransportError> {
        let mut last = None;
        let mut result = Ok(());
        while let Some(event) = self.transport.poll_link_event() {
            last = Some(event);
            if let Some(LinkAction::ResumeAdvertising) = self.tracker.on_event(event) {
                if let Err(e) = self.transport.resume_advertising().await {
                    result = Err(e);
                }
            }
        }
        result.map(|()| last)
    }

    pub async fn update_input_report(&mut self, report: &[u8]) -> Result<Delivery, TransportError> {
        if !self.tracker.is_connected() {
            return Ok(Delivery::Skipped);
        }
        self.transport.send_report(report).await?;
        Ok(Delivery::Sent)
    }

    pub async fn update_battery_level(&mut self, percent: u8) -> Result<Delivery, TransportError> {
        if !self.tracker.is_connected() {
            return Ok(Delivery::Skipped);
        }
        self.transport.send_battery_level(percent.min(100)).await?;
        Ok(Delivery::Sent)
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.tracker.is_connected()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.tracker.state()
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
