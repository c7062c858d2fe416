//! Shift-register debouncing and the press latch shared with the main loop.
//!
//! Each button keeps the last eight raw samples. The two middle samples are
//! the bounce window and are ignored; an edge needs agreement at both ends:
//!
//! ```text
//! mask      1110_0111
//! pressed   0000_0111   oldest three released, newest three pressed
//! released  1110_0000   oldest three pressed, newest three released
//! ```
//!
//! At 200 Hz this gives about 15 ms of latency.
//!
//! [`ButtonLatch`] is written only by the sampling context and read only by
//! the main context, using atomics so neither side needs a lock.

use portable_atomic::{AtomicBool, Ordering};

use crate::input::{ButtonSampler, InputError};

/// Bits compared when looking for an edge.
pub const HISTORY_MASK: u8 = 0b1110_0111;
/// Masked history that produces a press.
pub const PRESS_PATTERN: u8 = 0b0000_0111;
/// Masked history that produces a release.
pub const RELEASE_PATTERN: u8 = 0b1110_0000;

/// Debounced edge produced by one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    None,
    Pressed,
    Released,
}

/// Classify a sample history without changing it.
#[inline]
#[must_use]
pub const fn classify(history: u8) -> ButtonEvent {
    match history & HISTORY_MASK {
        PRESS_PATTERN => ButtonEvent::Pressed,
        RELEASE_PATTERN => ButtonEvent::Released,
        _ => ButtonEvent::None,
    }
}

/// Last eight raw samples of one button, newest in bit 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonHistory(u8);

impl ButtonHistory {
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Shift in one raw level (`true` = active) and report any edge.
    ///
    /// After an edge the history is forced to all-ones or all-zeros so the
    /// same edge cannot fire again until the level really changes.
    pub fn sample(&mut self, active: bool) -> ButtonEvent {
        self.0 = (self.0 << 1) | u8::from(active);
        let event = classify(self.0);
        match event {
            ButtonEvent::Pressed => self.0 = 0xFF,
            ButtonEvent::Released => self.0 = 0x00,
            ButtonEvent::None => {}
        }
        event
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Debounced level plus a "pressed since last poll" flag.
///
/// The sampling context calls [`apply`](Self::apply); the main context calls
/// the query methods. `latched` is only ever cleared through an atomic swap,
/// so a press landing between the read and the clear is never lost.
#[derive(Debug, Default)]
pub struct ButtonLatch {
    level: AtomicBool,
    latched: AtomicBool,
}

impl ButtonLatch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: AtomicBool::new(false),
            latched: AtomicBool::new(false),
        }
    }

    /// Record a debounced edge. Releases leave the latch alone.
    pub fn apply(&self, event: ButtonEvent) {
        match event {
            ButtonEvent::Pressed => {
                self.level.store(true, Ordering::Release);
                self.latched.store(true, Ordering::Release);
            }
            ButtonEvent::Released => self.level.store(false, Ordering::Release),
            ButtonEvent::None => {}
        }
    }

    /// Current debounced level.
    #[inline]
    #[must_use]
    pub fn is_active_now(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    /// Return and clear the latch.
    #[inline]
    pub fn poll_and_clear(&self) -> bool {
        self.latched.swap(false, Ordering::AcqRel)
    }

    /// Held now or pressed since the previous call.
    ///
    /// The latch is always cleared, so a long hold followed by a release
    /// does not report one extra activation afterwards.
    pub fn activation(&self) -> bool {
        let latched = self.poll_and_clear();
        self.is_active_now() || latched
    }
}

/// Latches for a fixed set of buttons, typically placed in a `static`.
#[derive(Debug)]
pub struct ButtonPanel<const N: usize> {
    latches: [ButtonLatch; N],
}

impl<const N: usize> ButtonPanel<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latches: [const { ButtonLatch::new() }; N],
        }
    }

    /// Latch for button `index`, `None` when out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ButtonLatch> {
        self.latches.get(index)
    }

    /// Activation of every button, clearing all latches.
    pub fn activations(&self) -> [bool; N] {
        core::array::from_fn(|i| self.latches[i].activation())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ButtonLatch> {
        self.latches.iter()
    }
}

impl<const N: usize> Default for ButtonPanel<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sampling-context state: one history per button.
#[derive(Debug)]
pub struct Debouncer<const N: usize> {
    histories: [ButtonHistory; N],
}

impl<const N: usize> Debouncer<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            histories: [ButtonHistory::new(); N],
        }
    }

    /// Sample every button once and publish edges to `panel`.
    ///
    /// A button whose read fails keeps its history untouched for this tick.
    /// Returns the last read error, if any, after all buttons were handled.
    pub fn poll<S: ButtonSampler>(
        &mut self,
        sampler: &mut S,
        panel: &ButtonPanel<N>,
    ) -> Result<(), InputError> {
        let mut result = Ok(());
        for (index, (history, latch)) in self.histories.iter_mut().zip(panel.iter()).enumerate() {
            match sampler.read_level(index) {
                Ok(active) => latch.apply(history.sample(active)),
                Err(e) => result = Err(e),
            }
        }
        result
    }

    /// History of button `index`, for diagnostics.
    #[must_use]
    pub fn history(&self, index: usize) -> Option<ButtonHistory> {
        self.histories.get(index).copied()
    }
}

impl<const N: usize> Default for Debouncer<N> {
    fn default() -> Self {
        Self::new()
    }
}
