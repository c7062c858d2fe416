//! Fixed-slot cycle scheduler.
//!
//! A cycle is `slots_per_cycle` equal slots. Per-slot work (input sampling,
//! report transmission) is the caller's loop body; slower jobs are registered
//! with a period and a phase and come back from [`CycleScheduler::due_jobs`]
//! in the slots where `slot % period == phase`.
//!
//! The scheduler never sleeps itself. The caller measures the slot, passes
//! the elapsed time to [`CycleScheduler::finish_slot`], and idles for the
//! returned remainder. An overrun is reported and the next slot starts
//! immediately.

use heapless::Vec;

use crate::config::{Periodic, ScheduleConfig};

/// Error type for job registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// Job table is full.
    Full,
    /// A period of zero never matches.
    ZeroPeriod,
    /// `phase >= period` never matches.
    PhaseOutOfRange,
}

impl core::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Full => write!(f, "job table full"),
            Self::ZeroPeriod => write!(f, "zero period"),
            Self::PhaseOutOfRange => write!(f, "phase out of range"),
        }
    }
}

/// How a slot ended relative to its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotTiming {
    /// Idle for `remaining_us` before the next slot.
    Idle { remaining_us: u32 },
    /// Over budget; start the next slot now.
    Overrun { elapsed_us: u32, budget_us: u32 },
}

/// Slot duration statistics in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotStats {
    pub last_us: u32,
    /// Longest slot of the current cycle; reset when a cycle wraps.
    pub max_in_cycle_us: u32,
    pub max_overall_us: u32,
    pub overruns: u32,
}

/// Cycle scheduler with up to `N` periodic jobs of type `J`.
pub struct CycleScheduler<J, const N: usize> {
    jobs: Vec<(Periodic, J), N>,
    slots_per_cycle: u16,
    slot_us: u32,
    slot: u16,
    cycles: u32,
    stats: SlotStats,
}

impl<J: Copy, const N: usize> CycleScheduler<J, N> {
    /// Empty scheduler with the cycle geometry of `config`.
    ///
    /// Jobs in `config` are not registered; see [`add_job`](Self::add_job).
    #[must_use]
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            jobs: Vec::new(),
            slots_per_cycle: config.slots_per_cycle.max(1),
            slot_us: config.slot_us,
            slot: 0,
            cycles: 0,
            stats: SlotStats::default(),
        }
    }

    pub fn add_job(&mut self, when: Periodic, job: J) -> Result<(), ScheduleError> {
        if when.period == 0 {
            return Err(ScheduleError::ZeroPeriod);
        }
        if when.phase >= when.period {
            return Err(ScheduleError::PhaseOutOfRange);
        }
        self.jobs.push((when, job)).map_err(|_| ScheduleError::Full)
    }

    /// Jobs due in the current slot, in registration order.
    pub fn due_jobs(&self) -> impl Iterator<Item = J> + '_ {
        let slot = self.slot;
        self.jobs
            .iter()
            .filter(move |(when, _)| slot % when.period == when.phase)
            .map(|(_, job)| *job)
    }

    /// Close the current slot and advance to the next one.
    pub fn finish_slot(&mut self, elapsed_us: u32) -> SlotTiming {
        let stats = &mut self.stats;
        stats.last_us = elapsed_us;
        stats.max_in_cycle_us = stats.max_in_cycle_us.max(elapsed_us);
        stats.max_overall_us = stats.max_overall_us.max(elapsed_us);

        let timing = if elapsed_us > self.slot_us {
            stats.overruns = stats.overruns.saturating_add(1);
            SlotTiming::Overrun {
                elapsed_us,
                budget_us: self.slot_us,
            }
        } else {
            SlotTiming::Idle {
                remaining_us: self.slot_us - elapsed_us,
            }
        };

        self.slot += 1;
        if self.slot >= self.slots_per_cycle {
            self.slot = 0;
            self.cycles = self.cycles.wrapping_add(1);
            self.stats.max_in_cycle_us = 0;
        }
        timing
    }

    /// Index of the current slot.
    #[inline]
    #[must_use]
    pub fn slot(&self) -> u16 {
        self.slot
    }

    #[inline]
    #[must_use]
    pub fn is_last_slot(&self) -> bool {
        self.slot + 1 == self.slots_per_cycle
    }

    /// Completed cycles, wrapping.
    #[inline]
    #[must_use]
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> &SlotStats {
        &self.stats
    }

    #[inline]
    #[must_use]
    pub fn slots_per_cycle(&self) -> u16 {
        self.slots_per_cycle
    }

    #[inline]
    #[must_use]
    pub fn slot_us(&self) -> u32 {
        self.slot_us
    }
}
