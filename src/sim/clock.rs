//! Tick clock driving the engine.

use crate::tariff::HOURS_PER_DAY;

/// A simulation clock that hands out tick indices over a fixed run length.
///
/// The clock is the single-flight driver required by the tick protocol:
/// each index is produced exactly once, in order, so a host looping over
/// [`Clock::tick`] can never start tick N+1 before tick N was handed out.
///
/// # Examples
///
/// ```
/// use v2g_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(2);
/// assert_eq!(clock.tick(), Some(0));
/// assert_eq!(clock.tick(), Some(1));
/// assert_eq!(clock.tick(), None);
/// ```
pub struct Clock {
    current: usize,
    total: usize,
}

impl Clock {
    /// Creates a clock that will run `total` ticks.
    pub fn new(total: usize) -> Self {
        Self { current: 0, total }
    }

    /// Hour-of-day (0-23) a tick index maps to.
    pub fn hour_of(tick: usize) -> usize {
        tick % HOURS_PER_DAY
    }

    /// Advances by one tick.
    ///
    /// Returns `Some(tick)` with the index before advancing, or `None` once
    /// the run is complete.
    pub fn tick(&mut self) -> Option<usize> {
        if self.current < self.total {
            let tick = self.current;
            self.current += 1;
            Some(tick)
        } else {
            None
        }
    }
}
