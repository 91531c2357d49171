//! Tick scheduling
//!
//! Continuous mode never owns a thread or a timer. The host environment
//! supplies a [`TickScheduler`]; the controller asks it for a tick after a
//! delay, and the host calls back into
//! [`RunController::on_tick`](crate::controller::RunController::on_tick) with
//! the issued [`TickId`] once that delay has elapsed.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::{SimulatedClock, SimulatedTimestamp};

/// Identifier of one scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TickId(u64);

impl TickId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick-{}", self.0)
    }
}

/// "Call me back after `delay`", supplied by the host event loop.
#[cfg_attr(test, mockall::automock)]
pub trait TickScheduler {
    /// Schedule a single tick to fire after `delay`.
    fn schedule(&mut self, delay: Duration) -> TickId;

    /// Drop a pending tick. Unknown or already-fired ids are ignored.
    fn cancel(&mut self, tick: TickId);
}

impl<S: TickScheduler + ?Sized> TickScheduler for &mut S {
    fn schedule(&mut self, delay: Duration) -> TickId {
        (**self).schedule(delay)
    }

    fn cancel(&mut self, tick: TickId) {
        (**self).cancel(tick)
    }
}

//-----------------------------------------------------------------------------
// Manual scheduler
//-----------------------------------------------------------------------------

/// Deterministic scheduler on top of a [`SimulatedClock`].
///
/// Nothing fires on its own: callers advance the clock and collect the ticks
/// that became due, in deadline order.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    clock: SimulatedClock,
    pending: BTreeSet<(SimulatedTimestamp, TickId)>,
    next_id: u64,
}

impl ManualScheduler {
    pub fn new(clock: SimulatedClock) -> Self {
        Self {
            clock,
            pending: BTreeSet::new(),
            next_id: 0,
        }
    }

    pub fn clock(&self) -> &SimulatedClock {
        &self.clock
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Deadline of the earliest pending tick.
    pub fn next_deadline(&self) -> Option<SimulatedTimestamp> {
        self.pending.first().map(|(deadline, _)| *deadline)
    }

    /// Move the clock to the earliest deadline and pop that tick.
    pub fn fire_next(&mut self) -> Option<TickId> {
        let (deadline, tick) = self.pending.pop_first()?;
        self.clock.advance_to(deadline);
        Some(tick)
    }

    /// Advance the clock by `duration` and pop every tick due by then.
    pub fn advance(&mut self, duration: Duration) -> Vec<TickId> {
        self.clock.advance(duration);
        let now = self.clock.now();
        let mut due = Vec::new();
        while let Some(&(deadline, tick)) = self.pending.first() {
            if deadline > now {
                break;
            }
            self.pending.remove(&(deadline, tick));
            due.push(tick);
        }
        due
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TickId {
        let tick = TickId(self.next_id);
        self.next_id += 1;
        let deadline = self.clock.now().add_duration(delay);
        self.pending.insert((deadline, tick));
        tick
    }

    fn cancel(&mut self, tick: TickId) {
        self.pending.retain(|(_, pending)| *pending != tick);
    }
}
