// Purpose: Provides the controller for stepping a simulation once or running it continuously.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::clock::duration_millis;
use crate::config::DEFAULT_TICK_DELAY_MS;
use crate::engine::SimulationEngine;
use crate::scheduler::{TickId, TickScheduler};

/// Execution state of a [`RunController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// Waiting for a command.
    Idle,
    /// A single step issued from `Idle` is in progress.
    SteppingOnce,
    /// Ticks are being scheduled until the budget is spent or the run is cancelled.
    RunningContinuous,
    /// The engine's trial budget is spent. Terminal.
    Finished,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::SteppingOnce => "stepping",
            RunState::RunningContinuous => "running",
            RunState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Cooperative state machine driving a [`SimulationEngine`].
///
/// The controller borrows the engine for its lifetime and never spawns work of
/// its own: continuous mode asks the injected [`TickScheduler`] for one tick at
/// a time and advances one trial per tick delivered through
/// [`on_tick`](Self::on_tick).
pub struct RunController<'e, S: TickScheduler> {
    engine: &'e mut SimulationEngine,
    scheduler: S,
    state: RunState,
    tick_delay: Duration,
    pending_tick: Option<TickId>,
}

impl<'e, S: TickScheduler> RunController<'e, S> {
    /// Create a controller with the default 50 ms tick delay.
    pub fn new(engine: &'e mut SimulationEngine, scheduler: S) -> Self {
        Self::with_tick_delay(
            engine,
            scheduler,
            Duration::from_millis(DEFAULT_TICK_DELAY_MS),
        )
    }

    pub fn with_tick_delay(
        engine: &'e mut SimulationEngine,
        scheduler: S,
        tick_delay: Duration,
    ) -> Self {
        Self {
            engine,
            scheduler,
            state: RunState::Idle,
            tick_delay,
            pending_tick: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == RunState::Finished
    }

    /// Read-only view of the engine for presenters.
    pub fn engine(&self) -> &SimulationEngine {
        self.engine
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn tick_delay(&self) -> Duration {
        self.tick_delay
    }

    /// The tick continuous mode is waiting for, if any.
    pub fn pending_tick(&self) -> Option<TickId> {
        self.pending_tick
    }

    /// Advance one trial.
    ///
    /// A no-op once `Finished`. Reaching the budget moves the controller to
    /// `Finished`; otherwise it stays `Idle` or `RunningContinuous`.
    pub fn step(&mut self) -> RunState {
        if self.state == RunState::Finished {
            return self.state;
        }
        if self.engine.is_complete() {
            self.finish();
            return self.state;
        }

        let resume = self.state;
        if resume == RunState::Idle {
            self.state = RunState::SteppingOnce;
        }
        self.engine.advance_one_trial();
        self.state = resume;

        if self.engine.is_complete() {
            self.finish();
        }
        self.state
    }

    /// Enter continuous mode and schedule the first tick.
    ///
    /// Only acts from `Idle`; repeated calls while running are ignored.
    pub fn start_continuous(&mut self) -> RunState {
        if self.state != RunState::Idle {
            debug!(state = %self.state, "start_continuous ignored");
            return self.state;
        }
        if self.engine.is_complete() {
            self.finish();
            return self.state;
        }

        self.state = RunState::RunningContinuous;
        self.schedule_next();
        info!(
            trial = self.engine.trial_counter(),
            budget = self.engine.trial_budget(),
            delay_ms = duration_millis(self.tick_delay),
            "Continuous run started"
        );
        self.state
    }

    /// Host callback for a fired tick.
    ///
    /// Ticks other than the pending one (cancelled or superseded) are ignored.
    pub fn on_tick(&mut self, tick: TickId) -> RunState {
        if self.state != RunState::RunningContinuous || self.pending_tick != Some(tick) {
            debug!(%tick, state = %self.state, "Ignoring stale tick");
            return self.state;
        }
        self.pending_tick = None;

        self.step();
        if self.state == RunState::RunningContinuous {
            self.schedule_next();
        }
        self.state
    }

    /// Leave continuous mode without touching recorded trials.
    pub fn cancel(&mut self) -> RunState {
        if self.state != RunState::RunningContinuous {
            return self.state;
        }
        self.cancel_pending();
        self.state = RunState::Idle;
        info!(
            trial = self.engine.trial_counter(),
            "Continuous run cancelled"
        );
        self.state
    }

    fn schedule_next(&mut self) {
        let tick = self.scheduler.schedule(self.tick_delay);
        self.pending_tick = Some(tick);
    }

    fn cancel_pending(&mut self) {
        if let Some(tick) = self.pending_tick.take() {
            self.scheduler.cancel(tick);
        }
    }

    fn finish(&mut self) {
        self.cancel_pending();
        self.state = RunState::Finished;
        info!(
            trials = self.engine.trial_counter(),
            "Simulation finished"
        );
    }
}

impl<S: TickScheduler> fmt::Debug for RunController<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunController")
            .field("state", &self.state)
            .field("trial", &self.engine.trial_counter())
            .field("budget", &self.engine.trial_budget())
            .field("tick_delay", &self.tick_delay)
            .field("pending_tick", &self.pending_tick)
            .finish()
    }
}
