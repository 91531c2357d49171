// Purpose: Hosts a RunController on a tokio event loop, feeding it input commands and fired ticks.

use std::collections::BTreeSet;
use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::controller::{RunController, RunState};
use crate::scheduler::{TickId, TickScheduler};
use crate::visualization::{render_progress_line, ChartRenderer};

//-----------------------------------------------------------------------------
// Tokio scheduler
//-----------------------------------------------------------------------------

/// [`TickScheduler`] backed by tokio deadlines.
///
/// It only records deadlines; the event loop sleeps until the earliest one and
/// hands the tick back to the controller.
#[derive(Debug, Default)]
pub struct TokioTickScheduler {
    pending: BTreeSet<(Instant, TickId)>,
    next_id: u64,
}

impl TokioTickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest pending deadline and its tick.
    pub fn next_deadline(&self) -> Option<(Instant, TickId)> {
        self.pending.first().copied()
    }

    /// Remove a tick that is about to be delivered.
    pub fn take(&mut self, tick: TickId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(_, pending)| *pending != tick);
        self.pending.len() != before
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl TickScheduler for TokioTickScheduler {
    fn schedule(&mut self, delay: Duration) -> TickId {
        let tick = TickId::new(self.next_id);
        self.next_id += 1;
        self.pending.insert((Instant::now() + delay, tick));
        tick
    }

    fn cancel(&mut self, tick: TickId) {
        self.take(tick);
    }
}

async fn next_tick(deadline: Option<(Instant, TickId)>) -> TickId {
    match deadline {
        Some((at, tick)) => {
            sleep_until(at).await;
            tick
        }
        None => std::future::pending().await,
    }
}

/// Deliver the earliest due tick to the controller.
fn deliver_tick(controller: &mut RunController<'_, TokioTickScheduler>, tick: TickId) -> RunState {
    if !controller.scheduler_mut().take(tick) {
        debug!(%tick, "Tick already cancelled");
        return controller.state();
    }
    controller.on_tick(tick)
}

//-----------------------------------------------------------------------------
// Input commands
//-----------------------------------------------------------------------------

/// A line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Empty line, space, `s` or `step`.
    Step,
    /// `x` or `run`.
    RunContinuous,
    /// `c` or `cancel`.
    Cancel,
    /// `p` or `print`.
    Print,
    /// `h`, `help` or `?`.
    Help,
    /// `q`, `quit` or `exit`.
    Quit,
    Unknown(String),
}

impl InputCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "s" | "step" => Self::Step,
            "x" | "run" => Self::RunContinuous,
            "c" | "cancel" => Self::Cancel,
            "p" | "print" => Self::Print,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

pub const HELP_TEXT: &str = "\
commands:
  <enter> | s    run one trial
  x              run continuously until the trial budget is spent
  c              cancel a continuous run
  p              print the chart
  q              quit";

//-----------------------------------------------------------------------------
// Event loops
//-----------------------------------------------------------------------------

/// Read commands from `input` and drive `controller` until `q`, end of input
/// (once no continuous run is active) or Ctrl-C.
pub async fn run_interactive<R, W>(
    controller: &mut RunController<'_, TokioTickScheduler>,
    renderer: &ChartRenderer,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut input_open = true;

    write!(out, "{}", renderer.render(controller.engine()))?;
    writeln!(out, "{HELP_TEXT}")?;
    out.flush()?;

    loop {
        if !input_open && controller.state() != RunState::RunningContinuous {
            break;
        }
        let deadline = controller.scheduler().next_deadline();

        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    input_open = false;
                    continue;
                };
                match InputCommand::parse(&line) {
                    InputCommand::Step => {
                        controller.step();
                        write!(out, "{}", renderer.render(controller.engine()))?;
                    }
                    InputCommand::RunContinuous => {
                        if controller.start_continuous() == RunState::Finished {
                            writeln!(out, "trial budget already spent")?;
                        }
                    }
                    InputCommand::Cancel => {
                        controller.cancel();
                        writeln!(out, "{}", render_progress_line(controller.engine()))?;
                    }
                    InputCommand::Print => {
                        write!(out, "{}", renderer.render(controller.engine()))?;
                    }
                    InputCommand::Help => writeln!(out, "{HELP_TEXT}")?,
                    InputCommand::Quit => {
                        controller.cancel();
                        break;
                    }
                    InputCommand::Unknown(command) => {
                        warn!(command = %command, "Unknown command");
                        writeln!(out, "unknown command '{command}'\n{HELP_TEXT}")?;
                    }
                }
            }
            tick = next_tick(deadline) => {
                let state = deliver_tick(controller, tick);
                writeln!(out, "{}", render_progress_line(controller.engine()))?;
                if state == RunState::Finished {
                    write!(out, "{}", renderer.render(controller.engine()))?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                controller.cancel();
                break;
            }
        }
        out.flush()?;
    }

    info!(
        trials = controller.engine().trial_counter(),
        state = %controller.state(),
        "Interactive session ended"
    );
    Ok(())
}

/// Start continuous mode and deliver ticks until the controller finishes or
/// Ctrl-C cancels the run. Prints a progress line per trial unless `quiet`, and
/// the full chart at the end.
pub async fn run_to_completion<W: Write>(
    controller: &mut RunController<'_, TokioTickScheduler>,
    renderer: &ChartRenderer,
    quiet: bool,
    out: &mut W,
) -> Result<RunState> {
    controller.start_continuous();

    while controller.state() == RunState::RunningContinuous {
        let deadline = controller.scheduler().next_deadline();
        tokio::select! {
            tick = next_tick(deadline) => {
                deliver_tick(controller, tick);
                if !quiet {
                    writeln!(out, "{}", render_progress_line(controller.engine()))?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling continuous run");
                controller.cancel();
            }
        }
    }

    write!(out, "{}", renderer.render(controller.engine()))?;
    out.flush()?;
    Ok(controller.state())
}
