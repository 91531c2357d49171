//! Chi-square Simulation
//!
//! An interactive demonstrator of the chi-square goodness-of-fit statistic.
//! Each trial draws a multinomial sample over a fixed category set, computes
//! the statistic against the expected distribution and appends it to a
//! running history, whose histogram is compared with the theoretical
//! chi-square density once the trial budget is spent.
//!
//! ## Core Components
//!
//! - **SimulationEngine**: owns the trial state and runs one trial at a time
//! - **RunController**: single-step and continuous-run state machine
//! - **TickScheduler**: the scheduling capability continuous mode is driven by,
//!   with a simulated-clock `ManualScheduler` and a tokio-backed host scheduler
//! - **ChartRenderer**: text presenter for the histogram, density overlay and
//!   per-trial calculation
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use chisq_simulation::{ManualScheduler, RunController, SimulationConfig, SimulationEngine};
//!
//! let config = SimulationConfig::default().with_seed(42);
//! let mut engine = SimulationEngine::new(&config)?;
//! let mut controller = RunController::new(&mut engine, ManualScheduler::default());
//!
//! controller.start_continuous();
//! while let Some(tick) = controller.scheduler_mut().fire_next() {
//!     controller.on_tick(tick);
//! }
//! assert!(controller.is_finished());
//! # Ok::<(), chisq_simulation::SimulationError>(())
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod randomness;
pub mod runner;
pub mod scheduler;
pub mod statistics;
pub mod visualization;

// Core exports
pub use clock::{SimulatedClock, SimulatedTimestamp};
pub use config::{HistogramConfig, SimulationConfig};
pub use controller::{RunController, RunState};
pub use engine::{EngineSnapshot, SimulationEngine};
pub use error::{SimulationError, SimulationResult};
pub use randomness::SeededRng;
pub use scheduler::{ManualScheduler, TickId, TickScheduler};
pub use statistics::{CategoryTerm, Histogram, HistorySummary, StatisticBreakdown};
pub use visualization::ChartRenderer;
