//! Polling pipeline.
//!
//! - `diff`: filter, normalize and compare a listing against the history
//! - `cycle`: one fetch → diff → persist pass
//! - `scheduler`: cancellable periodic runner
//! - `tracker`: start/stop controller wiring cycles to the notifier

pub mod cycle;
pub mod diff;
pub mod scheduler;
pub mod tracker;

pub use cycle::PollCycle;
pub use diff::{DiffEngine, latest_upstream_update, people_looking_change, snapshot_change};
pub use scheduler::{PollScheduler, SchedulerState};
pub use tracker::Tracker;
