//! Slot scheduling for the agent's long and short tracks.
//!
//! Settings and the run ledger persist in a [`StateStore`]; the scheduler
//! hands due work to a [`JobRunner`] and publishes an [`AgentStatus`]
//! projection for display.

pub mod clock;
pub mod error;
pub mod in_flight;
pub mod ledger;
pub mod schedule;
pub mod service;
pub mod status;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod types;

pub use {
    clock::{Clock, FixedClock, SystemClock},
    error::{Error, Result},
    in_flight::{InFlightGuard, InFlightSet},
    ledger::RunLedger,
    schedule::{ScheduleTable, Slot},
    service::{AgentScheduler, JobRunner, SchedulerOptions, load_state, update_track},
    status::{AgentStatus, ProjectionScope, TrackStatus, project},
    store::StateStore,
    store_file::FileStateStore,
    store_memory::InMemoryStateStore,
    types::{DEFAULT_CADENCE, ScheduledJob, SchedulerState, TrackConfig, keys},
};
