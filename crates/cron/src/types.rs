use {
    serde::{Deserialize, Serialize},
    vigil_common::{JobType, Language},
};

use crate::ledger::RunLedger;

/// Default number of enabled fire hours per track.
pub const DEFAULT_CADENCE: u8 = 3;

/// User-controlled settings for one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConfig {
    pub active: bool,
    /// How many of the track's daily hours are enabled, earliest first.
    pub cadence: u8,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            active: true,
            cadence: DEFAULT_CADENCE,
        }
    }
}

/// Everything the scheduler persists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerState {
    pub long: TrackConfig,
    pub short: TrackConfig,
    pub ledger: RunLedger,
}

impl SchedulerState {
    #[must_use]
    pub fn track(&self, job_type: JobType) -> &TrackConfig {
        match job_type {
            JobType::Long => &self.long,
            JobType::Short => &self.short,
        }
    }

    pub fn track_mut(&mut self, job_type: JobType) -> &mut TrackConfig {
        match job_type {
            JobType::Long => &mut self.long,
            JobType::Short => &mut self.short,
        }
    }
}

/// A unit of work the scheduler hands to the [`crate::JobRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledJob {
    /// Long-form kits for every configured language, sharing one image.
    LongBatch,
    Short(Language),
}

impl ScheduledJob {
    #[must_use]
    pub fn job_type(self) -> JobType {
        match self {
            Self::LongBatch => JobType::Long,
            Self::Short(_) => JobType::Short,
        }
    }
}

/// State store keys.
pub mod keys {
    use vigil_common::JobType;

    pub const LAST_RUNS: &str = "agent_lastRuns";

    #[must_use]
    pub fn active(job_type: JobType) -> &'static str {
        match job_type {
            JobType::Long => "agent_isLongActive",
            JobType::Short => "agent_isShortActive",
        }
    }

    #[must_use]
    pub fn cadence(job_type: JobType) -> &'static str {
        match job_type {
            JobType::Long => "agent_longVideoCadence",
            JobType::Short => "agent_shortVideoCadence",
        }
    }
}
