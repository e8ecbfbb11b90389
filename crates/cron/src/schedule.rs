//! Daily slot table: which hours each language fires at, per track.

use {
    chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike},
    vigil_common::{JobType, Language},
    vigil_config::ScheduleTableConfig,
};

use crate::ledger::{long_batch_key, short_key};

/// One concrete firing time for a language on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub language: Language,
    pub job_type: JobType,
    pub hour: u8,
    pub minute: u8,
}

impl Slot {
    /// Ledger key of this slot on `date`. Long slots are keyed by the batch.
    #[must_use]
    pub fn ledger_key(&self, date: NaiveDate) -> String {
        match self.job_type {
            JobType::Long => long_batch_key(date, self.language, self.hour, self.minute),
            JobType::Short => short_key(date, self.language, self.hour, self.minute),
        }
    }

    #[must_use]
    pub fn at(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .map(|t| date.and_time(t))
    }

    #[must_use]
    pub fn matches(&self, now: NaiveDateTime) -> bool {
        now.hour() == u32::from(self.hour) && now.minute() == u32::from(self.minute)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTable {
    config: ScheduleTableConfig,
}

impl ScheduleTable {
    #[must_use]
    pub fn new(config: ScheduleTableConfig) -> Self {
        Self { config }
    }

    /// The first `cadence` hours of the track for `language`, earliest first.
    #[must_use]
    pub fn candidate_hours(&self, language: Language, job_type: JobType, cadence: u8) -> &[u8] {
        match self.config.0.get(&language) {
            Some(entry) => {
                let hours = entry.hours(job_type);
                &hours[..hours.len().min(usize::from(cadence))]
            },
            None => &[],
        }
    }

    #[must_use]
    pub fn minute_offset(&self, language: Language) -> u8 {
        self.config.0.get(&language).map_or(0, |e| e.minute_offset)
    }

    /// Enabled slots for one language and track.
    pub fn slots(
        &self,
        language: Language,
        job_type: JobType,
        cadence: u8,
    ) -> impl Iterator<Item = Slot> + '_ {
        let minute = self.minute_offset(language);
        self.candidate_hours(language, job_type, cadence)
            .iter()
            .map(move |&hour| Slot {
                language,
                job_type,
                hour,
                minute,
            })
    }

    /// Largest accepted cadence for a track: the longest hour list.
    #[must_use]
    pub fn max_cadence(&self, job_type: JobType) -> u8 {
        self.config
            .0
            .values()
            .map(|e| e.hours(job_type).len())
            .max()
            .map_or(0, |n| u8::try_from(n).unwrap_or(u8::MAX))
    }
}

impl Default for ScheduleTable {
    fn default() -> Self {
        Self::new(ScheduleTableConfig::default())
    }
}
