//! Human-facing per-track status, derived from settings, ledger, and in-flight tags.

use std::collections::BTreeSet;

use {
    chrono::{NaiveDateTime, TimeDelta},
    vigil_common::{JobType, Language, Localizer},
};

use crate::{schedule::ScheduleTable, types::SchedulerState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackStatus {
    /// Jobs of this track are in flight for these languages.
    Running { languages: Vec<Language> },
    /// The next unfired slot.
    Next {
        at: NaiveDateTime,
        languages: Vec<Language>,
    },
    /// Active, but no remaining slot today or tomorrow.
    Idle,
    Disabled,
}

impl TrackStatus {
    /// Localized one-line description.
    #[must_use]
    pub fn render(&self, job_type: JobType, localizer: &Localizer) -> String {
        let kind = localizer.t(match job_type {
            JobType::Long => "marketingLongVideo",
            JobType::Short => "marketingShortVideo",
        });
        match self {
            Self::Running { languages } => localizer.format("agentStatusRunning", &[
                ("type", &kind),
                ("lang", &labels(languages)),
            ]),
            Self::Next { at, languages } => localizer.format("agentStatusIdle", &[
                ("type", &kind),
                ("lang", &labels(languages)),
                ("time", &at.format("%H:%M").to_string()),
            ]),
            Self::Idle => localizer.format("agentStatusIdle", &[
                ("type", &kind),
                ("lang", "..."),
                ("time", "..."),
            ]),
            Self::Disabled => localizer.t("agentStatusDisabled"),
        }
    }
}

fn labels(languages: &[Language]) -> String {
    languages
        .iter()
        .map(|l| l.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Status of both tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStatus {
    pub long: TrackStatus,
    pub short: TrackStatus,
}

impl AgentStatus {
    #[must_use]
    pub fn track(&self, job_type: JobType) -> &TrackStatus {
        match job_type {
            JobType::Long => &self.long,
            JobType::Short => &self.short,
        }
    }
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self {
            long: TrackStatus::Idle,
            short: TrackStatus::Idle,
        }
    }
}

/// Inputs for [`project`] that do not change between ticks.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionScope<'a> {
    pub table: &'a ScheduleTable,
    /// Language whose long slots drive the batch.
    pub primary: Language,
    /// Languages in the long batch and on the short track.
    pub languages: &'a [Language],
}

/// Compute both tracks' status at `now`.
#[must_use]
pub fn project(
    scope: ProjectionScope<'_>,
    state: &SchedulerState,
    in_flight: &BTreeSet<String>,
    now: NaiveDateTime,
) -> AgentStatus {
    AgentStatus {
        long: project_track(scope, state, in_flight, now, JobType::Long),
        short: project_track(scope, state, in_flight, now, JobType::Short),
    }
}

fn project_track(
    scope: ProjectionScope<'_>,
    state: &SchedulerState,
    in_flight: &BTreeSet<String>,
    now: NaiveDateTime,
    job_type: JobType,
) -> TrackStatus {
    let running: Vec<Language> = Language::ALL
        .into_iter()
        .filter(|l| in_flight.contains(&job_type.tag(*l)))
        .collect();
    if !running.is_empty() {
        return TrackStatus::Running { languages: running };
    }

    let track = state.track(job_type);
    if !track.active {
        return TrackStatus::Disabled;
    }

    let slot_languages: Vec<Language> = match job_type {
        JobType::Long => vec![scope.primary],
        JobType::Short => scope.languages.to_vec(),
    };

    let today = now.date();
    let next = [today, today + TimeDelta::days(1)]
        .into_iter()
        .flat_map(|date| {
            slot_languages.iter().flat_map(move |&lang| {
                scope
                    .table
                    .slots(lang, job_type, track.cadence)
                    .filter_map(move |slot| Some((slot.at(date)?, slot, date)))
            })
        })
        .filter(|(at, slot, date)| *at > now && !state.ledger.contains(&slot.ledger_key(*date)))
        .min_by_key(|(at, ..)| *at);

    match next {
        Some((at, slot, _)) => TrackStatus::Next {
            at,
            languages: match job_type {
                JobType::Long => scope.languages.to_vec(),
                JobType::Short => vec![slot.language],
            },
        },
        None => TrackStatus::Idle,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::NaiveDate};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 20)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn scope(table: &ScheduleTable) -> ProjectionScope<'_> {
        ProjectionScope {
            table,
            primary: Language::Pt,
            languages: &Language::ALL,
        }
    }

    #[test]
    fn next_long_slot_uses_primary_schedule() {
        let table = ScheduleTable::default();
        let status = project(scope(&table), &SchedulerState::default(), &BTreeSet::new(), at(7, 0));
        assert_eq!(status.long, TrackStatus::Next {
            at: at(12, 0),
            languages: Language::ALL.to_vec(),
        });
        assert_eq!(status.short, TrackStatus::Next {
            at: at(9, 0),
            languages: vec![Language::Pt],
        });
    }

    #[test]
    fn fired_slots_are_skipped_and_tomorrow_is_considered() {
        let table = ScheduleTable::default();
        let mut state = SchedulerState::default();
        state.long.cadence = 1;
        let tomorrow = at(0, 0).date() + TimeDelta::days(1);
        let status = project(scope(&table), &state, &BTreeSet::new(), at(6, 30));
        assert_eq!(status.long, TrackStatus::Next {
            at: tomorrow.and_hms_opt(6, 0, 0).unwrap(),
            languages: Language::ALL.to_vec(),
        });

        state
            .ledger
            .mark(crate::ledger::long_batch_key(tomorrow, Language::Pt, 6, 0), 1);
        let status = project(scope(&table), &state, &BTreeSet::new(), at(6, 30));
        assert_eq!(status.long, TrackStatus::Idle);
    }

    #[test]
    fn running_beats_next_and_disabled() {
        let table = ScheduleTable::default();
        let mut state = SchedulerState::default();
        let in_flight: BTreeSet<String> = ["en-short".to_string()].into();

        let status = project(scope(&table), &state, &in_flight, at(7, 0));
        assert_eq!(status.short, TrackStatus::Running {
            languages: vec![Language::En],
        });

        state.short.active = false;
        state.long.active = false;
        let status = project(scope(&table), &state, &in_flight, at(7, 0));
        assert_eq!(status.short, TrackStatus::Running {
            languages: vec![Language::En],
        });
        assert_eq!(status.long, TrackStatus::Disabled);
    }

    #[test]
    fn renders_localized_lines() {
        let en = Localizer::new(Language::En);
        let next = TrackStatus::Next {
            at: at(13, 20),
            languages: vec![Language::En],
        };
        assert_eq!(
            next.render(JobType::Short, &en),
            "Next job: Short Video (EN) at 13:20"
        );
        assert_eq!(
            TrackStatus::Running {
                languages: vec![Language::Pt, Language::Es]
            }
            .render(JobType::Long, &en),
            "Running: generating Long Video for PT, ES..."
        );
        assert_eq!(
            TrackStatus::Idle.render(JobType::Long, &en),
            "Next job: Long Video (...) at ..."
        );
        assert_eq!(
            TrackStatus::Disabled.render(JobType::Long, &Localizer::new(Language::Pt)),
            "O agente está desativado."
        );
    }
}
