//! Agent scheduler: slot timer, status timer, job dispatch, and settings.

use std::{
    sync::{Arc, Mutex as StdMutex},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    chrono::NaiveDateTime,
    tokio::{
        sync::{Mutex, watch},
        task::JoinHandle,
        time::{Instant, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    vigil_common::{JobType, Language, Localizer},
    vigil_config::AgentConfig,
};

use crate::{
    clock::Clock,
    error::{Error, Result},
    in_flight::InFlightSet,
    ledger::RunLedger,
    schedule::ScheduleTable,
    status::{AgentStatus, ProjectionScope, project},
    store::StateStore,
    types::{ScheduledJob, SchedulerState, TrackConfig, keys},
};

/// Executes scheduled work. Implementations handle and log their own failures.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run_long_batch(&self);
    async fn run_short_job(&self, language: Language);
}

/// Timing and language settings for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub primary_language: Language,
    pub languages: Vec<Language>,
    pub startup_delay: Duration,
    pub slot_check_interval: Duration,
    pub status_refresh_interval: Duration,
    pub locale: Language,
}

impl SchedulerOptions {
    pub fn from_config(config: &AgentConfig) -> Self {
        let at_least_one = |secs: u64| Duration::from_secs(secs.max(1));
        Self {
            primary_language: config.primary_language,
            languages: config.languages.clone(),
            startup_delay: Duration::from_secs(config.startup_delay_secs),
            slot_check_interval: at_least_one(config.slot_check_interval_secs),
            status_refresh_interval: at_least_one(config.status_refresh_interval_secs),
            locale: config.locale,
        }
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

/// Owns the scheduler state and drives jobs off the wall clock.
pub struct AgentScheduler {
    table: ScheduleTable,
    options: SchedulerOptions,
    state: Mutex<SchedulerState>,
    store: Arc<dyn StateStore>,
    runner: Arc<dyn JobRunner>,
    in_flight: InFlightSet,
    clock: Arc<dyn Clock>,
    localizer: Localizer,
    status_tx: watch::Sender<AgentStatus>,
    cancel: CancellationToken,
    loop_handle: StdMutex<Option<JoinHandle<()>>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Read persisted settings and ledger; absent keys take defaults.
pub async fn load_state(store: &dyn StateStore) -> Result<SchedulerState> {
    let mut state = SchedulerState::default();
    for job_type in JobType::ALL {
        let track = state.track_mut(job_type);
        if let Some(active) = store.load::<bool>(keys::active(job_type)).await? {
            track.active = active;
        }
        if let Some(cadence) = store.load::<u8>(keys::cadence(job_type)).await? {
            track.cadence = cadence;
        }
    }
    if let Some(ledger) = store.load::<RunLedger>(keys::LAST_RUNS).await? {
        state.ledger = ledger;
    }
    Ok(state)
}

async fn save_track(store: &dyn StateStore, job_type: JobType, track: &TrackConfig) -> Result<()> {
    store.save(keys::active(job_type), &track.active).await?;
    store.save(keys::cadence(job_type), &track.cadence).await
}

impl AgentScheduler {
    /// Load persisted state and build a scheduler. Call [`Self::start`] to run it.
    pub async fn open(
        table: ScheduleTable,
        options: SchedulerOptions,
        store: Arc<dyn StateStore>,
        runner: Arc<dyn JobRunner>,
        in_flight: InFlightSet,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>> {
        let state = load_state(store.as_ref()).await?;
        info!(
            long_active = state.long.active,
            long_cadence = state.long.cadence,
            short_active = state.short.active,
            short_cadence = state.short.cadence,
            ledger_entries = state.ledger.len(),
            "loaded scheduler state"
        );

        let localizer = Localizer::new(options.locale);
        let (status_tx, _rx) = watch::channel(AgentStatus::default());
        let scheduler = Arc::new(Self {
            table,
            options,
            state: Mutex::new(state),
            store,
            runner,
            in_flight,
            clock,
            localizer,
            status_tx,
            cancel: CancellationToken::new(),
            loop_handle: StdMutex::new(None),
        });
        scheduler.refresh_status().await;
        Ok(scheduler)
    }

    /// Spawn the timer loop.
    pub fn start(self: &Arc<Self>) {
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            scheduler.run_loop().await;
        });
        *self.loop_handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        info!(
            startup_delay_secs = self.options.startup_delay.as_secs(),
            "agent scheduler started"
        );
    }

    /// Stop the timer loop. Jobs already spawned run to completion.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("agent scheduler stopped");
    }

    async fn run_loop(self: Arc<Self>) {
        let mut status_tick = tokio::time::interval(self.options.status_refresh_interval);
        status_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut slot_tick = tokio::time::interval_at(
            Instant::now() + self.options.startup_delay,
            self.options.slot_check_interval,
        );
        slot_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight_rx = self.in_flight.subscribe();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = slot_tick.tick() => {
                    if !self.check_schedule().await.is_empty() {
                        self.refresh_status().await;
                    }
                },
                _ = status_tick.tick() => {
                    self.refresh_status().await;
                },
                Ok(()) = in_flight_rx.changed() => {
                    debug!("in-flight set changed");
                    self.refresh_status().await;
                },
            }
        }
    }

    /// Fire every due slot at the clock's current time.
    pub async fn check_schedule(&self) -> Vec<JoinHandle<()>> {
        self.check_schedule_at(self.clock.now()).await
    }

    /// Fire every slot matching `now` whose ledger key is unset.
    ///
    /// Keys are recorded and persisted before any job is spawned, so a second
    /// tick within the same minute fires nothing.
    pub async fn check_schedule_at(&self, now: NaiveDateTime) -> Vec<JoinHandle<()>> {
        let date = now.date();
        let due = {
            let mut state = self.state.lock().await;
            self.sync_tracks(&mut state).await;
            let mut due = Vec::new();

            if state.long.active {
                let cadence = state.long.cadence;
                for slot in self
                    .table
                    .slots(self.options.primary_language, JobType::Long, cadence)
                    .filter(|s| s.matches(now))
                {
                    if state.ledger.mark(slot.ledger_key(date), now_ms()) {
                        due.push(ScheduledJob::LongBatch);
                    }
                }
            }

            if state.short.active {
                let cadence = state.short.cadence;
                for &lang in &self.options.languages {
                    for slot in self
                        .table
                        .slots(lang, JobType::Short, cadence)
                        .filter(|s| s.matches(now))
                    {
                        if state.ledger.mark(slot.ledger_key(date), now_ms()) {
                            due.push(ScheduledJob::Short(lang));
                        }
                    }
                }
            }

            if !due.is_empty()
                && let Err(e) = self.store.save(keys::LAST_RUNS, &state.ledger).await
            {
                warn!(error = %e, "failed to persist run ledger");
            }
            due
        };

        due.into_iter()
            .map(|job| {
                info!(job = ?job, at = %now.format("%Y-%m-%d %H:%M"), "slot due, starting job");
                let runner = Arc::clone(&self.runner);
                tokio::spawn(async move {
                    match job {
                        ScheduledJob::LongBatch => runner.run_long_batch().await,
                        ScheduledJob::Short(lang) => runner.run_short_job(lang).await,
                    }
                })
            })
            .collect()
    }

    /// Recompute and publish the status projection.
    pub async fn refresh_status(&self) -> AgentStatus {
        let status = {
            let mut state = self.state.lock().await;
            self.sync_tracks(&mut state).await;
            project(
                ProjectionScope {
                    table: &self.table,
                    primary: self.options.primary_language,
                    languages: &self.options.languages,
                },
                &state,
                &self.in_flight.tags(),
                self.clock.now(),
            )
        };
        self.status_tx.send_replace(status.clone());
        status
    }

    /// Pick up track settings written to the store by another handle, such
    /// as `vigil agent disable`. The ledger stays as held in memory.
    ///
    /// Unreadable or out-of-range values leave the current setting in place.
    async fn sync_tracks(&self, state: &mut SchedulerState) {
        for job_type in JobType::ALL {
            let max = self.table.max_cadence(job_type);
            let active = self.store.load::<bool>(keys::active(job_type)).await;
            let cadence = self.store.load::<u8>(keys::cadence(job_type)).await;
            let track = state.track_mut(job_type);

            match active {
                Ok(Some(active)) if active != track.active => {
                    info!(track = %job_type, active, "track toggled externally");
                    track.active = active;
                },
                Ok(_) => {},
                Err(e) => warn!(track = %job_type, error = %e, "failed to reload track state"),
            }
            match cadence {
                Ok(Some(cadence)) if cadence != track.cadence => {
                    if (1..=max).contains(&cadence) {
                        info!(track = %job_type, cadence, "cadence changed externally");
                        track.cadence = cadence;
                    } else {
                        warn!(track = %job_type, cadence, max, "ignoring stored cadence out of range");
                    }
                },
                Ok(_) => {},
                Err(e) => warn!(track = %job_type, error = %e, "failed to reload track cadence"),
            }
        }
    }

    /// Latest published status.
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        self.status_tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AgentStatus> {
        self.status_tx.subscribe()
    }

    /// Status rendered in the configured locale: `(long, short)`.
    #[must_use]
    pub fn status_lines(&self) -> (String, String) {
        let status = self.status();
        (
            status.long.render(JobType::Long, &self.localizer),
            status.short.render(JobType::Short, &self.localizer),
        )
    }

    pub async fn snapshot(&self) -> SchedulerState {
        self.state.lock().await.clone()
    }

    /// Enable or disable a track. Past slots stay recorded, so re-enabling
    /// never re-fires them.
    pub async fn set_active(&self, job_type: JobType, active: bool) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            let track = state.track_mut(job_type);
            track.active = active;
            save_track(self.store.as_ref(), job_type, track).await?;
        }
        info!(track = %job_type, active, "track toggled");
        self.refresh_status().await;
        Ok(())
    }

    /// Set how many of the track's daily hours are enabled.
    pub async fn set_cadence(&self, job_type: JobType, cadence: u8) -> Result<()> {
        let max = self.table.max_cadence(job_type);
        if cadence == 0 || cadence > max {
            return Err(Error::invalid_cadence(job_type, cadence, max));
        }
        {
            let mut state = self.state.lock().await;
            let track = state.track_mut(job_type);
            track.cadence = cadence;
            save_track(self.store.as_ref(), job_type, track).await?;
        }
        info!(track = %job_type, cadence, "cadence changed");
        self.refresh_status().await;
        Ok(())
    }
}

/// Apply a settings change directly to a store, without a running scheduler.
pub async fn update_track(
    store: &dyn StateStore,
    table: &ScheduleTable,
    job_type: JobType,
    active: Option<bool>,
    cadence: Option<u8>,
) -> Result<TrackConfig> {
    let mut state = load_state(store).await?;
    let track = state.track_mut(job_type);
    if let Some(cadence) = cadence {
        let max = table.max_cadence(job_type);
        if cadence == 0 || cadence > max {
            return Err(Error::invalid_cadence(job_type, cadence, max));
        }
        track.cadence = cadence;
    }
    if let Some(active) = active {
        track.active = active;
    }
    save_track(store, job_type, track).await?;
    Ok(*track)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            clock::FixedClock,
            ledger::{long_batch_key, short_key},
            status::TrackStatus,
            store_file::FileStateStore,
            store_memory::InMemoryStateStore,
        },
        chrono::NaiveDate,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default)]
    struct CountingRunner {
        long: AtomicUsize,
        short: StdMutex<Vec<Language>>,
    }

    #[async_trait]
    impl JobRunner for CountingRunner {
        async fn run_long_batch(&self) {
            self.long.fetch_add(1, Ordering::SeqCst);
        }

        async fn run_short_job(&self, language: Language) {
            self.short.lock().unwrap().push(language);
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 20)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    struct Harness {
        scheduler: Arc<AgentScheduler>,
        runner: Arc<CountingRunner>,
        store: Arc<InMemoryStateStore>,
        clock: Arc<FixedClock>,
        in_flight: InFlightSet,
    }

    async fn harness(now: NaiveDateTime) -> Harness {
        harness_with_store(now, Arc::new(InMemoryStateStore::new())).await
    }

    async fn harness_with_store(now: NaiveDateTime, store: Arc<InMemoryStateStore>) -> Harness {
        let runner = Arc::new(CountingRunner::default());
        let clock = Arc::new(FixedClock::new(now));
        let in_flight = InFlightSet::new();
        let scheduler = AgentScheduler::open(
            ScheduleTable::default(),
            SchedulerOptions::default(),
            store.clone(),
            runner.clone(),
            in_flight.clone(),
            clock.clone(),
        )
        .await
        .unwrap();
        Harness {
            scheduler,
            runner,
            store,
            clock,
            in_flight,
        }
    }

    async fn join(handles: Vec<JoinHandle<()>>) -> usize {
        let n = handles.len();
        for h in handles {
            h.await.unwrap();
        }
        n
    }

    #[tokio::test]
    async fn two_ticks_in_same_minute_fire_once() {
        let h = harness(at(6, 0, 5)).await;

        assert_eq!(join(h.scheduler.check_schedule_at(at(6, 0, 5)).await).await, 1);
        assert_eq!(join(h.scheduler.check_schedule_at(at(6, 0, 35)).await).await, 0);
        assert_eq!(h.runner.long.load(Ordering::SeqCst), 1);

        let date = at(0, 0, 0).date();
        let ledger = h.scheduler.snapshot().await.ledger;
        assert!(ledger.contains(&long_batch_key(date, Language::Pt, 6, 0)));
        assert_eq!(ledger.len(), 1);

        let persisted: Option<RunLedger> = (h.store.clone() as Arc<dyn StateStore>)
            .load(keys::LAST_RUNS)
            .await
            .unwrap();
        assert_eq!(persisted, Some(ledger));
    }

    #[tokio::test]
    async fn long_slots_follow_primary_language_only() {
        let h = harness(at(7, 20, 0)).await;
        // 07:20 is the English long hour plus its offset, not a primary slot.
        assert_eq!(join(h.scheduler.check_schedule_at(at(7, 20, 0)).await).await, 0);
        assert_eq!(h.runner.long.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_slots_fire_per_language() {
        let h = harness(at(9, 40, 0)).await;
        assert_eq!(join(h.scheduler.check_schedule_at(at(9, 40, 0)).await).await, 1);
        assert_eq!(*h.runner.short.lock().unwrap(), vec![Language::Es]);

        // 12:00 is both a primary long slot and the Portuguese short slot.
        let fired = join(h.scheduler.check_schedule_at(at(12, 0, 0)).await).await;
        assert_eq!(fired, 2);
        assert_eq!(h.runner.long.load(Ordering::SeqCst), 1);
        assert_eq!(*h.runner.short.lock().unwrap(), vec![Language::Es, Language::Pt]);
    }

    #[tokio::test]
    async fn cadence_excludes_later_hours() {
        let h = harness(at(5, 0, 0)).await;
        h.scheduler.set_cadence(JobType::Long, 1).await.unwrap();
        assert_eq!(join(h.scheduler.check_schedule_at(at(12, 0, 0)).await).await, 1);
        // Only the short job fired; 12:00 is no longer a long slot.
        assert_eq!(h.runner.long.load(Ordering::SeqCst), 0);

        assert!(matches!(
            h.scheduler.set_cadence(JobType::Short, 0).await,
            Err(Error::InvalidCadence { .. })
        ));
        assert!(h.scheduler.set_cadence(JobType::Short, 4).await.is_err());
    }

    #[tokio::test]
    async fn disabled_track_does_not_fire_and_reenable_skips_past() {
        let h = harness(at(9, 0, 0)).await;
        h.scheduler.set_active(JobType::Short, false).await.unwrap();
        assert_eq!(join(h.scheduler.check_schedule_at(at(9, 0, 0)).await).await, 0);
        assert_eq!(h.scheduler.status().short, TrackStatus::Disabled);

        h.scheduler.set_active(JobType::Short, true).await.unwrap();
        assert_eq!(join(h.scheduler.check_schedule_at(at(9, 0, 10)).await).await, 1);
        h.scheduler.set_active(JobType::Short, false).await.unwrap();
        h.scheduler.set_active(JobType::Short, true).await.unwrap();
        assert_eq!(join(h.scheduler.check_schedule_at(at(9, 0, 40)).await).await, 0);
    }

    #[tokio::test]
    async fn settings_and_ledger_survive_reopen() {
        let store = Arc::new(InMemoryStateStore::new());
        let h = harness_with_store(at(6, 0, 0), store.clone()).await;
        h.scheduler.set_cadence(JobType::Short, 2).await.unwrap();
        h.scheduler.set_active(JobType::Long, false).await.unwrap();
        join(h.scheduler.check_schedule_at(at(9, 0, 0)).await).await;

        let reopened = harness_with_store(at(9, 0, 30), store).await;
        let state = reopened.scheduler.snapshot().await;
        assert_eq!(state.short.cadence, 2);
        assert!(!state.long.active);
        assert!(
            state
                .ledger
                .contains(&short_key(at(0, 0, 0).date(), Language::Pt, 9, 0))
        );
        assert_eq!(
            join(reopened.scheduler.check_schedule_at(at(9, 0, 30)).await).await,
            0
        );
    }

    #[tokio::test]
    async fn settings_written_by_another_handle_apply_without_restart() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agent.json");
        let runner = Arc::new(CountingRunner::default());
        let scheduler = AgentScheduler::open(
            ScheduleTable::default(),
            SchedulerOptions::default(),
            Arc::new(FileStateStore::new(&path)),
            runner.clone(),
            InFlightSet::new(),
            Arc::new(FixedClock::new(at(9, 0, 0))),
        )
        .await
        .unwrap();
        assert!(matches!(scheduler.status().short, TrackStatus::Next { .. }));

        let cli = FileStateStore::new(&path);
        let table = ScheduleTable::default();
        update_track(&cli, &table, JobType::Short, Some(false), None)
            .await
            .unwrap();
        update_track(&cli, &table, JobType::Long, None, Some(1))
            .await
            .unwrap();

        assert_eq!(join(scheduler.check_schedule_at(at(9, 0, 0)).await).await, 0);
        assert!(runner.short.lock().unwrap().is_empty());
        assert_eq!(scheduler.refresh_status().await.short, TrackStatus::Disabled);

        // Long cadence 1 leaves only the 06:00 slot.
        assert_eq!(join(scheduler.check_schedule_at(at(12, 0, 0)).await).await, 0);
        assert_eq!(runner.long.load(Ordering::SeqCst), 0);

        let state = scheduler.snapshot().await;
        assert!(!state.short.active);
        assert_eq!(state.long.cadence, 1);
    }

    #[tokio::test]
    async fn ledger_persist_failure_still_runs_job() {
        let store = Arc::new(InMemoryStateStore::new());
        let h = harness_with_store(at(9, 20, 0), store.clone()).await;
        store.fail_writes(true);
        assert_eq!(join(h.scheduler.check_schedule_at(at(9, 20, 0)).await).await, 1);
        assert_eq!(*h.runner.short.lock().unwrap(), vec![Language::En]);
    }

    #[tokio::test]
    async fn status_reflects_in_flight_tags() {
        let h = harness(at(7, 0, 0)).await;
        assert!(matches!(h.scheduler.status().long, TrackStatus::Next { .. }));

        let guard = h.in_flight.begin([JobType::Long.tag(Language::Pt)]);
        let status = h.scheduler.refresh_status().await;
        assert_eq!(status.long, TrackStatus::Running {
            languages: vec![Language::Pt],
        });
        drop(guard);
        h.clock.set(at(7, 1, 0));
        assert!(matches!(
            h.scheduler.refresh_status().await.long,
            TrackStatus::Next { .. }
        ));
        assert!(h.scheduler.status_lines().0.starts_with("Next job: Long Video"));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_waits_for_startup_delay_then_fires() {
        let h = harness(at(6, 0, 0)).await;
        h.scheduler.start();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.runner.long.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(h.runner.long.load(Ordering::SeqCst), 1);

        h.scheduler.stop().await;
    }
}
