//! Puzzle session: the async owner of one engine and its run timer.
//!
//! The session is the only thing that drives the engine. It holds:
//!   - the engine, behind a mutex that is never held across an `.await`
//!   - at most one run timer task (start delay, then one tick per interval)
//!   - the level loader and the score/progress sinks
//!
//! RULES:
//!   - Starting a run, replaying, stopping, clearing, loading a level, and
//!     dropping the last session handle all abort the outstanding timer
//!     before anything else happens.
//!   - The timer task carries the epoch of the run it was started for; the
//!     engine ignores ticks from any other epoch.
//!   - The timer task holds only a weak reference, so it never keeps a
//!     dropped session alive.
//!   - Sink and progress writes run on the blocking pool. Their failures
//!     are logged and swallowed.
//!
//! Methods that start timers must be called from within a tokio runtime.

use crate::{
    clock::PlaybackSpeed,
    command::PlayerCommand,
    config::EngineConfig,
    engine::PathEngine,
    event::PathEvent,
    grid::Direction,
    loader::{LevelLoader, LevelProvider},
    run::RunOutcome,
    sink::{ProgressStore, ScoreSink},
    snapshot::EngineSnapshot,
    store::RunRecord,
    types::{LevelNumber, StepIndex},
};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct PuzzleSession<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for PuzzleSession<P> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct Inner<P> {
    engine:   Mutex<PathEngine>,
    timer:    Mutex<Option<JoinHandle<()>>>,
    loader:   LevelLoader<P>,
    scores:   Arc<dyn ScoreSink>,
    progress: Arc<dyn ProgressStore>,
    config:   EngineConfig,
    events:   broadcast::Sender<PathEvent>,
}

impl<P: LevelProvider + 'static> PuzzleSession<P> {
    /// Read the persisted level once, load it, and return a ready session.
    pub async fn start(
        loader: LevelLoader<P>,
        scores: Arc<dyn ScoreSink>,
        progress: Arc<dyn ProgressStore>,
        config: EngineConfig,
    ) -> Self {
        let reader = Arc::clone(&progress);
        let key = config.progress_key.clone();
        let saved = tokio::task::spawn_blocking(move || reader.load_current_level(&key)).await;
        let level_number = match saved {
            Ok(Ok(Some(n))) => n,
            Ok(Ok(None)) => 1,
            Ok(Err(e)) => {
                log::warn!("could not read saved level, starting at 1: {e:#}");
                1
            }
            Err(e) => {
                log::warn!("saved level read did not complete, starting at 1: {e}");
                1
            }
        };

        let loaded = loader.load(level_number).await;
        let engine = PathEngine::new(loaded, level_number, config.playback_clock());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        log::info!("session started on level {level_number}");
        Self {
            inner: Arc::new(Inner {
                engine: Mutex::new(engine),
                timer: Mutex::new(None),
                loader,
                scores,
                progress,
                config,
                events,
            }),
        }
    }

    /// Receive every engine event from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PathEvent> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.inner.engine().snapshot()
    }

    pub fn outcome(&self) -> RunOutcome {
        self.inner.engine().outcome()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ── Queue editing ──────────────────────────────────────────

    pub fn add_command(&self, command: Direction) -> bool {
        let events = self.inner.engine().add_command(command);
        self.inner.publish(events)
    }

    pub fn remove_command(&self, index: StepIndex) -> bool {
        let events = self.inner.engine().remove_command(index);
        self.inner.publish(events)
    }

    pub fn clear(&self) -> bool {
        self.inner.cancel_timer();
        let events = self.inner.engine().clear();
        self.inner.publish(events)
    }

    // ── Run control ────────────────────────────────────────────

    /// Start executing the queue. Returns `false` if the engine refused.
    pub fn run(&self) -> bool {
        let (events, epoch, delay, interval) = {
            let mut engine = self.inner.engine();
            let events = engine.run();
            let clock = engine.clock();
            (events, engine.epoch(), clock.start_delay(), clock.tick_interval())
        };
        if events.is_empty() {
            return false;
        }

        self.inner.cancel_timer();
        self.inner.publish(events);
        let task = tokio::spawn(drive_run(Arc::downgrade(&self.inner), epoch, delay, interval));
        *self.inner.timer() = Some(task);
        true
    }

    /// Put the robot back on start, keeping the queue.
    pub fn replay(&self) -> bool {
        self.inner.cancel_timer();
        let events = self.inner.engine().replay();
        self.inner.publish(events)
    }

    /// Abort a running program without recording an outcome.
    pub fn stop(&self) -> bool {
        self.inner.cancel_timer();
        let events = self.inner.engine().stop();
        self.inner.publish(events)
    }

    pub fn set_speed(&self, speed: PlaybackSpeed) {
        self.inner.engine().set_speed(speed);
    }

    /// Leave the puzzle: cancel timers and park the robot on start.
    /// A level load still in flight is abandoned and will not be applied.
    pub fn shutdown(&self) {
        self.inner.cancel_timer();
        let events = {
            let mut engine = self.inner.engine();
            engine.abandon_load();
            engine.stop()
        };
        self.inner.publish(events);
    }

    // ── Progression ────────────────────────────────────────────

    /// Move `delta` levels from the current one. Targets below 1 are refused.
    pub async fn change_level(&self, delta: i64) -> bool {
        let current = self.inner.engine().level_number() as i64;
        match LevelNumber::try_from(current.saturating_add(delta)) {
            Ok(target) if target >= 1 => self.load_level(target).await,
            _ => false,
        }
    }

    /// Fetch `level` and swap it in. Returns `true` if this request's level
    /// was applied, `false` if it was refused or superseded.
    pub async fn load_level(&self, level: LevelNumber) -> bool {
        self.inner.cancel_timer();
        let begun = self.inner.engine().begin_load(level);
        let Some((ticket, events)) = begun else {
            return false;
        };
        self.inner.publish(events);

        let loaded = self.inner.loader.load(level).await;

        let events = self.inner.engine().finish_load(ticket, loaded);
        let applied = matches!(events.first(), Some(PathEvent::LevelLoaded { .. }));
        self.inner.publish(events);

        if applied {
            self.inner.save_progress(level).await;
        }
        applied
    }

    /// Apply one UI request. Returns whether it changed anything.
    pub async fn apply(&self, command: PlayerCommand) -> bool {
        match command {
            PlayerCommand::AddCommand { command } => self.add_command(command),
            PlayerCommand::RemoveCommand { index } => self.remove_command(index),
            PlayerCommand::Clear => self.clear(),
            PlayerCommand::Run => self.run(),
            PlayerCommand::Replay => self.replay(),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::SetSpeed { speed } => {
                self.set_speed(speed);
                true
            }
            PlayerCommand::ChangeLevel { delta } => self.change_level(delta).await,
        }
    }
}

impl<P> Inner<P> {
    fn engine(&self) -> MutexGuard<'_, PathEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_timer(&self) {
        if let Some(task) = self.timer().take() {
            task.abort();
        }
    }

    /// Forward events to subscribers. Returns whether there were any.
    fn publish(&self, events: Vec<PathEvent>) -> bool {
        let any = !events.is_empty();
        for event in events {
            log::trace!("event {}", event.kind());
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        any
    }

    /// Hand a finished run to the score sink on the blocking pool.
    /// Nothing waits for it.
    fn record_finished(&self, record: RunRecord) {
        let scores = Arc::clone(&self.scores);
        let game_id = self.config.game_id.clone();
        let score = (record.outcome == RunOutcome::Won)
            .then(|| self.config.score_for_level(record.level));

        tokio::task::spawn_blocking(move || {
            if let Some(score) = score {
                match scores.record_score(&game_id, score) {
                    Ok(()) => log::info!("score {score} saved for {game_id}"),
                    Err(e) => log::warn!("could not save score for {game_id}: {e:#}"),
                }
            }
            if let Err(e) = scores.record_run(&record) {
                log::warn!("could not save run {}: {e:#}", record.run_id);
            }
        });
    }

    /// Persist the current level off the runtime threads.
    async fn save_progress(&self, level: LevelNumber) {
        let progress = Arc::clone(&self.progress);
        let key = self.config.progress_key.clone();
        let saved =
            tokio::task::spawn_blocking(move || progress.save_current_level(&key, level)).await;
        match saved {
            Ok(Ok(())) => log::debug!("current level {level} persisted"),
            Ok(Err(e)) => log::warn!("could not persist current level {level}: {e:#}"),
            Err(e) => log::warn!("persisting current level {level} did not complete: {e}"),
        }
    }
}

impl<P> Drop for Inner<P> {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// The run timer: one start delay, then one tick per interval until the
/// engine reports the run finished or stops accepting this epoch.
async fn drive_run<P>(weak: Weak<Inner<P>>, epoch: u64, delay: Duration, interval: Duration) {
    tokio::time::sleep(delay).await;
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else {
            return;
        };

        let (events, finished) = {
            let mut engine = inner.engine();
            let events = engine.tick(epoch);
            let finished = events
                .iter()
                .any(PathEvent::ends_run)
                .then(|| finished_record(&engine));
            (events, finished)
        };

        if !inner.publish(events) {
            // Stale epoch or the run was reset under us.
            return;
        }
        if let Some(record) = finished {
            inner.record_finished(record);
            return;
        }
    }
}

fn finished_record(engine: &PathEngine) -> RunRecord {
    let run = engine.run_state();
    RunRecord {
        run_id:      uuid::Uuid::new_v4().to_string(),
        level:       engine.level_number(),
        outcome:     run.outcome,
        failure:     run.failure,
        steps:       run.steps_taken() as u32,
        commands:    engine.queue().to_letters(),
        finished_at: Utc::now(),
    }
}
