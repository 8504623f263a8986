//! The path engine: Engine State plus the Run Scheduler transitions.
//!
//! The engine is synchronous and owns no timers. A driver (see `session`)
//! calls `tick()` once per interval; the engine decides what a tick means.
//!
//! RUN STATE MACHINE:
//!   Idle ──run()──▶ Running ──tick()*──▶ Won | Failed
//!   any  ──replay() / clear() / level swap──▶ Idle
//!
//! RULES:
//!   - Queue edits are refused while Running or while a level is loading.
//!   - Win/loss is decided only after the last command. Passing over the
//!     goal mid-queue does not end the run.
//!   - Every run start, reset, and level swap bumps the epoch. A tick
//!     carrying an old epoch is ignored, so a late timer can never advance
//!     a newer run.
//!   - Rejected input changes nothing and returns no events.

use crate::{
    clock::{PlaybackClock, PlaybackSpeed},
    event::PathEvent,
    ghost,
    grid::{Direction, Position},
    level::{Level, Provenance},
    loader::LoadedLevel,
    queue::CommandQueue,
    run::{FailureReason, RunOutcome, RunState},
    snapshot::EngineSnapshot,
    types::{LevelNumber, StepIndex},
};

/// Handle for one in-flight level load. Only the newest ticket may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    seq:       u64,
    pub level: LevelNumber,
}

pub struct PathEngine {
    level:        Level,
    provenance:   Provenance,
    message:      Option<String>,
    level_number: LevelNumber,
    queue:        CommandQueue,
    run:          RunState,
    ghost:        Position,
    clock:        PlaybackClock,
    epoch:        u64,
    load_seq:     u64,
    loading:      Option<LoadTicket>,
}

impl PathEngine {
    pub fn new(loaded: LoadedLevel, level_number: LevelNumber, clock: PlaybackClock) -> Self {
        let start = loaded.level.start();
        Self {
            ghost:        start,
            run:          RunState::idle_at(start),
            level:        loaded.level,
            provenance:   loaded.provenance,
            message:      loaded.message,
            level_number: level_number.max(1),
            queue:        CommandQueue::new(),
            clock,
            epoch:        0,
            load_seq:     0,
            loading:      None,
        }
    }

    // ── Read-only view ─────────────────────────────────────────

    pub fn level(&self) -> &Level { &self.level }
    pub fn level_number(&self) -> LevelNumber { self.level_number }
    pub fn queue(&self) -> &CommandQueue { &self.queue }
    pub fn run_state(&self) -> &RunState { &self.run }
    pub fn outcome(&self) -> RunOutcome { self.run.outcome }
    pub fn ghost_position(&self) -> Position { self.ghost }
    pub fn clock(&self) -> &PlaybackClock { &self.clock }
    pub fn epoch(&self) -> u64 { self.epoch }
    pub fn is_loading(&self) -> bool { self.loading.is_some() }

    /// Queue edits and run requests are accepted only in this state.
    pub fn accepts_input(&self) -> bool {
        !self.run.is_running() && !self.is_loading()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            level_number: self.level_number,
            level:        self.level.clone(),
            provenance:   self.provenance,
            message:      self.message.clone(),
            queue:        self.queue.clone(),
            run:          self.run.clone(),
            ghost:        self.ghost,
            is_loading:   self.is_loading(),
            speed:        self.clock.speed,
        }
    }

    // ── Command queue ──────────────────────────────────────────

    pub fn add_command(&mut self, command: Direction) -> Vec<PathEvent> {
        if !self.accepts_input() {
            return vec![];
        }
        self.queue.push(command);
        self.refresh_ghost();
        vec![PathEvent::CommandAdded { index: self.queue.len() - 1, command }]
    }

    pub fn remove_command(&mut self, index: StepIndex) -> Vec<PathEvent> {
        if !self.accepts_input() {
            return vec![];
        }
        let Some(command) = self.queue.remove(index) else {
            return vec![];
        };
        self.refresh_ghost();
        vec![PathEvent::CommandRemoved { index, command }]
    }

    /// Empty the queue and put the robot back on start. Also aborts a run.
    pub fn clear(&mut self) -> Vec<PathEvent> {
        if self.is_loading() {
            return vec![];
        }
        self.queue.clear();
        self.refresh_ghost();
        self.reset_run();
        vec![PathEvent::QueueCleared, PathEvent::RunReset { level: self.level_number }]
    }

    // ── Run scheduler ──────────────────────────────────────────

    /// Idle → Running. Refused for an empty queue, outside Idle, or while loading.
    pub fn run(&mut self) -> Vec<PathEvent> {
        if self.queue.is_empty() || self.run.outcome != RunOutcome::Idle || self.is_loading() {
            return vec![];
        }
        self.epoch += 1;
        self.run = RunState {
            outcome: RunOutcome::Running,
            ..RunState::idle_at(self.level.start())
        };
        log::info!(
            "level={} run started: {} commands, epoch {}",
            self.level_number,
            self.queue.len(),
            self.epoch
        );
        vec![PathEvent::RunStarted {
            level: self.level_number,
            epoch: self.epoch,
            steps: self.queue.len(),
        }]
    }

    /// Advance the run by one command. `epoch` must be the epoch the run was
    /// started with; anything else is a stale timer and is ignored.
    pub fn tick(&mut self, epoch: u64) -> Vec<PathEvent> {
        if epoch != self.epoch || !self.run.is_running() {
            return vec![];
        }

        let next = self.run.cursor.map_or(0, |c| c + 1);
        let Some(command) = self.queue.get(next) else {
            return vec![self.finish_queue()];
        };

        let from = self.run.robot_pos;
        let to = command.apply(from, self.level.grid_size());
        self.run.robot_pos = to;
        self.run.cursor = Some(next);
        log::debug!("level={} step={next} {command:?} {from} -> {to}", self.level_number);

        let mut events = vec![PathEvent::RobotMoved { step: next, command, from, to }];
        if self.level.is_obstacle(to) {
            events.push(self.fail(FailureReason::HitObstacle));
        }
        events
    }

    /// Drive the current run to completion without a timer.
    /// Used by the headless runner and by tests.
    pub fn run_to_end(&mut self) -> Vec<PathEvent> {
        let epoch = self.epoch;
        let mut events = Vec::new();
        while self.run.is_running() {
            events.extend(self.tick(epoch));
        }
        events
    }

    /// Any state → Idle at start, keeping the queue.
    pub fn replay(&mut self) -> Vec<PathEvent> {
        if self.is_loading() {
            return vec![];
        }
        self.reset_run();
        vec![PathEvent::RunReset { level: self.level_number }]
    }

    /// Running → Idle at start. No outcome is recorded.
    pub fn stop(&mut self) -> Vec<PathEvent> {
        if !self.run.is_running() {
            return vec![];
        }
        self.replay()
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.clock.set_speed(speed);
    }

    fn finish_queue(&mut self) -> PathEvent {
        if self.run.robot_pos == self.level.goal() {
            self.run.outcome = RunOutcome::Won;
            log::info!(
                "level={} run won in {} steps",
                self.level_number,
                self.run.steps_taken()
            );
            PathEvent::RunWon {
                level:    self.level_number,
                steps:    self.run.steps_taken(),
                position: self.run.robot_pos,
            }
        } else {
            self.fail(FailureReason::MissedGoal)
        }
    }

    fn fail(&mut self, reason: FailureReason) -> PathEvent {
        self.run.outcome = RunOutcome::Failed;
        self.run.failure = Some(reason);
        log::info!(
            "level={} run failed ({reason:?}) at {} after {} steps",
            self.level_number,
            self.run.robot_pos,
            self.run.steps_taken()
        );
        PathEvent::RunFailed {
            level:    self.level_number,
            reason,
            steps:    self.run.steps_taken(),
            position: self.run.robot_pos,
        }
    }

    fn reset_run(&mut self) {
        self.epoch += 1;
        self.run = RunState::idle_at(self.level.start());
    }

    fn refresh_ghost(&mut self) {
        self.ghost = ghost::project(self.queue.as_slice(), &self.level);
    }

    // ── Level loading ──────────────────────────────────────────

    /// Freeze the engine for a level load. Aborts any run. Returns `None`
    /// for `level < 1`.
    pub fn begin_load(&mut self, level: LevelNumber) -> Option<(LoadTicket, Vec<PathEvent>)> {
        if level < 1 {
            return None;
        }
        self.load_seq += 1;
        let ticket = LoadTicket { seq: self.load_seq, level };
        self.loading = Some(ticket);
        self.reset_run();
        log::info!("loading level {level}");
        Some((ticket, vec![PathEvent::LevelLoading { level }]))
    }

    /// Drop the in-flight load, if any, and unfreeze on the current level.
    /// The abandoned ticket's `finish_load` reports it superseded.
    pub fn abandon_load(&mut self) -> Option<LevelNumber> {
        let ticket = self.loading.take()?;
        log::info!("abandoned load of level {}", ticket.level);
        Some(ticket.level)
    }

    /// Swap in a loaded level, clear the queue, and unfreeze. A ticket that
    /// has been superseded by a newer `begin_load` changes nothing.
    pub fn finish_load(&mut self, ticket: LoadTicket, loaded: LoadedLevel) -> Vec<PathEvent> {
        if self.loading != Some(ticket) {
            log::debug!("discarding superseded load of level {}", ticket.level);
            return vec![PathEvent::LevelLoadSuperseded { level: ticket.level }];
        }

        self.level = loaded.level;
        self.provenance = loaded.provenance;
        self.message = loaded.message;
        self.level_number = ticket.level;
        self.queue.clear();
        self.refresh_ghost();
        self.reset_run();
        self.loading = None;

        log::info!(
            "level {} ready ({:?}, {}x{}, {} obstacles)",
            self.level_number,
            self.provenance,
            self.level.grid_size(),
            self.level.grid_size(),
            self.level.obstacles().len()
        );
        vec![PathEvent::LevelLoaded {
            level:      self.level_number,
            provenance: self.provenance,
            message:    self.message.clone(),
        }]
    }
}
