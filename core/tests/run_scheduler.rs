//! Run scheduler tests: the engine state machine, driven tick by tick.

use robopath_core::{
    clock::PlaybackClock,
    engine::PathEngine,
    event::PathEvent,
    grid::{Direction, Position},
    level::{Level, Provenance},
    loader::LoadedLevel,
    rng::LevelRng,
    run::{FailureReason, RunOutcome},
};
use Direction::*;

fn loaded(level: Level) -> LoadedLevel {
    LoadedLevel { level, message: None, provenance: Provenance::Generated }
}

fn engine_for(level: Level) -> PathEngine {
    PathEngine::new(loaded(level), 1, PlaybackClock::new(0, 1))
}

fn open_4x4(goal: Position) -> Level {
    Level::new(4, Position::new(0, 0), goal, []).unwrap()
}

fn queue(engine: &mut PathEngine, commands: &[Direction]) {
    for cmd in commands {
        assert!(!engine.add_command(*cmd).is_empty(), "edit refused");
    }
}

/// Scenario A: straight line onto the goal wins.
#[test]
fn straight_path_to_goal_wins() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    queue(&mut engine, &[Right, Right, Right]);

    assert!(!engine.run().is_empty());
    let events = engine.run_to_end();

    assert_eq!(engine.outcome(), RunOutcome::Won);
    assert_eq!(engine.run_state().robot_pos, Position::new(3, 0));
    assert_eq!(engine.run_state().cursor, Some(2));
    assert_eq!(
        events.last(),
        Some(&PathEvent::RunWon { level: 1, steps: 3, position: Position::new(3, 0) })
    );
}

/// Scenario B: the robot moves onto the obstacle, then the run fails there.
#[test]
fn obstacle_stops_the_run_on_the_obstacle_cell() {
    let level =
        Level::new(4, Position::new(0, 0), Position::new(3, 0), [Position::new(2, 0)]).unwrap();
    let mut engine = engine_for(level);
    queue(&mut engine, &[Right, Right, Right]);
    engine.run();
    let epoch = engine.epoch();

    let first = engine.tick(epoch);
    assert!(matches!(first[..], [PathEvent::RobotMoved { step: 0, .. }]));
    assert_eq!(engine.outcome(), RunOutcome::Running);

    let second = engine.tick(epoch);
    assert_eq!(second.len(), 2);
    assert_eq!(
        second[1],
        PathEvent::RunFailed {
            level:    1,
            reason:   FailureReason::HitObstacle,
            steps:    2,
            position: Position::new(2, 0),
        }
    );
    assert_eq!(engine.outcome(), RunOutcome::Failed);
    assert_eq!(engine.run_state().robot_pos, Position::new(2, 0));
    assert_eq!(engine.run_state().cursor, Some(1));

    // Frozen: further ticks do nothing.
    assert!(engine.tick(epoch).is_empty());
    assert_eq!(engine.run_state().cursor, Some(1));
}

/// Scenario C: passing over the goal mid-queue is not a win.
#[test]
fn passing_through_the_goal_then_leaving_fails() {
    let mut engine = engine_for(open_4x4(Position::new(1, 1)));
    queue(&mut engine, &[Right, Down, Right]);
    engine.run();
    let events = engine.run_to_end();

    assert_eq!(engine.outcome(), RunOutcome::Failed);
    assert_eq!(engine.run_state().failure, Some(FailureReason::MissedGoal));
    assert_eq!(engine.run_state().robot_pos, Position::new(2, 1));
    assert!(events.iter().any(|e| matches!(
        e,
        PathEvent::RobotMoved { to, .. } if *to == Position::new(1, 1)
    )));
}

/// Scenario D: an empty queue cannot be run.
#[test]
fn empty_queue_cannot_run() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    assert!(engine.run().is_empty());
    assert_eq!(engine.outcome(), RunOutcome::Idle);
    assert_eq!(engine.run_state().cursor, None);
}

#[test]
fn reaching_the_goal_early_still_runs_the_whole_queue() {
    let mut engine = engine_for(open_4x4(Position::new(1, 0)));
    queue(&mut engine, &[Right, Left, Right]);
    engine.run();
    let moves = engine
        .run_to_end()
        .iter()
        .filter(|e| matches!(e, PathEvent::RobotMoved { .. }))
        .count();
    assert_eq!(moves, 3);
    assert_eq!(engine.outcome(), RunOutcome::Won);
}

#[test]
fn win_is_decided_one_tick_after_the_last_move() {
    let mut engine = engine_for(open_4x4(Position::new(1, 0)));
    queue(&mut engine, &[Right]);
    engine.run();
    let epoch = engine.epoch();

    engine.tick(epoch);
    assert_eq!(engine.outcome(), RunOutcome::Running);
    assert_eq!(engine.run_state().robot_pos, Position::new(1, 0));

    engine.tick(epoch);
    assert_eq!(engine.outcome(), RunOutcome::Won);
}

#[test]
fn robot_never_leaves_the_grid() {
    for seed in 0..20u64 {
        let mut rng = LevelRng::for_level(seed, 1);
        let mut engine = engine_for(open_4x4(Position::new(3, 3)));
        for _ in 0..30 {
            engine.add_command(*rng.pick(&Direction::ALL));
        }
        engine.run();
        let epoch = engine.epoch();
        while engine.outcome() == RunOutcome::Running {
            engine.tick(epoch);
            let pos = engine.run_state().robot_pos;
            assert!(pos.x <= 3 && pos.y <= 3, "seed {seed} left the grid at {pos}");
        }
    }
}

#[test]
fn edits_are_refused_while_running() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    queue(&mut engine, &[Right, Right, Right]);
    engine.run();

    assert!(engine.add_command(Down).is_empty());
    assert!(engine.remove_command(0).is_empty());
    assert_eq!(engine.queue().len(), 3);
    assert_eq!(engine.ghost_position(), Position::new(3, 0));
}

#[test]
fn removing_a_missing_index_is_a_no_op() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    queue(&mut engine, &[Right]);
    assert!(engine.remove_command(9).is_empty());
    assert_eq!(engine.queue().len(), 1);
}

#[test]
fn ghost_follows_every_edit() {
    let level =
        Level::new(4, Position::new(0, 0), Position::new(3, 0), [Position::new(1, 0)]).unwrap();
    let mut engine = engine_for(level);
    assert_eq!(engine.ghost_position(), Position::new(0, 0));

    queue(&mut engine, &[Right, Right, Down]);
    assert_eq!(engine.ghost_position(), Position::new(2, 1));

    engine.remove_command(2);
    assert_eq!(engine.ghost_position(), Position::new(2, 0));

    engine.clear();
    assert_eq!(engine.ghost_position(), Position::new(0, 0));
}

#[test]
fn stale_epoch_ticks_are_ignored() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    queue(&mut engine, &[Right, Right, Right]);
    engine.run();
    let old_epoch = engine.epoch();
    engine.replay();
    engine.run();

    assert!(engine.tick(old_epoch).is_empty());
    assert_eq!(engine.run_state().cursor, None);
    assert!(!engine.tick(engine.epoch()).is_empty());
    assert_eq!(engine.run_state().cursor, Some(0));
}

#[test]
fn terminal_states_hold_until_replay() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    queue(&mut engine, &[Right]);
    engine.run();
    engine.run_to_end();
    assert_eq!(engine.outcome(), RunOutcome::Failed);

    assert!(engine.outcome().is_terminal());
    assert!(engine.run().is_empty());
    assert_eq!(engine.outcome(), RunOutcome::Failed);

    engine.replay();
    assert_eq!(engine.outcome(), RunOutcome::Idle);
    assert_eq!(engine.run_state().robot_pos, Position::new(0, 0));
    assert_eq!(engine.queue().len(), 1);
}

#[test]
fn clear_aborts_a_run_and_returns_to_start() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    queue(&mut engine, &[Right, Right]);
    engine.run();
    engine.tick(engine.epoch());

    engine.clear();
    assert!(engine.queue().is_empty());
    assert_eq!(engine.outcome(), RunOutcome::Idle);
    assert_eq!(engine.run_state().robot_pos, Position::new(0, 0));
}

#[test]
fn stop_only_applies_to_a_running_program() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    assert!(engine.stop().is_empty());

    queue(&mut engine, &[Right, Right]);
    engine.run();
    engine.tick(engine.epoch());
    assert_eq!(engine.stop(), vec![PathEvent::RunReset { level: 1 }]);
    assert_eq!(engine.outcome(), RunOutcome::Idle);
}

#[test]
fn level_load_freezes_input_and_swaps_atomically() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    queue(&mut engine, &[Right, Right]);

    let (ticket, _) = engine.begin_load(2).unwrap();
    assert!(engine.is_loading());
    assert!(engine.add_command(Down).is_empty());
    assert!(engine.run().is_empty());

    let next = Level::new(5, Position::new(4, 4), Position::new(0, 0), []).unwrap();
    let events = engine.finish_load(ticket, loaded(next.clone()));
    assert!(matches!(events[..], [PathEvent::LevelLoaded { level: 2, .. }]));
    assert!(!engine.is_loading());
    assert_eq!(engine.level(), &next);
    assert_eq!(engine.level_number(), 2);
    assert!(engine.queue().is_empty());
    assert_eq!(engine.run_state().robot_pos, Position::new(4, 4));
    assert_eq!(engine.ghost_position(), Position::new(4, 4));
}

#[test]
fn superseded_load_is_discarded() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    let (older, _) = engine.begin_load(2).unwrap();
    let (newer, _) = engine.begin_load(3).unwrap();

    let late = Level::new(6, Position::new(0, 0), Position::new(5, 5), []).unwrap();
    let events = engine.finish_load(older, loaded(late));
    assert_eq!(events, vec![PathEvent::LevelLoadSuperseded { level: 2 }]);
    assert!(engine.is_loading());

    let current = Level::new(5, Position::new(0, 0), Position::new(4, 4), []).unwrap();
    engine.finish_load(newer, loaded(current));
    assert_eq!(engine.level_number(), 3);
    assert_eq!(engine.level().grid_size(), 5);
}

#[test]
fn abandoned_load_is_never_applied() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    let (ticket, _) = engine.begin_load(2).unwrap();

    assert_eq!(engine.abandon_load(), Some(2));
    assert!(!engine.is_loading());
    assert!(!engine.add_command(Right).is_empty());

    let late = Level::new(5, Position::new(0, 0), Position::new(4, 4), []).unwrap();
    let events = engine.finish_load(ticket, loaded(late));
    assert_eq!(events, vec![PathEvent::LevelLoadSuperseded { level: 2 }]);
    assert_eq!(engine.level_number(), 1);
    assert_eq!(engine.level().grid_size(), 4);
    assert_eq!(engine.queue().len(), 1);
    assert_eq!(engine.abandon_load(), None);
}

#[test]
fn level_zero_is_refused() {
    let mut engine = engine_for(open_4x4(Position::new(3, 0)));
    assert!(engine.begin_load(0).is_none());
    assert!(!engine.is_loading());
}

#[test]
fn snapshot_reports_idle_cursor_as_minus_one() {
    let engine = engine_for(open_4x4(Position::new(3, 0)));
    let json = serde_json::to_value(engine.snapshot()).unwrap();
    assert_eq!(json["run"]["cursor"], -1);
    assert_eq!(json["run"]["outcome"], "idle");
    assert_eq!(json["is_loading"], false);
}
