//! robo-runner: headless driver for the robot path puzzle.
//!
//! Usage:
//!   robo-runner --level 3 --commands RRDD --db progress.db
//!   robo-runner --ipc-mode --data-dir ./data
//!   robo-runner --offline --commands RRRDDD

use anyhow::{bail, Result};
use robopath_core::{
    clock::PlaybackSpeed,
    command::PlayerCommand,
    config::EngineConfig,
    event::PathEvent,
    generator::ProceduralLevelProvider,
    grid::{parse_commands, Position},
    loader::{LevelLoader, LevelProvider},
    run::RunOutcome,
    session::PuzzleSession,
    sink::SharedStore,
    snapshot::EngineSnapshot,
    store::GameStore,
    types::LevelNumber,
};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    GetState,
    Command { command: PlayerCommand },
    AwaitRun,
    Quit,
}

#[derive(serde::Serialize)]
struct IpcReply<'a> {
    applied: bool,
    state:   &'a EngineSnapshot,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let level: Option<LevelNumber> = flag_value(&args, "--level").and_then(|v| v.parse().ok());
    let commands = flag_value(&args, "--commands").unwrap_or("");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let ipc_mode = has_flag(&args, "--ipc-mode");
    let offline = has_flag(&args, "--offline");
    let fast = has_flag(&args, "--fast");

    let config = EngineConfig::load(data_dir)?;
    let store = GameStore::open(db)?;
    store.migrate()?;
    let shared = SharedStore::new(store);

    if !ipc_mode {
        println!("robo-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  provider:  {}", if offline { "offline" } else { "procedural" });
        println!();
    }

    let provider = ProceduralLevelProvider::new(config.generator_seed, config.max_grid_size);
    let loader = if offline {
        LevelLoader::offline(&config)
    } else {
        LevelLoader::new(provider, &config)
    };
    let session = PuzzleSession::start(
        loader,
        Arc::new(shared.clone()),
        Arc::new(shared.clone()),
        config,
    )
    .await;

    if let Some(level) = level {
        if !session.load_level(level).await {
            bail!("level {level} was refused");
        }
    }
    if fast {
        session.set_speed(PlaybackSpeed::Fast);
    }

    if ipc_mode {
        run_ipc_loop(&session).await?;
    } else {
        play_once(&session, commands).await?;
        print_summary(&session, &shared)?;
    }

    session.shutdown();
    Ok(())
}

async fn play_once<P: LevelProvider + 'static>(
    session: &PuzzleSession<P>,
    commands: &str,
) -> Result<()> {
    let Some(program) = parse_commands(commands) else {
        bail!("commands must use only U, D, L, R (got {commands:?})");
    };

    let before = session.snapshot();
    print_board(&before, before.level.start());
    if let Some(message) = &before.message {
        println!("  \"{message}\"");
    }
    println!();

    for cmd in program {
        session.add_command(cmd);
    }
    println!("  ghost lands on {}", session.snapshot().ghost);

    let mut events = session.subscribe();
    if !session.run() {
        println!("  nothing to run");
        return Ok(());
    }
    while let Ok(event) = events.recv().await {
        if let PathEvent::RobotMoved { step, command, to, .. } = &event {
            println!("  step {step:>2}: {command:?} -> {to}");
        }
        if event.ends_run() {
            break;
        }
    }
    Ok(())
}

async fn run_ipc_loop<P: LevelProvider + 'static>(session: &PuzzleSession<P>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: IpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("bad IPC request {line:?}: {e}");
                let err_json = serde_json::json!({ "error": e.to_string() });
                stdout.write_all(format!("{err_json}\n").as_bytes()).await?;
                stdout.flush().await?;
                continue;
            }
        };

        let applied = match request {
            IpcRequest::Quit => break,
            IpcRequest::GetState => false,
            IpcRequest::Command { command } => session.apply(command).await,
            IpcRequest::AwaitRun => {
                let mut events = session.subscribe();
                if session.outcome() == RunOutcome::Running {
                    while let Ok(event) = events.recv().await {
                        if event.ends_run() {
                            break;
                        }
                    }
                }
                false
            }
        };

        let state = session.snapshot();
        let reply = serde_json::to_string(&IpcReply { applied, state: &state })?;
        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn print_summary<P: LevelProvider + 'static>(
    session: &PuzzleSession<P>,
    shared: &SharedStore,
) -> Result<()> {
    let snap = session.snapshot();
    println!();
    print_board(&snap, snap.run.robot_pos);

    println!("=== RUN SUMMARY ===");
    println!("  level:      {} ({:?})", snap.level_number, snap.provenance);
    println!("  program:    {}", snap.queue.to_letters());
    if snap.run.outcome.is_terminal() {
        println!("  outcome:    {:?}", snap.run.outcome);
    } else {
        println!("  outcome:    unfinished ({:?})", snap.run.outcome);
    }
    if let Some(reason) = snap.run.failure {
        println!("  reason:     {reason:?}");
    }
    println!("  steps:      {}", snap.run.steps_taken());
    println!("  final pos:  {}", snap.run.robot_pos);

    let game_id = &session.config().game_id;
    let store = shared.lock()?;
    match store.score_summary(game_id)? {
        Some(score) => println!(
            "  best score: {} ({} plays, last {})",
            score.best_score,
            score.total_plays,
            score.last_played.format("%Y-%m-%d %H:%M")
        ),
        None => println!("  best score: (none yet)"),
    }
    Ok(())
}

/// R = robot, G = goal, # = obstacle, . = empty.
fn print_board(snap: &EngineSnapshot, robot: Position) {
    let size = snap.level.grid_size();
    for y in 0..size {
        let row: String = (0..size)
            .map(|x| {
                let cell = Position::new(x, y);
                if cell == robot {
                    'R'
                } else if cell == snap.level.goal() {
                    'G'
                } else if snap.level.is_obstacle(cell) {
                    '#'
                } else {
                    '.'
                }
            })
            .collect();
        println!("  {row}");
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
