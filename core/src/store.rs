//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The session reaches it through the `sink` traits, never through SQL.

use crate::{
    error::GameResult,
    run::{FailureReason, RunOutcome},
    types::{LevelNumber, RunId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

pub struct GameStore {
    conn: Connection,
}

/// Per-game score record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub game_id:     String,
    pub best_score:  u32,
    pub total_plays: u32,
    pub last_played: DateTime<Utc>,
}

/// One finished run in the run history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id:      RunId,
    pub level:       LevelNumber,
    pub outcome:     RunOutcome,
    pub failure:     Option<FailureReason>,
    pub steps:       u32,
    /// The queue in letter form, e.g. "RRD".
    pub commands:    String,
    pub finished_at: DateTime<Utc>,
}

impl GameStore {
    /// Open (or create) the game database at `path`.
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Progress ───────────────────────────────────────────────

    pub fn current_level(&self, key: &str) -> GameResult<Option<LevelNumber>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM progress WHERE key = ?1",
                params![key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        // A corrupt or non-positive value reads as "no progress".
        Ok(value.and_then(|v| LevelNumber::try_from(v).ok()).filter(|v| *v >= 1))
    }

    pub fn set_current_level(&self, key: &str, level: LevelNumber) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO progress (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at",
            params![key, level as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ── Scores ─────────────────────────────────────────────────

    /// Keep the best score, count the play, stamp the time.
    pub fn record_score(&self, game_id: &str, score: u32, at: DateTime<Utc>) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO score (game_id, best_score, total_plays, last_played)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(game_id) DO UPDATE SET
                 best_score  = MAX(best_score, excluded.best_score),
                 total_plays = total_plays + 1,
                 last_played = excluded.last_played",
            params![game_id, score as i64, at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn score_summary(&self, game_id: &str) -> GameResult<Option<ScoreSummary>> {
        let row = self
            .conn
            .query_row(
                "SELECT game_id, best_score, total_plays, last_played
                 FROM score WHERE game_id = ?1",
                params![game_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(game_id, best, plays, last)| -> GameResult<ScoreSummary> {
            Ok(ScoreSummary {
                game_id,
                best_score:  best as u32,
                total_plays: plays as u32,
                last_played: parse_time(&last)?,
            })
        })
        .transpose()
    }

    // ── Run history ────────────────────────────────────────────

    pub fn append_run(&self, record: &RunRecord) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO run_history
                 (run_id, level, outcome, failure, steps, commands, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.run_id,
                record.level as i64,
                record.outcome.as_str(),
                record.failure.map(FailureReason::as_str),
                record.steps as i64,
                record.commands,
                record.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn runs_for_level(&self, level: LevelNumber) -> GameResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, level, outcome, failure, steps, commands, finished_at
             FROM run_history WHERE level = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![level as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(run_id, level, outcome, failure, steps, commands, finished_at)| -> GameResult<RunRecord> {
                Ok(RunRecord {
                    run_id,
                    level: level as LevelNumber,
                    outcome: serde_json::from_value(serde_json::Value::String(outcome))?,
                    failure: failure
                        .map(|f| serde_json::from_value(serde_json::Value::String(f)))
                        .transpose()?,
                    steps: steps as u32,
                    commands,
                    finished_at: parse_time(&finished_at)?,
                })
            })
            .collect()
    }
}

fn parse_time(s: &str) -> GameResult<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .map_err(|e| anyhow::anyhow!("bad timestamp {s:?}: {e}"))?;
    Ok(parsed.with_timezone(&Utc))
}
