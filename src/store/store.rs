// src/store/store.rs — SQLite operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::core::types::{
    CounterProfile, ProfileDials, RankedWin, Role, Scorecard, Session, SessionStatus, SubScores,
    SweepRecord, SweepStatus, Turn,
};
use crate::store::schema;

/// Low-level SQLite operations for all record types.
pub struct Store {
    conn: Connection,
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        schema::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // -- Sessions --

    /// Persist a terminal session with its turns and scorecard, in one
    /// transaction. Sessions are written exactly once, never updated.
    pub fn insert_session(&self, session: &Session) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let card = session.scorecard.as_ref();
        let sub_scores_json = card
            .map(|c| serde_json::to_string(&c.sub_scores))
            .transpose()?;

        tx.execute(
            "INSERT INTO sessions (id, profile_id, sweep_id, status, input_tokens,
             output_tokens, cost_usd, composite_score, sub_scores, contract_signed,
             price_variance, rationale, winning_excerpt, scoring_failed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                session.id,
                session.profile_id,
                session.sweep_id,
                session.status.as_str(),
                session.input_tokens as i64,
                session.output_tokens as i64,
                session.cost_usd,
                card.map(|c| c.composite),
                sub_scores_json,
                card.map(|c| c.contract_signed),
                card.map(|c| c.price_variance),
                card.map(|c| c.rationale.as_str()),
                card.and_then(|c| c.winning_excerpt.as_deref()),
                card.map(|c| c.scoring_failed).unwrap_or(false),
                session.created_at.to_rfc3339(),
            ],
        )?;

        for (seq, turn) in session.turns.iter().enumerate() {
            tx.execute(
                "INSERT INTO turns (session_id, seq, speaker, text) VALUES (?1, ?2, ?3, ?4)",
                params![session.id, seq as i64, turn.speaker.label(), turn.text],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn get_session(&self, id: &str) -> anyhow::Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, profile_id, sweep_id, status, input_tokens, output_tokens,
                 cost_usd, composite_score, sub_scores, contract_signed, price_variance,
                 rationale, winning_excerpt, scoring_failed, created_at
                 FROM sessions WHERE id = ?1",
                params![id],
                row_to_session,
            )
            .optional()?;

        match session {
            Some(mut s) => {
                s.turns = self.turns_for(&s.id)?;
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    /// All sessions produced under one sweep, oldest first. Aborted sessions
    /// are included; callers filter by status where it matters.
    pub fn sessions_for_sweep(&self, sweep_id: &str) -> anyhow::Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, profile_id, sweep_id, status, input_tokens, output_tokens,
             cost_usd, composite_score, sub_scores, contract_signed, price_variance,
             rationale, winning_excerpt, scoring_failed, created_at
             FROM sessions WHERE sweep_id = ?1 ORDER BY created_at, id",
        )?;

        let rows = stmt.query_map(params![sweep_id], row_to_session)?;

        let mut result = Vec::new();
        for row in rows {
            let mut session = row?;
            session.turns = self.turns_for(&session.id)?;
            result.push(session);
        }
        Ok(result)
    }

    pub fn count_sessions(&self) -> anyhow::Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Total spend across every session of a sweep, aborted ones included.
    pub fn sweep_cost(&self, sweep_id: &str) -> anyhow::Result<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(cost_usd), 0) FROM sessions WHERE sweep_id = ?1",
            params![sweep_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn turns_for(&self, session_id: &str) -> anyhow::Result<Vec<Turn>> {
        let mut stmt = self
            .conn
            .prepare("SELECT speaker, text FROM turns WHERE session_id = ?1 ORDER BY seq")?;

        let rows = stmt.query_map(params![session_id], |row| {
            let speaker: String = row.get(0)?;
            Ok(Turn {
                speaker: Role::parse(&speaker).unwrap_or(Role::Scripted),
                text: row.get(1)?,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // -- Cost ledger --

    /// Append one spend record. Entries are never updated or deleted.
    pub fn insert_ledger_entry(
        &self,
        id: &str,
        amount_usd: f64,
        attribution: &str,
        day: &str,
    ) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO ledger_entries (id, amount_usd, attribution, day, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, amount_usd, attribution, day, now],
        )?;
        Ok(())
    }

    /// Fold of all entries with the given day bucket.
    pub fn ledger_day_total(&self, day: &str) -> anyhow::Result<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(amount_usd), 0) FROM ledger_entries WHERE day = ?1",
            params![day],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn count_ledger_entries(&self) -> anyhow::Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM ledger_entries", [], |row| row.get(0))?;
        Ok(count)
    }

    // -- Sweeps --

    pub fn insert_sweep(&self, sweep: &SweepRecord) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO sweeps (id, target_total, batch_size, completed, status,
             halt_reason, ranked_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                sweep.id,
                sweep.target_total,
                sweep.batch_size,
                sweep.completed,
                sweep.status.as_str(),
                sweep.halt_reason,
                sweep.ranked_at.map(|t| t.to_rfc3339()),
                sweep.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn update_sweep_status(
        &self,
        id: &str,
        status: SweepStatus,
        halt_reason: Option<&str>,
    ) -> anyhow::Result<()> {
        self.conn.execute(
            "UPDATE sweeps SET status = ?1, halt_reason = ?2 WHERE id = ?3",
            params![status.as_str(), halt_reason, id],
        )?;
        Ok(())
    }

    /// Compare-and-advance: the counter only ever moves forward, so a stale
    /// writer can never regress an observer's view of progress.
    pub fn advance_sweep_progress(&self, id: &str, completed: u32) -> anyhow::Result<()> {
        self.conn.execute(
            "UPDATE sweeps SET completed = ?1 WHERE id = ?2 AND completed < ?1",
            params![completed, id],
        )?;
        Ok(())
    }

    pub fn mark_sweep_ranked(&self, id: &str) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sweeps SET ranked_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        Ok(())
    }

    pub fn get_sweep(&self, id: &str) -> anyhow::Result<Option<SweepRecord>> {
        let sweep = self
            .conn
            .query_row(
                "SELECT id, target_total, batch_size, completed, status, halt_reason,
                 ranked_at, created_at
                 FROM sweeps WHERE id = ?1",
                params![id],
                row_to_sweep,
            )
            .optional()?;
        Ok(sweep)
    }

    pub fn recent_sweeps(&self, limit: u32) -> anyhow::Result<Vec<SweepRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, target_total, batch_size, completed, status, halt_reason,
             ranked_at, created_at
             FROM sweeps ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], row_to_sweep)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // -- Ranked wins --

    pub fn insert_ranked_win(&self, win: &RankedWin) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO ranked_wins (id, sweep_id, session_id, rank, rationale, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                win.id,
                win.sweep_id,
                win.session_id,
                win.rank,
                win.rationale,
                win.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn ranked_wins_for_sweep(&self, sweep_id: &str) -> anyhow::Result<Vec<RankedWin>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sweep_id, session_id, rank, rationale, created_at
             FROM ranked_wins WHERE sweep_id = ?1 ORDER BY rank",
        )?;

        let rows = stmt.query_map(params![sweep_id], |row| {
            let created_at: String = row.get(5)?;
            Ok(RankedWin {
                id: row.get(0)?,
                sweep_id: row.get(1)?,
                session_id: row.get(2)?,
                rank: row.get(3)?,
                rationale: row.get(4)?,
                created_at: parse_ts(&created_at),
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // -- Counter profiles --

    pub fn insert_profile(&self, profile: &CounterProfile) -> anyhow::Result<()> {
        let dials = serde_json::to_string(&profile.dials)?;
        self.conn.execute(
            "INSERT INTO counter_profiles (id, name, instructions, dials, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.id,
                profile.name,
                profile.instructions,
                dials,
                profile.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, id: &str) -> anyhow::Result<Option<CounterProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, name, instructions, dials, created_at
                 FROM counter_profiles WHERE id = ?1",
                params![id],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn get_profile_by_name(&self, name: &str) -> anyhow::Result<Option<CounterProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, name, instructions, dials, created_at
                 FROM counter_profiles WHERE name = ?1",
                params![name],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn list_profiles(&self) -> anyhow::Result<Vec<CounterProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, instructions, dials, created_at
             FROM counter_profiles ORDER BY name",
        )?;

        let rows = stmt.query_map([], row_to_profile)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn count_profiles(&self) -> anyhow::Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM counter_profiles", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let status: String = row.get(3)?;
    let composite: Option<f64> = row.get(7)?;
    let created_at: String = row.get(14)?;

    let scorecard = match composite {
        Some(composite) => {
            let sub_scores: Option<String> = row.get(8)?;
            let rationale: Option<String> = row.get(11)?;
            Some(Scorecard {
                sub_scores: sub_scores
                    .and_then(|s| serde_json::from_str::<SubScores>(&s).ok())
                    .unwrap_or_else(SubScores::zero),
                composite,
                contract_signed: row.get::<_, Option<bool>>(9)?.unwrap_or(false),
                price_variance: row.get::<_, Option<f64>>(10)?.unwrap_or(0.0),
                rationale: rationale.unwrap_or_default(),
                winning_excerpt: row.get(12)?,
                scoring_failed: row.get(13)?,
            })
        }
        None => None,
    };

    Ok(Session {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        sweep_id: row.get(2)?,
        turns: Vec::new(),
        input_tokens: row.get::<_, i64>(4)? as u64,
        output_tokens: row.get::<_, i64>(5)? as u64,
        cost_usd: row.get(6)?,
        status: SessionStatus::parse(&status).unwrap_or(SessionStatus::AbortedError),
        scorecard,
        created_at: parse_ts(&created_at),
    })
}

fn row_to_sweep(row: &rusqlite::Row<'_>) -> rusqlite::Result<SweepRecord> {
    let status: String = row.get(4)?;
    let ranked_at: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(SweepRecord {
        id: row.get(0)?,
        target_total: row.get(1)?,
        batch_size: row.get(2)?,
        completed: row.get(3)?,
        status: SweepStatus::parse(&status).unwrap_or(SweepStatus::Failed),
        halt_reason: row.get(5)?,
        ranked_at: ranked_at.map(|s| parse_ts(&s)),
        created_at: parse_ts(&created_at),
    })
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<CounterProfile> {
    let dials: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(CounterProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        instructions: row.get(2)?,
        dials: serde_json::from_str::<ProfileDials>(&dials).unwrap_or_default(),
        created_at: parse_ts(&created_at),
    })
}
