//! SQLite-backed garden store.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::{CommitReceipt, GardenStore, IdeaQuery, IdeaWrite, WriteBatch};
use crate::error::{GardenError, GardenResult};
use crate::types::{
    AchievementUnlock, Idea, IdeaId, ProgressDelta, RefinementLogEntry, Section, UserProfile,
};

const IDEA_COLUMNS: &str = "id, user_id, title, origin, refinements, status, section, author, \
     merged_into, revision, created_at, updated_at, finalized_at";

const PROFILE_COLUMNS: &str = "user_id, xp, level, current_streak, longest_streak, last_visit, \
     ideas_created, refinements, finalized, discarded, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed implementation of [`GardenStore`].
pub struct SqliteGardenStore {
    conn: Mutex<Connection>,
}

impl SqliteGardenStore {
    /// Open (or create) a store at the given path.
    pub fn new(path: impl AsRef<Path>) -> GardenResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> GardenResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> GardenResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GardenError::database(e.to_string()))
    }

    fn init_schema(&self) -> GardenResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS ideas (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                origin TEXT NOT NULL,
                refinements INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                section TEXT NOT NULL,
                author TEXT NOT NULL,
                merged_into TEXT,
                revision INTEGER NOT NULL DEFAULT 0,
                write_seq INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                finalized_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_ideas_user_section
                ON ideas(user_id, section, updated_at DESC);

            CREATE TABLE IF NOT EXISTS refinement_logs (
                id TEXT PRIMARY KEY,
                idea_id TEXT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                author TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_logs_idea
                ON refinement_logs(idea_id, created_at DESC);

            CREATE TABLE IF NOT EXISTS user_profiles (
                user_id TEXT PRIMARY KEY,
                xp INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 1,
                current_streak INTEGER NOT NULL DEFAULT 0,
                longest_streak INTEGER NOT NULL DEFAULT 0,
                last_visit TEXT,
                ideas_created INTEGER NOT NULL DEFAULT 0,
                refinements INTEGER NOT NULL DEFAULT 0,
                finalized INTEGER NOT NULL DEFAULT 0,
                discarded INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS achievement_unlocks (
                user_id TEXT NOT NULL,
                achievement_key TEXT NOT NULL,
                unlocked_at TEXT NOT NULL,
                PRIMARY KEY (user_id, achievement_key)
            );
        "#,
        )?;
        Ok(())
    }

    fn row_to_idea(row: &rusqlite::Row<'_>) -> GardenResult<Idea> {
        let id: String = row.get(0)?;
        let status: String = row.get(5)?;
        let section: String = row.get(6)?;
        let author: String = row.get(7)?;
        let merged_into: Option<String> = row.get(8)?;
        let revision: i64 = row.get(9)?;
        let created_at: String = row.get(10)?;
        let updated_at: String = row.get(11)?;
        let finalized_at: Option<String> = row.get(12)?;

        Ok(Idea {
            id: parse_uuid(&id)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            origin: row.get(3)?,
            refinements: row.get(4)?,
            status: parse_enum(&status)?,
            section: parse_enum(&section)?,
            author: parse_enum(&author)?,
            merged_into: merged_into.as_deref().map(parse_uuid).transpose()?,
            revision: revision as u64,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            finalized_at: finalized_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    fn row_to_log(row: &rusqlite::Row<'_>) -> GardenResult<RefinementLogEntry> {
        let id: String = row.get(0)?;
        let idea_id: String = row.get(1)?;
        let author: String = row.get(3)?;
        let kind: String = row.get(4)?;
        let created_at: String = row.get(5)?;

        Ok(RefinementLogEntry {
            id: parse_uuid(&id)?,
            idea_id: parse_uuid(&idea_id)?,
            content: row.get(2)?,
            author: parse_enum(&author)?,
            kind: parse_enum(&kind)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_profile(row: &rusqlite::Row<'_>) -> GardenResult<UserProfile> {
        let xp: i64 = row.get(1)?;
        let last_visit: Option<String> = row.get(5)?;
        let ideas_created: i64 = row.get(6)?;
        let refinements: i64 = row.get(7)?;
        let finalized: i64 = row.get(8)?;
        let discarded: i64 = row.get(9)?;
        let created_at: String = row.get(10)?;
        let updated_at: String = row.get(11)?;

        Ok(UserProfile {
            user_id: row.get(0)?,
            xp: xp as u64,
            level: row.get(2)?,
            current_streak: row.get(3)?,
            longest_streak: row.get(4)?,
            last_visit: last_visit
                .as_deref()
                .map(|d| {
                    NaiveDate::parse_from_str(d, DATE_FORMAT)
                        .map_err(|e| GardenError::parse(e.to_string()))
                })
                .transpose()?,
            ideas_created: ideas_created as u64,
            refinements: refinements as u64,
            finalized: finalized as u64,
            discarded: discarded as u64,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    fn select_profile(conn: &Connection, user_id: &str) -> GardenResult<Option<UserProfile>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM user_profiles WHERE user_id = ?1",
            PROFILE_COLUMNS
        ))?;

        stmt.query_row(params![user_id], |row| Ok(Self::row_to_profile(row)))
            .optional()?
            .transpose()
    }

    fn upsert_profile(conn: &Connection, profile: &UserProfile) -> GardenResult<()> {
        conn.execute(
            r#"INSERT INTO user_profiles
               (user_id, xp, level, current_streak, longest_streak, last_visit,
                ideas_created, refinements, finalized, discarded, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
               ON CONFLICT(user_id) DO UPDATE SET
                xp = excluded.xp,
                level = excluded.level,
                current_streak = excluded.current_streak,
                longest_streak = excluded.longest_streak,
                last_visit = excluded.last_visit,
                ideas_created = excluded.ideas_created,
                refinements = excluded.refinements,
                finalized = excluded.finalized,
                discarded = excluded.discarded,
                updated_at = excluded.updated_at"#,
            params![
                profile.user_id,
                profile.xp as i64,
                profile.level,
                profile.current_streak,
                profile.longest_streak,
                profile.last_visit.map(|d| d.format(DATE_FORMAT).to_string()),
                profile.ideas_created as i64,
                profile.refinements as i64,
                profile.finalized as i64,
                profile.discarded as i64,
                format_timestamp(&profile.created_at),
                format_timestamp(&profile.updated_at),
            ],
        )?;
        Ok(())
    }

    fn insert_idea(conn: &Connection, idea: &Idea, write_seq: i64) -> GardenResult<()> {
        conn.execute(
            r#"INSERT INTO ideas
               (id, user_id, title, origin, refinements, status, section, author,
                merged_into, revision, write_seq, created_at, updated_at, finalized_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
            params![
                idea.id.to_string(),
                idea.user_id,
                idea.title,
                idea.origin,
                idea.refinements,
                idea.status.to_string(),
                idea.section.to_string(),
                idea.author.to_string(),
                idea.merged_into.map(|id| id.to_string()),
                idea.revision as i64,
                write_seq,
                format_timestamp(&idea.created_at),
                format_timestamp(&idea.updated_at),
                idea.finalized_at.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(())
    }

    /// Returns the number of rows changed: 0 means the revision check failed.
    fn update_idea(
        conn: &Connection,
        idea: &Idea,
        expected_revision: u64,
        write_seq: i64,
    ) -> GardenResult<usize> {
        let changed = conn.execute(
            r#"UPDATE ideas SET
                title = ?1, origin = ?2, refinements = ?3, status = ?4, section = ?5,
                merged_into = ?6, revision = ?7, write_seq = ?8, updated_at = ?9,
                finalized_at = ?10
               WHERE id = ?11 AND user_id = ?12 AND revision = ?13"#,
            params![
                idea.title,
                idea.origin,
                idea.refinements,
                idea.status.to_string(),
                idea.section.to_string(),
                idea.merged_into.map(|id| id.to_string()),
                (expected_revision + 1) as i64,
                write_seq,
                format_timestamp(&idea.updated_at),
                idea.finalized_at.as_ref().map(format_timestamp),
                idea.id.to_string(),
                idea.user_id,
                expected_revision as i64,
            ],
        )?;
        Ok(changed)
    }

    /// Read-modify-write a profile inside the caller's transaction.
    fn bump_profile(
        conn: &Connection,
        user_id: &str,
        delta: &ProgressDelta,
    ) -> GardenResult<UserProfile> {
        let mut profile =
            Self::select_profile(conn, user_id)?.unwrap_or_else(|| UserProfile::new(user_id));
        profile.apply(delta);
        Self::upsert_profile(conn, &profile)?;
        Ok(profile)
    }

    /// Delete archived ideas past `capacity`, newest kept. Logs cascade.
    fn trim_archive(conn: &Connection, user_id: &str, capacity: usize) -> GardenResult<Vec<IdeaId>> {
        let mut stmt = conn.prepare(
            r#"SELECT id FROM ideas
               WHERE user_id = ?1 AND section = ?2
               ORDER BY updated_at DESC, write_seq DESC
               LIMIT -1 OFFSET ?3"#,
        )?;
        let overflow = stmt
            .query_map(
                params![user_id, Section::Archive.to_string(), capacity as i64],
                |row| row.get::<_, String>(0),
            )?
            .map(|r| r.map_err(GardenError::from).and_then(|id| parse_uuid(&id)))
            .collect::<GardenResult<Vec<IdeaId>>>()?;

        for id in &overflow {
            conn.execute(
                "DELETE FROM ideas WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id],
            )?;
        }
        Ok(overflow)
    }

    fn insert_log(conn: &Connection, entry: &RefinementLogEntry) -> GardenResult<()> {
        conn.execute(
            r#"INSERT INTO refinement_logs (id, idea_id, content, author, kind, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                entry.id.to_string(),
                entry.idea_id.to_string(),
                entry.content,
                entry.author.to_string(),
                entry.kind.to_string(),
                format_timestamp(&entry.created_at),
            ],
        )?;
        Ok(())
    }
}

impl GardenStore for SqliteGardenStore {
    fn get_idea(&self, user_id: &str, id: &IdeaId) -> GardenResult<Option<Idea>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ideas WHERE id = ?1 AND user_id = ?2",
            IDEA_COLUMNS
        ))?;

        stmt.query_row(params![id.to_string(), user_id], |row| {
            Ok(Self::row_to_idea(row))
        })
        .optional()?
        .transpose()
    }

    fn find_idea_by_title(&self, user_id: &str, title: &str) -> GardenResult<Option<Idea>> {
        // SQLite's lower() only folds ASCII, so compare on this side.
        let wanted = title.trim().to_lowercase();
        let ideas = self.list_ideas(user_id, &IdeaQuery::default())?;
        Ok(ideas
            .into_iter()
            .find(|idea| idea.title.to_lowercase() == wanted))
    }

    fn list_ideas(&self, user_id: &str, query: &IdeaQuery) -> GardenResult<Vec<Idea>> {
        let mut sql = format!("SELECT {} FROM ideas WHERE user_id = ?1", IDEA_COLUMNS);
        let mut values: Vec<String> = vec![user_id.to_string()];

        if let Some(status) = query.status {
            values.push(status.to_string());
            sql.push_str(&format!(" AND status = ?{}", values.len()));
        }
        if let Some(section) = query.section {
            values.push(section.to_string());
            sql.push_str(&format!(" AND section = ?{}", values.len()));
        }
        sql.push_str(" ORDER BY updated_at DESC, write_seq DESC");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let results = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(Self::row_to_idea(row))
        })?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }

    fn list_logs(&self, idea_id: &IdeaId) -> GardenResult<Vec<RefinementLogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, idea_id, content, author, kind, created_at
               FROM refinement_logs
               WHERE idea_id = ?1
               ORDER BY created_at DESC, rowid DESC"#,
        )?;

        let results = stmt.query_map(params![idea_id.to_string()], |row| {
            Ok(Self::row_to_log(row))
        })?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }

    fn commit(&self, batch: WriteBatch) -> GardenResult<CommitReceipt> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut write_seq: i64 =
            tx.query_row("SELECT COALESCE(MAX(write_seq), 0) FROM ideas", [], |row| {
                row.get(0)
            })?;
        let mut written = Vec::with_capacity(batch.writes.len());

        for write in batch.writes {
            write_seq += 1;
            match write {
                IdeaWrite::Insert(idea) => {
                    Self::insert_idea(&tx, &idea, write_seq)?;
                    written.push(idea);
                }
                IdeaWrite::Update {
                    mut idea,
                    expected_revision,
                } => {
                    if Self::update_idea(&tx, &idea, expected_revision, write_seq)? == 0 {
                        // Dropping the transaction rolls back earlier writes.
                        return Err(GardenError::conflict(idea.id));
                    }
                    idea.revision = expected_revision + 1;
                    written.push(idea);
                }
            }
        }

        for entry in &batch.logs {
            Self::insert_log(&tx, entry)?;
        }

        let evicted = match &batch.archive_bound {
            Some(bound) => Self::trim_archive(&tx, &bound.user_id, bound.capacity)?,
            None => Vec::new(),
        };

        let profile = match &batch.progress {
            Some(change) if !change.delta.is_empty() => {
                Some(Self::bump_profile(&tx, &change.user_id, &change.delta)?)
            }
            _ => None,
        };

        tx.commit()?;
        debug!(
            ideas = written.len(),
            logs = batch.logs.len(),
            evicted = evicted.len(),
            progress = profile.is_some(),
            "Committed write batch"
        );
        Ok(CommitReceipt {
            ideas: written,
            evicted,
            profile,
        })
    }

    fn load_profile(&self, user_id: &str) -> GardenResult<UserProfile> {
        let conn = self.lock()?;
        if let Some(profile) = Self::select_profile(&conn, user_id)? {
            return Ok(profile);
        }
        let profile = UserProfile::new(user_id);
        Self::upsert_profile(&conn, &profile)?;
        Ok(profile)
    }

    fn apply_progress(&self, user_id: &str, delta: &ProgressDelta) -> GardenResult<UserProfile> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let profile = Self::bump_profile(&tx, user_id, delta)?;
        tx.commit()?;
        Ok(profile)
    }

    fn record_unlock(
        &self,
        unlock: &AchievementUnlock,
        xp_reward: u64,
    ) -> GardenResult<Option<UserProfile>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            r#"INSERT OR IGNORE INTO achievement_unlocks (user_id, achievement_key, unlocked_at)
               VALUES (?1, ?2, ?3)"#,
            params![
                unlock.user_id,
                unlock.achievement_key,
                format_timestamp(&unlock.unlocked_at),
            ],
        )?;
        if inserted == 0 {
            return Ok(None);
        }

        let profile = Self::bump_profile(&tx, &unlock.user_id, &ProgressDelta::xp(xp_reward))?;
        tx.commit()?;
        Ok(Some(profile))
    }

    fn list_unlocks(&self, user_id: &str) -> GardenResult<Vec<AchievementUnlock>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"SELECT user_id, achievement_key, unlocked_at
               FROM achievement_unlocks
               WHERE user_id = ?1
               ORDER BY unlocked_at ASC"#,
        )?;

        let results = stmt.query_map(params![user_id], |row| {
            let user_id: String = row.get(0)?;
            let achievement_key: String = row.get(1)?;
            let unlocked_at: String = row.get(2)?;
            Ok(parse_timestamp(&unlocked_at).map(|unlocked_at| AchievementUnlock {
                user_id,
                achievement_key,
                unlocked_at,
            }))
        })?;

        results
            .map(|r| r.map_err(|e| e.into()).and_then(|inner| inner))
            .collect()
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    // Fixed-width fractional seconds keep lexical order equal to time order.
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> GardenResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GardenError::parse(e.to_string()))
}

fn parse_uuid(value: &str) -> GardenResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| GardenError::parse(e.to_string()))
}

fn parse_enum<T>(value: &str) -> GardenResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    T::from_str(value).map_err(|e| GardenError::parse(format!("'{}': {}", value, e)))
}
