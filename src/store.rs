//! SQLite-backed store for users and notes.
//!
//! Tables:
//! - `users`: id, username (unique), name, password_hash, created_at
//! - `notes`: id, content, important, date, user_id
//!
//! Ownership lives only on the note row; a user's note set is the
//! [`NoteStore::notes_for_user`] projection, so note creation is a single
//! write and user rows are never touched afterward.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::params;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// A registered user. Never serialized as-is — the password hash stays
/// inside the store and the gateway renders its own view.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// A note, shaped exactly as the API serializes it: `user` carries the
/// owner's id, or null for legacy ownerless rows.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: String,
    pub content: String,
    pub important: bool,
    pub date: DateTime<Utc>,
    pub user: Option<String>,
}

/// The owned-note projection embedded in user listings.
#[derive(Debug, Clone, Serialize)]
pub struct NoteSummary {
    pub id: String,
    pub content: String,
    pub important: bool,
}

/// Store failures. Uniqueness violations are their own variant so the
/// boundary layer can map them without inspecting SQLite error strings.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username is already taken")]
    DuplicateUsername,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// SQLite-backed user and note store.
pub struct NoteStore {
    conn: Mutex<rusqlite::Connection>,
}

impl NoteStore {
    /// Open (or create) the database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open(db_path)?;

        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                name TEXT,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                important INTEGER NOT NULL DEFAULT 0,
                date TEXT NOT NULL,
                user_id TEXT REFERENCES users(id)
            );
            CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id);",
        )
    }

    // ── User Management ─────────────────────────────────────────────

    /// Insert a new user. The caller hashes the password; the store only
    /// ever sees the hash.
    pub fn create_user(
        &self,
        username: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO users (id, username, name, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, username, name, password_hash, created_at],
        );

        match result {
            Ok(_) => Ok(User {
                id,
                username: username.to_string(),
                name: name.map(str::to_string),
                password_hash: password_hash.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateUsername)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user by username. Case-sensitive, matching the uniqueness
    /// constraint.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            "SELECT id, username, name, password_hash FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        );

        match row {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user by id.
    pub fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            "SELECT id, username, name, password_hash FROM users WHERE id = ?1",
            params![user_id],
            row_to_user,
        );

        match row {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All users, in registration order.
    pub fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, username, name, password_hash FROM users ORDER BY rowid")?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // ── Note Management ─────────────────────────────────────────────

    /// Insert a note. `user_id` is the owner; `None` only occurs on legacy
    /// unauthenticated paths that no longer exist in the API, but the schema
    /// tolerates it.
    pub fn create_note(
        &self,
        content: &str,
        important: bool,
        date: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> Result<Note, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO notes (id, content, important, date, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, content, important, date.to_rfc3339(), user_id],
        )?;

        Ok(Note {
            id,
            content: content.to_string(),
            important,
            date,
            user: user_id.map(str::to_string),
        })
    }

    /// All notes, in insertion order.
    pub fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, content, important, date, user_id FROM notes ORDER BY rowid")?;
        let notes = stmt
            .query_map([], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Look up a note by id.
    pub fn find_note(&self, note_id: &str) -> Result<Option<Note>, StoreError> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            "SELECT id, content, important, date, user_id FROM notes WHERE id = ?1",
            params![note_id],
            row_to_note,
        );

        match row {
            Ok(note) => Ok(Some(note)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Update a note's content and importance. Returns the updated note, or
    /// `None` if no note has this id.
    pub fn update_note(
        &self,
        note_id: &str,
        content: &str,
        important: bool,
    ) -> Result<Option<Note>, StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE notes SET content = ?1, important = ?2 WHERE id = ?3",
            params![content, important, note_id],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        let note = conn.query_row(
            "SELECT id, content, important, date, user_id FROM notes WHERE id = ?1",
            params![note_id],
            row_to_note,
        )?;
        Ok(Some(note))
    }

    /// Delete a note by id. Returns whether a row was removed.
    pub fn delete_note(&self, note_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM notes WHERE id = ?1", params![note_id])?;
        Ok(deleted > 0)
    }

    /// The notes owned by a user, as summaries, in insertion order. This is
    /// the single source of truth for "a user's note set".
    pub fn notes_for_user(&self, user_id: &str) -> Result<Vec<NoteSummary>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, content, important FROM notes WHERE user_id = ?1 ORDER BY rowid",
        )?;
        let notes = stmt
            .query_map(params![user_id], |row| {
                Ok(NoteSummary {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    important: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
    })
}

fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    let date: String = row.get(3)?;
    let date = DateTime::parse_from_rfc3339(&date)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Note {
        id: row.get(0)?,
        content: row.get(1)?,
        important: row.get(2)?,
        date,
        user: row.get(4)?,
    })
}
