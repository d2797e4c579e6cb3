use rusqlite::{Connection, params};
use std::path::PathBuf;
use thiserror::Error;

use crate::auth;
use crate::models::{Record, RecordDraft};

/// Default credential pair seeded at first initialization.
pub const SEED_USERNAME: &str = "admin";
pub const SEED_PASSWORD: &str = "123456";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open database at {}: {}", .path.display(), .reason)]
    Unavailable { path: PathBuf, reason: String },

    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open() -> Result<Self, StoreError> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        }
        let conn = Connection::open(&path).map_err(|e| StoreError::Unavailable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { conn, path })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "subtrack") {
            proj_dirs.data_dir().join("subtrack.db")
        } else {
            PathBuf::from("subtrack.db")
        }
    }

    /// Create both tables and the seed user. Idempotent: safe to call on an
    /// already-initialized store, and the seed is never duplicated.
    pub fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                submission_time TEXT NOT NULL,
                company TEXT NOT NULL,
                status TEXT NOT NULL,
                interview_details TEXT,
                business TEXT,
                address TEXT,
                benefits TEXT
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL
            );
            "#,
        )?;

        let seeded = match self.conn.query_row(
            "SELECT id FROM users WHERE username = ?1",
            [SEED_USERNAME],
            |row| row.get::<_, i64>(0),
        ) {
            Ok(_) => true,
            Err(rusqlite::Error::QueryReturnedNoRows) => false,
            Err(e) => return Err(e.into()),
        };

        if !seeded {
            let hash = auth::hash_password(SEED_PASSWORD)?;
            self.conn.execute(
                "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
                params![SEED_USERNAME, hash],
            )?;
        }

        Ok(())
    }

    // --- Record operations ---

    pub fn insert_record(&self, draft: &RecordDraft) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO records (submission_time, company, status, interview_details, business, address, benefits)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                draft.submission_time,
                draft.company,
                draft.status,
                draft.interview_details,
                draft.business,
                draft.address,
                draft.benefits,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All records, newest (highest id) first. An empty table yields an
    /// empty vec, not an error.
    pub fn all_records(&self) -> Result<Vec<Record>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, submission_time, company, status, interview_details, business, address, benefits
             FROM records ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_record(&self, id: i64) -> Result<Option<Record>, StoreError> {
        let result = self.conn.query_row(
            "SELECT id, submission_time, company, status, interview_details, business, address, benefits
             FROM records WHERE id = ?1",
            [id],
            Self::row_to_record,
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Full overwrite of all seven fields for the row matching `id`.
    /// Returns 1 whenever the id exists (SQLite counts every row matched by
    /// the WHERE clause, identical values included) and 0 only when it
    /// doesn't.
    pub fn update_record(&self, id: i64, draft: &RecordDraft) -> Result<usize, StoreError> {
        let changed = self.conn.execute(
            "UPDATE records
             SET submission_time = ?1, company = ?2, status = ?3, interview_details = ?4,
                 business = ?5, address = ?6, benefits = ?7
             WHERE id = ?8",
            params![
                draft.submission_time,
                draft.company,
                draft.status,
                draft.interview_details,
                draft.business,
                draft.address,
                draft.benefits,
                id,
            ],
        )?;
        Ok(changed)
    }

    /// Returns the number of rows removed (0 or 1).
    pub fn delete_record(&self, id: i64) -> Result<usize, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM records WHERE id = ?1", [id])?;
        Ok(changed)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
        Ok(Record {
            id: row.get(0)?,
            submission_time: row.get(1)?,
            company: row.get(2)?,
            status: row.get(3)?,
            interview_details: row.get(4)?,
            business: row.get(5)?,
            address: row.get(6)?,
            benefits: row.get(7)?,
        })
    }

    // --- User operations ---

    /// Insert a new user with a freshly salted hash. The UNIQUE constraint
    /// on `username` is the arbiter of duplicates, so there is no pre-check
    /// to race against.
    pub fn register_user(&self, username: &str, password: &str) -> Result<i64, StoreError> {
        let hash = auth::hash_password(password)?;
        match self.conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
            params![username, hash],
        ) {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateUsername(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// True iff a user with exactly this username exists and the password
    /// verifies against its stored hash. Unknown username and wrong password
    /// are indistinguishable to the caller.
    pub fn verify_user(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let stored = match self.conn.query_row(
            "SELECT password_hash FROM users WHERE username = ?1",
            [username],
            |row| row.get::<_, String>(0),
        ) {
            Ok(hash) => hash,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        auth::verify_password(password, &stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn draft(company: &str) -> RecordDraft {
        RecordDraft {
            submission_time: "2024-03-05T09:30".to_string(),
            company: company.to_string(),
            status: "applied".to_string(),
            interview_details: Some("phone screen Friday".to_string()),
            business: None,
            address: Some("12 Main St".to_string()),
            benefits: None,
        }
    }

    #[test]
    fn init_twice_is_idempotent() {
        let db = open_store();
        db.init().unwrap();

        let tables: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('records', 'users')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);

        let admins: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1",
                [SEED_USERNAME],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(admins, 1);
    }

    #[test]
    fn seed_user_verifies_after_first_init() {
        let db = open_store();
        assert!(db.verify_user("admin", "123456").unwrap());
        assert!(!db.verify_user("admin", "wrong").unwrap());
        assert!(!db.verify_user("nouser", "x").unwrap());
    }

    #[test]
    fn seed_credential_is_stored_hashed() {
        let db = open_store();
        let stored: String = db
            .conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = ?1",
                [SEED_USERNAME],
                |row| row.get(0),
            )
            .unwrap();
        assert!(stored.starts_with("$argon2"));
        assert_ne!(stored, SEED_PASSWORD);
    }

    #[test]
    fn insert_then_list_puts_newest_first() {
        let db = open_store();
        let id = db.insert_record(&draft("Acme")).unwrap();

        let records = db.all_records().unwrap();
        let head = &records[0];
        assert_eq!(head.id, id);
        assert_eq!(head.company, "Acme");
        assert_eq!(head.status, "applied");
        assert_eq!(head.interview_details.as_deref(), Some("phone screen Friday"));
        assert_eq!(head.business, None);
    }

    #[test]
    fn list_orders_by_id_descending() {
        let db = open_store();
        for company in ["One", "Two", "Three"] {
            db.insert_record(&draft(company)).unwrap();
        }
        let ids: Vec<i64> = db.all_records().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn ids_grow_monotonically_and_are_not_reused() {
        let db = open_store();
        let first = db.insert_record(&draft("A")).unwrap();
        let second = db.insert_record(&draft("B")).unwrap();
        assert!(second > first);

        assert_eq!(db.delete_record(second).unwrap(), 1);
        let third = db.insert_record(&draft("C")).unwrap();
        assert!(third > second);
    }

    #[test]
    fn empty_table_lists_as_empty_vec() {
        let db = open_store();
        assert!(db.all_records().unwrap().is_empty());
    }

    #[test]
    fn update_overwrites_all_fields() {
        let db = open_store();
        let id = db.insert_record(&draft("Acme")).unwrap();

        let mut updated = draft("Acme Corp");
        updated.status = "offer".to_string();
        updated.interview_details = None;
        updated.benefits = Some("equity".to_string());
        assert_eq!(db.update_record(id, &updated).unwrap(), 1);

        let record = db.get_record(id).unwrap().unwrap();
        assert_eq!(record.company, "Acme Corp");
        assert_eq!(record.status, "offer");
        assert_eq!(record.interview_details, None);
        assert_eq!(record.benefits.as_deref(), Some("equity"));
    }

    #[test]
    fn update_of_missing_id_changes_nothing() {
        let db = open_store();
        let id = db.insert_record(&draft("Acme")).unwrap();

        assert_eq!(db.update_record(id + 100, &draft("Other")).unwrap(), 0);

        let records = db.all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company, "Acme");
    }

    #[test]
    fn update_with_identical_values_still_reports_one_change() {
        let db = open_store();
        let d = draft("Acme");
        let id = db.insert_record(&d).unwrap();
        // id-found semantics: a no-op overwrite of an existing row is 1
        assert_eq!(db.update_record(id, &d).unwrap(), 1);
    }

    #[test]
    fn delete_removes_exactly_one_row_once() {
        let db = open_store();
        let keep = db.insert_record(&draft("Keep")).unwrap();
        let gone = db.insert_record(&draft("Gone")).unwrap();

        assert_eq!(db.delete_record(gone).unwrap(), 1);
        assert_eq!(db.delete_record(gone).unwrap(), 0);

        let ids: Vec<i64> = db.all_records().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![keep]);
    }

    #[test]
    fn register_duplicate_username_is_rejected() {
        let db = open_store();
        let err = db.register_user("admin", "whatever").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(name) if name == "admin"));
    }

    #[test]
    fn register_then_verify_new_user() {
        let db = open_store();
        let id = db.register_user("casey", "s3cret").unwrap();
        assert!(id > 0);
        assert!(db.verify_user("casey", "s3cret").unwrap());
        assert!(!db.verify_user("casey", "other").unwrap());
    }

    #[test]
    fn usernames_match_case_sensitively() {
        let db = open_store();
        db.register_user("Casey", "pw").unwrap();
        assert!(!db.verify_user("casey", "pw").unwrap());
        // different case is a different user, not a duplicate
        let id = db.register_user("casey", "pw2").unwrap();
        assert!(id > 0);
    }

    #[test]
    fn get_record_on_missing_id_is_none() {
        let db = open_store();
        assert!(db.get_record(42).unwrap().is_none());
    }
}
