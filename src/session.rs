use anyhow::{bail, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::db::Database;
use crate::models::{Record, RecordDraft};

/// The edit-form timestamp shape: `YYYY-MM-DDTHH:MM`.
const DATETIME_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn { username: String },
}

/// Mediates between user actions and the store. Holds exactly two pieces of
/// transient state: the auth state and the id of the record currently open
/// for editing. Every mutation ends in a full reload of the record list; the
/// session never caches records between actions.
pub struct Session {
    db: Database,
    state: SessionState,
    editing: Option<i64>,
}

impl Session {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            state: SessionState::LoggedOut,
            editing: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::LoggedIn { .. })
    }

    pub fn editing(&self) -> Option<i64> {
        self.editing
    }

    fn require_login(&self) -> Result<()> {
        if !self.is_authenticated() {
            bail!("not logged in");
        }
        Ok(())
    }

    /// Attempt a login. `Ok(false)` covers both unknown username and wrong
    /// password; the store never tells us which.
    pub fn login(&mut self, username: &str, password: &str) -> Result<bool> {
        if self.db.verify_user(username, password)? {
            self.state = SessionState::LoggedIn {
                username: username.to_string(),
            };
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn logout(&mut self) {
        self.state = SessionState::LoggedOut;
        self.editing = None;
    }

    /// Register a new user. Only reachable while logged out, and never
    /// authenticates the new user; the caller returns to the login form.
    pub fn register(&mut self, username: &str, password: &str) -> Result<i64> {
        if self.is_authenticated() {
            bail!("already logged in");
        }
        Ok(self.db.register_user(username, password)?)
    }

    pub fn records(&self) -> Result<Vec<Record>> {
        self.require_login()?;
        Ok(self.db.all_records()?)
    }

    /// Insert a record, then reload. Returns the new id and the fresh list.
    pub fn add_record(&mut self, draft: &RecordDraft) -> Result<(i64, Vec<Record>)> {
        self.require_login()?;
        let id = self.db.insert_record(draft)?;
        Ok((id, self.db.all_records()?))
    }

    /// Open a record for editing. Returns the pre-filled draft, with
    /// `submission_time` coerced into the edit-form shape, or `None` when
    /// the id no longer exists.
    pub fn begin_edit(&mut self, id: i64) -> Result<Option<RecordDraft>> {
        self.require_login()?;
        let Some(record) = self.db.get_record(id)? else {
            return Ok(None);
        };
        self.editing = Some(id);
        let mut draft = record.draft();
        draft.submission_time = datetime_local_value(&draft.submission_time);
        Ok(Some(draft))
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Overwrite the record currently open for editing, then reload.
    /// Returns the change count (0 means the row vanished underneath us)
    /// and the fresh list. The editing id is cleared either way.
    pub fn submit_edit(&mut self, draft: &RecordDraft) -> Result<(usize, Vec<Record>)> {
        self.require_login()?;
        let Some(id) = self.editing.take() else {
            bail!("no record open for editing");
        };
        let changed = self.db.update_record(id, draft)?;
        Ok((changed, self.db.all_records()?))
    }

    /// Delete a record, then reload. A zero change count means the id was
    /// not found.
    pub fn delete_record(&mut self, id: i64) -> Result<(usize, Vec<Record>)> {
        self.require_login()?;
        let changed = self.db.delete_record(id)?;
        if self.editing == Some(id) {
            self.editing = None;
        }
        Ok((changed, self.db.all_records()?))
    }

    pub fn get_record(&self, id: i64) -> Result<Option<Record>> {
        self.require_login()?;
        Ok(self.db.get_record(id)?)
    }
}

/// Coerce a stored submission time into the edit-form shape.
///
/// A value already in `YYYY-MM-DDTHH:MM` form (16 bytes, 'T' at byte 10)
/// passes through unchanged. Anything else is reparsed as a general
/// timestamp, converted to local time, and reformatted; unparseable input
/// pre-fills as empty rather than erroring.
pub fn datetime_local_value(raw: &str) -> String {
    if raw.len() == 16 && raw.as_bytes()[10] == b'T' {
        return raw.to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&Local)
            .format(DATETIME_LOCAL_FORMAT)
            .to_string();
    }
    // Naive timestamps are taken as already-local wall clock time.
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return naive.format(DATETIME_LOCAL_FORMAT).to_string();
        }
    }
    // A bare date prefills as midnight.
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_time(NaiveTime::MIN)
            .format(DATETIME_LOCAL_FORMAT)
            .to_string();
    }
    String::new()
}
