//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database. The engine and scheduler call
//! store methods — they never execute SQL directly.
//!
//! Concurrency: every mutable write goes through `apply_update`, a
//! conditional update keyed on the record's `revision`. Two writers racing on
//! the same complaint produce exactly one `Applied` and one `Conflict`; the
//! loser re-reads and re-evaluates. History appends ride the same
//! transaction as the row update, so a conflicting write never leaves a
//! stray audit entry.

use crate::complaint::{AssignmentEntry, Complaint, Location, StatusEntry};
use crate::error::DeskResult;
use crate::staff::StaffProfile;
use crate::types::{ComplaintId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::time::Duration;

const ACTIVE_STATUSES: &str = "('OPEN', 'IN_PROGRESS', 'ESCALATED')";

/// Result of a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The stored revision no longer matches — someone else wrote first.
    Conflict,
    NotFound,
}

pub struct DeskStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file/URI
}

impl DeskStore {
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        // Bounded wait on a locked database instead of an immediate error.
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Open a second connection to the same database.
    /// For plain in-memory stores this yields an isolated database; tests that
    /// need two handles on shared state open with a
    /// `file:name?mode=memory&cache=shared` URI instead.
    pub fn reopen(&self) -> DeskResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Complaint ──────────────────────────────────────────────

    pub fn insert_complaint(&self, c: &Complaint) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO complaint (
                complaint_id, title, description, category, priority, status,
                reporter_id, assigned_to, city, address, latitude, longitude,
                created_at, sla_hours, due_at, resolved_at, escalation_level, revision
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                &c.complaint_id,
                &c.title,
                &c.description,
                c.category.label(),
                c.priority.as_str(),
                c.status.as_str(),
                c.reporter_id.as_deref(),
                c.assigned_to.as_deref(),
                &c.location.city,
                c.location.address.as_deref(),
                c.location.latitude,
                c.location.longitude,
                ts_to_sql(c.created_at),
                c.sla_hours,
                ts_to_sql(c.due_at),
                c.resolved_at.map(ts_to_sql),
                c.escalation_level as i64,
                c.revision,
            ],
        )?;
        Ok(())
    }

    pub fn get_complaint(&self, complaint_id: &str) -> DeskResult<Option<Complaint>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE complaint_id = ?1"),
                params![complaint_id],
                complaint_row_mapper,
            )
            .optional()?;
        Ok(result)
    }

    /// All complaints the escalation scan cares about: status in the active
    /// set. RESOLVED never enters the scan. Ordered by deadline so the most
    /// overdue records are processed first.
    pub fn active_complaints(&self) -> DeskResult<Vec<Complaint>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint
             WHERE status IN {ACTIVE_STATUSES}
             ORDER BY due_at ASC"
        ))?;
        let rows = stmt.query_map([], complaint_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Conditional update of a complaint's mutable fields, keyed on revision.
    ///
    /// The immutable-at-creation columns are deliberately not touched here.
    /// History entries, when given, are appended in the same transaction.
    pub fn apply_update(
        &self,
        complaint_id: &str,
        expected_revision: i64,
        record: &Complaint,
        status_entry: Option<&StatusEntry>,
        assignment_entry: Option<&AssignmentEntry>,
    ) -> DeskResult<UpdateOutcome> {
        let tx = self.conn.unchecked_transaction()?;

        let changed = tx.execute(
            "UPDATE complaint
             SET priority = ?1, status = ?2, assigned_to = ?3, resolved_at = ?4,
                 escalation_level = ?5, revision = revision + 1
             WHERE complaint_id = ?6 AND revision = ?7",
            params![
                record.priority.as_str(),
                record.status.as_str(),
                record.assigned_to.as_deref(),
                record.resolved_at.map(ts_to_sql),
                record.escalation_level as i64,
                complaint_id,
                expected_revision,
            ],
        )?;

        if changed == 0 {
            // Distinguish a stale revision from a missing record.
            let exists: bool = tx.query_row(
                "SELECT COUNT(*) > 0 FROM complaint WHERE complaint_id = ?1",
                params![complaint_id],
                |row| row.get(0),
            )?;
            tx.rollback()?;
            return Ok(if exists {
                UpdateOutcome::Conflict
            } else {
                UpdateOutcome::NotFound
            });
        }

        if let Some(entry) = status_entry {
            tx.execute(
                "INSERT INTO complaint_status_history
                    (complaint_id, status, actor, notes, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    complaint_id,
                    entry.status.as_str(),
                    &entry.actor,
                    entry.notes.as_deref(),
                    ts_to_sql(entry.recorded_at),
                ],
            )?;
        }
        if let Some(entry) = assignment_entry {
            tx.execute(
                "INSERT INTO complaint_assignment_history
                    (complaint_id, assigned_to, actor, notes, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    complaint_id,
                    &entry.assigned_to,
                    &entry.actor,
                    entry.notes.as_deref(),
                    ts_to_sql(entry.recorded_at),
                ],
            )?;
        }

        tx.commit()?;
        Ok(UpdateOutcome::Applied)
    }

    // ── Audit logs ─────────────────────────────────────────────

    /// Append a status entry outside a conditional update. Used only for the
    /// initial OPEN entry written at intake, before the record is contended.
    pub fn append_status_entry(
        &self,
        complaint_id: &str,
        entry: &StatusEntry,
    ) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO complaint_status_history
                (complaint_id, status, actor, notes, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                complaint_id,
                entry.status.as_str(),
                &entry.actor,
                entry.notes.as_deref(),
                ts_to_sql(entry.recorded_at),
            ],
        )?;
        Ok(())
    }

    pub fn status_history(&self, complaint_id: &str) -> DeskResult<Vec<StatusEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, actor, notes, recorded_at
             FROM complaint_status_history
             WHERE complaint_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![complaint_id], |row| {
            Ok(StatusEntry {
                status: parse_col(row, 0)?,
                actor: row.get(1)?,
                notes: row.get(2)?,
                recorded_at: ts_col(row, 3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn assignment_history(&self, complaint_id: &str) -> DeskResult<Vec<AssignmentEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT assigned_to, actor, notes, recorded_at
             FROM complaint_assignment_history
             WHERE complaint_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![complaint_id], |row| {
            Ok(AssignmentEntry {
                assigned_to: row.get(0)?,
                actor: row.get(1)?,
                notes: row.get(2)?,
                recorded_at: ts_col(row, 3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Staff directory ────────────────────────────────────────

    pub fn insert_staff(&self, staff: &StaffProfile) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO staff (staff_id, full_name, profession, city)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                &staff.staff_id,
                &staff.full_name,
                staff.profession.as_str(),
                &staff.city,
            ],
        )?;
        Ok(())
    }

    pub fn get_staff(&self, staff_id: &str) -> DeskResult<Option<StaffProfile>> {
        let result = self
            .conn
            .query_row(
                "SELECT staff_id, full_name, profession, city
                 FROM staff WHERE staff_id = ?1",
                params![staff_id],
                staff_row_mapper,
            )
            .optional()?;
        Ok(result)
    }

    /// Staff in a city, case-insensitively. Directory order is stable
    /// (insertion order) so the matcher's tie-break is deterministic.
    pub fn staff_by_city(&self, city: &str) -> DeskResult<Vec<StaffProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT staff_id, full_name, profession, city
             FROM staff WHERE city = ?1 COLLATE NOCASE
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![city], staff_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Summary helpers ────────────────────────────────────────

    pub fn complaint_count(&self) -> DeskResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM complaint", [], |row| row.get(0))
            .map_err(Into::into)
    }

    pub fn count_by_status(&self, status: &str) -> DeskResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM complaint WHERE status = ?1",
                params![status],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

const COMPLAINT_COLUMNS: &str = "complaint_id, title, description, category, priority, status,
    reporter_id, assigned_to, city, address, latitude, longitude,
    created_at, sla_hours, due_at, resolved_at, escalation_level, revision";

fn complaint_row_mapper(row: &Row<'_>) -> rusqlite::Result<Complaint> {
    Ok(Complaint {
        complaint_id: row.get::<_, ComplaintId>(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: parse_col(row, 3)?,
        priority: parse_col(row, 4)?,
        status: parse_col(row, 5)?,
        reporter_id: row.get(6)?,
        assigned_to: row.get::<_, Option<UserId>>(7)?,
        location: Location {
            city: row.get(8)?,
            address: row.get(9)?,
            latitude: row.get(10)?,
            longitude: row.get(11)?,
        },
        created_at: ts_col(row, 12)?,
        sla_hours: row.get(13)?,
        due_at: ts_col(row, 14)?,
        resolved_at: row
            .get::<_, Option<String>>(15)?
            .map(|s| parse_ts(&s, 15))
            .transpose()?,
        escalation_level: row.get::<_, i64>(16)? as u32,
        revision: row.get(17)?,
    })
}

fn staff_row_mapper(row: &Row<'_>) -> rusqlite::Result<StaffProfile> {
    Ok(StaffProfile {
        staff_id: row.get(0)?,
        full_name: row.get(1)?,
        profession: parse_col(row, 2)?,
        city: row.get(3)?,
    })
}

/// Parse a TEXT column through FromStr, surfacing bad values as conversion
/// failures instead of silently admitting unknown enum strings.
fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw, idx)
}

fn parse_ts(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn ts_to_sql(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}
