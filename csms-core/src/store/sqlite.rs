//! SQLite implementation of `RequestStore`.
//!
//! This provides persistent storage that survives service restarts.
//!
//! # Schema Versioning
//!
//! The database has a `schema_version` table that tracks the schema version.
//! When the schema needs to change, increment `CURRENT_SCHEMA_VERSION` and
//! add a migration in `run_migrations()`. Migrations run sequentially from
//! the current version to the target version.
//!
//! # Concurrency
//!
//! `commit_transition` runs its status check, request update, and audit
//! appends inside one IMMEDIATE transaction, so the compare-and-swap
//! contract holds even against writers outside this process. The ledger and
//! note tables are append-only: no code path updates or deletes their rows.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::warn;

use super::{CommitResult, NewRequest, RequestStore, StoreError, TransitionUpdate};
use crate::ledger::{Decision, RectificationNote, ReviewEntry};
use crate::request::{
    Actor, EmployeeId, Request, RequestDetails, RequestId, RequestStatus, RequestType, Role,
    Username,
};

/// Current schema version. Increment this when making schema changes and add
/// corresponding migration logic in `run_migrations()`.
const CURRENT_SCHEMA_VERSION: i64 = 1;

const REQUEST_COLUMNS: &str = "id, request_type, employee_id, submitted_by_username, \
     submitted_by_role, status, details, submitted_at, last_modified_at, \
     reviewer_username, reviewer_role";

/// SQLite-backed request store.
///
/// Uses `tokio::task::spawn_blocking` to run synchronous rusqlite operations
/// without blocking the async runtime.
#[derive(Debug)]
pub struct SqliteStore {
    /// Database connection. Exposed as `pub(crate)` for test access to
    /// corrupt rows when testing recovery behavior.
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    ///
    /// Creates the database file and schema if they don't exist, and runs
    /// any pending migrations if the database has an older schema.
    ///
    /// # Durability
    ///
    /// The database is configured with:
    /// - `journal_mode = WAL` for better concurrency and crash safety
    /// - `synchronous = FULL` for maximum durability
    /// - `busy_timeout = 5000ms` to handle concurrent access gracefully
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();
        let is_in_memory = path_str == ":memory:";

        if !is_in_memory && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;

                    // Restrictive directory permissions also cover the
                    // WAL/SHM files SQLite creates with default umask.
                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::PermissionsExt;
                        let dir_permissions = std::fs::Permissions::from_mode(0o700);
                        if let Err(e) = std::fs::set_permissions(parent, dir_permissions) {
                            warn!("Failed to set restrictive permissions on state directory: {}", e);
                        }
                    }
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| StoreError::storage("open database", e.to_string()))?;

        // Request details and the review trail are personnel data; keep the
        // file private to the service user.
        #[cfg(unix)]
        if !is_in_memory && !path_str.is_empty() {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path_ref, permissions) {
                warn!("Failed to set restrictive permissions on database file: {}", e);
            }
        }

        // Verify WAL mode was actually enabled. SQLite can silently keep
        // DELETE mode on filesystems without shared-memory support, which
        // would break the durability assumptions. In-memory databases
        // report "memory", which is fine for tests.
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| StoreError::storage("set journal_mode", e.to_string()))?;

        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));

        if !journal_mode_ok {
            return Err(StoreError::storage(
                "configure journal_mode",
                format!(
                    "failed to enable WAL mode: SQLite returned '{}' instead of 'wal'",
                    journal_mode
                ),
            ));
        }

        conn.execute_batch(
            r#"
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|e| StoreError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| StoreError::storage("create schema_version table", e.to_string()))?;

        // 0 if the table is empty, meaning a fresh database.
        let current_version: i64 = conn
            .query_row(
                "SELECT version FROM schema_version WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::storage("get schema version", e.to_string()))?
            .unwrap_or(0);

        Self::run_migrations(&conn, current_version)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run migrations from `from_version` to `CURRENT_SCHEMA_VERSION`.
    fn run_migrations(conn: &Connection, from_version: i64) -> Result<(), StoreError> {
        if from_version > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::storage(
                "schema version",
                format!(
                    "database schema version {} is newer than supported version {}; \
                     upgrade the application",
                    from_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }

        if from_version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        if from_version < 1 {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS requests (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    request_type TEXT NOT NULL,
                    employee_id TEXT NOT NULL,
                    submitted_by_username TEXT NOT NULL,
                    submitted_by_role TEXT NOT NULL,
                    status TEXT NOT NULL,
                    details TEXT NOT NULL,
                    submitted_at TEXT NOT NULL,
                    last_modified_at TEXT NOT NULL,
                    reviewer_username TEXT,
                    reviewer_role TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_requests_status
                    ON requests(status);
                CREATE INDEX IF NOT EXISTS idx_requests_employee
                    ON requests(employee_id);
                CREATE INDEX IF NOT EXISTS idx_requests_submitter
                    ON requests(submitted_by_username);

                CREATE TABLE IF NOT EXISTS review_ledger (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    request_id INTEGER NOT NULL,
                    reviewer_username TEXT NOT NULL,
                    reviewer_role TEXT NOT NULL,
                    decision TEXT NOT NULL,
                    reason TEXT,
                    reviewed_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_review_ledger_request
                    ON review_ledger(request_id, id);

                CREATE TABLE IF NOT EXISTS rectification_notes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    request_id INTEGER NOT NULL,
                    noted_by_username TEXT NOT NULL,
                    noted_by_role TEXT NOT NULL,
                    note TEXT NOT NULL,
                    noted_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_rectification_notes_request
                    ON rectification_notes(request_id, id);
                "#,
            )
            .map_err(|e| StoreError::storage("migration v1", e.to_string()))?;
        }

        conn.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| StoreError::storage("update schema version", e.to_string()))?;

        Ok(())
    }

    /// Create a new in-memory SQLite store (for testing).
    pub fn new_in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }
}

// =============================================================================
// Row mapping helpers
// =============================================================================

type RequestRow = (
    i64,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
);

fn read_request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn parse_timestamp(value: &str, what: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::corruption(format!("{} timestamp '{}'", what, value)))
}

fn parse_role(value: &str, what: &str) -> Result<Role, StoreError> {
    Role::parse(value).ok_or_else(|| StoreError::corruption(format!("{} role '{}'", what, value)))
}

fn parse_actor(
    username: Option<String>,
    role: Option<String>,
    what: &str,
) -> Result<Option<Actor>, StoreError> {
    match (username, role) {
        (Some(username), Some(role)) => Ok(Some(Actor {
            username: Username(username),
            role: parse_role(&role, what)?,
        })),
        (None, None) => Ok(None),
        _ => Err(StoreError::corruption(format!(
            "{} has a username without a role (or vice versa)",
            what
        ))),
    }
}

fn request_from_row(row: RequestRow) -> Result<Request, StoreError> {
    let (
        id,
        request_type,
        employee_id,
        submitted_by_username,
        submitted_by_role,
        status,
        details,
        submitted_at,
        last_modified_at,
        reviewer_username,
        reviewer_role,
    ) = row;

    let request_type = RequestType::parse(&request_type)
        .ok_or_else(|| StoreError::corruption(format!("request type '{}'", request_type)))?;
    let status = RequestStatus::parse(&status)
        .ok_or_else(|| StoreError::corruption(format!("request status '{}'", status)))?;

    Ok(Request {
        id: RequestId(id),
        request_type,
        employee: EmployeeId(employee_id),
        submitted_by: Actor {
            username: Username(submitted_by_username),
            role: parse_role(&submitted_by_role, "submitter")?,
        },
        status,
        details: RequestDetails(details),
        submitted_at: parse_timestamp(&submitted_at, "submitted_at")?,
        last_modified_at: parse_timestamp(&last_modified_at, "last_modified_at")?,
        reviewer: parse_actor(reviewer_username, reviewer_role, "reviewer")?,
    })
}

/// Run a request query, skipping rows that fail to decode so one corrupt
/// row does not hide every other request. Corrupt rows are logged for
/// investigation.
fn query_requests(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
    operation: &'static str,
) -> Result<Vec<Request>, StoreError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| StoreError::storage(operation, e.to_string()))?;

    let rows = stmt
        .query_map(params, read_request_row)
        .map_err(|e| StoreError::storage(operation, e.to_string()))?;

    let mut results = Vec::new();
    for row in rows {
        let raw = match row {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping unreadable request row in {}: {}", operation, e);
                continue;
            }
        };
        match request_from_row(raw) {
            Ok(request) => results.push(request),
            Err(e) => {
                warn!("Skipping corrupt request row in {}: {}", operation, e);
            }
        }
    }
    Ok(results)
}

// =============================================================================
// RequestStore trait implementation
// =============================================================================

#[async_trait]
impl RequestStore for SqliteStore {
    async fn insert(&self, new: NewRequest) -> Result<Request, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            conn.execute(
                "INSERT INTO requests (request_type, employee_id, submitted_by_username,
                                       submitted_by_role, status, details, submitted_at,
                                       last_modified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    new.request_type.as_str(),
                    new.employee.0,
                    new.submitted_by.username.0,
                    new.submitted_by.role.as_str(),
                    RequestStatus::Pending.as_str(),
                    new.details.0,
                    new.submitted_at.to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::storage("insert", e.to_string()))?;

            let id = RequestId(conn.last_insert_rowid());
            Ok(Request {
                id,
                request_type: new.request_type,
                employee: new.employee,
                submitted_by: new.submitted_by,
                status: RequestStatus::Pending,
                details: new.details,
                submitted_at: new.submitted_at,
                last_modified_at: new.submitted_at,
                reviewer: None,
            })
        })
        .await
        .map_err(|e| StoreError::storage("insert", e.to_string()))?
    }

    async fn get(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let row: Option<RequestRow> = conn
                .query_row(
                    &format!("SELECT {} FROM requests WHERE id = ?1", REQUEST_COLUMNS),
                    params![id.0],
                    read_request_row,
                )
                .optional()
                .map_err(|e| StoreError::storage("get", e.to_string()))?;

            row.map(request_from_row).transpose()
        })
        .await
        .map_err(|e| StoreError::storage("get", e.to_string()))?
    }

    async fn commit_transition(
        &self,
        id: RequestId,
        expected: RequestStatus,
        update: TransitionUpdate,
    ) -> Result<CommitResult, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();

            // IMMEDIATE takes the write lock up front, so the status check
            // and the update cannot interleave with another writer.
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| StoreError::storage("commit_transition", e.to_string()))?;

            let row: Option<RequestRow> = tx
                .query_row(
                    &format!("SELECT {} FROM requests WHERE id = ?1", REQUEST_COLUMNS),
                    params![id.0],
                    read_request_row,
                )
                .optional()
                .map_err(|e| StoreError::storage("commit_transition", e.to_string()))?;

            let Some(raw) = row else {
                return Ok(CommitResult::Missing);
            };
            let mut request = request_from_row(raw)?;

            if request.status != expected {
                return Ok(CommitResult::Conflict {
                    actual: request.status,
                });
            }

            request.status = update.new_status;
            if let Some(details) = update.new_details {
                request.details = details;
            }
            if let Some(reviewer) = update.set_reviewer {
                request.reviewer = Some(reviewer);
            }
            if update.refresh_submitted_at {
                request.submitted_at = update.at;
            }
            request.last_modified_at = update.at;

            let (reviewer_username, reviewer_role) = match &request.reviewer {
                Some(actor) => (Some(actor.username.0.clone()), Some(actor.role.as_str())),
                None => (None, None),
            };
            let changed = tx
                .execute(
                    "UPDATE requests
                     SET status = ?1, details = ?2, submitted_at = ?3, last_modified_at = ?4,
                         reviewer_username = ?5, reviewer_role = ?6
                     WHERE id = ?7 AND status = ?8",
                    params![
                        request.status.as_str(),
                        request.details.0,
                        request.submitted_at.to_rfc3339(),
                        request.last_modified_at.to_rfc3339(),
                        reviewer_username,
                        reviewer_role,
                        id.0,
                        expected.as_str(),
                    ],
                )
                .map_err(|e| StoreError::storage("commit_transition", e.to_string()))?;
            if changed != 1 {
                // The row vanished or changed under the transaction, which
                // IMMEDIATE should have prevented.
                return Err(StoreError::storage(
                    "commit_transition",
                    format!("expected to update 1 row for request {}, updated {}", id, changed),
                ));
            }

            if let Some(entry) = update.ledger {
                tx.execute(
                    "INSERT INTO review_ledger (request_id, reviewer_username, reviewer_role,
                                                decision, reason, reviewed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        id.0,
                        entry.reviewer.username.0,
                        entry.reviewer.role.as_str(),
                        entry.decision.as_str(),
                        entry.reason,
                        update.at.to_rfc3339(),
                    ],
                )
                .map_err(|e| StoreError::storage("append ledger entry", e.to_string()))?;
            }

            if let Some(note) = update.note {
                tx.execute(
                    "INSERT INTO rectification_notes (request_id, noted_by_username,
                                                      noted_by_role, note, noted_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        id.0,
                        note.noted_by.username.0,
                        note.noted_by.role.as_str(),
                        note.note,
                        update.at.to_rfc3339(),
                    ],
                )
                .map_err(|e| StoreError::storage("append rectification note", e.to_string()))?;
            }

            tx.commit()
                .map_err(|e| StoreError::storage("commit_transition", e.to_string()))?;

            Ok(CommitResult::Committed(request))
        })
        .await
        .map_err(|e| StoreError::storage("commit_transition", e.to_string()))?
    }

    async fn list_all(&self) -> Result<Vec<Request>, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            query_requests(
                &conn,
                &format!("SELECT {} FROM requests ORDER BY id", REQUEST_COLUMNS),
                &[],
                "list_all",
            )
        })
        .await
        .map_err(|e| StoreError::storage("list_all", e.to_string()))?
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<Request>, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            query_requests(
                &conn,
                &format!(
                    "SELECT {} FROM requests WHERE status = ?1 ORDER BY id",
                    REQUEST_COLUMNS
                ),
                &[&status.as_str()],
                "list_by_status",
            )
        })
        .await
        .map_err(|e| StoreError::storage("list_by_status", e.to_string()))?
    }

    async fn list_by_employee(&self, employee: &EmployeeId) -> Result<Vec<Request>, StoreError> {
        let conn = self.conn.clone();
        let employee = employee.0.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            query_requests(
                &conn,
                &format!(
                    "SELECT {} FROM requests WHERE employee_id = ?1 ORDER BY id",
                    REQUEST_COLUMNS
                ),
                &[&employee],
                "list_by_employee",
            )
        })
        .await
        .map_err(|e| StoreError::storage("list_by_employee", e.to_string()))?
    }

    async fn list_by_submitter(&self, submitter: &Username) -> Result<Vec<Request>, StoreError> {
        let conn = self.conn.clone();
        let submitter = submitter.0.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            query_requests(
                &conn,
                &format!(
                    "SELECT {} FROM requests WHERE submitted_by_username = ?1 ORDER BY id",
                    REQUEST_COLUMNS
                ),
                &[&submitter],
                "list_by_submitter",
            )
        })
        .await
        .map_err(|e| StoreError::storage("list_by_submitter", e.to_string()))?
    }

    async fn ledger(&self, id: RequestId) -> Result<Vec<ReviewEntry>, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let mut stmt = conn
                .prepare(
                    "SELECT id, reviewer_username, reviewer_role, decision, reason, reviewed_at
                     FROM review_ledger WHERE request_id = ?1 ORDER BY id",
                )
                .map_err(|e| StoreError::storage("ledger", e.to_string()))?;

            let rows = stmt
                .query_map(params![id.0], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                })
                .map_err(|e| StoreError::storage("ledger", e.to_string()))?;

            // The ledger is the audit trail; unlike request listings, a row
            // that fails to decode is an error rather than a skip.
            let mut entries = Vec::new();
            for row in rows {
                let (entry_id, reviewer_username, reviewer_role, decision, reason, reviewed_at) =
                    row.map_err(|e| StoreError::storage("ledger", e.to_string()))?;
                let decision = Decision::parse(&decision)
                    .ok_or_else(|| StoreError::corruption(format!("decision '{}'", decision)))?;
                entries.push(ReviewEntry {
                    id: entry_id,
                    request: id,
                    reviewer: Actor {
                        username: Username(reviewer_username),
                        role: parse_role(&reviewer_role, "ledger reviewer")?,
                    },
                    decision,
                    reason,
                    reviewed_at: parse_timestamp(&reviewed_at, "reviewed_at")?,
                });
            }
            Ok(entries)
        })
        .await
        .map_err(|e| StoreError::storage("ledger", e.to_string()))?
    }

    async fn rectification_notes(
        &self,
        id: RequestId,
    ) -> Result<Vec<RectificationNote>, StoreError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();

            let mut stmt = conn
                .prepare(
                    "SELECT id, noted_by_username, noted_by_role, note, noted_at
                     FROM rectification_notes WHERE request_id = ?1 ORDER BY id",
                )
                .map_err(|e| StoreError::storage("rectification_notes", e.to_string()))?;

            let rows = stmt
                .query_map(params![id.0], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })
                .map_err(|e| StoreError::storage("rectification_notes", e.to_string()))?;

            let mut notes = Vec::new();
            for row in rows {
                let (note_id, noted_by_username, noted_by_role, note, noted_at) =
                    row.map_err(|e| StoreError::storage("rectification_notes", e.to_string()))?;
                notes.push(RectificationNote {
                    id: note_id,
                    request: id,
                    noted_by: Actor {
                        username: Username(noted_by_username),
                        role: parse_role(&noted_by_role, "rectification note author")?,
                    },
                    note,
                    noted_at: parse_timestamp(&noted_at, "noted_at")?,
                });
            }
            Ok(notes)
        })
        .await
        .map_err(|e| StoreError::storage("rectification_notes", e.to_string()))?
    }
}
