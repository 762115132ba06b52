//! Transport-agnostic application state.
//!
//! `CoreState` is the single shared state behind the REST API: the database
//! path, the in-memory staff session registry, and the buffered access
//! audit logger.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::Local;
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::db;
use crate::models::enums::StaffRole;
use crate::models::Staff;

/// Absolute session lifetime: 12 hours (one shift plus handover).
const SESSION_TTL_SECS: u64 = 12 * 3600;

/// Inactivity timeout: 15 minutes.
const SESSION_INACTIVITY_SECS: u64 = 900;

/// Maximum audit buffer size before flush.
const AUDIT_BUFFER_CAPACITY: usize = 100;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("A lock was poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Database(#[from] db::DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// Staff sessions
// ═══════════════════════════════════════════════════════════

/// An authenticated staff session, keyed by token hash in the registry.
#[derive(Debug, Clone)]
pub struct StaffSession {
    pub staff_id: Uuid,
    pub badge: String,
    pub name: String,
    pub role: StaffRole,
    issued_at: Instant,
    last_seen: Instant,
}

/// In-memory registry of active bearer-token sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<[u8; 32], StaffSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for a logged-in staff member.
    pub fn start(&mut self, staff: &Staff, token_hash: [u8; 32]) {
        let now = Instant::now();
        self.sessions.insert(token_hash, StaffSession {
            staff_id: staff.id,
            badge: staff.badge.clone(),
            name: staff.name.clone(),
            role: staff.role,
            issued_at: now,
            last_seen: now,
        });
    }

    /// Validate a token hash, refreshing the inactivity clock.
    /// Expired sessions are removed on the way.
    pub fn validate(&mut self, token_hash: &[u8; 32]) -> Option<StaffSession> {
        let now = Instant::now();
        let expired = match self.sessions.get(token_hash) {
            Some(session) => {
                now.duration_since(session.issued_at) > Duration::from_secs(SESSION_TTL_SECS)
                    || now.duration_since(session.last_seen)
                        > Duration::from_secs(SESSION_INACTIVITY_SECS)
            }
            None => return None,
        };
        if expired {
            self.sessions.remove(token_hash);
            return None;
        }
        let session = self.sessions.get_mut(token_hash)?;
        session.last_seen = now;
        Some(session.clone())
    }

    pub fn revoke(&mut self, token_hash: &[u8; 32]) -> bool {
        self.sessions.remove(token_hash).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

// ═══════════════════════════════════════════════════════════
// Audit logging (buffered)
// ═══════════════════════════════════════════════════════════

type AuditEntry = (String, String, String, String); // (timestamp, staff, action, detail)

struct AuditLogger {
    buffer: Mutex<Vec<AuditEntry>>,
}

impl AuditLogger {
    fn new() -> Self {
        Self { buffer: Mutex::new(Vec::new()) }
    }

    /// Buffer an entry; returns the full buffer when it is time to flush.
    fn push(&self, staff: &str, action: &str, detail: &str) -> Option<Vec<AuditEntry>> {
        let timestamp = Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut buffer = match self.buffer.lock() {
            Ok(buffer) => buffer,
            Err(_) => return None,
        };
        buffer.push((timestamp, staff.to_string(), action.to_string(), detail.to_string()));
        if buffer.len() >= AUDIT_BUFFER_CAPACITY {
            Some(std::mem::take(&mut *buffer))
        } else {
            None
        }
    }

    fn drain(&self) -> Vec<AuditEntry> {
        self.buffer.lock().map(|mut b| std::mem::take(&mut *b)).unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

/// Shared application state, wrapped in `Arc` at startup.
/// `RwLock` on the session registry allows concurrent validation reads
/// to coexist with the occasional login/logout write.
pub struct CoreState {
    pub db_path: PathBuf,
    sessions: RwLock<SessionRegistry>,
    audit: AuditLogger,
}

impl CoreState {
    pub fn new() -> Self {
        Self {
            db_path: config::database_path(),
            sessions: RwLock::new(SessionRegistry::new()),
            audit: AuditLogger::new(),
        }
    }

    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            sessions: RwLock::new(SessionRegistry::new()),
            audit: AuditLogger::new(),
        }
    }

    /// Open a database connection for a request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        Ok(db::open_database(&self.db_path)?)
    }

    pub fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionRegistry>, CoreError> {
        self.sessions.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionRegistry>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }

    /// Buffer an audit entry, flushing the buffer to the database when full.
    /// Audit flush failures are logged, never surfaced to the caller.
    pub fn log_access(&self, staff: &str, action: &str, detail: &str) {
        if let Some(entries) = self.audit.push(staff, action, detail) {
            self.flush_entries(&entries);
        }
    }

    /// Flush any buffered audit entries immediately (shutdown path).
    pub fn flush_audit(&self) {
        let entries = self.audit.drain();
        if !entries.is_empty() {
            self.flush_entries(&entries);
        }
    }

    fn flush_entries(&self, entries: &[AuditEntry]) {
        match self.open_db() {
            Ok(conn) => {
                if let Err(e) = db::insert_audit_entries(&conn, entries) {
                    tracing::warn!(error = %e, "Audit flush failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Audit flush could not open database"),
        }
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new()
    }
}
