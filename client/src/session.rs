//! Client session lifecycle.
//!
//! A session is a single timestamp written to one persistent slot. It is a
//! client-local assertion of "logged in", re-validated against on-chain
//! state on every page mount; expiry is age-based with a 24 hour TTL.
//!
//! The service takes its slot and clock by injection so tests can substitute
//! a fake of either. There is no locking around the slot: last writer wins,
//! which is acceptable for human-driven single-profile use.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::warn;

use crate::errors::Result;

/// Session time-to-live in milliseconds (24 hours).
pub const SESSION_TTL_MS: i64 = 86_400_000;

/// One persistent key-value slot holding a millisecond timestamp string.
pub trait SessionSlot: Send + Sync {
    fn read(&self) -> Option<String>;
    fn write(&self, value: &str) -> Result<()>;
    fn clear(&self);
}

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

// ─────────────────────────────────────────────────────────
// Slot implementations
// ─────────────────────────────────────────────────────────

/// File-backed slot; survives process restarts the way browser local
/// storage survives page reloads.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: PathBuf) -> Self {
        FileSlot { path }
    }
}

impl SessionSlot for FileSlot {
    fn read(&self) -> Option<String> {
        fs::read_to_string(&self.path).ok()
    }

    fn write(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, value)?;
        Ok(())
    }

    fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to clear session slot: {e}");
            }
        }
    }
}

/// In-memory slot for tests.
#[derive(Clone, Default)]
pub struct MemorySlot {
    value: Arc<Mutex<Option<String>>>,
}

impl MemorySlot {
    pub fn snapshot(&self) -> Option<String> {
        self.value.lock().unwrap().clone()
    }
}

impl SessionSlot for MemorySlot {
    fn read(&self) -> Option<String> {
        self.value.lock().unwrap().clone()
    }

    fn write(&self, value: &str) -> Result<()> {
        *self.value.lock().unwrap() = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) {
        *self.value.lock().unwrap() = None;
    }
}

// ─────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────

pub struct SessionService {
    slot: Box<dyn SessionSlot>,
    clock: Box<dyn Clock>,
}

impl SessionService {
    pub fn new(slot: Box<dyn SessionSlot>, clock: Box<dyn Clock>) -> Self {
        SessionService { slot, clock }
    }

    /// Begin a session now. Overwrites any previous session.
    pub fn start(&self) -> Result<()> {
        self.slot.write(&self.clock.now_ms().to_string())
    }

    /// True when no session was started within the TTL. A stale or garbled
    /// slot is eagerly cleared, so asking twice yields `true` twice.
    pub fn expired(&self) -> bool {
        if let Some(raw) = self.slot.read() {
            if let Ok(started) = raw.trim().parse::<i64>() {
                if self.clock.now_ms() - started < SESSION_TTL_MS {
                    return false;
                }
            }
        }
        self.slot.clear();
        true
    }

    /// Drop the session unconditionally.
    pub fn end(&self) {
        self.slot.clear();
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
