// Session History Store
// Process-local, per-session audit trail of completed analyses.
// Append-only, unbounded, volatile; entries are never mutated and the whole
// map dies with the process. Also owns the one-analysis-in-flight-per-session
// guard the submit handler takes before calling out.

use crate::models::{HistoryEntry, Verdict};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct SessionState {
    /// Most-recent-first, like the list the form renders.
    entries: Vec<HistoryEntry>,
    in_flight: bool,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, SessionState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed analysis for `session_id` and return the new entry.
    pub fn append(&self, session_id: &str, text: &str, verdict: Verdict) -> HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
            text: text.to_string(),
            verdict,
        };

        let mut sessions = self.inner.lock().expect("session store lock");
        sessions
            .entry(session_id.to_string())
            .or_default()
            .entries
            .insert(0, entry.clone());
        entry
    }

    /// All entries for the session, most-recent-first. Unknown sessions list
    /// as empty rather than erroring.
    pub fn list(&self, session_id: &str) -> Vec<HistoryEntry> {
        let sessions = self.inner.lock().expect("session store lock");
        sessions
            .get(session_id)
            .map(|s| s.entries.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, session_id: &str, entry_id: &str) -> Option<HistoryEntry> {
        let sessions = self.inner.lock().expect("session store lock");
        sessions
            .get(session_id)?
            .entries
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
    }

    /// Take the session's analysis slot. Returns `None` while another
    /// analysis for the same session is still running; the slot frees when
    /// the returned guard drops, including on error paths.
    pub fn begin(&self, session_id: &str) -> Option<InFlightGuard> {
        let mut sessions = self.inner.lock().expect("session store lock");
        let state = sessions.entry(session_id.to_string()).or_default();
        if state.in_flight {
            return None;
        }
        state.in_flight = true;
        Some(InFlightGuard {
            inner: self.inner.clone(),
            session_id: session_id.to_string(),
        })
    }
}

pub struct InFlightGuard {
    inner: Arc<Mutex<HashMap<String, SessionState>>>,
    session_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut sessions) = self.inner.lock() {
            if let Some(state) = sessions.get_mut(&self.session_id) {
                state.in_flight = false;
            }
        }
    }
}
