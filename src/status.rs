//! Process-wide view of every session's connection indicator, plus the
//! latest outstanding pairing challenge. Sessions write only their own
//! entry; `!status` and the gateway read a published snapshot.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Online,
    Offline,
}

impl Indicator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "🟢 Online",
            Self::Offline => "🔴 Offline",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PairingChallenge {
    pub session: String,
    pub payload: String,
}

#[derive(Default)]
struct Inner {
    sessions: BTreeMap<String, Indicator>,
    /// Most recent outstanding challenge across all sessions; the panel's
    /// `/qr` page renders this one.
    pairing: Option<PairingChallenge>,
}

pub struct StatusBoard {
    started_at: Instant,
    inner: Mutex<Inner>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Makes a session known (offline) without touching an existing entry.
    pub fn register(&self, session: &str) {
        self.inner
            .lock()
            .sessions
            .entry(session.to_string())
            .or_insert(Indicator::Offline);
    }

    pub fn mark_online(&self, session: &str) {
        let mut inner = self.inner.lock();
        inner
            .sessions
            .insert(session.to_string(), Indicator::Online);
        if inner
            .pairing
            .as_ref()
            .is_some_and(|p| p.session == session)
        {
            inner.pairing = None;
        }
    }

    pub fn mark_offline(&self, session: &str) {
        self.inner
            .lock()
            .sessions
            .insert(session.to_string(), Indicator::Offline);
    }

    /// A newer challenge replaces any prior one, whichever session it
    /// belongs to.
    pub fn set_pairing(&self, session: &str, payload: &str) {
        self.inner.lock().pairing = Some(PairingChallenge {
            session: session.to_string(),
            payload: payload.to_string(),
        });
    }

    pub fn latest_pairing(&self) -> Option<PairingChallenge> {
        self.inner.lock().pairing.clone()
    }

    pub fn any_online(&self) -> bool {
        self.inner
            .lock()
            .sessions
            .values()
            .any(|i| *i == Indicator::Online)
    }

    pub fn indicator(&self, session: &str) -> Option<Indicator> {
        self.inner.lock().sessions.get(session).copied()
    }

    /// One `• *name*: indicator` line per known session.
    pub fn status_lines(&self) -> Vec<String> {
        self.inner
            .lock()
            .sessions
            .iter()
            .map(|(name, indicator)| format!("• *{name}*: {indicator}"))
            .collect()
    }

    pub fn snapshot_json(&self) -> serde_json::Value {
        let inner = self.inner.lock();
        let sessions: BTreeMap<&String, &'static str> = inner
            .sessions
            .iter()
            .map(|(name, indicator)| (name, indicator.as_str()))
            .collect();
        serde_json::json!({
            "status": "ok",
            "pid": std::process::id(),
            "uptime_seconds": self.started_at.elapsed().as_secs(),
            "connected": inner.sessions.values().any(|i| *i == Indicator::Online),
            "pairing_outstanding": inner.pairing.is_some(),
            "sessions": sessions,
        })
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
