//! Session discovery and supervision.
//!
//! The supervisor owns the restart decision: a machine instance reports
//! how it ended, and only a non-terminal disconnect earns a replacement
//! instance (fresh transport subscription, same session directory).
//! Reconnects back off exponentially up to a cap; a successful connect
//! resets the backoff.

use super::machine::{MachineExit, SessionRuntime};
use crate::persona::PersonaStore;
use crate::status::StatusBoard;
use crate::transport::Transport;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Session directories must carry this prefix to be picked up.
pub const SESSION_DIR_PREFIX: &str = "auth_info_";

/// One discovered chat-account identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId {
    /// Directory basename; doubles as the unique session name.
    pub name: String,
    /// Credential directory handed to the transport.
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("sessions root {} is unreadable: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Enumerates eligible session directories under `root`.
pub fn discover_sessions(root: &Path) -> Result<Vec<SessionId>, DiscoveryError> {
    let entries = fs::read_dir(root).map_err(|source| DiscoveryError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut sessions = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(SESSION_DIR_PREFIX) {
            sessions.push(SessionId {
                name: name.to_string(),
                path,
            });
        }
    }

    sessions.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sessions)
}

/// Builds a fresh transport for a session. Called once per machine
/// instance so a restart gets its own event subscription.
pub type TransportFactory = dyn Fn(&SessionId) -> Arc<dyn Transport> + Send + Sync;

pub struct Supervisor {
    store: Arc<dyn PersonaStore>,
    board: Arc<StatusBoard>,
    transports: Arc<TransportFactory>,
    cooldown_window: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Supervisor {
    pub fn new(
        store: Arc<dyn PersonaStore>,
        board: Arc<StatusBoard>,
        transports: Arc<TransportFactory>,
        cooldown_window: Duration,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            store,
            board,
            transports,
            cooldown_window,
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    /// Starts one supervised task per session and returns the handles.
    pub fn start_all(&self, sessions: Vec<SessionId>) -> Vec<JoinHandle<()>> {
        sessions.into_iter().map(|id| self.spawn_session(id)).collect()
    }

    pub fn spawn_session(&self, id: SessionId) -> JoinHandle<()> {
        self.board.register(&id.name);
        let store = self.store.clone();
        let board = self.board.clone();
        let transports = self.transports.clone();
        let window = self.cooldown_window;
        let initial = self.initial_backoff;
        let max = self.max_backoff;

        tokio::spawn(async move {
            supervise_session(id, store, board, transports, window, initial, max).await;
        })
    }
}

async fn supervise_session(
    id: SessionId,
    store: Arc<dyn PersonaStore>,
    board: Arc<StatusBoard>,
    transports: Arc<TransportFactory>,
    cooldown_window: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
) {
    let mut backoff = initial_backoff;

    loop {
        let transport = (transports)(&id);
        let (tx, mut rx) = mpsc::channel(64);

        let pump = {
            let transport = transport.clone();
            let name = id.name.clone();
            tokio::spawn(async move {
                if let Err(e) = transport.run(tx).await {
                    tracing::error!("[{name}] transport failed: {e:#}");
                }
            })
        };

        let mut session = SessionRuntime::new(
            id.name.clone(),
            transport,
            store.clone(),
            board.clone(),
            cooldown_window,
        );
        let exit = session.run(&mut rx).await;
        pump.abort();

        if session.saw_connection() {
            backoff = initial_backoff;
        }

        match exit {
            MachineExit::LoggedOut => {
                tracing::info!("[{}] session ended by logout, not restarting", id.name);
                break;
            }
            MachineExit::Restart => {
                tracing::warn!(
                    "[{}] reconnecting in {}s",
                    id.name,
                    backoff.as_secs()
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2).min(max_backoff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_picks_prefixed_directories_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("auth_info_beta")).unwrap();
        fs::create_dir(dir.path().join("auth_info_alfa")).unwrap();
        fs::create_dir(dir.path().join("scratch")).unwrap();
        fs::write(dir.path().join("auth_info_file"), b"not a dir").unwrap();

        let sessions = discover_sessions(dir.path()).unwrap();
        let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["auth_info_alfa", "auth_info_beta"]);
        assert_eq!(sessions[0].path, dir.path().join("auth_info_alfa"));
    }

    #[test]
    fn discovery_of_empty_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_sessions(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn unreadable_root_is_a_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();

        let err = discover_sessions(&file).expect_err("file is not a directory");
        let DiscoveryError::RootUnreadable { path, .. } = err;
        assert_eq!(path, file);
    }
}
