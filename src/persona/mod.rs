//! Per-session persona persistence: assistant name, owner identity,
//! offline reason, online flag.
//!
//! Every read substitutes a documented default when the record is absent
//! or malformed; a broken file on disk never propagates an error.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ASSISTANT: &str = "Bot";
pub const DEFAULT_OWNER: &str = "Pemilik";
pub const DEFAULT_REASON: &str = "Owner sedang offline.";
pub const DEFAULT_REASON_TIME: &str = "Waktu tidak tersedia.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Accepts exactly `male`/`female` (already lowercased by the caller);
    /// anything else is treated as unset.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Owner {
    pub name: String,
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone)]
pub struct OfflineReason {
    pub reason: String,
    pub time: String,
}

/// Key/value persistence for one session's persona.
///
/// Implementations may cache or read through on every call; the only
/// requirement is that a session's reads observe its own latest write.
pub trait PersonaStore: Send + Sync {
    fn assistant_name(&self, session: &str) -> String;
    fn set_assistant_name(&self, session: &str, name: &str) -> Result<()>;

    fn owner(&self, session: &str) -> Owner;
    /// Persists the name; the gender is only persisted when given
    /// (an existing persisted gender is left untouched otherwise).
    fn set_owner(&self, session: &str, name: &str, gender: Option<Gender>) -> Result<()>;

    fn offline_reason(&self, session: &str) -> OfflineReason;
    fn set_offline_reason(&self, session: &str, reason: &str, time: &str) -> Result<()>;

    /// Defaults to `true` when no flag was ever persisted.
    fn online_flag(&self, session: &str) -> bool;
    fn set_online_flag(&self, session: &str, online: bool) -> Result<()>;
}

// ── On-disk records ───────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct AssistantRecord {
    #[serde(default)]
    assistant: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OwnerRecord {
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    gender: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReasonRecord {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    time: Option<String>,
}

/// File-backed store: one directory per session holding small JSON
/// records, plus a shared `status.json` mapping session name → online flag.
pub struct JsonPersonaStore {
    root: PathBuf,
}

impl JsonPersonaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_file(&self, session: &str, file: &str) -> PathBuf {
        self.root.join(session).join(file)
    }

    fn status_file(&self) -> PathBuf {
        self.root.join("status.json")
    }

    fn read_record<T: DeserializeOwned + Default>(path: &Path) -> Option<T> {
        let raw = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("malformed persona record {}: {e}", path.display());
                None
            }
        }
    }

    fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let data = serde_json::to_vec_pretty(record)?;
        fs::write(path, data).with_context(|| format!("writing {}", path.display()))
    }

    fn read_status_map(&self) -> BTreeMap<String, bool> {
        Self::read_record(&self.status_file()).unwrap_or_default()
    }
}

impl PersonaStore for JsonPersonaStore {
    fn assistant_name(&self, session: &str) -> String {
        let record: Option<AssistantRecord> =
            Self::read_record(&self.session_file(session, "defaultAssistant.json"));
        record
            .and_then(|r| r.assistant)
            .unwrap_or_else(|| DEFAULT_ASSISTANT.to_string())
    }

    fn set_assistant_name(&self, session: &str, name: &str) -> Result<()> {
        Self::write_record(
            &self.session_file(session, "defaultAssistant.json"),
            &AssistantRecord {
                assistant: Some(name.to_string()),
            },
        )
    }

    fn owner(&self, session: &str) -> Owner {
        let record: OwnerRecord =
            Self::read_record(&self.session_file(session, "owner.json")).unwrap_or_default();
        Owner {
            name: record.owner.unwrap_or_else(|| DEFAULT_OWNER.to_string()),
            gender: record
                .gender
                .as_deref()
                .and_then(|g| Gender::parse(&g.to_lowercase())),
        }
    }

    fn set_owner(&self, session: &str, name: &str, gender: Option<Gender>) -> Result<()> {
        let path = self.session_file(session, "owner.json");
        let mut record: OwnerRecord = Self::read_record(&path).unwrap_or_default();
        record.owner = Some(name.to_string());
        if let Some(g) = gender {
            record.gender = Some(g.as_str().to_string());
        }
        Self::write_record(&path, &record)
    }

    fn offline_reason(&self, session: &str) -> OfflineReason {
        let record: ReasonRecord =
            Self::read_record(&self.session_file(session, "offlineReason.json"))
                .unwrap_or_default();
        OfflineReason {
            reason: record.reason.unwrap_or_else(|| DEFAULT_REASON.to_string()),
            time: record
                .time
                .unwrap_or_else(|| DEFAULT_REASON_TIME.to_string()),
        }
    }

    fn set_offline_reason(&self, session: &str, reason: &str, time: &str) -> Result<()> {
        Self::write_record(
            &self.session_file(session, "offlineReason.json"),
            &ReasonRecord {
                reason: Some(reason.to_string()),
                time: Some(time.to_string()),
            },
        )
    }

    fn online_flag(&self, session: &str) -> bool {
        self.read_status_map().get(session).copied().unwrap_or(true)
    }

    fn set_online_flag(&self, session: &str, online: bool) -> Result<()> {
        let mut map = self.read_status_map();
        map.insert(session.to_string(), online);
        Self::write_record(&self.status_file(), &map)
    }
}
