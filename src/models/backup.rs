use super::prompt::{lenient_string, Prompt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BackupReason {
    Startup,
    Update,
    PreImport,
    PreRestore,
    Manual,
}

impl BackupReason {
    /// Startup and update snapshots are fired by the browser, not by the user.
    pub fn is_automatic(self) -> bool {
        matches!(self, BackupReason::Startup | BackupReason::Update)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackupReason::Startup => "startup",
            BackupReason::Update => "update",
            BackupReason::PreImport => "pre-import",
            BackupReason::PreRestore => "pre-restore",
            BackupReason::Manual => "manual",
        }
    }
}

impl fmt::Display for BackupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "startup" => Ok(BackupReason::Startup),
            "update" => Ok(BackupReason::Update),
            "pre-import" => Ok(BackupReason::PreImport),
            "pre-restore" => Ok(BackupReason::PreRestore),
            "manual" => Ok(BackupReason::Manual),
            other => Err(format!("unknown backup reason '{}'", other)),
        }
    }
}

/// Point-in-time copy of the whole prompt collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
    /// ISO-8601 rendering of `timestamp`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    pub reason: BackupReason,
    #[serde(default)]
    pub prompt_count: usize,
    #[serde(default)]
    pub prompts: Vec<Prompt>,
}
