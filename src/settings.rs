use anyhow::{anyhow, Context, Result};
use chrono::Locale;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    leaderboard::{demo_pool, LeaderEntry},
    stats::Period,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub profile_name: String,
    /// Comparison pool for the leaderboard.
    pub leaderboard_pool: Vec<LeaderEntry>,
    pub default_period: Period,
    /// POSIX locale name used for chart labels, e.g. `ru_RU`.
    pub locale: String,
}

pub const DEFAULT_LOCALE: &str = "ru_RU";

fn parse_locale(name: &str) -> Option<Locale> {
    Locale::try_from(name).ok()
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            profile_name: "Alex Rider".into(),
            leaderboard_pool: demo_pool(),
            default_period: Period::Week,
            locale: DEFAULT_LOCALE.into(),
        }
    }
}

/// JSON-file backed user settings. A missing or unreadable file gives the
/// defaults; every update is written through immediately.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn profile_name(&self) -> String {
        self.read().profile_name.clone()
    }

    pub fn leaderboard_pool(&self) -> Vec<LeaderEntry> {
        self.read().leaderboard_pool.clone()
    }

    pub fn default_period(&self) -> Period {
        self.read().default_period
    }

    /// Locale for chart labels. An unknown name in the file falls back to
    /// the default.
    pub fn chart_locale(&self) -> Locale {
        let name = self.read().locale.clone();
        parse_locale(&name).unwrap_or_else(|| {
            log::warn!("Unknown locale '{name}', using {DEFAULT_LOCALE}");
            Locale::ru_RU
        })
    }

    pub fn update_profile_name(&self, name: impl Into<String>) -> Result<()> {
        let mut guard = self.write();
        guard.profile_name = name.into();
        self.persist(&guard)
    }

    pub fn update_leaderboard_pool(&self, pool: Vec<LeaderEntry>) -> Result<()> {
        let mut guard = self.write();
        guard.leaderboard_pool = pool;
        self.persist(&guard)
    }

    pub fn update_default_period(&self, period: Period) -> Result<()> {
        let mut guard = self.write();
        guard.default_period = period;
        self.persist(&guard)
    }

    pub fn update_locale(&self, name: &str) -> Result<()> {
        parse_locale(name).ok_or_else(|| anyhow!("unknown locale '{name}'"))?;
        let mut guard = self.write();
        guard.locale = name.to_string();
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
