use directories::ProjectDirs;
use std::path::PathBuf;

const DATA_DIR_ENV: &str = "RIDEBATTLE_DATA_DIR";

/// Where the ride store and settings live on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

impl AppPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// `RIDEBATTLE_DATA_DIR` if set, else the platform data directory.
    pub fn resolve() -> Option<Self> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Some(Self::new(dir));
        }
        ProjectDirs::from("", "", "ridebattle")
            .map(|proj_dirs| Self::new(proj_dirs.data_local_dir()))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("ridebattle.sqlite3")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}
