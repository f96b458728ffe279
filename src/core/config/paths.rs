use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::ApiError;

const WRITE_PROBE: &str = ".paperweather-write-probe";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub data_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub vector_db_dir: PathBuf,
    pub log_dir: PathBuf,
    pub history_db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_lookup(cwd, |key| env::var(key).ok())
    }

    /// Resolve `PAPERWEATHER_ROOT` and `PAPERWEATHER_DATA_DIR` through `lookup`,
    /// falling back to `default_root` and `<root>/data`.
    pub fn from_lookup<F>(default_root: PathBuf, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let project_root = lookup("PAPERWEATHER_ROOT")
            .map(PathBuf::from)
            .unwrap_or(default_root);
        let data_dir = lookup("PAPERWEATHER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| project_root.join("data"));
        Self::with_layout(project_root, data_dir)
    }

    /// Re-resolve with the `.env` file at the project root as a second source.
    /// Values from `lookup` win over the file.
    pub fn with_env_file<F>(&self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: HashMap<String, String> = dotenvy::from_path_iter(self.env_file())
            .map(|entries| entries.filter_map(Result::ok).collect())
            .unwrap_or_default();

        Self::from_lookup(self.project_root.clone(), |key| {
            lookup(key).or_else(|| file.get(key).cloned())
        })
    }

    /// Lay out every directory under an explicit root and data directory.
    pub fn with_layout(project_root: PathBuf, data_dir: PathBuf) -> Self {
        AppPaths {
            pdf_dir: data_dir.join("pdfs"),
            documents_dir: data_dir.join("documents"),
            vector_db_dir: data_dir.join("vector_db"),
            log_dir: data_dir.join("logs"),
            history_db_path: data_dir.join("history.db"),
            project_root,
            data_dir,
        }
    }

    pub fn data_directories(&self) -> [&Path; 5] {
        [
            &self.data_dir,
            &self.pdf_dir,
            &self.documents_dir,
            &self.vector_db_dir,
            &self.log_dir,
        ]
    }

    /// Create every data directory and check that each one accepts writes.
    pub fn ensure_directories(&self) -> Result<(), ApiError> {
        for dir in self.data_directories() {
            fs::create_dir_all(dir).map_err(|e| {
                ApiError::Internal(format!("Failed to create {}: {}", dir.display(), e))
            })?;
            check_writable(dir)?;
        }
        Ok(())
    }

    pub fn env_file(&self) -> PathBuf {
        self.project_root.join(".env")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn check_writable(dir: &Path) -> Result<(), ApiError> {
    let probe = dir.join(WRITE_PROBE);
    fs::write(&probe, b"ok")
        .and_then(|_| fs::remove_file(&probe))
        .map_err(|e| ApiError::Internal(format!("{} is not writable: {}", dir.display(), e)))
}
