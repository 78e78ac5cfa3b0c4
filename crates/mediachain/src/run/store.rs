//! Run record persistence.
//!
//! Every backend stores the full [`Run`] as JSON and returns `list` results
//! newest first. Concurrent writers to the same run are not coordinated; the
//! last `put` wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::SecondsFormat;

use crate::config::{StoreBackend, StoreConfig};
use crate::db::{self, run_repo, Database};
use crate::error::StoreError;
use crate::storage::filesystem;

use super::model::Run;

pub trait RunStore: Send + Sync {
    fn put(&self, run: &Run) -> Result<(), StoreError>;
    fn get(&self, run_id: &str) -> Result<Option<Run>, StoreError>;
    /// At most `limit` runs, most recently created first.
    fn list(&self, limit: usize) -> Result<Vec<Run>, StoreError>;
}

/// Opens the backend named in config. Relative to `data_dir` unless the
/// config gives an explicit path.
pub fn open_store(config: &StoreConfig, data_dir: &Path) -> Result<Arc<dyn RunStore>, StoreError> {
    let store: Arc<dyn RunStore> = match config.backend {
        StoreBackend::Json => {
            let dir = config
                .path
                .clone()
                .unwrap_or_else(|| data_dir.join("runs"));
            Arc::new(JsonFileRunStore::open(dir)?)
        }
        StoreBackend::Sqlite => {
            let path = config
                .path
                .clone()
                .unwrap_or_else(|| db::default_database_path(data_dir));
            Arc::new(SqliteRunStore::new(Database::open(&path)?))
        }
        StoreBackend::Memory => Arc::new(MemoryRunStore::new()),
    };
    Ok(store)
}

fn newest_first(mut runs: Vec<Run>, limit: usize) -> Vec<Run> {
    runs.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.run_id.cmp(&b.run_id))
    });
    runs.truncate(limit);
    runs
}

/// Run ids become directory names, so anything path-like is refused.
fn is_safe_run_id(run_id: &str) -> bool {
    !run_id.is_empty()
        && run_id != "."
        && run_id != ".."
        && !run_id.contains(['/', '\\'])
}

/// One directory per run: `<runs_dir>/<run_id>/run.json`.
pub struct JsonFileRunStore {
    runs_dir: PathBuf,
}

impl JsonFileRunStore {
    pub const RECORD_NAME: &'static str = "run.json";

    pub fn open<P: AsRef<Path>>(runs_dir: P) -> Result<Self, StoreError> {
        let runs_dir = runs_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&runs_dir).map_err(|e| StoreError::CreateDirectory {
            path: runs_dir.clone(),
            source: e,
        })?;
        log::info!("JSON run store at {}", runs_dir.display());
        Ok(Self { runs_dir })
    }

    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    fn record_path(&self, run_id: &str) -> PathBuf {
        self.runs_dir.join(run_id).join(Self::RECORD_NAME)
    }

    fn read_record(path: &Path) -> Result<Run, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl RunStore for JsonFileRunStore {
    fn put(&self, run: &Run) -> Result<(), StoreError> {
        if !is_safe_run_id(&run.run_id) {
            return Err(StoreError::InvalidRunId(run.run_id.clone()));
        }
        let body = serde_json::to_vec_pretty(run)?;
        filesystem::write_atomic(&self.record_path(&run.run_id), &body)?;
        Ok(())
    }

    fn get(&self, run_id: &str) -> Result<Option<Run>, StoreError> {
        if !is_safe_run_id(run_id) {
            return Ok(None);
        }
        let path = self.record_path(run_id);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn list(&self, limit: usize) -> Result<Vec<Run>, StoreError> {
        let entries = match std::fs::read_dir(&self.runs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.runs_dir.clone(),
                    source: e,
                })
            }
        };

        let mut runs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path().join(Self::RECORD_NAME);
            if !path.is_file() {
                continue;
            }
            match Self::read_record(&path) {
                Ok(run) => runs.push(run),
                Err(e) => log::warn!("Skipping unreadable run record {}: {}", path.display(), e),
            }
        }
        Ok(newest_first(runs, limit))
    }
}

/// Runs in the `runs` table, full record in the `body` column.
pub struct SqliteRunStore {
    db: Database,
}

impl SqliteRunStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }
}

impl RunStore for SqliteRunStore {
    fn put(&self, run: &Run) -> Result<(), StoreError> {
        let row = run_repo::RunRow {
            id: run.run_id.clone(),
            blueprint: run.blueprint_name.clone(),
            status: run.status.as_str().to_string(),
            created_at: run.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            updated_at: run.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            body: serde_json::to_string(run)?,
        };
        run_repo::upsert(&self.db, &row)?;
        Ok(())
    }

    fn get(&self, run_id: &str) -> Result<Option<Run>, StoreError> {
        match run_repo::find_by_id(&self.db, run_id)? {
            Some(row) => Ok(Some(serde_json::from_str(&row.body)?)),
            None => Ok(None),
        }
    }

    /// Ordering and the limit are applied in SQL; corrupt rows are skipped
    /// after the limit, so a page can come back short.
    fn list(&self, limit: usize) -> Result<Vec<Run>, StoreError> {
        let mut runs = Vec::new();
        for row in run_repo::list_recent(&self.db, limit)? {
            match serde_json::from_str::<Run>(&row.body) {
                Ok(run) => runs.push(run),
                Err(e) => log::warn!("Skipping corrupt run row {}: {}", row.id, e),
            }
        }
        Ok(runs)
    }
}

#[derive(Default)]
pub struct MemoryRunStore {
    runs: RwLock<HashMap<String, Run>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStore for MemoryRunStore {
    fn put(&self, run: &Run) -> Result<(), StoreError> {
        let mut runs = self.runs.write().map_err(|_| StoreError::LockPoisoned)?;
        runs.insert(run.run_id.clone(), run.clone());
        Ok(())
    }

    fn get(&self, run_id: &str) -> Result<Option<Run>, StoreError> {
        let runs = self.runs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(runs.get(run_id).cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<Run>, StoreError> {
        let runs = self.runs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(newest_first(runs.values().cloned().collect(), limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::DeliverableTemplate;
    use chrono::{Duration, Utc};
    use serde_json::Map;
    use tempfile::TempDir;

    fn run_at(offset_secs: i64) -> Run {
        let mut run = Run::new(
            "social_pack",
            &[DeliverableTemplate::new("TikTok vertical cut", "social_cut")],
            Map::new(),
            Map::new(),
        );
        run.created_at = Utc::now() + Duration::seconds(offset_secs);
        run.updated_at = run.created_at;
        run
    }

    fn exercise(store: &dyn RunStore) {
        let older = run_at(-60);
        let newer = run_at(0);
        store.put(&older).unwrap();
        store.put(&newer).unwrap();

        assert_eq!(store.get(&older.run_id).unwrap(), Some(older.clone()));
        assert!(store.get("does-not-exist").unwrap().is_none());

        let ids: Vec<String> = store.list(10).unwrap().into_iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![newer.run_id.clone(), older.run_id.clone()]);

        let ids: Vec<String> = store.list(1).unwrap().into_iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![newer.run_id.clone()]);

        let mut updated = older.clone();
        updated.labels.insert("campaign".to_string(), "spring".into());
        store.put(&updated).unwrap();
        assert_eq!(store.get(&older.run_id).unwrap().unwrap().labels["campaign"], "spring");
        assert_eq!(store.list(10).unwrap().len(), 2);
    }

    #[test]
    fn test_json_store_contract() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileRunStore::open(temp_dir.path().join("runs")).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_sqlite_store_contract() {
        let store = SqliteRunStore::open_in_memory().unwrap();
        exercise(&store);
    }

    #[test]
    fn test_memory_store_contract() {
        exercise(&MemoryRunStore::new());
    }

    #[test]
    fn test_json_store_layout_and_corrupt_entries() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileRunStore::open(temp_dir.path()).unwrap();
        let run = run_at(0);
        store.put(&run).unwrap();

        assert!(temp_dir.path().join(&run.run_id).join("run.json").is_file());

        let broken = temp_dir.path().join("broken");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join("run.json"), b"{not json").unwrap();

        let runs = store.list(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert!(store.get("broken").is_err());
    }

    #[test]
    fn test_json_store_rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileRunStore::open(temp_dir.path()).unwrap();
        let mut run = run_at(0);
        run.run_id = "../escape".to_string();

        assert!(matches!(store.put(&run), Err(StoreError::InvalidRunId(_))));
        assert!(store.get("../escape").unwrap().is_none());
    }

    #[test]
    fn test_open_store_backends() {
        let temp_dir = TempDir::new().unwrap();

        let json = open_store(
            &StoreConfig {
                backend: StoreBackend::Json,
                path: None,
            },
            temp_dir.path(),
        )
        .unwrap();
        json.put(&run_at(0)).unwrap();
        assert!(temp_dir.path().join("runs").is_dir());

        let sqlite = open_store(
            &StoreConfig {
                backend: StoreBackend::Sqlite,
                path: None,
            },
            temp_dir.path(),
        )
        .unwrap();
        sqlite.put(&run_at(0)).unwrap();
        assert!(temp_dir.path().join("runs.db").is_file());
    }
}
