//! OverrideStore — user changes to task schedules, persisted as JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ck_domain::{Error, Result};
use ck_schedule::{DefaultScheduleRegistry, Schedule, SchedulePersistence};
use parking_lot::RwLock;

pub struct OverrideStore {
    inner: RwLock<BTreeMap<String, Schedule>>,
    persist_path: PathBuf,
}

impl OverrideStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self {
            inner: RwLock::new(BTreeMap::new()),
            persist_path: path.to_path_buf(),
        };
        store.load()?;
        Ok(store)
    }

    fn load(&self) -> Result<()> {
        if !self.persist_path.exists() {
            return Ok(());
        }
        let data = std::fs::read_to_string(&self.persist_path)?;
        let schedules: Vec<Schedule> = serde_json::from_str(&data)?;
        let mut map = self.inner.write();
        for mut s in schedules {
            s.set_overridden(true);
            map.insert(s.task_id().to_string(), s);
        }
        tracing::info!(
            count = map.len(),
            path = %self.persist_path.display(),
            "loaded schedule overrides"
        );
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let json = {
            let map = self.inner.read();
            let schedules: Vec<&Schedule> = map.values().collect();
            serde_json::to_string_pretty(&schedules)?
        };
        if let Some(parent) = self.persist_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.persist_error(e))?;
            }
        }
        std::fs::write(&self.persist_path, json).map_err(|e| self.persist_error(e))
    }

    fn persist_error(&self, e: std::io::Error) -> Error {
        Error::Persistence(format!("{}: {e}", self.persist_path.display()))
    }

    pub fn get(&self, task_id: &str) -> Option<Schedule> {
        self.inner.read().get(task_id).cloned()
    }

    pub fn list(&self) -> Vec<Schedule> {
        self.inner.read().values().cloned().collect()
    }

    /// Drop the override for `task_id`. Returns whether one existed.
    pub fn remove(&self, task_id: &str) -> Result<bool> {
        let removed = self.inner.write().remove(task_id).is_some();
        if removed {
            self.persist()?;
            tracing::info!(task = task_id, "schedule override removed");
        }
        Ok(removed)
    }

    /// The override for `task_id` if there is one, else the registered default.
    pub fn effective(
        &self,
        registry: &dyn DefaultScheduleRegistry,
        task_id: &str,
    ) -> Option<Schedule> {
        self.get(task_id).or_else(|| registry.default_schedule(task_id))
    }
}

impl SchedulePersistence for OverrideStore {
    fn save_override(&self, schedule: &Schedule) -> Result<()> {
        let mut stored = schedule.clone();
        stored.set_overridden(true);
        self.inner.write().insert(stored.task_id().to_string(), stored);
        self.persist()
    }
}
