//! Default schedules and component state built from `[tasks]` / `[components]`.

use std::collections::BTreeMap;

use ck_domain::config::{Config, TaskDefaults};
use ck_schedule::{ComponentStatus, DefaultScheduleRegistry, FieldKind, Schedule};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

/// Registry backed by the loaded config.
///
/// `R` fields are expanded with an RNG seeded from the task id, so every
/// invocation sees the same default for the same task.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    defaults: BTreeMap<String, Schedule>,
    config: Config,
}

impl ConfigRegistry {
    pub fn from_config(config: &Config) -> Self {
        let defaults = config
            .tasks
            .iter()
            .map(|(id, task)| (id.clone(), build_default(id, task)))
            .collect();
        Self {
            defaults,
            config: config.clone(),
        }
    }

    /// Registered task ids, sorted.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.defaults.keys().map(String::as_str)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.defaults.contains_key(task_id)
    }
}

impl DefaultScheduleRegistry for ConfigRegistry {
    fn default_schedule(&self, task_id: &str) -> Option<Schedule> {
        self.defaults.get(task_id).cloned()
    }
}

impl ComponentStatus for ConfigRegistry {
    fn is_component_enabled(&self, component: &str) -> bool {
        self.config.component_enabled(component)
    }
}

fn build_default(task_id: &str, task: &TaskDefaults) -> Schedule {
    let mut rng = StdRng::seed_from_u64(seed_for(task_id));
    let mut schedule = Schedule::new(task_id).with_component(task.component.as_str());
    let fields = [
        (FieldKind::Minute, &task.minute),
        (FieldKind::Hour, &task.hour),
        (FieldKind::Day, &task.day),
        (FieldKind::Month, &task.month),
        (FieldKind::DayOfWeek, &task.day_of_week),
    ];
    for (kind, expression) in fields {
        schedule.set_field_with_rng(kind, expression, &mut rng);
    }
    schedule.set_disabled(task.disabled);
    schedule.set_run_if_component_disabled(task.run_if_component_disabled);
    schedule
}

/// First eight bytes of SHA-256(task id), little-endian.
fn seed_for(task_id: &str) -> u64 {
    let digest = Sha256::digest(task_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
