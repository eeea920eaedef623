//! Enable/disable and customisation tracking against injected collaborators.

use ck_domain::{Error, Result};
use tracing::{info, warn};

use crate::model::Schedule;

/// Supplies a task's out-of-the-box schedule.
pub trait DefaultScheduleRegistry {
    fn default_schedule(&self, task_id: &str) -> Option<Schedule>;
}

/// Durably records a schedule override.
pub trait SchedulePersistence {
    fn save_override(&self, schedule: &Schedule) -> Result<()>;
}

/// Reports whether the component that owns a task is enabled.
pub trait ComponentStatus {
    fn is_component_enabled(&self, component: &str) -> bool;
}

/// Lifecycle operations over borrowed collaborators.
pub struct ScheduleLifecycle<'a> {
    registry: &'a dyn DefaultScheduleRegistry,
    persistence: &'a dyn SchedulePersistence,
    components: &'a dyn ComponentStatus,
}

impl<'a> ScheduleLifecycle<'a> {
    pub fn new(
        registry: &'a dyn DefaultScheduleRegistry,
        persistence: &'a dyn SchedulePersistence,
        components: &'a dyn ComponentStatus,
    ) -> Self {
        Self {
            registry,
            persistence,
            components,
        }
    }

    /// The owning component is enabled, or the task opted to run anyway.
    pub fn can_run(&self, schedule: &Schedule) -> bool {
        self.components.is_component_enabled(schedule.component())
            || schedule.run_if_component_disabled()
    }

    pub fn is_enabled(&self, schedule: &Schedule) -> bool {
        self.can_run(schedule) && !schedule.is_disabled()
    }

    /// Whether the five fields and `disabled` equal the registered default.
    /// Does not modify `schedule`.
    pub fn has_default_configuration(&self, schedule: &Schedule) -> Result<bool> {
        Ok(schedule.matches_default(&self.default_for(schedule)?))
    }

    /// Recompute `customised` from the registered default.
    pub fn refresh_customised(&self, schedule: &mut Schedule) -> Result<bool> {
        let customised = !self.has_default_configuration(schedule)?;
        schedule.set_customised(customised);
        Ok(customised)
    }

    fn default_for(&self, schedule: &Schedule) -> Result<Schedule> {
        self.registry
            .default_schedule(schedule.task_id())
            .ok_or_else(|| Error::UnknownTask(schedule.task_id().to_string()))
    }

    pub fn enable(&self, schedule: &mut Schedule) -> Result<()> {
        self.set_disabled(schedule, false)
    }

    pub fn disable(&self, schedule: &mut Schedule) -> Result<()> {
        self.set_disabled(schedule, true)
    }

    /// The default is looked up before anything changes, so an unknown task
    /// leaves `schedule` untouched.
    fn set_disabled(&self, schedule: &mut Schedule, disabled: bool) -> Result<()> {
        let default = self.default_for(schedule)?;
        schedule.set_disabled(disabled);
        let customised = !schedule.matches_default(&default);
        schedule.set_customised(customised);
        if let Err(e) = self.persistence.save_override(schedule) {
            warn!(task = schedule.task_id(), error = %e, "failed to persist schedule override");
            return Err(e);
        }
        info!(
            task = schedule.task_id(),
            disabled,
            customised,
            "schedule {}",
            if disabled { "disabled" } else { "enabled" }
        );
        Ok(())
    }
}
