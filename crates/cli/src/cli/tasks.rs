//! `cronkit tasks`, `enable`, `disable`, `reset`.

use anyhow::Context;
use ck_domain::config::Config;
use ck_schedule::{
    is_never, next_run_time_from, Schedule, ScheduleLifecycle, TimeSource, TimezoneContext,
};

use crate::registry::ConfigRegistry;
use crate::store::OverrideStore;

use super::next::format_instant;

/// One row of `cronkit tasks`.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub task_id: String,
    pub component: String,
    pub cron: String,
    pub enabled: bool,
    pub customised: bool,
    pub next: String,
}

/// Registry, override store and timezone for one invocation.
pub struct TaskContext {
    pub registry: ConfigRegistry,
    pub store: OverrideStore,
    pub tz: TimezoneContext,
}

impl TaskContext {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            registry: ConfigRegistry::from_config(config),
            store: OverrideStore::open(&config.scheduler.overrides_path)?,
            tz: TimezoneContext::parse(&config.scheduler.timezone)?,
        })
    }

    fn lifecycle(&self) -> ScheduleLifecycle<'_> {
        ScheduleLifecycle::new(&self.registry, &self.store, &self.registry)
    }

    fn schedule(&self, task_id: &str) -> anyhow::Result<Schedule> {
        self.store
            .effective(&self.registry, task_id)
            .with_context(|| format!("unknown task '{task_id}'"))
    }

    pub fn rows(&self, clock: &dyn TimeSource) -> anyhow::Result<Vec<TaskRow>> {
        let lifecycle = self.lifecycle();
        let mut rows = Vec::new();
        for task_id in self.registry.task_ids() {
            let schedule = self.schedule(task_id)?;
            let enabled = lifecycle.is_enabled(&schedule);
            let next = if !enabled {
                "-".to_string()
            } else {
                let at = next_run_time_from(&schedule, clock, &self.tz);
                if is_never(at) {
                    "never".to_string()
                } else {
                    format_instant(at, &self.tz)
                }
            };
            rows.push(TaskRow {
                task_id: task_id.to_string(),
                component: schedule.component().to_string(),
                cron: schedule.to_string(),
                enabled,
                customised: !lifecycle.has_default_configuration(&schedule)?,
                next,
            });
        }
        Ok(rows)
    }

    pub fn set_enabled(&self, task_id: &str, enabled: bool) -> anyhow::Result<Schedule> {
        let mut schedule = self.schedule(task_id)?;
        let lifecycle = self.lifecycle();
        if enabled {
            lifecycle.enable(&mut schedule)?;
        } else {
            lifecycle.disable(&mut schedule)?;
        }
        Ok(schedule)
    }

    pub fn reset(&self, task_id: &str) -> anyhow::Result<bool> {
        if !self.registry.contains(task_id) {
            anyhow::bail!("unknown task '{task_id}'");
        }
        Ok(self.store.remove(task_id)?)
    }
}

pub fn list(config: &Config, clock: &dyn TimeSource) -> anyhow::Result<()> {
    let ctx = TaskContext::from_config(config)?;
    let rows = ctx.rows(clock)?;
    if rows.is_empty() {
        println!("No tasks configured.");
        return Ok(());
    }
    println!(
        "{:<20} {:<12} {:<24} {:<8} {:<10} NEXT",
        "TASK", "COMPONENT", "SCHEDULE", "ENABLED", "CUSTOM"
    );
    for row in rows {
        println!(
            "{:<20} {:<12} {:<24} {:<8} {:<10} {}",
            row.task_id,
            row.component,
            row.cron,
            if row.enabled { "yes" } else { "no" },
            if row.customised { "yes" } else { "no" },
            row.next
        );
    }
    Ok(())
}

pub fn enable(config: &Config, task_id: &str, enabled: bool) -> anyhow::Result<()> {
    let ctx = TaskContext::from_config(config)?;
    let schedule = ctx.set_enabled(task_id, enabled)?;
    println!(
        "{task_id}: {}{}",
        if enabled { "enabled" } else { "disabled" },
        if schedule.is_customised() { " (customised)" } else { "" }
    );
    Ok(())
}

pub fn reset(config: &Config, task_id: &str) -> anyhow::Result<()> {
    let ctx = TaskContext::from_config(config)?;
    if ctx.reset(task_id)? {
        println!("{task_id}: override removed");
    } else {
        println!("{task_id}: already at default");
    }
    Ok(())
}
