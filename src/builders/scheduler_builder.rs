//! Builder wiring configuration, users, clock and audit into a scheduler.

use std::sync::Arc;

use crate::config::{ConcurrencyConfig, DeviceSettings, MemoryLevel};
use crate::core::{
    AuditSink, ConcurrencyManager, JobQueue, SchedulerError, SlotExecutor, Spawn, UserDirectory,
    UserInfo,
};
use crate::infra::{InMemoryUserDirectory, PendingJobQueue};
use crate::runtime::JobScheduler;
use crate::util::clock::{Clock, SystemClock};

/// System user, foreground and primary when no directory is supplied.
const USER_SYSTEM: i32 = 0;

/// Build a [`ConcurrencyManager`] or a [`JobScheduler`] from configuration.
pub struct SchedulerBuilder {
    config: ConcurrencyConfig,
    settings: Option<DeviceSettings>,
    clock: Option<Arc<dyn Clock>>,
    users: Option<Arc<dyn UserDirectory>>,
    audit: Option<Box<dyn AuditSink>>,
    memory_level: MemoryLevel,
    interactive: bool,
}

impl SchedulerBuilder {
    /// Start from static options.
    pub fn new(config: ConcurrencyConfig) -> Self {
        Self {
            config,
            settings: None,
            clock: None,
            users: None,
            audit: None,
            memory_level: MemoryLevel::Normal,
            interactive: true,
        }
    }

    /// Start from a JSON object of static options.
    ///
    /// # Errors
    /// [`SchedulerError::Config`] on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, SchedulerError> {
        ConcurrencyConfig::from_json_str(input)
            .map(Self::new)
            .map_err(SchedulerError::Config)
    }

    /// Initial settings snapshot.
    #[must_use]
    pub fn with_settings(mut self, settings: DeviceSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Time source. Defaults to the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// User directory. Defaults to a lone primary system user.
    #[must_use]
    pub fn with_users(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Initial memory-pressure level.
    #[must_use]
    pub const fn with_memory_level(mut self, level: MemoryLevel) -> Self {
        self.memory_level = level;
        self
    }

    /// Initial screen state. Starting with the screen off applies the
    /// screen-off quotas after the usual delay.
    #[must_use]
    pub const fn with_interactive(mut self, on: bool) -> Self {
        self.interactive = on;
        self
    }

    /// Build a manager over a custom pending queue.
    ///
    /// # Errors
    /// [`SchedulerError::Config`] if the static options are invalid.
    pub fn build_manager_with_queue<Q: JobQueue>(
        self,
        queue: Q,
    ) -> Result<ConcurrencyManager<Q>, SchedulerError> {
        let users = self.users.unwrap_or_else(|| {
            let users = InMemoryUserDirectory::new(USER_SYSTEM);
            users.add_user(UserInfo {
                is_primary: true,
                ..UserInfo::new(USER_SYSTEM)
            });
            Arc::new(users)
        });
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let mut manager = ConcurrencyManager::new(&self.config, queue, users, clock)?;
        if let Some(audit) = self.audit {
            manager = manager.with_audit(audit);
        }
        if let Some(settings) = self.settings.as_ref() {
            manager.update_config(settings);
        }
        manager.set_memory_level(self.memory_level);
        manager.set_interactive(self.interactive);
        tracing::info!(
            profile = %manager.active_profile(),
            restrict_background_users = self.config.restrict_background_users,
            "scheduler built"
        );
        Ok(manager)
    }

    /// Build a manager over the in-memory pending queue.
    ///
    /// # Errors
    /// [`SchedulerError::Config`] if the static options are invalid.
    pub fn build_manager(self) -> Result<ConcurrencyManager<PendingJobQueue>, SchedulerError> {
        self.build_manager_with_queue(PendingJobQueue::new())
    }

    /// Build the event-driven service.
    ///
    /// # Errors
    /// [`SchedulerError::Config`] if the static options are invalid.
    pub fn build<E, S>(
        self,
        executor: E,
        spawner: S,
    ) -> Result<JobScheduler<PendingJobQueue, E, S>, SchedulerError>
    where
        E: SlotExecutor,
        S: Spawn,
    {
        Ok(JobScheduler::new(self.build_manager()?, executor, spawner))
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new(ConcurrencyConfig::default())
    }
}
