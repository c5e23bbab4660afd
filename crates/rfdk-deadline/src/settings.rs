//! Plugin-wide settings of the Spot Event Plugin.
//!
//! [`PluginSettings`] holds the user's overrides. [`PluginSettings::resolve`]
//! applies the defaults and produces the [`SpotPluginConfigurations`] the
//! plugin reads, using the key names Deadline expects.

use rfdk_shared::time::Duration;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, Snafu};
use strum::{Display, EnumIter, EnumString};

use crate::names::AwsRegion;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("idleShutdown must be a whole number of minutes, got {idle_shutdown}"))]
    PartialMinutes { idle_shutdown: Duration },
}

/// Whether the plugin acts on its configuration.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum PluginState {
    #[default]
    #[serde(rename = "Global Enabled")]
    #[strum(serialize = "Global Enabled")]
    GlobalEnabled,
    Disabled,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum LoggingLevel {
    #[default]
    Standard,
    Verbose,
    Debug,
    Off,
}

/// How the plugin accounts for pre-job tasks when scaling a fleet.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum PreJobTaskMode {
    /// Only start workers for pre-job tasks, and then for the job's tasks
    /// once the pre-job task completed.
    #[default]
    Conservative,

    /// Treat pre-job tasks like regular job tasks.
    Ignore,

    /// Start one worker for the pre-job task and workers for all remaining
    /// tasks.
    Normal,
}

/// The Deadline worker's extra info field that shows the instance status.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum InstanceStatusDisplay {
    #[default]
    Disabled,
    ExtraInfo0,
    ExtraInfo1,
    ExtraInfo2,
    ExtraInfo3,
    ExtraInfo4,
    ExtraInfo5,
    ExtraInfo6,
    ExtraInfo7,
    ExtraInfo8,
    ExtraInfo9,
}

/// Overrides for the plugin settings. Every unset field falls back to its
/// default when resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PluginState>,

    /// Whether the resource tracker cleans up orphaned instances and blocks
    /// unhealthy fleets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_tracker: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_level: Option<LoggingLevel>,

    /// How long a worker has to be idle before its instance is shut down.
    /// Must be a whole number of minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_shutdown: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_interrupted_workers: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_terminated_workers: Option<bool>,

    /// Whether the fleets' target capacity is reduced when the number of
    /// workers exceeds a limit group's cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_hard_cap: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances_started_per_cycle: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_job_task_mode: Option<PreJobTaskMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_instance_status: Option<InstanceStatusDisplay>,

    /// The AWS region the fleets are requested in. Defaults to the region
    /// the configuration is deployed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<AwsRegion>,
}

/// The resolved plugin settings, keyed the way the Spot Event Plugin reads
/// them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpotPluginConfigurations {
    #[serde(rename = "AWSInstanceStatus")]
    pub aws_instance_status: InstanceStatusDisplay,

    #[serde(rename = "DeleteInterruptedSlaves")]
    pub delete_interrupted_workers: bool,

    #[serde(rename = "DeleteTerminatedSlaves")]
    pub delete_terminated_workers: bool,

    /// In minutes.
    pub idle_shutdown: u64,

    pub logging: LoggingLevel,
    pub pre_job_task_mode: PreJobTaskMode,
    pub region: AwsRegion,
    pub resource_tracker: bool,
    pub stagger_instances: u32,
    pub state: PluginState,
    pub strict_hard_cap: bool,
}

impl PluginSettings {
    pub const DEFAULT_IDLE_SHUTDOWN: Duration = Duration::from_minutes(10);
    pub const DEFAULT_MAX_INSTANCES_STARTED_PER_CYCLE: u32 = 50;

    /// Applies the defaults to every unset setting. `default_region` is used
    /// unless a region was set explicitly.
    pub fn resolve(&self, default_region: &AwsRegion) -> Result<SpotPluginConfigurations> {
        let idle_shutdown = self.idle_shutdown.unwrap_or(Self::DEFAULT_IDLE_SHUTDOWN);
        let idle_shutdown_minutes = idle_shutdown
            .as_whole_minutes()
            .context(PartialMinutesSnafu { idle_shutdown })?;

        Ok(SpotPluginConfigurations {
            aws_instance_status: self.display_instance_status.unwrap_or_default(),
            delete_interrupted_workers: self.delete_interrupted_workers.unwrap_or(false),
            delete_terminated_workers: self.delete_terminated_workers.unwrap_or(false),
            idle_shutdown: idle_shutdown_minutes,
            logging: self.logging_level.unwrap_or_default(),
            pre_job_task_mode: self.pre_job_task_mode.unwrap_or_default(),
            region: self
                .region
                .clone()
                .unwrap_or_else(|| default_region.clone()),
            resource_tracker: self.resource_tracker.unwrap_or(true),
            stagger_instances: self
                .max_instances_started_per_cycle
                .unwrap_or(Self::DEFAULT_MAX_INSTANCES_STARTED_PER_CYCLE),
            state: self.state.unwrap_or_default(),
            strict_hard_cap: self.strict_hard_cap.unwrap_or(false),
        })
    }
}
