//! Builds the property bag of the custom resource that configures the Spot
//! Event Plugin on a render queue.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};

use crate::{
    connection::Connection,
    fleet::{self, FleetDefinition, FleetSpec},
    names::AwsRegion,
    registry::{self, EndpointRegistry},
    settings::{self, PluginSettings, SpotPluginConfigurations},
    spot::{self, ConfigurationMapping, MergeError},
    version::DeadlineVersion,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to register the scheduler endpoint"))]
    RegisterEndpoint { source: registry::Error },

    #[snafu(display(
        "Minimum supported Deadline version for ConfigureSpotEventPlugin is {minimum}. Received: {version}."
    ))]
    UnsupportedVersion {
        version: DeadlineVersion,
        minimum: DeadlineVersion,
    },

    #[snafu(display("failed to resolve the plugin settings"))]
    ResolveSettings { source: settings::Error },

    #[snafu(display("failed to merge the Spot Fleet request configurations"))]
    MergeFleets { source: MergeError },

    #[snafu(display("invalid spot fleet"))]
    InvalidFleet { source: fleet::Error },

    #[snafu(display("failed to serialize the custom resource properties"))]
    SerializeProperties { source: serde_json::Error },
}

/// Everything needed to configure the Spot Event Plugin of one render queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigureSpotEventPluginProps {
    pub connection: Connection,

    /// The region the configuration is deployed to, the default for the
    /// plugin's `Region` setting.
    pub aws_region: AwsRegion,

    /// The Deadline version of the render queue. Older versions than
    /// [`DeadlineVersion::MINIMUM_SPOT_EVENT_PLUGIN_VERSION`] are rejected,
    /// no check is done if the version is unknown.
    pub deadline_version: Option<DeadlineVersion>,

    pub spot_fleets: Vec<FleetDefinition>,
    pub configuration: PluginSettings,
}

/// The declarative form of [`ConfigureSpotEventPluginProps`], as read from a
/// configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureSpotEventPluginSpec {
    pub connection: Connection,
    pub aws_region: AwsRegion,

    #[serde(default)]
    pub deadline_version: Option<DeadlineVersion>,

    #[serde(default)]
    pub spot_fleets: Vec<FleetSpec>,

    #[serde(default)]
    pub configuration: PluginSettings,
}

impl TryFrom<ConfigureSpotEventPluginSpec> for ConfigureSpotEventPluginProps {
    type Error = Error;

    fn try_from(spec: ConfigureSpotEventPluginSpec) -> Result<Self> {
        let spot_fleets = spec
            .spot_fleets
            .into_iter()
            .map(FleetDefinition::new)
            .collect::<Result<Vec<_>, _>>()
            .context(InvalidFleetSnafu)?;

        Ok(Self {
            connection: spec.connection,
            aws_region: spec.aws_region,
            deadline_version: spec.deadline_version,
            spot_fleets,
            configuration: spec.configuration,
        })
    }
}

/// The properties passed to the custom resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotEventPluginProperties {
    pub connection: Connection,

    /// Absent when no fleets are configured, which leaves the plugin's
    /// existing fleet configuration untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_fleet_request_configurations: Option<ConfigurationMapping>,

    pub spot_plugin_configurations: SpotPluginConfigurations,

    /// The groups the fleets use, which have to exist in Deadline before
    /// the plugin can use them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_groups: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_pools: Option<Vec<String>>,
}

impl SpotEventPluginProperties {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context(SerializePropertiesSnafu)
    }
}

/// A Spot Event Plugin configuration for one render queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigureSpotEventPlugin {
    properties: SpotEventPluginProperties,
}

impl ConfigureSpotEventPlugin {
    /// Validates `props` and builds the custom resource properties.
    ///
    /// The render queue endpoint is claimed in `registry` first, so a second
    /// configuration for the same endpoint fails even if the first one is
    /// invalid otherwise.
    pub fn new(registry: &mut EndpointRegistry, props: ConfigureSpotEventPluginProps) -> Result<Self> {
        let ConfigureSpotEventPluginProps {
            connection,
            aws_region,
            deadline_version,
            spot_fleets,
            configuration,
        } = props;

        registry.register(&connection).context(RegisterEndpointSnafu)?;

        if let Some(version) = deadline_version {
            let minimum = DeadlineVersion::MINIMUM_SPOT_EVENT_PLUGIN_VERSION;
            ensure!(
                version.is_at_least(&minimum),
                UnsupportedVersionSnafu { version, minimum }
            );
        }

        let spot_plugin_configurations = configuration
            .resolve(&aws_region)
            .context(ResolveSettingsSnafu)?;
        let spot_fleet_request_configurations =
            spot::merge(&spot_fleets).context(MergeFleetsSnafu)?;

        let (deadline_groups, deadline_pools) = if spot_fleets.is_empty() {
            (None, None)
        } else {
            let groups = spot_fleets
                .iter()
                .flat_map(|fleet| fleet.group_names().iter().map(|group| group.key()))
                .collect::<IndexSet<_>>();
            let pools = spot_fleets
                .iter()
                .flat_map(|fleet| fleet.pools().iter().map(|pool| pool.key()))
                .collect::<IndexSet<_>>();

            (
                Some(groups.into_iter().collect()),
                Some(pools.into_iter().collect()),
            )
        };

        tracing::info!(
            endpoint = %connection.endpoint(),
            fleets = spot_fleets.len(),
            groups = spot_fleet_request_configurations
                .as_ref()
                .map_or(0, ConfigurationMapping::len),
            "configured Spot Event Plugin"
        );

        Ok(Self {
            properties: SpotEventPluginProperties {
                connection,
                spot_fleet_request_configurations,
                spot_plugin_configurations,
                deadline_groups,
                deadline_pools,
            },
        })
    }

    pub fn properties(&self) -> &SpotEventPluginProperties {
        &self.properties
    }

    pub fn into_properties(self) -> SpotEventPluginProperties {
        self.properties
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.properties.to_json()
    }
}
