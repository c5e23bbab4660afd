//! Spot fleets managed by the Deadline Spot Event Plugin.
//!
//! A fleet is declared with a [`FleetSpec`] (usually deserialized from a
//! configuration file) and validated into an immutable [`FleetDefinition`].
//! All validation happens here, so everything downstream can rely on a
//! [`FleetDefinition`] having at least one group, instance type and subnet.

use std::{collections::BTreeMap, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};

use crate::{
    fleet::launch::{BlockDeviceError, LaunchConfig, LaunchSpec},
    names::{Arn, GroupName, InstanceType, PoolName, RegionName},
    spot::AllocationStrategy,
    tags::{TagError, Tags},
    validation,
};

pub mod launch;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display(
        "fleet {fleet:?}: At least one Deadline Group is required for a Spot Fleet Request Configuration"
    ))]
    NoGroups { fleet: String },

    #[snafu(display(
        "fleet {fleet:?}: At least one instance type is required for a Spot Fleet Request Configuration"
    ))]
    NoInstanceTypes { fleet: String },

    #[snafu(display(
        "fleet {fleet:?}: invalid value {value:?} for property 'deadlineGroups'. Valid characters are A-Z, a-z, 0-9, -, _ and *. Also, group 'none' is reserved as the default group"
    ))]
    InvalidGroup {
        fleet: String,
        value: String,
        source: validation::Errors,
    },

    #[snafu(display(
        "fleet {fleet:?}: invalid value {value:?} for property 'deadlinePools'. Valid characters are A-Z, a-z, 0-9, -, _ and *. Also, pool 'none' is reserved as the default pool"
    ))]
    InvalidPool {
        fleet: String,
        value: String,
        source: validation::Errors,
    },

    #[snafu(display(
        "fleet {fleet:?}: invalid value {value:?} for property 'deadlineRegion'. Valid characters are A-Z, a-z, 0-9, - and _. Also, 'none', 'all' and 'unrecognized' are reserved as region names"
    ))]
    InvalidRegion {
        fleet: String,
        value: String,
        source: validation::Errors,
    },

    #[snafu(display("fleet {fleet:?}: invalid instance type {value:?}"))]
    InvalidInstanceType {
        fleet: String,
        value: String,
        source: validation::Errors,
    },

    #[snafu(display("fleet {fleet:?}: maxCapacity must be at least 1"))]
    ZeroCapacity { fleet: String },

    #[snafu(display("fleet {fleet:?}: invalid ARN for property '{property}'"))]
    InvalidArn {
        fleet: String,
        property: &'static str,
        source: validation::Errors,
    },

    #[snafu(display("fleet {fleet:?}: property '{property}' cannot be empty"))]
    MissingValue {
        fleet: String,
        property: &'static str,
    },

    #[snafu(display("fleet {fleet:?}: invalid block device"))]
    InvalidBlockDevice {
        fleet: String,
        source: BlockDeviceError,
    },

    #[snafu(display("fleet {fleet:?}: invalid tag"))]
    InvalidTag { fleet: String, source: TagError },
}

/// A Spot fleet as declared by the user, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSpec {
    /// Identifies the fleet in logs and error messages.
    pub name: String,

    /// The Deadline groups the fleet's workers join. Jobs submitted to one
    /// of these groups cause the Spot Event Plugin to request instances from
    /// this fleet.
    pub deadline_groups: Vec<String>,

    #[serde(default)]
    pub deadline_pools: Vec<String>,

    #[serde(default)]
    pub deadline_region: Option<String>,

    pub instance_types: Vec<String>,

    #[serde(default)]
    pub allocation_strategy: Option<AllocationStrategy>,

    /// The most instances the Spot Event Plugin may request for this fleet.
    pub max_capacity: u32,

    /// The role the Spot Fleet service assumes to launch instances.
    pub fleet_role_arn: String,

    pub launch: LaunchSpec,

    /// Applied both to the instances and to the Spot Fleet request.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// After this point in time no new Spot requests are placed and running
    /// instances are terminated.
    #[serde(default)]
    pub valid_until: Option<Timestamp>,
}

/// A validated Spot fleet. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FleetDefinition {
    name: String,
    group_names: Vec<GroupName>,
    pools: Vec<PoolName>,
    region: Option<RegionName>,
    instance_types: Vec<InstanceType>,
    allocation_strategy: AllocationStrategy,
    max_capacity: u32,
    fleet_role: Arn,
    launch: LaunchConfig,
    tags: Tags,
    valid_until: Option<Timestamp>,
}

impl FleetDefinition {
    pub fn new(spec: FleetSpec) -> Result<Self> {
        let FleetSpec {
            name: fleet,
            deadline_groups,
            deadline_pools,
            deadline_region,
            instance_types,
            allocation_strategy,
            max_capacity,
            fleet_role_arn,
            launch,
            tags,
            valid_until,
        } = spec;

        ensure!(!deadline_groups.is_empty(), NoGroupsSnafu { fleet: &fleet });
        ensure!(
            !instance_types.is_empty(),
            NoInstanceTypesSnafu { fleet: &fleet }
        );
        ensure!(max_capacity >= 1, ZeroCapacitySnafu { fleet: &fleet });

        let mut group_names: Vec<GroupName> = Vec::with_capacity(deadline_groups.len());
        for value in deadline_groups {
            let group = GroupName::from_str(&value).context(InvalidGroupSnafu {
                fleet: &fleet,
                value: &value,
            })?;

            // Deadline doesn't distinguish groups by case, listing one twice
            // in the same fleet binds it once.
            if group_names.iter().all(|known| known.key() != group.key()) {
                group_names.push(group);
            }
        }

        let mut pools: Vec<PoolName> = Vec::with_capacity(deadline_pools.len());
        for value in deadline_pools {
            let pool = PoolName::from_str(&value).context(InvalidPoolSnafu {
                fleet: &fleet,
                value: &value,
            })?;
            if pools.iter().all(|known| known.key() != pool.key()) {
                pools.push(pool);
            }
        }

        let region = deadline_region
            .map(|value| {
                RegionName::from_str(&value).context(InvalidRegionSnafu {
                    fleet: &fleet,
                    value: &value,
                })
            })
            .transpose()?;

        let instance_types = instance_types
            .iter()
            .map(|value| {
                InstanceType::from_str(value).context(InvalidInstanceTypeSnafu {
                    fleet: &fleet,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let fleet_role = Arn::from_str(&fleet_role_arn).context(InvalidArnSnafu {
            fleet: &fleet,
            property: "fleetRoleArn",
        })?;

        let launch = validate_launch(&fleet, launch)?;
        let tags = Tags::try_from(tags).context(InvalidTagSnafu { fleet: &fleet })?;

        Ok(Self {
            name: fleet,
            group_names,
            pools,
            region,
            instance_types,
            allocation_strategy: allocation_strategy.unwrap_or_default(),
            max_capacity,
            fleet_role,
            launch,
            tags,
            valid_until,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fleet's groups in declaration order, without case-insensitive
    /// duplicates.
    pub fn group_names(&self) -> &[GroupName] {
        &self.group_names
    }

    pub fn pools(&self) -> &[PoolName] {
        &self.pools
    }

    pub fn region(&self) -> Option<&RegionName> {
        self.region.as_ref()
    }

    pub fn instance_types(&self) -> &[InstanceType] {
        &self.instance_types
    }

    pub fn allocation_strategy(&self) -> AllocationStrategy {
        self.allocation_strategy
    }

    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    pub fn fleet_role(&self) -> &Arn {
        &self.fleet_role
    }

    pub fn launch(&self) -> &LaunchConfig {
        &self.launch
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn valid_until(&self) -> Option<Timestamp> {
        self.valid_until
    }
}

impl TryFrom<FleetSpec> for FleetDefinition {
    type Error = Error;

    fn try_from(value: FleetSpec) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

fn validate_launch(fleet: &str, launch: LaunchSpec) -> Result<LaunchConfig> {
    let LaunchSpec {
        image_id,
        instance_profile_arn,
        security_group_ids,
        subnet_ids,
        key_name,
        user_data,
        block_devices,
    } = launch;

    ensure!(
        !image_id.trim().is_empty(),
        MissingValueSnafu {
            fleet,
            property: "imageId"
        }
    );
    ensure!(
        !subnet_ids.is_empty() && subnet_ids.iter().all(|id| !id.trim().is_empty()),
        MissingValueSnafu {
            fleet,
            property: "subnetIds"
        }
    );
    ensure!(
        security_group_ids.iter().all(|id| !id.trim().is_empty()),
        MissingValueSnafu {
            fleet,
            property: "securityGroupIds"
        }
    );

    let instance_profile = Arn::from_str(&instance_profile_arn).context(InvalidArnSnafu {
        fleet,
        property: "instanceProfileArn",
    })?;

    for device in &block_devices {
        device.validate().context(InvalidBlockDeviceSnafu { fleet })?;

        if !device.is_encrypted() {
            tracing::warn!(
                fleet,
                device = %device.device_name,
                "block device is not encrypted, consider enabling encryption to protect the data on it"
            );
        }
    }

    Ok(LaunchConfig {
        image_id,
        instance_profile,
        security_group_ids,
        subnet_ids,
        key_name,
        user_data,
        block_devices,
    })
}

#[cfg(test)]
mod test {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    fn spec(groups: &[&str]) -> FleetSpec {
        let mut spec: FleetSpec = serde_yaml::from_str(indoc! {"
            name: Fleet
            deadlineGroups: []
            instanceTypes: [t3.large]
            maxCapacity: 1
            fleetRoleArn: arn:aws:iam::123456789012:role/DeadlineSpotFleetRole
            launch:
              imageId: ami-039f0c1faba28b015
              instanceProfileArn: arn:aws:iam::123456789012:instance-profile/DeadlineWorker
              subnetIds: [subnet-a]
        "})
        .unwrap();
        spec.deadline_groups = groups.iter().map(ToString::to_string).collect();
        spec
    }

    #[test]
    fn empty_groups_are_rejected() {
        let err = FleetDefinition::new(spec(&[])).unwrap_err();
        assert_eq!(
            err,
            Error::NoGroups {
                fleet: "Fleet".to_owned()
            }
        );
        assert!(
            err.to_string()
                .contains("At least one Deadline Group is required")
        );
    }

    #[test]
    fn empty_instance_types_are_rejected() {
        let mut spec = spec(&["group1"]);
        spec.instance_types.clear();

        let err = FleetDefinition::new(spec).unwrap_err();
        assert!(matches!(err, Error::NoInstanceTypes { .. }));
        assert!(
            err.to_string()
                .contains("At least one instance type is required")
        );
    }

    #[rstest]
    #[case("none")]
    #[case("NONE")]
    #[case("group 1")]
    #[case("group.1")]
    fn invalid_groups_are_rejected(#[case] group: &str) {
        let err = FleetDefinition::new(spec(&["valid", group])).unwrap_err();
        assert!(matches!(err, Error::InvalidGroup { value, .. } if value == group));
    }

    #[rstest]
    #[case("none123")]
    #[case("nonegroup")]
    #[case("group_1")]
    fn reserved_word_substrings_are_allowed(#[case] group: &str) {
        let fleet = FleetDefinition::new(spec(&[group])).unwrap();
        assert_eq!(fleet.group_names()[0].to_string(), group);
    }

    #[test]
    fn repeated_groups_in_one_fleet_bind_once() {
        let fleet = FleetDefinition::new(spec(&["Render", "render", "comp"])).unwrap();
        let groups = fleet
            .group_names()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(groups, ["Render", "comp"]);
    }

    #[rstest]
    #[case("none")]
    #[case("All")]
    #[case("unrecognized")]
    fn reserved_regions_are_rejected(#[case] region: &str) {
        let mut spec = spec(&["group1"]);
        spec.deadline_region = Some(region.to_owned());

        let err = FleetDefinition::new(spec).unwrap_err();
        assert!(matches!(err, Error::InvalidRegion { .. }));
        assert!(err.to_string().contains("reserved as region names"));
    }

    #[test]
    fn invalid_pools_are_rejected() {
        let mut spec = spec(&["group1"]);
        spec.deadline_pools = vec!["pool1".to_owned(), "none".to_owned()];

        let err = FleetDefinition::new(spec).unwrap_err();
        assert!(matches!(err, Error::InvalidPool { value, .. } if value == "none"));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut spec = spec(&["group1"]);
        spec.max_capacity = 0;

        let err = FleetDefinition::new(spec).unwrap_err();
        assert!(matches!(err, Error::ZeroCapacity { .. }));
    }

    #[rstest]
    #[case::no_subnets(|s: &mut FleetSpec| s.launch.subnet_ids.clear(), "subnetIds")]
    #[case::blank_subnet(|s: &mut FleetSpec| s.launch.subnet_ids.push(" ".to_owned()), "subnetIds")]
    #[case::no_image(|s: &mut FleetSpec| s.launch.image_id.clear(), "imageId")]
    #[case::blank_security_group(|s: &mut FleetSpec| s.launch.security_group_ids.push(String::new()), "securityGroupIds")]
    fn missing_launch_values_are_rejected(
        #[case] modify: fn(&mut FleetSpec),
        #[case] expected_property: &str,
    ) {
        let mut spec = spec(&["group1"]);
        modify(&mut spec);

        let err = FleetDefinition::new(spec).unwrap_err();
        assert!(matches!(err, Error::MissingValue { property, .. } if property == expected_property));
    }

    #[test]
    fn invalid_fleet_role_is_rejected() {
        let mut spec = spec(&["group1"]);
        spec.fleet_role_arn = "DeadlineSpotFleetRole".to_owned();

        let err = FleetDefinition::new(spec).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidArn {
                property: "fleetRoleArn",
                ..
            }
        ));
    }

    #[test]
    fn reserved_tag_keys_are_rejected() {
        let mut spec = spec(&["group1"]);
        spec.tags
            .insert("aws:cloudformation:stack-name".to_owned(), "x".to_owned());

        let err = FleetDefinition::new(spec).unwrap_err();
        assert!(matches!(err, Error::InvalidTag { .. }));
    }

    #[test]
    fn defaults_are_applied() {
        let fleet = FleetDefinition::new(spec(&["group1"])).unwrap();

        assert_eq!(fleet.allocation_strategy(), AllocationStrategy::LowestPrice);
        assert_eq!(fleet.region(), None);
        assert!(fleet.pools().is_empty());
        assert!(fleet.tags().is_empty());
        assert_eq!(fleet.launch().subnet_ids(), ["subnet-a"]);
    }
}
