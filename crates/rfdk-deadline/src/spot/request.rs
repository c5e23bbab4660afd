use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};

use crate::{
    fleet::{FleetDefinition, launch::BlockDeviceMapping},
    names::{Arn, GroupName},
    tags::{TagResourceType, TagSpecification},
};

/// How the Spot Fleet picks capacity pools for its instances.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AllocationStrategy {
    #[default]
    LowestPrice,
    Diversified,
    CapacityOptimized,
}

/// The kind of Spot Fleet request.
///
/// Deadline needs fleets that persist and replace interrupted instances, so
/// one-shot `request` fleets are not offered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, StrumDisplay)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FleetRequestType {
    #[default]
    Maintain,
}

/// A Spot Fleet request as the Spot Event Plugin submits it, in the shape of
/// the EC2 `SpotFleetRequestConfigData`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestSpecification {
    pub allocation_strategy: AllocationStrategy,
    pub iam_fleet_role: Arn,
    pub launch_specifications: Vec<LaunchSpecification>,
    pub replace_unhealthy_instances: bool,
    pub target_capacity: u32,
    pub terminate_instances_with_expiration: bool,
    #[serde(rename = "Type")]
    pub request_type: FleetRequestType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_specifications: Vec<TagSpecification>,
}

/// One instance type in one subnet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LaunchSpecification {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub block_device_mappings: Vec<BlockDeviceMapping>,

    pub iam_instance_profile: IamInstanceProfile,
    pub image_id: String,
    pub instance_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,

    pub security_groups: Vec<SecurityGroupReference>,
    pub subnet_id: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_specifications: Vec<TagSpecification>,

    /// Base64 encoded, as required by EC2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamInstanceProfile {
    pub arn: Arn,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupReference {
    pub group_id: String,
}

/// The outcome of synthesizing one fleet: a single specification, bound to
/// each of the fleet's groups.
///
/// All groups of a fleet share the specification. They are not independent
/// configurations and always stay identical.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesizedRequest {
    group_names: Vec<GroupName>,
    specification: Arc<RequestSpecification>,
}

impl SynthesizedRequest {
    pub fn group_names(&self) -> &[GroupName] {
        &self.group_names
    }

    pub fn specification(&self) -> &Arc<RequestSpecification> {
        &self.specification
    }

    /// Every `(group, specification)` binding of this request, in group
    /// declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&GroupName, &Arc<RequestSpecification>)> {
        self.group_names
            .iter()
            .map(|group| (group, &self.specification))
    }
}

/// Builds the Spot Fleet request for `fleet`.
///
/// Launch specifications are the cross product of instance types and subnets,
/// ordered by instance type first. A [`FleetDefinition`] always has at least
/// one group, instance type and subnet, so this can't fail.
pub fn synthesize(fleet: &FleetDefinition) -> SynthesizedRequest {
    let launch = fleet.launch();
    let instance_tags = fleet.tags().specification(TagResourceType::Instance);
    let user_data = launch.user_data().map(|data| STANDARD.encode(data));
    let security_groups = launch
        .security_group_ids()
        .iter()
        .map(|group_id| SecurityGroupReference {
            group_id: group_id.clone(),
        })
        .collect::<Vec<_>>();

    let launch_specifications = fleet
        .instance_types()
        .iter()
        .flat_map(|instance_type| {
            launch
                .subnet_ids()
                .iter()
                .map(move |subnet_id| (instance_type, subnet_id))
        })
        .map(|(instance_type, subnet_id)| LaunchSpecification {
            block_device_mappings: launch.block_devices().to_vec(),
            iam_instance_profile: IamInstanceProfile {
                arn: launch.instance_profile().clone(),
            },
            image_id: launch.image_id().to_owned(),
            instance_type: instance_type.to_string(),
            key_name: launch.key_name().map(ToOwned::to_owned),
            security_groups: security_groups.clone(),
            subnet_id: subnet_id.clone(),
            tag_specifications: instance_tags.iter().cloned().collect(),
            user_data: user_data.clone(),
        })
        .collect::<Vec<_>>();

    let specification = RequestSpecification {
        allocation_strategy: fleet.allocation_strategy(),
        iam_fleet_role: fleet.fleet_role().clone(),
        launch_specifications,
        replace_unhealthy_instances: true,
        target_capacity: fleet.max_capacity(),
        terminate_instances_with_expiration: true,
        request_type: FleetRequestType::Maintain,
        valid_until: fleet.valid_until(),
        tag_specifications: fleet
            .tags()
            .specification(TagResourceType::SpotFleetRequest)
            .into_iter()
            .collect(),
    };

    tracing::debug!(
        fleet = fleet.name(),
        groups = fleet.group_names().len(),
        launch_specifications = specification.launch_specifications.len(),
        "synthesized spot fleet request"
    );

    SynthesizedRequest {
        group_names: fleet.group_names().to_vec(),
        specification: Arc::new(specification),
    }
}
