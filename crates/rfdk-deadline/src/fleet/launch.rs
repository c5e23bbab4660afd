//! Launch-time configuration of the instances a Spot fleet starts.
//!
//! These values are passed through to the Spot Fleet request unchanged, only
//! their presence is checked.

use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};
use strum::{Display as StrumDisplay, EnumString};

use crate::names::Arn;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum BlockDeviceError {
    #[snafu(display("device name cannot be empty"))]
    EmptyDeviceName,

    #[snafu(display("exactly one of ebs or virtualName must be set"))]
    AmbiguousVolume,

    #[snafu(display("iops is required for volumes of type {volume_type}"))]
    MissingIops { volume_type: EbsVolumeType },

    #[snafu(display("iops is not supported for volumes of type {volume_type}"))]
    UnsupportedIops { volume_type: EbsVolumeType },
}

/// The launch configuration as declared by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpec {
    pub image_id: String,
    pub instance_profile_arn: String,

    #[serde(default)]
    pub security_group_ids: Vec<String>,

    pub subnet_ids: Vec<String>,

    #[serde(default)]
    pub key_name: Option<String>,

    /// The user data script, in plain text.
    #[serde(default)]
    pub user_data: Option<String>,

    #[serde(default)]
    pub block_devices: Vec<BlockDeviceMapping>,
}

/// The validated launch configuration of a fleet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchConfig {
    pub(crate) image_id: String,
    pub(crate) instance_profile: Arn,
    pub(crate) security_group_ids: Vec<String>,
    pub(crate) subnet_ids: Vec<String>,
    pub(crate) key_name: Option<String>,
    pub(crate) user_data: Option<String>,
    pub(crate) block_devices: Vec<BlockDeviceMapping>,
}

impl LaunchConfig {
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn instance_profile(&self) -> &Arn {
        &self.instance_profile
    }

    pub fn security_group_ids(&self) -> &[String] {
        &self.security_group_ids
    }

    pub fn subnet_ids(&self) -> &[String] {
        &self.subnet_ids
    }

    pub fn key_name(&self) -> Option<&str> {
        self.key_name.as_deref()
    }

    pub fn user_data(&self) -> Option<&str> {
        self.user_data.as_deref()
    }

    pub fn block_devices(&self) -> &[BlockDeviceMapping] {
        &self.block_devices
    }
}

/// A block device attached to every instance of the fleet.
///
/// Declared in camelCase, emitted in the PascalCase the EC2 API expects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "camelCase"))]
pub struct BlockDeviceMapping {
    pub device_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebs: Option<EbsDevice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_name: Option<String>,
}

impl BlockDeviceMapping {
    pub fn validate(&self) -> Result<(), BlockDeviceError> {
        ensure!(!self.device_name.trim().is_empty(), EmptyDeviceNameSnafu);
        ensure!(
            self.ebs.is_some() != self.virtual_name.is_some(),
            AmbiguousVolumeSnafu
        );

        if let Some(ebs) = &self.ebs {
            let volume_type = ebs.volume_type.unwrap_or_default();
            if volume_type.requires_iops() {
                ensure!(ebs.iops.is_some(), MissingIopsSnafu { volume_type });
            }
            if !volume_type.supports_iops() {
                ensure!(ebs.iops.is_none(), UnsupportedIopsSnafu { volume_type });
            }
        }

        Ok(())
    }

    /// Whether the volume is known to be encrypted. Ephemeral volumes can't be
    /// encrypted through the mapping.
    pub fn is_encrypted(&self) -> bool {
        self.ebs
            .as_ref()
            .is_some_and(|ebs| ebs.encrypted.unwrap_or(false))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "PascalCase", deserialize = "camelCase"))]
pub struct EbsDevice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_on_termination: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,

    /// Size in GiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<EbsVolumeType>,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EbsVolumeType {
    Standard,
    Io1,
    Io2,
    #[default]
    Gp2,
    Gp3,
    St1,
    Sc1,
}

impl EbsVolumeType {
    fn requires_iops(self) -> bool {
        matches!(self, Self::Io1 | Self::Io2)
    }

    fn supports_iops(self) -> bool {
        matches!(self, Self::Io1 | Self::Io2 | Self::Gp3)
    }
}

#[cfg(test)]
mod test {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    fn ebs(volume_type: EbsVolumeType, iops: Option<u32>) -> BlockDeviceMapping {
        BlockDeviceMapping {
            device_name: "/dev/xvda".to_owned(),
            ebs: Some(EbsDevice {
                iops,
                volume_type: Some(volume_type),
                ..EbsDevice::default()
            }),
            virtual_name: None,
        }
    }

    #[rstest]
    #[case(ebs(EbsVolumeType::Io1, None), Err(BlockDeviceError::MissingIops { volume_type: EbsVolumeType::Io1 }))]
    #[case(ebs(EbsVolumeType::Io2, Some(3000)), Ok(()))]
    #[case(ebs(EbsVolumeType::Gp3, Some(3000)), Ok(()))]
    #[case(ebs(EbsVolumeType::Gp2, Some(100)), Err(BlockDeviceError::UnsupportedIops { volume_type: EbsVolumeType::Gp2 }))]
    #[case(ebs(EbsVolumeType::St1, None), Ok(()))]
    fn validate_iops(
        #[case] mapping: BlockDeviceMapping,
        #[case] expected: Result<(), BlockDeviceError>,
    ) {
        assert_eq!(mapping.validate(), expected);
    }

    #[test]
    fn validate_requires_exactly_one_volume() {
        let both = BlockDeviceMapping {
            virtual_name: Some("ephemeral0".to_owned()),
            ..ebs(EbsVolumeType::Gp2, None)
        };
        assert_eq!(both.validate(), Err(BlockDeviceError::AmbiguousVolume));

        let neither = BlockDeviceMapping {
            device_name: "/dev/sdb".to_owned(),
            ..BlockDeviceMapping::default()
        };
        assert_eq!(neither.validate(), Err(BlockDeviceError::AmbiguousVolume));
    }

    #[test]
    fn declared_camel_case_emitted_pascal_case() {
        let mapping: BlockDeviceMapping = serde_yaml::from_str(indoc! {"
            deviceName: /dev/xvda
            ebs:
              volumeSize: 50
              volumeType: gp3
              encrypted: true
              deleteOnTermination: true
        "})
        .unwrap();

        assert!(mapping.is_encrypted());
        assert_eq!(
            serde_json::to_value(&mapping).unwrap(),
            serde_json::json!({
                "DeviceName": "/dev/xvda",
                "Ebs": {
                    "DeleteOnTermination": true,
                    "Encrypted": true,
                    "VolumeSize": 50,
                    "VolumeType": "gp3",
                },
            })
        );
    }
}
