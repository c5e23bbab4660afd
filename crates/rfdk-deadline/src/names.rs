//! Validated identifiers used throughout the generated configuration.
//!
//! Instances of these types are always valid. They implement [`Deref`] for
//! read-only access to the inner [`String`], but offer no way to mutate it
//! without validating again.

use std::{fmt::Display, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::validation;

/// Implements the string plumbing shared by every validated name type. The
/// `$validate` function decides whether an input is accepted.
macro_rules! validated_name {
    ($(#[$meta:meta])* $name:ident, $validate:path) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl FromStr for $name {
            type Err = validation::Errors;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                $validate(value)?;
                Ok(Self(value.to_owned()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = validation::Errors;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $validate(&value)?;
                Ok(Self(value))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

validated_name!(
    /// A Deadline group, used to route jobs to the workers of a fleet.
    ///
    /// Deadline treats group names case-insensitively, use [`GroupName::key`]
    /// wherever names are compared.
    GroupName,
    validation::is_deadline_group_name
);

validated_name!(
    /// A Deadline pool. Pools follow the same naming rules as groups.
    PoolName,
    validation::is_deadline_group_name
);

validated_name!(
    /// A Deadline region, which is unrelated to AWS regions.
    RegionName,
    validation::is_deadline_region_name
);

validated_name!(
    /// An AWS region code, like `us-west-2`.
    AwsRegion,
    validation::is_aws_region
);

validated_name!(Arn, validation::is_arn);

validated_name!(
    /// An EC2 instance type, like `t3.large`.
    InstanceType,
    validation::is_instance_type
);

impl GroupName {
    /// The lowercase form of the name, which is how Deadline stores groups.
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl PoolName {
    /// The lowercase form of the name, which is how Deadline stores pools.
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Linux_Workers", "linux_workers")]
    #[case("gpu", "gpu")]
    fn group_key_is_lowercase(#[case] input: &str, #[case] key: &str) {
        let group = GroupName::from_str(input).unwrap();
        assert_eq!(group.key(), key);
        assert_eq!(group.to_string(), input);
    }

    #[test]
    fn deserialize_rejects_reserved_group() {
        let err = serde_yaml::from_str::<GroupName>("None").unwrap_err();
        assert!(err.to_string().contains("reserved word"));
    }

    #[test]
    fn serialize_round_trips_as_plain_string() {
        let group: GroupName = serde_yaml::from_str("render").unwrap();
        assert_eq!(serde_yaml::to_string(&group).unwrap(), "render\n");
    }

    #[test]
    fn instance_type_derefs_to_str() {
        let instance_type = InstanceType::from_str("m5.xlarge").unwrap();
        assert!(instance_type.starts_with("m5"));
    }
}
