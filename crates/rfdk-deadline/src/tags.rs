//! AWS resource tags applied to Spot instances and to Spot Fleet requests.
//!
//! Tags are validated the way EC2 validates them: keys are 1 to 128
//! characters long and can't use the `aws:` prefix, values are at most 256
//! characters long.

use std::{collections::BTreeMap, fmt::Display, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};
use strum::{AsRefStr, Display as StrumDisplay};

const TAG_KEY_MAX_LEN: usize = 128;
const TAG_VALUE_MAX_LEN: usize = 256;
const RESERVED_KEY_PREFIX: &str = "aws:";

/// The error type for tag parse/validation operations.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum TagError {
    #[snafu(display("tag key cannot be empty"))]
    KeyEmpty,

    #[snafu(display(
        "tag key exceeds the maximum length - expected 128 characters or less, got {length}"
    ))]
    KeyTooLong { length: usize },

    #[snafu(display("tag key {key:?} uses the reserved \"aws:\" prefix"))]
    KeyReservedPrefix { key: String },

    #[snafu(display(
        "tag value exceeds the maximum length - expected 256 characters or less, got {length}"
    ))]
    ValueTooLong { length: usize },
}

/// A validated tag key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagKey(String);

impl FromStr for TagKey {
    type Err = TagError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(!input.is_empty(), KeyEmptySnafu);

        let length = input.chars().count();
        ensure!(length <= TAG_KEY_MAX_LEN, KeyTooLongSnafu { length });

        let has_reserved_prefix = input
            .get(..RESERVED_KEY_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(RESERVED_KEY_PREFIX));
        ensure!(
            !has_reserved_prefix,
            KeyReservedPrefixSnafu { key: input }
        );

        Ok(Self(input.to_owned()))
    }
}

impl TryFrom<String> for TagKey {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TagKey> for String {
    fn from(value: TagKey) -> Self {
        value.0
    }
}

impl Deref for TagKey {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for TagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated tag value. Values can be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagValue(String);

impl FromStr for TagValue {
    type Err = TagError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let length = input.chars().count();
        ensure!(length <= TAG_VALUE_MAX_LEN, ValueTooLongSnafu { length });

        Ok(Self(input.to_owned()))
    }
}

impl TryFrom<String> for TagValue {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TagValue> for String {
    fn from(value: TagValue) -> Self {
        value.0
    }
}

impl Deref for TagValue {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A set of tags, ordered by key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<TagKey, TagValue>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and inserts a tag, replacing any previous value of the same key.
    pub fn try_insert(
        &mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<&mut Self, TagError> {
        let key = TagKey::from_str(key.as_ref())?;
        let value = TagValue::from_str(value.as_ref())?;
        self.0.insert(key, value);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagKey, &TagValue)> {
        self.0.iter()
    }

    /// Builds the tag specification for `resource_type`, or [`None`] if there
    /// are no tags to apply.
    pub fn specification(&self, resource_type: TagResourceType) -> Option<TagSpecification> {
        if self.is_empty() {
            return None;
        }

        Some(TagSpecification {
            resource_type,
            tags: self
                .iter()
                .map(|(key, value)| Tag {
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        })
    }
}

impl TryFrom<BTreeMap<String, String>> for Tags {
    type Error = TagError;

    fn try_from(value: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut tags = Self::new();
        for (key, value) in value {
            tags.try_insert(key, value)?;
        }
        Ok(tags)
    }
}

/// The EC2 resource types tags are applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, StrumDisplay, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TagResourceType {
    Instance,
    SpotFleetRequest,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagSpecification {
    pub resource_type: TagResourceType,
    pub tags: Vec<Tag>,
}
