use std::{fmt::Display, num::ParseIntError, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt, Snafu};

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0|[1-9]\d*)(?:\.(0|[1-9]\d*))?(?:\.(0|[1-9]\d*))?(?:\.(0|[1-9]\d*))?$")
        .expect("failed to compile version regex")
});

/// Error variants which can be encountered when parsing a [`DeadlineVersion`].
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseVersionError {
    #[snafu(display(
        "invalid version format {input:?}, expected up to four dot-separated numbers without leading zeros"
    ))]
    InvalidFormat { input: String },

    #[snafu(display("failed to parse version component"))]
    ParseComponent { source: ParseIntError },
}

/// A Deadline version, following the `<MAJOR>.<MINOR>.<RELEASE>.<PATCH>`
/// format.
///
/// Trailing components can be omitted when parsing and default to zero, so
/// `10.1` is the same version as `10.1.0.0`. Versions are ordered by their
/// components, from major to patch.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeadlineVersion {
    components: [u32; 4],
}

impl DeadlineVersion {
    /// The oldest Deadline release whose Spot Event Plugin can be configured
    /// through the render queue API.
    pub const MINIMUM_SPOT_EVENT_PLUGIN_VERSION: Self = Self::new(10, 1, 12, 0);

    pub const fn new(major: u32, minor: u32, release: u32, patch: u32) -> Self {
        Self {
            components: [major, minor, release, patch],
        }
    }

    pub fn major(&self) -> u32 {
        self.components[0]
    }

    pub fn minor(&self) -> u32 {
        self.components[1]
    }

    pub fn release(&self) -> u32 {
        self.components[2]
    }

    pub fn patch(&self) -> u32 {
        self.components[3]
    }

    pub fn is_at_least(&self, other: &Self) -> bool {
        self >= other
    }
}

impl FromStr for DeadlineVersion {
    type Err = ParseVersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let captures = VERSION_REGEX
            .captures(input.trim())
            .context(InvalidFormatSnafu { input })?;

        let mut components = [0; 4];
        for (component, capture) in components.iter_mut().zip(captures.iter().skip(1)) {
            if let Some(capture) = capture {
                *component = capture.as_str().parse().context(ParseComponentSnafu)?;
            }
        }

        Ok(Self { components })
    }
}

impl TryFrom<String> for DeadlineVersion {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeadlineVersion> for String {
    fn from(value: DeadlineVersion) -> Self {
        value.to_string()
    }
}

impl Display for DeadlineVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [major, minor, release, patch] = self.components;
        write!(f, "{major}.{minor}.{release}.{patch}")
    }
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("10.1.12.1", DeadlineVersion::new(10, 1, 12, 1))]
    #[case("10.1.12", DeadlineVersion::new(10, 1, 12, 0))]
    #[case("10.1", DeadlineVersion::new(10, 1, 0, 0))]
    #[case("10", DeadlineVersion::new(10, 0, 0, 0))]
    #[case("0.0.0.0", DeadlineVersion::new(0, 0, 0, 0))]
    fn valid_version(#[case] input: &str, #[case] expected: DeadlineVersion) {
        let version = DeadlineVersion::from_str(input).expect("valid Deadline version");
        assert_eq!(version, expected);
    }

    #[rstest]
    #[case("")]
    #[case("10.")]
    #[case("10.01")]
    #[case("10.1.12.1.5")]
    #[case("v10.1")]
    #[case("10.1.x")]
    fn invalid_version(#[case] input: &str) {
        let err = DeadlineVersion::from_str(input).expect_err("invalid Deadline version");
        assert_eq!(
            err,
            ParseVersionError::InvalidFormat {
                input: input.to_owned()
            }
        );
    }

    #[test]
    fn component_overflow() {
        let err = DeadlineVersion::from_str("99999999999").unwrap_err();
        assert!(matches!(err, ParseVersionError::ParseComponent { .. }));
    }

    #[rstest]
    #[case("10.1.12.1", "10.1.12.0", Ordering::Greater)]
    #[case("10.1.9.2", "10.1.12.0", Ordering::Less)]
    #[case("10.2", "10.1.99.99", Ordering::Greater)]
    #[case("10.1.12", "10.1.12.0", Ordering::Equal)]
    fn ordering(#[case] lhs: &str, #[case] rhs: &str, #[case] expected: Ordering) {
        let lhs: DeadlineVersion = lhs.parse().unwrap();
        let rhs: DeadlineVersion = rhs.parse().unwrap();
        assert_eq!(lhs.cmp(&rhs), expected);
    }

    #[test]
    fn display_pads_to_four_components() {
        let version: DeadlineVersion = "10.1".parse().unwrap();
        assert_eq!(version.to_string(), "10.1.0.0");
        assert_eq!(version.major(), 10);
        assert_eq!(version.minor(), 1);
        assert_eq!(version.release(), 0);
        assert_eq!(version.patch(), 0);
    }

    #[test]
    fn minimum_spot_event_plugin_version() {
        let old: DeadlineVersion = "10.1.11.5".parse().unwrap();
        let new: DeadlineVersion = "10.1.12".parse().unwrap();
        assert!(!old.is_at_least(&DeadlineVersion::MINIMUM_SPOT_EVENT_PLUGIN_VERSION));
        assert!(new.is_at_least(&DeadlineVersion::MINIMUM_SPOT_EVENT_PLUGIN_VERSION));
    }
}
