//! String validation for the identifiers that end up in the generated
//! configuration: Deadline group, pool and region names, AWS identifiers and
//! hostnames.
//!
//! Every check returns all problems found in the input at once, see
//! [`Errors`].

use std::{fmt::Display, sync::LazyLock};

use const_format::concatcp;
use regex::Regex;
use snafu::Snafu;

/// Minimal length required by RFC 1123 is 63. Up to 255 allowed.
pub const RFC_1123_LABEL_FMT: &str = "[a-zA-Z0-9]([-a-zA-Z0-9]*[a-zA-Z0-9])?";

/// This is a subdomain's max length in DNS (RFC 1123)
const RFC_1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const RFC_1123_SUBDOMAIN_FMT: &str =
    concatcp!(RFC_1123_LABEL_FMT, "(\\.", RFC_1123_LABEL_FMT, ")*");
const RFC_1123_SUBDOMAIN_ERROR_MSG: &str = "a RFC 1123 subdomain must consist of alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character";

// The regex crate has no look-around, so reserved words are checked separately
// from the character set.
const DEADLINE_GROUP_FMT: &str = "[a-zA-Z0-9_*-]+";
const DEADLINE_GROUP_ERROR_MSG: &str = "valid characters are A-Z, a-z, 0-9, -, _ and *";
const DEADLINE_GROUP_RESERVED: &[&str] = &["none"];

const DEADLINE_REGION_FMT: &str = "[a-zA-Z0-9_-]+";
const DEADLINE_REGION_ERROR_MSG: &str = "valid characters are A-Z, a-z, 0-9, - and _";
const DEADLINE_REGION_RESERVED: &[&str] = &["none", "all", "unrecognized"];

const AWS_REGION_FMT: &str = "[a-z]{2}(-[a-z]+)+-[0-9]+";
const AWS_REGION_ERROR_MSG: &str = "an AWS region must look like a partition-qualified region code";

const ARN_FMT: &str = "arn:[a-z0-9-]+:[a-z0-9-]+:[a-z0-9-]*:[0-9]*:.+";
const ARN_ERROR_MSG: &str =
    "an ARN must have the form arn:<partition>:<service>:<region>:<account>:<resource>";

const INSTANCE_TYPE_FMT: &str = "[a-z][a-z0-9-]*\\.[a-z0-9]+";
const INSTANCE_TYPE_ERROR_MSG: &str = "an instance type must have the form <family>.<size>";

// Lazily initialized regular expressions
pub(crate) static RFC_1123_SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1123_SUBDOMAIN_FMT}$"))
        .expect("failed to compile RFC 1123 subdomain regex")
});

static DEADLINE_GROUP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{DEADLINE_GROUP_FMT}$")).expect("failed to compile Deadline group regex")
});

static DEADLINE_REGION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{DEADLINE_REGION_FMT}$"))
        .expect("failed to compile Deadline region regex")
});

static AWS_REGION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{AWS_REGION_FMT}$")).expect("failed to compile AWS region regex")
});

static ARN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{ARN_FMT}$")).expect("failed to compile ARN regex"));

static INSTANCE_TYPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{INSTANCE_TYPE_FMT}$")).expect("failed to compile instance type regex")
});

type Result<T = (), E = Errors> = std::result::Result<T, E>;

/// A collection of errors discovered during validation.
#[derive(Debug, PartialEq, Eq)]
pub struct Errors(Vec<Error>);

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl Errors {
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }
}

/// A single validation error.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Regex { source: RegexError },

    #[snafu(display("input is {length} bytes long but must be no more than {max_length}"))]
    TooLong { length: usize, max_length: usize },

    #[snafu(display("{value:?} is a reserved word (reserved are {reserved:?})"))]
    Reserved {
        value: String,
        reserved: &'static [&'static str],
    },
}

#[derive(Debug, PartialEq, Eq)]
pub struct RegexError {
    /// The primary error message.
    msg: &'static str,

    /// The regex that the input must match.
    regex: &'static str,

    /// Examples of valid inputs (if non-empty).
    examples: &'static [&'static str],
}

impl Display for RegexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            msg,
            regex,
            examples,
        } = self;
        write!(f, "{msg} (")?;
        for (i, example) in examples.iter().enumerate() {
            let prefix = match i {
                0 => "e.g.",
                _ => "or",
            };
            write!(f, "{prefix} {example:?}, ")?;
        }
        write!(f, "regex used for validation is {regex:?})")
    }
}

impl std::error::Error for RegexError {}

/// Returns [`Ok`] if `value`'s length fits within `max_length`.
fn validate_str_length(value: &str, max_length: usize) -> Result<(), Error> {
    if value.len() > max_length {
        TooLongSnafu {
            length: value.len(),
            max_length,
        }
        .fail()
    } else {
        Ok(())
    }
}

/// Returns [`Ok`] if `value` matches `regex`.
fn validate_str_regex(
    value: &str,
    regex: &'static Regex,
    error_msg: &'static str,
    examples: &'static [&'static str],
) -> Result<(), Error> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(RegexError {
            msg: error_msg,
            regex: regex
                .as_str()
                // Clean up start/end-of-line markers
                .trim_start_matches('^')
                .trim_end_matches('$'),
            examples,
        }
        .into())
    }
}

/// Returns [`Ok`] unless `value` equals one of the `reserved` words, ignoring
/// case. Substrings of reserved words are fine, only whole values are
/// rejected.
fn validate_not_reserved(value: &str, reserved: &'static [&'static str]) -> Result<(), Error> {
    if reserved.iter().any(|word| word.eq_ignore_ascii_case(value)) {
        ReservedSnafu {
            value: value.to_owned(),
            reserved,
        }
        .fail()
    } else {
        Ok(())
    }
}

/// Returns [`Ok`] if *all* validations are [`Ok`], otherwise returns all errors.
fn validate_all(validations: impl IntoIterator<Item = Result<(), Error>>) -> Result {
    let errors = validations
        .into_iter()
        .filter_map(Result::err)
        .collect::<Vec<_>>();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(errors))
    }
}

/// Tests for a string that conforms to the definition of a subdomain in DNS (RFC 1123).
pub fn is_rfc_1123_subdomain(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1123_SUBDOMAIN_MAX_LENGTH),
        validate_str_regex(
            value,
            &RFC_1123_SUBDOMAIN_REGEX,
            RFC_1123_SUBDOMAIN_ERROR_MSG,
            &["renderqueue.deadline.internal"],
        ),
    ])
}

/// Tests for a valid Deadline group name. Pool names follow the same rules.
///
/// The name `none` is reserved for the default group, any casing of it is
/// rejected.
pub fn is_deadline_group_name(value: &str) -> Result {
    validate_all([
        validate_str_regex(
            value,
            &DEADLINE_GROUP_REGEX,
            DEADLINE_GROUP_ERROR_MSG,
            &["linux_workers", "gpu-farm"],
        ),
        validate_not_reserved(value, DEADLINE_GROUP_RESERVED),
    ])
}

/// Tests for a valid Deadline region name, which must not be one of `none`,
/// `all` or `unrecognized`.
pub fn is_deadline_region_name(value: &str) -> Result {
    validate_all([
        validate_str_regex(
            value,
            &DEADLINE_REGION_REGEX,
            DEADLINE_REGION_ERROR_MSG,
            &["us-west-2", "render_region"],
        ),
        validate_not_reserved(value, DEADLINE_REGION_RESERVED),
    ])
}

pub fn is_aws_region(value: &str) -> Result {
    validate_all([validate_str_regex(
        value,
        &AWS_REGION_REGEX,
        AWS_REGION_ERROR_MSG,
        &["us-west-2", "us-gov-east-1"],
    )])
}

pub fn is_arn(value: &str) -> Result {
    validate_all([validate_str_regex(
        value,
        &ARN_REGEX,
        ARN_ERROR_MSG,
        &["arn:aws:iam::123456789012:role/DeadlineSpotFleetRole"],
    )])
}

pub fn is_instance_type(value: &str) -> Result {
    validate_all([validate_str_regex(
        value,
        &INSTANCE_TYPE_REGEX,
        INSTANCE_TYPE_ERROR_MSG,
        &["t3.large", "c5n.18xlarge"],
    )])
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("group1")]
    #[case("GROUP_1")]
    #[case("gpu-farm")]
    #[case("none123")]
    #[case("nonegroup")]
    #[case("my_none")]
    #[case("group*")]
    fn deadline_group_pass(#[case] value: &str) {
        assert!(is_deadline_group_name(value).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("none")]
    #[case("None")]
    #[case("NONE")]
    #[case("a b")]
    #[case("group.1")]
    #[case("gröup")]
    #[case("a/b")]
    fn deadline_group_fail(#[case] value: &str) {
        assert!(is_deadline_group_name(value).is_err());
    }

    #[rstest]
    #[case("us-west-2")]
    #[case("render_region")]
    #[case("allregions")]
    #[case("none1")]
    fn deadline_region_pass(#[case] value: &str) {
        assert!(is_deadline_region_name(value).is_ok());
    }

    #[rstest]
    #[case("none")]
    #[case("All")]
    #[case("UNRECOGNIZED")]
    #[case("region*")]
    #[case("")]
    fn deadline_region_fail(#[case] value: &str) {
        assert!(is_deadline_region_name(value).is_err());
    }

    #[test]
    fn reserved_and_invalid_are_both_reported() {
        // A reserved word can't also fail the regex, so check that a single
        // reserved word reports exactly one error.
        let errors = is_deadline_region_name("all").unwrap_err();
        assert_eq!(errors.iter().count(), 1);
        assert!(errors.to_string().contains("reserved word"));
    }

    #[rstest]
    #[case("us-west-2")]
    #[case("eu-central-1")]
    #[case("us-gov-east-1")]
    #[case("ap-southeast-2")]
    fn aws_region_pass(#[case] value: &str) {
        assert!(is_aws_region(value).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("US-WEST-2")]
    #[case("us-west")]
    #[case("uswest2")]
    fn aws_region_fail(#[case] value: &str) {
        assert!(is_aws_region(value).is_err());
    }

    #[rstest]
    #[case("arn:aws:iam::123456789012:role/DeadlineSpotFleetRole")]
    #[case("arn:aws:iam::123456789012:instance-profile/DeadlineWorker")]
    #[case("arn:aws:secretsmanager:us-west-2:123456789012:secret:RootCA-AbCdEf")]
    #[case("arn:aws-cn:iam::123456789012:role/x")]
    fn arn_pass(#[case] value: &str) {
        assert!(is_arn(value).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("role/DeadlineSpotFleetRole")]
    #[case("arn:aws:iam")]
    #[case("arn:aws::::")]
    fn arn_fail(#[case] value: &str) {
        assert!(is_arn(value).is_err());
    }

    #[rstest]
    #[case("t3.large", true)]
    #[case("c5n.18xlarge", true)]
    #[case("u-6tb1.metal", true)]
    #[case("t3", false)]
    #[case("T3.large", false)]
    #[case("t3.large.x", false)]
    fn instance_type(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_instance_type(value).is_ok(), valid);
    }

    #[rstest]
    #[case("renderqueue")]
    #[case("renderqueue.deadline-test.internal")]
    #[case("10-0-0-1.example.com")]
    fn rfc_1123_subdomain_pass(#[case] value: &str) {
        assert!(is_rfc_1123_subdomain(value).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("-renderqueue")]
    #[case("renderqueue-")]
    #[case("render_queue")]
    #[case("a..b")]
    #[case(&"a".repeat(254))]
    fn rfc_1123_subdomain_fail(#[case] value: &str) {
        assert!(is_rfc_1123_subdomain(value).is_err());
    }
}
