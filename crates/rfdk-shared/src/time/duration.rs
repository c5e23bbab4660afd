//! This module contains a common [`Duration`] struct which is able to parse
//! human-readable duration formats, like `10m`, `1h30m` or `2d4h`. It
//! additionally implements [`Deserialize`][serde::Deserialize] and
//! [`Serialize`][serde::Serialize] so it can be used directly in
//! configuration files.
//!
//! It implements [`Deref`], which enables us to use all associated functions of
//! [`std::time::Duration`] without re-implementing them on our own type.

use std::{
    cmp::Ordering,
    fmt::Display,
    iter::Peekable,
    num::ParseIntError,
    ops::Deref,
    str::{CharIndices, FromStr},
};

use snafu::{OptionExt, ResultExt, Snafu};
use strum::IntoEnumIterator;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(module)]
pub enum DurationParseError {
    #[snafu(display("invalid input, either empty or contains non-ascii characters"))]
    InvalidInput,

    #[snafu(display("unexpected character {chr:?}"))]
    UnexpectedCharacter { chr: char },

    #[snafu(display("fragment with value {value:?} has no unit"))]
    NoUnit { value: u128 },

    #[snafu(display("invalid fragment order, {current} must be before {previous}"))]
    InvalidUnitOrdering {
        previous: DurationUnit,
        current: DurationUnit,
    },

    #[snafu(display("fragment unit {unit} was specified multiple times"))]
    DuplicateUnit { unit: DurationUnit },

    #[snafu(display("failed to parse fragment unit {unit:?}"))]
    ParseUnitError { unit: String },

    #[snafu(display("failed to parse fragment value as integer"))]
    ParseIntError { source: ParseIntError },

    #[snafu(display("duration overflows the supported range"))]
    Overflow,
}

/// A human-readable duration, such as the idle shutdown period of a worker.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(std::time::Duration);

impl FromStr for Duration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use duration_parse_error::*;
        let input = s.trim();

        if input.is_empty() || !input.is_ascii() {
            return InvalidInputSnafu.fail();
        }

        let mut chars = input.char_indices().peekable();
        let mut millis: u128 = 0;
        let mut last_unit = None;

        while let Some(value) = take_group(input, &mut chars, |c| c.is_ascii_digit()) {
            let value = value.parse::<u128>().context(ParseIntSnafu)?;

            let Some(unit) = take_group(input, &mut chars, char::is_alphabetic) else {
                if let Some(&(_, chr)) = chars.peek() {
                    return UnexpectedCharacterSnafu { chr }.fail();
                }
                return NoUnitSnafu { value }.fail();
            };

            let unit = unit.parse::<DurationUnit>().ok().context(ParseUnitSnafu {
                unit: unit.to_string(),
            })?;

            // Units must be given from largest to smallest, each at most once
            if let Some(last_unit) = last_unit {
                match unit.cmp(&last_unit) {
                    Ordering::Less => {
                        return InvalidUnitOrderingSnafu {
                            previous: last_unit,
                            current: unit,
                        }
                        .fail();
                    }
                    Ordering::Equal => return DuplicateUnitSnafu { unit }.fail(),
                    Ordering::Greater => (),
                }
            }

            millis = value
                .checked_mul(unit.millis())
                .and_then(|fragment| millis.checked_add(fragment))
                .context(OverflowSnafu)?;
            last_unit = Some(unit);
        }

        // Buffer must not contain any remaining data
        if let Some(&(_, chr)) = chars.peek() {
            return UnexpectedCharacterSnafu { chr }.fail();
        }

        let millis = u64::try_from(millis).ok().context(OverflowSnafu)?;
        Ok(Self(std::time::Duration::from_millis(millis)))
    }
}

/// Consumes the longest run of characters matching `f` and returns it, or
/// [`None`] if the next character doesn't match.
fn take_group<'a>(
    input: &'a str,
    chars: &mut Peekable<CharIndices<'a>>,
    f: fn(char) -> bool,
) -> Option<&'a str> {
    let &(from, _) = chars.peek()?;
    let mut to = None;

    while let Some((i, _)) = chars.next_if(|(_, c)| f(*c)) {
        to = Some(i);
    }

    to.map(|to| &input[from..=to])
}

impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_zero() {
            return write!(f, "0{}", DurationUnit::Seconds);
        }

        let mut millis = self.0.as_millis();

        for unit in DurationUnit::iter() {
            let whole = millis / unit.millis();
            let rest = millis % unit.millis();

            if whole > 0 {
                write!(f, "{whole}{unit}")?;
            }

            millis = rest;
        }

        Ok(())
    }
}

impl Deref for Duration {
    type Target = std::time::Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Self(value)
    }
}

impl From<Duration> for std::time::Duration {
    fn from(value: Duration) -> Self {
        value.0
    }
}

impl Duration {
    /// Creates a new [`Duration`] from the specified number of whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }

    /// Creates a new [`Duration`] from the specified number of whole minutes.
    pub const fn from_minutes(minutes: u64) -> Self {
        Self::from_secs(minutes * 60)
    }

    /// Returns the number of minutes in this duration, or [`None`] if it can't be
    /// expressed as a whole number of minutes.
    pub fn as_whole_minutes(&self) -> Option<u64> {
        let is_whole = self.0.subsec_nanos() == 0 && self.0.as_secs() % 60 == 0;
        is_whole.then(|| self.0.as_secs() / 60)
    }
}

/// Defines supported [`DurationUnit`]s. Each fragment consists of a numeric
/// value followed by a [`DurationUnit`]. The order of variants **MATTERS**,
/// it is used by the [`Display`] implementation of [`Duration`].
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
pub enum DurationUnit {
    #[strum(serialize = "d")]
    Days,

    #[strum(serialize = "h")]
    Hours,

    #[strum(serialize = "m")]
    Minutes,

    #[strum(serialize = "s")]
    Seconds,

    #[strum(serialize = "ms")]
    Milliseconds,
}

impl DurationUnit {
    /// Returns the number of whole milliseconds in each supported
    /// [`DurationUnit`].
    fn millis(self) -> u128 {
        match self {
            Self::Days => 24 * Self::Hours.millis(),
            Self::Hours => 60 * Self::Minutes.millis(),
            Self::Minutes => 60 * Self::Seconds.millis(),
            Self::Seconds => 1000,
            Self::Milliseconds => 1,
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[rstest]
    #[case("2d4h", 187_200)]
    #[case("1h30m", 5400)]
    #[case("90m", 5400)]
    #[case("10m", 600)]
    #[case("45s", 45)]
    #[case("1m1000ms", 61)]
    fn parse_as_secs(#[case] input: &str, #[case] output: u64) {
        let dur: Duration = input.parse().unwrap();
        assert_eq!(dur.as_secs(), output);
    }

    #[rstest]
    #[case("10M", DurationParseError::ParseUnitError { unit: "M".into() })]
    #[case("5m3", DurationParseError::NoUnit { value: 3 })]
    #[case("5m-", DurationParseError::UnexpectedCharacter { chr: '-' })]
    #[case("10ü", DurationParseError::InvalidInput)]
    #[case("", DurationParseError::InvalidInput)]
    fn parse_invalid(#[case] input: &str, #[case] expected_err: DurationParseError) {
        let err = Duration::from_str(input).unwrap_err();
        assert_eq!(err, expected_err);
    }

    #[rstest]
    #[case("10m1h", DurationParseError::InvalidUnitOrdering { previous: DurationUnit::Minutes, current: DurationUnit::Hours })]
    #[case("10m5m", DurationParseError::DuplicateUnit { unit: DurationUnit::Minutes })]
    fn invalid_order_or_duplicate_unit(
        #[case] input: &str,
        #[case] expected_err: DurationParseError,
    ) {
        let err = Duration::from_str(input).unwrap_err();
        assert_eq!(err, expected_err);
    }

    #[rstest]
    #[case("90m", "1h30m")]
    #[case("10m", "10m")]
    #[case("1d2s", "1d2s")]
    fn to_string(#[case] input: &str, #[case] expected: &str) {
        let dur: Duration = input.parse().unwrap();
        assert_eq!(dur.to_string(), expected);
    }

    #[rstest]
    #[case(Duration::from_minutes(10), Some(10))]
    #[case(Duration::from_secs(3600), Some(60))]
    #[case(Duration::from_secs(0), Some(0))]
    #[case(Duration::from_secs(90), None)]
    #[case(Duration::from(std::time::Duration::from_millis(60_500)), None)]
    fn whole_minutes(#[case] input: Duration, #[case] expected: Option<u64>) {
        assert_eq!(input.as_whole_minutes(), expected);
    }

    #[test]
    fn deserialize() {
        #[derive(Deserialize)]
        struct S {
            idle: Duration,
        }

        let s: S = serde_yaml::from_str("idle: 1h15m").unwrap();
        assert_eq!(s.idle.as_secs(), 4500);
    }

    #[test]
    fn serialize() {
        #[derive(Serialize)]
        struct S {
            idle: Duration,
        }

        let s = S {
            idle: Duration::from_minutes(75),
        };
        assert_eq!(serde_yaml::to_string(&s).unwrap(), "idle: 1h15m\n");
    }
}
