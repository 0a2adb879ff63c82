//! A duration type which reads and writes the compact `1h2m3s` notation used
//! throughout the configuration documents.

use std::{fmt, str::FromStr, time};

use serde::{Deserialize, Serialize, de::Visitor};
use snafu::{OptionExt, ResultExt, Snafu, ensure};

#[derive(Debug, PartialEq, Snafu)]
pub enum ParseDurationError {
    #[snafu(display("duration must not be empty"))]
    Empty,

    #[snafu(display("failed to parse the amount in {input:?}"))]
    ParseAmount {
        source: std::num::ParseIntError,
        input: String,
    },

    #[snafu(display("missing unit after {amount} in {input:?}"))]
    MissingUnit { amount: u64, input: String },

    #[snafu(display("unknown unit {unit:?} in {input:?}, expected one of h, m, s or ms"))]
    UnknownUnit { unit: String, input: String },

    #[snafu(display("duration {input:?} overflows"))]
    Overflow { input: String },
}

/// A non-negative duration with millisecond precision.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(time::Duration);

impl Duration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(time::Duration::from_secs(secs))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(time::Duration::from_millis(millis))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Duration> for time::Duration {
    fn from(value: Duration) -> Self {
        value.0
    }
}

impl FromStr for Duration {
    type Err = ParseDurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(!input.is_empty(), EmptySnafu);

        // A bare zero is the only value allowed without a unit.
        if input == "0" {
            return Ok(Self::default());
        }

        let mut millis: u64 = 0;
        let mut rest = input;

        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            let amount: u64 = rest[..digits].parse().context(ParseAmountSnafu { input })?;
            rest = &rest[digits..];

            let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
            ensure!(unit_len > 0, MissingUnitSnafu { amount, input });
            let unit = &rest[..unit_len];
            rest = &rest[unit_len..];

            let factor: u64 = match unit {
                "h" => 3_600_000,
                "m" => 60_000,
                "s" => 1_000,
                "ms" => 1,
                _ => return UnknownUnitSnafu { unit, input }.fail(),
            };

            millis = amount
                .checked_mul(factor)
                .and_then(|part| millis.checked_add(part))
                .context(OverflowSnafu { input })?;
        }

        Ok(Self::from_millis(millis))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_millis = self.0.as_millis();

        if total_millis == 0 {
            return f.write_str("0s");
        }

        if total_millis < 1_000 {
            return write!(f, "{total_millis}ms");
        }

        let hours = total_millis / 3_600_000;
        let minutes = (total_millis / 60_000) % 60;
        let seconds = (total_millis / 1_000) % 60;
        let millis = total_millis % 1_000;

        if hours > 0 {
            write!(f, "{hours}h{minutes}m")?;
        } else if minutes > 0 {
            write!(f, "{minutes}m")?;
        }

        if millis == 0 {
            write!(f, "{seconds}s")
        } else {
            let fraction = format!("{millis:03}");
            write!(f, "{seconds}.{}s", fraction.trim_end_matches('0'))
        }
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a duration like 24h0m0s")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Duration::from_str(v).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(DurationVisitor)
    }
}

impl Serialize for Duration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("24h0m0s", Duration::from_secs(24 * 3600), "24h0m0s")]
    #[case("24h", Duration::from_secs(24 * 3600), "24h0m0s")]
    #[case("4m0s", Duration::from_secs(240), "4m0s")]
    #[case("90s", Duration::from_secs(90), "1m30s")]
    #[case("1m30s", Duration::from_secs(90), "1m30s")]
    #[case("1s500ms", Duration::from_millis(1500), "1.5s")]
    #[case("250ms", Duration::from_millis(250), "250ms")]
    #[case("0", Duration::default(), "0s")]
    #[case("0s", Duration::default(), "0s")]
    fn parse_and_format(#[case] input: &str, #[case] expected: Duration, #[case] formatted: &str) {
        let duration = Duration::from_str(input).expect("valid duration");
        assert_eq!(duration, expected);
        assert_eq!(duration.to_string(), formatted);
    }

    #[rstest]
    #[case("")]
    #[case("10")]
    #[case("h")]
    #[case("10d")]
    #[case("-1s")]
    #[case("1.5s")]
    fn invalid_durations(#[case] input: &str) {
        assert!(Duration::from_str(input).is_err(), "{input:?} must not parse");
    }

    #[test]
    fn serde_uses_compact_notation() {
        let duration: Duration = serde_yaml::from_str("5m0s").expect("duration must deserialize");
        assert_eq!(duration, Duration::from_secs(300));
        assert_eq!(
            serde_yaml::to_string(&duration).expect("duration must serialize"),
            "5m0s\n"
        );
    }
}
