//! Seek targets.
//!
//! Accepted grammars:
//!
//! | Input       | Meaning                                   |
//! |-------------|-------------------------------------------|
//! | `hh:mm:ss`  | absolute offset                           |
//! | `mm:ss`     | absolute offset                           |
//! | `ss`        | absolute offset in seconds                |
//! | `NN%`       | percentage of the total duration          |
//! | `-1`        | uniformly random point in `[0, duration]` |
//!
//! Percentage and random specs need the media duration, which only the
//! client can query, so parsing and resolution are separate steps.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::errors::ResolutionError;

static HMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+):([0-9]+):([0-9]+)$").expect("static regex"));
static MS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+):([0-9]+)$").expect("static regex"));
static SECS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9]+)$").expect("static regex"));
static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)%$").expect("static regex"));

const RANDOM_SENTINEL: &str = "-1";

/// A parsed seek target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimecodeSpec {
    /// Absolute offset in seconds.
    Seconds(u64),
    /// Percentage of the total duration (values above 100 are kept).
    Percent(u64),
    /// Pick uniformly at random within the full duration.
    Random,
}

impl TimecodeSpec {
    /// Parse a spec as it appears after `/seek `.
    pub fn parse(input: &str) -> Result<Self, ResolutionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ResolutionError::Empty);
        }
        if input == RANDOM_SENTINEL {
            return Ok(Self::Random);
        }
        if let Some(caps) = HMS.captures(input) {
            let h = field(&caps[1])?;
            let m = field(&caps[2])?;
            let s = field(&caps[3])?;
            return h
                .checked_mul(3600)
                .and_then(|h| m.checked_mul(60).and_then(|m| h.checked_add(m)))
                .and_then(|hm| hm.checked_add(s))
                .map(Self::Seconds)
                .ok_or_else(|| ResolutionError::OutOfRange(input.to_string()));
        }
        if let Some(caps) = MS.captures(input) {
            let m = field(&caps[1])?;
            let s = field(&caps[2])?;
            return m
                .checked_mul(60)
                .and_then(|m| m.checked_add(s))
                .map(Self::Seconds)
                .ok_or_else(|| ResolutionError::OutOfRange(input.to_string()));
        }
        if let Some(caps) = SECS.captures(input) {
            return Ok(Self::Seconds(field(&caps[1])?));
        }
        if let Some(caps) = PERCENT.captures(input) {
            return Ok(Self::Percent(field(&caps[1])?));
        }
        Err(ResolutionError::Malformed(input.to_string()))
    }

    /// Whether resolving this spec requires the media duration.
    pub const fn needs_duration(&self) -> bool {
        matches!(self, Self::Percent(_) | Self::Random)
    }

    /// Turn the spec into an absolute offset.
    ///
    /// A zero (unknown) duration resolves percentage and random specs to 0.
    pub fn resolve<R: Rng>(&self, duration: u64, rng: &mut R) -> u64 {
        match *self {
            Self::Seconds(s) => s,
            Self::Percent(pct) => {
                let scaled = u128::from(pct) * u128::from(duration) / 100;
                u64::try_from(scaled).unwrap_or(u64::MAX)
            }
            Self::Random => rng.random_range(0..=duration),
        }
    }
}

impl FromStr for TimecodeSpec {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TimecodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(s) => write!(f, "{s}"),
            Self::Percent(p) => write!(f, "{p}%"),
            Self::Random => f.write_str(RANDOM_SENTINEL),
        }
    }
}

fn field(digits: &str) -> Result<u64, ResolutionError> {
    digits
        .parse()
        .map_err(|_| ResolutionError::OutOfRange(digits.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn resolve(input: &str, duration: u64) -> Result<u64, ResolutionError> {
        TimecodeSpec::parse(input).map(|spec| spec.resolve(duration, &mut rng()))
    }

    #[test]
    fn hours_minutes_seconds() {
        assert_eq!(resolve("01:02:03", 0), Ok(3723));
        assert_eq!(resolve("0:0:0", 0), Ok(0));
    }

    #[test]
    fn minutes_seconds() {
        assert_eq!(resolve("02:03", 0), Ok(123));
        // Fields are not range-checked, as with plain seconds.
        assert_eq!(resolve("1:75", 0), Ok(135));
    }

    #[test]
    fn plain_seconds() {
        assert_eq!(resolve("45", 0), Ok(45));
        assert_eq!(resolve("  45 ", 0), Ok(45));
    }

    #[test]
    fn percentage_of_duration() {
        assert_eq!(resolve("50%", 200), Ok(100));
        assert_eq!(resolve("29%", 100), Ok(29));
        assert_eq!(resolve("33%", 10), Ok(3));
        assert_eq!(resolve("50%", 0), Ok(0));
    }

    #[test]
    fn random_with_unknown_duration_is_zero() {
        assert_eq!(resolve("-1", 0), Ok(0));
    }

    #[test]
    fn random_stays_within_duration() {
        let spec = TimecodeSpec::parse("-1").unwrap();
        let mut rng = rng();
        for _ in 0..200 {
            assert!(spec.resolve(30, &mut rng) <= 30);
        }
    }

    #[test]
    fn only_relative_specs_need_duration() {
        assert!(TimecodeSpec::Random.needs_duration());
        assert!(TimecodeSpec::Percent(10).needs_duration());
        assert!(!TimecodeSpec::Seconds(10).needs_duration());
    }

    #[test]
    fn malformed_input_fails() {
        assert_matches!(resolve("abc", 100), Err(ResolutionError::Malformed(_)));
        assert_matches!(resolve("1:2:3:4", 100), Err(ResolutionError::Malformed(_)));
        assert_matches!(resolve("-2", 100), Err(ResolutionError::Malformed(_)));
        assert_matches!(resolve("10.5", 100), Err(ResolutionError::Malformed(_)));
        assert_matches!(resolve("%", 100), Err(ResolutionError::Malformed(_)));
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(resolve("", 100), Err(ResolutionError::Empty));
        assert_eq!(resolve("   ", 100), Err(ResolutionError::Empty));
    }

    #[test]
    fn overflow_is_out_of_range() {
        assert_matches!(
            resolve("99999999999999999999999", 0),
            Err(ResolutionError::OutOfRange(_))
        );
        assert_matches!(
            resolve("9999999999999999999:00:00", 0),
            Err(ResolutionError::OutOfRange(_))
        );
    }

    #[test]
    fn display_round_trips() {
        for input in ["45", "50%", "-1"] {
            assert_eq!(TimecodeSpec::parse(input).unwrap().to_string(), input);
        }
    }
}
