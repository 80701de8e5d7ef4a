//! Compound duration parsing for `remindme` and `snooze`.
//!
//! Accepts strings like `1w2d3h4m`, `45m`, `45` (bare minutes), or `2h`.
//! Groups must appear in week/day/hour/minute order, each at most once, with
//! nothing else in the string.

use crate::error::DurationError;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

// Anchored; [0-9] rather than \d to restrict to ASCII digits.
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<weeks>[0-9]+)w)?(?:(?P<days>[0-9]+)d)?(?:(?P<hours>[0-9]+)h)?(?:(?P<minutes>[0-9]+)m?)?$")
        .unwrap_or_else(|e| panic!("invalid duration regex: {e}"))
});

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_WEEK: u64 = 7 * SECS_PER_DAY;

/// A parsed compound duration, split by unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationSpec {
    pub weeks: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

impl DurationSpec {
    /// Total elapsed time in seconds, or `None` when the sum does not fit
    /// in a `u64`. [`parse`] rejects such specs up front.
    #[must_use]
    pub fn checked_total_secs(&self) -> Option<u64> {
        self.weeks
            .checked_mul(SECS_PER_WEEK)?
            .checked_add(self.days.checked_mul(SECS_PER_DAY)?)?
            .checked_add(self.hours.checked_mul(SECS_PER_HOUR)?)?
            .checked_add(self.minutes.checked_mul(SECS_PER_MINUTE)?)
    }

    /// Total elapsed time in seconds, saturating at `u64::MAX`.
    #[must_use]
    pub fn total_secs(&self) -> u64 {
        self.checked_total_secs().unwrap_or(u64::MAX)
    }

    /// Total elapsed time as a [`Duration`].
    #[must_use]
    pub fn total(&self) -> Duration {
        Duration::from_secs(self.total_secs())
    }
}

impl std::fmt::Display for DurationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::with_capacity(4);
        if self.weeks > 0 {
            parts.push(format!("{}w", self.weeks));
        }
        if self.days > 0 {
            parts.push(format!("{}d", self.days));
        }
        if self.hours > 0 {
            parts.push(format!("{}h", self.hours));
        }
        if self.minutes > 0 || parts.is_empty() {
            parts.push(format!("{}m", self.minutes));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Parse a compound duration string.
///
/// # Errors
///
/// Returns [`DurationError::Unparsable`] when the text does not match the
/// grammar, contains no digit group at all, or holds a value too large to
/// represent; [`DurationError::NonPositive`] when it parses but sums to zero.
pub fn parse(text: &str) -> Result<DurationSpec, DurationError> {
    let captures = DURATION_RE
        .captures(text)
        .ok_or_else(|| DurationError::Unparsable(text.to_owned()))?;

    // A captured group that overflows u64 is a reject, not an absent group.
    let mut any_group = false;
    let mut group = |name: &str| -> Result<u64, DurationError> {
        match captures.name(name) {
            None => Ok(0),
            Some(m) => {
                any_group = true;
                m.as_str()
                    .parse()
                    .map_err(|_| DurationError::Unparsable(text.to_owned()))
            }
        }
    };

    let spec = DurationSpec {
        weeks: group("weeks")?,
        days: group("days")?,
        hours: group("hours")?,
        minutes: group("minutes")?,
    };

    // The grammar admits the empty string; require at least one group.
    if !any_group {
        return Err(DurationError::Unparsable(text.to_owned()));
    }

    let total = spec
        .checked_total_secs()
        .ok_or_else(|| DurationError::Unparsable(text.to_owned()))?;
    if total == 0 {
        return Err(DurationError::NonPositive);
    }

    Ok(spec)
}
