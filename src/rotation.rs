use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::{format_description, offset};
use time::{OffsetDateTime, UtcOffset};

/// Fixed reference offset for calendar computations and rendered
/// timestamps. Midnight rotation aligns to a day boundary at this offset
/// no matter how the host timezone is configured.
pub const REFERENCE_OFFSET: UtcOffset = offset!(+8);

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

static MINUTE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}$").unwrap());
static HOUR_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").unwrap());
static DAY_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Rotation period selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum When {
    /// Rotate every minute.
    Minute,
    /// Rotate every hour.
    Hour,
    /// Rotate every 24 hours from the alignment anchor.
    #[default]
    Day,
    /// Rotate at the start of each calendar day at [`REFERENCE_OFFSET`].
    Midnight,
}

impl When {
    /// Parse a period selector. Both the single-letter spellings (`M`,
    /// `H`, `D`, `MIDNIGHT`) and full words are accepted, case
    /// insensitively; anything unrecognized falls back to `Day`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" | "MINUTE" => Self::Minute,
            "H" | "HOUR" => Self::Hour,
            "D" | "DAY" => Self::Day,
            "MIDNIGHT" => Self::Midnight,
            _ => Self::Day,
        }
    }

    /// Length of one rotation interval in seconds.
    pub fn interval(self) -> i64 {
        match self {
            Self::Minute => SECONDS_PER_MINUTE,
            Self::Hour => SECONDS_PER_HOUR,
            Self::Day | Self::Midnight => SECONDS_PER_DAY,
        }
    }

    /// Backup suffix layout for this period.
    pub(crate) fn suffix(self) -> &'static [BorrowedFormatItem<'static>] {
        match self {
            Self::Minute => format_description!("[year]-[month]-[day]_[hour]-[minute]"),
            Self::Hour => format_description!("[year][month][day][hour]"),
            Self::Day | Self::Midnight => format_description!("[year]-[month]-[day]"),
        }
    }

    /// Pattern recognizing this logger's own backup suffixes among
    /// directory siblings. Unrelated files sharing the prefix never
    /// match.
    pub(crate) fn pattern(self) -> &'static Regex {
        match self {
            Self::Minute => &MINUTE_SUFFIX,
            Self::Hour => &HOUR_SUFFIX,
            Self::Day | Self::Midnight => &DAY_SUFFIX,
        }
    }

    /// The next rollover instant strictly after `now`.
    pub(crate) fn next_rollover(self, now: OffsetDateTime) -> i64 {
        match self {
            Self::Midnight => next_midnight(now),
            _ => next_boundary(now.unix_timestamp(), self.interval()),
        }
    }
}

impl From<String> for When {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<When> for String {
    fn from(when: When) -> Self {
        match when {
            When::Minute => "minute",
            When::Hour => "hour",
            When::Day => "day",
            When::Midnight => "midnight",
        }
        .to_string()
    }
}

/// Next multiple of `interval` strictly after `t`:
/// `floor(t / interval + 1) * interval`.
pub(crate) fn next_boundary(t: i64, interval: i64) -> i64 {
    (t / interval + 1) * interval
}

/// Start of the next calendar day at the reference offset.
fn next_midnight(now: OffsetDateTime) -> i64 {
    let local = now.to_offset(REFERENCE_OFFSET);
    match local.date().next_day() {
        Some(next) => next.midnight().assume_offset(REFERENCE_OFFSET).unix_timestamp(),
        // Only reachable at the end of the representable calendar.
        None => local.unix_timestamp() + SECONDS_PER_DAY,
    }
}
