//! Time expression resolution.
//!
//! Turns the date and time fragments of a command into concrete timestamps.
//! Date-times are tried against an ordered list of layouts and the first layout
//! that consumes the whole fragment wins. A layout without a date part resolves
//! against today's date.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::format::{self, Item, Parsed, ParseErrorKind, StrftimeItems};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

use crate::types::TimeRange;

/// Strftime patterns accepted by the ISO-8601 layout, tried in order.
const ISO_8601_PATTERNS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// The only layout accepted for plain calendar dates.
const DATE_PATTERN: &str = "%Y-%m-%d";

/// Layouts used when the configuration does not name any.
pub const DEFAULT_LAYOUTS: [&str; 7] = [
    "%H:%M:%S",
    "%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "iso8601",
];

/// A date or time fragment that no layout could parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot parse '{text}' as a date/time (tried {})", layouts.join(", "))]
pub struct FormatError {
    pub text: String,
    pub layouts: Vec<String>,
}

/// A layout string that is not a valid strftime pattern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid date/time layout: {0}")]
pub struct InvalidLayout(String);

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// The system clock in local time, truncated to whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// One candidate date-time layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeLayout {
    /// `YYYY-MM-DDTHH:MM[:SS[.fff]]`
    Iso8601,
    /// A chrono strftime pattern, e.g. `%m/%d/%Y %H:%M`.
    Pattern(String),
}

impl DateTimeLayout {
    /// Parses `text` completely, returning the date (if the layout has one) and time.
    fn parse(&self, text: &str) -> Option<(Option<NaiveDate>, chrono::NaiveTime)> {
        match self {
            Self::Iso8601 => ISO_8601_PATTERNS
                .iter()
                .find_map(|pattern| parse_with_pattern(pattern, text)),
            Self::Pattern(pattern) => parse_with_pattern(pattern, text),
        }
    }

    /// Default layouts, in resolution order.
    pub fn defaults() -> Vec<Self> {
        DEFAULT_LAYOUTS
            .iter()
            .map(|layout| match *layout {
                "iso8601" => Self::Iso8601,
                pattern => Self::Pattern(pattern.to_string()),
            })
            .collect()
    }
}

impl FromStr for DateTimeLayout {
    type Err = InvalidLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iso8601" | "iso" => Ok(Self::Iso8601),
            _ if s.trim().is_empty() => Err(InvalidLayout(s.to_string())),
            _ if StrftimeItems::new(s).any(|item| matches!(item, Item::Error)) => {
                Err(InvalidLayout(s.to_string()))
            }
            _ => Ok(Self::Pattern(s.to_string())),
        }
    }
}

impl fmt::Display for DateTimeLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iso8601 => write!(f, "iso8601"),
            Self::Pattern(pattern) => write!(f, "{pattern}"),
        }
    }
}

fn parse_with_pattern(pattern: &str, text: &str) -> Option<(Option<NaiveDate>, chrono::NaiveTime)> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, text, StrftimeItems::new(pattern)).ok()?;
    let time = parsed.to_naive_time().ok()?;
    match parsed.to_naive_date() {
        Ok(date) => Some((Some(date), time)),
        Err(err) if err.kind() == ParseErrorKind::NotEnough => Some((None, time)),
        Err(_) => None,
    }
}

/// Unit of a relative ("N units ago") time expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    /// Maps a unit token from the command grammar, if it names a known unit.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(Self::Hours),
            "m" | "min" | "mins" | "minute" | "minutes" => Some(Self::Minutes),
            "s" | "sec" | "secs" | "second" | "seconds" => Some(Self::Seconds),
            _ => None,
        }
    }

    fn duration(self, amount: u32) -> Duration {
        let amount = i64::from(amount);
        match self {
            Self::Hours => Duration::hours(amount),
            Self::Minutes => Duration::minutes(amount),
            Self::Seconds => Duration::seconds(amount),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hours => "hours",
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
        };
        write!(f, "{s}")
    }
}

/// Resolves date and time fragments against a list of layouts and a clock.
#[derive(Clone)]
pub struct TimeResolver {
    layouts: Vec<DateTimeLayout>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TimeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeResolver")
            .field("layouts", &self.layouts)
            .finish_non_exhaustive()
    }
}

impl Default for TimeResolver {
    fn default() -> Self {
        Self::new(DateTimeLayout::defaults(), Arc::new(SystemClock))
    }
}

impl TimeResolver {
    pub fn new(layouts: Vec<DateTimeLayout>, clock: Arc<dyn Clock>) -> Self {
        Self { layouts, clock }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn layouts(&self) -> &[DateTimeLayout] {
        &self.layouts
    }

    /// Parses a strict `YYYY-MM-DD` calendar date.
    pub fn resolve_date(&self, text: &str) -> Result<NaiveDate, FormatError> {
        NaiveDate::parse_from_str(text, DATE_PATTERN).map_err(|_| FormatError {
            text: text.to_string(),
            layouts: vec![DATE_PATTERN.to_string()],
        })
    }

    /// Parses a date-time with the first matching layout.
    ///
    /// Layouts without a date component resolve to today.
    pub fn resolve_date_time(&self, text: &str) -> Result<NaiveDateTime, FormatError> {
        let (date, time) = self
            .layouts
            .iter()
            .find_map(|layout| layout.parse(text))
            .ok_or_else(|| FormatError {
                text: text.to_string(),
                layouts: self.layouts.iter().map(ToString::to_string).collect(),
            })?;
        let date = date.unwrap_or_else(|| self.clock.today());
        Ok(date.and_time(time))
    }

    /// Resolves "`amount` `unit` ago".
    pub fn resolve_relative(&self, amount: u32, unit: TimeUnit) -> Result<NaiveDateTime, FormatError> {
        self.clock
            .now()
            .checked_sub_signed(unit.duration(amount))
            .ok_or_else(|| FormatError {
                text: format!("{amount} {unit} ago"),
                layouts: Vec::new(),
            })
    }

    /// Resolves a range with a mandatory start and optional end.
    pub fn resolve_range(&self, start: &str, end: Option<&str>) -> Result<TimeRange, FormatError> {
        let start = self.resolve_date_time(start)?;
        let end = end.map(|end| self.resolve_date_time(end)).transpose()?;
        Ok(TimeRange { start, end })
    }

    /// Resolves an optional, already resolved range; none means "from now on".
    pub fn resolve_bare_time(&self, range: Option<TimeRange>) -> TimeRange {
        range.unwrap_or_else(|| TimeRange::open(self.clock.now()))
    }
}
