use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParsePeriodError;

/// Sampling interval requested by a caller.
///
/// The intraday variants exist so callers can express them; the importer only
/// accepts [`Period::Daily`], [`Period::Weekly`] and [`Period::Monthly`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    PerSecond,
    PerMinute,
    Per15Minute,
    Per30Minute,
    Hourly,
    BiHourly,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    /// Whether this period is one of the daily/weekly/monthly granularities.
    pub fn is_interday(self) -> bool {
        matches!(self, Period::Daily | Period::Weekly | Period::Monthly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::PerSecond => "1s",
            Period::PerMinute => "1m",
            Period::Per15Minute => "15m",
            Period::Per30Minute => "30m",
            Period::Hourly => "1h",
            Period::BiHourly => "2h",
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1s" | "second" => Ok(Period::PerSecond),
            "1m" | "minute" => Ok(Period::PerMinute),
            "15m" => Ok(Period::Per15Minute),
            "30m" => Ok(Period::Per30Minute),
            "1h" | "hourly" => Ok(Period::Hourly),
            "2h" | "bihourly" => Ok(Period::BiHourly),
            "1d" | "d" | "daily" => Ok(Period::Daily),
            "1wk" | "w" | "weekly" => Ok(Period::Weekly),
            "1mo" | "mo" | "monthly" => Ok(Period::Monthly),
            _ => Err(ParsePeriodError(s.to_string())),
        }
    }
}

/// One-to-one translation from the public [`Period`] to a provider's own
/// period vocabulary `P`.
///
/// Each provider ships its own table, so swapping providers never changes
/// the public period type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodMap<P> {
    pub daily: P,
    pub weekly: P,
    pub monthly: P,
}

impl<P: Copy> PeriodMap<P> {
    pub fn new(daily: P, weekly: P, monthly: P) -> Self {
        Self {
            daily,
            weekly,
            monthly,
        }
    }

    /// Provider period for `period`, or `None` for intraday periods.
    pub fn lookup(&self, period: Period) -> Option<P> {
        match period {
            Period::Daily => Some(self.daily),
            Period::Weekly => Some(self.weekly),
            Period::Monthly => Some(self.monthly),
            _ => None,
        }
    }
}
