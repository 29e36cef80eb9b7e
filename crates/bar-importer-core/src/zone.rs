use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

use crate::error::ConfigError;

/// Zone the provider anchors its dates to (US Eastern).
pub const PROVIDER_ZONE: Tz = chrono_tz::America::New_York;

/// Resolved time-zone pair used to translate caller wall-clock times into the
/// provider's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneConfig {
    pub local: Tz,
    pub provider: Tz,
}

impl ZoneConfig {
    /// Caller zone `local`, provider zone US Eastern.
    pub fn new(local: Tz) -> Self {
        Self {
            local,
            provider: PROVIDER_ZONE,
        }
    }

    /// Resolve both zones from IANA names, e.g. `Europe/Berlin`.
    pub fn from_names(local: &str, provider: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            local: resolve_zone(local)?,
            provider: resolve_zone(provider)?,
        })
    }
}

/// Look up an IANA time zone by name.
pub fn resolve_zone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimeZone(name.to_string()))
}

/// Interpret `naive` as wall-clock time in `tz`.
///
/// Times repeated by a fall-back transition resolve to the earlier instant.
/// Times skipped by a spring-forward transition use the offset in force
/// before the gap, so they land just past it.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(earliest, _) => earliest,
        chrono::LocalResult::None => {
            let offset = offset_before_gap(tz, naive);
            let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
            tz.from_utc_datetime(&utc)
        }
    }
}

/// Offset of the last wall-clock time before the gap containing `naive`.
/// Walks back in quarter hours; no real gap is longer than two days.
fn offset_before_gap(tz: &Tz, naive: NaiveDateTime) -> FixedOffset {
    (1..=GAP_SEARCH_STEPS)
        .find_map(|step| {
            let probe = naive - Duration::minutes(15 * step);
            match tz.from_local_datetime(&probe) {
                chrono::LocalResult::Single(dt) => Some(dt.offset().fix()),
                chrono::LocalResult::Ambiguous(_, latest) => Some(latest.offset().fix()),
                chrono::LocalResult::None => None,
            }
        })
        .unwrap_or_else(|| tz.offset_from_utc_datetime(&naive).fix())
}

const GAP_SEARCH_STEPS: i64 = 2 * 24 * 4;

/// Zone name carried by a POSIX `TZ` value, or `None` when the value points
/// at the host's own zone (empty, `:/etc/localtime`).
///
/// A leading `:` is dropped and a `.../zoneinfo/Area/City` path is reduced to
/// `Area/City`. Anything else is returned as-is for [`resolve_zone`] to judge.
pub fn tz_var_zone_name(value: &str) -> Option<&str> {
    let value = value.trim();
    let value = value.strip_prefix(':').unwrap_or(value);
    if value.is_empty() {
        return None;
    }
    if let Some((_, name)) = value.split_once("zoneinfo/") {
        return Some(name).filter(|n| !n.is_empty());
    }
    if value.starts_with('/') {
        return None;
    }
    Some(value)
}
