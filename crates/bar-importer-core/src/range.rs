use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use tracing::debug;

use crate::zone::{ZoneConfig, localize};

/// Earliest wall-clock time the provider accepts (signed 32-bit epoch floor).
pub const MIN_SUPPORTED: NaiveDateTime = match NaiveDate::from_ymd_opt(1901, 12, 13) {
    Some(d) => d.and_time(chrono::NaiveTime::MIN),
    None => panic!("invalid MIN_SUPPORTED"),
};

/// Latest wall-clock time the provider accepts (signed 32-bit epoch ceiling).
pub const MAX_SUPPORTED: NaiveDateTime = match NaiveDate::from_ymd_opt(2038, 1, 19) {
    Some(d) => d.and_time(chrono::NaiveTime::MIN),
    None => panic!("invalid MAX_SUPPORTED"),
};

/// Start/end pair expressed in the provider's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderRange {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Turns an optional caller range into the range handed to the provider.
#[derive(Debug, Clone, Copy)]
pub struct RangeNormalizer {
    zones: ZoneConfig,
}

impl RangeNormalizer {
    pub fn new(zones: ZoneConfig) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &ZoneConfig {
        &self.zones
    }

    /// Default missing bounds, clamp each bound against its own limit, and
    /// convert both from the caller's zone into the provider's zone.
    ///
    /// A start later than [`MAX_SUPPORTED`] or an end earlier than
    /// [`MIN_SUPPORTED`] is left alone, and an inverted range is returned
    /// inverted. Whatever the provider does with such a range is up to it.
    pub fn normalize(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> ProviderRange {
        let start = match start {
            Some(s) if s >= MIN_SUPPORTED => s,
            _ => MIN_SUPPORTED,
        };
        let end = match end {
            Some(e) if e <= MAX_SUPPORTED => e,
            _ => MAX_SUPPORTED,
        };

        let range = ProviderRange {
            start: self.to_provider(start),
            end: self.to_provider(end),
        };
        debug!(
            "normalized range {start} .. {end} ({}) -> {} .. {}",
            self.zones.local, range.start, range.end
        );
        range
    }

    /// Convert a caller wall-clock time into the provider's zone. Each call
    /// uses the offset in force on that instant's own date.
    pub fn to_provider(&self, local: NaiveDateTime) -> DateTime<Tz> {
        localize(&self.zones.local, local).with_timezone(&self.zones.provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, TimeZone};
    use chrono_tz::America::New_York;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn normalizer(local: Tz) -> RangeNormalizer {
        RangeNormalizer::new(ZoneConfig::new(local))
    }

    #[test]
    fn clamps_both_bounds_outside_window() {
        let n = normalizer(chrono_tz::Europe::London);
        let range = n.normalize(Some(date(1850, 1, 1)), Some(date(2050, 1, 1)));
        assert_eq!(range.start, n.to_provider(MIN_SUPPORTED));
        assert_eq!(range.end, n.to_provider(MAX_SUPPORTED));
    }

    #[test]
    fn absent_bounds_match_clamped_bounds() {
        let n = normalizer(chrono_tz::Asia::Tokyo);
        let defaulted = n.normalize(None, None);
        let clamped = n.normalize(Some(date(1850, 1, 1)), Some(date(2050, 1, 1)));
        assert_eq!(defaulted, clamped);
    }

    #[test]
    fn in_window_bounds_are_kept() {
        let n = normalizer(chrono_tz::UTC);
        let range = n.normalize(Some(date(2020, 1, 1)), Some(date(2020, 2, 1)));
        // UTC midnight is 19:00 the previous evening in New York (EST)
        assert_eq!(range.start, New_York.with_ymd_and_hms(2019, 12, 31, 19, 0, 0).unwrap());
        assert_eq!(range.end, New_York.with_ymd_and_hms(2020, 1, 31, 19, 0, 0).unwrap());
    }

    #[test]
    fn bounds_exactly_on_limits_are_kept() {
        let n = normalizer(New_York);
        let range = n.normalize(Some(MIN_SUPPORTED), Some(MAX_SUPPORTED));
        assert_eq!(range.start.naive_local(), MIN_SUPPORTED);
        assert_eq!(range.end.naive_local(), MAX_SUPPORTED);
    }

    #[test]
    fn same_zone_is_identity_on_wall_clock() {
        let n = normalizer(New_York);
        let range = n.normalize(Some(date(2021, 6, 1)), Some(date(2021, 6, 30)));
        assert_eq!(range.start.naive_local(), date(2021, 6, 1));
        assert_eq!(range.end.naive_local(), date(2021, 6, 30));
    }

    #[test]
    fn start_beyond_max_is_not_clamped_down() {
        let n = normalizer(New_York);
        let range = n.normalize(Some(date(2045, 1, 1)), None);
        assert_eq!(range.start.naive_local(), date(2045, 1, 1));
        assert_eq!(range.end.naive_local(), MAX_SUPPORTED);
        assert!(range.start > range.end);
    }

    #[test]
    fn end_before_min_is_not_clamped_up() {
        let n = normalizer(New_York);
        let range = n.normalize(None, Some(date(1880, 1, 1)));
        assert_eq!(range.start.naive_local(), MIN_SUPPORTED);
        assert_eq!(range.end.naive_local(), date(1880, 1, 1));
    }

    #[test]
    fn inverted_range_passes_through() {
        let n = normalizer(New_York);
        let range = n.normalize(Some(date(2020, 3, 1)), Some(date(2020, 1, 1)));
        assert_eq!(range.start.naive_local(), date(2020, 3, 1));
        assert_eq!(range.end.naive_local(), date(2020, 1, 1));
        assert!(range.start > range.end);
    }

    #[test]
    fn bounds_straddling_dst_use_their_own_offsets() {
        let n = normalizer(chrono_tz::UTC);
        // January is EST (UTC-5), July is EDT (UTC-4)
        let range = n.normalize(Some(date(2021, 1, 10)), Some(date(2021, 7, 10)));
        assert_eq!(range.start.offset().fix().local_minus_utc(), -5 * 3600);
        assert_eq!(range.end.offset().fix().local_minus_utc(), -4 * 3600);
        assert_eq!(range.start.naive_local(), date(2021, 1, 9) + chrono::Duration::hours(19));
        assert_eq!(range.end.naive_local(), date(2021, 7, 9) + chrono::Duration::hours(20));
    }

    #[test]
    fn conversion_preserves_the_instant() {
        let n = normalizer(chrono_tz::Australia::Sydney);
        let local = date(2022, 5, 20) + chrono::Duration::hours(10);
        let converted = n.to_provider(local);
        let expected = chrono_tz::Australia::Sydney
            .from_local_datetime(&local)
            .unwrap();
        assert_eq!(converted, expected);
    }
}
