//! Per-row timezone localization for event, onsale and presale dates.
//!
//! Each date carries its own zone column. A blank, `unknown` or `n/a` zone
//! falls back to the row's event zone; with no usable zone, or a name that
//! is not an IANA zone, the instant stays in UTC.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;

/// The zone name, unless it is missing or a placeholder.
pub fn usable_zone(name: Option<&str>) -> Option<&str> {
    let name = name?.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("unknown") || name.eq_ignore_ascii_case("n/a") {
        return None;
    }
    Some(name)
}

/// Express `instant` in `zone`, or in `fallback` when `zone` is unusable.
///
/// A zone name that does not parse keeps UTC; the fallback is only for
/// missing or placeholder names.
pub fn localize(
    instant: DateTime<Utc>,
    zone: Option<&str>,
    fallback: Option<&str>,
) -> DateTime<FixedOffset> {
    let Some(name) = usable_zone(zone).or_else(|| usable_zone(fallback)) else {
        return instant.fixed_offset();
    };

    match name.parse::<Tz>() {
        Ok(tz) => instant.with_timezone(&tz).fixed_offset(),
        Err(_) => {
            tracing::debug!(zone = %name, "unrecognized timezone, keeping UTC");
            instant.fixed_offset()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 20, 20, 0, 0).unwrap()
    }

    #[test]
    fn placeholders_are_unusable() {
        assert_eq!(usable_zone(None), None);
        assert_eq!(usable_zone(Some("")), None);
        assert_eq!(usable_zone(Some("   ")), None);
        assert_eq!(usable_zone(Some("Unknown")), None);
        assert_eq!(usable_zone(Some("N/A")), None);
        assert_eq!(usable_zone(Some(" America/Chicago ")), Some("America/Chicago"));
    }

    #[test]
    fn own_zone_wins() {
        let local = localize(instant(), Some("America/New_York"), Some("America/Chicago"));
        assert_eq!(local.to_rfc3339(), "2025-06-20T16:00:00-04:00");
    }

    #[test]
    fn placeholder_falls_back_to_event_zone() {
        let local = localize(instant(), Some("unknown"), Some("America/Chicago"));
        assert_eq!(local.to_rfc3339(), "2025-06-20T15:00:00-05:00");

        let local = localize(instant(), None, Some("America/Chicago"));
        assert_eq!(local.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn no_usable_zone_keeps_utc() {
        let local = localize(instant(), Some("n/a"), Some(""));
        assert_eq!(local.to_rfc3339(), "2025-06-20T20:00:00+00:00");
    }

    #[test]
    fn unparseable_zone_keeps_utc_without_fallback() {
        let local = localize(instant(), Some("Mars/Olympus_Mons"), Some("America/Chicago"));
        assert_eq!(local.offset().local_minus_utc(), 0);
        assert_eq!(local, instant());
    }

    #[test]
    fn same_instant_after_localizing() {
        let local = localize(instant(), Some("Europe/London"), None);
        assert_eq!(local.with_timezone(&Utc), instant());
    }
}
