use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc};

// All civil dates/times in the system are Asia/Manila (UTC+8, no DST),
// regardless of the host machine's timezone.
const UTC_OFFSET_SECS: i32 = 8 * 3600;

fn manila_offset() -> FixedOffset {
    FixedOffset::east_opt(UTC_OFFSET_SECS).expect("valid fixed offset")
}

/// A single instant expressed as civil wall-clock fields.
#[derive(Debug, Clone)]
pub struct CivilDateTime {
    /// `YYYY-MM-DD`
    pub date: String,
    /// 12-hour display time, e.g. "6:30 AM"
    pub time: String,
    pub hours: u32,
    pub minutes: u32,
    /// Minutes since midnight, 0..=1439. Basis of status classification.
    pub total_minutes: u32,
    /// Full weekday name, e.g. "Monday"
    pub day_name: String,
    pub year: i32,
}

/// A civil calendar day, used for the rolling weekly window.
#[derive(Debug, Clone)]
pub struct CivilDay {
    pub date: String,
    pub day_short: String,
    pub day_full: String,
    pub year: i32,
}

pub fn now() -> CivilDateTime {
    civil_from_utc(Utc::now())
}

pub fn civil_from_utc(instant: DateTime<Utc>) -> CivilDateTime {
    let local = instant.with_timezone(&manila_offset());
    CivilDateTime {
        date: local.format("%Y-%m-%d").to_string(),
        time: local.format("%-I:%M %p").to_string(),
        hours: local.hour(),
        minutes: local.minute(),
        total_minutes: local.hour() * 60 + local.minute(),
        day_name: local.format("%A").to_string(),
        year: local.year(),
    }
}

pub fn date_offset(delta_days: i64) -> CivilDay {
    day_from_utc(Utc::now(), delta_days)
}

pub fn day_from_utc(instant: DateTime<Utc>, delta_days: i64) -> CivilDay {
    let local = (instant + Duration::days(delta_days)).with_timezone(&manila_offset());
    CivilDay {
        date: local.format("%Y-%m-%d").to_string(),
        day_short: local.format("%a").to_string(),
        day_full: local.format("%A").to_string(),
        year: local.year(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn civil_fields_are_manila_local() {
        // 2025-01-14 22:30 UTC is 2025-01-15 06:30 in Manila.
        let c = civil_from_utc(utc(2025, 1, 14, 22, 30));
        assert_eq!(c.date, "2025-01-15");
        assert_eq!(c.time, "6:30 AM");
        assert_eq!(c.hours, 6);
        assert_eq!(c.minutes, 30);
        assert_eq!(c.total_minutes, 390);
        assert_eq!(c.day_name, "Wednesday");
        assert_eq!(c.year, 2025);
    }

    #[test]
    fn afternoon_uses_pm_display() {
        let c = civil_from_utc(utc(2025, 1, 15, 7, 5));
        assert_eq!(c.time, "3:05 PM");
        assert_eq!(c.total_minutes, 15 * 60 + 5);
    }

    #[test]
    fn date_offset_crosses_month_boundaries() {
        // Manila date for this instant is 2025-03-01.
        let base = utc(2025, 2, 28, 20, 0);
        assert_eq!(day_from_utc(base, 0).date, "2025-03-01");
        assert_eq!(day_from_utc(base, -1).date, "2025-02-28");
        assert_eq!(day_from_utc(base, -6).date, "2025-02-23");
        assert_eq!(day_from_utc(base, 1).date, "2025-03-02");
    }

    #[test]
    fn day_names_match_date() {
        let d = day_from_utc(utc(2025, 1, 14, 22, 30), 0);
        assert_eq!(d.day_short, "Wed");
        assert_eq!(d.day_full, "Wednesday");
        assert_eq!(d.year, 2025);
    }
}
