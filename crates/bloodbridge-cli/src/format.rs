use chrono::{DateTime, NaiveDate, Utc};

/// Human-readable age of a timestamp relative to `now`, e.g. "2m ago".
///
/// Hours and days round to the nearest unit.
pub fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        // Future timestamps (clock skew) also land here
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Truncate to at most `max_len` characters, adding an ellipsis if needed.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Fall back to `default` for blank values.
pub fn or_placeholder<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_format_age() {
        let now = base();
        assert_eq!(format_age(now, now), "just now");
        assert_eq!(format_age(now + Duration::minutes(5), now), "just now");
        assert_eq!(format_age(now - Duration::seconds(59), now), "just now");
        assert_eq!(format_age(now - Duration::minutes(2), now), "2m ago");
        assert_eq!(format_age(now - Duration::minutes(89), now), "1h ago");
        assert_eq!(format_age(now - Duration::minutes(90), now), "2h ago");
        assert_eq!(format_age(now - Duration::hours(36), now), "2d ago");
        assert_eq!(format_age(now - Duration::hours(30), now), "1d ago");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Central Mercy Hospital", 10), "Central...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Sector 5", 3), "Sec");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2023, 10, 15).unwrap();
        assert_eq!(format_date(date), "Oct 15, 2023");
    }

    #[test]
    fn test_or_placeholder() {
        assert_eq!(or_placeholder("  ", "(not set)"), "(not set)");
        assert_eq!(or_placeholder("Priya", "(not set)"), "Priya");
    }
}
