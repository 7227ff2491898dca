use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::anyhow;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str = "parlor-time.toml";
const TIMEZONE_ENV_VAR: &str = "PARLOR_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str = "PARLOR_TIME_CONFIG";
const DEFAULT_SALON_TIMEZONE: &str = "America/New_York";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
    time: Option<TimezoneSection>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    timezone: Option<String>,
}

/// The salon's wall-clock timezone. Appointments carry naive dates and
/// times in this zone, so "now" must be converted into it before any
/// upcoming/past comparison.
pub fn salon_timezone() -> &'static Tz {
    static SALON_TZ: OnceLock<Tz> = OnceLock::new();
    SALON_TZ.get_or_init(resolve_salon_timezone)
}

/// The current instant as the salon's wall clock sees it.
#[must_use]
pub fn salon_now(now: DateTime<Utc>) -> NaiveDateTime {
    now.with_timezone(salon_timezone()).naive_local()
}

#[must_use]
pub fn salon_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(salon_timezone()).date_naive()
}

fn resolve_salon_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR) {
        if let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR) {
            return tz;
        }
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    parse_timezone(DEFAULT_SALON_TIMEZONE, "DEFAULT_SALON_TIMEZONE").unwrap_or_else(|| {
        tracing::error!("failed to parse fallback timezone; using UTC");
        chrono_tz::UTC
    })
}

fn timezone_config_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(TIMEZONE_CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(TIMEZONE_CONFIG_FILE))
}

fn load_timezone_from_file(path: &PathBuf) -> Option<Tz> {
    if !path.exists() {
        tracing::info!(file = %path.display(), "timezone config file not found");
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(file = %path.display(), error = %err, "failed reading timezone config file");
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(file = %path.display(), error = %err, "failed parsing timezone config file");
            return None;
        }
    };

    let timezone = parsed
        .timezone
        .or_else(|| parsed.time.and_then(|section| section.timezone));
    let Some(timezone) = timezone else {
        tracing::warn!(file = %path.display(), "timezone config had no timezone field");
        return None;
    };

    parse_timezone(timezone.as_str(), &format!("file:{}", path.display()))
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::warn!(source, "timezone source was empty");
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            tracing::info!(source, timezone = %trimmed, "configured salon timezone");
            Some(tz)
        }
        Err(err) => {
            tracing::error!(source, timezone = %trimmed, error = %err, "failed to parse timezone id");
            None
        }
    }
}

/// Resolve a user-supplied date argument against the salon's current date.
///
/// Accepts `today`, `tomorrow`, a weekday name (next occurrence, never
/// today), or an ISO `YYYY-MM-DD` date.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_arg(input: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "today" => return Ok(today),
        "tomorrow" => {
            return today
                .checked_add_days(Days::new(1))
                .ok_or_else(|| anyhow!("date out of range: tomorrow"));
        }
        _ => {}
    }

    if let Some(target_weekday) = parse_weekday_name(&lower) {
        return Ok(next_weekday_date(today, target_weekday));
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Ok(date);
    }

    Err(anyhow!(
        "unrecognized date: {input} (expected today, tomorrow, a weekday name, or YYYY-MM-DD)"
    ))
}

fn parse_weekday_name(token: &str) -> Option<Weekday> {
    match token.trim() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn next_weekday_date(from: NaiveDate, target: Weekday) -> NaiveDate {
    let from_idx = from.weekday().num_days_from_monday() as i64;
    let target_idx = target.num_days_from_monday() as i64;
    let mut delta = (7 + target_idx - from_idx) % 7;
    if delta == 0 {
        delta = 7;
    }
    from.checked_add_signed(chrono::Duration::days(delta))
        .unwrap_or(from)
}

/// Parse an `HH:MM` clock time, optionally suffixed with am/pm.
pub fn parse_clock_time(token: &str) -> Option<(u32, u32)> {
    let clock_re =
        Regex::new(r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$").ok()?;
    let captures = clock_re.captures(token.trim())?;

    let raw_hour = captures.name("hour")?.as_str().parse::<u32>().ok()?;
    let minute = captures.name("minute")?.as_str().parse::<u32>().ok()?;
    if minute > 59 {
        return None;
    }

    let hour = if let Some(ampm_match) = captures.name("ampm") {
        let ampm = ampm_match.as_str().to_ascii_lowercase();
        if raw_hour == 0 || raw_hour > 12 {
            return None;
        }
        match ampm.as_str() {
            "am" => {
                if raw_hour == 12 {
                    0
                } else {
                    raw_hour
                }
            }
            "pm" => {
                if raw_hour == 12 {
                    12
                } else {
                    raw_hour + 12
                }
            }
            _ => return None,
        }
    } else {
        if raw_hour > 23 {
            return None;
        }
        raw_hour
    };

    Some((hour, minute))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{parse_clock_time, parse_date_arg};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_relative_and_iso_dates() {
        let today = day(2024, 6, 10); // a Monday
        assert_eq!(parse_date_arg("today", today).expect("today"), today);
        assert_eq!(
            parse_date_arg("tomorrow", today).expect("tomorrow"),
            day(2024, 6, 11)
        );
        assert_eq!(
            parse_date_arg("2024-07-01", today).expect("iso"),
            day(2024, 7, 1)
        );
    }

    #[test]
    fn weekday_name_resolves_to_next_occurrence() {
        let monday = day(2024, 6, 10);
        assert_eq!(
            parse_date_arg("friday", monday).expect("friday"),
            day(2024, 6, 14)
        );
        // Same weekday as today jumps a full week ahead.
        assert_eq!(
            parse_date_arg("monday", monday).expect("monday"),
            day(2024, 6, 17)
        );
    }

    #[test]
    fn rejects_garbage_dates() {
        let today = day(2024, 6, 10);
        assert!(parse_date_arg("someday", today).is_err());
        assert!(parse_date_arg("2024-13-40", today).is_err());
    }

    #[test]
    fn parses_clock_times() {
        assert_eq!(parse_clock_time("09:30"), Some((9, 30)));
        assert_eq!(parse_clock_time("3:23pm"), Some((15, 23)));
        assert_eq!(parse_clock_time("12:00am"), Some((0, 0)));
        assert_eq!(parse_clock_time("25:00"), None);
        assert_eq!(parse_clock_time("10:75"), None);
    }
}
