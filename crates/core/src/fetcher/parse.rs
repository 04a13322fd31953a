//! Locale-tolerant parsing of view counts and publication dates.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Reference time for converting publication dates into ages.
///
/// Captured once per run so every record's age is measured against the
/// same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    now: DateTime<Utc>,
}

impl RunClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn capture() -> Self {
        Self::at(Utc::now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Whole calendar days (UTC) from `date` to the reference time.
    ///
    /// Dates after the reference time count as age 0.
    pub fn age_of(&self, date: NaiveDate) -> u32 {
        let days = (self.now.date_naive() - date).num_days();
        days.clamp(0, u32::MAX as i64) as u32
    }
}

/// Replace non-breaking spaces, lowercase and trim.
fn normalize(text: &str) -> String {
    text.replace(['\u{a0}', '\u{202f}', '\u{2009}'], " ")
        .replace("\\u00a0", " ")
        .trim()
        .to_lowercase()
}

// =============================================================================
// View counts
// =============================================================================

/// Parse a view count as rendered on the page.
///
/// Handles plain and grouped digits (`"1,234,567 views"`, `"1 234 567"`)
/// and abbreviated forms (`"1.2M"`, `"12K"`, `"3,4 млн"`, `"12 тыс."`).
/// Abbreviated values round down.
pub fn parse_view_count(text: &str) -> Option<u64> {
    let text = normalize(text);
    if text.starts_with("no views") || text.starts_with("нет просмотров") {
        return Some(0);
    }

    let mut start = text.find(|c: char| c.is_ascii_digit())?;
    // A bare fraction such as ".5K" keeps its separator.
    if text[..start].ends_with(['.', ',']) {
        start -= 1;
    }
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ',' || c == ' '))
        .unwrap_or(rest.len());
    let number = rest[..end].trim_end_matches(['.', ',', ' ']);
    let suffix = rest[end..].trim_start();

    match suffix_multiplier(suffix) {
        None => digits_only(number).parse().ok(),
        Some(multiplier) => {
            let compact: String = number.chars().filter(|c| !c.is_whitespace()).collect();
            let (whole, fraction) = match compact.rfind(['.', ',']) {
                Some(i) => (&compact[..i], &compact[i + 1..]),
                None => (compact.as_str(), ""),
            };

            let whole: u64 = match digits_only(whole).as_str() {
                "" => 0,
                digits => digits.parse().ok()?,
            };
            let fraction = digits_only(fraction);
            let fraction = &fraction[..fraction.len().min(9)];

            let mut value = whole.checked_mul(multiplier)?;
            if !fraction.is_empty() {
                let numerator: u64 = fraction.parse().ok()?;
                let denominator = 10u64.pow(fraction.len() as u32);
                value = value.checked_add(numerator.checked_mul(multiplier)? / denominator)?;
            }
            Some(value)
        }
    }
}

fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

fn suffix_multiplier(suffix: &str) -> Option<u64> {
    const THOUSAND: u64 = 1_000;
    const MILLION: u64 = 1_000_000;
    const BILLION: u64 = 1_000_000_000;

    let table: &[(&str, u64)] = &[
        ("млрд", BILLION),
        ("млн", MILLION),
        ("тыс", THOUSAND),
        ("thousand", THOUSAND),
        ("k", THOUSAND),
        ("m", MILLION),
        ("b", BILLION),
    ];

    table
        .iter()
        .find(|(prefix, _)| suffix.starts_with(prefix))
        .map(|(_, multiplier)| *multiplier)
}

// =============================================================================
// Publication dates
// =============================================================================

const DATE_PREFIXES: &[&str] = &[
    "premiered on",
    "premiered",
    "streamed live on",
    "streamed live",
    "started streaming on",
    "started streaming",
    "published on",
    "uploaded on",
    "опубликовано:",
    "опубликовано",
    "премьера состоялась",
    "дата премьеры:",
    "трансляция закончилась",
    "трансляция началась",
];

static RELATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(\d+|an|a|one)\s+)?(second|minute|hour|day|week|month|year|секунд|минут|час|дн|день|недел|месяц|год|лет)",
    )
    .unwrap()
});
static ISO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap());
static DOTTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap());
static SLASHED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap());
static MONTH_FIRST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})").unwrap());
static DAY_FIRST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s+([a-zа-яё]+)\.?,?\s+(\d{4})").unwrap());

/// Parse a publication date (absolute or relative) into an age in days.
///
/// Relative forms count a month as 30 days and a year as 365; anything
/// under a day is age 0.
pub fn parse_publish_age(text: &str, clock: &RunClock) -> Option<u32> {
    let mut text = normalize(text);
    for prefix in DATE_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim().to_string();
            break;
        }
    }

    if text.contains("ago") || text.contains("назад") {
        if let Some(days) = parse_relative_days(&text) {
            return Some(days);
        }
    }

    parse_absolute_date(&text).map(|date| clock.age_of(date))
}

fn parse_relative_days(text: &str) -> Option<u32> {
    let caps = RELATIVE_RE.captures(text)?;
    let amount: u32 = match caps.get(1).map(|m| m.as_str()) {
        None | Some("a") | Some("an") | Some("one") => 1,
        Some(n) => n.parse().ok()?,
    };

    let unit = caps.get(2)?.as_str();
    let days_per_unit = match unit {
        "second" | "minute" | "hour" | "секунд" | "минут" | "час" => 0,
        "day" | "дн" | "день" => 1,
        "week" | "недел" => 7,
        "month" | "месяц" => 30,
        "year" | "год" | "лет" => 365,
        _ => return None,
    };

    amount.checked_mul(days_per_unit)
}

/// Parse an absolute date in any of the supported layouts.
pub fn parse_absolute_date(text: &str) -> Option<NaiveDate> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.with_timezone(&Utc).date_naive());
    }

    if let Some(caps) = ISO_RE.captures(text) {
        return ymd(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = DOTTED_RE.captures(text) {
        return ymd(&caps[3], &caps[2], &caps[1]);
    }

    if let Some(caps) = SLASHED_RE.captures(text) {
        // US order first, day-first when that is not a valid date.
        return ymd(&caps[3], &caps[1], &caps[2]).or_else(|| ymd(&caps[3], &caps[2], &caps[1]));
    }

    if let Some(caps) = MONTH_FIRST_RE.captures(text) {
        if let Some(month) = month_from_name(&caps[1]) {
            return ymd(&caps[3], &month.to_string(), &caps[2]);
        }
    }

    if let Some(caps) = DAY_FIRST_RE.captures(text) {
        if let Some(month) = month_from_name(&caps[2]) {
            return ymd(&caps[3], &month.to_string(), &caps[1]);
        }
    }

    None
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn month_from_name(name: &str) -> Option<u32> {
    let head: String = name.chars().take(3).collect();
    let month = match head.as_str() {
        "jan" | "янв" => 1,
        "feb" | "фев" => 2,
        "mar" | "мар" => 3,
        "apr" | "апр" => 4,
        "may" | "мая" | "май" => 5,
        "jun" | "июн" => 6,
        "jul" | "июл" => 7,
        "aug" | "авг" => 8,
        "sep" | "сен" => 9,
        "oct" | "окт" => 10,
        "nov" | "ноя" => 11,
        "dec" | "дек" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> RunClock {
        RunClock::at(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_view_count_plain() {
        assert_eq!(parse_view_count("1,234,567 views"), Some(1_234_567));
        assert_eq!(parse_view_count("1 234 567 просмотров"), Some(1_234_567));
        assert_eq!(parse_view_count("1\u{a0}234 просмотра"), Some(1_234));
        assert_eq!(parse_view_count("987"), Some(987));
        assert_eq!(parse_view_count("No views"), Some(0));
    }

    #[test]
    fn test_view_count_abbreviated() {
        assert_eq!(parse_view_count("1.2M views"), Some(1_200_000));
        assert_eq!(parse_view_count("1.25M"), Some(1_250_000));
        assert_eq!(parse_view_count("12K views"), Some(12_000));
        assert_eq!(parse_view_count("3.4B"), Some(3_400_000_000));
        assert_eq!(parse_view_count("1,2 млн просмотров"), Some(1_200_000));
        assert_eq!(parse_view_count("12 тыс. просмотров"), Some(12_000));
        assert_eq!(parse_view_count("2,5 млрд"), Some(2_500_000_000));
    }

    #[test]
    fn test_view_count_rounds_down() {
        assert_eq!(parse_view_count("1.2345K"), Some(1_234));
    }

    #[test]
    fn test_view_count_bare_fraction() {
        assert_eq!(parse_view_count(".5K views"), Some(500));
        assert_eq!(parse_view_count(",5 тыс. просмотров"), Some(500));
        assert_eq!(parse_view_count("views: .5M"), Some(500_000));
    }

    #[test]
    fn test_view_count_missing() {
        assert_eq!(parse_view_count("views"), None);
        assert_eq!(parse_view_count(""), None);
    }

    #[test]
    fn test_relative_ages() {
        let clock = clock();
        assert_eq!(parse_publish_age("3 days ago", &clock), Some(3));
        assert_eq!(parse_publish_age("1 day ago", &clock), Some(1));
        assert_eq!(parse_publish_age("an hour ago", &clock), Some(0));
        assert_eq!(parse_publish_age("2 weeks ago", &clock), Some(14));
        assert_eq!(parse_publish_age("a month ago", &clock), Some(30));
        assert_eq!(parse_publish_age("2 years ago", &clock), Some(730));
        assert_eq!(parse_publish_age("Streamed live 5 hours ago", &clock), Some(0));
        assert_eq!(parse_publish_age("Premiered 4 days ago", &clock), Some(4));
    }

    #[test]
    fn test_relative_ages_russian() {
        let clock = clock();
        assert_eq!(parse_publish_age("5 дней назад", &clock), Some(5));
        assert_eq!(parse_publish_age("2 недели назад", &clock), Some(14));
        assert_eq!(parse_publish_age("неделю назад", &clock), Some(7));
        assert_eq!(parse_publish_age("3 месяца назад", &clock), Some(90));
        assert_eq!(parse_publish_age("1 год назад", &clock), Some(365));
        assert_eq!(parse_publish_age("5 лет назад", &clock), Some(1825));
    }

    #[test]
    fn test_absolute_dates() {
        let clock = clock();
        assert_eq!(parse_publish_age("2024-03-10", &clock), Some(5));
        assert_eq!(parse_publish_age("2024-03-10T08:00:00-08:00", &clock), Some(5));
        assert_eq!(parse_publish_age("10.03.2024", &clock), Some(5));
        assert_eq!(parse_publish_age("03/10/2024", &clock), Some(5));
        assert_eq!(parse_publish_age("25/02/2024", &clock), Some(19));
        assert_eq!(parse_publish_age("Mar 10, 2024", &clock), Some(5));
        assert_eq!(parse_publish_age("Premiered on Mar 10, 2024", &clock), Some(5));
        assert_eq!(parse_publish_age("10 мар. 2024 г.", &clock), Some(5));
        assert_eq!(parse_publish_age("Опубликовано: 1 мая 2023 г.", &clock), Some(319));
    }

    #[test]
    fn test_future_dates_clamp_to_zero() {
        assert_eq!(parse_publish_age("2024-04-01", &clock()), Some(0));
    }

    #[test]
    fn test_unparseable_dates() {
        let clock = clock();
        assert_eq!(parse_publish_age("sometime", &clock), None);
        assert_eq!(parse_publish_age("2024-13-45", &clock), None);
    }
}
