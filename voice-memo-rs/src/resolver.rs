//! Free-text time resolution.
//!
//! Two tiers, tried in order:
//! 1. A small natural-language grammar ("5pm friday", "tomorrow at 9",
//!    "in 10 minutes", "3 hours ago") with a prefer-future bias.
//! 2. A numeric-unit fallback for noisy relative phrases ("10 minutes or so"):
//!    exactly one of second/minute/hour somewhere in the text, and an integer
//!    as the first word.
//!
//! Compound durations ("1 hour 30 minutes") match neither tier.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};

use crate::error::ResolutionError;

/// Words that carry no meaning between day and clock parts.
const FILLER: [&str; 5] = ["at", "on", "this", "the", "of"];

/// Resolve `text` to an absolute timestamp relative to `now`.
///
/// A leading "in " is ignored. The result has whole-second precision.
pub fn resolve(text: &str, now: NaiveDateTime) -> Result<NaiveDateTime, ResolutionError> {
    let normalized = normalize(text);
    let now = now.with_nanosecond(0).unwrap_or(now);

    parse_natural(&normalized, now)
        .or_else(|| parse_unit_fallback(&normalized, now))
        .ok_or_else(|| ResolutionError::Unparseable(text.trim().to_string()))
}

/// Resolve `text` to a calendar day for lookups.
///
/// Day words pick the nearest matching date on or after today, so "friday"
/// on a Friday means today. Anything else goes through [`resolve`].
pub fn resolve_date(text: &str, now: NaiveDateTime) -> Result<NaiveDate, ResolutionError> {
    let tokens = tokenize(&normalize(text));
    let day = Phrase::parse(&tokens)
        .and_then(|phrase| phrase.day)
        .and_then(|day| day.on_or_after(now.date()));

    match day {
        Some(date) => Ok(date),
        None => resolve(text, now).map(|dt| dt.date()),
    }
}

fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped = lowered.strip_prefix("in ").unwrap_or(&lowered);
    stripped
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .trim_end()
        .to_string()
}

fn tokenize(text: &str) -> Vec<String> {
    text.replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

// --- Tier 1: natural language ---

fn parse_natural(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return None;
    }

    parse_relative(&tokens, now).or_else(|| Phrase::parse(&tokens)?.resolve(now))
}

fn parse_relative(tokens: &[String], now: NaiveDateTime) -> Option<NaiveDateTime> {
    let words: Vec<&str> = tokens.iter().map(String::as_str).collect();

    match words.as_slice() {
        ["now"] | ["right", "now"] => Some(now),
        [count, unit, rest @ ..] => {
            let delta = Unit::parse(unit)?.times(parse_count(count)?)?;
            match rest {
                [] | ["from", "now"] | ["later"] => now.checked_add_signed(delta),
                ["ago"] => now.checked_sub_signed(delta),
                _ => None,
            }
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl Unit {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "second" | "seconds" | "sec" | "secs" => Some(Self::Second),
            "minute" | "minutes" | "min" | "mins" => Some(Self::Minute),
            "hour" | "hours" | "hr" | "hrs" => Some(Self::Hour),
            "day" | "days" => Some(Self::Day),
            "week" | "weeks" => Some(Self::Week),
            _ => None,
        }
    }

    fn seconds(self) -> i64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
            Self::Week => 604_800,
        }
    }

    fn times(self, count: i64) -> Option<TimeDelta> {
        TimeDelta::try_seconds(count.checked_mul(self.seconds())?)
    }
}

fn parse_count(word: &str) -> Option<i64> {
    if word.bytes().all(|b| b.is_ascii_digit()) {
        return word.parse().ok();
    }
    let n = match word {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "fifteen" => 15,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "forty-five" => 45,
        "fifty" => 50,
        "sixty" => 60,
        _ => return None,
    };
    Some(n)
}

/// Which day an absolute phrase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaySpec {
    Today,
    Tomorrow,
    Yesterday,
    Weekday { weekday: Weekday, next: bool },
    Date(NaiveDate),
    MonthDay { month: u32, day: u32, year: Option<i32> },
}

impl DaySpec {
    fn on_or_after(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Today => Some(today),
            Self::Tomorrow => today.succ_opt(),
            Self::Yesterday => today.pred_opt(),
            Self::Weekday { weekday, next } => {
                today.checked_add_days(Days::new(days_ahead(today.weekday(), weekday, next)))
            }
            Self::Date(date) => Some(date),
            Self::MonthDay { month, day, year } => {
                NaiveDate::from_ymd_opt(year.unwrap_or(today.year()), month, day)
            }
        }
    }
}

fn days_ahead(from: Weekday, to: Weekday, next: bool) -> u64 {
    let ahead = (7 + to.num_days_from_monday() - from.num_days_from_monday()) % 7;
    if next && ahead == 0 {
        7
    } else {
        u64::from(ahead)
    }
}

/// An absolute phrase: at most one day part and at most one clock part.
#[derive(Debug, Default)]
struct Phrase {
    day: Option<DaySpec>,
    clock: Option<NaiveTime>,
}

impl Phrase {
    fn parse(tokens: &[String]) -> Option<Self> {
        let mut phrase = Self::default();
        let mut i = 0;

        while i < tokens.len() {
            let word = tokens[i].as_str();
            if FILLER.contains(&word) {
                i += 1;
                continue;
            }

            if let Some((day, used)) = parse_day(&tokens[i..]) {
                if phrase.day.replace(day).is_some() {
                    return None;
                }
                i += used;
                continue;
            }

            let after_at = i > 0 && tokens[i - 1] == "at";
            if let Some((time, used)) = parse_clock(&tokens[i..], after_at) {
                if phrase.clock.replace(time).is_some() {
                    return None;
                }
                i += used;
                continue;
            }

            return None;
        }

        (phrase.day.is_some() || phrase.clock.is_some()).then_some(phrase)
    }

    fn resolve(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today = now.date();
        let keep_time = self.clock.unwrap_or(now.time());
        let midnight_or_clock = self.clock.unwrap_or(NaiveTime::MIN);

        match self.day {
            None => {
                let time = self.clock?;
                let candidate = today.and_time(time);
                if candidate > now {
                    Some(candidate)
                } else {
                    today.succ_opt().map(|d| d.and_time(time))
                }
            }
            Some(DaySpec::Today) => Some(today.and_time(keep_time)),
            Some(DaySpec::Tomorrow) => today.succ_opt().map(|d| d.and_time(keep_time)),
            Some(DaySpec::Yesterday) => today.pred_opt().map(|d| d.and_time(keep_time)),
            Some(DaySpec::Weekday { weekday, next }) => {
                let ahead = days_ahead(today.weekday(), weekday, next);
                let candidate = today.checked_add_days(Days::new(ahead))?.and_time(keep_time);
                if candidate > now {
                    Some(candidate)
                } else {
                    candidate.checked_add_days(Days::new(7))
                }
            }
            Some(DaySpec::Date(date)) => Some(date.and_time(midnight_or_clock)),
            Some(DaySpec::MonthDay {
                month,
                day,
                year: Some(year),
            }) => NaiveDate::from_ymd_opt(year, month, day).map(|d| d.and_time(midnight_or_clock)),
            Some(DaySpec::MonthDay {
                month,
                day,
                year: None,
            }) => {
                let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)
                    .map(|d| d.and_time(midnight_or_clock));
                match this_year {
                    Some(candidate) if candidate > now => Some(candidate),
                    _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day)
                        .map(|d| d.and_time(midnight_or_clock)),
                }
            }
        }
    }
}

fn parse_day(tokens: &[String]) -> Option<(DaySpec, usize)> {
    let first = tokens.first()?.as_str();

    match first {
        "today" => return Some((DaySpec::Today, 1)),
        "tomorrow" => return Some((DaySpec::Tomorrow, 1)),
        "yesterday" => return Some((DaySpec::Yesterday, 1)),
        "next" => {
            let weekday = parse_weekday(tokens.get(1)?)?;
            return Some((DaySpec::Weekday { weekday, next: true }, 2));
        }
        _ => {}
    }

    if let Some(weekday) = parse_weekday(first) {
        return Some((DaySpec::Weekday { weekday, next: false }, 1));
    }

    if let Ok(date) = NaiveDate::parse_from_str(first, "%Y-%m-%d") {
        return Some((DaySpec::Date(date), 1));
    }

    // "january 5th [2025]"
    if let Some(month) = parse_month(first) {
        let day = parse_day_of_month(tokens.get(1)?)?;
        let year = tokens.get(2).and_then(|t| parse_year(t));
        let used = if year.is_some() { 3 } else { 2 };
        return Some((DaySpec::MonthDay { month, day, year }, used));
    }

    // "5th [of] january [2025]"
    let day = parse_day_of_month(first)?;
    let mut used = 1;
    if tokens.get(used).map(String::as_str) == Some("of") {
        used += 1;
    }
    let month = parse_month(tokens.get(used)?)?;
    used += 1;
    let year = tokens.get(used).and_then(|t| parse_year(t));
    if year.is_some() {
        used += 1;
    }
    Some((DaySpec::MonthDay { month, day, year }, used))
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    let weekday = match word {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

fn parse_month(word: &str) -> Option<u32> {
    let month = match word {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_day_of_month(word: &str) -> Option<u32> {
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix))
        .unwrap_or(word);
    let day = parse_digits(digits)?;
    (1..=31).contains(&day).then_some(day)
}

fn parse_year(word: &str) -> Option<i32> {
    if word.len() == 4 && word.bytes().all(|b| b.is_ascii_digit()) {
        word.parse().ok()
    } else {
        None
    }
}

/// One or two ASCII digits.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

fn parse_meridiem(word: &str) -> Option<Meridiem> {
    match word.replace('.', "").as_str() {
        "am" => Some(Meridiem::Am),
        "pm" => Some(Meridiem::Pm),
        _ => None,
    }
}

fn split_meridiem(word: &str) -> (&str, Option<Meridiem>) {
    for (suffix, meridiem) in [
        ("a.m.", Meridiem::Am),
        ("p.m.", Meridiem::Pm),
        ("a.m", Meridiem::Am),
        ("p.m", Meridiem::Pm),
        ("am", Meridiem::Am),
        ("pm", Meridiem::Pm),
    ] {
        if let Some(body) = word.strip_suffix(suffix) {
            return (body, Some(meridiem));
        }
    }
    (word, None)
}

/// Parse a clock time at the head of `tokens`.
///
/// A bare number only counts as a clock after "at" or before "o'clock";
/// otherwise it needs a colon or am/pm.
fn parse_clock(tokens: &[String], after_at: bool) -> Option<(NaiveTime, usize)> {
    let first = tokens.first()?.as_str();
    match first {
        "noon" | "midday" => return Some((NaiveTime::from_hms_opt(12, 0, 0)?, 1)),
        "midnight" => return Some((NaiveTime::MIN, 1)),
        _ => {}
    }

    let (body, attached) = split_meridiem(first);
    let mut used = 1;
    let meridiem = match attached {
        Some(m) => Some(m),
        None => {
            let separate = tokens.get(1).and_then(|t| parse_meridiem(t));
            if separate.is_some() {
                used += 1;
            }
            separate
        }
    };

    let oclock = meridiem.is_none() && tokens.get(used).map(String::as_str) == Some("o'clock");
    if oclock {
        used += 1;
    }

    let mut fields = body.split(':');
    let hour = parse_digits(fields.next()?)?;
    let minute = fields.next().map_or(Some(0), parse_digits)?;
    let second = fields.next().map_or(Some(0), parse_digits)?;
    if fields.next().is_some() {
        return None;
    }

    let has_colon = body.contains(':');
    if meridiem.is_none() && !has_colon && !oclock && !after_at {
        return None;
    }

    let hour = match meridiem {
        Some(_) if !(1..=12).contains(&hour) => return None,
        Some(Meridiem::Am) => hour % 12,
        Some(Meridiem::Pm) => hour % 12 + 12,
        None => hour,
    };

    Some((NaiveTime::from_hms_opt(hour, minute, second)?, used))
}

// --- Tier 2: numeric-unit fallback ---

fn parse_unit_fallback(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let mut units = [
        ("second", Unit::Second),
        ("minute", Unit::Minute),
        ("hour", Unit::Hour),
    ]
    .into_iter()
    .filter(|(word, _)| text.contains(word))
    .map(|(_, unit)| unit);

    let unit = units.next()?;
    if units.next().is_some() {
        return None;
    }

    let count: i64 = text.split_whitespace().next()?.parse().ok()?;
    now.checked_add_signed(unit.times(count)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Monday, 2024-01-01 10:00:00.
    fn now() -> NaiveDateTime {
        at("2024-01-01 10:00:00")
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn relative_durations() {
        assert_eq!(resolve("in 5 minutes", now()).unwrap(), at("2024-01-01 10:05:00"));
        assert_eq!(resolve("In 10 Seconds", now()).unwrap(), at("2024-01-01 10:00:10"));
        assert_eq!(resolve("an hour", now()).unwrap(), at("2024-01-01 11:00:00"));
        assert_eq!(resolve("five minutes later", now()).unwrap(), at("2024-01-01 10:05:00"));
        assert_eq!(resolve("2 days from now", now()).unwrap(), at("2024-01-03 10:00:00"));
        assert_eq!(resolve("3 hours ago", now()).unwrap(), at("2024-01-01 07:00:00"));
    }

    #[test]
    fn clock_times_prefer_the_future() {
        assert_eq!(resolve("5pm", now()).unwrap(), at("2024-01-01 17:00:00"));
        assert_eq!(resolve("9 a.m.", now()).unwrap(), at("2024-01-02 09:00:00"));
        assert_eq!(resolve("14:30", now()).unwrap(), at("2024-01-01 14:30:00"));
        assert_eq!(resolve("noon", now()).unwrap(), at("2024-01-01 12:00:00"));
        assert_eq!(resolve("midnight", now()).unwrap(), at("2024-01-02 00:00:00"));
        assert_eq!(resolve("at 5", now()).unwrap(), at("2024-01-02 05:00:00"));
        assert_eq!(resolve("12am", now()).unwrap(), at("2024-01-02 00:00:00"));
    }

    #[test]
    fn weekdays_prefer_the_future() {
        assert_eq!(resolve("5:30 pm friday", now()).unwrap(), at("2024-01-05 17:30:00"));
        assert_eq!(resolve("friday at 5pm", now()).unwrap(), at("2024-01-05 17:00:00"));
        // Today is Monday: a bare "monday" is a week out, a later clock time is today.
        assert_eq!(resolve("monday", now()).unwrap(), at("2024-01-08 10:00:00"));
        assert_eq!(resolve("monday at 11am", now()).unwrap(), at("2024-01-01 11:00:00"));
        assert_eq!(resolve("next monday at 11am", now()).unwrap(), at("2024-01-08 11:00:00"));
    }

    #[test]
    fn day_words_are_explicit() {
        assert_eq!(resolve("tomorrow at 9", now()).unwrap(), at("2024-01-02 09:00:00"));
        assert_eq!(resolve("tomorrow", now()).unwrap(), at("2024-01-02 10:00:00"));
        assert_eq!(resolve("yesterday", now()).unwrap(), at("2023-12-31 10:00:00"));
        assert_eq!(resolve("today at 8am", now()).unwrap(), at("2024-01-01 08:00:00"));
    }

    #[test]
    fn calendar_dates() {
        assert_eq!(resolve("january 5", now()).unwrap(), at("2024-01-05 00:00:00"));
        assert_eq!(resolve("december 25th at 7pm", now()).unwrap(), at("2024-12-25 19:00:00"));
        assert_eq!(resolve("1st of january", now()).unwrap(), at("2025-01-01 00:00:00"));
        assert_eq!(resolve("2024-03-10 14:00", now()).unwrap(), at("2024-03-10 14:00:00"));
    }

    #[test]
    fn fallback_reads_leading_integer() {
        assert_eq!(resolve("10 minutes or so", now()).unwrap(), at("2024-01-01 10:10:00"));
        assert_eq!(resolve("in 2 hours-ish", now()).unwrap(), at("2024-01-01 12:00:00"));
        // Negative counts pass through; callers reject the past.
        assert_eq!(resolve("-5 minutes please", now()).unwrap(), at("2024-01-01 09:55:00"));
    }

    #[test]
    fn compound_and_garbage_are_unparseable() {
        for text in ["1 hour 30 minutes", "whenever", "", "soon minutes", "13pm"] {
            assert_eq!(
                resolve(text, now()),
                Err(ResolutionError::Unparseable(text.to_string())),
                "{text:?}"
            );
        }
    }

    #[test]
    fn future_phrases_land_after_now() {
        let now = at("2024-01-05 23:59:30");
        for text in [
            "in 1 second",
            "in 45 minutes",
            "3 hours",
            "5pm",
            "9am",
            "friday",
            "friday at 11pm",
            "next friday",
            "tomorrow",
            "midnight",
            "january 5",
            "sunday at noon",
        ] {
            let resolved = resolve(text, now).unwrap();
            assert!(resolved > now, "{text:?} resolved to {resolved}");
        }
    }

    #[test]
    fn sub_second_precision_is_dropped() {
        let now = now().with_nanosecond(500_000_000).unwrap();
        assert_eq!(resolve("in 1 second", now).unwrap(), at("2024-01-01 10:00:01"));
    }

    #[test]
    fn dates_for_calendar_lookup() {
        assert_eq!(resolve_date("today", now()).unwrap(), date("2024-01-01"));
        assert_eq!(resolve_date("monday", now()).unwrap(), date("2024-01-01"));
        assert_eq!(resolve_date("next monday", now()).unwrap(), date("2024-01-08"));
        assert_eq!(resolve_date("friday", now()).unwrap(), date("2024-01-05"));
        assert_eq!(resolve_date("january 5th", now()).unwrap(), date("2024-01-05"));
        assert_eq!(resolve_date("in 3 days", now()).unwrap(), date("2024-01-04"));
        assert!(resolve_date("someday", now()).is_err());
    }
}
