//! Deadline expression resolution.
//!
//! A group's deadline is free text in the group's language ("10am",
//! "в 10:30"). [`DeadlineEvaluator`] turns it into a time of day for the
//! current tick. The built-in [`LocaleDeadlineParser`] understands a small
//! English and Russian grammar; other grammars can be plugged in behind the
//! same trait.

use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use std::fmt;

/// A resolved deadline time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeadlineTime {
    hour: u32,
    minute: u32,
}

impl DeadlineTime {
    /// Returns `None` for out-of-range values.
    #[must_use]
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(self) -> u32 {
        self.hour
    }

    pub fn minute(self) -> u32 {
        self.minute
    }

    /// True when `time` falls within this hour and minute.
    pub fn matches<T: Timelike>(self, time: &T) -> bool {
        time.hour() == self.hour && time.minute() == self.minute
    }
}

impl fmt::Display for DeadlineTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Resolves a deadline expression into a time of day.
pub trait DeadlineEvaluator: Send + Sync {
    /// Resolve `expression` written in `language` relative to `reference`.
    ///
    /// Returns `None` when no grammar matches. Callers never pass an empty
    /// expression.
    fn resolve(
        &self,
        expression: &str,
        language: &str,
        reference: &DateTime<Tz>,
    ) -> Option<DeadlineTime>;
}

/// Grammars known to the built-in parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    Ru,
}

impl Locale {
    /// Map a language code (`en`, `en-GB`, `ru_RU`) to a locale.
    pub fn from_language(language: &str) -> Option<Self> {
        let primary = language
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Self::En),
            "ru" => Some(Self::Ru),
            _ => None,
        }
    }

    fn parse(self, input: &str) -> Option<DeadlineTime> {
        match self {
            Self::En => parse_en(input),
            Self::Ru => parse_ru(input),
        }
    }
}

/// Built-in deadline grammar.
///
/// Tries the group's language first, then each fallback locale in order.
#[derive(Debug, Clone)]
pub struct LocaleDeadlineParser {
    fallback: Vec<Locale>,
}

impl Default for LocaleDeadlineParser {
    fn default() -> Self {
        Self {
            fallback: vec![Locale::En, Locale::Ru],
        }
    }
}

impl LocaleDeadlineParser {
    pub fn with_fallback(fallback: Vec<Locale>) -> Self {
        Self { fallback }
    }

    /// Locales in the order they are tried for `language`.
    pub fn locale_order(&self, language: &str) -> Vec<Locale> {
        let mut order = Vec::with_capacity(self.fallback.len() + 1);
        if let Some(preferred) = Locale::from_language(language) {
            order.push(preferred);
        }
        for locale in &self.fallback {
            if !order.contains(locale) {
                order.push(*locale);
            }
        }
        order
    }
}

impl DeadlineEvaluator for LocaleDeadlineParser {
    fn resolve(
        &self,
        expression: &str,
        language: &str,
        _reference: &DateTime<Tz>,
    ) -> Option<DeadlineTime> {
        let input = expression.trim().trim_end_matches(['.', '!']).to_lowercase();
        if input.is_empty() {
            return None;
        }
        self.locale_order(language)
            .into_iter()
            .find_map(|locale| locale.parse(&input))
    }
}

fn parse_en(input: &str) -> Option<DeadlineTime> {
    let rest = strip_prefixes(input, &["at ", "by ", "before ", "until ", "till "]);
    match rest {
        "noon" | "midday" => return DeadlineTime::new(12, 0),
        "midnight" => return DeadlineTime::new(0, 0),
        _ => {}
    }

    for (suffix, pm) in [
        ("a.m", false),
        ("p.m", true),
        ("am", false),
        ("pm", true),
    ] {
        if let Some(clock) = rest.strip_suffix(suffix) {
            let (hour, minute) = parse_clock(clock.trim_end(), true)?;
            if !(1..=12).contains(&hour) {
                return None;
            }
            let hour = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            return DeadlineTime::new(hour, minute);
        }
    }

    let (hour, minute) = parse_clock(rest, false)?;
    DeadlineTime::new(hour, minute)
}

fn parse_ru(input: &str) -> Option<DeadlineTime> {
    let rest = strip_prefixes(input, &["в ", "до ", "к ", "не позднее "]);
    match rest {
        "полдень" => return DeadlineTime::new(12, 0),
        "полночь" => return DeadlineTime::new(0, 0),
        _ => {}
    }

    let mut words: Vec<&str> = rest.split_whitespace().collect();
    let period = match words.last() {
        Some(&"утра") => Some(RuPeriod::Morning),
        Some(&"дня") => Some(RuPeriod::Afternoon),
        Some(&"вечера") => Some(RuPeriod::Evening),
        Some(&"ночи") => Some(RuPeriod::Night),
        _ => None,
    };
    if period.is_some() {
        words.pop();
    }
    if matches!(words.last(), Some(&("час" | "часа" | "часов"))) {
        words.pop();
    }
    let [clock] = words.as_slice() else {
        return None;
    };

    let Some(period) = period else {
        let (hour, minute) = parse_clock(clock, false)?;
        return DeadlineTime::new(hour, minute);
    };

    let (hour, minute) = parse_clock(clock, true)?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match period {
        RuPeriod::Morning => hour % 12,
        RuPeriod::Afternoon if hour == 12 => 12,
        RuPeriod::Afternoon | RuPeriod::Evening => (hour % 12) + 12,
        RuPeriod::Night if hour == 12 => 0,
        RuPeriod::Night => hour,
    };
    DeadlineTime::new(hour, minute)
}

#[derive(Debug, Clone, Copy)]
enum RuPeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

fn strip_prefixes<'a>(input: &'a str, prefixes: &[&str]) -> &'a str {
    let input = input.trim();
    prefixes
        .iter()
        .find_map(|prefix| input.strip_prefix(*prefix))
        .map_or(input, str::trim)
}

/// Parse `H:MM`, `H.MM`, or (when `bare_hour` is set) a bare `H`.
fn parse_clock(input: &str, bare_hour: bool) -> Option<(u32, u32)> {
    let input = input.trim();
    let (hour, minute) = match input.split_once([':', '.']) {
        Some((h, m)) => {
            if m.len() != 2 {
                return None;
            }
            (h, Some(m))
        }
        None if bare_hour => (input, None),
        None => return None,
    };
    if hour.is_empty() || hour.len() > 2 || !hour.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hour.parse().ok()?;
    let minute = match minute {
        Some(m) if m.bytes().all(|b| b.is_ascii_digit()) => m.parse().ok()?,
        Some(_) => return None,
        None => 0,
    };
    Some((hour, minute))
}
