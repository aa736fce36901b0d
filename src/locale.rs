//! Localized weekday names used to label schedule entries.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;

/// Full weekday names indexed from Sunday.
const POLISH_DAY_NAMES: [&str; 7] = [
    "niedziela",
    "poniedziałek",
    "wtorek",
    "środa",
    "czwartek",
    "piątek",
    "sobota",
];
const ENGLISH_DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];
const GERMAN_DAY_NAMES: [&str; 7] = [
    "Sonntag",
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
];
const FRENCH_DAY_NAMES: [&str; 7] = [
    "dimanche", "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi",
];
const SPANISH_DAY_NAMES: [&str; 7] = [
    "domingo",
    "lunes",
    "martes",
    "miércoles",
    "jueves",
    "viernes",
    "sábado",
];

/// Language used for weekday labels. Polish unless configured otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeekdayLocale {
    #[default]
    Polish,
    English,
    German,
    French,
    Spanish,
}

impl WeekdayLocale {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Polish => "pl-PL",
            Self::English => "en-US",
            Self::German => "de-DE",
            Self::French => "fr-FR",
            Self::Spanish => "es-ES",
        }
    }

    fn names(self) -> &'static [&'static str; 7] {
        match self {
            Self::Polish => &POLISH_DAY_NAMES,
            Self::English => &ENGLISH_DAY_NAMES,
            Self::German => &GERMAN_DAY_NAMES,
            Self::French => &FRENCH_DAY_NAMES,
            Self::Spanish => &SPANISH_DAY_NAMES,
        }
    }

    /// Full weekday name with its first letter upper-cased, e.g. `Środa`.
    pub fn weekday_name(self, day: Weekday) -> String {
        capitalize_first(self.names()[day.num_days_from_sunday() as usize])
    }
}

impl fmt::Display for WeekdayLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for WeekdayLocale {
    type Err = String;

    /// Accepts BCP 47 style tags (`pl-PL`, `en_GB`, `de`); only the language
    /// subtag is significant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let language = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "pl" => Ok(Self::Polish),
            "en" => Ok(Self::English),
            "de" => Ok(Self::German),
            "fr" => Ok(Self::French),
            "es" => Ok(Self::Spanish),
            _ => Err(format!("Unsupported locale: {}", s)),
        }
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
