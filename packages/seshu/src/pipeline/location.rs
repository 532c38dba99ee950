//! Best-effort location and timezone derivation from candidate strings.
//!
//! No geocoding happens here. The address is taken verbatim from the first
//! validated candidate that has one, and the timezone comes from text the
//! page already printed: an explicit zone, an IANA name, or a common
//! abbreviation next to a time.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::EventCandidate;

/// Abbreviation to IANA zone. Ambiguous abbreviations use their most common
/// reading (CST is US Central, IST is India).
const TIMEZONE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("EST", "America/New_York"),
    ("EDT", "America/New_York"),
    ("CST", "America/Chicago"),
    ("CDT", "America/Chicago"),
    ("MST", "America/Denver"),
    ("MDT", "America/Denver"),
    ("PST", "America/Los_Angeles"),
    ("PDT", "America/Los_Angeles"),
    ("AKST", "America/Anchorage"),
    ("AKDT", "America/Anchorage"),
    ("HST", "Pacific/Honolulu"),
    ("HDT", "America/Adak"),
    ("AST", "America/Halifax"),
    ("ADT", "America/Halifax"),
    ("NST", "America/St_Johns"),
    ("NDT", "America/St_Johns"),
    ("GMT", "Europe/London"),
    ("BST", "Europe/London"),
    ("WET", "Europe/Lisbon"),
    ("WEST", "Europe/Lisbon"),
    ("CET", "Europe/Paris"),
    ("CEST", "Europe/Paris"),
    ("EET", "Europe/Athens"),
    ("EEST", "Europe/Athens"),
    ("IST", "Asia/Kolkata"),
    ("JST", "Asia/Tokyo"),
    ("KST", "Asia/Seoul"),
];

/// Location context derived for a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedLocation {
    pub address: Option<String>,
    pub timezone: Option<String>,
}

fn abbreviation_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            let alternatives: Vec<&str> = TIMEZONE_ABBREVIATIONS.iter().map(|(a, _)| *a).collect();
            Regex::new(&format!(r"\b({})\b", alternatives.join("|"))).ok()
        })
        .as_ref()
}

fn iana_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"\b(?:America|Europe|Asia|Africa|Australia|Pacific|Atlantic|Indian)/[A-Za-z_]+(?:/[A-Za-z_]+)?\b",
            )
            .ok()
        })
        .as_ref()
}

/// Map a timezone abbreviation found in `text` to its IANA zone.
pub fn timezone_from_abbreviation(text: &str) -> Option<&'static str> {
    let found = abbreviation_pattern()?.find(text)?.as_str();
    TIMEZONE_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == found)
        .map(|(_, zone)| *zone)
}

/// Find an IANA zone name written out in `text`.
pub fn timezone_from_iana_name(text: &str) -> Option<String> {
    iana_pattern()?.find(text).map(|m| m.as_str().to_string())
}

fn timezone_for(candidate: &EventCandidate) -> Option<String> {
    if !candidate.timezone.trim().is_empty() {
        return Some(candidate.timezone.trim().to_string());
    }
    timezone_from_iana_name(&candidate.location)
        .or_else(|| {
            [&candidate.start_time, &candidate.end_time, &candidate.location]
                .into_iter()
                .find_map(|s| timezone_from_abbreviation(s))
                .map(str::to_string)
        })
}

/// Derive an address and timezone from validated candidates.
pub fn derive_location(candidates: &[EventCandidate]) -> DerivedLocation {
    let address = candidates
        .iter()
        .map(|c| c.location.trim())
        .find(|l| !l.is_empty())
        .map(str::to_string);

    let timezone = candidates.iter().find_map(timezone_for);

    DerivedLocation { address, timezone }
}
