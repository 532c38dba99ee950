//! Candidate validation against operator flags and known placeholders.
//!
//! The extraction prompt shows the model an example schema filled with
//! obviously fake values. Models sometimes echo those values back as if they
//! were real, so any field the operator confirmed must not be one of them.

use crate::types::{is_flagged, EventCandidate, EventField, EventValidation};

pub const FAKE_CITY: &str = "Nowhere City, NM 11111";
pub const FAKE_URL_1: &str = "http://example.com/event/12345";
pub const FAKE_URL_2: &str = "http://example.com/event/98765";
pub const FAKE_EVENT_TITLE_1: &str = "Fake Event Title 1";
pub const FAKE_EVENT_TITLE_2: &str = "Fake Event Title 2";
pub const FAKE_START_TIME_1: &str = "Sep 26, 26:30pm";
pub const FAKE_START_TIME_2: &str = "Oct 10, 25:00am";
pub const FAKE_END_TIME_1: &str = "Sep 26, 27:30pm";
pub const FAKE_END_TIME_2: &str = "Oct 10, 26:00am";

const SENTINELS: [&str; 9] = [
    FAKE_CITY,
    FAKE_URL_1,
    FAKE_URL_2,
    FAKE_EVENT_TITLE_1,
    FAKE_EVENT_TITLE_2,
    FAKE_START_TIME_1,
    FAKE_START_TIME_2,
    FAKE_END_TIME_1,
    FAKE_END_TIME_2,
];

/// Whether `value` is one of the placeholder literals.
pub fn is_sentinel(value: &str) -> bool {
    let value = value.trim();
    SENTINELS.contains(&value)
}

/// Keep the candidates whose every flagged field is real.
///
/// Unflagged fields are cleared in the output but never disqualify a
/// candidate. A candidate with no validation row is dropped. Input order is
/// preserved.
pub fn filter_validated(
    candidates: &[EventCandidate],
    validations: &[EventValidation],
) -> Vec<EventCandidate> {
    candidates
        .iter()
        .zip(validations.iter())
        .filter(|(candidate, row)| {
            EventField::ALL
                .iter()
                .filter(|field| is_flagged(row, **field))
                .all(|field| !is_sentinel(candidate.field(*field)))
        })
        .map(|(candidate, row)| {
            let mut kept = candidate.clone();
            for field in EventField::ALL {
                if !is_flagged(row, field) {
                    kept.clear_field(field);
                }
            }
            kept
        })
        .collect()
}
