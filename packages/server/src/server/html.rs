//! HTML fragments returned by the session routes.
//!
//! The operator UI swaps these straight into the page, so every value that
//! came from a scraped page or the model is escaped.

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

use seshu::{EventCandidate, SeshuError, SeshuJob, SeshuSession};

/// Candidates extracted from a submitted URL, one list item per event.
pub fn candidates_fragment(candidates: &[EventCandidate]) -> String {
    if candidates.is_empty() {
        return r#"<div class="seshu-empty">No events found at that URL.</div>"#.to_string();
    }

    let mut out = String::from(r#"<ul class="seshu-candidates">"#);
    for (index, candidate) in candidates.iter().enumerate() {
        let _ = write!(
            out,
            r#"<li class="seshu-candidate" data-index="{}"><strong class="event-title">{}</strong>"#,
            index,
            encode_text(&candidate.title)
        );
        push_field(&mut out, "event-location", &candidate.location);
        push_field(&mut out, "event-start", &candidate.start_time);
        push_field(&mut out, "event-end", &candidate.end_time);
        if !candidate.url.is_empty() {
            let _ = write!(
                out,
                r#"<a class="event-url" href="{}" rel="noopener noreferrer">{}</a>"#,
                encode_double_quoted_attribute(&candidate.url),
                encode_text(&candidate.url)
            );
        }
        push_field(&mut out, "event-description", &candidate.description);
        out.push_str("</li>");
    }
    out.push_str("</ul>");
    out
}

fn push_field(out: &mut String, class: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let _ = write!(out, r#"<span class="{}">{}</span>"#, class, encode_text(value));
}

/// Confirmation after an operator attached a location to a draft.
pub fn location_fragment(session: &SeshuSession) -> String {
    let mut parts = Vec::new();
    if let Some(address) = &session.location_address {
        parts.push(encode_text(address).into_owned());
    }
    if let (Some(lat), Some(lon)) = (session.location_latitude, session.location_longitude) {
        parts.push(format!("({:.5}, {:.5})", lat, lon));
    }
    let summary = if parts.is_empty() {
        "Location cleared.".to_string()
    } else {
        format!("Location saved: {}", parts.join(" "))
    };

    format!(
        r#"<div class="seshu-location" data-url="{}">{}</div>"#,
        encode_double_quoted_attribute(&session.url),
        summary
    )
}

/// Confirmation after a session became a recurring job.
pub fn submitted_fragment(job: &SeshuJob) -> String {
    format!(
        r#"<div class="seshu-submitted" data-key="{}">Event source saved. Scraping runs daily at {:02}:00 UTC.</div>"#,
        encode_double_quoted_attribute(&job.normalized_url_key),
        job.scheduled_hour
    )
}

/// Inline error shown in place of the expected fragment.
pub fn error_fragment(err: &SeshuError) -> String {
    format!(
        r#"<div class="seshu-error" role="alert">{}</div>"#,
        encode_text(&err.user_message())
    )
}
