//! Facebook event pages.
//!
//! Facebook event lists and event pages carry their data as JSON inside
//! `<script data-sjs>` payloads. Objects tagged `"__typename":"Event"` are read
//! directly, so these pages never go through the model.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SeshuError};
use crate::pipeline::location::timezone_from_abbreviation;
use crate::traits::extractor::Extractor;
use crate::types::{EventCandidate, ScrapeMode};

const SERVICE: &str = "facebook";
const EVENT_MARKER: &str = r#""__typename":"Event""#;

/// First script payload on the page that carries event objects.
fn event_payload(document: &Html) -> Option<String> {
    let scripts = Selector::parse("script").ok()?;
    document
        .select(&scripts)
        .map(|el| el.text().collect::<String>())
        .find(|text| text.contains(EVENT_MARKER))
        .map(|text| text.trim().to_string())
}

fn og_title(document: &Html) -> Option<String> {
    let meta = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
    document
        .select(&meta)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .find(|t| !t.is_empty())
}

fn text_words(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || c == '\u{202f}' || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect()
}

/// Collapse whitespace, including the narrow and non-breaking spaces
/// Facebook puts in its date sentences.
fn clean_text(text: &str) -> String {
    text_words(text).join(" ")
}

/// Drop anything after the timezone abbreviation, such as "and 20 more".
fn clean_date(text: &str) -> String {
    let words = text_words(text);
    match words.iter().position(|w| timezone_from_abbreviation(w).is_some()) {
        Some(index) => words[..=index].join(" "),
        None => words.join(" "),
    }
}

fn str_at<'a>(object: &'a Map<String, Value>, path: &[&str]) -> Option<&'a str> {
    let (last, parents) = path.split_last()?;
    let mut current = object;
    for key in parents {
        current = current.get(*key)?.as_object()?;
    }
    current.get(*last)?.as_str()
}

fn first_non_empty(object: &Map<String, Value>, paths: &[&[&str]]) -> String {
    paths
        .iter()
        .filter_map(|path| str_at(object, path))
        .map(clean_text)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn is_event(value: &Value) -> bool {
    value.get("__typename").and_then(Value::as_str) == Some("Event")
}

/// Every event object in `value`, depth first in document order.
fn collect_events<'a>(value: &'a Value, found: &mut Vec<&'a Map<String, Value>>) {
    match value {
        Value::Object(object) => {
            if is_event(value) {
                found.push(object);
            }
            for child in object.values() {
                collect_events(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_events(item, found);
            }
        }
        _ => {}
    }
}

/// Candidate fields from one event object.
fn candidate_from(event: &Map<String, Value>) -> EventCandidate {
    let start_time = str_at(event, &["day_time_sentence"]).map(clean_date).unwrap_or_default();
    let mut candidate = EventCandidate::new(first_non_empty(event, &[&["name"]]))
        .with_url(first_non_empty(event, &[&["url"]]))
        .with_location(first_non_empty(
            event,
            &[
                &["contextual_name"],
                &["one_line_address"],
                &["location"],
                &["place", "name"],
                &["venue", "name"],
                &["event_place", "contextual_name"],
            ],
        ))
        .with_description(first_non_empty(
            event,
            &[&["description"], &["event_description", "text"]],
        ))
        .with_start_time(start_time.clone());
    if let Some(zone) = timezone_from_abbreviation(&start_time) {
        candidate.timezone = zone.to_string();
    }
    candidate.host_name = first_non_empty(event, &[&["event_creator", "name"]]);
    candidate
}

/// Events from a listing page. Each needs a title, a URL and a date;
/// repeats of the same URL are dropped.
fn list_events(payload: &Value) -> Vec<EventCandidate> {
    let mut objects = Vec::new();
    collect_events(payload, &mut objects);

    let mut candidates: Vec<EventCandidate> = Vec::new();
    for candidate in objects.into_iter().map(candidate_from) {
        if candidate.title.is_empty() || candidate.url.is_empty() || candidate.start_time.is_empty() {
            continue;
        }
        if candidates.iter().any(|c| c.url == candidate.url) {
            continue;
        }
        candidates.push(candidate);
    }
    candidates
}

/// The one event of an event page, preferring the `result.data.event` node.
fn single_event(payload: &Value, fallback_title: Option<String>) -> Option<EventCandidate> {
    let preferred = ["/result/data/event", "/__bbox/result/data/event"]
        .iter()
        .filter_map(|pointer| payload.pointer(pointer))
        .find(|value| is_event(value))
        .and_then(Value::as_object);

    let event = match preferred {
        Some(event) => event,
        None => {
            let mut objects = Vec::new();
            collect_events(payload, &mut objects);
            *objects.first()?
        }
    };

    let mut candidate = candidate_from(event);
    if candidate.title.is_empty() {
        candidate.title = fallback_title.unwrap_or_default();
    }
    (!candidate.title.is_empty()).then_some(candidate)
}

/// Read event candidates from a Facebook page.
///
/// `Init` reads every event on a listing page, `Rs` the single event of an
/// event page.
pub fn parse_facebook_events(html: &str, mode: ScrapeMode) -> Result<Vec<EventCandidate>> {
    if !html.contains(EVENT_MARKER) {
        return Err(SeshuError::upstream(SERVICE, "no event data on page"));
    }
    let document = Html::parse_document(html);
    let payload = event_payload(&document)
        .ok_or_else(|| SeshuError::upstream(SERVICE, "no script payload with event data"))?;
    let payload: Value = serde_json::from_str(&payload)
        .map_err(|e| SeshuError::upstream(SERVICE, format!("malformed event data: {}", e)))?;

    let candidates = match mode {
        ScrapeMode::Init => list_events(&payload),
        ScrapeMode::Rs => single_event(&payload, og_title(&document)).into_iter().collect(),
    };
    if candidates.is_empty() {
        return Err(SeshuError::upstream(SERVICE, "no valid events in event data"));
    }
    debug!(count = candidates.len(), mode = %mode, "facebook events parsed");
    Ok(candidates)
}

/// Extractor for Facebook pages. No network calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacebookExtractor;

impl FacebookExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for FacebookExtractor {
    async fn extract(&self, html: &str, mode: ScrapeMode) -> Result<Vec<EventCandidate>> {
        parse_facebook_events(html, mode)
    }
}
