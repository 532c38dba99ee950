//! CSS-path discovery for recurring scrapes.
//!
//! Given the stored page HTML and a validated candidate, find the element
//! holding each field's text and describe it as a CSS path. Scrape workers
//! replay these paths instead of calling the model again.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::types::{EventCandidate, TargetSelectors};

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: &ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<String>())
}

fn depth(el: &ElementRef<'_>) -> usize {
    el.ancestors().count()
}

/// CSS path from `<html>` down to `el`, with `:nth-of-type` where a tag
/// repeats among its siblings.
pub fn css_path(el: ElementRef<'_>) -> String {
    let mut chain: Vec<ElementRef<'_>> = el.ancestors().filter_map(ElementRef::wrap).collect();
    chain.reverse();
    chain.push(el);

    chain
        .iter()
        .map(|node| {
            let name = node.value().name();
            let earlier = node
                .prev_siblings()
                .filter_map(ElementRef::wrap)
                .filter(|s| s.value().name() == name)
                .count();
            let later = node
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .any(|s| s.value().name() == name);
            if earlier > 0 || later {
                format!("{}:nth-of-type({})", name, earlier + 1)
            } else {
                name.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Path to the deepest element whose text equals `text`, falling back to the
/// deepest element that contains it.
pub fn find_text_path(document: &Html, text: &str) -> Option<String> {
    let target = normalize_text(text);
    if target.is_empty() {
        return None;
    }
    let all = Selector::parse("body *").ok()?;

    let exact = document
        .select(&all)
        .filter(|el| element_text(el) == target)
        .max_by_key(depth);

    let found = exact.or_else(|| {
        document
            .select(&all)
            .filter(|el| element_text(el).contains(&target))
            .max_by_key(depth)
    })?;

    Some(css_path(found))
}

/// Resolve `href` against the page, without its fragment.
///
/// Empty, fragment-only and bare root links never identify an event.
fn resolve_href(base: Option<&Url>, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href == "/" {
        return None;
    }
    let mut resolved = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    resolved.set_fragment(None);
    Some(resolved)
}

/// Path to the first anchor that links to the same address as `href`.
///
/// Relative links are resolved against `page_url` before comparing.
pub fn find_href_path(document: &Html, page_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(page_url.trim()).ok();
    let target = resolve_href(base.as_ref(), href)?;
    let anchors = Selector::parse("a[href]").ok()?;
    document
        .select(&anchors)
        .find(|el| {
            el.value()
                .attr("href")
                .and_then(|h| resolve_href(base.as_ref(), h))
                .is_some_and(|resolved| resolved == target)
        })
        .map(css_path)
}

/// Selectors for every field of `candidate` found in `html`, the page
/// fetched from `page_url`. Fields that can't be located are left empty.
pub fn find_targets(html: &str, page_url: &str, candidate: &EventCandidate) -> TargetSelectors {
    let document = Html::parse_document(html);
    let path = |text: &str| find_text_path(&document, text).unwrap_or_default();

    TargetSelectors {
        name: path(&candidate.title),
        location: path(&candidate.location),
        start_time: path(&candidate.start_time),
        end_time: path(&candidate.end_time),
        description: path(&candidate.description),
        href: find_href_path(&document, page_url, &candidate.url).unwrap_or_default(),
    }
}
