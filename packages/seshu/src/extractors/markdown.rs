//! HTML to model input.

use scraper::{Html, Selector};

/// Most lines sent to the model for one page.
pub const MAX_LINES: usize = 1500;

/// Convert the page body to Markdown and keep the first `MAX_LINES`
/// non-empty lines, trimmed.
pub fn page_lines(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(|el| el.html()))
        .unwrap_or_else(|| document.html());

    let markdown = htmd::convert(&body).unwrap_or_else(|_| {
        // Fall back to plain text, one line per text node
        document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join("\n")
    });

    markdown
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(MAX_LINES)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_come_from_body_only() {
        let html = "<html><head><title>Ignored</title></head><body><h1>Jazz Night</h1>\n\n<p>Sat 9pm</p></body></html>";
        let lines = page_lines(html);
        assert!(lines.iter().any(|l| l.contains("Jazz Night")));
        assert!(lines.iter().any(|l| l.contains("Sat 9pm")));
        assert!(!lines.iter().any(|l| l.contains("Ignored")));
        assert!(lines.iter().all(|l| !l.is_empty()));
    }

    #[test]
    fn test_line_cap() {
        let body: String = (0..2000).map(|i| format!("<p>line {}</p>", i)).collect();
        let lines = page_lines(&format!("<html><body>{}</body></html>", body));
        assert_eq!(lines.len(), MAX_LINES);
        assert_eq!(lines[0], "line 0");
    }
}
