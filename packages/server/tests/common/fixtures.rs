//! Test fixtures: canned pages, candidates, and wired app state.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{json, Value};

use seshu::EventCandidate;
use server_core::kernel::TestDependencies;
use server_core::server::AppState;
use server_core::DispatchConfig;

/// Listing page containing the values of [`mock_event`].
pub const LISTING_HTML: &str = r#"<html><body>
<main>
  <article class="event">
    <h2>Mock Event</h2>
    <span class="where">Main Hall, Portland</span>
    <time>Sat Mar 14 7pm PST</time>
    <a href="https://example.com/events/mock">Details</a>
  </article>
</main>
</body></html>"#;

pub fn mock_event() -> EventCandidate {
    EventCandidate::new("Mock Event")
        .with_location("Main Hall, Portland")
        .with_start_time("Sat Mar 14 7pm PST")
        .with_url("https://example.com/events/mock")
}

/// A URL no other test uses, so tests can share one database.
pub fn unique_url(prefix: &str) -> String {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    format!(
        "https://{}.example.com/events/{}-{}",
        prefix,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

/// Validation rows flagging title, location, and start time.
pub fn validations(rows: usize) -> Value {
    let row = json!([true, true, true, false, false, false]);
    Value::Array(vec![row; rows])
}

/// Dependencies serving [`LISTING_HTML`] and one [`mock_event`].
pub fn mock_deps() -> TestDependencies {
    TestDependencies::new()
        .with_html(LISTING_HTML)
        .with_candidates(vec![mock_event()])
}

pub fn app_state(deps: &TestDependencies) -> AppState {
    AppState::new(deps.server_deps(), &DispatchConfig::default())
}
