//! Extraction prompts.
//!
//! Both prompts show the model an example whose values are deliberately
//! impossible (hour 26, "Nowhere City"). The validator rejects those values
//! if the model copies them back.

use crate::pipeline::validator::{
    FAKE_CITY, FAKE_END_TIME_1, FAKE_END_TIME_2, FAKE_EVENT_TITLE_1, FAKE_EVENT_TITLE_2,
    FAKE_START_TIME_1, FAKE_START_TIME_2, FAKE_URL_1, FAKE_URL_2,
};
use crate::types::ScrapeMode;

const CATEGORIES: &str = "\
The categories to match strings against are:
=====
1. Event title
2. Event location
3. Event start date / time
4. Event end date / time
5. Event URL
6. Event description

Some categories may have no matching string (the example below has no description). Leave those keys out.";

const RULES: &str = "\
Your response must ALWAYS begin with the characters `[{` and end with the characters `}]`. If `textStrings` is empty, return an empty array.

Do not write or explain code, and do not suggest regular expressions. Grouping these strings by meaning is a task only a language model can do, so do it directly.

Strings that match no category may be discarded. Never shorten the output with an ellipsis `...`.";

fn example_event(title: &str, start: &str, end: &str, url: &str) -> String {
    format!(
        r#"{{"event_title": "{}", "event_location": "{}", "event_start_datetime": "{}", "event_end_datetime": "{}", "event_url": "{}"}}"#,
        title, FAKE_CITY, start, end, url
    )
}

/// Instructions for a listing page with any number of events.
pub fn listing_prompt() -> String {
    format!(
        "You reorganize an array of text strings taken from a web page into structured event data.

Take the JavaScript array `textStrings` given below and return a JSON array of objects, one object per event. The keys of each object are the event metadata categories listed below, each key at most once per object. Strings that sit close together in the array most likely describe the same event, so group by proximity.

{rules}

{categories}

Return every event you find as valid JSON following this example schema:

```
[{first},{second}]
```

The input is:
=====
const textStrings = ",
        rules = RULES,
        categories = CATEGORIES,
        first = example_event(FAKE_EVENT_TITLE_1, FAKE_START_TIME_1, FAKE_END_TIME_1, FAKE_URL_1),
        second = example_event(FAKE_EVENT_TITLE_2, FAKE_START_TIME_2, FAKE_END_TIME_2, FAKE_URL_2),
    )
}

/// Instructions for a single event's own page.
pub fn event_page_prompt() -> String {
    format!(
        "You reorganize an array of text strings taken from a web page into structured event data.

Take the JavaScript array `textStrings` given below and return a JSON array containing exactly one object that describes the single event on this page. The keys of the object are the event metadata categories listed below, each key at most once. When several strings could fit a category, prefer the ones closest together in the array.

{rules}

{categories}

Return the event as valid JSON following this example schema:

```
[{only}]
```

The input is:
=====
const textStrings = ",
        rules = RULES,
        categories = CATEGORIES,
        only = example_event(FAKE_EVENT_TITLE_1, FAKE_START_TIME_1, FAKE_END_TIME_1, FAKE_URL_1),
    )
}

pub fn prompt_for(mode: ScrapeMode) -> String {
    match mode {
        ScrapeMode::Init => listing_prompt(),
        ScrapeMode::Rs => event_page_prompt(),
    }
}
