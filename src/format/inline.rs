use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::Inline;

static EMPHASIS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*(.+?)\*\*").expect("Failed to compile emphasis pattern")
});

// Alphabetic units need a trailing word boundary so "10 grams" is not read as "10 g".
// Longer units come first so "mg/dL" wins over "mg".
static HIGHLIGHT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<value>\b\d+(?:\.\d+)?(?:\s*[-–]\s*\d+(?:\.\d+)?)?",
        r"(?:\s?(?:(?:mg/dL|mmol/L|g/dL|mIU/L|µIU/mL|uIU/mL|ng/mL|pg/mL|mcg/dL|U/L|mmHg|mEq/L|fL|pg|mcg|mg|kg|cm|IU|bpm|mL|ml|g|L)\b|%))?)",
        r"|(?i:\b(?P<term>abnormal|borderline|critical|deficient|elevated|high|important|low|normal|optimal|recommended|urgent)\b)",
    ))
    .expect("Failed to compile highlight pattern")
});

/// Turns one content line into inline spans: `**emphasis**`, values and status terms.
pub fn highlight(line: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut last = 0;

    for caps in EMPHASIS.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_highlighted(&line[last..whole.start()], &mut spans);
        let mut children = Vec::new();
        push_highlighted(inner.as_str(), &mut children);
        spans.push(Inline::Emphasis(children));
        last = whole.end();
    }
    push_highlighted(&line[last..], &mut spans);

    spans
}

fn push_highlighted(text: &str, spans: &mut Vec<Inline>) {
    let mut last = 0;

    for caps in HIGHLIGHT.captures_iter(text) {
        let (start, end, inline) = if let Some(value) = caps.name("value") {
            (value.start(), value.end(), Inline::Value(value.as_str().to_string()))
        } else if let Some(term) = caps.name("term") {
            (
                term.start(),
                term.end(),
                Inline::Term {
                    text: term.as_str().to_string(),
                    class: term.as_str().to_lowercase(),
                },
            )
        } else {
            continue;
        };
        push_text(&text[last..start], spans);
        spans.push(inline);
        last = end;
    }
    push_text(&text[last..], spans);
}

fn push_text(text: &str, spans: &mut Vec<Inline>) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(previous)) = spans.last_mut() {
        previous.push_str(text);
    } else {
        spans.push(Inline::Text(text.to_string()));
    }
}
