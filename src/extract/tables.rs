use once_cell::sync::Lazy;
use regex::Regex;

static CELL_GAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\t+|\s{2,}").expect("Failed to compile cell separator")
});

const MIN_CELLS: usize = 3;

/// Splits a page's text into prose and pipe-delimited table rows. Rows are
/// appended after the prose, both in their original order.
pub fn split_tables(page_text: &str) -> String {
    let mut prose = Vec::new();
    let mut rows = Vec::new();

    for line in page_text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let cells: Vec<&str> = CELL_GAP
            .split(trimmed)
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .collect();
        if cells.len() >= MIN_CELLS {
            rows.push(format!("| {} |", cells.join(" | ")));
        } else {
            prose.push(trimmed);
        }
    }

    let mut out = prose.join("\n");
    if !rows.is_empty() {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&rows.join("\n"));
    }
    out
}
