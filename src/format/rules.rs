use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::Category;

/// The eight sections the analysis prompt asks for, in canonical order.
pub const SECTION_KEYWORDS: [(&str, Category); 8] = [
    ("SUMMARY", Category::Summary),
    ("KEY FINDINGS", Category::Findings),
    ("HEALTH STATUS", Category::Status),
    ("LIFESTYLE RECOMMENDATIONS", Category::Lifestyle),
    ("DIETARY SUGGESTIONS", Category::Diet),
    ("EXERCISE RECOMMENDATIONS", Category::Exercise),
    ("FOLLOW-UP ACTIONS", Category::Followup),
    ("PREVENTIVE MEASURES", Category::Prevention),
];

static NUMBERED_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\s+(.+)$").expect("Failed to compile numbered heading pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Heading { key: String, category: Category },
    Bullet(&'a str),
    SubHeading(&'a str),
    Paragraph(&'a str),
}

/// A heading matcher. Rules run top to bottom and the first hit wins.
enum HeadingRule {
    Keyword,
    Numbered,
}

const HEADING_RULES: [HeadingRule; 2] = [HeadingRule::Keyword, HeadingRule::Numbered];

impl HeadingRule {
    fn matches(&self, line: &str) -> Option<(String, Category)> {
        match self {
            HeadingRule::Keyword => {
                let upper = line.to_uppercase();
                SECTION_KEYWORDS
                    .iter()
                    .find(|(keyword, _)| upper.contains(keyword))
                    .map(|(keyword, category)| (keyword.to_string(), *category))
            }
            HeadingRule::Numbered => {
                let caps = NUMBERED_HEADING.captures(line)?;
                let title = clean_title(caps.get(1)?.as_str());
                if title.is_empty() {
                    return None;
                }
                Some((title.to_uppercase(), Category::General))
            }
        }
    }
}

fn clean_title(raw: &str) -> String {
    raw.replace("**", "")
        .trim_matches(|c: char| c == '#' || c.is_whitespace())
        .trim_end_matches(':')
        .trim()
        .to_string()
}

/// Classifies one trimmed, non-blank line. Heading rules are always tried
/// before any content rule, so an upper-case keyword line is a heading and
/// never a sub-heading.
pub fn classify(line: &str) -> LineKind<'_> {
    for rule in &HEADING_RULES {
        if let Some((key, category)) = rule.matches(line) {
            return LineKind::Heading { key, category };
        }
    }

    if let Some(item) = bullet_item(line) {
        return LineKind::Bullet(item);
    }

    if is_sub_heading(line) {
        return LineKind::SubHeading(line);
    }

    LineKind::Paragraph(line)
}

fn bullet_item(line: &str) -> Option<&str> {
    let rest = if let Some(rest) = line.strip_prefix('-') {
        rest
    } else if let Some(rest) = line.strip_prefix('•') {
        rest
    } else if let Some(rest) = line.strip_prefix('*') {
        // "**bold** text" opens with emphasis, not a bullet.
        if rest.starts_with('*') {
            return None;
        }
        rest
    } else {
        return None;
    };
    Some(rest.trim_start())
}

fn is_sub_heading(line: &str) -> bool {
    if line.ends_with(':') {
        return true;
    }
    line.chars().any(char::is_alphabetic) && !line.chars().any(char::is_lowercase)
}
