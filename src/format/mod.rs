//! Turns the model's free-text answer into ordered, categorised sections.
//!
//! Single pass over the lines. Heading rules run first on every line; only
//! non-heading lines reach the bullet / sub-heading / paragraph rules.

mod inline;
mod rules;

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Block, Category, Inline, SectionBlock};
use crate::error::AppError;

pub use inline::highlight;
pub use rules::{classify, LineKind, SECTION_KEYWORDS};

pub const OVERVIEW_KEY: &str = "OVERVIEW";
pub const GENERIC_KEY: &str = "HEALTH ANALYSIS";

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").expect("Failed to compile paragraph separator")
});

/// What to do with content that appears before the first heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreamblePolicy {
    /// Discard it.
    #[default]
    Drop,
    /// Collect it into a leading `OVERVIEW` section.
    Keep,
}

impl FromStr for PreamblePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(PreamblePolicy::Drop),
            "keep" => Ok(PreamblePolicy::Keep),
            other => Err(AppError::ConfigError(format!(
                "Invalid REPORT_PREAMBLE '{}', expected 'drop' or 'keep'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    pub preamble: PreamblePolicy,
}

#[derive(Default)]
struct SectionBuilder {
    sections: Vec<SectionBlock>,
    current: Option<SectionBlock>,
    list: Vec<Vec<Inline>>,
    headings_seen: usize,
}

impl SectionBuilder {
    fn open(&mut self, key: String, category: Category) {
        self.close();
        self.current = Some(SectionBlock::new(key, category));
        self.headings_seen += 1;
    }

    fn push_block(&mut self, block: Block) {
        self.flush_list();
        if let Some(section) = self.current.as_mut() {
            section.content.push(block);
        }
    }

    fn push_item(&mut self, item: Vec<Inline>) {
        if self.current.is_some() {
            self.list.push(item);
        }
    }

    fn flush_list(&mut self) {
        if self.list.is_empty() {
            return;
        }
        let items = std::mem::take(&mut self.list);
        if let Some(section) = self.current.as_mut() {
            section.content.push(Block::List(items));
        }
    }

    fn close(&mut self) {
        self.flush_list();
        if let Some(section) = self.current.take() {
            self.sections.push(section);
        }
    }

    fn finish(mut self) -> (Vec<SectionBlock>, usize) {
        self.close();
        (self.sections, self.headings_seen)
    }
}

/// Formats `analysis` into sections in the order they appear in the text.
///
/// With no recognisable heading at all the whole text becomes one generic
/// section split into blank-line separated paragraphs.
pub fn format_analysis(analysis: &str, options: FormatOptions) -> Vec<SectionBlock> {
    let mut builder = SectionBuilder::default();
    if options.preamble == PreamblePolicy::Keep {
        builder.current = Some(SectionBlock::new(OVERVIEW_KEY, Category::Overview));
    }

    for line in analysis.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match classify(line) {
            LineKind::Heading { key, category } => builder.open(key, category),
            LineKind::Bullet(item) => builder.push_item(highlight(item)),
            LineKind::SubHeading(text) => builder.push_block(Block::SubHeading(highlight(text))),
            LineKind::Paragraph(text) => builder.push_block(Block::Paragraph(highlight(text))),
        }
    }

    let (sections, headings_seen) = builder.finish();
    if headings_seen == 0 {
        return vec![plain_section(analysis)];
    }

    sections
        .into_iter()
        .filter(|section| section.key != OVERVIEW_KEY || !section.content.is_empty())
        .collect()
}

/// One generic section of highlighted paragraphs. Also the rendering fallback.
pub fn plain_section(analysis: &str) -> SectionBlock {
    let mut section = SectionBlock::new(GENERIC_KEY, Category::General);
    for paragraph in BLANK_LINE.split(analysis) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let mut inlines = Vec::new();
        for (i, line) in paragraph.lines().map(str::trim).enumerate() {
            if i > 0 {
                inlines.push(Inline::LineBreak);
            }
            inlines.extend(highlight(line));
        }
        section.content.push(Block::Paragraph(inlines));
    }
    section
}
