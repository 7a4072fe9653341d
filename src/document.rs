//! Typed report tree shared by the formatter and the serializers.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::analysis::{AnalysisResult, Language};

pub const REPORT_TITLE: &str = "Health Checkup Analysis Report";
pub const ANALYSIS_BY: &str = "AI Health Assistant";
pub const DISCLAIMER: &str = "This analysis is generated by AI and is for informational purposes only. \
It should not replace professional medical advice, diagnosis, or treatment. \
Always consult with qualified healthcare professionals for medical concerns.";

/// Presentation category of a section. Drives styling only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Summary,
    Findings,
    Status,
    Lifestyle,
    Diet,
    Exercise,
    Followup,
    Prevention,
    Overview,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Summary => "summary",
            Category::Findings => "findings",
            Category::Status => "status",
            Category::Lifestyle => "lifestyle",
            Category::Diet => "diet",
            Category::Exercise => "exercise",
            Category::Followup => "followup",
            Category::Prevention => "prevention",
            Category::Overview => "overview",
            Category::General => "general",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Summary => "📋",
            Category::Findings => "🔍",
            Category::Status => "❤️",
            Category::Lifestyle => "🌱",
            Category::Diet => "🥗",
            Category::Exercise => "💪",
            Category::Followup => "📅",
            Category::Prevention => "🛡️",
            Category::Overview => "📝",
            Category::General => "📄",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    /// Numeric measurement, optionally a range and a unit.
    Value(String),
    /// Medical status word; `class` is its lower-cased form.
    Term { text: String, class: String },
    Emphasis(Vec<Inline>),
    LineBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    SubHeading(Vec<Inline>),
    List(Vec<Vec<Inline>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBlock {
    pub key: String,
    pub category: Category,
    pub content: Vec<Block>,
}

impl SectionBlock {
    pub fn new(key: impl Into<String>, category: Category) -> Self {
        SectionBlock {
            key: key.into(),
            category,
            content: Vec::new(),
        }
    }

    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.key);
        out.push('\n');
        for block in &self.content {
            match block {
                Block::Paragraph(inlines) | Block::SubHeading(inlines) => {
                    out.push_str(&inlines_plain_text(inlines));
                    out.push('\n');
                }
                Block::List(items) => {
                    for item in items {
                        out.push_str("- ");
                        out.push_str(&inlines_plain_text(item));
                        out.push('\n');
                    }
                }
            }
        }
        out
    }
}

pub fn inlines_plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_plain(inlines, &mut out);
    out
}

fn push_plain(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Value(text) => out.push_str(text),
            Inline::Term { text, .. } => out.push_str(text),
            Inline::Emphasis(children) => push_plain(children, out),
            Inline::LineBreak => out.push('\n'),
        }
    }
}

/// Plain-text projection of a formatted report, blank line between sections.
pub fn to_plain_text(sections: &[SectionBlock]) -> String {
    sections
        .iter()
        .map(SectionBlock::plain_text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct PatientInfo {
    pub name: String,
    pub generated_at: DateTime<Utc>,
    pub language: Language,
    pub analysis_by: &'static str,
    pub page_count: Option<u32>,
    pub source_length: Option<usize>,
}

impl PatientInfo {
    /// Label/value rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Patient Name", self.name.clone()),
            (
                "Report Generated",
                self.generated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            ("Language", self.language.to_string()),
            ("Analysis By", self.analysis_by.to_string()),
        ];
        if let Some(pages) = self.page_count {
            rows.push(("Source Pages", pages.to_string()));
        }
        if let Some(length) = self.source_length {
            rows.push(("Extracted Characters", length.to_string()));
        }
        rows
    }
}

#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub title: &'static str,
    pub patient: PatientInfo,
    pub sections: Vec<SectionBlock>,
    pub disclaimer: &'static str,
}

impl ReportDocument {
    pub fn assemble(result: &AnalysisResult, patient_name: &str, sections: Vec<SectionBlock>) -> Self {
        let name = patient_name.trim();
        ReportDocument {
            title: REPORT_TITLE,
            patient: PatientInfo {
                name: if name.is_empty() { "Patient".to_string() } else { name.to_string() },
                generated_at: result.generated_at,
                language: result.target_language,
                analysis_by: ANALYSIS_BY,
                page_count: result.page_count,
                source_length: result.source_length,
            },
            sections,
            disclaimer: DISCLAIMER,
        }
    }

    /// Same patient block with different sections; used for the plain fallback.
    pub fn with_sections(&self, sections: Vec<SectionBlock>) -> Self {
        ReportDocument {
            sections,
            ..self.clone()
        }
    }
}
