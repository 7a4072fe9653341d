//! Paginated A4 output using the standard Helvetica fonts.
//!
//! Layout is a greedy word wrap with an average-width estimate. Words are
//! split only where the text has whitespace, and each styled run inside a
//! word is drawn on its own so highlighted values stay bold and coloured.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::document::{Block, Inline, ReportDocument, SectionBlock};

use super::RenderError;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH: f32 = 0.52;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Style {
    bold: bool,
    size: f32,
    color: (f32, f32, f32),
}

const BODY: Style = Style { bold: false, size: 11.0, color: (0.13, 0.13, 0.13) };
const STRONG: Style = Style { bold: true, ..BODY };
const VALUE: Style = Style { bold: true, size: 11.0, color: (0.11, 0.31, 0.45) };
const TITLE: Style = Style { bold: true, size: 20.0, color: (0.0, 0.0, 0.55) };
const HEADING: Style = Style { bold: true, size: 14.0, color: (0.0, 0.39, 0.0) };
const SUB_HEADING: Style = Style { bold: true, size: 12.0, color: (0.2, 0.2, 0.2) };
const DISCLAIMER: Style = Style { bold: false, size: 10.0, color: (0.8, 0.0, 0.0) };

fn term_style(class: &str) -> Style {
    let color = match class {
        "high" | "elevated" | "critical" | "abnormal" | "urgent" => (0.75, 0.22, 0.17),
        "low" | "deficient" | "borderline" => (0.84, 0.54, 0.06),
        "normal" | "optimal" => (0.12, 0.52, 0.29),
        _ => (0.14, 0.44, 0.64),
    };
    Style { bold: true, size: 11.0, color }
}

/// A run of text drawn in one style.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    text: String,
    style: Style,
}

/// Text between two whitespace breaks. Spans that touch without whitespace
/// stay in one word as separate runs.
type Word = Vec<Run>;

#[derive(Default)]
struct WordBuilder {
    words: Vec<Word>,
    pending: Word,
}

impl WordBuilder {
    fn push_text(&mut self, text: &str, style: Style) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.break_word();
                continue;
            }
            match self.pending.last_mut() {
                Some(run) if run.style == style => run.text.push(c),
                _ => self.pending.push(Run { text: c.to_string(), style }),
            }
        }
    }

    fn break_word(&mut self) {
        if !self.pending.is_empty() {
            self.words.push(std::mem::take(&mut self.pending));
        }
    }

    fn finish(mut self) -> Vec<Word> {
        self.break_word();
        self.words
    }
}

struct Layout {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Layout {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(ops);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn space(&mut self, points: f32) {
        self.y -= points;
    }

    /// Wraps `words` into lines starting at `indent` and emits them.
    fn paragraph(&mut self, words: Vec<Word>, indent: f32) {
        let max_width = PAGE_WIDTH - 2.0 * MARGIN - indent;
        let mut line: Vec<Word> = Vec::new();
        let mut width = 0.0;

        for word in words.into_iter().flat_map(|word| hard_break(word, max_width)) {
            let gap = if line.is_empty() { 0.0 } else { space_width(word_size(&word)) };
            let extent = word_width(&word);
            if !line.is_empty() && width + gap + extent > max_width {
                self.line(std::mem::take(&mut line), indent);
                width = extent;
            } else {
                width += gap + extent;
            }
            line.push(word);
        }
        if !line.is_empty() {
            self.line(line, indent);
        }
    }

    fn line(&mut self, words: Vec<Word>, indent: f32) {
        let height = words.iter().map(word_size).fold(0.0, f32::max) * 1.4;
        if self.y - height < MARGIN {
            self.new_page();
        }
        self.y -= height;

        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("Td", vec![(MARGIN + indent).into(), self.y.into()]));
        let mut current: Option<Style> = None;
        for (i, word) in words.into_iter().enumerate() {
            for (j, run) in word.into_iter().enumerate() {
                if current != Some(run.style) {
                    let font = if run.style.bold { "F2" } else { "F1" };
                    self.ops.push(Operation::new("Tf", vec![font.into(), run.style.size.into()]));
                    let (r, g, b) = run.style.color;
                    self.ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
                    current = Some(run.style);
                }
                let mut bytes = Vec::with_capacity(run.text.len() + 1);
                if i > 0 && j == 0 {
                    bytes.push(b' ');
                }
                bytes.extend(win_ansi(&run.text));
                self.ops.push(Operation::new("Tj", vec![Object::String(bytes, StringFormat::Literal)]));
            }
        }
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        self.pages
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_GLYPH
}

fn space_width(size: f32) -> f32 {
    size * 0.28
}

fn word_width(word: &Word) -> f32 {
    word.iter().map(|run| text_width(&run.text, run.style.size)).sum()
}

fn word_size(word: &Word) -> f32 {
    word.iter().map(|run| run.style.size).fold(0.0, f32::max)
}

/// Splits a word wider than `max_width` (a long URL, say) into pieces that
/// each fit on a line of their own.
fn hard_break(word: Word, max_width: f32) -> Vec<Word> {
    if word_width(&word) <= max_width {
        return vec![word];
    }
    let mut pieces = Vec::new();
    let mut piece: Word = Vec::new();
    let mut width = 0.0;
    for run in word {
        for c in run.text.chars() {
            let glyph = run.style.size * AVG_GLYPH;
            if !piece.is_empty() && width + glyph > max_width {
                pieces.push(std::mem::take(&mut piece));
                width = 0.0;
            }
            width += glyph;
            match piece.last_mut() {
                Some(last) if last.style == run.style => last.text.push(c),
                _ => piece.push(Run { text: c.to_string(), style: run.style }),
            }
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Encodes into WinAnsi; characters outside it become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '€' => 0x80,
            _ => b'?',
        })
        .collect()
}

fn words_of(text: &str, style: Style) -> Vec<Word> {
    let mut builder = WordBuilder::default();
    builder.push_text(text, style);
    builder.finish()
}

fn inline_words(inlines: &[Inline], base: Style, out: &mut WordBuilder) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_text(text, base),
            Inline::Value(text) => out.push_text(text, Style { size: base.size, ..VALUE }),
            Inline::Term { text, class } => out.push_text(text, Style { size: base.size, ..term_style(class) }),
            Inline::Emphasis(children) => inline_words(children, Style { bold: true, ..base }, out),
            // Word-level layout reflows lines anyway.
            Inline::LineBreak => out.break_word(),
        }
    }
}

fn inline_paragraph(inlines: &[Inline], base: Style, prefix: Option<&str>) -> Vec<Word> {
    let mut builder = WordBuilder::default();
    if let Some(prefix) = prefix {
        builder.push_text(prefix, base);
        builder.break_word();
    }
    inline_words(inlines, base, &mut builder);
    builder.finish()
}

fn section(layout: &mut Layout, section: &SectionBlock) {
    layout.space(10.0);
    layout.paragraph(words_of(&section.key, HEADING), 0.0);
    layout.space(4.0);
    for block in &section.content {
        match block {
            Block::Paragraph(inlines) => {
                layout.paragraph(inline_paragraph(inlines, BODY, None), 0.0);
                layout.space(6.0);
            }
            Block::SubHeading(inlines) => {
                layout.space(4.0);
                layout.paragraph(inline_paragraph(inlines, SUB_HEADING, None), 0.0);
            }
            Block::List(items) => {
                for item in items {
                    layout.paragraph(inline_paragraph(item, BODY, Some("•")), 12.0);
                }
                layout.space(6.0);
            }
        }
    }
}

pub fn render(doc: &ReportDocument) -> Result<Vec<u8>, RenderError> {
    let mut layout = Layout::new();
    layout.paragraph(words_of(doc.title, TITLE), 0.0);
    layout.space(16.0);

    for (label, value) in doc.patient.rows() {
        let mut words = words_of(&format!("{}:", label), STRONG);
        words.extend(words_of(&value, BODY));
        layout.paragraph(words, 0.0);
    }
    layout.space(16.0);
    layout.paragraph(words_of("Health Analysis & Recommendations", HEADING), 0.0);

    for s in &doc.sections {
        section(&mut layout, s);
    }

    layout.space(24.0);
    layout.paragraph(words_of("IMPORTANT DISCLAIMER:", Style { bold: true, ..DISCLAIMER }), 0.0);
    layout.paragraph(words_of(doc.disclaimer, DISCLAIMER), 0.0);

    write_document(layout.finish())
}

fn write_document(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| RenderError(format!("Failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError(format!("Failed to write PDF: {}", e)))?;
    Ok(buffer)
}
