use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::document::{Block, Inline, ReportDocument, SectionBlock};

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, "Noto Sans Devanagari", sans-serif; color: #222; max-width: 860px; margin: 2rem auto; padding: 0 1rem; line-height: 1.55; }
h1 { text-align: center; color: #2E86AB; }
.patient-info { background: #f8f9fa; border-radius: 8px; padding: 1rem 1.5rem; margin-bottom: 1.5rem; }
.patient-info dt { font-weight: bold; float: left; clear: left; width: 12rem; }
.patient-info dd { margin-left: 12rem; }
.section { border-left: 5px solid #2E86AB; background: #fff; padding: 0.5rem 1.25rem; margin: 1.25rem 0; box-shadow: 0 1px 3px rgba(0,0,0,0.08); page-break-inside: avoid; }
.section h2 { margin: 0.5rem 0; font-size: 1.2rem; }
.section h3 { font-size: 1rem; margin: 0.75rem 0 0.25rem; }
.section-summary { border-color: #2E86AB; }
.section-findings { border-color: #e67e22; }
.section-status { border-color: #e74c3c; }
.section-lifestyle { border-color: #27ae60; }
.section-diet { border-color: #8bc34a; }
.section-exercise { border-color: #9b59b6; }
.section-followup { border-color: #f1c40f; }
.section-prevention { border-color: #16a085; }
.section-overview, .section-general { border-color: #7f8c8d; }
.value { background: #eef6fb; color: #1b4f72; font-weight: 600; padding: 0 0.2em; border-radius: 3px; }
.term { font-weight: 700; text-transform: uppercase; font-size: 0.9em; }
.term-high, .term-elevated, .term-critical, .term-abnormal, .term-urgent { color: #c0392b; }
.term-low, .term-deficient, .term-borderline { color: #d68910; }
.term-normal, .term-optimal { color: #1e8449; }
.term-recommended, .term-important { color: #2471a3; }
.disclaimer { border: 1px solid #f5c6cb; background: #fff5f5; color: #a94442; padding: 1rem; border-radius: 6px; margin-top: 2rem; font-size: 0.9rem; }
@media print { body { margin: 0; } .section { box-shadow: none; } }
"#;

const PRINT_TRIGGER: &str = "<script>window.addEventListener('load', function () { window.print(); });</script>";

/// Full self-contained page that opens the print dialog on load.
pub fn render(doc: &ReportDocument) -> String {
    let mut out = String::with_capacity(8 * 1024);
    let _ = writeln!(out, "<!DOCTYPE html>\n<html lang=\"{}\">", doc.patient.language.html_lang());
    out.push_str("<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", encode_text(doc.title));
    let _ = writeln!(out, "<style>{}</style>", STYLE);
    out.push_str("</head>\n<body>\n");
    let _ = writeln!(out, "<h1>🏥 {}</h1>", encode_text(doc.title));

    out.push_str("<dl class=\"patient-info\">\n");
    for (label, value) in doc.patient.rows() {
        let _ = writeln!(out, "<dt>{}:</dt><dd>{}</dd>", encode_text(label), encode_text(&value));
    }
    out.push_str("</dl>\n");

    out.push_str("<h2>Health Analysis &amp; Recommendations</h2>\n");
    out.push_str(&render_sections(&doc.sections));

    let _ = writeln!(
        out,
        "<div class=\"disclaimer\"><strong>IMPORTANT DISCLAIMER:</strong><br>{}</div>",
        encode_text(doc.disclaimer)
    );
    out.push_str(PRINT_TRIGGER);
    out.push_str("\n</body>\n</html>\n");
    out
}

/// The section blocks alone, for embedding in another page.
pub fn render_sections(sections: &[SectionBlock]) -> String {
    let mut out = String::new();
    for section in sections {
        render_section(section, &mut out);
    }
    out
}

fn render_section(section: &SectionBlock, out: &mut String) {
    let category = section.category.as_str();
    let _ = writeln!(
        out,
        "<section class=\"section section-{}\" data-key=\"{}\">",
        category,
        encode_double_quoted_attribute(&section.key)
    );
    let _ = writeln!(
        out,
        "<h2><span class=\"icon\">{}</span> {}</h2>",
        section.category.icon(),
        encode_text(&section.key)
    );
    for block in &section.content {
        match block {
            Block::Paragraph(inlines) => {
                out.push_str("<p>");
                render_inlines(inlines, out);
                out.push_str("</p>\n");
            }
            Block::SubHeading(inlines) => {
                out.push_str("<h3>");
                render_inlines(inlines, out);
                out.push_str("</h3>\n");
            }
            Block::List(items) => {
                out.push_str("<ul>\n");
                for item in items {
                    out.push_str("<li>");
                    render_inlines(item, out);
                    out.push_str("</li>\n");
                }
                out.push_str("</ul>\n");
            }
        }
    }
    out.push_str("</section>\n");
}

fn render_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&encode_text(text)),
            Inline::Value(text) => {
                let _ = write!(out, "<span class=\"value\">{}</span>", encode_text(text));
            }
            Inline::Term { text, class } => {
                let _ = write!(
                    out,
                    "<span class=\"term term-{}\">{}</span>",
                    encode_double_quoted_attribute(class),
                    encode_text(text)
                );
            }
            Inline::Emphasis(children) => {
                out.push_str("<strong>");
                render_inlines(children, out);
                out.push_str("</strong>");
            }
            Inline::LineBreak => out.push_str("<br>"),
        }
    }
}
