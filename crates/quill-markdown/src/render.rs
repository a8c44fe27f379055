//! Block-to-HTML emission.
//!
//! Inline transformation is applied per text run (paragraphs, headings,
//! table cells, list items); code and mermaid content is escaped only.
//! Every top-level element carries `data-source-line` for click-to-scroll
//! sync with the editor pane.

use crate::block::{Alignment, Block, ListKind};
use crate::inline::{escape_html, InlineRules};

pub(crate) fn render_blocks(blocks: &[Block], rules: &InlineRules) -> String {
    let mut out = String::new();
    for block in blocks {
        render_block(block, rules, &mut out);
    }
    out
}

fn render_block(block: &Block, rules: &InlineRules, out: &mut String) {
    let line = block.source_line();
    match block {
        Block::Heading {
            level, text, id, ..
        } => {
            out.push_str(&format!(
                "<h{level} id=\"{id}\" data-source-line=\"{line}\">{}</h{level}>\n",
                rules.apply(text)
            ));
        }
        Block::CodeBlock {
            language, content, ..
        } => {
            let class = match language {
                Some(lang) => format!(" class=\"language-{}\"", escape_html(lang)),
                None => String::new(),
            };
            out.push_str(&format!(
                "<pre data-source-line=\"{line}\"><code{class}>{}</code></pre>\n",
                escape_html(content)
            ));
        }
        Block::Mermaid { code, .. } => {
            out.push_str(&format!(
                "<div class=\"mermaid\" data-source-line=\"{line}\">{}</div>\n",
                escape_html(code)
            ));
        }
        Block::Blockquote { blocks, .. } => {
            out.push_str(&format!("<blockquote data-source-line=\"{line}\">\n"));
            out.push_str(&render_blocks(blocks, rules));
            out.push_str("</blockquote>\n");
        }
        Block::List { kind, items, .. } => {
            let (open, close) = match kind {
                ListKind::Unordered => ("<ul".to_string(), "</ul>"),
                ListKind::Task => ("<ul class=\"task-list\"".to_string(), "</ul>"),
                ListKind::Ordered { start } if *start != 1 => {
                    (format!("<ol start=\"{start}\""), "</ol>")
                }
                ListKind::Ordered { .. } => ("<ol".to_string(), "</ol>"),
            };
            out.push_str(&format!("{open} data-source-line=\"{line}\">\n"));
            for item in items {
                let indent_class = if item.indent >= 2 {
                    format!(" class=\"li-indent-{}\"", item.indent / 2)
                } else {
                    String::new()
                };
                let checkbox = match item.checked {
                    Some(true) => "<input type=\"checkbox\" checked disabled> ",
                    Some(false) => "<input type=\"checkbox\" disabled> ",
                    None => "",
                };
                out.push_str(&format!(
                    "<li{indent_class}>{checkbox}{}</li>\n",
                    rules.apply(&item.content)
                ));
            }
            out.push_str(close);
            out.push('\n');
        }
        Block::Table {
            rows, alignments, ..
        } => {
            out.push_str(&format!("<table data-source-line=\"{line}\">\n"));
            for (i, row) in rows.iter().enumerate() {
                let (section_open, cell) = if i == 0 {
                    ("<thead>\n", "th")
                } else if i == 1 {
                    ("<tbody>\n", "td")
                } else {
                    ("", "td")
                };
                out.push_str(section_open);
                out.push_str("<tr>");
                for (col, content) in row.iter().enumerate() {
                    let align = match alignments.get(col) {
                        Some(Alignment::Center) => " class=\"align-center\"",
                        Some(Alignment::Right) => " class=\"align-right\"",
                        _ => "",
                    };
                    out.push_str(&format!(
                        "<{cell}{align}>{}</{cell}>",
                        rules.apply(content)
                    ));
                }
                out.push_str("</tr>\n");
                if i == 0 {
                    out.push_str("</thead>\n");
                }
            }
            if rows.len() > 1 {
                out.push_str("</tbody>\n");
            }
            out.push_str("</table>\n");
        }
        Block::HorizontalRule { .. } => {
            out.push_str(&format!("<hr data-source-line=\"{line}\">\n"));
        }
        Block::Paragraph { text, .. } => {
            out.push_str(&format!(
                "<p data-source-line=\"{line}\">{}</p>\n",
                rules.apply(text)
            ));
        }
    }
}
