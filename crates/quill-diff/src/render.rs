//! Diff views: side-by-side HTML and unified text.

use crate::{DiffOp, DiffStats};

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Side-by-side line-numbered markup. Old line numbers on the left,
/// new on the right; inserts leave the old cell empty and vice versa.
pub fn render_html(ops: &[DiffOp]) -> String {
    let mut out = String::from("<table class=\"diff\">\n");
    for op in ops {
        let row = match op {
            DiffOp::Equal {
                text,
                old_index,
                new_index,
            } => format!(
                "<tr class=\"diff-equal\"><td class=\"lineno\">{}</td><td class=\"lineno\">{}</td><td>{}</td></tr>\n",
                old_index + 1,
                new_index + 1,
                escape_html(text)
            ),
            DiffOp::Delete { text, old_index } => format!(
                "<tr class=\"diff-delete\"><td class=\"lineno\">{}</td><td class=\"lineno\"></td><td>-{}</td></tr>\n",
                old_index + 1,
                escape_html(text)
            ),
            DiffOp::Insert { text, new_index } => format!(
                "<tr class=\"diff-insert\"><td class=\"lineno\"></td><td class=\"lineno\">{}</td><td>+{}</td></tr>\n",
                new_index + 1,
                escape_html(text)
            ),
        };
        out.push_str(&row);
    }
    out.push_str("</table>\n");
    out
}

/// Unified diff with a single hunk spanning the whole comparison.
/// No context trimming: compared documents are small.
pub fn unified(old_name: &str, new_name: &str, ops: &[DiffOp]) -> String {
    let stats = DiffStats::from_ops(ops);
    let old_len = stats.unchanged + stats.deleted;
    let new_len = stats.unchanged + stats.inserted;

    let mut out = format!("--- {old_name}\n+++ {new_name}\n");
    out.push_str(&format!(
        "@@ -1,{old_len} +1,{new_len} @@\n"
    ));
    for op in ops {
        let (prefix, text) = match op {
            DiffOp::Equal { text, .. } => (' ', text),
            DiffOp::Delete { text, .. } => ('-', text),
            DiffOp::Insert { text, .. } => ('+', text),
        };
        out.push(prefix);
        out.push_str(text);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_diff;

    #[test]
    fn test_render_html_rows() {
        let ops = compute_diff("a\nb", "a\nc").unwrap();
        let html = render_html(&ops);
        assert!(html.contains("diff-equal"));
        assert!(html.contains("diff-delete"));
        assert!(html.contains("diff-insert"));
        // Line numbers are 1-based.
        assert!(html.contains("<td class=\"lineno\">1</td><td class=\"lineno\">1</td>"));
    }

    #[test]
    fn test_render_html_escapes() {
        let ops = compute_diff("", "<script>").unwrap();
        let html = render_html(&ops);
        assert!(!html.contains("<script>"), "{html}");
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_unified_single_hunk() {
        let ops = compute_diff("a\nb", "a\nc").unwrap();
        let text = unified("old.md", "new.md", &ops);
        assert!(text.starts_with("--- old.md\n+++ new.md\n@@ -1,2 +1,2 @@\n"));
        assert!(text.contains(" a\n"));
        assert!(text.contains("-b\n"));
        assert!(text.contains("+c\n"));
        // Exactly one hunk header.
        assert_eq!(text.matches("@@").count(), 2);
    }
}
