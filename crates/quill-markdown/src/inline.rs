//! Inline transformation: an ordered sequence of textual substitutions.
//!
//! The pass order is a hard contract, not a convenience. HTML-escaping
//! runs exactly once, before any markup is injected, so user content can
//! never reintroduce raw tags; math is lifted out early so formulas are
//! never re-interpreted as markdown; later passes must not re-match the
//! output of earlier ones.
//!
//! Order: escape, block math, inline math, images, links, autolinks,
//! bold, italic, strikethrough, code spans, emoji, hard breaks.

use regex::{Captures, Regex};

use crate::emoji::emoji_glyph;

/// Sentinel pair bracketing lifted math placeholders. Private-use
/// characters cannot occur in escaped input, so no later pass can
/// touch the lifted content.
const MATH_OPEN: char = '\u{E000}';
const MATH_CLOSE: char = '\u{E001}';

/// Compiled patterns for the inline pipeline. Owned by the parser
/// instance; no process-wide mutable state.
pub(crate) struct InlineRules {
    math_block: Regex,
    math_inline: Regex,
    image: Regex,
    link: Regex,
    autolink: Regex,
    bold_star: Regex,
    strike: Regex,
    code: Regex,
    emoji: Regex,
}

impl InlineRules {
    pub(crate) fn new() -> Self {
        // These patterns are static and known-good; compiling them is
        // infallible in practice.
        Self {
            math_block: Regex::new(r"\$\$([^$]+)\$\$").unwrap(),
            math_inline: Regex::new(r"\$([^$\n]+)\$").unwrap(),
            image: Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap(),
            link: Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap(),
            autolink: Regex::new(r"(^|\s)(https?://[^\s<]+)").unwrap(),
            bold_star: Regex::new(r"\*\*([^*]+)\*\*").unwrap(),
            strike: Regex::new(r"~~([^~]+)~~").unwrap(),
            code: Regex::new(r"`([^`]+)`").unwrap(),
            emoji: Regex::new(r":([a-zA-Z0-9_+\-]+):").unwrap(),
        }
    }

    /// Run the full substitution pipeline over one text run.
    pub(crate) fn apply(&self, run: &str) -> String {
        let mut lifted: Vec<String> = Vec::new();

        let text = escape_html(run);
        let text = self.lift_math(&text, true, &mut lifted);
        let text = self.lift_math(&text, false, &mut lifted);
        let text = self.image.replace_all(&text, |caps: &Captures| {
            format!(
                r#"<img src="{}" alt="{}">"#,
                sanitize_url(&caps[2]),
                &caps[1]
            )
        });
        let text = self.link.replace_all(&text, |caps: &Captures| {
            format!(r#"<a href="{}">{}</a>"#, sanitize_url(&caps[2]), &caps[1])
        });
        let text = self.autolink.replace_all(&text, |caps: &Captures| {
            format!(r#"{}<a href="{url}">{url}</a>"#, &caps[1], url = &caps[2])
        });
        let text = self.bold_star.replace_all(&text, "<strong>$1</strong>");
        let text = emphasize(&text, '_', '_', "strong");
        let text = emphasize(&text, '*', '\0', "em");
        let text = emphasize(&text, '_', '\0', "em");
        let text = self.strike.replace_all(&text, "<del>$1</del>");
        let text = self.code.replace_all(&text, "<code>$1</code>");
        let text = self.emoji.replace_all(&text, |caps: &Captures| {
            match emoji_glyph(&caps[1]) {
                Some(glyph) => glyph.to_string(),
                // Unknown shortcodes pass through unchanged.
                None => caps[0].to_string(),
            }
        });
        let text = text.replace("  \n", "<br>\n");
        let text = text.trim_end().to_string();

        restore_math(&text, &lifted)
    }

    /// Replace math regions with inert numbered sentinels, rendering the
    /// placeholder span up front. The formula travels in a data attribute
    /// and is never parsed as markdown.
    fn lift_math(&self, text: &str, block: bool, lifted: &mut Vec<String>) -> String {
        let (re, class) = if block {
            (&self.math_block, "math math-block")
        } else {
            (&self.math_inline, "math math-inline")
        };
        re.replace_all(text, |caps: &Captures| {
            let formula = caps[1].trim().to_string();
            lifted.push(format!(
                r#"<span class="{class}" data-formula="{formula}">{formula}</span>"#
            ));
            format!("{MATH_OPEN}{}{MATH_CLOSE}", lifted.len() - 1)
        })
        .into_owned()
    }
}

fn restore_math(text: &str, lifted: &[String]) -> String {
    if lifted.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(MATH_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + MATH_OPEN.len_utf8()..];
        match after.find(MATH_CLOSE) {
            Some(end) => {
                if let Some(span) = after[..end].parse::<usize>().ok().and_then(|i| lifted.get(i)) {
                    out.push_str(span);
                }
                rest = &after[end + MATH_CLOSE.len_utf8()..];
            }
            None => {
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape the five HTML metacharacters. Runs exactly once, first.
pub fn escape_html(text: &str) -> String {
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

/// Drop URI schemes that execute script. The URL text is already
/// HTML-escaped; only the scheme needs vetting here.
fn sanitize_url(url: &str) -> String {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    let lower = compact.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("vbscript:") || lower.starts_with("data:")
    {
        "#".to_string()
    } else {
        url.trim().to_string()
    }
}

/// Wrap `delim`-delimited runs in `<tag>`, with word-boundary checks on
/// the matching side so `snake_case_words` and mid-word asterisks do not
/// trigger emphasis. `regex` has no lookaround, so this is a hand scan:
/// boundaries are inspected without being consumed, which also lets
/// adjacent runs like `*a* *b*` both match.
///
/// `pair` doubles the delimiter (`__` bold); `'\0'` means single.
fn emphasize(text: &str, delim: char, pair: char, tag: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let width = if pair == '\0' { 1 } else { 2 };
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let at_delim = |i: usize| {
        chars[i] == delim && (width == 1 || (i + 1 < chars.len() && chars[i + 1] == pair))
    };

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        // Earlier passes have already injected tags; their attribute
        // values (hrefs with underscores) must stay untouched.
        if chars[i] == '<' {
            while i < chars.len() {
                out.push(chars[i]);
                i += 1;
                if chars[i - 1] == '>' {
                    break;
                }
            }
            continue;
        }
        let open_ok = at_delim(i)
            && (i == 0 || (!is_word(chars[i - 1]) && chars[i - 1] != delim))
            && chars
                .get(i + width)
                .is_some_and(|&c| !c.is_whitespace() && c != delim);
        if open_ok {
            // Find a closing delimiter with a tight inner edge and a
            // non-word outer edge.
            let mut j = i + width + 1;
            let mut found = None;
            while j < chars.len() {
                let close_ok = at_delim(j)
                    && !chars[j - 1].is_whitespace()
                    && chars[j - 1] != delim
                    && chars.get(j + width).is_none_or(|&c| !is_word(c) && c != delim);
                if close_ok {
                    found = Some(j);
                    break;
                }
                j += 1;
            }
            if let Some(j) = found {
                out.push('<');
                out.push_str(tag);
                out.push('>');
                out.extend(&chars[i + width..j]);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
                i = j + width;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}
