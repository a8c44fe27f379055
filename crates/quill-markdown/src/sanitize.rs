//! HTML sanitization pass, last in the pipeline.
//!
//! Two modes. `Allowlist` scans tags and keeps only known-safe ones with
//! scrubbed attributes; anything else is escaped so it displays as text.
//! `Strip` is the degraded fallback for when the allowlist pass is
//! unavailable: a handful of conservative regex removals that still
//! guarantee no script elements, event handlers, or script URIs survive.

use std::sync::OnceLock;

use regex::Regex;

/// Tags the allowlist scanner will keep.
const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "em", "strong", "del", "code", "pre",
    "blockquote", "ul", "ol", "li", "table", "thead", "tbody", "tr", "th", "td", "a", "img",
    "span", "div", "input",
];

/// Attributes kept on allowed tags. Everything else is dropped.
const ALLOWED_ATTRS: &[&str] = &[
    "href",
    "src",
    "alt",
    "id",
    "class",
    "start",
    "type",
    "checked",
    "disabled",
    "data-formula",
    "data-source-line",
    "data-language",
];

/// Sanitization strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Sanitizer {
    /// Tag/attribute allowlist scan (normal path).
    #[default]
    Allowlist,
    /// Conservative regex strip (degraded but still safe).
    Strip,
}

impl Sanitizer {
    /// Sanitize an HTML fragment according to the strategy.
    ///
    /// The conservative strip pass runs in both modes: even inert text
    /// content must not carry `on*=` or script-URI substrings.
    pub fn sanitize(&self, html: &str) -> String {
        match self {
            Sanitizer::Allowlist => sanitize_strip(&sanitize_allowlist(html)),
            Sanitizer::Strip => sanitize_strip(html),
        }
    }
}

/// Keep only allowed tags with scrubbed attributes; escape the rest so
/// they display as text.
fn sanitize_allowlist(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let tag_text = &rest[lt..];
        match tag_text.find('>') {
            Some(gt) => match rebuild_tag(&tag_text[1..gt]) {
                Some(rebuilt) => {
                    out.push_str(&rebuilt);
                    rest = &tag_text[gt + 1..];
                }
                None => {
                    out.push_str("&lt;");
                    rest = &tag_text[1..];
                }
            },
            None => {
                // Unterminated `<` at end of input.
                out.push_str("&lt;");
                rest = &tag_text[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Rebuild a tag body from scratch, keeping only allowed attributes.
/// Returns `None` if the tag itself is not allowed.
fn rebuild_tag(raw: &str) -> Option<String> {
    let body = raw.trim();
    let (closing, body) = match body.strip_prefix('/') {
        Some(rest) => (true, rest.trim()),
        None => (false, body),
    };
    let name_len = body
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(body.len());
    let name = body[..name_len].to_ascii_lowercase();
    if !ALLOWED_TAGS.contains(&name.as_str()) {
        return None;
    }
    if closing {
        return Some(format!("</{name}>"));
    }

    let mut rebuilt = format!("<{name}");
    for (key, value) in parse_attrs(&body[name_len..]) {
        let key_lower = key.to_ascii_lowercase();
        if !ALLOWED_ATTRS.contains(&key_lower.as_str()) {
            continue;
        }
        match value {
            Some(v) => {
                if (key_lower == "href" || key_lower == "src") && is_script_uri(&v) {
                    continue;
                }
                rebuilt.push_str(&format!(r#" {key_lower}="{v}""#));
            }
            None => rebuilt.push_str(&format!(" {key_lower}")),
        }
    }
    rebuilt.push('>');
    Some(rebuilt)
}

/// Minimal attribute tokenizer: `key`, `key=value`, `key="value"`.
fn parse_attrs(mut s: &str) -> Vec<(String, Option<String>)> {
    let mut attrs = Vec::new();
    loop {
        s = s.trim_start();
        if s.is_empty() || s == "/" {
            break;
        }
        let key_end = s
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(s.len());
        let key = s[..key_end].to_string();
        s = &s[key_end..];
        if let Some(rest) = s.trim_start().strip_prefix('=') {
            let rest = rest.trim_start();
            let (value, remainder) = if let Some(quoted) = rest.strip_prefix('"') {
                match quoted.find('"') {
                    Some(end) => (quoted[..end].to_string(), &quoted[end + 1..]),
                    None => (quoted.to_string(), ""),
                }
            } else {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '/')
                    .unwrap_or(rest.len());
                (rest[..end].to_string(), &rest[end..])
            };
            attrs.push((key, Some(value)));
            s = remainder;
        } else if !key.is_empty() {
            attrs.push((key, None));
        } else {
            s = &s[1..];
        }
    }
    attrs
}

fn is_script_uri(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:")
        || compact.starts_with("vbscript:")
        || compact.starts_with("data:")
}

fn strip_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap(),
            Regex::new(r"(?is)<script\b[^>]*>?").unwrap(),
            Regex::new(r#"(?i)\bon\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap(),
        ]
    })
}

/// Degraded fallback: strip script elements, event-handler attributes,
/// and script URIs without parsing tags.
fn sanitize_strip(html: &str) -> String {
    let [script_pair, script_open, handler] = strip_patterns();
    let text = script_pair.replace_all(html, "");
    let text = script_open.replace_all(&text, "");
    let text = handler.replace_all(&text, "");
    let mut text = text.into_owned();
    // Case-insensitive removal without regex alternation over schemes.
    for scheme in ["javascript:", "vbscript:"] {
        loop {
            let lower = text.to_ascii_lowercase();
            match lower.find(scheme) {
                Some(pos) => text.replace_range(pos..pos + scheme.len(), "blocked:"),
                None => break,
            }
        }
    }
    text
}
