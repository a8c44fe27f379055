//! Heading slugs for anchor ids.

/// Derive a URL-safe id from heading text.
///
/// Lowercase, strip everything but word chars/spaces/hyphens, collapse
/// whitespace/underscore/hyphen runs to a single hyphen, trim hyphens.
/// Duplicate slugs across headings are intentionally not de-duplicated;
/// anchor navigation targets the first match.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|&c| c.is_alphanumeric() || c == '_' || c.is_whitespace() || c == '-')
        .collect();

    let mut out = String::with_capacity(kept.len());
    let mut pending_hyphen = false;
    for c in kept.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            pending_hyphen = !out.is_empty();
        } else {
            if pending_hyphen {
                out.push('-');
                pending_hyphen = false;
            }
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slug() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
    }

    #[test]
    fn test_collapses_runs() {
        assert_eq!(slugify("a  -  _ b"), "a-b");
    }

    #[test]
    fn test_trims_edges() {
        assert_eq!(slugify("  --spaced--  "), "spaced");
    }

    #[test]
    fn test_unicode_kept() {
        assert_eq!(slugify("Überschrift Zwei"), "überschrift-zwei");
    }

    #[test]
    fn test_empty_and_symbolic() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
