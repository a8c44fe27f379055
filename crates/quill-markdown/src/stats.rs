//! Word and character counts over raw markdown.

use std::sync::OnceLock;

use regex::Regex;

struct StatRules {
    fence: Regex,
    inline_code: Regex,
    image: Regex,
    link: Regex,
    punctuation: Regex,
}

fn rules() -> &'static StatRules {
    static RULES: OnceLock<StatRules> = OnceLock::new();
    RULES.get_or_init(|| StatRules {
        fence: Regex::new(r"(?s)```.*?```").unwrap(),
        inline_code: Regex::new(r"`[^`]*`").unwrap(),
        // Strip image syntax entirely, keep only link text for links.
        image: Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap(),
        link: Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap(),
        punctuation: Regex::new(r"[#>*_~|\-=\[\]()`$:]+").unwrap(),
    })
}

/// Count words: markdown syntax is stripped first so fences, code spans,
/// and link targets do not inflate the count. Link text is kept.
pub fn word_count(markdown: &str) -> usize {
    let r = rules();
    let text = r.fence.replace_all(markdown, " ");
    let text = r.inline_code.replace_all(&text, " ");
    let text = r.image.replace_all(&text, " ");
    let text = r.link.replace_all(&text, "$1");
    let text = r.punctuation.replace_all(&text, " ");
    text.split_whitespace().count()
}

/// Raw character count (Unicode scalar values).
pub fn char_count(markdown: &str) -> usize {
    markdown.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(word_count("one two three"), 3);
    }

    #[test]
    fn test_fences_excluded() {
        assert_eq!(word_count("before\n```\nlet x = 1;\n```\nafter"), 2);
    }

    #[test]
    fn test_inline_code_excluded() {
        assert_eq!(word_count("run `cargo test` now"), 2);
    }

    #[test]
    fn test_link_text_kept() {
        assert_eq!(word_count("[two words](https://example.com/very/long)"), 2);
    }

    #[test]
    fn test_image_stripped() {
        assert_eq!(word_count("![alt text](img.png) word"), 1);
    }

    #[test]
    fn test_markdown_punctuation_stripped() {
        assert_eq!(word_count("# Heading\n> quote **bold**"), 3);
    }

    #[test]
    fn test_char_count_raw() {
        assert_eq!(char_count("ab\n"), 3);
        assert_eq!(char_count("héllo"), 5);
    }
}
