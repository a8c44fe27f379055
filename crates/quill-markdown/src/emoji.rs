//! Shortcode-to-glyph emoji table.
//!
//! A fixed constant table, owned by the crate rather than any mutable
//! global. Unknown names are left for the caller to pass through.

/// The supported `:name:` shortcodes.
pub const EMOJI: &[(&str, &str)] = &[
    ("smile", "😄"),
    ("grin", "😁"),
    ("joy", "😂"),
    ("wink", "😉"),
    ("blush", "😊"),
    ("heart_eyes", "😍"),
    ("thinking", "🤔"),
    ("neutral_face", "😐"),
    ("sweat_smile", "😅"),
    ("cry", "😢"),
    ("sob", "😭"),
    ("angry", "😠"),
    ("scream", "😱"),
    ("sleeping", "😴"),
    ("sunglasses", "😎"),
    ("thumbsup", "👍"),
    ("+1", "👍"),
    ("thumbsdown", "👎"),
    ("-1", "👎"),
    ("ok_hand", "👌"),
    ("clap", "👏"),
    ("wave", "👋"),
    ("pray", "🙏"),
    ("muscle", "💪"),
    ("point_right", "👉"),
    ("point_left", "👈"),
    ("eyes", "👀"),
    ("heart", "❤️"),
    ("broken_heart", "💔"),
    ("star", "⭐"),
    ("sparkles", "✨"),
    ("fire", "🔥"),
    ("boom", "💥"),
    ("zap", "⚡"),
    ("sun", "☀️"),
    ("moon", "🌙"),
    ("cloud", "☁️"),
    ("rainbow", "🌈"),
    ("rocket", "🚀"),
    ("airplane", "✈️"),
    ("car", "🚗"),
    ("bike", "🚲"),
    ("check", "✅"),
    ("white_check_mark", "✅"),
    ("x", "❌"),
    ("warning", "⚠️"),
    ("question", "❓"),
    ("exclamation", "❗"),
    ("bulb", "💡"),
    ("book", "📖"),
    ("books", "📚"),
    ("memo", "📝"),
    ("pencil", "✏️"),
    ("paperclip", "📎"),
    ("folder", "📁"),
    ("calendar", "📅"),
    ("clock", "🕐"),
    ("hourglass", "⏳"),
    ("lock", "🔒"),
    ("unlock", "🔓"),
    ("key", "🔑"),
    ("mag", "🔍"),
    ("bell", "🔔"),
    ("link", "🔗"),
    ("hammer", "🔨"),
    ("wrench", "🔧"),
    ("gear", "⚙️"),
    ("bug", "🐛"),
    ("ant", "🐜"),
    ("cat", "🐱"),
    ("dog", "🐶"),
    ("coffee", "☕"),
    ("tea", "🍵"),
    ("pizza", "🍕"),
    ("cake", "🍰"),
    ("tada", "🎉"),
    ("gift", "🎁"),
    ("trophy", "🏆"),
    ("computer", "💻"),
    ("phone", "📱"),
    ("email", "📧"),
    ("inbox", "📥"),
    ("outbox", "📤"),
    ("chart", "📊"),
    ("money", "💰"),
    ("gem", "💎"),
    ("100", "💯"),
];

/// Look up a shortcode. Returns `None` for unknown names.
pub fn emoji_glyph(name: &str) -> Option<&'static str> {
    EMOJI
        .iter()
        .find(|(code, _)| *code == name)
        .map(|(_, glyph)| *glyph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_shortcodes() {
        assert_eq!(emoji_glyph("smile"), Some("😄"));
        assert_eq!(emoji_glyph("+1"), Some("👍"));
        assert_eq!(emoji_glyph("100"), Some("💯"));
    }

    #[test]
    fn test_unknown_shortcode() {
        assert_eq!(emoji_glyph("definitely_not_real"), None);
    }

    #[test]
    fn test_no_duplicate_codes() {
        let mut codes: Vec<&str> = EMOJI.iter().map(|(c, _)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), EMOJI.len());
    }
}
