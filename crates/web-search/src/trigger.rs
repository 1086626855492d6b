//! Lexical trigger for search augmentation.

/// Recency and lookup keywords. Matching is a case-insensitive substring test, so this is a
/// heuristic: false positives and negatives are accepted.
pub const TRIGGER_KEYWORDS: &[&str] = &[
    "検索",
    "調べて",
    "最新",
    "今日",
    "ニュース",
    "天気",
    "誰",
    "どこ",
    "いつ",
    "何",
    "search",
    "latest",
    "today",
    "news",
    "weather",
    "who",
    "where",
    "when",
    "what",
];

/// True if `user_message` contains any trigger keyword.
pub fn needs_augmentation(user_message: &str) -> bool {
    let lowered = user_message.to_lowercase();
    TRIGGER_KEYWORDS.iter().any(|k| lowered.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_does_not_trigger() {
        assert!(!needs_augmentation("こんにちは"));
        assert!(!needs_augmentation("ありがとう、元気です"));
        assert!(!needs_augmentation(""));
    }

    #[test]
    fn test_keywords_trigger() {
        assert!(needs_augmentation("今日の天気を教えて"));
        assert!(needs_augmentation("最新のニュースは？"));
        assert!(needs_augmentation("What is Rust?"));
        assert!(needs_augmentation("LATEST release notes"));
    }

    #[test]
    fn test_independent_of_length() {
        let long_plain = "あ".repeat(10_000);
        assert!(!needs_augmentation(&long_plain));

        let long_with_keyword = format!("{}検索{}", long_plain, long_plain);
        assert!(needs_augmentation(&long_with_keyword));
    }
}
