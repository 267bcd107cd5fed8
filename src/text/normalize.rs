use std::sync::OnceLock;

use regex::Regex;

fn url() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid url pattern"))
}

fn mention() -> &'static Regex {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    MENTION.get_or_init(|| Regex::new(r"\B@\w+").expect("valid mention pattern"))
}

fn hashtag() -> &'static Regex {
    static HASHTAG: OnceLock<Regex> = OnceLock::new();
    HASHTAG.get_or_init(|| Regex::new(r"#(\w+)").expect("valid hashtag pattern"))
}

/// Normalize a raw tweet: links become `http`, mentions become `@user`, hashtags lose the
/// leading `#`, and runs of whitespace collapse to a single space. An `@` inside a word, as
/// in an email address, is not a mention.
pub fn normalize_text(text: &str) -> String {
    let text = url().replace_all(text, "http");
    let text = mention().replace_all(&text, "@user");
    let text = hashtag().replace_all(&text, "$1");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
