//! Whitespace tokenization shared by the reading and generation code.
//!
//! A "word" is a maximal run of non-whitespace characters; word offsets are
//! zero-based indices into that token sequence.

use unicode_normalization::UnicodeNormalization;

pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// The tokens from `position` onwards, joined with single spaces.
pub fn words_from(text: &str, position: usize) -> String {
    text.split_whitespace()
        .skip(position)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reading time in whole minutes at 200 words per minute, rounded up.
pub fn estimated_minutes(word_count: usize) -> usize {
    (word_count + 199) / 200
}

pub fn nfc(text: &str) -> String {
    text.nfc().collect()
}

/// Keeps at most `max_chars` characters, taken from the middle of the text.
pub fn clip_centered(text: &str, max_chars: usize) -> String {
    let len = text.chars().count();
    if len <= max_chars {
        return text.to_string();
    }
    let start = (len - max_chars) / 2;
    text.chars().skip(start).take(max_chars).collect()
}

#[test]
fn test_words_collapse_whitespace_runs() {
    assert_eq!(words("  one\ttwo \n\n three  "), vec!["one", "two", "three"]);
    assert_eq!(word_count(""), 0);
    assert_eq!(word_count("   \n "), 0);
    assert_eq!(word_count("a b  c"), 3);
}

#[test]
fn test_words_from_offset() {
    let text = "zero one  two\nthree four";
    assert_eq!(words_from(text, 0), "zero one two three four");
    assert_eq!(words_from(text, 3), "three four");
    assert_eq!(words_from(text, 5), "");
    assert_eq!(words_from(text, 50), "");
}

#[test]
fn test_estimated_minutes_rounds_up() {
    assert_eq!(estimated_minutes(0), 0);
    assert_eq!(estimated_minutes(1), 1);
    assert_eq!(estimated_minutes(200), 1);
    assert_eq!(estimated_minutes(201), 2);
}

#[test]
fn test_clip_keeps_middle() {
    assert_eq!(clip_centered("short", 10), "short");
    assert_eq!(clip_centered("abcdefghij", 4), "defg");
    assert_eq!(clip_centered("abcdefghijk", 4), "defg");
    assert_eq!(clip_centered("ääöö", 2), "äö");
}

#[test]
fn test_nfc_composes() {
    assert_eq!(nfc("e\u{301}"), "\u{e9}");
}
