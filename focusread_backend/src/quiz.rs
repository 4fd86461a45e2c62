//! Multiple-choice questions generated from a reading excerpt, memoized for a
//! few minutes per distinct (clipped) excerpt.
//!
//! Nothing here fails towards the caller: an unusable excerpt, a generation
//! error or a timeout all come back as an empty list.

use std::sync::Arc;
use std::time::Duration;
use crypto::digest::Digest;
use crypto::sha1::Sha1;
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::errors::*;
use crate::generation::{self, GenerationRequest, TextGenerator};
use crate::helpers::{Cache, Clock, SystemClock};
use crate::text;

pub const EXCERPT_CHARS: usize = 1200;
pub const MAX_ITEMS: usize = 8;
pub const MAX_OPTIONS: usize = 4;
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

const KEY_VERSION: &str = "v1|";

const QUIZ_SYSTEM: &str =
    "You generate 8 SAT-style MCQs strictly answerable from the excerpt. No explanations.";

fn quiz_prompt(excerpt: &str) -> String {
    format!(r#"EXCERPT:
"""{}"""

Make exactly 8 MCQs: 4 memorization + 4 comprehension.
Return JSON only:
{{"items":[{{"question":"...","options":["A","B","C","D"],"correctAnswer":0,"category":"memorization|comprehension"}}]}}"#,
            excerpt)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizCategory {
    Memorization,
    Comprehension,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: u8,
    pub category: QuizCategory,
}

/// Hex SHA-1 over the key version and the clipped excerpt.
pub fn cache_key(clipped: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.input_str(KEY_VERSION);
    hasher.input_str(clipped);
    hasher.result_str()
}

/// Normalizes an excerpt into what gets hashed and sent: NFC, then the
/// centered window. `None` for blank input.
pub fn prepare_excerpt(excerpt: &str) -> Option<String> {
    if excerpt.trim().is_empty() {
        return None;
    }
    Some(text::clip_centered(&text::nfc(excerpt), EXCERPT_CHARS))
}

fn display_value(v: &Value) -> String {
    match *v {
        Value::String(ref s) => s.clone(),
        Value::Null => String::new(),
        ref other => other.to_string(),
    }
}

fn answer_index(v: Option<&Value>) -> u8 {
    let n = match v {
        Some(&Value::Number(ref n)) => n.as_f64().unwrap_or(0.0),
        Some(&Value::String(ref s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_nan() {
        return 0;
    }
    n.max(0.0).min((MAX_OPTIONS - 1) as f64) as u8
}

fn clean_item(item: &Value) -> QuizQuestion {
    let options = match item.get("options") {
        Some(&Value::Array(ref opts)) => opts.iter().take(MAX_OPTIONS).map(display_value).collect(),
        _ => Vec::new(),
    };
    let category = match item.get("category").and_then(Value::as_str) {
        Some("memorization") => QuizCategory::Memorization,
        _ => QuizCategory::Comprehension,
    };

    QuizQuestion {
        question: item.get("question").map(display_value).unwrap_or_default().trim().to_string(),
        options,
        correct_answer: answer_index(item.get("correctAnswer")),
        category,
    }
}

/// Reads the `items` array out of generated text. Anything malformed yields
/// no items.
pub fn parse_items(generated: &str) -> Vec<QuizQuestion> {
    let parsed: Value = match serde_json::from_str(generated) {
        Ok(v) => v,
        Err(e) => {
            warn!("Generated quiz isn't valid JSON: {}", e);
            return Vec::new();
        }
    };
    match parsed.get("items") {
        Some(&Value::Array(ref items)) => items.iter().take(MAX_ITEMS).map(clean_item).collect(),
        _ => Vec::new(),
    }
}

pub struct QuizGenerator<C: Clock = SystemClock> {
    cache: Cache<String, Vec<QuizQuestion>, C>,
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl QuizGenerator<SystemClock> {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        QuizGenerator::with_clock(generator, timeout, SystemClock)
    }
}

impl<C: Clock> QuizGenerator<C> {
    pub fn with_clock(generator: Arc<dyn TextGenerator>, timeout: Duration, clock: C) -> Self {
        QuizGenerator {
            cache: Cache::with_clock(CACHE_TTL, clock),
            generator,
            timeout,
        }
    }

    /// Returns the questions for an excerpt. Never fails; an empty list means
    /// nothing could be generated.
    pub fn get_or_generate(&self, excerpt: &str) -> Vec<QuizQuestion> {
        match self.try_get_or_generate(excerpt) {
            Ok(items) => items,
            Err(e) => {
                warn!("Quiz generation failed: {}", e);
                Vec::new()
            }
        }
    }

    fn try_get_or_generate(&self, excerpt: &str) -> Result<Vec<QuizQuestion>> {
        let clipped = match prepare_excerpt(excerpt) {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };
        let key = cache_key(&clipped);

        if let Some(items) = self.cache.get(&key)? {
            debug!("Quiz cache hit for {}.", key);
            return Ok(items);
        }
        debug!("Quiz cache miss for {}.", key);

        let (left, removed) = self.cache.clean_expired()?;
        if removed > 0 {
            debug!("Dropped {} expired quizzes, {} left.", removed, left);
        }

        let request = GenerationRequest {
            system: QUIZ_SYSTEM.to_string(),
            prompt: quiz_prompt(&clipped),
            temperature: 0.0,
            max_tokens: 500,
        };
        let generated = generation::generate_with_timeout(&self.generator, request, self.timeout)?;

        let items = parse_items(&generated);
        self.cache.insert(key, items.clone())?;
        Ok(items)
    }
}

#[cfg(test)]
const SAMPLE_REPLY: &str = r#"{"items":[
    {"question":"  What color was the fox? ","options":["Red","Brown","Gray","White","Black"],"correctAnswer":1,"category":"memorization"},
    {"question":"Why did it jump?","options":["To play",7],"correctAnswer":9,"category":"inference"},
    {"question":null,"correctAnswer":"2"},
    {"question":"Q","options":[],"correctAnswer":-3,"category":"comprehension"}
]}"#;

#[test]
fn test_cache_key_is_versioned_sha1() {
    assert_eq!(cache_key("The quick brown fox"), "8e9d07e95a1783651feb64a922a9643701af5e9e");
    assert_ne!(cache_key("a"), cache_key("b"));
}

#[test]
fn test_prepare_excerpt() {
    assert_eq!(prepare_excerpt(""), None);
    assert_eq!(prepare_excerpt(" \n\t"), None);
    assert_eq!(prepare_excerpt("short text").as_ref().map(String::as_str), Some("short text"));

    let long: String = (0..3000).map(|i| if i < 900 || i >= 2100 { 'x' } else { 'm' }).collect();
    let clipped = prepare_excerpt(&long).unwrap();
    assert_eq!(clipped.chars().count(), EXCERPT_CHARS);
    assert!(clipped.chars().all(|c| c == 'm'));
}

#[test]
fn test_parse_items_cleans_each_item() {
    let items = parse_items(SAMPLE_REPLY);
    assert_eq!(items.len(), 4);

    assert_eq!(items[0].question, "What color was the fox?");
    assert_eq!(items[0].options, vec!["Red", "Brown", "Gray", "White"]);
    assert_eq!(items[0].correct_answer, 1);
    assert_eq!(items[0].category, QuizCategory::Memorization);

    assert_eq!(items[1].options, vec!["To play", "7"]);
    assert_eq!(items[1].correct_answer, 3);
    assert_eq!(items[1].category, QuizCategory::Comprehension);

    assert_eq!(items[2].question, "");
    assert!(items[2].options.is_empty());
    assert_eq!(items[2].correct_answer, 2);

    assert_eq!(items[3].correct_answer, 0);
}

#[test]
fn test_parse_items_tolerates_garbage() {
    assert!(parse_items("not json").is_empty());
    assert!(parse_items("{}").is_empty());
    assert!(parse_items(r#"{"items":"nope"}"#).is_empty());

    let many = format!(r#"{{"items":[{}]}}"#, vec![r#"{"question":"q"}"#; 12].join(","));
    assert_eq!(parse_items(&many).len(), MAX_ITEMS);
}

#[test]
fn test_question_json_shape() {
    let q = &parse_items(SAMPLE_REPLY)[0];
    let json = serde_json::to_value(q).unwrap();
    assert_eq!(json["correctAnswer"], 1);
    assert_eq!(json["category"], "memorization");
}

#[test]
fn test_blank_excerpt_skips_generation() {
    use crate::generation::mock::Scripted;

    let scripted = Scripted::replying(SAMPLE_REPLY);
    let quizzes = QuizGenerator::new(scripted.clone(), Duration::from_secs(5));
    assert!(quizzes.get_or_generate("").is_empty());
    assert!(quizzes.get_or_generate("   ").is_empty());
    assert_eq!(scripted.calls(), 0);
}

#[test]
fn test_generates_once_within_ttl() {
    use crate::generation::mock::Scripted;
    use crate::helpers::ManualClock;

    let clock = ManualClock::new();
    let scripted = Scripted::replying(SAMPLE_REPLY);
    let quizzes = QuizGenerator::with_clock(scripted.clone(), Duration::from_secs(5), &clock);

    let first = quizzes.get_or_generate("The quick brown fox jumps over the lazy dog.");
    assert_eq!(first.len(), 4);

    clock.advance(Duration::from_secs(299));
    let second = quizzes.get_or_generate("The quick brown fox jumps over the lazy dog.");
    assert_eq!(first, second);
    assert_eq!(scripted.calls(), 1);

    clock.advance(Duration::from_secs(1));
    let third = quizzes.get_or_generate("The quick brown fox jumps over the lazy dog.");
    assert_eq!(third, first);
    assert_eq!(scripted.calls(), 2);

    quizzes.get_or_generate("A different excerpt.");
    assert_eq!(scripted.calls(), 3);
}

#[test]
fn test_failures_return_empty_and_are_not_cached() {
    use crate::generation::mock::Scripted;

    let failing = Scripted::failing("service down");
    let quizzes = QuizGenerator::new(failing.clone(), Duration::from_secs(5));
    assert!(quizzes.get_or_generate("Some excerpt").is_empty());
    assert!(quizzes.get_or_generate("Some excerpt").is_empty());
    assert_eq!(failing.calls(), 2);

    let slow = Scripted::slow(SAMPLE_REPLY, Duration::from_millis(300));
    let quizzes = QuizGenerator::new(slow.clone(), Duration::from_millis(10));
    assert!(quizzes.get_or_generate("Some excerpt").is_empty());
    assert!(quizzes.get_or_generate("Some excerpt").is_empty());
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(slow.calls(), 2);
}

#[test]
fn test_unparseable_reply_is_cached_as_empty() {
    use crate::generation::mock::Scripted;

    let scripted = Scripted::replying("I'm sorry, I can't do that.");
    let quizzes = QuizGenerator::new(scripted.clone(), Duration::from_secs(5));
    assert!(quizzes.get_or_generate("Some excerpt").is_empty());
    assert!(quizzes.get_or_generate("Some excerpt").is_empty());
    assert_eq!(scripted.calls(), 1);
}
