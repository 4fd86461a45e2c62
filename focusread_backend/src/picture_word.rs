//! Meditative sentence and image pairs for the picture-word exercise.

use super::*;
use std::sync::Arc;
use std::time::Duration;
use chrono::offset::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::generation::{GenerationRequest, TextGenerator};

/// How long one pair stays on screen.
pub const PAIR_DISPLAY_MS: u64 = 3000;
pub const FALLBACK_PAIRS: usize = 20;
/// One hour of pairs. Longer sessions reuse them.
pub const MAX_REQUIRED_PAIRS: usize = 1200;
pub const FALLBACK_SENTENCE: &str = "The universe holds infinite mysteries waiting to be discovered.";
pub const FALLBACK_TERM: &str = "nature";
pub const STOCK_PHOTO_URL: &str = "https://images.pexels.com/photos/814499/pexels-photo-814499.jpeg";

const FALLBACK_SENTENCES: [&str; 5] = [
    "The mountain stands tall against the horizon.",
    "Waves crash against the shore with rhythmic persistence.",
    "The forest whispers secrets to those who listen.",
    "Stars twinkle like distant memories in the night sky.",
    "The desert stretches endlessly toward the horizon.",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub id: String,
    pub url: String,
    pub alt: String,
    pub photographer: String,
}

impl Image {
    pub fn stock(id: String) -> Self {
        Image {
            id,
            url: STOCK_PHOTO_URL.to_string(),
            alt: "peaceful nature".to_string(),
            photographer: "Pexels".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PicturePair {
    pub id: String,
    pub sentence: String,
    pub image: Image,
    pub search_term: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureWordContent {
    pub pairs: Vec<PicturePair>,
    pub total_generated: usize,
    pub session_duration: f64,
    pub theme: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

/// Finds a photo for a search term.
pub trait ImageSearch: Send + Sync {
    fn search(&self, term: &str) -> Result<Option<Image>>;
}

/// No photo provider: every pair shows the stock photo.
pub struct StockPhotoOnly;

impl ImageSearch for StockPhotoOnly {
    fn search(&self, _term: &str) -> Result<Option<Image>> {
        Ok(None)
    }
}

/// Pairs needed to fill `duration_secs`, one per display slot, capped at
/// `MAX_REQUIRED_PAIRS`.
pub fn required_pairs(duration_secs: f64) -> usize {
    if !(duration_secs > 0.0) {
        return 0;
    }
    (duration_secs * 1000.0 / PAIR_DISPLAY_MS as f64)
        .ceil()
        .min(MAX_REQUIRED_PAIRS as f64) as usize
}

/// Required pairs plus a 20% buffer, rounded up.
pub fn pairs_to_generate(required: usize) -> usize {
    required.saturating_mul(6).saturating_add(4) / 5
}

fn sentence_prompt(count: usize, theme: &str) -> String {
    format!(r#"{{"sentences": Generate {} unique, meditative sentences about {}.
    Each sentence should be:
    - 8-15 words long
    - Calming and contemplative
    - About natural elements, emotions, or peaceful concepts
    - Completely different from each other
    - Suitable for meditation practice

    Return as JSON array of strings only, no explanations:
    ["sentence1", "sentence2", ...]}}"#, count, theme)
}

fn search_term_prompt(count: usize) -> String {
    format!(r#"{{"searchTerms": Generate {} unique image search terms for peaceful, meditative images.
    Each term should be:
    - 1-3 words only
    - Related to nature, wellness, or tranquility
    - Suitable for finding calming stock photos
    - Completely different from each other

    Examples: "mountain lake", "forest path", "ocean waves", "sunset sky"

    Return as JSON array of strings:}}"#, count)
}

/// The strings under `key` in generated JSON. Malformed input gives none.
pub fn string_list(generated: &str, key: &str) -> Vec<String> {
    let parsed: Value = match serde_json::from_str(generated) {
        Ok(v) => v,
        Err(e) => {
            warn!("Generated {} aren't valid JSON: {}", key, e);
            return Vec::new();
        }
    };
    match parsed.get(key) {
        Some(&Value::Array(ref items)) => items.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn cyclic<T>(items: &[T], i: usize) -> Option<&T> {
    if items.is_empty() { None } else { items.get(i % items.len()) }
}

/// Zips the generated material into at most `count` pairs, reusing shorter
/// lists cyclically. No pairs unless there's at least one sentence or image.
pub fn assemble_pairs(count: usize, sentences: &[String], images: &[Image], terms: &[String], stamp: i64) -> Vec<PicturePair> {
    let available = sentences.len().max(images.len());

    (0..count.min(available))
        .map(|i| PicturePair {
            id: format!("pair_{}_{}", stamp, i),
            sentence: cyclic(sentences, i)
                .filter(|s| !s.is_empty())
                .map_or_else(|| FALLBACK_SENTENCE.to_string(), String::clone),
            image: cyclic(images, i)
                .cloned()
                .unwrap_or_else(|| Image::stock(format!("fallback_{}", i))),
            search_term: cyclic(terms, i)
                .filter(|s| !s.is_empty())
                .map_or_else(|| FALLBACK_TERM.to_string(), String::clone),
        })
        .collect()
}

pub fn fallback_content(duration_secs: f64, theme: &str) -> PictureWordContent {
    let pairs: Vec<PicturePair> = (0..FALLBACK_PAIRS)
        .map(|i| PicturePair {
            id: format!("fallback_{}", i),
            sentence: FALLBACK_SENTENCES[i % FALLBACK_SENTENCES.len()].to_string(),
            image: Image::stock(format!("fallback_img_{}", i)),
            search_term: FALLBACK_TERM.to_string(),
        })
        .collect();

    PictureWordContent {
        total_generated: pairs.len(),
        pairs,
        session_duration: duration_secs,
        theme: theme.to_string(),
        fallback: true,
    }
}

pub struct PictureWordGenerator<'a> {
    pub generator: &'a Arc<dyn TextGenerator>,
    pub images: &'a dyn ImageSearch,
    pub timeout: Duration,
}

impl<'a> PictureWordGenerator<'a> {
    fn ask(&self, system: &str, prompt: String, temperature: f32, max_tokens: u32) -> Result<String> {
        let request = GenerationRequest { system: system.to_string(), prompt, temperature, max_tokens };
        generation::generate_with_timeout(self.generator, request, self.timeout)
    }

    fn find_images(&self, terms: &[String], limit: usize, stamp: i64) -> Vec<Image> {
        let mut images = Vec::new();
        for (i, term) in terms.iter().take(limit).enumerate() {
            match self.images.search(term) {
                Ok(Some(found)) => images.push(Image {
                    id: format!("ai_{}_{}_{}", found.id, stamp, i),
                    alt: term.clone(),
                    ..found
                }),
                Ok(None) => (),
                Err(e) => warn!("Image search for {:?} failed: {}", term, e),
            }
        }
        images
    }

    /// Generates the pairs. Fails if a generation call fails or times out.
    pub fn generate(&self, duration_secs: f64, theme: &str) -> Result<PictureWordContent> {
        let count = pairs_to_generate(required_pairs(duration_secs));
        let stamp = Utc::now().timestamp_millis();
        info!("Generating {} picture-word pairs for a {}s session.", count, duration_secs);

        let sentences = string_list(&self.ask(
            "You generate diverse, meditative sentences for mindfulness practice. Return valid JSON only.",
            sentence_prompt(count, theme), 0.8, 1000)?, "sentences");

        let terms = string_list(&self.ask(
            "You generate diverse search terms for peaceful stock photos. Return valid JSON only.",
            search_term_prompt(count), 0.9, 500)?, "searchTerms");

        let images = self.find_images(&terms, count, stamp);
        let pairs = assemble_pairs(count, &sentences, &images, &terms, stamp);

        Ok(PictureWordContent {
            total_generated: pairs.len(),
            pairs,
            session_duration: duration_secs,
            theme: theme.to_string(),
            fallback: false,
        })
    }
}

fn store_pairs(conn: &PgConnection, user_id: i32, content: &PictureWordContent) -> Result<()> {
    use crate::schema::session_content;

    let session_key = format!("session_{}_{}", Utc::now().timestamp_millis(), user_id);
    let record = NewSessionContent {
        user_id,
        session_key: &session_key,
        content_type: "picture_word_pairs",
        content_data: serde_json::to_value(&content.pairs)?,
        duration: content.session_duration.round() as i32,
    };

    diesel::insert_into(session_content::table)
        .values(&record)
        .execute(conn)
        .chain_err(|| "Couldn't store the session content!")?;
    Ok(())
}

/// Generates and stores the pairs for a session. Any generation failure
/// gives the fixed fallback content instead; storing is best-effort.
pub fn generate_picture_word_content(conn: Option<&PgConnection>,
                                     services: &Services,
                                     duration_secs: f64,
                                     theme: &str,
                                     user_id: i32)
                                     -> PictureWordContent {
    let generator = PictureWordGenerator {
        generator: &services.generator,
        images: &*services.images,
        timeout: services.generation_timeout,
    };

    let content = match generator.generate(duration_secs, theme) {
        Ok(content) => content,
        Err(e) => {
            warn!("Picture-word generation failed, serving the fallback: {}", e);
            return fallback_content(duration_secs, theme);
        }
    };

    match conn {
        Some(conn) => if let Err(e) = store_pairs(conn, user_id, &content) {
            error!("{}", e);
        },
        None => warn!("No database connection; the pairs for user {} aren't stored.", user_id),
    }
    content
}

#[cfg(test)]
fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_pair_counts() {
    assert_eq!(required_pairs(60.0), 20);
    assert_eq!(required_pairs(61.0), 21);
    assert_eq!(required_pairs(1.0), 1);
    assert_eq!(required_pairs(0.0), 0);
    assert_eq!(pairs_to_generate(20), 24);
    assert_eq!(pairs_to_generate(21), 26);
    assert_eq!(pairs_to_generate(5), 6);
    assert_eq!(pairs_to_generate(1), 2);
    assert_eq!(pairs_to_generate(0), 0);
}

#[test]
fn test_pair_counts_for_huge_durations() {
    assert_eq!(required_pairs(1e300), MAX_REQUIRED_PAIRS);
    assert_eq!(required_pairs(std::f64::INFINITY), MAX_REQUIRED_PAIRS);
    assert_eq!(required_pairs(std::f64::NAN), 0);
    assert_eq!(required_pairs(3600.0), MAX_REQUIRED_PAIRS);
    assert_eq!(pairs_to_generate(required_pairs(1e300)), 1440);
    assert_eq!(pairs_to_generate(usize::max_value()), usize::max_value() / 5);
}

#[test]
fn test_string_list() {
    assert_eq!(string_list(r#"{"sentences":["a","b",3]}"#, "sentences"), strings(&["a", "b"]));
    assert!(string_list(r#"{"sentences":"a"}"#, "sentences").is_empty());
    assert!(string_list("nope", "sentences").is_empty());
}

#[test]
fn test_assemble_reuses_cyclically() {
    let sentences = strings(&["one", "two", "three"]);
    let terms = strings(&["lake"]);
    let images = vec![Image::stock("img".into())];

    let pairs = assemble_pairs(5, &sentences, &images, &terms, 42);
    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0].id, "pair_42_0");
    assert_eq!(pairs[2].sentence, "three");
    assert_eq!(pairs[2].search_term, "lake");
    assert_eq!(pairs[2].image.id, "img");

    let pairs = assemble_pairs(2, &sentences, &[], &[], 1);
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[1].image, Image::stock("fallback_1".into()));
    assert_eq!(pairs[1].search_term, FALLBACK_TERM);

    assert!(assemble_pairs(10, &[], &[], &terms, 1).is_empty());

    let blank = strings(&[""]);
    let pairs = assemble_pairs(1, &blank, &[], &[], 1);
    assert_eq!(pairs[0].sentence, FALLBACK_SENTENCE);
}

#[test]
fn test_fallback_content() {
    let content = fallback_content(45.0, "ocean");
    assert_eq!(content.pairs.len(), FALLBACK_PAIRS);
    assert_eq!(content.total_generated, FALLBACK_PAIRS);
    assert_eq!(content.pairs[6].sentence, FALLBACK_SENTENCES[1]);
    assert_eq!(content.pairs[6].image.id, "fallback_img_6");
    assert!(content.fallback);

    let json = serde_json::to_value(&content).unwrap();
    assert_eq!(json["fallback"], true);
    assert_eq!(json["sessionDuration"], 45.0);
}

#[test]
fn test_generate_with_scripted_service() {
    use crate::generation::mock::Scripted;

    struct Found;
    impl ImageSearch for Found {
        fn search(&self, term: &str) -> Result<Option<Image>> {
            if term == "missing" {
                return Ok(None);
            }
            Ok(Some(Image { id: "77".into(), url: format!("https://img/{}", term), alt: String::new(), photographer: "P".into() }))
        }
    }

    let scripted = Scripted::replying(r#"{"sentences":["s1","s2"],"searchTerms":["lake","missing","forest"]}"#);
    let generator: Arc<dyn TextGenerator> = scripted.clone();
    let pw = PictureWordGenerator { generator: &generator, images: &Found, timeout: Duration::from_secs(5) };

    let content = pw.generate(9.0, "nature").unwrap();
    assert_eq!(scripted.calls(), 2);
    assert!(!content.fallback);
    assert_eq!(content.total_generated, 2);
    assert_eq!(content.pairs[0].image.alt, "lake");
    assert_eq!(content.pairs[1].image.url, "https://img/forest");
    assert!(content.pairs[1].image.id.starts_with("ai_77_"));
    assert!(content.pairs[1].image.id.ends_with("_2"));
    assert_eq!(content.pairs[1].search_term, "missing");

    let json = serde_json::to_value(&content).unwrap();
    assert!(json.get("fallback").is_none());
}

#[test]
fn test_generate_fails_with_service() {
    use crate::generation::mock::Scripted;

    let generator: Arc<dyn TextGenerator> = Scripted::failing("down");
    let pw = PictureWordGenerator { generator: &generator, images: &StockPhotoOnly, timeout: Duration::from_secs(5) };
    assert!(pw.generate(30.0, "nature").is_err());
}
