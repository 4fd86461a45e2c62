//! The gamification engine: XP, levels and day streaks, plus the reading
//! offsets that library exercises report along with their completion.
//!
//! The arithmetic lives in pure functions over `ProgressValues` so that it can
//! be checked without a database; `record_exercise_completion` wires it to the
//! `user_progress` and `reading_progress` tables. The writes are not wrapped in
//! a transaction: a failure after the reading upsert leaves the XP untouched.

use super::*;
use std::convert::TryFrom;
use chrono::{DateTime, offset::Utc};
use serde::Deserialize;
use serde_json::Value;

/// XP needed for the first level-up; also the `max_xp` of a fresh progress row.
pub const FIRST_LEVEL_XP: i32 = 100;

/// Which streak the `highest_streak` maximum is taken against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighestStreakRule {
    /// `max(highest, new streak)`. Keeps `highest_streak >= streak_count`.
    AfterUpdate,
    /// `max(highest, streak before this completion)`. Lags one completion behind.
    BeforeUpdate,
}

impl Default for HighestStreakRule {
    fn default() -> Self {
        HighestStreakRule::AfterUpdate
    }
}

/// `floor(sqrt(xp / 100)) + 1`
pub fn level_for_xp(xp: i32) -> i32 {
    let hundreds = i64::from(xp.max(0)) / 100;
    let mut root = (hundreds as f64).sqrt() as i64;
    while root * root > hundreds {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= hundreds {
        root += 1;
    }
    root as i32 + 1
}

pub fn max_xp_for_level(level: i32) -> i32 {
    level.saturating_mul(level).saturating_mul(FIRST_LEVEL_XP)
}

fn same_day(a: &DateTime<Utc>, b: &DateTime<Utc>) -> bool {
    a.naive_utc().date() == b.naive_utc().date()
}

impl<'a> From<&'a UserProgress> for ProgressValues {
    fn from(p: &'a UserProgress) -> Self {
        ProgressValues {
            user_id: p.user_id,
            level: p.level,
            xp: p.xp,
            max_xp: p.max_xp,
            streak_count: p.streak_count,
            last_streak_update: p.last_streak_update,
            total_points: p.total_points,
            highest_streak: p.highest_streak,
        }
    }
}

/// The row created by a user's first completed exercise.
pub fn first_completion(user_id: i32, xp_reward: i32, now: DateTime<Utc>) -> ProgressValues {
    ProgressValues {
        user_id,
        level: 1,
        xp: xp_reward,
        max_xp: FIRST_LEVEL_XP,
        streak_count: 1,
        last_streak_update: Some(now),
        total_points: xp_reward,
        highest_streak: 1,
    }
}

/// Applies one more completed exercise worth `xp_reward` at `now`.
pub fn advance(current: &ProgressValues, xp_reward: i32, now: DateTime<Utc>, rule: HighestStreakRule) -> ProgressValues {
    let xp = current.xp.saturating_add(xp_reward);
    let level = level_for_xp(xp);

    let counted_today = current.last_streak_update
        .as_ref()
        .map_or(false, |last| same_day(last, &now));
    let streak_count = if counted_today { current.streak_count } else { current.streak_count + 1 };

    let highest_streak = match rule {
        HighestStreakRule::AfterUpdate => current.highest_streak.max(streak_count),
        HighestStreakRule::BeforeUpdate => current.highest_streak.max(current.streak_count),
    };

    ProgressValues {
        user_id: current.user_id,
        level,
        xp,
        max_xp: max_xp_for_level(level),
        streak_count,
        last_streak_update: Some(now),
        total_points: current.total_points.saturating_add(xp_reward),
        highest_streak,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingSpan {
    pub book_id: i32,
    pub words_flashed: i32,
    pub word_count: i32,
    pub last_position: i32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PerformanceInput {
    source: Option<String>,
    article: Option<Article>,
    word_range: Option<WordRange>,
}

#[derive(Deserialize, Debug)]
struct Article {
    id: Value,
    content: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct WordRange {
    from: Option<f64>,
    to: Option<f64>,
}

fn id_from_json(id: &Value) -> Option<i32> {
    match *id {
        Value::Number(ref n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(ref s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Clamps `to` into `[0, total]` and then `from` into `[0, to]`.
pub fn clamp_word_range(total_words: usize, from: f64, to: f64) -> (i32, i32) {
    let total = total_words as f64;
    let to = to.max(0.0).min(total).floor();
    let from = from.max(0.0).min(to).floor();
    (from as i32, to as i32)
}

impl ReadingSpan {
    pub fn new(book_id: i32, content: &str, from: f64, to: f64) -> Self {
        let (from, to) = clamp_word_range(text::word_count(content), from, to);
        ReadingSpan {
            book_id,
            words_flashed: to,
            word_count: to - from,
            last_position: to,
        }
    }

    /// Extracts the reading span a library or document exercise reports in
    /// its performance metrics. Anything else has no span.
    pub fn from_metrics(metrics: &Value) -> Option<Self> {
        let input: PerformanceInput = match serde_json::from_value(metrics.clone()) {
            Ok(input) => input,
            Err(e) => {
                debug!("Performance metrics aren't a reading report: {}", e);
                return None;
            }
        };

        match input.source.as_ref().map(String::as_str) {
            Some("library") | Some("document") => (),
            _ => return None,
        }

        let article = input.article?;
        let book_id = match id_from_json(&article.id) {
            Some(id) => id,
            None => {
                warn!("Reading report with an unusable article id: {:?}", article.id);
                return None;
            }
        };
        let content = article.content.unwrap_or_default();
        let range = input.word_range.unwrap_or_default();

        Some(ReadingSpan::new(book_id,
                              &content,
                              range.from.unwrap_or(0.0),
                              range.to.unwrap_or(0.0)))
    }

    pub fn values(&self, user_id: i32, now: DateTime<Utc>) -> ReadingValues {
        ReadingValues {
            user_id,
            book_id: self.book_id,
            words_flashed: self.words_flashed,
            word_count: self.word_count,
            last_position: self.last_position,
            updated_at: now,
        }
    }
}

pub fn get_user_progress(conn: &PgConnection, user_id: i32) -> Result<Option<UserProgress>> {
    use crate::schema::user_progress;

    user_progress::table
        .filter(user_progress::user_id.eq(user_id))
        .get_result(conn)
        .optional()
        .chain_err(|| "Couldn't fetch the user progress!")
}

fn upsert_progress(conn: &PgConnection, values: &ProgressValues) -> Result<UserProgress> {
    use crate::schema::user_progress;

    diesel::insert_into(user_progress::table)
        .values(values)
        .on_conflict(user_progress::user_id)
        .do_update()
        .set(values)
        .get_result(conn)
        .chain_err(|| "Couldn't save the user progress!")
}

/// Runs one completed exercise through the engine: the reading span first
/// (if the metrics carry one), then XP, level and streak.
pub fn record_exercise_completion(conn: &PgConnection,
                                  user_id: i32,
                                  exercise: &Exercise,
                                  metrics: Option<&Value>,
                                  rule: HighestStreakRule)
                                  -> Result<UserProgress> {
    let now = Utc::now();

    if let Some(span) = metrics.and_then(ReadingSpan::from_metrics) {
        reading::upsert_reading_progress(conn, &span.values(user_id, now))?;
        debug!("Reading progress of user {} in book {} is now at word {}.",
               user_id, span.book_id, span.last_position);
    }

    let values = match get_user_progress(conn, user_id)? {
        None => {
            info!("First completed exercise for user {}.", user_id);
            first_completion(user_id, exercise.xp_reward, now)
        }
        Some(current) => advance(&ProgressValues::from(&current), exercise.xp_reward, now, rule),
    };

    upsert_progress(conn, &values)
}

/// What a client reports along with a completed exercise.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub performance_metrics: Option<Value>,
    pub questions_answered: Option<i32>,
    pub correct_answers: Option<i32>,
    pub score_percent: Option<i32>,
    pub quiz_details: Option<Value>,
}

/// Logs a finished session for the exercise and credits its rewards.
pub fn complete_exercise(conn: &PgConnection,
                         user_id: i32,
                         exercise_id: i32,
                         duration: i32,
                         report: CompletionReport,
                         rule: HighestStreakRule)
                         -> Result<UserProgress> {
    let exercise = exercise::get_exercise(conn, exercise_id)?
        .ok_or_else(|| Error::from_kind(ErrorKind::NoSuchExercise(exercise_id)))?;

    let now = Utc::now();
    let metrics = report.performance_metrics.clone();

    session::insert_session(conn, &NewSession {
        user_id,
        exercise_id: Some(exercise.id),
        duration,
        start_time: now,
        end_time: Some(now),
        focus_increase: Some(exercise.focus_reward),
        xp_gained: Some(exercise.xp_reward),
        completed_exercises_count: 1,
        performance_metrics: report.performance_metrics,
        used_warmups: None,
        questions_answered: report.questions_answered,
        correct_answers: report.correct_answers,
        score_percent: report.score_percent,
        quiz_details: report.quiz_details,
    })?;

    record_exercise_completion(conn, user_id, &exercise, metrics.as_ref(), rule)
}

#[cfg(test)]
fn at(date: &str) -> DateTime<Utc> {
    date.parse().unwrap()
}

#[test]
fn test_level_formula() {
    let expected = [(0, 1), (99, 1), (100, 2), (150, 2), (399, 2), (400, 3), (899, 3), (900, 4), (10_000, 11)];
    for &(xp, level) in &expected {
        assert_eq!(level_for_xp(xp), level, "xp {}", xp);
    }

    let mut prev_level = 0;
    let mut prev_max = 0;
    for xp in (0..50_000).step_by(37) {
        let level = level_for_xp(xp);
        let max_xp = max_xp_for_level(level);
        let root = ((xp / 100) as f64).sqrt().floor() as i32;
        assert_eq!(level, root + 1);
        assert_eq!(max_xp, level * level * 100);
        assert!(level >= prev_level);
        if level > prev_level {
            assert!(max_xp > prev_max);
        }
        prev_level = level;
        prev_max = max_xp;
    }
}

#[test]
fn test_first_completion() {
    let now = at("2025-03-01T08:00:00Z");
    let p = first_completion(7, 150, now);
    assert_eq!((p.level, p.xp, p.max_xp), (1, 150, 100));
    assert_eq!((p.streak_count, p.highest_streak, p.total_points), (1, 1, 150));
    assert_eq!(p.last_streak_update, Some(now));
}

#[test]
fn test_same_day_completions_count_streak_once() {
    let morning = at("2025-03-01T08:00:00Z");
    let evening = at("2025-03-01T22:30:00Z");

    let p = first_completion(1, 50, morning);
    let p = advance(&p, 50, evening, HighestStreakRule::AfterUpdate);
    assert_eq!(p.xp, 100);
    assert_eq!(p.level, 2);
    assert_eq!(p.max_xp, 400);
    assert_eq!(p.streak_count, 1);

    let p = advance(&p, 20, evening, HighestStreakRule::AfterUpdate);
    assert_eq!(p.xp, 120);
    assert_eq!(p.total_points, 120);
    assert_eq!(p.streak_count, 1);
    assert_eq!(p.last_streak_update, Some(evening));
}

#[test]
fn test_streak_grows_on_new_days() {
    let p = first_completion(1, 10, at("2025-03-01T23:59:00Z"));
    let p = advance(&p, 10, at("2025-03-02T00:01:00Z"), HighestStreakRule::AfterUpdate);
    assert_eq!(p.streak_count, 2);
    assert_eq!(p.highest_streak, 2);
    let p = advance(&p, 10, at("2025-03-05T12:00:00Z"), HighestStreakRule::AfterUpdate);
    assert_eq!(p.streak_count, 3);
    assert_eq!(p.highest_streak, 3);
    assert!(p.highest_streak >= p.streak_count);
}

#[test]
fn test_highest_streak_rules() {
    let p = first_completion(1, 10, at("2025-03-01T10:00:00Z"));
    let day2 = at("2025-03-02T10:00:00Z");

    let after = advance(&p, 10, day2, HighestStreakRule::AfterUpdate);
    let before = advance(&p, 10, day2, HighestStreakRule::BeforeUpdate);
    assert_eq!((after.streak_count, after.highest_streak), (2, 2));
    assert_eq!((before.streak_count, before.highest_streak), (2, 1));

    let before = advance(&before, 10, at("2025-03-03T10:00:00Z"), HighestStreakRule::BeforeUpdate);
    assert_eq!((before.streak_count, before.highest_streak), (3, 2));
}

#[test]
fn test_xp_saturates_instead_of_wrapping() {
    let p = first_completion(1, i32::max_value() - 5, at("2025-03-01T10:00:00Z"));
    let p = advance(&p, 10, at("2025-03-02T10:00:00Z"), HighestStreakRule::AfterUpdate);
    assert_eq!(p.xp, i32::max_value());
    assert_eq!(p.total_points, i32::max_value());
    assert_eq!(p.level, 4635);
    assert_eq!(p.max_xp, i32::max_value());
}

#[test]
fn test_missing_streak_timestamp_counts_as_new_day() {
    let mut p = first_completion(1, 10, at("2025-03-01T10:00:00Z"));
    p.last_streak_update = None;
    let p = advance(&p, 10, at("2025-03-01T11:00:00Z"), HighestStreakRule::AfterUpdate);
    assert_eq!(p.streak_count, 2);
}

#[test]
fn test_word_range_clamped_to_article() {
    let content = (0..20).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
    let span = ReadingSpan::new(4, &content, 10.0, 25.0);
    assert_eq!(span, ReadingSpan { book_id: 4, words_flashed: 20, word_count: 10, last_position: 20 });

    let span = ReadingSpan::new(4, &content, 30.0, 25.0);
    assert_eq!((span.word_count, span.last_position), (0, 20));

    assert_eq!(clamp_word_range(20, -5.0, -1.0), (0, 0));
    assert_eq!(clamp_word_range(0, 3.0, 8.0), (0, 0));
}

#[test]
fn test_reading_span_from_metrics() {
    use serde_json::json;

    let metrics = json!({
        "source": "library",
        "article": { "id": "12", "content": "one two three four five" },
        "wordRange": { "from": 1, "to": 3 },
    });
    assert_eq!(ReadingSpan::from_metrics(&metrics),
               Some(ReadingSpan { book_id: 12, words_flashed: 3, word_count: 2, last_position: 3 }));

    let doc = json!({ "source": "document", "article": { "id": 5, "content": "a b" } });
    assert_eq!(ReadingSpan::from_metrics(&doc),
               Some(ReadingSpan { book_id: 5, words_flashed: 0, word_count: 0, last_position: 0 }));

    let other = json!({ "source": "practice", "article": { "id": 5, "content": "a b" } });
    assert_eq!(ReadingSpan::from_metrics(&other), None);
    assert_eq!(ReadingSpan::from_metrics(&json!({ "source": "library" })), None);
    assert_eq!(ReadingSpan::from_metrics(&json!("garbage")), None);
    assert_eq!(ReadingSpan::from_metrics(&json!({ "source": "library", "article": { "id": null } })), None);

    let out_of_range = json!({ "source": "library", "article": { "id": 4294967308u64, "content": "a b" } });
    assert_eq!(ReadingSpan::from_metrics(&out_of_range), None);
    let too_small = json!({ "source": "library", "article": { "id": -4294967296i64, "content": "a b" } });
    assert_eq!(ReadingSpan::from_metrics(&too_small), None);
}
