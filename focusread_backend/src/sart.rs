//! Sustained Attention to Response Test results and their sessions.

use super::*;
use chrono::{DateTime, offset::Utc};
use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

/// A finished test as the client reports it.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SartResultInput {
    pub user_id: i32,
    #[serde(default)]
    pub session_id: Option<i32>,
    pub total_trials: i32,
    pub correct_go_trials: i32,
    pub correct_no_go_trials: i32,
    pub commission_errors: i32,
    pub omission_errors: i32,
    pub average_reaction_time: f64,
    pub accuracy_percentage: f64,
    #[serde(default)]
    pub test_type: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i32,
    #[serde(default)]
    pub trial_details: Option<Value>,
}

impl SartResultInput {
    fn as_new(&self) -> NewSartResult<'_> {
        NewSartResult {
            user_id: self.user_id,
            session_id: self.session_id,
            total_trials: self.total_trials,
            correct_go_trials: self.correct_go_trials,
            correct_no_go_trials: self.correct_no_go_trials,
            commission_errors: self.commission_errors,
            omission_errors: self.omission_errors,
            average_reaction_time: self.average_reaction_time,
            accuracy_percentage: self.accuracy_percentage,
            test_type: self.test_type.as_ref().map_or("full", String::as_str),
            started_at: self.started_at,
            completed_at: self.completed_at,
            duration_ms: self.duration_ms,
            trial_details: self.trial_details.clone(),
        }
    }

    /// The summary stored in the session's `performance_metrics`.
    pub fn session_metrics(&self) -> Value {
        json!({
            "sartAccuracy": self.accuracy_percentage,
            "sartReactionTime": self.average_reaction_time,
            "sartCommissionErrors": self.commission_errors,
            "sartOmissionErrors": self.omission_errors,
        })
    }
}

pub fn save_sart_result(conn: &PgConnection, input: &SartResultInput) -> Result<SartResult> {
    use crate::schema::sart_results;

    let result: SartResult = diesel::insert_into(sart_results::table)
        .values(&input.as_new())
        .get_result(conn)
        .chain_err(|| "Couldn't save the SART result!")?;

    info!("Saved SART result {} for user {} ({} trials, {:.1}% accuracy).",
          result.id, result.user_id, result.total_trials, result.accuracy_percentage);
    Ok(result)
}

/// Newest first.
pub fn get_sart_results(conn: &PgConnection, user_id: i32) -> Result<Vec<SartResult>> {
    use crate::schema::sart_results;

    sart_results::table
        .filter(sart_results::user_id.eq(user_id))
        .order((sart_results::created_at.desc(), sart_results::id.desc()))
        .load(conn)
        .chain_err(|| "Couldn't load the SART results!")
}

pub fn get_latest_sart_result(conn: &PgConnection, user_id: i32) -> Result<Option<SartResult>> {
    use crate::schema::sart_results;

    sart_results::table
        .filter(sart_results::user_id.eq(user_id))
        .order((sart_results::created_at.desc(), sart_results::id.desc()))
        .first(conn)
        .optional()
        .chain_err(|| "Couldn't fetch the latest SART result!")
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SartAnalytics {
    pub average_accuracy: f64,
    pub average_reaction_time: f64,
    pub improvement_trend: f64,
    pub total_tests: usize,
    pub latest_score: f64,
}

/// `(accuracy_percentage, average_reaction_time)` pairs, oldest first.
pub fn analytics(results: &[(f64, f64)]) -> SartAnalytics {
    let (first, latest) = match (results.first(), results.last()) {
        (Some(first), Some(latest)) => (first.0, latest.0),
        _ => return SartAnalytics::default(),
    };
    let n = results.len() as f64;

    SartAnalytics {
        average_accuracy: results.iter().map(|r| r.0).sum::<f64>() / n,
        average_reaction_time: results.iter().map(|r| r.1).sum::<f64>() / n,
        improvement_trend: if results.len() > 1 { latest - first } else { 0.0 },
        total_tests: results.len(),
        latest_score: latest,
    }
}

pub fn get_sart_analytics(conn: &PgConnection, user_id: i32) -> Result<SartAnalytics> {
    use crate::schema::sart_results;

    let rows: Vec<(f64, f64)> = sart_results::table
        .filter(sart_results::user_id.eq(user_id))
        .order((sart_results::created_at.asc(), sart_results::id.asc()))
        .select((sart_results::accuracy_percentage, sart_results::average_reaction_time))
        .load(conn)
        .chain_err(|| "Couldn't load the SART results!")?;

    Ok(analytics(&rows))
}

/// Opens a session for a test. The session is tied to the `sart-test`
/// exercise when one is configured.
pub fn create_sart_session(conn: &PgConnection, user_id: i32) -> Result<Session> {
    let exercise_id = match exercise::get_exercise_by_slug(conn, "sart-test") {
        Ok(ex) => ex.map(|e| e.id),
        Err(e) => {
            warn!("Couldn't look up the SART exercise: {}", e);
            None
        }
    };

    session::create_session(conn, user_id, exercise_id, 0, Utc::now(), Some(false))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSart {
    pub session: Session,
    pub sart_result: SartResult,
}

/// Closes the session and stores the result linked to it.
pub fn complete_sart_session(conn: &PgConnection, session_id: i32, results: &SartResultInput) -> Result<CompletedSart> {
    let changes = SessionChanges {
        end_time: Some(Utc::now()),
        duration: Some(((results.duration_ms as f64) / 1000.0).round() as i32),
        completed_exercises_count: Some(1),
        performance_metrics: Some(results.session_metrics()),
        ..Default::default()
    };
    let session = session::update_session(conn, session_id, &changes)?;

    let linked = SartResultInput { session_id: Some(session.id), ..results.clone() };
    let sart_result = save_sart_result(conn, &linked)?;

    Ok(CompletedSart { session, sart_result })
}

#[test]
fn test_analytics_empty() {
    assert_eq!(analytics(&[]), SartAnalytics::default());
}

#[test]
fn test_analytics_single_test_has_no_trend() {
    let a = analytics(&[(80.0, 420.0)]);
    assert_eq!(a.total_tests, 1);
    assert_eq!(a.latest_score, 80.0);
    assert_eq!(a.improvement_trend, 0.0);
    assert_eq!(a.average_reaction_time, 420.0);
}

#[test]
fn test_analytics_trend_is_latest_minus_first() {
    let a = analytics(&[(60.0, 500.0), (90.0, 300.0), (75.0, 400.0)]);
    assert_eq!(a.total_tests, 3);
    assert_eq!(a.average_accuracy, 75.0);
    assert_eq!(a.average_reaction_time, 400.0);
    assert_eq!(a.latest_score, 75.0);
    assert_eq!(a.improvement_trend, 15.0);

    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["improvementTrend"], 15.0);
    assert_eq!(json["totalTests"], 3);
}

#[test]
fn test_sart_input_defaults() {
    let input: SartResultInput = serde_json::from_value(json!({
        "userId": 3,
        "totalTrials": 225,
        "correctGoTrials": 200,
        "correctNoGoTrials": 20,
        "commissionErrors": 5,
        "omissionErrors": 0,
        "averageReactionTime": 350.5,
        "accuracyPercentage": 97.7,
        "startedAt": "2025-03-01T10:00:00Z",
        "completedAt": "2025-03-01T10:04:30Z",
        "durationMs": 270000,
    })).unwrap();

    let new = input.as_new();
    assert_eq!(new.test_type, "full");
    assert_eq!(new.session_id, None);
    assert_eq!(input.session_metrics()["sartCommissionErrors"], 5);
}
