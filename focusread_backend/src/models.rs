use super::schema::*;
use chrono::{DateTime, offset::Utc};
use serde::{Serialize, Deserialize};
use serde_json::Value;

#[derive(Insertable, Debug)]
#[table_name="users"]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub auth_provider: &'a str,
    pub display_name: Option<&'a str>,
    pub profile_completed: bool,
    pub timezone: &'a str,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub auth_provider: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub profile_completed: bool,
    pub display_name: Option<String>,
    pub timezone: String,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
pub struct Exercise {
    pub id: i32,
    pub name: String,
    pub slug: Option<String>,
    #[serde(rename = "type")]
    pub exercise_type: String,
    pub duration: i32,
    pub difficulty_level: i32,
    pub description: Option<String>,
    pub instructions: Option<Value>,
    pub required_level: i32,
    pub xp_reward: i32,
    pub focus_reward: i32,
    pub is_unlocked: bool,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
pub struct Flow {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub flow_type: Option<String>,
    pub duration: Option<i32>,
    pub difficulty_level: Option<i32>,
}

#[derive(Identifiable, Clone, Queryable, Associations, Debug)]
#[belongs_to(Flow, foreign_key = "flow_id")]
#[belongs_to(Exercise, foreign_key = "exercise_id")]
#[table_name="flow_exercises"]
pub struct FlowExercise {
    pub id: i32,
    pub flow_id: i32,
    pub exercise_id: i32,
    pub sequence_order: i32,
}

#[derive(Insertable, Debug)]
#[table_name="sessions"]
pub struct NewSession {
    pub user_id: i32,
    pub exercise_id: Option<i32>,
    pub duration: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub focus_increase: Option<i32>,
    pub xp_gained: Option<i32>,
    pub completed_exercises_count: i32,
    pub performance_metrics: Option<Value>,
    pub used_warmups: Option<bool>,
    pub questions_answered: Option<i32>,
    pub correct_answers: Option<i32>,
    pub score_percent: Option<i32>,
    pub quiz_details: Option<Value>,
}

/// Fields left as `None` are not touched by the update.
#[derive(AsChangeset, Debug, Default)]
#[table_name="sessions"]
pub struct SessionChanges {
    pub duration: Option<i32>,
    pub end_time: Option<DateTime<Utc>>,
    pub focus_increase: Option<i32>,
    pub xp_gained: Option<i32>,
    pub completed_exercises_count: Option<i32>,
    pub performance_metrics: Option<Value>,
    pub used_warmups: Option<bool>,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
pub struct Session {
    pub id: i32,
    pub user_id: i32,
    pub exercise_id: Option<i32>,
    pub duration: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub focus_increase: Option<i32>,
    pub xp_gained: Option<i32>,
    pub completed_exercises_count: i32,
    pub performance_metrics: Option<Value>,
    pub used_warmups: Option<bool>,
    pub questions_answered: Option<i32>,
    pub correct_answers: Option<i32>,
    pub score_percent: Option<i32>,
    pub quiz_details: Option<Value>,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
#[table_name="user_progress"]
pub struct UserProgress {
    pub id: i32,
    pub user_id: i32,
    pub level: i32,
    pub xp: i32,
    pub max_xp: i32,
    pub streak_count: i32,
    pub last_streak_update: Option<DateTime<Utc>>,
    pub total_points: i32,
    pub highest_streak: i32,
    pub diagnostic_step: Option<i32>,
    pub diagnostic_complete: Option<bool>,
    pub diagnostic_data: Option<Value>,
}

/// The gamification columns the progress engine owns. Used both for the
/// first insert and for the `ON CONFLICT (user_id)` update.
#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[table_name="user_progress"]
pub struct ProgressValues {
    pub user_id: i32,
    pub level: i32,
    pub xp: i32,
    pub max_xp: i32,
    pub streak_count: i32,
    pub last_streak_update: Option<DateTime<Utc>>,
    pub total_points: i32,
    pub highest_streak: i32,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
#[table_name="library"]
pub struct LibraryItem {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub length: Option<i32>,
    pub estimated_time: Option<i32>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub uploaded_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_document: bool,
}

#[derive(Insertable, Debug)]
#[table_name="library"]
pub struct NewDocument<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub content: &'a str,
    pub length: i32,
    pub estimated_time: i32,
    pub file_url: Option<&'a str>,
    pub file_type: Option<&'a str>,
    pub uploaded_by: i32,
    pub is_document: bool,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
#[table_name="reading_progress"]
pub struct ReadingProgress {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub words_flashed: i32,
    pub word_count: i32,
    pub last_position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[table_name="reading_progress"]
pub struct ReadingValues {
    pub user_id: i32,
    pub book_id: i32,
    pub words_flashed: i32,
    pub word_count: i32,
    pub last_position: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
pub struct Badge {
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub icon_url: Option<String>,
    pub condition_type: Option<String>,
    pub condition_value: Option<i32>,
}

#[derive(Identifiable, Clone, Queryable, Associations, Debug)]
#[belongs_to(Badge, foreign_key = "badge_id")]
pub struct UserBadge {
    pub id: i32,
    pub user_id: i32,
    pub badge_id: i32,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
pub struct SartResult {
    pub id: i32,
    pub user_id: i32,
    pub session_id: Option<i32>,
    pub total_trials: i32,
    pub correct_go_trials: i32,
    pub correct_no_go_trials: i32,
    pub commission_errors: i32,
    pub omission_errors: i32,
    pub average_reaction_time: f64,
    pub accuracy_percentage: f64,
    pub test_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i32,
    pub trial_details: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[table_name="sart_results"]
pub struct NewSartResult<'a> {
    pub user_id: i32,
    pub session_id: Option<i32>,
    pub total_trials: i32,
    pub correct_go_trials: i32,
    pub correct_no_go_trials: i32,
    pub commission_errors: i32,
    pub omission_errors: i32,
    pub average_reaction_time: f64,
    pub accuracy_percentage: f64,
    pub test_type: &'a str,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i32,
    pub trial_details: Option<Value>,
}

#[derive(Identifiable, Clone, Queryable, Debug)]
#[table_name="user_settings"]
pub struct UserSettings {
    pub id: i32,
    pub user_id: i32,
    pub breathing_speed: f64,
    pub breathing_pause_duration: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, AsChangeset, Debug)]
#[table_name="user_settings"]
pub struct SettingsValues {
    pub user_id: i32,
    pub breathing_speed: f64,
    pub breathing_pause_duration: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Identifiable, Clone, Queryable, Debug, Serialize)]
#[table_name="diagnostic"]
pub struct Diagnostic {
    pub id: i32,
    pub user_id: i32,
    pub reading_speed: Option<i32>,
    pub breathing_rate: Option<i32>,
    pub memory_score: Option<i32>,
    pub focus_score: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub device_id: Option<String>,
}

#[derive(Insertable, Deserialize, Debug)]
#[table_name="diagnostic"]
pub struct NewDiagnostic {
    pub user_id: i32,
    pub reading_speed: Option<i32>,
    pub breathing_rate: Option<i32>,
    pub memory_score: Option<i32>,
    pub focus_score: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub device_id: Option<String>,
}

#[derive(Insertable, Debug)]
#[table_name="session_content"]
pub struct NewSessionContent<'a> {
    pub user_id: i32,
    pub session_key: &'a str,
    pub content_type: &'a str,
    pub content_data: Value,
    pub duration: i32,
}
