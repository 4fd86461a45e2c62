use super::*;
use chrono::{DateTime, offset::Utc};
use serde_json::Value;

/// Durations above a day can't be seconds; clients that send milliseconds
/// get converted.
pub fn normalize_duration(duration: i64) -> i32 {
    if duration > 86_400 {
        ((duration as f64) / 1000.0).round() as i32
    } else {
        duration as i32
    }
}

pub fn get_user_sessions(conn: &PgConnection, user_id: i32) -> Result<Vec<Session>> {
    use crate::schema::sessions;

    sessions::table
        .filter(sessions::user_id.eq(user_id))
        .order(sessions::start_time.desc())
        .load(conn)
        .chain_err(|| "Couldn't load the sessions!")
}

pub fn create_session(conn: &PgConnection,
                      user_id: i32,
                      exercise_id: Option<i32>,
                      duration: i64,
                      start_time: DateTime<Utc>,
                      used_warmups: Option<bool>)
                      -> Result<Session> {
    let new_session = NewSession {
        user_id,
        exercise_id,
        duration: normalize_duration(duration),
        start_time,
        end_time: None,
        focus_increase: None,
        xp_gained: None,
        completed_exercises_count: 0,
        performance_metrics: None,
        used_warmups,
        questions_answered: None,
        correct_answers: None,
        score_percent: None,
        quiz_details: None,
    };

    insert_session(conn, &new_session)
}

pub fn insert_session(conn: &PgConnection, new_session: &NewSession) -> Result<Session> {
    use crate::schema::sessions;

    let session: Session = diesel::insert_into(sessions::table)
        .values(new_session)
        .get_result(conn)
        .chain_err(|| "Couldn't create a new session!")?;

    debug!("Created session {} for user {}.", session.id, session.user_id);
    Ok(session)
}

pub fn update_session(conn: &PgConnection, session_id: i32, changes: &SessionChanges) -> Result<Session> {
    use crate::schema::sessions;

    diesel::update(sessions::table.filter(sessions::id.eq(session_id)))
        .set(changes)
        .get_result(conn)
        .optional()
        .chain_err(|| "Couldn't update the session!")?
        .ok_or_else(|| ErrorKind::NoSuchSession(session_id).into())
}

pub fn complete_session(conn: &PgConnection,
                        session_id: i32,
                        end_time: DateTime<Utc>,
                        focus_increase: Option<i32>,
                        xp_gained: Option<i32>,
                        performance_metrics: Option<Value>,
                        used_warmups: Option<bool>)
                        -> Result<Session> {
    let changes = SessionChanges {
        end_time: Some(end_time),
        focus_increase,
        xp_gained,
        performance_metrics,
        used_warmups,
        ..Default::default()
    };
    update_session(conn, session_id, &changes)
}

#[test]
fn test_normalize_duration() {
    assert_eq!(normalize_duration(0), 0);
    assert_eq!(normalize_duration(600), 600);
    assert_eq!(normalize_duration(86_400), 86_400);
    assert_eq!(normalize_duration(86_401), 86);
    assert_eq!(normalize_duration(90_500), 91);
    assert_eq!(normalize_duration(300_000), 300);
}
