use super::*;
use chrono::offset::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreathingSettings {
    pub speed: f64,
    pub pause_duration: f64,
}

impl<'a> From<&'a UserSettings> for BreathingSettings {
    fn from(s: &'a UserSettings) -> Self {
        BreathingSettings { speed: s.breathing_speed, pause_duration: s.breathing_pause_duration }
    }
}

pub fn get_breathing_settings(conn: &PgConnection, user_id: i32) -> Result<Option<BreathingSettings>> {
    use crate::schema::user_settings;

    let settings: Option<UserSettings> = user_settings::table
        .filter(user_settings::user_id.eq(user_id))
        .get_result(conn)
        .optional()
        .chain_err(|| "Couldn't fetch the settings!")?;

    Ok(settings.as_ref().map(BreathingSettings::from))
}

pub fn save_breathing_settings(conn: &PgConnection, user_id: i32, settings: BreathingSettings) -> Result<BreathingSettings> {
    use crate::schema::user_settings;

    let values = SettingsValues {
        user_id,
        breathing_speed: settings.speed,
        breathing_pause_duration: settings.pause_duration,
        updated_at: Utc::now(),
    };

    let saved: UserSettings = diesel::insert_into(user_settings::table)
        .values(&values)
        .on_conflict(user_settings::user_id)
        .do_update()
        .set(&values)
        .get_result(conn)
        .chain_err(|| "Couldn't save the settings!")?;

    Ok(BreathingSettings::from(&saved))
}

pub fn create_diagnostic(conn: &PgConnection, input: &NewDiagnostic) -> Result<Diagnostic> {
    use crate::schema::diagnostic;

    diesel::insert_into(diagnostic::table)
        .values(input)
        .get_result(conn)
        .chain_err(|| "Couldn't save the diagnostic!")
}
