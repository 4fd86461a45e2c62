use super::*;
use chrono::{DateTime, offset::Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct UnlockedBadge {
    pub id: i32,
    pub unlocked_at: DateTime<Utc>,
    pub badge: Badge,
}

pub fn get_badges(conn: &PgConnection) -> Result<Vec<Badge>> {
    use crate::schema::badges;

    badges::table
        .order(badges::id.asc())
        .load(conn)
        .chain_err(|| "Couldn't load the badges!")
}

pub fn get_user_badges(conn: &PgConnection, user_id: i32) -> Result<Vec<UnlockedBadge>> {
    use crate::schema::{badges, user_badges};

    let rows: Vec<(UserBadge, Badge)> = user_badges::table
        .inner_join(badges::table)
        .filter(user_badges::user_id.eq(user_id))
        .order(user_badges::unlocked_at.asc())
        .load(conn)
        .chain_err(|| "Couldn't load the badges of the user!")?;

    Ok(rows.into_iter()
        .map(|(ub, badge)| UnlockedBadge { id: ub.id, unlocked_at: ub.unlocked_at, badge })
        .collect())
}
