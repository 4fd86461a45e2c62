use super::*;
use chrono::offset::Utc;
use crate::auth::{Identity, IdentityVerifier};

pub fn get_users(conn: &PgConnection) -> Result<Vec<User>> {
    use crate::schema::users;

    users::table
        .order(users::id.asc())
        .load(conn)
        .chain_err(|| "Couldn't load the users!")
}

pub fn get_user(conn: &PgConnection, user_id: i32) -> Result<Option<User>> {
    use crate::schema::users;

    users::table
        .filter(users::id.eq(user_id))
        .get_result(conn)
        .optional()
        .chain_err(|| "Error when trying to retrieve user!")
}

pub fn get_user_by_email(conn: &PgConnection, user_email: &str) -> Result<Option<User>> {
    use crate::schema::users::dsl::*;

    users
        .filter(email.eq(user_email))
        .get_result(conn)
        .optional()
        .chain_err(|| "Error when trying to retrieve user!")
}

pub fn add_user(conn: &PgConnection, email: &str, auth_provider: &str, display_name: Option<&str>) -> Result<User> {
    use crate::schema::users;

    if email.len() > 254 || !email.contains('@') {
        return Err(invalid_input(format!("{:?} isn't a valid e-mail address.", email)));
    }

    let new_user = NewUser {
        email,
        auth_provider,
        display_name,
        profile_completed: false,
        timezone: "UTC",
        last_login: None,
    };

    let user: User = diesel::insert_into(users::table)
        .values(&new_user)
        .get_result(conn)
        .chain_err(|| "Couldn't create a new user!")?;

    info!("Created a new user, with email {:?}.", email);
    Ok(user)
}

fn touch_login(conn: &PgConnection, user: &User) -> Result<User> {
    use crate::schema::users;

    diesel::update(user)
        .set(users::last_login.eq(Some(Utc::now())))
        .get_result(conn)
        .chain_err(|| "Couldn't update the last login time!")
}

/// Signs in with a Google identity token. Unknown e-mail addresses get a new
/// account on the fly.
pub fn login_with_google(conn: &PgConnection, verifier: &dyn IdentityVerifier, id_token: &str) -> Result<User> {
    let Identity { email, name } = verifier.verify(id_token)?;
    let email = email.to_lowercase();

    if let Some(user) = get_user_by_email(conn, &email)? {
        info!("User {} logged in with {}.", user.id, verifier.provider());
        return touch_login(conn, &user);
    }

    let display_name = match name {
        Some(name) => name,
        None => email.split('@').next().unwrap_or("").to_string(),
    };

    let user = add_user(conn, &email, verifier.provider(), Some(&display_name))?;
    touch_login(conn, &user)
}

pub fn login_with_apple(conn: &PgConnection, verifier: &dyn IdentityVerifier, id_token: &str) -> Result<User> {
    let Identity { email, name } = verifier.verify(id_token)?;

    if let Some(user) = get_user_by_email(conn, &email)? {
        info!("User {} logged in with {}.", user.id, verifier.provider());
        return Ok(user);
    }

    add_user(conn, &email, verifier.provider(), name.as_ref().map(String::as_str))
}
