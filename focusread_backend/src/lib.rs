#![recursion_limit = "512"]

#[macro_use] pub extern crate diesel;
#[macro_use] extern crate diesel_migrations;
#[macro_use] extern crate error_chain;
#[macro_use] extern crate log;
#[macro_use] extern crate lazy_static;

pub extern crate chrono;
pub extern crate serde_json;
pub extern crate r2d2;

pub use diesel::prelude::*;
pub use diesel::pg::PgConnection;

use std::sync::Arc;

pub type ConnManager = diesel::r2d2::ConnectionManager<PgConnection>;
pub type Pool = r2d2::Pool<ConnManager>;
pub type Connection = r2d2::PooledConnection<ConnManager>;

macro_rules! try_or {
    ($t:expr , else $e:expr ) => {  match $t { Some(x) => x, None => { $e } }  }
}

pub mod schema;
pub mod models;
pub mod errors;
pub mod helpers;
pub use crate::models::*;
pub use crate::errors::*;

pub mod text;
pub mod generation;
pub mod auth;
pub mod storage;
pub mod user;
pub mod exercise;
pub mod session;
pub mod progress;
pub mod reading;
pub mod badge;
pub mod sart;
pub mod settings;
pub mod quiz;
pub mod picture_word;

pub mod db {
    use super::*;

    embed_migrations!();

    pub fn connect(database_url: &str) -> Result<PgConnection> {
        <PgConnection as diesel::Connection>::establish(database_url)
            .chain_err(|| "Error connecting to database!")
    }

    pub fn pool(database_url: &str, max_size: u32) -> Result<Pool> {
        let manager = ConnManager::new(database_url);
        let pool = r2d2::Pool::builder()
            .max_size(max_size)
            .build(manager)
            .chain_err(|| "Couldn't build the connection pool!")?;
        Ok(pool)
    }

    /// Runs the pending migrations and reports whether any exercises are configured.
    pub fn check(conn: &PgConnection) -> Result<bool> {
        embedded_migrations::run(conn).chain_err(|| "Couldn't run the migrations.")?;
        info!("Migrations checked.");

        let count: i64 = schema::exercises::table
            .count()
            .get_result(conn)
            .chain_err(|| "Couldn't count the exercises.")?;

        Ok(count > 0)
    }
}

/// The external collaborators every operation may reach for, composed once
/// per process.
pub struct Services {
    pub google: Box<dyn auth::IdentityVerifier>,
    pub apple: Box<dyn auth::IdentityVerifier>,
    pub storage: Box<dyn storage::ObjectStorage>,
    pub images: Box<dyn picture_word::ImageSearch>,
    pub generator: Arc<dyn generation::TextGenerator>,
    pub generation_timeout: std::time::Duration,
    pub quizzes: quiz::QuizGenerator,
}

#[test]
fn test_connect_reports_unreachable_database() {
    let err = db::connect("postgres://nobody@127.0.0.1:1/none").err().unwrap();
    assert!(!err.kind().is_invalid_input());
}
