error_chain! {
    foreign_links {
        VarError(::std::env::VarError);
        ParseIntError(::std::num::ParseIntError);
        StdIoError(::std::io::Error);
        DieselError(::diesel::result::Error);
        DieselMigrationError(::diesel_migrations::RunMigrationsError);
        PoolError(::r2d2::Error);
        JsonError(::serde_json::Error);
        TimestampParseError(::chrono::ParseError);
        DecodeError(::data_encoding::DecodeError);
    }
    errors {
        InvalidInput(reason: String) {
            description("Provided input is invalid.")
            display("Provided input is invalid: {}", reason)
        }
        InvalidToken(provider: &'static str) {
            description("Identity token is invalid")
            display("Invalid {} token.", provider)
        }
        NoSuchUser(id: i32) {
            description("No such user exists")
            display("No user with ID {} exists.", id)
        }
        NoSuchExercise(id: i32) {
            description("No such exercise exists")
            display("No exercise with ID {} exists.", id)
        }
        NoSuchSession(id: i32) {
            description("No such session exists")
            display("No session with ID {} exists.", id)
        }
        NoSuchBook(id: i32) {
            description("No such book exists")
            display("No library item with ID {} exists.", id)
        }
        ServiceError(service: &'static str, status: u16) {
            description("An external service returned an error")
            display("The {} service responded with status {}.", service, status)
        }
        GenerationTimeout(ms: u64) {
            description("Text generation timed out")
            display("Text generation didn't finish in {} ms.", ms)
        }
        DatabaseOdd(reason: &'static str) {
            description("There's something wrong with the contents of the DB vs. how it should be!")
            display("There's something wrong with the contents of the DB vs. how it should be! {}", reason)
        }
    }
}

impl ErrorKind {
    /// Validation failures are reported to callers apart from data-store
    /// and service failures.
    pub fn is_invalid_input(&self) -> bool {
        match *self {
            ErrorKind::InvalidInput(_) | ErrorKind::InvalidToken(_) => true,
            _ => false,
        }
    }
}

pub fn invalid_input<S: Into<String>>(reason: S) -> Error {
    ErrorKind::InvalidInput(reason.into()).into()
}

#[test]
fn test_invalid_input_classification() {
    assert!(invalid_input("bad excerpt").kind().is_invalid_input());
    assert!(Error::from_kind(ErrorKind::InvalidToken("google")).kind().is_invalid_input());
    assert!(!Error::from_kind(ErrorKind::NoSuchUser(3)).kind().is_invalid_input());
    let msg: Error = "database went away".into();
    assert!(!msg.kind().is_invalid_input());
}
