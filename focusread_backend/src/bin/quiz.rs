#[macro_use] extern crate clap;
#[macro_use] extern crate lazy_static;

use focusread_backend::errors::*;
use focusread_backend::generation::{OpenAiGenerator, TextGenerator};
use focusread_backend::quiz::QuizGenerator;
use std::env;
use std::sync::Arc;
use std::time::Duration;

lazy_static! {

    static ref OPENAI_API_KEY : String = { dotenv::dotenv().ok(); env::var("FOCUSREAD_OPENAI_API_KEY")
        .expect("FOCUSREAD_OPENAI_API_KEY must be set to generate quizzes.") };

    static ref OPENAI_BASE_URL : String = { dotenv::dotenv().ok(); env::var("FOCUSREAD_OPENAI_BASE_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".into()) };

    static ref OPENAI_MODEL : String = { dotenv::dotenv().ok(); env::var("FOCUSREAD_OPENAI_MODEL")
        .unwrap_or_else(|_| "gpt-4o-mini".into()) };

    static ref QUIZ_TIMEOUT : Duration = { dotenv::dotenv().ok(); Duration::from_millis(env::var("FOCUSREAD_QUIZ_TIMEOUT_MS")
        .map(|s| s.parse().expect("FOCUSREAD_QUIZ_TIMEOUT_MS: Specify the timeout in milliseconds!"))
        .unwrap_or(12_000)) };

}

fn run() -> Result<()> {
    use clap::*;

    let matches = App::new("focusread quiz generation")
        .setting(AppSettings::SubcommandRequired)
        .version(crate_version!())
        .subcommand(SubCommand::with_name("generate").about("Generate a quiz for the text in a file")
            .arg(Arg::with_name("file").required(true)))
        .get_matches();

    match matches.subcommand() {
        ("generate", Some(args)) => {
            let path = args.value_of("file").unwrap_or("");
            let excerpt = std::fs::read_to_string(path).chain_err(|| format!("Couldn't read {}", path))?;

            let generator: Arc<dyn TextGenerator> = Arc::new(
                OpenAiGenerator::new(&*OPENAI_API_KEY, &*OPENAI_BASE_URL, &*OPENAI_MODEL, *QUIZ_TIMEOUT));
            let quizzes = QuizGenerator::new(generator, *QUIZ_TIMEOUT);

            let items = quizzes.get_or_generate(&excerpt);
            if items.is_empty() {
                eprintln!("No questions could be generated.");
            }
            println!("{}", serde_json::to_string_pretty(&items)?);
        },
        _ => {
            unreachable!(); // clap should exit before reaching here if none of the subcommands are entered.
        },
    }
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err_chain) = run() {
        for err in err_chain.iter() {
            println!("Error: {}", err);
        }
        std::process::exit(1);
    }
}
