use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use serde_json::{json, Value};
use ureq;

use crate::errors::*;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A generative-text service. Implementations get one attempt per call.
pub trait TextGenerator: Send + Sync {
    /// Returns the raw generated text; callers expect a JSON object in it.
    fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

pub struct OpenAiGenerator {
    api_key: String,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, base_url: &str, model: &str, request_timeout: Duration) -> Self {
        OpenAiGenerator {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            request_timeout,
        }
    }

    fn body(&self, request: &GenerationRequest) -> Value {
        json!({
            "model": self.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        })
    }
}

impl TextGenerator for OpenAiGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .timeout(self.request_timeout)
            .send_json(self.body(request));

        if !resp.ok() {
            warn!("Generation request failed: {} {}", resp.status(), resp.status_text());
            bail!(ErrorKind::ServiceError("generation", resp.status()));
        }

        let reply: Value = resp.into_json()?;
        Ok(completion_text(&reply))
    }
}

/// The first choice's message content, or an empty JSON object.
pub fn completion_text(reply: &Value) -> String {
    reply.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or("{}")
        .to_string()
}

/// Races the generation against a timer. On expiry the call is abandoned on
/// its worker thread, not cancelled, and counts as a failure.
pub fn generate_with_timeout(generator: &Arc<dyn TextGenerator>,
                             request: GenerationRequest,
                             timeout: Duration)
                             -> Result<String> {
    let (tx, rx) = mpsc::channel();
    let generator = Arc::clone(generator);

    thread::Builder::new()
        .name("generation".into())
        .spawn(move || {
            let _ = tx.send(generator.generate(&request));
        })
        .chain_err(|| "Couldn't spawn the generation thread!")?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("Generation timed out after {:?}.", timeout);
            bail!(ErrorKind::GenerationTimeout(timeout.as_millis() as u64))
        }
        Err(RecvTimeoutError::Disconnected) => bail!("The generation thread ended without a result!"),
    }
}

/// Generators that tests can script.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct Scripted {
        pub reply: std::result::Result<String, &'static str>,
        pub delay: Duration,
        pub calls: AtomicUsize,
    }

    impl Scripted {
        pub fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Scripted { reply: Ok(reply.to_string()), delay: Duration::from_millis(0), calls: AtomicUsize::new(0) })
        }

        pub fn failing(reason: &'static str) -> Arc<Self> {
            Arc::new(Scripted { reply: Err(reason), delay: Duration::from_millis(0), calls: AtomicUsize::new(0) })
        }

        pub fn slow(reply: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Scripted { reply: Ok(reply.to_string()), delay, calls: AtomicUsize::new(0) })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TextGenerator for Scripted {
        fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            match self.reply {
                Ok(ref text) => Ok(text.clone()),
                Err(reason) => Err(reason.into()),
            }
        }
    }
}

#[test]
fn test_completion_text_extracts_first_choice() {
    let reply = json!({
        "choices": [
            { "message": { "role": "assistant", "content": "{\"items\":[]}" } },
            { "message": { "role": "assistant", "content": "ignored" } },
        ]
    });
    assert_eq!(completion_text(&reply), "{\"items\":[]}");
    assert_eq!(completion_text(&json!({ "choices": [] })), "{}");
    assert_eq!(completion_text(&json!({ "error": "nope" })), "{}");
}

#[test]
fn test_openai_request_body_asks_for_json() {
    let gen = OpenAiGenerator::new("key", "https://api.example.com/v1/", "gpt-4o-mini", Duration::from_secs(8));
    let body = gen.body(&GenerationRequest {
        system: "sys".into(),
        prompt: "user".into(),
        temperature: 0.0,
        max_tokens: 500,
    });
    assert_eq!(gen.base_url, "https://api.example.com/v1");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 500);
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "user");
}

#[test]
fn test_generate_with_timeout_passes_result_through() {
    let scripted = mock::Scripted::replying("{\"ok\":true}");
    let gen: Arc<dyn TextGenerator> = scripted.clone();
    let req = GenerationRequest { system: String::new(), prompt: String::new(), temperature: 0.0, max_tokens: 1 };
    let text = generate_with_timeout(&gen, req, Duration::from_secs(5)).unwrap();
    assert_eq!(text, "{\"ok\":true}");
    assert_eq!(scripted.calls(), 1);
}

#[test]
fn test_generate_with_timeout_gives_up() {
    let gen: Arc<dyn TextGenerator> = mock::Scripted::slow("{}", Duration::from_millis(500));
    let req = GenerationRequest { system: String::new(), prompt: String::new(), temperature: 0.0, max_tokens: 1 };
    let err = generate_with_timeout(&gen, req, Duration::from_millis(20)).unwrap_err();
    match *err.kind() {
        ErrorKind::GenerationTimeout(20) => (),
        ref other => panic!("unexpected error {:?}", other),
    }
}
