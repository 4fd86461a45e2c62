use std::time::Duration;
use data_encoding::BASE64URL_NOPAD;
use serde::Deserialize;
use serde_json::Value;
use ureq;

use crate::errors::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub email: String,
    pub name: Option<String>,
}

/// Turns an opaque identity token into a verified identity.
pub trait IdentityVerifier: Send + Sync {
    fn provider(&self) -> &'static str;
    fn verify(&self, token: &str) -> Result<Identity>;
}

/// Delegates verification to Google's token info endpoint and checks the audience.
pub struct GoogleVerifier {
    client_id: String,
    endpoint: String,
    timeout: Duration,
}

#[derive(Deserialize, Debug)]
struct GoogleTokenInfo {
    aud: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

impl GoogleVerifier {
    pub fn new(client_id: &str, timeout: Duration) -> Self {
        GoogleVerifier {
            client_id: client_id.to_string(),
            endpoint: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            timeout,
        }
    }

    fn identity(&self, info: GoogleTokenInfo) -> Result<Identity> {
        if info.aud.as_ref().map(String::as_str) != Some(self.client_id.as_str()) {
            warn!("Google token was issued for another audience: {:?}", info.aud);
            bail!(ErrorKind::InvalidToken("Google"));
        }
        let email = try_or!(info.email, else bail!(ErrorKind::InvalidToken("Google")));
        Ok(Identity { email, name: info.name })
    }
}

impl IdentityVerifier for GoogleVerifier {
    fn provider(&self) -> &'static str {
        "google"
    }

    fn verify(&self, token: &str) -> Result<Identity> {
        let resp = ureq::get(&self.endpoint)
            .query("id_token", token)
            .timeout(self.timeout)
            .call();

        if resp.synthetic() {
            bail!(ErrorKind::ServiceError("Google token info", resp.status()));
        }
        if !resp.ok() {
            bail!(ErrorKind::InvalidToken("Google"));
        }
        let info: GoogleTokenInfo = resp.into_json_deserialize()?;
        self.identity(info)
    }
}

/// Reads the claims of an Apple identity token without checking its signature.
pub struct AppleTokenDecoder;

impl IdentityVerifier for AppleTokenDecoder {
    fn provider(&self) -> &'static str {
        "apple"
    }

    fn verify(&self, token: &str) -> Result<Identity> {
        let claims = jwt_claims(token).chain_err(|| ErrorKind::InvalidToken("Apple"))?;

        if claims.get("sub").and_then(Value::as_str).is_none() {
            bail!(ErrorKind::InvalidToken("Apple"));
        }
        let email = try_or!(claims.get("email").and_then(Value::as_str),
                            else bail!(ErrorKind::InvalidToken("Apple")));

        Ok(Identity { email: email.to_string(), name: None })
    }
}

/// Decodes the payload segment of a JSON Web Token.
pub fn jwt_claims(token: &str) -> Result<Value> {
    let payload = try_or!(token.split('.').nth(1), else bail!("The token has no payload segment."));
    let bytes = BASE64URL_NOPAD.decode(payload.trim_end_matches('=').as_bytes())?;
    let claims: Value = serde_json::from_slice(&bytes)?;
    if !claims.is_object() {
        bail!("The token payload isn't a JSON object.");
    }
    Ok(claims)
}

#[cfg(test)]
fn fake_jwt(claims: &Value) -> String {
    format!("{}.{}.signature",
            BASE64URL_NOPAD.encode(br#"{"alg":"RS256"}"#),
            BASE64URL_NOPAD.encode(claims.to_string().as_bytes()))
}

#[test]
fn test_apple_token_claims() {
    use serde_json::json;

    let token = fake_jwt(&json!({ "sub": "001234.abcd", "email": "reader@example.com" }));
    let identity = AppleTokenDecoder.verify(&token).unwrap();
    assert_eq!(identity, Identity { email: "reader@example.com".into(), name: None });
}

#[test]
fn test_apple_token_without_email_is_invalid() {
    use serde_json::json;

    let token = fake_jwt(&json!({ "sub": "001234.abcd" }));
    let err = AppleTokenDecoder.verify(&token).unwrap_err();
    assert!(err.kind().is_invalid_input());

    let err = AppleTokenDecoder.verify("not-a-token").unwrap_err();
    assert!(err.kind().is_invalid_input());
}

#[test]
fn test_google_audience_must_match() {
    let verifier = GoogleVerifier::new("client-1", Duration::from_secs(5));

    let ok = verifier.identity(GoogleTokenInfo {
        aud: Some("client-1".into()),
        email: Some("Reader@Example.com".into()),
        name: Some("Reader".into()),
    }).unwrap();
    assert_eq!(ok.email, "Reader@Example.com");
    assert_eq!(ok.name.as_ref().map(String::as_str), Some("Reader"));

    let wrong = verifier.identity(GoogleTokenInfo {
        aud: Some("client-2".into()),
        email: Some("reader@example.com".into()),
        name: None,
    });
    assert!(wrong.unwrap_err().kind().is_invalid_input());

    let no_email = verifier.identity(GoogleTokenInfo { aud: Some("client-1".into()), email: None, name: None });
    assert!(no_email.is_err());
}
