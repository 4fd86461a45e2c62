use std::time::Duration;
use chrono::offset::Utc;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use ureq;

use crate::errors::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUpload {
    pub signed_url: String,
    pub file_path: String,
    pub public_url: String,
}

/// Object storage that can hand out short-lived upload URLs.
pub trait ObjectStorage: Send + Sync {
    /// Returns a signed URL that allows uploading (or replacing) `path`.
    fn sign_upload(&self, path: &str) -> Result<String>;
    fn public_url(&self, path: &str) -> String;
}

pub struct SupabaseStorage {
    base_url: String,
    service_key: String,
    bucket: String,
    timeout: Duration,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, service_key: &str, bucket: &str, timeout: Duration) -> Self {
        SupabaseStorage {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
            timeout,
        }
    }
}

impl ObjectStorage for SupabaseStorage {
    fn sign_upload(&self, path: &str) -> Result<String> {
        if self.base_url.is_empty() {
            bail!("Object storage isn't configured.");
        }
        let url = format!("{}/storage/v1/object/upload/sign/{}/{}", self.base_url, self.bucket, path);
        let resp = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.service_key))
            .set("apikey", &self.service_key)
            .set("x-upsert", "true")
            .timeout(self.timeout)
            .send_json(json!({}));

        if !resp.ok() {
            warn!("Signing an upload URL failed: {} {}", resp.status(), resp.status_text());
            bail!(ErrorKind::ServiceError("object storage", resp.status()));
        }

        let reply: Value = resp.into_json()?;
        let signed = try_or!(reply.get("url").and_then(Value::as_str),
                             else bail!("The storage reply had no signed URL."));

        Ok(format!("{}/storage/v1{}", self.base_url, signed))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path)
    }
}

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]").expect("a valid regex");
}

/// `{user}/{epoch millis}_{file name}`, with the file name reduced to
/// characters that are safe in an object key.
pub fn upload_path(user_id: i32, file_name: &str, millis: i64) -> String {
    let name = file_name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or("");
    let name = UNSAFE_CHARS.replace_all(name, "_");
    let name = if name.trim_matches('.').is_empty() { "upload".into() } else { name };
    format!("{}/{}_{}", user_id, millis, name)
}

pub fn signed_upload_url(storage: &dyn ObjectStorage, user_id: i32, file_name: &str) -> Result<SignedUpload> {
    let file_path = upload_path(user_id, file_name, Utc::now().timestamp_millis());
    let signed_url = storage.sign_upload(&file_path)?;
    debug!("Signed an upload URL for {:?}.", file_path);

    Ok(SignedUpload {
        public_url: storage.public_url(&file_path),
        signed_url,
        file_path,
    })
}

#[test]
fn test_upload_path_sanitises_names() {
    assert_eq!(upload_path(4, "notes.pdf", 1_700_000_000_000), "4/1700000000000_notes.pdf");
    assert_eq!(upload_path(4, "my book (v2).pdf", 1), "4/1_my_book__v2_.pdf");
    assert_eq!(upload_path(4, "../../etc/passwd", 1), "4/1_passwd");
    assert_eq!(upload_path(4, "C:\\docs\\Résumé.pdf", 1), "4/1_R_sum_.pdf");
    assert_eq!(upload_path(4, "..", 1), "4/1_upload");
}

#[test]
fn test_signed_upload_uses_storage() {
    struct Fake;
    impl ObjectStorage for Fake {
        fn sign_upload(&self, path: &str) -> Result<String> {
            Ok(format!("https://storage.example.com/sign/{}?token=t", path))
        }
        fn public_url(&self, path: &str) -> String {
            format!("https://storage.example.com/public/{}", path)
        }
    }

    let upload = signed_upload_url(&Fake, 9, "a b.pdf").unwrap();
    assert!(upload.file_path.starts_with("9/"));
    assert!(upload.file_path.ends_with("_a_b.pdf"));
    assert_eq!(upload.public_url, format!("https://storage.example.com/public/{}", upload.file_path));
    assert!(upload.signed_url.contains(&upload.file_path));
}

#[test]
fn test_supabase_public_url() {
    let storage = SupabaseStorage::new("https://proj.supabase.co/", "key", "pdf-uploads", Duration::from_secs(5));
    assert_eq!(storage.public_url("1/2_a.pdf"),
               "https://proj.supabase.co/storage/v1/object/public/pdf-uploads/1/2_a.pdf");
}
