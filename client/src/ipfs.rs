//! Content-addressed document store client.
//!
//! Documents (user profiles, project metadata) live off-chain in IPFS and
//! are referenced on-chain only by their content hash. [`IpfsClient`] talks
//! to the IPFS HTTP API; [`parse_document`] turns fetched bytes into a
//! typed document.
//!
//! A missing, truncated or malformed document is expected in normal
//! operation (the on-chain hash update and the off-chain propagation race),
//! so every read-side failure here is a [`ClientError::ContentDecode`] that
//! callers fold into "document absent" rather than a hard fault.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::errors::{ClientError, Result};

pub trait ContentStore {
    /// Fetch the full document body for a content hash.
    fn cat(&self, hash: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Store a document and return its content hash.
    fn add(&self, bytes: Vec<u8>) -> impl Future<Output = Result<String>> + Send;
}

pub struct IpfsClient {
    http: reqwest::Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

impl IpfsClient {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(IpfsClient {
            http,
            base: base.into(),
        })
    }
}

impl ContentStore for IpfsClient {
    async fn cat(&self, hash: &str) -> Result<Vec<u8>> {
        debug!("ipfs cat {hash}");

        let response = self
            .http
            .post(format!("{}/api/v0/cat", self.base))
            .query(&[("arg", hash)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ClientError::ContentDecode(format!("cat {hash}: {e}")))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::ContentDecode(format!("cat {hash}: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn add(&self, bytes: Vec<u8>) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name("document.json");
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/v0/add", self.base))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let added: AddResponse = response.json().await?;
        debug!("ipfs add -> {}", added.hash);
        Ok(added.hash)
    }
}

// ─────────────────────────────────────────────────────────
// Document codecs
// ─────────────────────────────────────────────────────────

/// Decode a fetched document: UTF-8, then JSON. Empty bodies are decode
/// failures too; the chain can point at a document that never propagated.
pub fn parse_document<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ClientError::ContentDecode(format!("not utf-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(ClientError::ContentDecode("empty document".to_string()));
    }
    serde_json::from_str(text).map_err(|e| ClientError::ContentDecode(e.to_string()))
}

/// Encode a document for storage.
pub fn to_document<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}
