//! GitHub contents API backend
//!
//! Each collection is a pretty-printed JSON file in a repository branch.
//! The file's blob SHA is the version token: GitHub rejects a PUT whose
//! `sha` no longer matches the branch head, which gives compare-and-swap
//! semantics without any server-side transaction.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{Collection, DocumentStore, RawSnapshot, VersionToken};
use crate::config::StoreConfig;
use crate::errors::{AppError, Result};

const API_VERSION: &str = "2022-11-28";

/// Contents API client for one repository branch
pub struct GitHubContentStore {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
    data_dir: String,
    /// Client-side bound on each request
    timeout: Duration,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    content: PutContentsFile,
}

#[derive(Deserialize)]
struct PutContentsFile {
    sha: String,
}

impl GitHubContentStore {
    /// Create a new store client
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static(API_VERSION),
        );
        if let Some(token) = &config.token {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| AppError::Configuration {
                    message: format!("Invalid store token: {}", e),
                })?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(concat!("editorial/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            data_dir: config.data_dir.clone(),
        })
    }

    fn contents_url(&self, collection: Collection) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base,
            self.owner,
            self.repo,
            collection.path(&self.data_dir)
        )
    }

    fn blob_url(&self, sha: &str) -> String {
        format!(
            "{}/repos/{}/{}/git/blobs/{}",
            self.api_base, self.owner, self.repo, sha
        )
    }

    fn transport_error(&self, err: reqwest::Error, operation: &str) -> AppError {
        if err.is_timeout() {
            AppError::Timeout {
                operation: format!("store {}", operation),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if err.is_connect() {
            AppError::StoreUnavailable {
                message: err.to_string(),
            }
        } else {
            AppError::HttpClient(err)
        }
    }

    /// Files above the inline limit come back without content
    async fn fetch_blob(&self, sha: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.blob_url(sha))
            .send()
            .await
            .map_err(|e| self.transport_error(e, "blob read"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body, "blob read"));
        }

        let blob: BlobResponse = response.json().await?;
        if blob.encoding != "base64" {
            return Err(AppError::Store {
                message: format!("Unsupported blob encoding: {}", blob.encoding),
            });
        }
        decode_content(&blob.content)
    }
}

#[async_trait]
impl DocumentStore for GitHubContentStore {
    #[instrument(skip(self), fields(collection = %collection))]
    async fn read(&self, collection: Collection) -> Result<RawSnapshot> {
        let response = self
            .client
            .get(self.contents_url(collection))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await
            .map_err(|e| self.transport_error(e, "read"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Collection file not found, treating as empty");
            return Ok(RawSnapshot::empty());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body, "read"));
        }

        let file: ContentsResponse = response.json().await?;
        let inline = file.content.as_deref().unwrap_or("");
        let bytes = if file.encoding.as_deref() == Some("none") || (inline.is_empty() && file.size > 0)
        {
            self.fetch_blob(&file.sha).await?
        } else {
            decode_content(inline)?
        };

        Ok(RawSnapshot {
            documents: parse_documents(&bytes)?,
            token: Some(VersionToken::new(file.sha)),
        })
    }

    #[instrument(skip(self, documents), fields(collection = %collection))]
    async fn write(
        &self,
        collection: Collection,
        documents: &Value,
        expected: Option<&VersionToken>,
        description: &str,
    ) -> Result<VersionToken> {
        let pretty = serde_json::to_string_pretty(documents)?;
        let request = PutContentsRequest {
            message: description,
            content: STANDARD.encode(pretty.as_bytes()),
            branch: &self.branch,
            sha: expected.map(VersionToken::as_str),
        };

        let response = self
            .client
            .put(self.contents_url(collection))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e, "write"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match classify_failure(status, &body, "write") {
                AppError::Conflict { .. } => AppError::Conflict {
                    collection: collection.name().to_string(),
                },
                other => other,
            });
        }

        let saved: PutContentsResponse = response.json().await?;
        Ok(VersionToken::new(saved.content.sha))
    }

    async fn ping(&self) -> Result<()> {
        let url = format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e, "ping"))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(classify_failure(status, &body, "ping"))
        }
    }

    fn backend_name(&self) -> &'static str {
        "github"
    }
}

/// Decode base64 file content; the API wraps it at 60 columns
fn decode_content(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| AppError::Store {
        message: format!("Invalid base64 content: {}", e),
    })
}

/// Parse a collection file; `null` and blank files read as empty
fn parse_documents(bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Array(Vec::new()));
    }
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Null => Ok(Value::Array(Vec::new())),
        documents @ Value::Array(_) => Ok(documents),
        _ => Err(AppError::Store {
            message: "Collection file is not a JSON array".to_string(),
        }),
    }
}


/// Map a non-success response onto the error taxonomy
fn classify_failure(status: StatusCode, body: &str, operation: &str) -> AppError {
    let lowered = body.to_ascii_lowercase();
    match status {
        StatusCode::CONFLICT => AppError::Conflict {
            collection: String::new(),
        },
        // "sha" wasn't supplied / does not match
        StatusCode::UNPROCESSABLE_ENTITY if lowered.contains("sha") => AppError::Conflict {
            collection: String::new(),
        },
        StatusCode::TOO_MANY_REQUESTS => AppError::StoreUnavailable {
            message: format!("{} rate limited", operation),
        },
        StatusCode::FORBIDDEN if lowered.contains("rate limit") => AppError::StoreUnavailable {
            message: format!("{} rate limited", operation),
        },
        s if s.is_server_error() => AppError::StoreUnavailable {
            message: format!("{} failed with {}", operation, s),
        },
        s => AppError::Store {
            message: format!("{} failed with {}: {}", operation, s, body),
        },
    }
}
