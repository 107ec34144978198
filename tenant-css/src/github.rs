#![doc = "GitHub contents API reader implementing the core `SourceControl` seam."]
//!
//! `path` arguments are API paths such as
//! `/repos/{owner}/{repo}/contents/scss`; the reader prepends the API base
//! and appends `?ref={reference}`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tenant_css_core::contract::{DirectoryEntry, EntryKind, SourceControl};
use tenant_css_core::error::SourceControlError;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

pub struct GitHubReader {
    client: Client,
    api_base: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

impl GitHubReader {
    pub fn new(api_base: Option<&str>, token: Option<String>) -> Self {
        let api_base = api_base
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        tracing::info!(
            api_base = %api_base,
            token_set = token.as_ref().is_some_and(|t| !t.is_empty()),
            "Initialized GitHubReader"
        );
        GitHubReader {
            client: Client::new(),
            api_base,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    fn request(&self, path: &str, reference: &str, accept: &str) -> RequestBuilder {
        let url = format!("{}{}", self.api_base, path);
        let mut request = self
            .client
            .get(url)
            .query(&[("ref", reference)])
            .header(USER_AGENT, "tenant-css")
            .header(ACCEPT, accept);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }
        request
    }

    async fn send(
        &self,
        path: &str,
        reference: &str,
        accept: &str,
    ) -> Result<reqwest::Response, SourceControlError> {
        let response = self
            .request(path, reference, accept)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, path, reference, "GitHub transport error");
                SourceControlError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, path, reference, "GitHub returned error status");
            return Err(SourceControlError::Status {
                path: path.to_string(),
                reference: reference.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn entry_from(item: ContentItem) -> DirectoryEntry {
    match item.kind.as_str() {
        "dir" => DirectoryEntry::dir(item.name),
        _ => DirectoryEntry {
            name: item.name,
            kind: EntryKind::File,
        },
    }
}

#[async_trait]
impl SourceControl for GitHubReader {
    async fn list_directory(
        &self,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirectoryEntry>, SourceControlError> {
        let response = self.send(path, reference, JSON_MEDIA_TYPE).await?;
        let items: Vec<ContentItem> =
            response
                .json()
                .await
                .map_err(|e| SourceControlError::Listing {
                    path: path.to_string(),
                    message: e.to_string(),
                })?;
        tracing::info!(path, reference, count = items.len(), "Listed GitHub directory");
        Ok(items.into_iter().map(entry_from).collect())
    }

    async fn read_file(&self, path: &str, reference: &str) -> Result<Vec<u8>, SourceControlError> {
        let response = self.send(path, reference, RAW_MEDIA_TYPE).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceControlError::Transport(e.to_string()))?;
        tracing::debug!(path, reference, bytes = bytes.len(), "Read GitHub file");
        Ok(bytes.to_vec())
    }
}
