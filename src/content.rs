//! External content collaborators.
//!
//! Registration files and validation payloads live off-chain; the chain
//! only holds their URIs and hashes. These traits are the seams where an
//! application plugs in its own storage. The bundled fetcher speaks
//! `http(s)://` directly and `ipfs://` through a configurable gateway.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ContentError;

const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Fetches referenced content by URI.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, ContentError>;

    /// Fetch and parse as JSON.
    async fn fetch_json(&self, uri: &str) -> Result<serde_json::Value, ContentError> {
        let bytes = self.fetch(uri).await?;
        serde_json::from_slice(&bytes).map_err(|e| ContentError::Fetch {
            uri: uri.to_string(),
            reason: format!("invalid json: {e}"),
        })
    }
}

/// Publishes content and returns the URI it is now reachable under.
///
/// No implementation ships here; pinning services and self-hosted
/// storage differ too much to pick one for the caller.
#[async_trait]
pub trait ContentUploader: Send + Sync {
    async fn upload(&self, content: &[u8], content_type: &str) -> Result<String, ContentError>;
}

/// HTTP-backed fetcher; `ipfs://` URIs are rewritten onto a gateway.
pub struct HttpContentFetcher {
    http: reqwest::Client,
    ipfs_gateway: String,
}

impl HttpContentFetcher {
    pub fn new() -> Self {
        Self::with_gateway(DEFAULT_IPFS_GATEWAY)
    }

    pub fn with_gateway(ipfs_gateway: &str) -> Self {
        HttpContentFetcher {
            http: reqwest::Client::new(),
            ipfs_gateway: ipfs_gateway.trim_end_matches('/').to_string(),
        }
    }

    fn resolve_url(&self, uri: &str) -> Result<String, ContentError> {
        if let Some(cid_path) = uri.strip_prefix("ipfs://") {
            return Ok(format!("{}/{}", self.ipfs_gateway, cid_path));
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(uri.to_string());
        }
        Err(ContentError::UnsupportedScheme(uri.to_string()))
    }
}

impl Default for HttpContentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, ContentError> {
        let url = self.resolve_url(uri)?;
        debug!(%uri, %url, "fetching content");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ContentError::Fetch {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Fetch {
                uri: uri.to_string(),
                reason: format!("http status {status}"),
            });
        }
        let bytes = response.bytes().await.map_err(|e| ContentError::Fetch {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ipfs_uris_are_rewritten_onto_the_gateway() {
        let fetcher = HttpContentFetcher::with_gateway("https://gateway.example/ipfs/");
        let url = fetcher.resolve_url("ipfs://QmabcDEF123/profile.json").unwrap();
        assert_eq!(url, "https://gateway.example/ipfs/QmabcDEF123/profile.json");
    }

    #[test]
    fn http_uris_pass_through_unchanged() {
        let fetcher = HttpContentFetcher::new();
        let url = fetcher.resolve_url("https://agents.example/card.json").unwrap();
        assert_eq!(url, "https://agents.example/card.json");
    }

    #[test]
    fn other_schemes_are_rejected() {
        let fetcher = HttpContentFetcher::new();
        for uri in ["file:///etc/passwd", "ftp://host/x", "data:text/plain,hi"] {
            let err = fetcher.resolve_url(uri).unwrap_err();
            assert!(matches!(err, ContentError::UnsupportedScheme(_)), "{uri}");
        }
    }
}
