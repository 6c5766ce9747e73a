//! Optional archival of finished compilations to an object store.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use rf_core::{Error, Result};

/// Stores finished artifacts under a key derived from their output path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, path: &Path) -> Result<()>;
}

/// Object store speaking plain HTTP PUT with a bearer token.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            token,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, path: &Path) -> Result<()> {
        let body = tokio::fs::read(path).await?;
        let url = format!("{}/{}/{}", self.endpoint, self.bucket, key);
        tracing::debug!(%url, bytes = body.len(), "uploading artifact to object store");

        let mut request = self.client.put(&url).body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

/// Derive the store key for `path`: its components after the output root,
/// joined with `/` regardless of platform.
pub fn object_key(output_root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(output_root).map_err(|_| {
        Error::invalid(format!(
            "{} is not under the output directory {}",
            path.display(),
            output_root.display()
        ))
    })?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn key_is_path_after_output_root() {
        let root = PathBuf::from("output");
        let path = root.join("funny_2025-03-12/result/result.mp4");
        assert_eq!(
            object_key(&root, &path).unwrap(),
            "funny_2025-03-12/result/result.mp4"
        );
    }

    #[test]
    fn path_outside_root_is_invalid() {
        let err = object_key(Path::new("output"), Path::new("/tmp/foo.mp4")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
