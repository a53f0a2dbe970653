//! Uploads oversized files to a Zipline instance and returns a share link.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use tracing::info;

use crate::config::ZiplineConfig;

#[derive(Debug)]
pub enum ZiplineError {
    Read(std::io::Error),
    Http(String),
    Api(String),
}

impl std::fmt::Display for ZiplineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZiplineError::Read(e) => write!(f, "failed to read upload: {e}"),
            ZiplineError::Http(e) => write!(f, "HTTP error: {e}"),
            ZiplineError::Api(e) => write!(f, "Zipline error: {e}"),
        }
    }
}

impl std::error::Error for ZiplineError {}

pub struct ZiplineClient {
    config: ZiplineConfig,
    http: reqwest::Client,
}

impl ZiplineClient {
    pub fn new(config: ZiplineConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Host name shown to users while uploading.
    pub fn host(&self) -> &str {
        let url = self.config.url.as_str();
        url.split_once("://").map(|(_, rest)| rest).unwrap_or(url)
    }

    /// How long uploaded links stay valid, as sent to Zipline (e.g. "1h").
    pub fn expires_at(&self) -> &str {
        &self.config.expires_at
    }

    /// Upload `path` and return the link Zipline hands back.
    pub async fn upload(&self, path: &Path) -> Result<String, ZiplineError> {
        let data = tokio::fs::read(path).await.map_err(ZiplineError::Read)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        info!("Uploading {} ({} bytes) to Zipline", name, data.len());

        let form = Form::new().part("file", Part::bytes(data).file_name(name));
        let mut request = self
            .http
            .post(format!("{}/api/upload", self.config.url))
            .header("authorization", &self.config.token)
            .header("Format", "uuid")
            .header("No-JSON", "true")
            .header("Original-Name", "true")
            .header("Expires-At", &self.config.expires_at)
            .multipart(form);
        if let Some(ref folder) = self.config.folder {
            request = request.header("x-zipline-folder", folder);
        }

        let response = request.send().await.map_err(|e| ZiplineError::Http(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ZiplineError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(ZiplineError::Api(format!("{status}: {body}")));
        }

        let link = body.trim().to_string();
        if link.is_empty() {
            return Err(ZiplineError::Api("empty response".to_string()));
        }
        info!("Zipline upload complete: {link}");
        Ok(link)
    }
}
