//! Client for a Cobalt media-resolution instance.

use serde::Deserialize;
use tracing::{debug, info};

use crate::request::MediaRequest;

/// Cobalt reports this when it resolved the link but the source had nothing.
pub const EMPTY_FETCH_CODE: &str = "error.api.fetch.empty";

pub struct Client {
    api_url: String,
    api_key: String,
    http: reqwest::Client,
}

/// One candidate in a picker response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PickerItem {
    /// `photo`, `video` or `gif`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub url: String,
    #[serde(default)]
    pub thumb: Option<String>,
}

/// A single file Cobalt can hand over directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Media {
    pub url: String,
    pub filename: String,
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum ApiResponse {
    Tunnel(Media),
    Redirect(Media),
    Picker { picker: Vec<PickerItem> },
    Error { error: ApiError },
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize)]
struct ApiError {
    code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Media(Media),
    Picker(Vec<PickerItem>),
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    /// Cobalt refused the link (non-2xx) with this error code.
    Rejected(String),
    /// Cobalt accepted the link but failed while processing it.
    Processing(String),
    Parse(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Rejected(code) => write!(f, "Cobalt rejected the link: {code}"),
            Error::Processing(code) => write!(f, "Cobalt processing error: {code}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl Client {
    pub fn new(api_url: String, api_key: String, http: reqwest::Client) -> Self {
        Self { api_url, api_key, http }
    }

    pub async fn resolve(&self, request: &MediaRequest) -> Result<Resolution, Error> {
        info!("Resolving {}", request.url);

        let mut builder = self
            .http
            .post(&self.api_url)
            .header("Accept", "application/json")
            .header("User-Agent", "cobaltfox")
            .json(request);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Api-Key {}", self.api_key));
        }

        let response = builder.send().await.map_err(|e| Error::Http(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| Error::Http(e.to_string()))?;
        debug!("Cobalt response status: {status}");

        let parsed = serde_json::from_str::<ApiResponse>(&body);

        if !status.is_success() {
            let code = match parsed {
                Ok(ApiResponse::Error { error }) => error.code,
                _ => format!("http.{}", status.as_u16()),
            };
            return Err(Error::Rejected(code));
        }

        match parsed.map_err(|e| Error::Parse(e.to_string()))? {
            ApiResponse::Tunnel(media) | ApiResponse::Redirect(media) => Ok(Resolution::Media(media)),
            ApiResponse::Picker { picker } => Ok(Resolution::Picker(picker)),
            ApiResponse::Error { error } => Err(Error::Processing(error.code)),
            ApiResponse::Unsupported => Err(Error::Parse(format!("unsupported response: {body}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::parse_request;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer, key: &str) -> Client {
        Client::new(server.url("/"), key.to_string(), reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_tunnel_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("authorization", "Api-Key secret")
                    .header("user-agent", "cobaltfox")
                    .json_body(json!({
                        "url": "https://youtu.be/x",
                        "filenameStyle": "basic",
                        "downloadMode": "audio"
                    }));
                then.status(200).json_body(json!({
                    "status": "tunnel",
                    "url": "https://cobalt.example.com/tunnel?id=1",
                    "filename": "video.mp3"
                }));
            })
            .await;

        let req = parse_request("https://youtu.be/x m=audio").unwrap();
        let resolved = client(&server, "secret").resolve(&req).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            resolved,
            Resolution::Media(Media {
                url: "https://cobalt.example.com/tunnel?id=1".to_string(),
                filename: "video.mp3".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_redirect_is_media() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "status": "redirect", "url": "https://cdn.example.com/a.mp4", "filename": "a.mp4"
                }));
            })
            .await;
        let req = parse_request("https://example.com/v").unwrap();
        let resolved = client(&server, "").resolve(&req).await.unwrap();
        assert!(matches!(resolved, Resolution::Media(m) if m.filename == "a.mp4"));
    }

    #[tokio::test]
    async fn test_picker_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "status": "picker",
                    "picker": [
                        { "type": "photo", "url": "https://cdn.example.com/1.jpg", "thumb": "https://cdn.example.com/1t.jpg" },
                        { "type": "video", "url": "https://cdn.example.com/2.mp4" }
                    ]
                }));
            })
            .await;
        let req = parse_request("https://example.com/post").unwrap();
        let Resolution::Picker(items) = client(&server, "").resolve(&req).await.unwrap() else {
            panic!("expected picker");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind.as_deref(), Some("photo"));
        assert_eq!(items[0].thumb.as_deref(), Some("https://cdn.example.com/1t.jpg"));
        assert_eq!(items[1].thumb, None);
    }

    #[tokio::test]
    async fn test_rejected_with_code() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(400).json_body(json!({
                    "status": "error", "error": { "code": "error.api.fetch.empty" }
                }));
            })
            .await;
        let req = parse_request("https://example.com/v").unwrap();
        let err = client(&server, "").resolve(&req).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(ref code) if code == EMPTY_FETCH_CODE));
    }

    #[tokio::test]
    async fn test_rejected_without_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(502).body("bad gateway");
            })
            .await;
        let req = parse_request("https://example.com/v").unwrap();
        let err = client(&server, "").resolve(&req).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(ref code) if code == "http.502"));
    }

    #[tokio::test]
    async fn test_processing_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "status": "error", "error": { "code": "error.api.content.video.unavailable" }
                }));
            })
            .await;
        let req = parse_request("https://example.com/v").unwrap();
        let err = client(&server, "").resolve(&req).await.unwrap_err();
        assert!(matches!(err, Error::Processing(_)));
    }

    #[tokio::test]
    async fn test_unknown_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "status": "local-processing" }));
            })
            .await;
        let req = parse_request("https://example.com/v").unwrap();
        let err = client(&server, "").resolve(&req).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
