//! Oversized media: download, decide, and hand off to Zipline against mocked
//! media and Zipline servers.

use cobaltfox::bot::relay::{plan, Delivery};
use cobaltfox::config::ZiplineConfig;
use cobaltfox::download::{download_to, Downloaded};
use cobaltfox::zipline::ZiplineClient;
use httpmock::prelude::*;

const LIMIT: u64 = 2048;

#[tokio::test]
async fn test_oversized_file_goes_to_zipline() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/media/clip.mp4");
            then.status(200).body(vec![5u8; 3000]);
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/upload")
                .header("authorization", "zip-token")
                .header("original-name", "true")
                .body_contains("clip.mp4");
            then.status(200).body("https://zip.example.com/u/clip.mp4");
        })
        .await;

    let http = reqwest::Client::new();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip.mp4");

    // Fetched under a roomier cap, then judged against the Telegram limit.
    let downloaded = download_to(&http, &server.url("/media/clip.mp4"), &dest, 4 * LIMIT)
        .await
        .unwrap();
    assert_eq!(downloaded, Downloaded::File { path: dest.clone(), size: 3000 });

    assert_eq!(plan(&downloaded, LIMIT, false, false), Delivery::Link);
    assert_eq!(plan(&downloaded, LIMIT, true, false), Delivery::Upload);

    let zipline = ZiplineClient::new(
        ZiplineConfig {
            url: server.base_url(),
            token: "zip-token".to_string(),
            folder: None,
            expires_at: "1h".to_string(),
        },
        http,
    );
    let link = zipline.upload(&dest).await.unwrap();

    upload.assert_hits_async(1).await;
    assert_eq!(link, "https://zip.example.com/u/clip.mp4");
}

#[tokio::test]
async fn test_advertised_oversize_is_never_written() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/media/huge.mp4");
            then.status(200).body(vec![0u8; 3000]);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("huge.mp4");
    let downloaded = download_to(&reqwest::Client::new(), &server.url("/media/huge.mp4"), &dest, LIMIT)
        .await
        .unwrap();

    assert_eq!(downloaded, Downloaded::TooLarge { size: 3000 });
    assert!(!dest.exists());
    assert_eq!(plan(&downloaded, LIMIT, true, false), Delivery::Link);
}
