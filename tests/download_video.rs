use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Body,
    extract::Query,
    http::{Request, StatusCode, header},
    routing::get,
};
use clipgrab::{
    AppState, ResolveError, build_cors_layer, build_dispatcher,
    config::config_from_pairs,
    providers::youtube::{StreamFormat, VideoMetadata, YouTubeClient},
    router,
    routes::LIVENESS_MESSAGE,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
const MEDIA_BYTES: &[u8] = b"not really an mp4";
const AUDIO_BYTES: &[u8] = b"not really a webm";

struct FakeYouTube {
    metadata: VideoMetadata,
}

#[async_trait]
impl YouTubeClient for FakeYouTube {
    async fn fetch_metadata(&self, _url: &str) -> Result<VideoMetadata, ResolveError> {
        Ok(self.metadata.clone())
    }
}

// Local stand-in for the TikTok resolver API and a media CDN.
async fn spawn_upstream() -> String {
    let app = Router::new()
        .route(
            "/api/",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let url = params.get("url").cloned().unwrap_or_default();
                if url.contains("missing") {
                    Json(json!({ "code": -1, "msg": "Url parsing is failed!" }))
                } else {
                    Json(json!({ "code": 0, "data": { "play": "https://v16.example/play.mp4" } }))
                }
            }),
        )
        .route("/media/clip.mp4", get(|| async { MEDIA_BYTES }))
        .route(
            "/media/track.webm",
            get(|| async { ([(header::CONTENT_TYPE, "audio/webm")], AUDIO_BYTES) }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn combined_format(base: &str) -> StreamFormat {
    StreamFormat {
        format_id: "18".to_string(),
        url: Some(format!("{base}/media/clip.mp4")),
        protocol: Some("http".to_string()),
        ext: Some("mp4".to_string()),
        vcodec: Some("avc1.42001E".to_string()),
        acodec: Some("mp4a.40.2".to_string()),
        height: Some(360),
        ..Default::default()
    }
}

fn audio_only_format(base: &str) -> StreamFormat {
    StreamFormat {
        format_id: "251".to_string(),
        url: Some(format!("{base}/media/track.webm")),
        protocol: Some("https".to_string()),
        ext: Some("webm".to_string()),
        vcodec: Some("none".to_string()),
        acodec: Some("opus".to_string()),
        abr: Some(130.0),
        ..Default::default()
    }
}

async fn test_app(extra_env: &[(&str, &str)]) -> (Router, String) {
    test_app_with(extra_env, |base| vec![combined_format(base)]).await
}

async fn test_app_with(
    extra_env: &[(&str, &str)],
    formats: fn(&str) -> Vec<StreamFormat>,
) -> (Router, String) {
    let base = spawn_upstream().await;
    let resolver = format!("{base}/api/");

    let mut env = vec![("TIKTOK_RESOLVER_URL", resolver.as_str())];
    env.extend_from_slice(extra_env);
    let config = config_from_pairs(&env).unwrap();

    let youtube = FakeYouTube {
        metadata: VideoMetadata {
            title: Some("My Video!".to_string()),
            formats: formats(&base),
        },
    };
    let dispatcher = build_dispatcher(&config, reqwest::Client::new(), Arc::new(youtube));
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        stream_client: reqwest::Client::new(),
    };

    (router(state, build_cors_layer(&[]).unwrap()), base)
}

async fn post_raw(app: &Router, path: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: &Router, body: Value) -> (StatusCode, Value) {
    post_raw(app, "/download-video", &body.to_string()).await
}

fn assert_failure(body: &Value) {
    assert_eq!(body["success"], false);
    assert!(
        body["message"].as_str().is_some_and(|message| !message.is_empty()),
        "missing message in {body}"
    );
}

#[tokio::test]
async fn health_check_is_plain_text() {
    let (app, _) = test_app(&[]).await;

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], LIVENESS_MESSAGE.as_bytes());
}

#[tokio::test]
async fn missing_or_empty_url_is_bad_request() {
    let (app, _) = test_app(&[]).await;

    for body in [json!({}), json!({ "url": "" }), json!({ "url": "  ", "format": "mp3" })] {
        let (status, body) = post_json(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_failure(&body);
    }
}

#[tokio::test]
async fn malformed_body_keeps_uniform_failure_shape() {
    let (app, _) = test_app(&[]).await;

    let (status, body) = post_raw(&app, "/download-video", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body);
}

#[tokio::test]
async fn unsupported_platform_is_bad_request() {
    let (app, _) = test_app(&[]).await;

    let (status, body) = post_json(&app, json!({ "url": "https://vimeo.com/1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unsupported platform");

    let (status, _) = post_json(
        &app,
        json!({ "url": "https://vimeo.com/1", "platform": "vimeo" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn youtube_mp4_resolves_to_direct_url() {
    let (app, base) = test_app(&[]).await;

    let (status, body) = post_json(&app, json!({ "url": WATCH_URL, "format": "mp4" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "source": "youtube",
            "format": "mp4",
            "filename": "My_Video.mp4",
            "downloadUrl": format!("{base}/media/clip.mp4"),
        })
    );
}

#[tokio::test]
async fn youtube_mp3_without_audio_only_format_is_server_error() {
    let (app, _) = test_app(&[]).await;

    let (status, body) = post_json(&app, json!({ "url": WATCH_URL, "format": "mp3" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "No suitable mp3 format found");
}

#[tokio::test]
async fn malformed_youtube_link_is_bad_request() {
    let (app, _) = test_app(&[]).await;

    let (status, body) = post_json(
        &app,
        json!({ "url": "https://www.youtube.com/feed/trending" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid YouTube URL");
}

#[tokio::test]
async fn tiktok_always_answers_mp4() {
    let (app, _) = test_app(&[]).await;

    let (status, body) = post_json(
        &app,
        json!({ "url": "https://tiktok.com/x", "format": "mp3" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "tiktok");
    assert_eq!(body["format"], "mp4");
    assert_eq!(body["filename"], "tiktok_video.mp4");
    assert_eq!(body["downloadUrl"], "https://v16.example/play.mp4");
}

#[tokio::test]
async fn tiktok_without_play_field_is_server_error() {
    let (app, _) = test_app(&[]).await;

    let (status, body) = post_json(
        &app,
        json!({ "url": "https://www.tiktok.com/@someone/video/missing" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_failure(&body);
}

#[tokio::test]
async fn disabled_provider_is_not_implemented() {
    let (app, _) = test_app(&[("TIKTOK_ENABLED", "false")]).await;

    let (status, body) = post_json(&app, json!({ "url": "https://tiktok.com/x" })).await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["message"], "TikTok not implemented yet");
}

#[tokio::test]
async fn instagram_stub_and_canned_failure() {
    let (app, _) = test_app(&[]).await;

    let (status, body) = post_json(
        &app,
        json!({ "url": "https://www.instagram.com/reel/C1abc/" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "instagram_reel_download.mp4");

    let (status, body) = post_json(
        &app,
        json!({ "url": "https://www.instagram.com/reel/example-fail/", "platform": "instagram" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Instagram link failed to scrape.");
}

#[tokio::test]
async fn platform_hint_must_match_detected_provider() {
    let (app, _) = test_app(&[]).await;

    let (status, body) = post_json(
        &app,
        json!({ "url": WATCH_URL, "platform": "tiktok" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body);
}

#[tokio::test]
async fn stream_video_pipes_media_with_attachment_header() {
    let (app, _) = test_app(&[]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/stream-video")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "url": WATCH_URL }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"My_Video.mp4\"; filename*=UTF-8''My_Video.mp4"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], MEDIA_BYTES);
}

#[tokio::test]
async fn stream_video_mp3_keeps_the_audio_rendition_media_type() {
    let (app, _) = test_app_with(&[], |base| {
        vec![combined_format(base), audio_only_format(base)]
    })
    .await;

    let request = Request::builder()
        .method("POST")
        .uri("/stream-video")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "url": WATCH_URL, "format": "mp3" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/webm");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"My_Video.mp3\"; filename*=UTF-8''My_Video.mp3"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], AUDIO_BYTES);
}

#[tokio::test]
async fn stream_video_is_youtube_only() {
    let (app, _) = test_app(&[]).await;

    let (status, body) = post_raw(
        &app,
        "/stream-video",
        &json!({ "url": "https://tiktok.com/x" }).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_failure(&body);
}
