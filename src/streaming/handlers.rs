use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use bytes::Bytes;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::media::list_recent;
use super::server::ServerState;
use crate::capture::CaptureState;

/// Handler for MJPEG streaming endpoint
pub async fn mjpeg_stream_handler(State(state): State<ServerState>) -> impl IntoResponse {
    info!("New MJPEG stream client connected");

    let stream = async_stream::stream! {
        let _viewer = state.stats.connect();
        let mut frame_interval = interval(state.target_frame_interval);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frames_streamed = 0u64;
        let stream_start = std::time::Instant::now();

        loop {
            frame_interval.tick().await;

            if state.capture.state() == CaptureState::Stopped {
                info!("Capture stopped; ending MJPEG stream after {} frames", frames_streamed);
                break;
            }

            let capture = state.capture.clone();
            let jpeg = match tokio::task::spawn_blocking(move || capture.get_jpeg()).await {
                Ok(jpeg) => jpeg,
                Err(e) => {
                    warn!("Frame encoding task failed: {}", e);
                    break;
                }
            };

            let frame_size = jpeg.len();
            frames_streamed += 1;
            state.stats.record_frame(frame_size);

            let part_header = format!(
                "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
                frame_size
            );

            yield Ok::<_, std::io::Error>(Bytes::from(part_header));
            yield Ok(Bytes::from(jpeg));
            yield Ok(Bytes::from_static(b"\r\n"));

            if frames_streamed % 100 == 0 {
                let elapsed = stream_start.elapsed().as_secs_f64();
                debug!(
                    "Viewer streamed {} frames at {:.1} FPS",
                    frames_streamed,
                    frames_streamed as f64 / elapsed.max(f64::EPSILON)
                );
            }
        }
    };

    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "multipart/x-mixed-replace; boundary=frame",
            ),
            (header::CACHE_CONTROL, "no-cache, private"),
            (header::PRAGMA, "no-cache"),
        ],
        Body::from_stream(stream),
    )
}

/// Handler for health check endpoint
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let capture_stats = state.capture.stats();

    let health_info = serde_json::json!({
        "status": "ok",
        "capture_state": state.capture.state().as_str(),
        "recording": state.capture.is_recording(),
        "capture": capture_stats,
        "viewers": state.stats.snapshot(),
    });

    (StatusCode::OK, Json(health_info))
}

/// Recent photo and video file names, newest first
pub async fn media_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let photos = list_recent(&state.photos_dir, state.recent_photos).await;
    let videos = list_recent(&state.videos_dir, state.recent_videos).await;

    Json(serde_json::json!({
        "photos": photos,
        "videos": videos,
    }))
}

/// Stop the capture loop; the process shuts down once it exits
pub async fn shutdown_handler(State(state): State<ServerState>) -> impl IntoResponse {
    info!("Shutdown requested over HTTP");
    state.capture.stop();
    Json(serde_json::json!({ "stopped": true }))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn media_list(prefix: &str, names: &[String]) -> String {
    if names.is_empty() {
        return "<li class=\"empty\">none yet</li>".to_string();
    }

    names
        .iter()
        .map(|name| {
            let name = escape_html(name);
            format!("<li><a href=\"/{prefix}/{name}\">{name}</a></li>")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Live view with the most recent photos and videos
pub async fn index_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let photos = list_recent(&state.photos_dir, state.recent_photos).await;
    let videos = list_recent(&state.videos_dir, state.recent_videos).await;

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Homecam</title>
    <style>
        :root {{ color-scheme: dark; }}
        body {{
            margin: 0;
            background: #000;
            color: #ddd;
            font-family: sans-serif;
        }}
        img.stream {{
            display: block;
            max-width: 100vw;
            max-height: 80vh;
            margin: 0 auto;
            object-fit: contain;
            background: #000;
        }}
        section {{ padding: 0 1em; }}
        a {{ color: #8cf; }}
    </style>
</head>
<body>
    <img class="stream" src="/stream.mjpg" alt="Live stream">
    <section>
        <h2>Photos</h2>
        <ul>
{photos}
        </ul>
        <h2>Videos</h2>
        <ul>
{videos}
        </ul>
    </section>
</body>
</html>
"#,
        photos = media_list("photos", &photos),
        videos = media_list("videos", &videos),
    );

    Html(html)
}
