use super::*;
use crate::camera::SyntheticSource;
use crate::config::HomecamConfig;
use crate::error::{HomecamError, StreamError};
use crate::recording::testing::FakeSinkFactory;
use std::path::Path;
use std::time::Duration;

fn test_config(dir: &Path) -> HomecamConfig {
    let mut config = HomecamConfig::default();
    config.camera.resolution = (64, 48);
    config.camera.fps = 50;
    config.stream.ip = "127.0.0.1".to_string();
    config.stream.port = 0;
    config.recording.photos_dir = dir.join("media/photos").display().to_string();
    config.recording.videos_dir = dir.join("media/videos").display().to_string();
    config.notifier.bot_token = String::new();
    config.notifier.chat_id = String::new();
    config
}

async fn build(config: HomecamConfig) -> HomecamOrchestrator {
    let (width, height) = config.camera.resolution;
    HomecamOrchestrator::with_components(
        config,
        Box::new(SyntheticSource::new(width, height)),
        Box::new(FakeSinkFactory::default()),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = build(test_config(dir.path())).await;

    assert!(dir.path().join("media/photos").is_dir());
    assert!(dir.path().join("media/videos").is_dir());
    assert!(orchestrator.capture_handle().is_none());
    assert!(orchestrator.notification_worker.is_none());

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.len(), 4);
    assert!(states.values().all(|s| *s == ComponentState::Stopped));
}

#[tokio::test]
async fn test_component_state_tracking() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = build(test_config(dir.path())).await;

    orchestrator
        .set_component_state("capture", ComponentState::Starting)
        .await;
    assert_eq!(
        orchestrator.get_component_state("capture").await,
        Some(ComponentState::Starting)
    );
    assert_eq!(orchestrator.get_component_state("display").await, None);
}

#[tokio::test]
async fn test_run_requires_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = build(test_config(dir.path())).await;

    assert!(matches!(
        orchestrator.run().await,
        Err(HomecamError::System { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_twice_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = build(test_config(dir.path())).await;

    orchestrator.start().await.unwrap();
    assert!(orchestrator.start().await.is_err());
    assert_eq!(orchestrator.shutdown().await.unwrap(), 0);
}

#[cfg(feature = "streaming")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bind_failure_marks_streaming_failed() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    config.stream.port = occupied.local_addr().unwrap().port();

    let mut orchestrator = build(config).await;
    assert!(matches!(
        orchestrator.start().await,
        Err(HomecamError::Stream(StreamError::BindFailed { .. }))
    ));
    assert_eq!(
        orchestrator.get_component_state("streaming").await,
        Some(ComponentState::Failed)
    );

    assert_eq!(orchestrator.shutdown().await.unwrap(), 0);
    assert_eq!(
        orchestrator.get_component_state("capture").await,
        Some(ComponentState::Stopped)
    );
}

#[cfg(feature = "streaming")]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_http_shutdown_ends_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = build(test_config(dir.path())).await;
    orchestrator.start().await.unwrap();

    let addr = orchestrator.server_address().unwrap();
    let base = format!("http://{}", addr);

    let body = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["capture_state"], "running");

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/shutdown", base))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let exit_code = tokio::time::timeout(Duration::from_secs(10), orchestrator.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 0);

    let states = orchestrator.get_all_component_states().await;
    assert!(states.values().all(|s| *s == ComponentState::Stopped));
    assert!(!orchestrator.capture_handle().unwrap().is_running());

}

#[test]
fn test_capture_stop_timeout_outlasts_video_finalize() {
    use super::shutdown::capture_stop_timeout;
    use crate::recording::FINALIZE_TIMEOUT;

    let read_timeout_ms = HomecamConfig::default().camera.read_timeout_ms;
    let budget = capture_stop_timeout(read_timeout_ms);
    assert!(budget > FINALIZE_TIMEOUT + Duration::from_millis(read_timeout_ms));

    let slow_camera = capture_stop_timeout(30_000);
    assert!(slow_camera > FINALIZE_TIMEOUT + Duration::from_secs(30));
}
