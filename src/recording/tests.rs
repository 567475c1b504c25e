use super::testing::FakeSinkFactory;
use super::*;
use crate::frame::Frame;
use crate::notify::{Notification, Notifier};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    controller: RecordingController,
    log: Arc<Mutex<super::testing::SinkLog>>,
    notifications: UnboundedReceiver<Notification>,
    _dir: tempfile::TempDir,
    photos_dir: PathBuf,
}

fn settings_in(dir: &Path, hold: Duration) -> RecordingSettings {
    RecordingSettings {
        hold,
        photos_dir: dir.join("photos"),
        videos_dir: dir.join("videos"),
        fps: 20,
        resolution: (32, 24),
        timezone: Some(chrono_tz::UTC),
        messages: NotificationMessages {
            started: "started".to_string(),
            ended: "ended".to_string(),
            photo_caption: "Snapshot".to_string(),
        },
    }
}

fn harness_with(factory: FakeSinkFactory, hold: Duration) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path(), hold);
    let photos_dir = settings.photos_dir.clone();
    let log = Arc::clone(&factory.log);
    let (notifier, notifications) = Notifier::channel();

    Harness {
        controller: RecordingController::new(settings, Box::new(factory), notifier),
        log,
        notifications,
        _dir: dir,
        photos_dir,
    }
}

fn harness(hold: Duration) -> Harness {
    harness_with(FakeSinkFactory::default(), hold)
}

fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

fn frame() -> Frame {
    Frame::blank(32, 24)
}

#[test]
fn test_idle_without_motion() {
    let mut h = harness(Duration::from_secs(7));
    let t0 = Instant::now();

    for i in 0..10 {
        let transition = h
            .controller
            .update(false, &frame(), t0 + Duration::from_millis(i * 50));
        assert_eq!(transition, Transition::None);
    }

    assert_eq!(h.controller.state(), RecordingState::Idle);
    assert!(h.log.lock().opened.is_empty());
    assert!(drain(&mut h.notifications).is_empty());
}

#[test]
fn test_motion_starts_session_with_ordered_side_effects() {
    let mut h = harness(Duration::from_secs(7));
    let t0 = Instant::now();

    let transition = h.controller.update(true, &frame(), t0);

    let Transition::Started {
        video_path,
        snapshot_path,
    } = transition
    else {
        panic!("expected a started transition");
    };
    let snapshot_path = snapshot_path.expect("snapshot should be saved");
    assert!(snapshot_path.exists());
    assert!(snapshot_path.starts_with(&h.photos_dir));
    assert!(video_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("motion_"));

    assert!(h.controller.is_recording());
    assert_eq!(h.controller.last_motion_time(), Some(t0));
    assert_eq!(h.log.lock().opened, vec![video_path]);
    // The triggering frame is the first frame of the video
    assert_eq!(h.log.lock().writes, 1);

    assert_eq!(
        drain(&mut h.notifications),
        vec![
            Notification::Text("started".to_string()),
            Notification::Photo {
                path: snapshot_path,
                caption: "Snapshot".to_string(),
            },
        ]
    );
}

#[test]
fn test_repeated_motion_extends_single_session() {
    let mut h = harness(Duration::from_secs(7));
    let t0 = Instant::now();

    h.controller.update(true, &frame(), t0);
    for i in 1..=20 {
        let transition = h
            .controller
            .update(true, &frame(), t0 + Duration::from_millis(i * 100));
        assert_eq!(transition, Transition::None);
    }

    assert_eq!(h.controller.sessions_started(), 1);
    assert_eq!(h.log.lock().opened.len(), 1);
    assert_eq!(h.log.lock().writes, 21);
    assert_eq!(
        h.controller.last_motion_time(),
        Some(t0 + Duration::from_millis(2000))
    );

    let started = drain(&mut h.notifications)
        .into_iter()
        .filter(|n| *n == Notification::Text("started".to_string()))
        .count();
    assert_eq!(started, 1);
}

#[test]
fn test_hold_time_is_strictly_exceeded() {
    let hold = Duration::from_secs(7);
    let mut h = harness(hold);
    let t0 = Instant::now();

    h.controller.update(true, &frame(), t0);
    drain(&mut h.notifications);

    // Exactly at the hold boundary the session continues
    assert_eq!(h.controller.update(false, &frame(), t0 + hold), Transition::None);
    assert!(h.controller.is_recording());

    let transition = h
        .controller
        .update(false, &frame(), t0 + hold + Duration::from_millis(1));
    let Transition::Stopped { frames_written, .. } = transition else {
        panic!("expected a stopped transition");
    };

    assert_eq!(frames_written, 2);
    assert!(!h.controller.is_recording());
    assert_eq!(h.log.lock().closes, 1);
    assert_eq!(
        drain(&mut h.notifications),
        vec![Notification::Text("ended".to_string())]
    );

    // Nothing is written after the close
    h.controller
        .update(false, &frame(), t0 + hold + Duration::from_secs(1));
    assert_eq!(h.log.lock().writes, 2);
    assert_eq!(h.log.lock().closes, 1);
}

#[test]
fn test_motion_refreshes_hold_clock() {
    let hold = Duration::from_secs(7);
    let mut h = harness(hold);
    let t0 = Instant::now();

    h.controller.update(true, &frame(), t0);
    h.controller.update(true, &frame(), t0 + Duration::from_secs(5));

    let after_first_hold = t0 + hold + Duration::from_secs(1);
    assert_eq!(
        h.controller.update(false, &frame(), after_first_hold),
        Transition::None
    );
    assert!(h.controller.is_recording());

    let after_refreshed_hold = t0 + Duration::from_secs(5) + hold + Duration::from_millis(1);
    assert!(matches!(
        h.controller.update(false, &frame(), after_refreshed_hold),
        Transition::Stopped { .. }
    ));
}

#[test]
fn test_zero_hold_stops_on_next_later_cycle() {
    let mut h = harness(Duration::ZERO);
    let t0 = Instant::now();

    assert!(matches!(
        h.controller.update(true, &frame(), t0),
        Transition::Started { .. }
    ));
    assert!(h.controller.is_recording());

    assert!(matches!(
        h.controller
            .update(false, &frame(), t0 + Duration::from_millis(1)),
        Transition::Stopped { .. }
    ));
}

#[test]
fn test_new_session_after_stop() {
    let hold = Duration::from_secs(1);
    let mut h = harness(hold);
    let t0 = Instant::now();

    h.controller.update(true, &frame(), t0);
    h.controller.update(false, &frame(), t0 + Duration::from_secs(2));
    assert!(!h.controller.is_recording());

    assert!(matches!(
        h.controller.update(true, &frame(), t0 + Duration::from_secs(3)),
        Transition::Started { .. }
    ));
    assert_eq!(h.controller.sessions_started(), 2);
    assert_eq!(h.log.lock().opened.len(), 2);
    assert_eq!(h.log.lock().closes, 1);
}

#[test]
fn test_finish_closes_without_notification() {
    let mut h = harness(Duration::from_secs(7));
    let t0 = Instant::now();

    h.controller.update(true, &frame(), t0);
    drain(&mut h.notifications);

    h.controller.finish();
    h.controller.finish();

    assert!(!h.controller.is_recording());
    assert_eq!(h.log.lock().closes, 1);
    assert!(drain(&mut h.notifications).is_empty());
}

#[test]
fn test_drop_closes_open_session() {
    let h = harness(Duration::from_secs(7));
    let log = Arc::clone(&h.log);
    let Harness {
        mut controller,
        _dir,
        ..
    } = h;

    controller.update(true, &frame(), Instant::now());
    drop(controller);

    assert_eq!(log.lock().closes, 1);
}

#[test]
fn test_writer_open_failure_keeps_session_active() {
    let factory = FakeSinkFactory {
        fail_open: true,
        ..Default::default()
    };
    let mut h = harness_with(factory, Duration::from_secs(1));
    let t0 = Instant::now();

    assert!(matches!(
        h.controller.update(true, &frame(), t0),
        Transition::Started { .. }
    ));
    let session = h.controller.current_session().unwrap();
    assert!(!session.has_writer());

    let notes = drain(&mut h.notifications);
    assert_eq!(notes[0], Notification::Text("started".to_string()));

    assert!(matches!(
        h.controller.update(false, &frame(), t0 + Duration::from_secs(2)),
        Transition::Stopped {
            frames_written: 0,
            ..
        }
    ));
    assert_eq!(
        drain(&mut h.notifications),
        vec![Notification::Text("ended".to_string())]
    );
}

#[test]
fn test_write_failures_counted_and_writer_still_closed() {
    let factory = FakeSinkFactory {
        fail_writes: true,
        ..Default::default()
    };
    let mut h = harness_with(factory, Duration::from_secs(1));
    let t0 = Instant::now();

    h.controller.update(true, &frame(), t0);
    h.controller
        .update(true, &frame(), t0 + Duration::from_millis(500));
    assert_eq!(h.controller.current_session().unwrap().write_failures(), 2);

    h.controller.update(false, &frame(), t0 + Duration::from_secs(2));
    assert_eq!(h.log.lock().closes, 1);
    assert!(!h.controller.is_recording());
}

#[test]
fn test_snapshot_failure_skips_photo_notification() {
    let mut h = harness(Duration::from_secs(7));
    // A regular file where the photos directory should be
    std::fs::write(&h.photos_dir, b"blocked").unwrap();

    let transition = h.controller.update(true, &frame(), Instant::now());
    assert!(matches!(
        transition,
        Transition::Started {
            snapshot_path: None,
            ..
        }
    ));
    assert!(h.controller.is_recording());
    assert_eq!(
        drain(&mut h.notifications),
        vec![Notification::Text("started".to_string())]
    );
}

#[test]
fn test_disabled_notifier_does_not_affect_state_machine() {
    let dir = tempfile::tempdir().unwrap();
    let factory = FakeSinkFactory::default();
    let log = Arc::clone(&factory.log);
    let mut controller = RecordingController::new(
        settings_in(dir.path(), Duration::from_secs(1)),
        Box::new(factory),
        Notifier::disabled(),
    );
    let t0 = Instant::now();

    controller.update(true, &frame(), t0);
    assert!(controller.is_recording());
    controller.update(false, &frame(), t0 + Duration::from_secs(2));
    assert!(!controller.is_recording());
    assert_eq!(log.lock().closes, 1);
}

#[test]
fn test_settings_from_config() {
    let mut config = crate::config::HomecamConfig::default();
    config.recording.hold_seconds = 3;
    config.recording.timestamp_timezone = Some("Europe/Paris".to_string());

    let settings = RecordingSettings::from_config(&config);
    assert_eq!(settings.hold, Duration::from_secs(3));
    assert_eq!(settings.resolution, config.camera.resolution);
    assert_eq!(settings.timezone, Some(chrono_tz::Europe::Paris));
    assert_eq!(settings.messages.photo_caption, "Snapshot");
}
