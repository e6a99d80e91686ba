//! Integration tests for LogWatcher against a temporary Steam directory
//!
//! Detection cycles are driven with poll_once so each test controls exactly when the
//! log is checked; one test exercises the timer-driven polling task.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;
use wallpaper_extractor::services::LogWatcher;
use wallpaper_extractor::{ItemRegistry, WorkshopRecord};

type Snapshot = Option<Vec<WorkshopRecord>>;

struct SteamDir {
    _temp: TempDir,
    root: Utf8PathBuf,
    log: Utf8PathBuf,
}

impl SteamDir {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let log = root.join("logs").join("workshop_log.txt");
        fs::create_dir_all(log.parent().unwrap()).unwrap();
        Self {
            _temp: temp,
            root,
            log,
        }
    }

    /// Write the log and push its modification time `offset_secs` into the future, so
    /// successive writes always get distinct mtimes
    fn write(&self, lines: &[String], offset_secs: u64) {
        fs::write(&self.log, lines.join("\n")).unwrap();
        touch(&self.log, offset_secs);
    }
}

fn touch(path: &Utf8Path, offset_secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
        .unwrap();
}

fn subscribed(time: &str, id: &str) -> String {
    format!(
        "[{}] [AppID 431960] Detected workshop change : added subscribed item {}",
        time, id
    )
}

fn channel_watcher(start_time: &str) -> (LogWatcher, mpsc::UnboundedReceiver<Snapshot>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = LogWatcher::new(
        Arc::new(move |snapshot| {
            let _ = tx.send(snapshot);
        }),
        start_time,
        tokio::runtime::Handle::current(),
    );
    (watcher, rx)
}

fn ids(snapshot: Snapshot) -> Vec<String> {
    snapshot
        .expect("log should be readable")
        .into_iter()
        .map(|r| r.id)
        .collect()
}

#[tokio::test]
async fn test_unchanged_mtime_never_notifies_twice() {
    let steam = SteamDir::new();
    steam.write(&[subscribed("2024-03-01 10:00:00", "100")], 10);

    let (watcher, mut rx) = channel_watcher("");
    watcher.start_watching(steam.root.as_str()).unwrap();

    watcher.poll_once();
    assert_eq!(ids(rx.try_recv().unwrap()), vec!["100"]);

    watcher.poll_once();
    watcher.poll_once();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_append_is_reported() {
    let steam = SteamDir::new();
    let mut lines = vec![subscribed("2024-03-01 10:00:00", "100")];
    steam.write(&lines, 10);

    let (watcher, mut rx) = channel_watcher("");
    watcher.start_watching(steam.root.as_str()).unwrap();
    watcher.poll_once();
    rx.try_recv().unwrap();

    lines.push(subscribed("2024-03-01 10:01:00", "200"));
    steam.write(&lines, 20);
    watcher.poll_once();

    assert_eq!(ids(rx.try_recv().unwrap()), vec!["100", "200"]);
}

#[tokio::test]
async fn test_touch_without_content_change_is_silent() {
    let steam = SteamDir::new();
    steam.write(&[subscribed("2024-03-01 10:00:00", "100")], 10);

    let (watcher, mut rx) = channel_watcher("");
    watcher.start_watching(steam.root.as_str()).unwrap();
    watcher.poll_once();
    rx.try_recv().unwrap();

    touch(&steam.log, 30);
    watcher.poll_once();

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_filter_update_renotifies() {
    let steam = SteamDir::new();
    steam.write(
        &[
            subscribed("2024-01-01 00:00:00", "100"),
            subscribed("2024-06-01 00:00:00", "200"),
        ],
        10,
    );

    let (watcher, mut rx) = channel_watcher("");
    watcher.start_watching(steam.root.as_str()).unwrap();
    watcher.poll_once();
    assert_eq!(ids(rx.try_recv().unwrap()), vec!["100", "200"]);

    // the file is unchanged, but the filtered view is not
    watcher.update_start_time("2024-03-01 00:00:00");
    watcher.poll_once();
    assert_eq!(ids(rx.try_recv().unwrap()), vec!["200"]);
}

#[tokio::test]
async fn test_filter_change_removes_registry_items() {
    let steam = SteamDir::new();
    steam.write(
        &[
            subscribed("2024-01-01 00:00:00", "100"),
            subscribed("2024-06-01 00:00:00", "200"),
        ],
        10,
    );

    let registry = ItemRegistry::new();
    let sink = registry.clone();
    let watcher = LogWatcher::new(
        Arc::new(move |snapshot: Snapshot| {
            sink.reconcile(snapshot.as_deref());
        }),
        "",
        tokio::runtime::Handle::current(),
    );
    watcher.start_watching(steam.root.as_str()).unwrap();
    watcher.poll_once();
    assert_eq!(registry.total_count(), 2);

    watcher.update_start_time("2024-03-01 00:00:00");
    watcher.poll_once();

    assert_eq!(registry.total_count(), 1);
    assert!(registry.item("100").is_none());
}

#[tokio::test]
async fn test_log_appearing_later() {
    let steam = SteamDir::new();

    let (watcher, mut rx) = channel_watcher("");
    watcher.start_watching(steam.root.as_str()).unwrap();
    watcher.poll_once();
    assert!(rx.try_recv().is_err());

    steam.write(&[subscribed("2024-03-01 10:00:00", "5")], 10);
    watcher.poll_once();
    assert_eq!(ids(rx.try_recv().unwrap()), vec!["5"]);
}

#[tokio::test]
async fn test_restart_reports_again() {
    let steam = SteamDir::new();
    steam.write(&[subscribed("2024-03-01 10:00:00", "100")], 10);

    let (watcher, mut rx) = channel_watcher("");
    watcher.start_watching(steam.root.as_str()).unwrap();
    watcher.poll_once();
    rx.try_recv().unwrap();

    watcher.stop_watching();
    watcher.poll_once();
    assert!(rx.try_recv().is_err());

    watcher.start_watching(steam.root.as_str()).unwrap();
    watcher.poll_once();
    assert_eq!(ids(rx.try_recv().unwrap()), vec!["100"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_polling_task_reports_changes() {
    let steam = SteamDir::new();
    steam.write(&[subscribed("2024-03-01 10:00:00", "42")], 10);

    let (watcher, mut rx) = channel_watcher("");
    watcher.start_watching(steam.root.as_str()).unwrap();

    let snapshot = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timeout waiting for first snapshot")
        .expect("Channel closed");
    assert_eq!(ids(snapshot), vec!["42"]);

    steam.write(
        &[
            subscribed("2024-03-01 10:00:00", "42"),
            subscribed("2024-03-01 10:05:00", "43"),
        ],
        20,
    );

    let snapshot = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timeout waiting for second snapshot")
        .expect("Channel closed");
    assert_eq!(ids(snapshot), vec!["42", "43"]);

    watcher.stop_watching();
}
