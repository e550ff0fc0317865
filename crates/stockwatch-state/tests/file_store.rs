use chrono::{DateTime, Duration, TimeZone, Utc};
use stockwatch_core::{Snapshot, StateStore, StoreStatus};
use stockwatch_state::{FileStateStore, StateError, STATE_FILE};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, hour, 0, 0).unwrap()
}

fn sample(hour: u32, available: bool) -> Snapshot {
    Snapshot::success(
        at(hour),
        "iPhone 17 Pro",
        vec![StoreStatus {
            store_id: "R623".to_string(),
            display_name: "Aventura".to_string(),
            city: "Aventura".to_string(),
            region: "FL".to_string(),
            available,
            availability_note: "Available Today".to_string(),
        }],
    )
}

#[tokio::test]
async fn load_from_empty_directory_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::open(dir.path()).await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
    assert_eq!(store.age(at(10)).await.unwrap(), None);
}

#[tokio::test]
async fn new_does_not_create_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-yet");
    let store = FileStateStore::new(&missing);
    assert!(!missing.exists());
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn open_creates_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("state").join("cache");
    let store = FileStateStore::open(&nested).await.unwrap();
    assert!(nested.is_dir());
    assert_eq!(store.dir(), nested.as_path());
}

#[tokio::test]
async fn save_then_load_returns_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::open(dir.path()).await.unwrap();

    store.save(&sample(10, true)).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(sample(10, true)));

    store.save(&sample(11, false)).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(sample(11, false)));
}

#[tokio::test]
async fn save_leaves_no_temp_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::open(dir.path()).await.unwrap();
    store.save(&sample(10, true)).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![STATE_FILE.to_string()]);
}

#[tokio::test]
async fn failure_snapshot_is_rejected_and_state_kept() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::open(dir.path()).await.unwrap();
    store.save(&sample(10, true)).await.unwrap();

    let failed = Snapshot::failure(at(11), "iPhone 17 Pro", "timeout");
    let err = store.save(&failed).await.unwrap_err();
    assert!(matches!(err, StateError::FailureSnapshot));
    assert_eq!(store.load().await.unwrap(), Some(sample(10, true)));
}

#[tokio::test]
async fn corrupt_state_file_is_treated_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(STATE_FILE), b"{not json").unwrap();

    let store = FileStateStore::open(dir.path()).await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);

    // A corrupt slot is overwritten by the next good save.
    store.save(&sample(10, true)).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(sample(10, true)));
}

#[tokio::test]
async fn hand_written_failure_record_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(STATE_FILE),
        br#"{"timestamp":"2026-01-15T10:00:00Z","product_label":"x","outcome":{"status":"failure","reason":"boom"}}"#,
    )
    .unwrap();
    let store = FileStateStore::open(dir.path()).await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn age_is_measured_from_snapshot_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::open(dir.path()).await.unwrap();
    store.save(&sample(10, true)).await.unwrap();
    assert_eq!(
        store.age(at(13)).await.unwrap(),
        Some(Duration::hours(3))
    );
}

#[tokio::test]
async fn clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::open(dir.path()).await.unwrap();
    store.save(&sample(10, true)).await.unwrap();

    store.clear().await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
    store.clear().await.unwrap();
}
