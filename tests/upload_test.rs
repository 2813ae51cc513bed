//! Integration tests for the upload dispatcher.

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use common::{Harness, ScriptedProber};
use discforge::failures::FailureCache;
use discforge::upload::UploadDispatcher;
use discforge_db::models::UploadStatus;

fn dispatcher(h: &Harness) -> UploadDispatcher {
    UploadDispatcher::in_memory(
        h.state.join("upload.lock"),
        Duration::ZERO,
        vec!["-mediainfo.json".into(), ".nfo".into()],
    )
    .unwrap()
}

#[tokio::test]
async fn bulk_upload_is_idempotent() {
    let h = Harness::new();
    let placeholder = h.add_title("Movie (2020)", "Movie.2020.BluRay.iso");
    let nfo = placeholder.with_file_name("Movie (2020).nfo");
    fs::write(&nfo, "<movie/>").unwrap();

    let uploads = dispatcher(&h);
    let first = uploads.upload_all(&h.root).await.unwrap();
    assert_eq!(first.uploaded, 1);
    assert_eq!(first.failed, 0);

    let target = h.remote.join("Movie.2020.BluRay.nfo");
    assert_eq!(fs::read_to_string(&target).unwrap(), "<movie/>");
    let before = uploads.get(&nfo).unwrap().unwrap();
    assert_eq!(before.status, UploadStatus::Success);

    // A second run must not copy again: remote edits survive and the cache
    // entry is untouched.
    fs::write(&target, "edited remotely").unwrap();
    fs::write(&nfo, "<movie>changed</movie>").unwrap();

    let second = uploads.upload_all(&h.root).await.unwrap();
    assert_eq!(second.uploaded, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(fs::read_to_string(&target).unwrap(), "edited remotely");
    assert_eq!(uploads.get(&nfo).unwrap().unwrap(), before);
}

#[tokio::test]
async fn reset_makes_bulk_upload_copy_again() {
    let h = Harness::new();
    let placeholder = h.add_title("Movie", "movie.iso");
    let nfo = placeholder.with_file_name("Movie.nfo");
    fs::write(&nfo, "v1").unwrap();

    let uploads = dispatcher(&h);
    uploads.upload_all(&h.root).await.unwrap();
    fs::write(&nfo, "v2").unwrap();

    assert!(uploads.reset(&nfo).unwrap());
    let report = uploads.upload_all(&h.root).await.unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(fs::read_to_string(h.remote.join("movie.nfo")).unwrap(), "v2");
}

#[tokio::test]
async fn upload_without_placeholder_fails_without_record() {
    let h = Harness::new();
    let orphan = h.root.join("orphan.nfo");
    fs::write(&orphan, "x").unwrap();

    let uploads = dispatcher(&h);
    assert!(uploads.upload_file(&orphan).await.is_err());
    assert!(uploads.get(&orphan).unwrap().is_none());
}

#[tokio::test]
async fn scan_uploads_new_descriptors() {
    let h = Harness::new();
    let placeholder = h.add_title("Movie (2020)", "Movie.2020.BluRay.iso");
    let uploads = dispatcher(&h);

    let orchestrator = h
        .orchestrator(
            Arc::new(ScriptedProber::healthy()),
            FailureCache::in_memory(3).unwrap(),
        )
        .with_uploader(uploads.clone());
    let report = orchestrator.scan(&h.root).await.unwrap();
    assert_eq!(report.processed.len(), 1);

    let local = h.descriptor_for(&placeholder);
    let remote = h.remote.join("Movie.2020.BluRay-mediainfo.json");
    assert_eq!(fs::read(&local).unwrap(), fs::read(&remote).unwrap());
    assert_eq!(
        uploads.get(&local).unwrap().unwrap().status,
        UploadStatus::Success
    );
    assert_eq!(uploads.stats().unwrap().success, 1);
}

#[tokio::test]
async fn uploads_are_serialized_system_wide() {
    let h = Harness::new();
    let placeholder = h.add_title("Movie", "movie.iso");
    let a = placeholder.with_file_name("Movie.nfo");
    let b = placeholder.with_file_name("Movie-mediainfo.json");
    fs::write(&a, "a").unwrap();
    fs::write(&b, "{}").unwrap();

    let uploads = UploadDispatcher::in_memory(
        h.state.join("upload.lock"),
        Duration::from_millis(300),
        vec!["-mediainfo.json".into(), ".nfo".into()],
    )
    .unwrap();

    let start = std::time::Instant::now();
    let (ra, rb) = tokio::join!(uploads.upload_file(&a), uploads.upload_file(&b));
    ra.unwrap();
    rb.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(600));
}
