//! Staged uploads, asset replacement, deletion, and publish toggling against
//! in-memory stores and a stub gateway.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::TestApp;
use vidshare_core::assets::{AssetKind, AssetSlot, IncomingFiles, UploadPlan};
use vidshare_core::duration::MediaDuration;
use vidshare_core::error::CoreError;
use vidshare_core::media::MediaStore;
use vidshare_core::orphans::{OrphanLog, OrphanReason};

// ---------------------------------------------------------------------------
// stage_upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_required_asset_makes_no_gateway_calls() {
    let t = TestApp::new();
    let mut files = IncomingFiles::new();
    files.insert(AssetSlot::Thumbnail, t.local_file("thumb.png", b"img"));

    let result = t.state.assets.stage_upload(files, &UploadPlan::VIDEO).await;

    assert_matches!(result, Err(CoreError::MissingRequiredAsset(AssetSlot::Video)));
    assert_eq!(t.gateway.calls(), 0);
    assert_eq!(t.tmp_file_count(), 0, "unused temp files must be removed");
}

#[tokio::test]
async fn empty_required_file_counts_as_missing() {
    let t = TestApp::new();
    let mut files = IncomingFiles::new();
    files.insert(AssetSlot::Video, t.local_file("clip.mp4", b""));

    let result = t.state.assets.stage_upload(files, &UploadPlan::VIDEO).await;

    assert_matches!(result, Err(CoreError::MissingRequiredAsset(AssetSlot::Video)));
    assert_eq!(t.gateway.calls(), 0);
    assert_eq!(t.tmp_file_count(), 0);
}

#[tokio::test]
async fn successful_stage_reports_assets_and_duration() {
    let t = TestApp::new();
    t.gateway.set_video_duration(99.6);
    let mut files = IncomingFiles::new();
    files.insert(AssetSlot::Video, t.local_file("clip.mp4", b"video"));
    files.insert(AssetSlot::Thumbnail, t.local_file("thumb.png", b"img"));

    let staged = t
        .state
        .assets
        .stage_upload(files, &UploadPlan::VIDEO)
        .await
        .expect("stage");

    assert_eq!(staged.len(), 2);
    let video = staged.required(AssetSlot::Video).expect("video");
    assert_eq!(video.kind, AssetKind::Video);
    assert!(video.url.starts_with("https://"), "secure url is persisted");
    assert_eq!(
        staged.duration(),
        Some(MediaDuration {
            minutes: 1,
            seconds: 40
        })
    );
    assert_eq!(t.tmp_file_count(), 0);
}

#[tokio::test]
async fn optional_failure_still_succeeds_without_field() {
    let t = TestApp::new();
    t.gateway.fail_uploads_matching("thumb");
    let mut files = IncomingFiles::new();
    files.insert(AssetSlot::Video, t.local_file("clip.mp4", b"video"));
    files.insert(AssetSlot::Thumbnail, t.local_file("thumb.png", b"img"));

    let staged = t
        .state
        .assets
        .stage_upload(files, &UploadPlan::VIDEO)
        .await
        .expect("optional failure must not abort");

    assert!(staged.get(AssetSlot::Video).is_some());
    assert!(staged.get(AssetSlot::Thumbnail).is_none());
    assert_eq!(t.tmp_file_count(), 0);
}

#[tokio::test]
async fn required_failure_uploads_no_optional_and_leaves_nothing() {
    let t = TestApp::new();
    t.gateway.fail_uploads_matching("clip");
    let mut files = IncomingFiles::new();
    files.insert(AssetSlot::Video, t.local_file("clip.mp4", b"video"));
    files.insert(AssetSlot::Thumbnail, t.local_file("thumb.png", b"img"));

    let result = t.state.assets.stage_upload(files, &UploadPlan::VIDEO).await;

    assert_matches!(
        result,
        Err(CoreError::UploadFailed {
            slot: AssetSlot::Video,
            ..
        })
    );
    assert_eq!(t.gateway.upload_calls(), 1, "optional upload never attempted");
    assert_eq!(t.gateway.live_count(), 0);
    assert_eq!(t.tmp_file_count(), 0);
    assert_eq!(t.media.len().await, 0);
}

#[tokio::test]
async fn timed_out_upload_fails_and_is_logged_as_orphan() {
    let t = TestApp::with_config(|c| c.upload.timeout = Duration::from_millis(50));
    t.gateway.set_upload_delay(Duration::from_millis(500));
    let mut files = IncomingFiles::new();
    files.insert(AssetSlot::Video, t.local_file("clip.mp4", b"video"));

    let result = t.state.assets.stage_upload(files, &UploadPlan::VIDEO).await;

    assert_matches!(result, Err(CoreError::UploadFailed { .. }));
    let orphans = t.orphans.list_recent(10).await.expect("orphans");
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].reason, OrphanReason::UploadTimedOut);
    assert_eq!(orphans[0].kind, AssetKind::Video);
    assert_eq!(t.tmp_file_count(), 0);
}

#[tokio::test]
async fn discard_staged_deletes_uploaded_assets() {
    let t = TestApp::new();
    let mut files = IncomingFiles::new();
    files.insert(AssetSlot::Avatar, t.local_file("me.png", b"img"));
    files.insert(AssetSlot::CoverImage, t.local_file("cover.png", b"img"));

    let staged = t
        .state
        .assets
        .stage_upload(files, &UploadPlan::PROFILE)
        .await
        .expect("stage");
    assert_eq!(t.gateway.live_count(), 2);

    t.state.assets.discard_staged(staged, None).await;
    assert_eq!(t.gateway.live_count(), 0);
}

// ---------------------------------------------------------------------------
// replace_asset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn replace_upload_failure_leaves_record_and_old_asset() {
    let t = TestApp::new();
    let video = t.seed_video(1, true).await;
    let old_thumb = video.thumbnail.clone().expect("thumbnail");
    t.gateway.fail_uploads_matching("new-thumb");

    let result = t
        .state
        .assets
        .replace_asset(video.id, AssetSlot::Thumbnail, t.local_file("new-thumb.png", b"img"))
        .await;

    assert_matches!(
        result,
        Err(CoreError::UploadFailed {
            slot: AssetSlot::Thumbnail,
            ..
        })
    );
    let after = t.media.find_by_id(video.id).await.unwrap().unwrap();
    assert_eq!(after, video);
    assert!(t.gateway.is_live(&old_thumb.remote_id));
    assert_eq!(t.gateway.delete_calls(), 0);
    assert_eq!(t.tmp_file_count(), 0);
}

#[tokio::test]
async fn replace_swaps_reference_then_deletes_old() {
    let t = TestApp::new();
    let video = t.seed_video(1, true).await;
    let old_thumb = video.thumbnail.clone().expect("thumbnail");

    let replaced = t
        .state
        .assets
        .replace_asset(video.id, AssetSlot::Thumbnail, t.local_file("new.png", b"img"))
        .await
        .expect("replace");

    assert!(replaced.cleanup_warning.is_none());
    assert_eq!(replaced.record.thumbnail.as_ref(), Some(&replaced.asset));
    assert!(!t.gateway.is_live(&old_thumb.remote_id));
    assert!(t.gateway.is_live(&replaced.asset.remote_id));
}

#[tokio::test]
async fn replace_old_delete_failure_is_warning_not_error() {
    let t = TestApp::new();
    let video = t.seed_video(1, true).await;
    let old_thumb = video.thumbnail.clone().expect("thumbnail");
    t.gateway.fail_delete_of(&old_thumb.remote_id);

    let replaced = t
        .state
        .assets
        .replace_asset(video.id, AssetSlot::Thumbnail, t.local_file("new.png", b"img"))
        .await
        .expect("replacement succeeds despite cleanup failure");

    assert!(replaced.cleanup_warning.is_some());
    let after = t.media.find_by_id(video.id).await.unwrap().unwrap();
    assert_eq!(after.thumbnail, Some(replaced.asset.clone()));

    let orphans = t.orphans.list_recent(10).await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].reason, OrphanReason::SupersededDeleteFailed);
    assert_eq!(orphans[0].remote_id.as_deref(), Some(old_thumb.remote_id.as_str()));
    assert_eq!(orphans[0].media_id, Some(video.id));
}

#[tokio::test]
async fn replace_video_updates_duration() {
    let t = TestApp::new();
    let video = t.seed_video(1, false).await;
    t.gateway.set_video_duration(59.4);

    let replaced = t
        .state
        .assets
        .replace_asset(video.id, AssetSlot::Video, t.local_file("cut.mp4", b"video"))
        .await
        .expect("replace");

    assert_eq!(
        replaced.record.duration,
        MediaDuration {
            minutes: 0,
            seconds: 59
        }
    );
    assert!(!t.gateway.is_live(&video.video.remote_id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replaces_leave_no_unreferenced_asset() {
    let t = TestApp::new();
    let video = t.seed_video(1, true).await;
    let old_thumb = video.thumbnail.clone().expect("thumbnail");
    let id = video.id;
    t.gateway.set_upload_delay(Duration::from_millis(50));

    let a = {
        let assets = t.state.assets.clone();
        let file = t.local_file("a.png", b"img-a");
        tokio::spawn(async move { assets.replace_asset(id, AssetSlot::Thumbnail, file).await })
    };
    let b = {
        let assets = t.state.assets.clone();
        let file = t.local_file("b.png", b"img-b");
        tokio::spawn(async move { assets.replace_asset(id, AssetSlot::Thumbnail, file).await })
    };
    let a = a.await.expect("join").expect("replace a");
    let b = b.await.expect("join").expect("replace b");
    assert!(a.cleanup_warning.is_none());
    assert!(b.cleanup_warning.is_none());

    let after = t.media.find_by_id(id).await.unwrap().unwrap();
    let current = after.thumbnail.expect("thumbnail").remote_id;
    assert!(current == a.asset.remote_id || current == b.asset.remote_id);

    // Only the record's two assets survive remotely; the losing upload and
    // the original thumbnail were both deleted.
    assert!(!t.gateway.is_live(&old_thumb.remote_id));
    assert!(t.gateway.is_live(&current));
    assert!(t.gateway.is_live(&video.video.remote_id));
    assert_eq!(t.gateway.live_count(), 2);
    assert!(t.orphans.list_recent(10).await.unwrap().is_empty());
    assert_eq!(t.tmp_file_count(), 0);
}

#[tokio::test]
async fn replace_on_missing_record_uploads_nothing() {
    let t = TestApp::new();
    let result = t
        .state
        .assets
        .replace_asset(404, AssetSlot::Thumbnail, t.local_file("x.png", b"img"))
        .await;

    assert_matches!(result, Err(CoreError::NotFound { id: 404, .. }));
    assert_eq!(t.gateway.calls(), 0);
    assert_eq!(t.tmp_file_count(), 0);
}

// ---------------------------------------------------------------------------
// delete_media_and_assets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_assets_then_record() {
    let t = TestApp::new();
    let video = t.seed_video(1, true).await;

    let deleted = t
        .state
        .assets
        .delete_media_and_assets(video.id)
        .await
        .expect("delete");

    assert_eq!(deleted.id, video.id);
    assert_eq!(t.gateway.live_count(), 0);
    assert!(t.media.find_by_id(video.id).await.unwrap().is_none());
}

#[tokio::test]
async fn partial_delete_failure_keeps_record() {
    let t = TestApp::new();
    let video = t.seed_video(1, true).await;
    let thumb = video.thumbnail.clone().unwrap();
    t.gateway.fail_delete_of(&thumb.remote_id);

    let result = t.state.assets.delete_media_and_assets(video.id).await;

    assert_matches!(result, Err(CoreError::AssetDeletionFailed(_)));
    assert!(t.media.find_by_id(video.id).await.unwrap().is_some());
    assert!(!t.gateway.is_live(&video.video.remote_id));

    // Once the gateway recovers, a retry converges: the already-deleted
    // video counts as deleted.
    t.gateway.clear_failures();
    t.state
        .assets
        .delete_media_and_assets(video.id)
        .await
        .expect("retry");
    assert!(t.media.find_by_id(video.id).await.unwrap().is_none());
    assert_eq!(t.gateway.live_count(), 0);
}

#[tokio::test]
async fn delete_missing_record_is_not_found() {
    let t = TestApp::new();
    assert_matches!(
        t.state.assets.delete_media_and_assets(9).await,
        Err(CoreError::NotFound { id: 9, .. })
    );
    assert_eq!(t.gateway.calls(), 0);
}

// ---------------------------------------------------------------------------
// toggle_publish
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_from_true_end_true() {
    let t = TestApp::new();
    let video = t.seed_video(1, false).await;
    assert!(video.is_published);

    let a = {
        let assets = t.state.assets.clone();
        tokio::spawn(async move { assets.toggle_publish(video.id).await })
    };
    let b = {
        let assets = t.state.assets.clone();
        tokio::spawn(async move { assets.toggle_publish(video.id).await })
    };
    let mut results = vec![
        a.await.unwrap().expect("toggle"),
        b.await.unwrap().expect("toggle"),
    ];
    results.sort();

    assert_eq!(results, vec![false, true]);
    let after = t.media.find_by_id(video.id).await.unwrap().unwrap();
    assert!(after.is_published);
}

#[tokio::test]
async fn toggle_missing_record_is_not_found() {
    let t = TestApp::new();
    assert_matches!(
        t.state.assets.toggle_publish(77).await,
        Err(CoreError::NotFound { id: 77, .. })
    );
}
