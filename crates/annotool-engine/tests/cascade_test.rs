//! Cascading soft delete through the service.

mod helpers;

use annotool_core::{Category, Comment, Entity, Error, Scale, ScaleValue, Track};
use helpers::harness;

#[tokio::test]
async fn test_video_delete_reaches_every_descendant() {
    let h = harness().await;
    let video = h.video("lecture1").await;

    let mut annotation_ids = Vec::new();
    for t in 0..3 {
        let track = h.track(&video, &format!("track-{}", t)).await;
        for a in 0..4 {
            let annotation = h.annotation(&track, a as f64 * 10.0).await;
            h.service
                .create_comment(&h.admin, Comment::new(annotation.id(), "nice"))
                .await
                .unwrap();
            annotation_ids.push(annotation.id());
        }
    }

    let category = h
        .service
        .create_category(&h.admin, Category::for_video(video.id(), "Behavior"))
        .await
        .unwrap();
    h.label(&category, "Happy", "H").await;
    let scale = h
        .service
        .create_scale(&h.admin, Scale::for_video(video.id(), "Agreement"))
        .await
        .unwrap();
    h.service
        .create_scale_value(&h.admin, ScaleValue::new(scale.id(), "yes", 1.0, 1))
        .await
        .unwrap();

    let deleted = h.service.delete_video(&h.admin, video.id()).await.unwrap();
    assert!(deleted.resource.is_deleted());

    let store = h.store();
    assert_eq!(store.tracks.len(), 3);
    assert!(store.tracks.all().iter().all(|t| t.resource.is_deleted()));
    assert_eq!(store.annotations.len(), 12);
    assert!(store
        .annotations
        .all()
        .iter()
        .all(|a| a.resource.is_deleted()));
    assert!(store.comments.all().iter().all(|c| c.resource.is_deleted()));
    assert!(store.categories.all().iter().all(|c| c.resource.is_deleted()));
    assert!(store.labels.all().iter().all(|l| l.resource.is_deleted()));
    assert!(store.scales.all().iter().all(|s| s.resource.is_deleted()));
    assert!(store
        .scale_values
        .all()
        .iter()
        .all(|v| v.resource.is_deleted()));

    for id in annotation_ids {
        let err = h
            .service
            .get::<annotool_core::Annotation>(&h.admin, id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
    let err = h
        .service
        .get::<annotool_core::Video>(&h.admin, video.id())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_children_carry_deleter_stamp() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;
    let annotation = h.annotation(&track, 5.0).await;

    h.service.delete_video(&h.admin, video.id()).await.unwrap();
    let tracks = h.store().tracks.all();
    let deleted = tracks.iter().find(|t| t.id() == track.id()).unwrap();
    assert_eq!(deleted.resource.deleted_by, Some(h.admin.id()));
    assert!(deleted.resource.deleted_at.is_some());

    let annotations = h.store().annotations.all();
    let deleted = annotations
        .iter()
        .find(|a| a.id() == annotation.id())
        .unwrap();
    assert_eq!(deleted.resource.deleted_by, Some(h.admin.id()));
}

#[tokio::test]
async fn test_repeated_delete_keeps_first_stamp() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;
    let other = h.user("second-deleter").await;

    let first = h.service.delete_track(&h.admin, track.id()).await.unwrap();
    let second = h.service.delete_track(&other, track.id()).await.unwrap();

    assert_eq!(second.resource.deleted_at, first.resource.deleted_at);
    assert_eq!(second.resource.deleted_by, Some(h.admin.id()));
}

#[tokio::test]
async fn test_delete_unknown_is_not_found() {
    let h = harness().await;
    let err = h
        .service
        .delete_track(&h.admin, uuid::Uuid::now_v7())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_child_already_gone_is_skipped() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;
    let gone = h.annotation(&track, 1.0).await;
    let kept = h.annotation(&track, 2.0).await;

    h.store()
        .annotations
        .fail_writes_for(gone.id(), |id| Error::NotFound(format!("annotation {}", id)));

    h.service.delete_track(&h.admin, track.id()).await.unwrap();

    let annotations = h.store().annotations.all();
    let kept = annotations.iter().find(|a| a.id() == kept.id()).unwrap();
    assert!(kept.resource.is_deleted());
}

#[tokio::test]
async fn test_child_failure_aborts_as_server_error() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let first = h.track(&video, "first").await;
    let broken = h.track(&video, "broken").await;
    let last = h.track(&video, "last").await;

    h.store()
        .tracks
        .fail_writes_for(broken.id(), |id| Error::Duplicate(format!("track {}", id)));

    let err = h
        .service
        .delete_video(&h.admin, video.id())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Server(_)), "got {:?}", err);

    // Already applied steps stay applied
    let tracks = h.store().tracks.all();
    let state = |id: uuid::Uuid| {
        tracks
            .iter()
            .find(|t: &&Track| t.id() == id)
            .map(|t| t.resource.is_deleted())
            .unwrap()
    };
    assert!(state(first.id()));
    assert!(!state(broken.id()));
    assert!(!state(last.id()));
    assert!(h.store().videos.all()[0].resource.is_deleted());
}

#[tokio::test]
async fn test_deleting_series_master_removes_linked_categories() {
    let h = harness().await;
    let video_a = h.video("lecture1").await;
    let video_b = h.video("lecture2").await;
    let master = h
        .master(&video_a, "courseA", "Behavior", &[("Happy", "H")])
        .await;

    let synced = h
        .service
        .sync_series(&h.admin, video_b.id(), "courseA")
        .await
        .unwrap();
    assert_eq!(synced.len(), 1);
    let linked = synced[0].clone();
    let unrelated = h
        .service
        .create_category(&h.admin, Category::for_video(video_b.id(), "Mood"))
        .await
        .unwrap();

    h.service
        .delete_category(&h.admin, master.id())
        .await
        .unwrap();

    let categories = h.store().categories.all();
    let is_deleted = |id: uuid::Uuid| {
        categories
            .iter()
            .find(|c: &&Category| c.id() == id)
            .unwrap()
            .resource
            .is_deleted()
    };
    assert!(is_deleted(master.id()));
    assert!(is_deleted(linked.id()));
    assert!(!is_deleted(unrelated.id()));
    assert!(h.store().labels.all().iter().all(|l| l.resource.is_deleted()));
}

#[tokio::test]
async fn test_deleting_linked_category_leaves_master() {
    let h = harness().await;
    let video_a = h.video("lecture1").await;
    let video_b = h.video("lecture2").await;
    let master = h.master(&video_a, "courseA", "Behavior", &[]).await;
    let synced = h
        .service
        .sync_series(&h.admin, video_b.id(), "courseA")
        .await
        .unwrap();

    h.service
        .delete_category(&h.admin, synced[0].id())
        .await
        .unwrap();

    let live = h
        .service
        .get::<Category>(&h.admin, master.id())
        .await
        .unwrap();
    assert!(live.is_series_master());
}
