//! Access gate, reference checks and comment threads through the service.

mod helpers;

use annotool_core::{
    Access, Annotation, Capability, Category, Comment, Entity, Error, ListQuery, Tags, Track,
    Video,
};
use helpers::{harness, harness_with};

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_update_annotation_moves_and_stamps() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;
    let mut annotation = Annotation::new(track.id(), 20.0, "look here");
    annotation.duration = Some(10.0);
    let annotation = h
        .service
        .create_annotation(&h.admin, annotation)
        .await
        .unwrap();
    assert!(annotation.resource.updated_at.is_none());

    let mut changes = annotation.clone();
    changes.start = 22.0;
    changes.duration = Some(5.0);
    let updated = h.service.update(&h.admin, &changes).await.unwrap();

    assert_eq!(updated.start, 22.0);
    assert_eq!(updated.duration, Some(5.0));
    assert_eq!(updated.resource.updated_by, Some(h.admin.id()));
    assert!(updated.resource.updated_at.is_some());
    assert_eq!(updated.resource.created_at, annotation.resource.created_at);

    let stored: Annotation = h.service.get(&h.admin, annotation.id()).await.unwrap();
    assert_eq!(stored.start, 22.0);
}

#[tokio::test]
async fn test_update_ignores_parent_change() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let other = h.video("lecture2").await;
    let track = h.track(&video, "Default").await;

    let mut changes = track.clone();
    changes.video_id = other.id();
    changes.name = "Renamed".to_string();
    let updated: Track = h.service.update(&h.admin, &changes).await.unwrap();
    assert_eq!(updated.video_id, video.id());
    assert_eq!(updated.name, "Renamed");
}

#[tokio::test]
async fn test_private_rows_hidden_from_strangers() {
    let h = harness_with(Capability::Annotate).await;
    let stranger = h.user("bob").await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;

    let mut public = Annotation::new(track.id(), 1.0, "public");
    public.resource.access = Access::Public;
    let public = h.service.create_annotation(&h.admin, public).await.unwrap();
    let private = h.annotation(&track, 2.0).await;

    let err = h
        .service
        .get::<Annotation>(&stranger, private.id())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    let seen: Annotation = h.service.get(&stranger, public.id()).await.unwrap();
    assert_eq!(seen.id(), public.id());

    let listed: Vec<Annotation> = h
        .service
        .list(&stranger, &ListQuery::children_of(track.id()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), public.id());

    // The creator keeps seeing their own rows
    let own: Vec<Annotation> = h
        .service
        .list(&h.admin, &ListQuery::children_of(track.id()))
        .await
        .unwrap();
    assert_eq!(own.len(), 2);
}

#[tokio::test]
async fn test_stranger_cannot_update_or_delete() {
    let h = harness_with(Capability::Annotate).await;
    let stranger = h.user("bob").await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;

    let mut changes = track.clone();
    changes.name = "Mine now".to_string();
    let err = h.service.update(&stranger, &changes).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    let err = h.service.delete_track(&stranger, track.id()).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    let still: Track = h.service.get(&h.admin, track.id()).await.unwrap();
    assert_eq!(still.name, "Default");
}

#[tokio::test]
async fn test_video_admin_sees_everything() {
    let h = harness().await;
    let other = h.user("carol").await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;
    let annotation = h.annotation(&track, 3.0).await;

    let seen: Annotation = h.service.get(&other, annotation.id()).await.unwrap();
    assert_eq!(seen.id(), annotation.id());
}

#[tokio::test]
async fn test_missing_parent_is_bad_request() {
    let h = harness().await;
    let err = h
        .service
        .create_track(&h.admin, Track::new(uuid::Uuid::now_v7(), "Default"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let video = h.video("lecture1").await;
    h.service.delete_video(&h.admin, video.id()).await.unwrap();
    let err = h
        .service
        .create_track(&h.admin, Track::new(video.id(), "Default"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn test_dangling_label_reference_is_bad_request() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;

    let mut annotation = Annotation::new(track.id(), 0.0, "tagged");
    annotation.label_id = Some(uuid::Uuid::now_v7());
    let err = h
        .service
        .create_annotation(&h.admin, annotation)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn test_replies_are_two_levels_deep() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;
    let annotation = h.annotation(&track, 0.0).await;
    let other = h.annotation(&track, 5.0).await;

    let top = h
        .service
        .create_comment(&h.admin, Comment::new(annotation.id(), "first"))
        .await
        .unwrap();
    let reply = h
        .service
        .create_comment(&h.admin, Comment::reply(&top, "agreed"))
        .await
        .unwrap();
    assert_eq!(reply.reply_to_id, Some(top.id()));

    // No replies to replies
    let err = h
        .service
        .create_comment(&h.admin, Comment::reply(&reply, "nested"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    // No replies across annotations
    let mut stray = Comment::new(other.id(), "elsewhere");
    stray.reply_to_id = Some(top.id());
    let err = h.service.create_comment(&h.admin, stray).await.unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let top_level = h
        .service
        .list_comments(&h.admin, annotation.id(), None, &ListQuery::new())
        .await
        .unwrap();
    assert_eq!(top_level.len(), 1);
    assert_eq!(top_level[0].id(), top.id());

    let replies = h
        .service
        .list_comments(&h.admin, annotation.id(), Some(top.id()), &ListQuery::new())
        .await
        .unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].id(), reply.id());
}

#[tokio::test]
async fn test_list_applies_tag_filters() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    for (name, pairs) in [
        ("de-lecture", vec![("lang", "de"), ("kind", "lecture")]),
        ("en-lecture", vec![("lang", "en"), ("kind", "lecture")]),
        ("de-seminar", vec![("lang", "de"), ("kind", "seminar")]),
        ("untagged", vec![]),
    ] {
        let mut track = Track::new(video.id(), name);
        track.resource.tags = tags(&pairs);
        h.service.create_track(&h.admin, track).await.unwrap();
    }

    let names = |tracks: Vec<Track>| {
        let mut names: Vec<String> = tracks.into_iter().map(|t| t.name).collect();
        names.sort();
        names
    };

    let all_of = ListQuery::children_of(video.id())
        .with_tags_and(tags(&[("lang", "de"), ("kind", "lecture")]));
    let found: Vec<Track> = h.service.list(&h.admin, &all_of).await.unwrap();
    assert_eq!(names(found), vec!["de-lecture"]);

    let any_of = ListQuery::children_of(video.id())
        .with_tags_or(tags(&[("lang", "en"), ("kind", "seminar")]));
    let found: Vec<Track> = h.service.list(&h.admin, &any_of).await.unwrap();
    assert_eq!(names(found), vec!["de-seminar", "en-lecture"]);

    let unfiltered = h
        .service
        .list::<Track>(&h.admin, &ListQuery::children_of(video.id()))
        .await
        .unwrap();
    assert_eq!(unfiltered.len(), 4);
}

#[tokio::test]
async fn test_resolve_user_is_idempotent() {
    let h = harness().await;
    let first = h
        .service
        .resolve_user("dave", Some("Dave"), Some("dave@example.org"))
        .await
        .unwrap();
    let again = h
        .service
        .resolve_user("dave", Some("Other"), None)
        .await
        .unwrap();

    assert_eq!(first.id(), again.id());
    assert_eq!(again.nickname, "Dave");
    assert_eq!(first.resource.created_by, Some(first.id()));
}

#[tokio::test]
async fn test_duplicate_video_ext_id_is_rejected() {
    let h = harness().await;
    h.video("lecture1").await;
    let err = h
        .service
        .create_video(&h.admin, Video::new("lecture1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Duplicate(_)));
}

#[tokio::test]
async fn test_category_with_series_id_becomes_master() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let mut category = Category::for_video(video.id(), "Behavior");
    category.series_ext_id = Some("courseA".to_string());
    let category = h
        .service
        .create_category(&h.admin, category)
        .await
        .unwrap();

    assert_eq!(category.series_category_id, Some(category.id()));
    assert!(category.is_series_master());
    assert!(category.has_duration);
}

#[tokio::test]
async fn test_template_instantiation_checks_template() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let template = h.template_scale("Agreement", &[("low", 1.0, 0), ("high", 5.0, 1)]).await;

    let scale = h
        .service
        .create_scale_from_template(&h.admin, video.id(), template.id())
        .await
        .unwrap();
    assert_eq!(scale.video_id, Some(video.id()));

    let err = h
        .service
        .create_scale_from_template(&h.admin, video.id(), scale.id())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let err = h
        .service
        .create_category_from_template(&h.admin, video.id(), uuid::Uuid::now_v7())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn test_deleted_rows_need_admin() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;
    h.service.delete_track(&h.admin, track.id()).await.unwrap();

    let err = h
        .service
        .get::<Track>(&h.admin, track.id())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let deleted: Track = h
        .service
        .get_including_deleted(&h.admin, track.id())
        .await
        .unwrap();
    assert_eq!(deleted.resource.deleted_by, Some(h.admin.id()));

    let listed: Vec<Track> = h
        .service
        .list(
            &h.admin,
            &ListQuery::children_of(video.id()).including_deleted(),
        )
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_deleted_rows_hidden_without_admin() {
    let h = harness_with(Capability::Annotate).await;
    let video = h.video("lecture1").await;
    let track = h.track(&video, "Default").await;
    h.service.delete_track(&h.admin, track.id()).await.unwrap();

    let err = h
        .service
        .get_including_deleted::<Track>(&h.admin, track.id())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    let listed: Vec<Track> = h
        .service
        .list(
            &h.admin,
            &ListQuery::children_of(video.id()).including_deleted(),
        )
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_repeated_delete_succeeds() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let first = h.service.delete_video(&h.admin, video.id()).await.unwrap();
    let second = h.service.delete_video(&h.admin, video.id()).await.unwrap();
    assert_eq!(first.resource.deleted_at, second.resource.deleted_at);

    let err = h
        .service
        .delete_video(&h.admin, uuid::Uuid::now_v7())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

fn pause() {
    // Distinct millisecond timestamps keep UUIDv7 ids and stamps ordered
    std::thread::sleep(std::time::Duration::from_millis(2));
}

#[tokio::test]
async fn test_list_since_uses_last_modification() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let early = h.track(&video, "early").await;
    pause();
    let untouched = h.track(&video, "untouched").await;
    pause();
    let late = h.track(&video, "late").await;
    let cutoff = late.resource.created_at.unwrap();

    let since = ListQuery::children_of(video.id()).with_since(cutoff);
    let found: Vec<Track> = h.service.list(&h.admin, &since).await.unwrap();
    let ids: Vec<_> = found.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec![late.id()]);

    // An update counts as a modification
    pause();
    let mut changes = early.clone();
    changes.name = "early, renamed".to_string();
    h.service.update(&h.admin, &changes).await.unwrap();

    let found: Vec<Track> = h.service.list(&h.admin, &since).await.unwrap();
    let ids: Vec<_> = found.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec![early.id(), late.id()]);
    assert!(!ids.contains(&untouched.id()));
}

#[tokio::test]
async fn test_list_pages_in_id_order() {
    let h = harness().await;
    let video = h.video("lecture1").await;
    let mut tracks = Vec::new();
    for i in 0..5 {
        tracks.push(h.track(&video, &format!("track {}", i)).await);
        pause();
    }

    let page: Vec<Track> = h
        .service
        .list(
            &h.admin,
            &ListQuery::children_of(video.id()).with_page(Some(1), Some(2)),
        )
        .await
        .unwrap();
    let ids: Vec<_> = page.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec![tracks[1].id(), tracks[2].id()]);

    let tail: Vec<Track> = h
        .service
        .list(
            &h.admin,
            &ListQuery::children_of(video.id()).with_page(Some(4), Some(10)),
        )
        .await
        .unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].id(), tracks[4].id());

    let past_end: Vec<Track> = h
        .service
        .list(
            &h.admin,
            &ListQuery::children_of(video.id()).with_page(Some(5), None),
        )
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_resolve_deleted_user_is_unauthorized() {
    let h = harness().await;
    let dave = h.user("dave").await;
    h.service.delete_user(&dave, dave.id()).await.unwrap();

    let err = h
        .service
        .resolve_user("dave", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)), "got {:?}", err);
    assert_eq!(h.store().users.len(), 2);
}
