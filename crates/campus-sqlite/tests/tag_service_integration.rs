//! Tag service behaviour on a real SQLite database

use campus_core::{
    NewTag, ResourceId, Tag, TagContext, TagError, TagId, TagQuery, TagService, TagUpdate,
};
use campus_sqlite::schema::{SPACE_TYPE_CLASSROOM, SPACE_TYPE_LAB};
use campus_sqlite::{SqliteConfig, SqliteTagBackend};
use tempfile::TempDir;

fn service() -> (SqliteTagBackend, TagService<SqliteTagBackend>) {
    let backend = SqliteTagBackend::memory().unwrap();
    (backend.clone(), TagService::new(backend))
}

async fn create(service: &TagService<SqliteTagBackend>, context: &str, name: &str) -> Tag {
    service
        .create_tag(NewTag::new(context, name), None)
        .await
        .unwrap()
}

fn post(id: i64) -> ResourceId {
    ResourceId(id)
}

#[tokio::test]
async fn test_merge_reassigns_without_duplicates() {
    let (backend, service) = service();
    let target = create(&service, "posts", "AI").await;
    let a = create(&service, "posts", "Artificial Intelligence").await;
    let b = create(&service, "posts", "A.I.").await;

    backend.attach(&TagContext::POSTS, post(1), target.id).unwrap();
    backend.attach(&TagContext::POSTS, post(1), a.id).unwrap();
    backend.attach(&TagContext::POSTS, post(2), a.id).unwrap();
    backend.attach(&TagContext::POSTS, post(2), b.id).unwrap();
    backend.attach(&TagContext::POSTS, post(3), b.id).unwrap();

    let outcome = service
        .merge_tags(target.id, &[a.id, b.id, a.id, target.id], Some(42))
        .await
        .unwrap();

    assert_eq!(outcome.affected_resources, 3);
    assert_eq!(outcome.deactivated_tags, 2);
    assert_eq!(
        backend.links(&TagContext::POSTS).unwrap(),
        vec![(post(1), target.id), (post(2), target.id), (post(3), target.id)]
    );
}

#[tokio::test]
async fn test_merge_deactivates_sources_and_preserves_target() {
    let (_backend, service) = service();
    let target = create(&service, "posts", "Seminar").await;
    let source = create(&service, "posts", "Seminars").await;

    service.merge_tags(target.id, &[source.id], None).await.unwrap();

    assert!(!service.get_tag(source.id).await.unwrap().is_active);
    let target_after = service.get_tag(target.id).await.unwrap();
    assert!(target_after.is_active);
    assert!(target_after.last_used_at.is_some());
}

#[tokio::test]
async fn test_merge_rejects_cross_context_and_mutates_nothing() {
    let (backend, service) = service();
    backend.add_space(7, "Robotics Lab", SPACE_TYPE_LAB).unwrap();
    let target = create(&service, "posts", "Robotics").await;
    let source = create(&service, "labs", "Robotics").await;
    backend.attach(&TagContext::LABS, ResourceId(7), source.id).unwrap();

    let err = service
        .merge_tags(target.id, &[source.id], None)
        .await
        .unwrap_err();

    assert!(matches!(err, TagError::InvalidArgument(_)));
    assert!(service.get_tag(source.id).await.unwrap().is_active);
    assert_eq!(
        backend.links(&TagContext::LABS).unwrap(),
        vec![(ResourceId(7), source.id)]
    );
    // Only the two creations were audited
    assert_eq!(backend.audit_entries().unwrap().len(), 2);
}

#[tokio::test]
async fn test_merge_audit_entry() {
    let (backend, service) = service();
    let target = create(&service, "projects", "Edge AI").await;
    let source = create(&service, "projects", "TinyML").await;
    backend.attach(&TagContext::PROJECTS, ResourceId(3), source.id).unwrap();
    backend.attach(&TagContext::PROJECTS, ResourceId(4), source.id).unwrap();

    service.merge_tags(target.id, &[source.id], Some(9)).await.unwrap();

    let entries = backend.audit_entries().unwrap();
    let merged = entries.last().unwrap();
    assert_eq!(merged.action, "tag.merged");
    assert_eq!(merged.subject_type, "tag");
    assert_eq!(merged.subject_id, target.id.0);
    assert_eq!(merged.actor_id, Some(9));
    assert_eq!(merged.description.as_deref(), Some("Tag merged · Edge AI"));
    assert_eq!(merged.properties["affected_resources"], 2);
    assert_eq!(merged.properties["deactivated"], 1);
    assert_eq!(merged.properties["source_ids"], serde_json::json!([source.id.0]));
}

#[tokio::test]
async fn test_remerge_is_noop() {
    let (backend, service) = service();
    let target = create(&service, "posts", "Events").await;
    let source = create(&service, "posts", "Event").await;
    backend.attach(&TagContext::POSTS, post(5), source.id).unwrap();

    service.merge_tags(target.id, &[source.id], None).await.unwrap();
    let again = service.merge_tags(target.id, &[source.id], None).await.unwrap();

    assert_eq!(again.affected_resources, 0);
    assert_eq!(again.deactivated_tags, 0);
}

#[tokio::test]
async fn test_merge_missing_source_rolls_back() {
    let (backend, service) = service();
    let target = create(&service, "posts", "Kept").await;
    let source = create(&service, "posts", "Other").await;
    backend.attach(&TagContext::POSTS, post(1), source.id).unwrap();

    let err = service
        .merge_tags(target.id, &[source.id, TagId(9999)], None)
        .await
        .unwrap_err();

    assert_eq!(err, TagError::tag_not_found(TagId(9999)));
    assert!(service.get_tag(source.id).await.unwrap().is_active);
    assert_eq!(
        backend.links(&TagContext::POSTS).unwrap(),
        vec![(post(1), source.id)]
    );
}

#[tokio::test]
async fn test_lab_merge_removes_source_from_every_space() {
    let (backend, service) = service();
    backend.add_space(1, "Vision Lab", SPACE_TYPE_LAB).unwrap();
    backend.add_space(2, "Room 301", SPACE_TYPE_CLASSROOM).unwrap();

    let target = create(&service, "labs", "Computer Vision").await;
    let source = create(&service, "labs", "CV").await;
    backend.attach(&TagContext::LABS, ResourceId(1), source.id).unwrap();
    // A classroom carrying a labs tag is outside the labs context
    backend.attach(&TagContext::SPACES, ResourceId(2), source.id).unwrap();

    let outcome = service.merge_tags(target.id, &[source.id], None).await.unwrap();
    assert_eq!(outcome.affected_resources, 1);

    // The classroom's link to the merged tag is dropped, not moved
    let links = backend.links(&TagContext::SPACES).unwrap();
    assert_eq!(links, vec![(ResourceId(1), target.id)]);
    assert!(links.iter().all(|(_, tag)| *tag != source.id));
}

#[tokio::test]
async fn test_split_skips_existing_and_creates_rest() {
    let (_backend, service) = service();
    let original = create(&service, "posts", "General").await;
    create(&service, "posts", "Existing").await;

    let outcome = service
        .split_tag(
            &original,
            [" New Tag ", "existing", "Another", "New Tag"],
            true,
            None,
            None,
        )
        .await
        .unwrap();

    let names: Vec<_> = outcome.created.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["New Tag", "Another"]);
    assert_eq!(outcome.skipped, vec!["existing"]);
    assert!(outcome.created.iter().all(|t| t.is_active));
}

#[tokio::test]
async fn test_split_slug_uniqueness() {
    let (_backend, service) = service();
    let original = create(&service, "posts", "Misc").await;

    let outcome = service
        .split_tag(&original, ["Tag", "Tag?"], true, None, None)
        .await
        .unwrap();

    let slugs: Vec<_> = outcome.created.iter().map(|t| t.slug.as_str()).collect();
    assert_eq!(slugs, vec!["tag", "tag-1"]);
}

#[tokio::test]
async fn test_split_keep_original() {
    let (_backend, service) = service();
    let kept = create(&service, "posts", "Kept").await;
    let dropped = create(&service, "posts", "Dropped").await;

    service.split_tag(&kept, ["K1"], true, None, None).await.unwrap();
    service
        .split_tag(&dropped, ["D1"], false, None, None)
        .await
        .unwrap();

    assert!(service.get_tag(kept.id).await.unwrap().is_active);
    assert!(!service.get_tag(dropped.id).await.unwrap().is_active);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_splits_create_each_name_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("campus.db");

    let first = TagService::new(SqliteTagBackend::open(SqliteConfig::new(&path)).unwrap());
    let second = TagService::new(SqliteTagBackend::open(SqliteConfig::new(&path)).unwrap());

    let original = create(&first, "posts", "Research").await;

    let (a, b) = tokio::join!(
        first.split_tag(&original, ["Alpha", "Beta"], true, None, None),
        second.split_tag(&original, ["beta", "Gamma"], true, None, None),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.created.len() + b.created.len(), 3);

    let rows = first.list_tags(TagQuery::for_context("posts")).await.unwrap();
    let mut names: Vec<_> = rows.iter().map(|row| row.tag.name.to_lowercase()).collect();
    names.sort();
    assert_eq!(names, vec!["alpha", "beta", "gamma", "research"]);
}

#[tokio::test]
async fn test_update_and_deactivate() {
    let (backend, service) = service();
    create(&service, "posts", "Cloud").await;
    let tag = create(&service, "posts", "Cloud Computing").await;

    let mut update = TagUpdate::from_tag(&tag);
    update.name = "cloud".to_string();
    let err = service.update_tag(tag.id, update, None).await.unwrap_err();
    assert!(matches!(err, TagError::Conflict(_)));

    let mut update = TagUpdate::from_tag(&tag);
    update.name = "Cloud!".to_string();
    let renamed = service.update_tag(tag.id, update, None).await.unwrap();
    assert_eq!(renamed.slug, "cloud-1");

    let deactivated = service.deactivate_tag(tag.id, Some(1)).await.unwrap();
    assert!(!deactivated.is_active);

    let actions: Vec<_> = backend
        .audit_entries()
        .unwrap()
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(
        actions,
        vec!["tag.created", "tag.created", "tag.updated", "tag.deactivated"]
    );
}

#[tokio::test]
async fn test_find_or_create_and_register() {
    let (_backend, service) = service();

    let created = service
        .find_or_create(TagContext::POSTS, "Scholarship")
        .await
        .unwrap()
        .unwrap();
    let found = service
        .find_or_create(TagContext::POSTS, "SCHOLARSHIP")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.id, found.id);

    let registered = service
        .register_names(["Scholarship", "Exchange"], &[TagContext::POSTS, TagContext::PROJECTS])
        .await
        .unwrap();
    assert_eq!(registered, 3);
}

#[tokio::test]
async fn test_list_orders_active_then_usage() {
    let (backend, service) = service();
    let quiet = create(&service, "posts", "Quiet").await;
    let busy = create(&service, "posts", "Busy").await;
    let retired = service
        .create_tag(NewTag::new("posts", "Retired").inactive(), None)
        .await
        .unwrap();

    backend.attach(&TagContext::POSTS, post(1), busy.id).unwrap();
    backend.attach(&TagContext::POSTS, post(1), retired.id).unwrap();
    backend.attach(&TagContext::POSTS, post(2), retired.id).unwrap();

    let rows = service.list_tags(TagQuery::for_context("posts")).await.unwrap();
    let order: Vec<_> = rows.iter().map(|row| (row.tag.id, row.usage_count)).collect();
    assert_eq!(order, vec![(busy.id, 1), (quiet.id, 0), (retired.id, 2)]);
}
