//! Repository CRUD through the in-memory backend, covering the behaviors
//! guaranteed at the repository boundary.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use stowage_core::driver::{Connection, Cursor};
use stowage_core::{connect, DbConfig, DbError, JsonMapper, Repository};
use stowage_mem::{MemConnection, MemDriver};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Widget {
    id: Option<String>,
    name: String,
}

impl Widget {
    fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

async fn widgets(driver: &MemDriver) -> Repository<MemConnection, JsonMapper<Widget>> {
    let config = DbConfig::new("localhost", 28015, "test");
    let factory = connect(driver, &config)
        .await
        .expect("in-memory connect cannot fail");
    factory.repository("widgets", JsonMapper::new()).await
}

#[tokio::test]
async fn insert_assigns_a_generated_id() -> Result<()> {
    init_tracing();
    let repo = widgets(&MemDriver::new()).await;

    let stored = repo.insert(Widget::named("a")).await?;

    let id = stored.id.as_deref().unwrap_or_default();
    assert!(!id.is_empty());
    assert_eq!(stored.name, "a");
    Ok(())
}

#[tokio::test]
async fn insert_then_get_round_trips() -> Result<()> {
    init_tracing();
    let repo = widgets(&MemDriver::new()).await;

    let stored = repo.insert(Widget::named("a")).await?;
    let id = stored.id.clone().expect("generated id");

    let fetched = repo.get(&id).await?;
    assert_eq!(fetched, stored);
    Ok(())
}

#[tokio::test]
async fn get_for_an_unknown_id_is_not_found() {
    init_tracing();
    let repo = widgets(&MemDriver::new()).await;

    let err = repo.get("missing").await.expect_err("nothing stored");

    assert!(matches!(err, DbError::NotFound { .. }));
    assert_eq!(err.to_string(), "Could not find widgets with id: missing");
}

#[tokio::test]
async fn update_resolves_with_the_callers_entity() -> Result<()> {
    init_tracing();
    let repo = widgets(&MemDriver::new()).await;

    let mut stored = repo.insert(Widget::named("a")).await?;
    stored.name = "b".to_string();

    let returned = repo.update(stored.clone()).await?;
    assert_eq!(returned, stored);

    let fetched = repo.get(stored.id.as_deref().expect("id")).await?;
    assert_eq!(fetched.name, "b");
    Ok(())
}

#[tokio::test]
async fn update_without_an_id_is_rejected() {
    init_tracing();
    let repo = widgets(&MemDriver::new()).await;

    let err = repo
        .update(Widget::named("nameless"))
        .await
        .expect_err("no id to update by");

    assert!(matches!(err, DbError::MissingId { .. }));
}

#[tokio::test]
async fn delete_reports_counts_from_the_driver() -> Result<()> {
    init_tracing();
    let repo = widgets(&MemDriver::new()).await;

    let stored = repo.insert(Widget::named("a")).await?;
    let id = stored.id.expect("generated id");

    let summary = repo.delete(&id).await?;
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.skipped, 0);

    let summary = repo.delete(&id).await?;
    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.skipped, 1);
    Ok(())
}

#[tokio::test]
async fn deleted_widgets_stop_resolving() -> Result<()> {
    init_tracing();
    let repo = widgets(&MemDriver::new()).await;

    let stored = repo.insert(Widget::named("a")).await?;
    let id = stored.id.clone().expect("generated id");

    let summary = repo.delete(&id).await?;
    assert_eq!(summary.deleted, 1);

    assert!(matches!(repo.get(&id).await, Err(DbError::NotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn all_returns_every_widget_in_driver_order() -> Result<()> {
    init_tracing();
    let repo = widgets(&MemDriver::new()).await;

    assert!(repo.all().await?.is_empty());

    let mut ids = Vec::new();
    for name in ["a", "b", "c"] {
        ids.push(repo.insert(Widget::named(name)).await?.id.expect("id"));
    }
    // The in-memory backend hands records back sorted by id.
    ids.sort();

    let listed: Vec<String> = repo
        .all()
        .await?
        .into_iter()
        .filter_map(|widget| widget.id)
        .collect();
    assert_eq!(listed, ids);
    Ok(())
}

#[tokio::test]
async fn insert_with_a_preset_id_breaks_the_key_invariant() {
    init_tracing();
    let repo = widgets(&MemDriver::new()).await;

    let err = repo
        .insert(Widget {
            id: Some("w-1".to_string()),
            name: "a".to_string(),
        })
        .await
        .expect_err("no key generated");

    assert!(matches!(err, DbError::GeneratedKeys { count: 0, .. }));
}

#[tokio::test]
async fn raw_queries_can_reuse_the_repository_mapper() -> Result<()> {
    init_tracing();
    let driver = MemDriver::new();
    let repo = widgets(&driver).await;
    repo.insert(Widget::named("a")).await?;
    repo.insert(Widget::named("b")).await?;

    // Raw driver access through the escape hatch, mapped afterwards.
    let cursor = repo.connection().query(repo.table()).await?;
    let records = cursor.collect().await?;
    let mapped = repo.map_records(records)?;

    assert_eq!(mapped, repo.all().await?);
    Ok(())
}

#[tokio::test]
async fn repositories_can_be_created_repeatedly() -> Result<()> {
    init_tracing();
    let driver = MemDriver::new();
    let config = DbConfig::new("localhost", 28015, "test");
    let factory = connect(&driver, &config).await.expect("connect");

    let first = factory
        .repository("widgets", JsonMapper::<Widget>::new())
        .await;
    let stored = first.insert(Widget::named("a")).await?;

    // A second repository over the same table sees the same rows.
    let second = factory
        .repository("widgets", JsonMapper::<Widget>::new())
        .await;
    let id = stored.id.expect("id");
    assert_eq!(second.get(&id).await?.name, "a");
    Ok(())
}
