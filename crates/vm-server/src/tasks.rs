//! Batch operations run on behalf of the HTTP API and the scheduler.
//!
//! Each run holds its operation's lock from [`TaskLocks`], publishes
//! `task_started`, streams `task_progress`, and ends with `task_completed`
//! (carrying the report) or `task_failed`.
//!
//! [`TaskLocks`]: crate::context::TaskLocks

use std::future::Future;

use serde::Serialize;
use vm_core::events::{EventPayload, TaskKind};
use vm_core::Result;
use vm_engine::{MergeReport, ProgressSink, SplitReport};

use crate::context::AppContext;

pub async fn merge_movies(ctx: &AppContext) -> Result<MergeReport> {
    let catalog = ctx.catalog.clone();
    let config = ctx.config.merge.clone();
    let cancel = ctx.shutdown.child_token();
    run_tracked(ctx, TaskKind::MergeMovies, |sink| async move {
        vm_engine::merge_movies(&catalog, &config, Some(sink), cancel).await
    })
    .await
}

pub async fn split_movies(ctx: &AppContext) -> Result<SplitReport> {
    let catalog = ctx.catalog.clone();
    let config = ctx.config.merge.clone();
    let cancel = ctx.shutdown.child_token();
    run_tracked(ctx, TaskKind::SplitMovies, |sink| async move {
        vm_engine::split_movies(&catalog, &config, Some(sink), cancel).await
    })
    .await
}

pub async fn merge_episodes(ctx: &AppContext) -> Result<MergeReport> {
    let catalog = ctx.catalog.clone();
    let config = ctx.config.merge.clone();
    let cancel = ctx.shutdown.child_token();
    run_tracked(ctx, TaskKind::MergeEpisodes, |sink| async move {
        vm_engine::merge_episodes(&catalog, &config, Some(sink), cancel).await
    })
    .await
}

pub async fn split_episodes(ctx: &AppContext) -> Result<SplitReport> {
    let catalog = ctx.catalog.clone();
    let config = ctx.config.merge.clone();
    let cancel = ctx.shutdown.child_token();
    run_tracked(ctx, TaskKind::SplitEpisodes, |sink| async move {
        vm_engine::split_episodes(&catalog, &config, Some(sink), cancel).await
    })
    .await
}

async fn run_tracked<R, F, Fut>(ctx: &AppContext, task: TaskKind, run: F) -> Result<R>
where
    R: Serialize,
    F: FnOnce(ProgressSink) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    // A run still queued behind its lock when shutdown begins never starts.
    let _guard = tokio::select! {
        biased;
        guard = ctx.task_locks.acquire(task) => guard,
        _ = ctx.shutdown.cancelled() => {
            tracing::info!(task = %task, "Shutting down, dropping queued run");
            return Err(vm_core::Error::Cancelled);
        }
    };
    tracing::info!(task = %task, "Starting task");
    ctx.event_bus.broadcast(EventPayload::TaskStarted { task });

    let bus = ctx.event_bus.clone();
    let sink = ProgressSink::new(move |percent| {
        bus.broadcast(EventPayload::TaskProgress { task, percent });
    });

    match run(sink).await {
        Ok(report) => {
            let summary = serde_json::to_value(&report).unwrap_or_default();
            ctx.event_bus
                .broadcast(EventPayload::TaskCompleted { task, summary });
            Ok(report)
        }
        Err(e) => {
            tracing::error!(task = %task, error = %e, "Task failed");
            ctx.event_bus.broadcast(EventPayload::TaskFailed {
                task,
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;
    use vm_core::config::Config;
    use vm_core::events::Event;
    use vm_core::{Catalog, ItemKind, MediaItem};
    use vm_engine::MemoryCatalog;

    fn movie(name: &str, path: &str) -> MediaItem {
        let mut item = MediaItem::new(ItemKind::Movie, name, path);
        item.provider_ids.insert("Tmdb".into(), "949".into());
        item
    }

    fn context_with(catalog: Arc<MemoryCatalog>) -> AppContext {
        AppContext::new(catalog, Config::default(), CancellationToken::new())
    }

    fn seeded() -> Arc<MemoryCatalog> {
        let catalog = Arc::new(MemoryCatalog::with_roots(["/movies"]));
        catalog.insert_all([
            movie("Heat", "/movies/heat.2160p.mkv"),
            movie("Heat", "/movies/heat.1080p.mkv"),
        ]);
        catalog
    }

    fn payloads(events: Vec<Event>) -> Vec<EventPayload> {
        // recent_events is newest first.
        events.into_iter().rev().map(|e| e.payload).collect()
    }

    #[tokio::test]
    async fn merge_run_publishes_lifecycle_events() {
        let catalog = seeded();
        let ctx = context_with(catalog.clone());

        let report = merge_movies(&ctx).await.unwrap();
        assert_eq!(report.groups_merged, 1);

        let events = payloads(ctx.event_bus.recent_events(100));
        assert!(matches!(
            events.first(),
            Some(EventPayload::TaskStarted { task: TaskKind::MergeMovies })
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            EventPayload::TaskProgress { task: TaskKind::MergeMovies, percent: 100 }
        )));
        match events.last() {
            Some(EventPayload::TaskCompleted { task, summary }) => {
                assert_eq!(*task, TaskKind::MergeMovies);
                assert_eq!(summary["groups_merged"], 1);
            }
            other => panic!("unexpected last event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn split_run_reports_released_items() {
        let catalog = seeded();
        let ctx = context_with(catalog.clone());
        merge_movies(&ctx).await.unwrap();

        let report = split_movies(&ctx).await.unwrap();
        assert_eq!(report.items_released, 2);
        assert!(catalog.items().iter().all(MediaItem::is_unlinked));
    }

    #[tokio::test]
    async fn same_operation_waits_for_the_running_one() {
        let ctx = context_with(seeded());
        let guard = ctx.task_locks.acquire(TaskKind::MergeMovies).await;

        let waiting = {
            let ctx = ctx.clone();
            tokio::spawn(async move { merge_movies(&ctx).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());
        assert!(ctx.event_bus.recent_events(10).is_empty());

        drop(guard);
        let report = tokio::time::timeout(Duration::from_secs(5), waiting)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(report.groups_merged, 1);
    }

    #[tokio::test]
    async fn shutdown_cancels_new_runs() {
        let catalog = seeded();
        let ctx = context_with(catalog.clone());
        ctx.shutdown.cancel();

        let report = merge_episodes(&ctx).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(catalog.write_count(), 0);
    }

    #[tokio::test]
    async fn queued_run_is_dropped_on_shutdown() {
        let catalog = seeded();
        let ctx = context_with(catalog.clone());
        let guard = ctx.task_locks.acquire(TaskKind::SplitMovies).await;

        let waiting = {
            let ctx = ctx.clone();
            tokio::spawn(async move { split_movies(&ctx).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctx.shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), waiting)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(vm_core::Error::Cancelled)));
        assert!(ctx.event_bus.recent_events(10).is_empty());
        assert_eq!(catalog.write_count(), 0);
        drop(guard);
    }

    struct BrokenCatalog;

    #[async_trait::async_trait]
    impl Catalog for BrokenCatalog {
        async fn list_items(&self, _: &vm_core::ItemQuery) -> Result<Vec<MediaItem>> {
            Err(vm_core::Error::catalog("library unavailable"))
        }
        async fn get_item(&self, _: vm_core::ItemId) -> Result<Option<MediaItem>> {
            Ok(None)
        }
        async fn update_item(&self, _: &MediaItem) -> Result<()> {
            Ok(())
        }
        async fn library_roots(&self) -> Result<Vec<std::path::PathBuf>> {
            Err(vm_core::Error::catalog("library unavailable"))
        }
    }

    #[tokio::test]
    async fn catalog_failure_publishes_task_failed() {
        let ctx = AppContext::new(
            Arc::new(BrokenCatalog),
            Config::default(),
            CancellationToken::new(),
        );

        let err = split_episodes(&ctx).await.unwrap_err();
        assert!(matches!(err, vm_core::Error::Catalog(_)));

        let events = payloads(ctx.event_bus.recent_events(100));
        match events.last() {
            Some(EventPayload::TaskFailed { task, error }) => {
                assert_eq!(*task, TaskKind::SplitEpisodes);
                assert!(error.contains("library unavailable"));
            }
            other => panic!("unexpected last event: {other:?}"),
        }
    }
}
