//! Periodic consolidation.
//!
//! When `schedule.enabled` is set, merges movies and then episodes every
//! `schedule.interval_hours`, the first pass one interval after startup.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::tasks;

/// Run the scheduler loop until `cancel` is triggered.
pub async fn run_scheduler(ctx: AppContext, cancel: CancellationToken) {
    let schedule = ctx.config.schedule.clone();
    if !schedule.enabled {
        tracing::info!("Scheduler disabled");
        return;
    }

    let interval = Duration::from_secs(schedule.interval_hours.max(1) * 3600);
    tracing::info!(interval_hours = schedule.interval_hours, "Scheduler started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => break,
        }
        if cancel.is_cancelled() {
            break;
        }
        run_scheduled_pass(&ctx).await;
    }

    tracing::info!("Scheduler stopped");
}

/// One scheduled pass. Failures are logged; the next pass runs regardless.
pub async fn run_scheduled_pass(ctx: &AppContext) {
    let schedule = &ctx.config.schedule;

    if schedule.merge_movies {
        match tasks::merge_movies(ctx).await {
            Ok(report) => tracing::info!(
                merged = report.groups_merged,
                writes = report.writes,
                "Scheduled movie merge finished"
            ),
            Err(e) => tracing::error!(error = %e, "Scheduled movie merge failed"),
        }
    }

    if schedule.merge_episodes {
        match tasks::merge_episodes(ctx).await {
            Ok(report) => tracing::info!(
                merged = report.groups_merged,
                writes = report.writes,
                "Scheduled episode merge finished"
            ),
            Err(e) => tracing::error!(error = %e, "Scheduled episode merge failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use vm_core::config::Config;
    use vm_core::events::{EventPayload, TaskKind};
    use vm_core::{ItemKind, MediaItem};
    use vm_engine::MemoryCatalog;

    fn episode(path: &str) -> MediaItem {
        let mut item = MediaItem::new(ItemKind::Episode, "Pilot", path);
        item.series_name = Some("Lost".into());
        item.season_name = Some("Season 1".into());
        item.index_number = Some(1);
        item
    }

    fn started_tasks(ctx: &AppContext) -> Vec<TaskKind> {
        ctx.event_bus
            .recent_events(100)
            .into_iter()
            .rev()
            .filter_map(|e| match e.payload {
                EventPayload::TaskStarted { task } => Some(task),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn pass_runs_enabled_operations_in_order() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.insert_all([episode("/tv/lost/s01e01.mkv"), episode("/tv/lost/s01e01.720p.mkv")]);

        let mut config = Config::default();
        config.schedule.enabled = true;
        let ctx = AppContext::new(catalog.clone(), config, CancellationToken::new());

        run_scheduled_pass(&ctx).await;
        assert_eq!(
            started_tasks(&ctx),
            vec![TaskKind::MergeMovies, TaskKind::MergeEpisodes]
        );
        assert_eq!(catalog.items().iter().filter(|i| i.has_alternates()).count(), 1);
    }

    #[tokio::test]
    async fn pass_skips_disabled_operations() {
        let mut config = Config::default();
        config.schedule.merge_movies = false;
        let ctx = AppContext::new(
            Arc::new(MemoryCatalog::new()),
            config,
            CancellationToken::new(),
        );

        run_scheduled_pass(&ctx).await;
        assert_eq!(started_tasks(&ctx), vec![TaskKind::MergeEpisodes]);
    }

    #[tokio::test]
    async fn disabled_scheduler_returns_immediately() {
        let ctx = AppContext::new(
            Arc::new(MemoryCatalog::new()),
            Config::default(),
            CancellationToken::new(),
        );
        tokio::time::timeout(
            Duration::from_secs(1),
            run_scheduler(ctx, CancellationToken::new()),
        )
        .await
        .expect("disabled scheduler should not loop");
    }

    #[tokio::test]
    async fn scheduler_stops_on_cancel() {
        let mut config = Config::default();
        config.schedule.enabled = true;
        let ctx = AppContext::new(
            Arc::new(MemoryCatalog::new()),
            config,
            CancellationToken::new(),
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_scheduler(ctx.clone(), cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
        assert!(ctx.event_bus.recent_events(10).is_empty());
    }
}
