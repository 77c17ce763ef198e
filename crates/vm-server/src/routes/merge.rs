//! Batch merge and split endpoints.
//!
//! Each request runs the whole operation and answers with its report. A
//! request for an operation that is already running waits for it.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use vm_core::events::TaskKind;
use vm_engine::{MergeReport, SplitReport};

use crate::context::AppContext;
use crate::error::AppError;
use crate::tasks;

/// POST /api/merge-versions/movies/merge
pub async fn merge_movies(State(ctx): State<AppContext>) -> Result<Json<MergeReport>, AppError> {
    Ok(Json(tasks::merge_movies(&ctx).await?))
}

/// POST /api/merge-versions/movies/split
pub async fn split_movies(State(ctx): State<AppContext>) -> Result<Json<SplitReport>, AppError> {
    Ok(Json(tasks::split_movies(&ctx).await?))
}

/// POST /api/merge-versions/episodes/merge
pub async fn merge_episodes(
    State(ctx): State<AppContext>,
) -> Result<Json<MergeReport>, AppError> {
    Ok(Json(tasks::merge_episodes(&ctx).await?))
}

/// POST /api/merge-versions/episodes/split
pub async fn split_episodes(
    State(ctx): State<AppContext>,
) -> Result<Json<SplitReport>, AppError> {
    Ok(Json(tasks::split_episodes(&ctx).await?))
}

#[derive(Debug, Serialize)]
pub struct TaskStatus {
    pub task: TaskKind,
    pub running: bool,
}

/// GET /api/merge-versions/status
pub async fn status(State(ctx): State<AppContext>) -> Json<Vec<TaskStatus>> {
    let all = [
        TaskKind::MergeMovies,
        TaskKind::SplitMovies,
        TaskKind::MergeEpisodes,
        TaskKind::SplitEpisodes,
    ];
    Json(
        all.into_iter()
            .map(|task| TaskStatus {
                task,
                running: ctx.task_locks.is_running(task),
            })
            .collect(),
    )
}
