//! Single-item endpoints.

use axum::extract::{Path, State};
use axum::Json;
use vm_core::events::EventPayload;
use vm_core::{ItemId, MediaItem};
use vm_engine::SplitOutcome;

use crate::context::AppContext;
use crate::error::AppError;

fn parse_item_id(id: &str) -> Result<ItemId, AppError> {
    id.parse()
        .map_err(|_| vm_core::Error::Validation("Invalid item ID".into()).into())
}

/// GET /api/items/{id}
pub async fn get_item(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<MediaItem>, AppError> {
    let item_id = parse_item_id(&id)?;
    let item = ctx
        .catalog
        .get_item(item_id)
        .await?
        .ok_or_else(|| vm_core::Error::not_found("item", item_id))?;
    Ok(Json(item))
}

/// POST /api/items/{id}/split
///
/// Splits the group the item belongs to, whether the item is its primary
/// or one of its alternates.
pub async fn split_item(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<SplitOutcome>, AppError> {
    let item_id = parse_item_id(&id)?;
    if ctx.catalog.get_item(item_id).await?.is_none() {
        return Err(vm_core::Error::not_found("item", item_id).into());
    }

    let outcome = vm_engine::split_item(ctx.catalog.as_ref(), item_id, &ctx.config.merge).await?;
    for released in &outcome.released {
        ctx.event_bus
            .broadcast(EventPayload::ItemUpdated { item_id: *released });
    }
    Ok(Json(outcome))
}
