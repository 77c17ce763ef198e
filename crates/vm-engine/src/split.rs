//! Reversing a consolidation so every member stands alone again.

use serde::Serialize;
use vm_core::config::MergeConfig;
use vm_core::{Catalog, ItemId, LinkedVersion, MediaItem, Result};

/// Result of [`split_item`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitOutcome {
    /// The primary the split was resolved to, if any.
    pub primary: Option<ItemId>,
    /// Items whose linkage was cleared, primary last.
    pub released: Vec<ItemId>,
    /// Excluded alternates left linked to the primary.
    pub retained: Vec<ItemId>,
    pub failed: Vec<ItemId>,
    pub writes: usize,
}

impl SplitOutcome {
    /// True if nothing was linked and nothing was written.
    pub fn is_noop(&self) -> bool {
        self.released.is_empty() && self.failed.is_empty() && self.writes == 0
    }
}

/// Split the group `id` belongs to, starting from either its primary or
/// one of its alternates.
///
/// Alternates are only released while they still point at the resolved
/// primary; an item re-linked elsewhere in the meantime is left alone.
/// Items under an excluded location are never split: an excluded primary
/// makes the whole call a no-op, and excluded alternates stay linked and
/// listed on the primary.
pub async fn split_item(
    catalog: &dyn Catalog,
    id: ItemId,
    config: &MergeConfig,
) -> Result<SplitOutcome> {
    let mut outcome = SplitOutcome::default();

    let Some(start) = catalog.get_item(id).await? else {
        tracing::debug!(item = %id, "Split target no longer exists");
        return Ok(outcome);
    };

    let mut primary = match start.primary_version_id {
        Some(primary_id) if !start.has_alternates() => match catalog.get_item(primary_id).await? {
            Some(primary) => primary,
            None => {
                tracing::debug!(item = %id, primary = %primary_id, "Referenced primary no longer exists");
                return Ok(outcome);
            }
        },
        _ => start.clone(),
    };

    if primary.is_unlinked() {
        return Ok(outcome);
    }
    if config.is_excluded(&primary.path) {
        tracing::debug!(primary = %primary.id, path = %primary.path.display(), "Primary is excluded, not splitting");
        return Ok(outcome);
    }
    outcome.primary = Some(primary.id);

    let mut members: Vec<ItemId> = primary.alternate_versions.iter().map(|l| l.item_id).collect();
    if start.id != primary.id && !members.contains(&start.id) {
        members.push(start.id);
    }

    let mut kept: Vec<LinkedVersion> = Vec::new();
    for member_id in members {
        if member_id == primary.id {
            continue;
        }
        let Some(member) = catalog.get_item(member_id).await? else {
            continue;
        };
        if member.primary_version_id != Some(primary.id) {
            if !member.is_unlinked() {
                tracing::debug!(item = %member.id, primary = %primary.id, "Alternate now belongs elsewhere");
            }
            continue;
        }
        if config.is_excluded(&member.path) {
            tracing::debug!(item = %member.id, path = %member.path.display(), "Excluded alternate stays linked");
            outcome.retained.push(member.id);
            kept.push(member.as_linked_version());
            continue;
        }
        release(catalog, member, &mut outcome).await;
    }

    if kept.is_empty() {
        primary.media_source_count = 1;
        release(catalog, primary, &mut outcome).await;
    } else if primary.alternate_versions != kept || primary.primary_version_id.is_some() {
        primary.primary_version_id = None;
        primary.media_source_count = 1 + kept.len() as u32;
        primary.alternate_versions = kept;
        match catalog.update_item(&primary).await {
            Ok(()) => outcome.writes += 1,
            Err(e) => {
                tracing::warn!(item = %primary.id, error = %e, "Failed to trim primary alternate list");
                outcome.failed.push(primary.id);
            }
        }
    }

    tracing::info!(
        primary = ?outcome.primary,
        released = outcome.released.len(),
        retained = outcome.retained.len(),
        failed = outcome.failed.len(),
        "Split versions"
    );
    Ok(outcome)
}

async fn release(catalog: &dyn Catalog, mut item: MediaItem, outcome: &mut SplitOutcome) {
    item.primary_version_id = None;
    item.alternate_versions.clear();
    match catalog.update_item(&item).await {
        Ok(()) => {
            outcome.writes += 1;
            outcome.released.push(item.id);
        }
        Err(e) => {
            tracing::warn!(item = %item.id, error = %e, "Failed to clear version linkage");
            outcome.failed.push(item.id);
        }
    }
}
