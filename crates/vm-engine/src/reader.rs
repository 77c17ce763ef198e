//! Listing the items of one kind that may take part in consolidation.

use std::path::{Path, PathBuf};

use vm_core::config::MergeConfig;
use vm_core::{Catalog, ItemKind, ItemQuery, MediaItem, Result};

/// List non-virtual items of `kind` and keep only the eligible ones.
///
/// An item is eligible when its path is outside every excluded prefix.
/// Movies must additionally live under an active library root and, unless
/// title matching is enabled, carry the configured provider id.
pub async fn eligible_items(
    catalog: &dyn Catalog,
    kind: ItemKind,
    config: &MergeConfig,
) -> Result<Vec<MediaItem>> {
    let mut query = ItemQuery::of_kind(kind);
    if kind == ItemKind::Movie && !config.match_movies_by_title {
        query = query.with_provider_id(config.provider.clone());
    }

    let listed = catalog.list_items(&query).await?;
    let roots = match kind {
        ItemKind::Movie => Some(catalog.library_roots().await?),
        _ => None,
    };

    let total = listed.len();
    let eligible: Vec<MediaItem> = listed
        .into_iter()
        .filter(|item| is_eligible(item, config, roots.as_deref()))
        .collect();

    tracing::debug!(
        kind = %kind,
        listed = total,
        eligible = eligible.len(),
        "Listed catalog items"
    );
    Ok(eligible)
}

fn is_eligible(item: &MediaItem, config: &MergeConfig, roots: Option<&[PathBuf]>) -> bool {
    if config.is_excluded(&item.path) {
        tracing::trace!(item = %item.id, path = %item.path.display(), "Excluded by location");
        return false;
    }
    match roots {
        Some(roots) if !under_any_root(&item.path, roots) => {
            tracing::trace!(item = %item.id, path = %item.path.display(), "Outside active libraries");
            false
        }
        _ => true,
    }
}

fn under_any_root(path: &Path, roots: &[PathBuf]) -> bool {
    roots
        .iter()
        .filter(|root| !root.as_os_str().is_empty())
        .any(|root| path.starts_with(root))
}
