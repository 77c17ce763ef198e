//! Converging one duplicate group to a single primary with flat linkage.
//!
//! Members are re-fetched before election because the listing may be
//! stale. Every non-primary member ends up pointing at the primary with no
//! alternates of its own; alternates it carried from an earlier run are
//! moved onto the primary (flattened) and re-pointed there as well. The
//! primary's alternate list is written once, at the end, and only if it
//! grew.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use serde::Serialize;
use vm_core::item::push_unique_by_path;
use vm_core::{Catalog, ItemId, LinkedVersion, MediaItem, Result};

use crate::election::elect_primary;

/// How a group ended up after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// Linkage was written and every write succeeded.
    Merged,
    /// Some writes failed; a later run will retry them.
    Partial,
    /// Already converged; nothing was written.
    Unchanged,
    /// Fewer than two members still exist.
    Collapsed,
}

/// Result of [`reconcile_group`].
#[derive(Debug, Clone, Serialize)]
pub struct GroupOutcome {
    pub primary: Option<ItemId>,
    /// Group members now linked under the primary by this run.
    pub linked: Vec<ItemId>,
    /// Former alternates of a member, moved onto the primary.
    pub flattened: Vec<ItemId>,
    /// Items whose write failed.
    pub failed: Vec<ItemId>,
    /// Successful catalog writes.
    pub writes: usize,
    pub status: GroupStatus,
}

impl GroupOutcome {
    fn collapsed() -> Self {
        Self {
            primary: None,
            linked: Vec::new(),
            flattened: Vec::new(),
            failed: Vec::new(),
            writes: 0,
            status: GroupStatus::Collapsed,
        }
    }
}

/// Elect a primary among the live members of `ids` and link the rest
/// under it.
///
/// Individual write failures are recorded in the outcome, never returned;
/// an `Err` means the group could not even be read.
pub async fn reconcile_group(catalog: &dyn Catalog, ids: &[ItemId]) -> Result<GroupOutcome> {
    let mut live = Vec::with_capacity(ids.len());
    for &id in ids {
        match catalog.get_item(id).await? {
            Some(item) => live.push(item),
            None => tracing::debug!(item = %id, "Group member no longer exists"),
        }
    }

    if live.len() < 2 {
        return Ok(GroupOutcome::collapsed());
    }
    let Some(mut primary) = elect_primary(&live).cloned() else {
        return Ok(GroupOutcome::collapsed());
    };

    let mut linker = Linker::new(catalog, &primary);

    for item in &live {
        if item.id == primary.id || linker.relinked.contains(&item.id) {
            continue;
        }
        let settled = item.primary_version_id == Some(primary.id)
            && !item.has_alternates()
            && primary.lists_alternate_path(&item.path);
        if settled {
            linker.relinked.insert(item.id);
            continue;
        }
        linker.relink(item.clone()).await;
    }

    let stale_reference = primary.primary_version_id.is_some();
    if linker.grew || stale_reference {
        primary.primary_version_id = None;
        primary.alternate_versions = std::mem::take(&mut linker.pending);
        primary.media_source_count = 1 + primary.alternate_versions.len() as u32;
        match catalog.update_item(&primary).await {
            Ok(()) => linker.writes += 1,
            Err(e) => {
                tracing::warn!(item = %primary.id, error = %e, "Failed to persist primary alternate list");
                linker.failed.push(primary.id);
            }
        }
    }

    let status = if !linker.failed.is_empty() {
        GroupStatus::Partial
    } else if linker.writes == 0 {
        GroupStatus::Unchanged
    } else {
        GroupStatus::Merged
    };

    Ok(GroupOutcome {
        primary: Some(primary.id),
        linked: linker.linked,
        flattened: linker.flattened,
        failed: linker.failed,
        writes: linker.writes,
        status,
    })
}

/// Accumulating state for one group's reconciliation.
struct Linker<'a> {
    catalog: &'a dyn Catalog,
    primary_id: ItemId,
    primary_path: PathBuf,
    /// The primary's alternate list as it will be written.
    pending: Vec<LinkedVersion>,
    grew: bool,
    /// Items already pointing at the primary during this run.
    relinked: HashSet<ItemId>,
    /// Items ever put on a relink worklist, so a chain entry listed by two
    /// carriers is followed once.
    queued: HashSet<ItemId>,
    linked: Vec<ItemId>,
    flattened: Vec<ItemId>,
    failed: Vec<ItemId>,
    writes: usize,
}

impl<'a> Linker<'a> {
    fn new(catalog: &'a dyn Catalog, primary: &MediaItem) -> Self {
        Self {
            catalog,
            primary_id: primary.id,
            primary_path: primary.path.clone(),
            pending: primary.alternate_versions.clone(),
            grew: false,
            relinked: HashSet::new(),
            queued: HashSet::new(),
            linked: Vec::new(),
            flattened: Vec::new(),
            failed: Vec::new(),
            writes: 0,
        }
    }

    /// Point `member` at the primary, then follow every alternate it
    /// carried and do the same for those, however deep the chain goes.
    async fn relink(&mut self, member: MediaItem) {
        self.queued.insert(member.id);
        let mut queue = VecDeque::from([(member, false)]);

        while let Some((mut item, via_chain)) = queue.pop_front() {
            let carried = std::mem::take(&mut item.alternate_versions);
            if item.primary_version_id != Some(self.primary_id) || !carried.is_empty() {
                item.primary_version_id = Some(self.primary_id);
                if let Err(e) = self.catalog.update_item(&item).await {
                    tracing::warn!(
                        item = %item.id,
                        primary = %self.primary_id,
                        error = %e,
                        "Failed to link alternate version"
                    );
                    self.failed.push(item.id);
                    continue;
                }
                self.writes += 1;
            }

            self.relinked.insert(item.id);
            if via_chain {
                self.flattened.push(item.id);
            } else {
                self.linked.push(item.id);
            }
            if push_unique_by_path(&mut self.pending, item.as_linked_version()) {
                self.grew = true;
            }

            for entry in carried {
                if entry.item_id == self.primary_id
                    || entry.same_path(&self.primary_path)
                    || self.relinked.contains(&entry.item_id)
                    || !self.queued.insert(entry.item_id)
                {
                    continue;
                }
                match self.catalog.get_item(entry.item_id).await {
                    Ok(Some(next)) => queue.push_back((next, true)),
                    Ok(None) => tracing::debug!(
                        item = %entry.item_id,
                        path = %entry.path.display(),
                        "Dropping alternate entry for missing item"
                    ),
                    Err(e) => {
                        tracing::warn!(item = %entry.item_id, error = %e, "Failed to load chained alternate");
                        self.failed.push(entry.item_id);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalog;
    use vm_core::{ItemKind, Video3DFormat};

    fn movie(path: &str, width: u32) -> MediaItem {
        let mut item = MediaItem::new(ItemKind::Movie, "Heat", path);
        item.provider_ids.insert("Tmdb".into(), "949".into());
        item.video_width = Some(width);
        item
    }

    fn seed(catalog: &MemoryCatalog, items: &[&MediaItem]) -> Vec<ItemId> {
        catalog.insert_all(items.iter().map(|i| (*i).clone()));
        items.iter().map(|i| i.id).collect()
    }

    #[tokio::test]
    async fn links_members_under_widest_plain_file() {
        let catalog = MemoryCatalog::new();
        let a = movie("/m/heat.1080p.mkv", 1920);
        let b = movie("/m/heat.2160p.mkv", 3840);
        let mut c = movie("/m/heat.3d.mkv", 3840);
        c.video_3d_format = Some(Video3DFormat::HalfSideBySide);
        let ids = seed(&catalog, &[&a, &b, &c]);

        let outcome = reconcile_group(&catalog, &ids).await.unwrap();
        assert_eq!(outcome.primary, Some(b.id));
        assert_eq!(outcome.status, GroupStatus::Merged);
        assert_eq!(outcome.linked, vec![a.id, c.id]);
        assert_eq!(outcome.writes, 3);

        let primary = catalog.item(b.id).unwrap();
        assert_eq!(
            primary.alternate_versions,
            vec![a.as_linked_version(), c.as_linked_version()]
        );
        assert_eq!(catalog.item(a.id).unwrap().primary_version_id, Some(b.id));
        assert_eq!(catalog.item(c.id).unwrap().primary_version_id, Some(b.id));
    }

    #[tokio::test]
    async fn second_run_writes_nothing() {
        let catalog = MemoryCatalog::new();
        let a = movie("/m/a.mkv", 1920);
        let b = movie("/m/b.mkv", 3840);
        let ids = seed(&catalog, &[&a, &b]);

        reconcile_group(&catalog, &ids).await.unwrap();
        catalog.reset_write_count();

        let again = reconcile_group(&catalog, &ids).await.unwrap();
        assert_eq!(again.status, GroupStatus::Unchanged);
        assert_eq!(again.writes, 0);
        assert_eq!(catalog.write_count(), 0);
    }

    #[tokio::test]
    async fn old_primary_chain_is_flattened() {
        let catalog = MemoryCatalog::new();
        let old_primary = movie("/m/heat.720p.mkv", 1280);
        let old_alt = movie("/m/heat.480p.mkv", 640);
        let newcomer = movie("/m/heat.2160p.mkv", 3840);
        let mut second_primary = movie("/m/heat.1080p.mkv", 1920);

        // Two independent earlier consolidations: old_primary <- old_alt,
        // second_primary with nothing yet but counted as established.
        let mut p = old_primary.clone();
        p.alternate_versions.push(old_alt.as_linked_version());
        p.media_source_count = 2;
        let mut alt = old_alt.clone();
        alt.primary_version_id = Some(old_primary.id);
        second_primary.media_source_count = 2;
        second_primary
            .alternate_versions
            .push(LinkedVersion::new("/m/gone.mkv", ItemId::new()));

        catalog.insert_all([p, alt, newcomer.clone(), second_primary.clone()]);
        let ids = vec![old_primary.id, newcomer.id, second_primary.id];

        let outcome = reconcile_group(&catalog, &ids).await.unwrap();
        assert_eq!(outcome.primary, Some(newcomer.id));
        assert_eq!(outcome.flattened, vec![old_alt.id]);

        let primary = catalog.item(newcomer.id).unwrap();
        assert!(primary.lists_alternate_path(&old_alt.path));
        assert!(primary.lists_alternate_path(&old_primary.path));
        assert!(primary.lists_alternate_path(&second_primary.path));
        assert!(!primary.lists_alternate_path(std::path::Path::new("/m/gone.mkv")));

        for id in [old_primary.id, old_alt.id, second_primary.id] {
            let item = catalog.item(id).unwrap();
            assert_eq!(item.primary_version_id, Some(newcomer.id));
            assert!(item.alternate_versions.is_empty());
        }
    }

    #[tokio::test]
    async fn alternate_listed_by_two_carriers_is_written_once() {
        let catalog = MemoryCatalog::new();
        let newcomer = movie("/m/heat.2160p.mkv", 3840);
        let old_primary = movie("/m/heat.720p.mkv", 1280);
        let mut a = movie("/m/heat.576p.mkv", 1024);
        let mut b = movie("/m/heat.480p.mkv", 640);

        // old_primary lists a and b; a also still lists b.
        let mut m = old_primary.clone();
        m.alternate_versions = vec![a.as_linked_version(), b.as_linked_version()];
        a.primary_version_id = Some(old_primary.id);
        a.alternate_versions = vec![b.as_linked_version()];
        b.primary_version_id = Some(old_primary.id);
        catalog.insert_all([newcomer.clone(), m, a.clone(), b.clone()]);

        let outcome = reconcile_group(&catalog, &[newcomer.id, old_primary.id])
            .await
            .unwrap();
        assert_eq!(outcome.primary, Some(newcomer.id));
        assert_eq!(outcome.flattened, vec![a.id, b.id]);
        assert_eq!(outcome.writes, 4);
        assert_eq!(catalog.write_count(), 4);

        let primary = catalog.item(newcomer.id).unwrap();
        assert_eq!(primary.alternate_versions.len(), 3);
        for id in [old_primary.id, a.id, b.id] {
            let item = catalog.item(id).unwrap();
            assert_eq!(item.primary_version_id, Some(newcomer.id));
            assert!(item.alternate_versions.is_empty());
        }
    }

    #[tokio::test]
    async fn stale_reference_on_primary_is_cleared() {
        let catalog = MemoryCatalog::new();
        let mut b = movie("/m/b.mkv", 3840);
        b.primary_version_id = Some(ItemId::new());
        let a = movie("/m/a.mkv", 1920);
        let ids = seed(&catalog, &[&a, &b]);

        let outcome = reconcile_group(&catalog, &ids).await.unwrap();
        assert_eq!(outcome.primary, Some(b.id));
        assert_eq!(catalog.item(b.id).unwrap().primary_version_id, None);
    }

    #[tokio::test]
    async fn write_failure_is_scoped_to_the_item() {
        let catalog = MemoryCatalog::new();
        let a = movie("/m/a.mkv", 1280);
        let b = movie("/m/b.mkv", 3840);
        let c = movie("/m/c.mkv", 1920);
        let ids = seed(&catalog, &[&a, &b, &c]);
        catalog.fail_writes_for(a.id);

        let outcome = reconcile_group(&catalog, &ids).await.unwrap();
        assert_eq!(outcome.status, GroupStatus::Partial);
        assert_eq!(outcome.failed, vec![a.id]);
        assert_eq!(outcome.linked, vec![c.id]);

        let primary = catalog.item(b.id).unwrap();
        assert_eq!(primary.alternate_versions, vec![c.as_linked_version()]);
        assert!(catalog.item(a.id).unwrap().primary_version_id.is_none());

        catalog.clear_failures();
        let retry = reconcile_group(&catalog, &ids).await.unwrap();
        assert_eq!(retry.status, GroupStatus::Merged);
        assert_eq!(retry.linked, vec![a.id]);
        assert_eq!(catalog.item(b.id).unwrap().alternate_versions.len(), 2);
    }

    #[tokio::test]
    async fn vanished_members_collapse_the_group() {
        let catalog = MemoryCatalog::new();
        let a = movie("/m/a.mkv", 1280);
        let b = movie("/m/b.mkv", 3840);
        let ids = seed(&catalog, &[&a, &b]);
        catalog.remove(b.id);

        let outcome = reconcile_group(&catalog, &ids).await.unwrap();
        assert_eq!(outcome.status, GroupStatus::Collapsed);
        assert_eq!(catalog.write_count(), 0);
    }

    #[tokio::test]
    async fn alternate_paths_dedupe_ignoring_case() {
        let catalog = MemoryCatalog::new();
        let b = movie("/m/b.mkv", 3840);
        let a = movie("/m/a.mkv", 1920);
        let mut primary = b.clone();
        primary
            .alternate_versions
            .push(LinkedVersion::new("/M/A.MKV", a.id));
        primary.media_source_count = 2;
        catalog.insert_all([primary, a.clone()]);

        reconcile_group(&catalog, &[a.id, b.id]).await.unwrap();
        let stored = catalog.item(b.id).unwrap();
        assert_eq!(stored.alternate_versions.len(), 1);
        assert_eq!(catalog.item(a.id).unwrap().primary_version_id, Some(b.id));
    }
}
