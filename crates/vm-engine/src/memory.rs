//! In-memory [`Catalog`] used by tests and dry runs.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use vm_core::{Catalog, Error, ItemId, ItemQuery, MediaItem, Result};

/// A catalog held entirely in memory.
///
/// Lists items in id order. Counts successful writes and can be told to
/// reject writes for chosen items.
#[derive(Default)]
pub struct MemoryCatalog {
    items: RwLock<BTreeMap<ItemId, MediaItem>>,
    roots: RwLock<Vec<PathBuf>>,
    failing: RwLock<HashSet<ItemId>>,
    writes: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog whose active library roots are `roots`.
    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let catalog = Self::new();
        catalog.set_roots(roots);
        catalog
    }

    pub fn set_roots<I, P>(&self, roots: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        *self.roots.write() = roots.into_iter().map(Into::into).collect();
    }

    /// Insert or replace an item. Not counted as a write.
    pub fn insert(&self, item: MediaItem) {
        self.items.write().insert(item.id, item);
    }

    pub fn insert_all(&self, items: impl IntoIterator<Item = MediaItem>) {
        let mut map = self.items.write();
        for item in items {
            map.insert(item.id, item);
        }
    }

    pub fn remove(&self, id: ItemId) -> Option<MediaItem> {
        self.items.write().remove(&id)
    }

    /// Current stored state of one item.
    pub fn item(&self, id: ItemId) -> Option<MediaItem> {
        self.items.read().get(&id).cloned()
    }

    pub fn items(&self) -> Vec<MediaItem> {
        self.items.read().values().cloned().collect()
    }

    /// Number of successful [`Catalog::update_item`] calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_write_count(&self) {
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Make every subsequent write to `id` fail with [`Error::Catalog`].
    pub fn fail_writes_for(&self, id: ItemId) {
        self.failing.write().insert(id);
    }

    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }
}

impl std::fmt::Debug for MemoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCatalog")
            .field("items", &self.items.read().len())
            .field("writes", &self.write_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<MediaItem>> {
        Ok(self
            .items
            .read()
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<MediaItem>> {
        Ok(self.item(id))
    }

    async fn update_item(&self, item: &MediaItem) -> Result<()> {
        if self.failing.read().contains(&item.id) {
            return Err(Error::catalog(format!("write rejected for item {}", item.id)));
        }

        let mut items = self.items.write();
        let stored = items
            .get_mut(&item.id)
            .ok_or_else(|| Error::not_found("item", item.id))?;
        stored.primary_version_id = item.primary_version_id;
        stored.alternate_versions = item.alternate_versions.clone();
        stored.media_source_count = 1 + stored.alternate_versions.len() as u32;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn library_roots(&self) -> Result<Vec<PathBuf>> {
        Ok(self.roots.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vm_core::{ItemKind, LinkedVersion};

    #[tokio::test]
    async fn update_touches_linkage_only() {
        let catalog = MemoryCatalog::new();
        let item = MediaItem::new(ItemKind::Movie, "Heat", "/m/heat.mkv");
        catalog.insert(item.clone());

        let mut changed = item.clone();
        changed.name = "Other".into();
        changed
            .alternate_versions
            .push(LinkedVersion::new("/m/heat.720p.mkv", ItemId::new()));
        catalog.update_item(&changed).await.unwrap();

        let stored = catalog.item(item.id).unwrap();
        assert_eq!(stored.name, "Heat");
        assert_eq!(stored.alternate_versions.len(), 1);
        assert_eq!(stored.media_source_count, 2);
        assert_eq!(catalog.write_count(), 1);
    }

    #[tokio::test]
    async fn injected_failures_are_not_counted() {
        let catalog = MemoryCatalog::new();
        let item = MediaItem::new(ItemKind::Movie, "Heat", "/m/heat.mkv");
        catalog.insert(item.clone());
        catalog.fail_writes_for(item.id);

        let err = catalog.update_item(&item).await.unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
        assert_eq!(catalog.write_count(), 0);

        catalog.clear_failures();
        catalog.update_item(&item).await.unwrap();
        assert_eq!(catalog.write_count(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_item_is_not_found() {
        let catalog = MemoryCatalog::new();
        let ghost = MediaItem::new(ItemKind::Movie, "Ghost", "/m/ghost.mkv");
        let err = catalog.update_item(&ghost).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
