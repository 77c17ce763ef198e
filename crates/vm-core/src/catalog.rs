//! The [`Catalog`] contract between the consolidation engine and whatever
//! store owns the media items.
//!
//! The engine only ever lists, fetches by id, and writes back the linkage
//! attributes of single items. Implementations must make each
//! [`Catalog::update_item`] atomic for that one item.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::ids::ItemId;
use crate::item::MediaItem;
use crate::media::ItemKind;

/// Filter passed to [`Catalog::list_items`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub kind: ItemKind,
    /// Include virtual (missing/placeholder) items.
    pub include_virtual: bool,
    /// Only return items carrying an external id for this provider.
    pub has_provider_id: Option<String>,
}

impl ItemQuery {
    /// All non-virtual items of `kind`.
    pub fn of_kind(kind: ItemKind) -> Self {
        Self {
            kind,
            include_virtual: false,
            has_provider_id: None,
        }
    }

    /// Builder: restrict to items with an external id for `provider`.
    pub fn with_provider_id(mut self, provider: impl Into<String>) -> Self {
        self.has_provider_id = Some(provider.into());
        self
    }

    /// Whether `item` satisfies this query.
    pub fn matches(&self, item: &MediaItem) -> bool {
        if item.kind != self.kind {
            return false;
        }
        if item.is_virtual && !self.include_virtual {
            return false;
        }
        match &self.has_provider_id {
            Some(provider) => item.provider_id(provider).is_some_and(|v| !v.is_empty()),
            None => true,
        }
    }
}

/// External catalog service the engine reads from and writes linkage to.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// List every item matching `query`, in a stable order.
    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<MediaItem>>;

    /// Fetch the current persisted state of one item.
    async fn get_item(&self, id: ItemId) -> Result<Option<MediaItem>>;

    /// Persist the linkage attributes (`primary_version_id`,
    /// `alternate_versions`) of `item`.
    async fn update_item(&self, item: &MediaItem) -> Result<()>;

    /// Root paths of the currently enabled libraries.
    async fn library_roots(&self) -> Result<Vec<PathBuf>>;
}
