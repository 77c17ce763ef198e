//! [`SqliteCatalog`]: the [`Catalog`] implementation backed by the pool.
//!
//! Every call checks a connection out of the r2d2 pool on a blocking
//! thread so the async engine never stalls the runtime on SQLite I/O.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vm_core::{Catalog, Error, ItemId, ItemQuery, MediaItem, Result};

use crate::pool::{get_conn, DbPool, PooledConnection};
use crate::queries::{items, libraries};

/// SQLite-backed catalog.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: DbPool,
}

impl SqliteCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&PooledConnection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_conn(&pool)?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
    }

    /// Load a catalog snapshot: one library per entry, with its items.
    ///
    /// The whole snapshot is written in a single transaction.
    pub async fn import(&self, snapshot: CatalogSnapshot) -> Result<ImportSummary> {
        self.with_conn(move |conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| Error::database(e.to_string()))?;

            let mut summary = ImportSummary::default();
            for lib in snapshot.libraries {
                let row = libraries::create_library(&tx, &lib.name, &lib.media_type, &lib.paths)?;
                if !lib.enabled {
                    libraries::set_library_enabled(&tx, row.id, false)?;
                }
                summary.libraries += 1;
                for item in &lib.items {
                    items::create_item(&tx, row.id, item)?;
                    summary.items += 1;
                }
            }

            tx.commit().map_err(|e| Error::database(e.to_string()))?;
            Ok(summary)
        })
        .await
    }
}

/// JSON document accepted by [`SqliteCatalog::import`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub libraries: Vec<LibrarySnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    pub name: String,
    pub media_type: String,
    pub paths: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub items: Vec<MediaItem>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub libraries: usize,
    pub items: usize,
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<MediaItem>> {
        let query = query.clone();
        self.with_conn(move |conn| {
            let rows = items::list_items_by_kind(conn, &query.kind.to_string(), query.include_virtual)?;
            let mut out = Vec::with_capacity(rows.len());
            for row in rows {
                let item = row.into_media_item()?;
                if query.matches(&item) {
                    out.push(item);
                }
            }
            Ok(out)
        })
        .await
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<MediaItem>> {
        self.with_conn(move |conn| {
            items::get_item(conn, id)?
                .map(|row| row.into_media_item())
                .transpose()
        })
        .await
    }

    async fn update_item(&self, item: &MediaItem) -> Result<()> {
        let id = item.id;
        let primary = item.primary_version_id;
        let alternates = item.alternate_versions.clone();
        self.with_conn(move |conn| {
            if items::update_linkage(conn, id, primary, &alternates)? {
                Ok(())
            } else {
                Err(Error::not_found("item", id))
            }
        })
        .await
    }

    async fn library_roots(&self) -> Result<Vec<PathBuf>> {
        self.with_conn(|conn| libraries::list_enabled_roots(conn)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use vm_core::ItemKind;

    fn snapshot() -> CatalogSnapshot {
        let mut heat = MediaItem::new(ItemKind::Movie, "Heat", "/media/movies/heat.mkv");
        heat.provider_ids.insert("Tmdb".into(), "949".into());
        let untagged = MediaItem::new(ItemKind::Movie, "Home Video", "/media/movies/home.mkv");
        let pilot = MediaItem::new(ItemKind::Episode, "Pilot", "/media/tv/pilot.mkv");
        CatalogSnapshot {
            libraries: vec![
                LibrarySnapshot {
                    name: "Movies".into(),
                    media_type: "movies".into(),
                    paths: vec!["/media/movies".into()],
                    enabled: true,
                    items: vec![heat, untagged],
                },
                LibrarySnapshot {
                    name: "Shows".into(),
                    media_type: "tvshows".into(),
                    paths: vec!["/media/tv".into()],
                    enabled: false,
                    items: vec![pilot],
                },
            ],
        }
    }

    #[tokio::test]
    async fn import_then_query() {
        let catalog = SqliteCatalog::new(init_memory_pool().unwrap());
        let summary = catalog.import(snapshot()).await.unwrap();
        assert_eq!(summary, ImportSummary { libraries: 2, items: 3 });

        let movies = catalog.list_items(&ItemQuery::of_kind(ItemKind::Movie)).await.unwrap();
        assert_eq!(movies.len(), 2);

        let tagged = catalog
            .list_items(&ItemQuery::of_kind(ItemKind::Movie).with_provider_id("Tmdb"))
            .await
            .unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].name, "Heat");

        let roots = catalog.library_roots().await.unwrap();
        assert_eq!(roots, vec![PathBuf::from("/media/movies")]);
    }

    #[tokio::test]
    async fn update_persists_linkage_only() {
        let catalog = SqliteCatalog::new(init_memory_pool().unwrap());
        catalog.import(snapshot()).await.unwrap();
        let movies = catalog.list_items(&ItemQuery::of_kind(ItemKind::Movie)).await.unwrap();
        let (mut primary, alt) = (movies[0].clone(), movies[1].clone());

        primary.alternate_versions.push(alt.as_linked_version());
        primary.name = "Renamed".into();
        catalog.update_item(&primary).await.unwrap();

        let stored = catalog.get_item(primary.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Heat");
        assert_eq!(stored.alternate_versions, vec![alt.as_linked_version()]);
        assert_eq!(stored.media_source_count, 2);
    }

    #[tokio::test]
    async fn update_missing_item_is_not_found() {
        let catalog = SqliteCatalog::new(init_memory_pool().unwrap());
        let ghost = MediaItem::new(ItemKind::Movie, "Ghost", "/media/movies/ghost.mkv");
        let err = catalog.update_item(&ghost).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(catalog.get_item(ghost.id).await.unwrap().is_none());
    }

    #[test]
    fn snapshot_parses_minimal_json() {
        let json = r#"{"libraries": [{"name": "Movies", "media_type": "movies",
            "paths": ["/m"], "items": [{"kind": "movie", "name": "Heat", "path": "/m/heat.mkv",
            "production_year": 1995, "provider_ids": {"Tmdb": "949"}}]}]}"#;
        let snap: CatalogSnapshot = serde_json::from_str(json).unwrap();
        let item = &snap.libraries[0].items[0];
        assert!(snap.libraries[0].enabled);
        assert_eq!(item.media_source_count, 1);
        assert!(item.is_unlinked());
    }
}
