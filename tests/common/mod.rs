//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds an [`AppContext`] over a
//! [`SqliteCatalog`] on an in-memory database. The `with_server`
//! constructors start Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vm_core::config::Config;
use vm_core::{ItemKind, MediaItem, VideoType};
use vm_db::catalog::{CatalogSnapshot, ImportSummary, LibrarySnapshot};
use vm_db::pool::{init_memory_pool, DbPool};
use vm_db::SqliteCatalog;
use vm_server::context::AppContext;
use vm_server::router::build_router;

/// Test harness wrapping an [`AppContext`] backed by an in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub catalog: Arc<SqliteCatalog>,
    pub db: DbPool,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let catalog = Arc::new(SqliteCatalog::new(db.clone()));
        let ctx = AppContext::new(catalog.clone(), config, CancellationToken::new());
        Self { ctx, catalog, db }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    pub async fn import(&self, snapshot: CatalogSnapshot) -> ImportSummary {
        self.catalog
            .import(snapshot)
            .await
            .expect("failed to import snapshot")
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Three copies of Heat plus one unrelated movie.
pub struct MovieFixture {
    pub uhd: MediaItem,
    pub hd: MediaItem,
    pub disc: MediaItem,
    pub other: MediaItem,
}

impl MovieFixture {
    pub fn new() -> Self {
        let heat = |path: &str| {
            let mut item = MediaItem::new(ItemKind::Movie, "Heat", path);
            item.provider_ids.insert("Tmdb".into(), "949".into());
            item.production_year = Some(1995);
            item
        };

        let mut uhd = heat("/media/movies/Heat (1995)/Heat.2160p.mkv");
        uhd.video_width = Some(3840);
        let mut hd = heat("/media/movies/Heat (1995)/Heat.1080p.mkv");
        hd.video_width = Some(1920);
        let mut disc = heat("/media/movies/Heat (1995)/Heat.iso");
        disc.video_type = VideoType::Iso;

        let mut other = MediaItem::new(ItemKind::Movie, "Alien", "/media/movies/Alien.mkv");
        other.provider_ids.insert("Tmdb".into(), "348".into());

        Self { uhd, hd, disc, other }
    }

    pub fn library(&self) -> LibrarySnapshot {
        LibrarySnapshot {
            name: "Movies".into(),
            media_type: "movies".into(),
            paths: vec!["/media/movies".into()],
            enabled: true,
            items: vec![
                self.hd.clone(),
                self.uhd.clone(),
                self.disc.clone(),
                self.other.clone(),
            ],
        }
    }
}

/// The same episode in two qualities.
pub fn episode_library() -> (LibrarySnapshot, MediaItem, MediaItem) {
    let episode = |path: &str, width: u32| {
        let mut item = MediaItem::new(ItemKind::Episode, "Pilot", path);
        item.series_name = Some("Lost".into());
        item.season_name = Some("Season 1".into());
        item.index_number = Some(1);
        item.video_width = Some(width);
        item
    };
    let hd = episode("/media/tv/Lost/S01E01.1080p.mkv", 1920);
    let sd = episode("/media/tv/Lost/S01E01.480p.mkv", 720);

    let library = LibrarySnapshot {
        name: "Shows".into(),
        media_type: "tvshows".into(),
        paths: vec!["/media/tv".into()],
        enabled: true,
        items: vec![sd.clone(), hd.clone()],
    };
    (library, hd, sd)
}

/// Snapshot with both the movie fixture and the episode library.
pub fn full_snapshot(movies: &MovieFixture) -> CatalogSnapshot {
    CatalogSnapshot {
        libraries: vec![movies.library(), episode_library().0],
    }
}
