//! The catalog item model and its version-linkage attributes.
//!
//! A [`MediaItem`] is either independent, a primary version (carries
//! `alternate_versions`), or an alternate version (carries
//! `primary_version_id`). An alternate never carries alternates of its own.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;
use crate::media::{ItemKind, Video3DFormat, VideoType};

/// Back-reference from a primary item to one of its alternates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedVersion {
    /// Filesystem location of the alternate.
    pub path: PathBuf,
    /// Catalog id of the alternate.
    pub item_id: ItemId,
}

impl LinkedVersion {
    pub fn new(path: impl Into<PathBuf>, item_id: ItemId) -> Self {
        Self {
            path: path.into(),
            item_id,
        }
    }

    /// Whether this entry points at `path`, ignoring ASCII/Unicode case.
    pub fn same_path(&self, path: &Path) -> bool {
        paths_equal_ignore_case(&self.path, path)
    }
}

/// A catalog entry as seen by the consolidation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(default)]
    pub id: ItemId,
    pub kind: ItemKind,
    /// Title of the movie or episode.
    pub name: String,
    pub path: PathBuf,
    /// External catalog ids keyed by provider name (e.g. `"Tmdb"`).
    #[serde(default)]
    pub provider_ids: BTreeMap<String, String>,
    pub production_year: Option<i32>,
    pub series_name: Option<String>,
    pub season_name: Option<String>,
    /// Episode number within its season.
    pub index_number: Option<i32>,
    #[serde(default)]
    pub is_virtual: bool,
    /// Non-null means this item is an alternate of the referenced primary.
    pub primary_version_id: Option<ItemId>,
    /// Alternates linked under this item; only present on a primary.
    #[serde(default)]
    pub alternate_versions: Vec<LinkedVersion>,
    #[serde(default = "single_source")]
    pub media_source_count: u32,
    #[serde(default)]
    pub video_type: VideoType,
    pub video_3d_format: Option<Video3DFormat>,
    pub video_width: Option<u32>,
}

fn single_source() -> u32 {
    1
}

impl MediaItem {
    /// Create an independent item with no linkage and a single media source.
    pub fn new(kind: ItemKind, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: ItemId::new(),
            kind,
            name: name.into(),
            path: path.into(),
            provider_ids: BTreeMap::new(),
            production_year: None,
            series_name: None,
            season_name: None,
            index_number: None,
            is_virtual: false,
            primary_version_id: None,
            alternate_versions: Vec::new(),
            media_source_count: 1,
            video_type: VideoType::VideoFile,
            video_3d_format: None,
            video_width: None,
        }
    }

    /// Look up the external id for `provider`.
    pub fn provider_id(&self, provider: &str) -> Option<&str> {
        self.provider_ids.get(provider).map(String::as_str)
    }

    /// True if this item points at a primary version.
    pub fn is_alternate(&self) -> bool {
        self.primary_version_id.is_some()
    }

    /// True if this item carries alternate-version back-references.
    pub fn has_alternates(&self) -> bool {
        !self.alternate_versions.is_empty()
    }

    /// True if the item carries no linkage attributes at all.
    pub fn is_unlinked(&self) -> bool {
        !self.is_alternate() && !self.has_alternates()
    }

    /// 3D or non-plain-file videos are alternate formats and are never
    /// preferred as the primary version.
    pub fn is_alternate_format(&self) -> bool {
        self.video_3d_format.is_some() || self.video_type != VideoType::VideoFile
    }

    /// Whether `path` is already listed among this item's alternates.
    pub fn lists_alternate_path(&self, path: &Path) -> bool {
        self.alternate_versions.iter().any(|l| l.same_path(path))
    }

    /// Build the back-reference a primary stores for this item.
    pub fn as_linked_version(&self) -> LinkedVersion {
        LinkedVersion::new(self.path.clone(), self.id)
    }
}

/// Case-insensitive path comparison used for alternate-list de-duplication.
pub fn paths_equal_ignore_case(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

/// Add `entry` to `list` unless an entry with the same path (ignoring case)
/// is already present. Returns `true` if the entry was added.
pub fn push_unique_by_path(list: &mut Vec<LinkedVersion>, entry: LinkedVersion) -> bool {
    if list.iter().any(|l| l.same_path(&entry.path)) {
        return false;
    }
    list.push(entry);
    true
}
