//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. Enum and JSON columns stay as text here and are
//! parsed when converting into the domain model.

use std::collections::BTreeMap;
use std::path::PathBuf;

use uuid::Uuid;
use vm_core::{Error, ItemId, LibraryId, LinkedVersion, MediaItem, Result};

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

fn parse_opt_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let s: Option<String> = row.get(idx)?;
    match s {
        Some(v) => {
            let uuid = Uuid::parse_str(&v).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(Some(T::from(uuid)))
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub media_type: String,
    pub paths: Vec<String>,
    pub enabled: bool,
    pub created_at: String,
}

impl Library {
    /// Build from a row selected as:
    /// id, name, media_type, paths, enabled, created_at
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let paths_json: String = row.get(3)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            media_type: row.get(2)?,
            paths: serde_json::from_str(&paths_json).unwrap_or_default(),
            enabled: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub library_id: LibraryId,
    pub item_kind: String,
    pub name: String,
    pub path: String,
    pub provider_ids: String,
    pub production_year: Option<i32>,
    pub series_name: Option<String>,
    pub season_name: Option<String>,
    pub index_number: Option<i32>,
    pub is_virtual: bool,
    pub video_type: String,
    pub video_3d_format: Option<String>,
    pub video_width: Option<u32>,
    pub primary_version_id: Option<ItemId>,
    pub alternate_versions: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Item {
    /// Build from a row selected as:
    /// id, library_id, item_kind, name, path, provider_ids, production_year,
    /// series_name, season_name, index_number, is_virtual, video_type,
    /// video_3d_format, video_width, primary_version_id, alternate_versions,
    /// created_at, updated_at
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            library_id: parse_id(row, 1)?,
            item_kind: row.get(2)?,
            name: row.get(3)?,
            path: row.get(4)?,
            provider_ids: row.get(5)?,
            production_year: row.get(6)?,
            series_name: row.get(7)?,
            season_name: row.get(8)?,
            index_number: row.get(9)?,
            is_virtual: row.get(10)?,
            video_type: row.get(11)?,
            video_3d_format: row.get(12)?,
            video_width: row.get(13)?,
            primary_version_id: parse_opt_id(row, 14)?,
            alternate_versions: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }

    /// Convert the stored row into the engine's view of the item.
    ///
    /// `media_source_count` is derived: the item's own file plus one per
    /// linked alternate.
    pub fn into_media_item(self) -> Result<MediaItem> {
        let provider_ids: BTreeMap<String, String> = serde_json::from_str(&self.provider_ids)
            .map_err(|e| Error::database(format!("item {}: bad provider_ids: {e}", self.id)))?;
        let alternate_versions: Vec<LinkedVersion> =
            serde_json::from_str(&self.alternate_versions).map_err(|e| {
                Error::database(format!("item {}: bad alternate_versions: {e}", self.id))
            })?;
        let video_3d_format = self
            .video_3d_format
            .as_deref()
            .map(str::parse)
            .transpose()?;

        Ok(MediaItem {
            id: self.id,
            kind: self.item_kind.parse()?,
            name: self.name,
            path: PathBuf::from(self.path),
            provider_ids,
            production_year: self.production_year,
            series_name: self.series_name,
            season_name: self.season_name,
            index_number: self.index_number,
            is_virtual: self.is_virtual,
            primary_version_id: self.primary_version_id,
            media_source_count: 1 + alternate_versions.len() as u32,
            alternate_versions,
            video_type: self.video_type.parse()?,
            video_3d_format,
            video_width: self.video_width,
        })
    }
}
