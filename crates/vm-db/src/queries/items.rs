//! Item insert, lookup, list, and linkage update operations.

use chrono::Utc;
use rusqlite::Connection;
use vm_core::{Error, ItemId, LibraryId, LinkedVersion, MediaItem, Result};

use crate::models::Item;

/// Column list used in SELECT statements.
const COLS: &str = "id, library_id, item_kind, name, path, provider_ids, production_year,
    series_name, season_name, index_number, is_virtual, video_type,
    video_3d_format, video_width, primary_version_id, alternate_versions,
    created_at, updated_at";

/// Insert `item` into `library_id`, keeping the item's own id.
pub fn create_item(conn: &Connection, library_id: LibraryId, item: &MediaItem) -> Result<Item> {
    let now = Utc::now().to_rfc3339();
    let provider_ids =
        serde_json::to_string(&item.provider_ids).map_err(|e| Error::Internal(e.to_string()))?;
    let alternates = serde_json::to_string(&item.alternate_versions)
        .map_err(|e| Error::Internal(e.to_string()))?;

    conn.execute(
        "INSERT INTO items (id, library_id, item_kind, name, path, provider_ids,
            production_year, series_name, season_name, index_number, is_virtual,
            video_type, video_3d_format, video_width, primary_version_id,
            alternate_versions, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
        rusqlite::params![
            item.id.to_string(),
            library_id.to_string(),
            item.kind.to_string(),
            item.name,
            item.path.to_string_lossy(),
            provider_ids,
            item.production_year,
            item.series_name,
            item.season_name,
            item.index_number,
            item.is_virtual,
            item.video_type.to_string(),
            item.video_3d_format.map(|f| f.to_string()),
            item.video_width,
            item.primary_version_id.map(|p| p.to_string()),
            alternates,
            &now,
            &now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_item(conn, item.id)?.ok_or_else(|| Error::not_found("item", item.id))
}

/// Get an item by ID.
pub fn get_item(conn: &Connection, id: ItemId) -> Result<Option<Item>> {
    let q = format!("SELECT {COLS} FROM items WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], Item::from_row);
    match result {
        Ok(i) => Ok(Some(i)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List every item of `item_kind` in insertion order.
pub fn list_items_by_kind(
    conn: &Connection,
    item_kind: &str,
    include_virtual: bool,
) -> Result<Vec<Item>> {
    let q = format!(
        "SELECT {COLS} FROM items WHERE item_kind = ?1 AND (?2 OR is_virtual = 0)
         ORDER BY rowid ASC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![item_kind, include_virtual], Item::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Items whose primary reference points at `primary_id`.
pub fn list_alternates_of(conn: &Connection, primary_id: ItemId) -> Result<Vec<Item>> {
    let q = format!("SELECT {COLS} FROM items WHERE primary_version_id = ?1 ORDER BY rowid ASC");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([primary_id.to_string()], Item::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Overwrite the linkage columns of one item in a single statement.
///
/// Returns `false` if no row with `id` exists.
pub fn update_linkage(
    conn: &Connection,
    id: ItemId,
    primary_version_id: Option<ItemId>,
    alternate_versions: &[LinkedVersion],
) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let alternates =
        serde_json::to_string(alternate_versions).map_err(|e| Error::Internal(e.to_string()))?;
    let n = conn
        .execute(
            "UPDATE items SET primary_version_id = ?1, alternate_versions = ?2, updated_at = ?3
             WHERE id = ?4",
            rusqlite::params![
                primary_version_id.map(|p| p.to_string()),
                alternates,
                now,
                id.to_string(),
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete an item by ID.
pub fn delete_item(conn: &Connection, id: ItemId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM items WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
