//! Library CRUD operations.

use std::path::PathBuf;

use chrono::Utc;
use rusqlite::Connection;
use vm_core::{Error, LibraryId, Result};

use crate::models::Library;

const COLS: &str = "id, name, media_type, paths, enabled, created_at";

/// Create a new, enabled library.
pub fn create_library(
    conn: &Connection,
    name: &str,
    media_type: &str,
    paths: &[String],
) -> Result<Library> {
    let id = LibraryId::new();
    let created_at = Utc::now().to_rfc3339();
    let paths_json = serde_json::to_string(paths).map_err(|e| Error::Internal(e.to_string()))?;

    conn.execute(
        "INSERT INTO libraries (id, name, media_type, paths, enabled, created_at)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)",
        rusqlite::params![id.to_string(), name, media_type, paths_json, created_at],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Library {
        id,
        name: name.to_string(),
        media_type: media_type.to_string(),
        paths: paths.to_vec(),
        enabled: true,
        created_at,
    })
}

/// Get a library by ID.
pub fn get_library(conn: &Connection, id: LibraryId) -> Result<Option<Library>> {
    let q = format!("SELECT {COLS} FROM libraries WHERE id = ?1");
    let result = conn.query_row(&q, [id.to_string()], Library::from_row);
    match result {
        Ok(l) => Ok(Some(l)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all libraries ordered by name.
pub fn list_libraries(conn: &Connection) -> Result<Vec<Library>> {
    let q = format!("SELECT {COLS} FROM libraries ORDER BY name");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Library::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Enable or disable a library. Disabled libraries contribute no roots.
pub fn set_library_enabled(conn: &Connection, id: LibraryId, enabled: bool) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE libraries SET enabled = ?1 WHERE id = ?2",
            rusqlite::params![enabled, id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete a library (cascades to items).
pub fn delete_library(conn: &Connection, id: LibraryId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM libraries WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Root paths of every enabled library, in library-name order.
pub fn list_enabled_roots(conn: &Connection) -> Result<Vec<PathBuf>> {
    Ok(list_libraries(conn)?
        .into_iter()
        .filter(|lib| lib.enabled)
        .flat_map(|lib| lib.paths)
        .map(PathBuf::from)
        .collect())
}
