//! Primary-version election.

use std::cmp::Reverse;

use vm_core::MediaItem;

/// Pick the item that represents a duplicate group.
///
/// A sole item that already carries several media sources and points at no
/// other primary keeps the role. Otherwise plain-file, non-3D items beat
/// alternate formats, then wider video wins; the item id breaks any
/// remaining tie so the result never depends on input order.
///
/// Returns `None` only for an empty slice.
pub fn elect_primary(items: &[MediaItem]) -> Option<&MediaItem> {
    let mut established = items
        .iter()
        .filter(|item| item.media_source_count > 1 && item.primary_version_id.is_none());
    if let (Some(only), None) = (established.next(), established.next()) {
        return Some(only);
    }

    items.iter().min_by_key(|item| {
        (
            format_penalty(item),
            Reverse(item.video_width.unwrap_or(0)),
            item.id,
        )
    })
}

fn format_penalty(item: &MediaItem) -> u8 {
    u8::from(item.is_alternate_format())
}
