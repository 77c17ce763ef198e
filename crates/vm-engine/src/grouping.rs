//! Partitioning eligible items into duplicate groups.
//!
//! Keys compare ordinally and case-sensitively. Groups are collected in a
//! `BTreeMap` so the output order depends only on the keys.

use std::collections::BTreeMap;
use std::fmt;

use vm_core::config::MergeConfig;
use vm_core::{ItemId, ItemKind, MediaItem};

/// The attribute tuple deciding that two items are the same title.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupingKey {
    /// Movie identified by an external provider id.
    Provider { provider: String, id: String },
    /// Movie without a provider id, matched on title and year.
    Title { name: String, year: Option<i32> },
    Episode {
        series: Option<String>,
        season: Option<String>,
        name: String,
        index: Option<i32>,
        year: Option<i32>,
    },
}

impl GroupingKey {
    /// Derive the key for `item`, or `None` if it cannot be grouped.
    pub fn for_item(item: &MediaItem, config: &MergeConfig) -> Option<Self> {
        match item.kind {
            ItemKind::Movie => match item.provider_id(&config.provider) {
                Some(id) if !id.is_empty() => Some(Self::Provider {
                    provider: config.provider.clone(),
                    id: id.to_string(),
                }),
                _ if config.match_movies_by_title => Some(Self::Title {
                    name: item.name.clone(),
                    year: item.production_year,
                }),
                _ => None,
            },
            ItemKind::Episode => Some(Self::Episode {
                series: item.series_name.clone(),
                season: item.season_name.clone(),
                name: item.name.clone(),
                index: item.index_number,
                year: item.production_year,
            }),
            ItemKind::Series | ItemKind::Season => None,
        }
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "?".to_string(), ToString::to_string)
        }

        match self {
            Self::Provider { provider, id } => write!(f, "{provider}:{id}"),
            Self::Title { name, year } => write!(f, "{name} ({})", opt(year)),
            Self::Episode {
                series,
                season,
                name,
                index,
                year,
            } => write!(
                f,
                "{} / {} / E{} {name} ({})",
                opt(series),
                opt(season),
                opt(index),
                opt(year)
            ),
        }
    }
}

/// A transient set of at least two items sharing a [`GroupingKey`].
#[derive(Debug, Clone)]
pub struct Group {
    pub key: GroupingKey,
    /// Members as seen at listing time; reconciliation re-fetches them.
    pub members: Vec<MediaItem>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.members.iter().map(|m| m.id).collect()
    }

    /// True if the listed members already form one primary with every
    /// other member linked under it and nothing left to flatten.
    pub fn is_consolidated(&self) -> bool {
        let mut roots = self.members.iter().filter(|m| m.primary_version_id.is_none());
        let (Some(primary), None) = (roots.next(), roots.next()) else {
            return false;
        };

        self.members
            .iter()
            .filter(|m| m.id != primary.id)
            .all(|m| {
                m.primary_version_id == Some(primary.id)
                    && !m.has_alternates()
                    && primary.lists_alternate_path(&m.path)
            })
    }
}

/// Partition `items` by grouping key, dropping keys with a single member
/// and items that have no key.
pub fn build_groups(items: Vec<MediaItem>, config: &MergeConfig) -> Vec<Group> {
    let mut buckets: BTreeMap<GroupingKey, Vec<MediaItem>> = BTreeMap::new();
    for item in items {
        if let Some(key) = GroupingKey::for_item(&item, config) {
            buckets.entry(key).or_default().push(item);
        }
    }

    buckets
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(key, members)| Group { key, members })
        .collect()
}
