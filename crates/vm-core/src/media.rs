//! Media-domain enums for item kinds, video container types, and 3D formats.
//!
//! All enums serialize in snake_case/lowercase and implement `Display` and
//! `FromStr` manually so the same spelling is used in JSON and in the
//! database text columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// Kind of catalog item.
///
/// Only [`ItemKind::Movie`] and [`ItemKind::Episode`] take part in version
/// consolidation; the container kinds exist so the catalog can hold a full
/// series hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Movie,
    Series,
    Season,
    Episode,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Series => write!(f, "series"),
            Self::Season => write!(f, "season"),
            Self::Episode => write!(f, "episode"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Self::Movie),
            "series" => Ok(Self::Series),
            "season" => Ok(Self::Season),
            "episode" => Ok(Self::Episode),
            other => Err(Error::Validation(format!("unknown item kind '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// VideoType
// ---------------------------------------------------------------------------

/// How the video of an item is stored on disk.
///
/// Anything other than a plain [`VideoType::VideoFile`] is a disc structure
/// and counts as an alternate format when electing a primary version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoType {
    #[default]
    VideoFile,
    Iso,
    Dvd,
    BluRay,
}

impl fmt::Display for VideoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoFile => write!(f, "video_file"),
            Self::Iso => write!(f, "iso"),
            Self::Dvd => write!(f, "dvd"),
            Self::BluRay => write!(f, "blu_ray"),
        }
    }
}

impl FromStr for VideoType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video_file" => Ok(Self::VideoFile),
            "iso" => Ok(Self::Iso),
            "dvd" => Ok(Self::Dvd),
            "blu_ray" => Ok(Self::BluRay),
            other => Err(Error::Validation(format!("unknown video type '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Video3DFormat
// ---------------------------------------------------------------------------

/// Stereoscopic layout of a 3D video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Video3DFormat {
    HalfSideBySide,
    FullSideBySide,
    FullTopAndBottom,
    HalfTopAndBottom,
    Mvc,
}

impl fmt::Display for Video3DFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HalfSideBySide => write!(f, "half_side_by_side"),
            Self::FullSideBySide => write!(f, "full_side_by_side"),
            Self::FullTopAndBottom => write!(f, "full_top_and_bottom"),
            Self::HalfTopAndBottom => write!(f, "half_top_and_bottom"),
            Self::Mvc => write!(f, "mvc"),
        }
    }
}

impl FromStr for Video3DFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "half_side_by_side" => Ok(Self::HalfSideBySide),
            "full_side_by_side" => Ok(Self::FullSideBySide),
            "full_top_and_bottom" => Ok(Self::FullTopAndBottom),
            "half_top_and_bottom" => Ok(Self::HalfTopAndBottom),
            "mvc" => Ok(Self::Mvc),
            other => Err(Error::Validation(format!("unknown 3D format '{other}'"))),
        }
    }
}
