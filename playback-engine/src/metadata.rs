//! Timed metadata carried inside a stream
//!
//! Streams interleave metadata groups (ICY titles, ID3 frames, HLS date
//! ranges) with media. Each item may map to a normalized [`CommonKey`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::TimeRange;

/// Normalized metadata keys shared across container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommonKey {
    Title,
    Creator,
    Subject,
    Description,
    Publisher,
    Contributor,
    CreationDate,
    LastModifiedDate,
    Type,
    Format,
    Identifier,
    Source,
    Language,
    Relation,
    Location,
    Copyrights,
    AlbumName,
    Author,
    Artist,
    Artwork,
    Make,
    Model,
    Software,
}

impl CommonKey {
    pub const ALL: [CommonKey; 23] = [
        CommonKey::Title,
        CommonKey::Creator,
        CommonKey::Subject,
        CommonKey::Description,
        CommonKey::Publisher,
        CommonKey::Contributor,
        CommonKey::CreationDate,
        CommonKey::LastModifiedDate,
        CommonKey::Type,
        CommonKey::Format,
        CommonKey::Identifier,
        CommonKey::Source,
        CommonKey::Language,
        CommonKey::Relation,
        CommonKey::Location,
        CommonKey::Copyrights,
        CommonKey::AlbumName,
        CommonKey::Author,
        CommonKey::Artist,
        CommonKey::Artwork,
        CommonKey::Make,
        CommonKey::Model,
        CommonKey::Software,
    ];

    /// Raw key string, e.g. `"title"` or `"albumName"`
    pub fn as_str(&self) -> &'static str {
        match self {
            CommonKey::Title => "title",
            CommonKey::Creator => "creator",
            CommonKey::Subject => "subject",
            CommonKey::Description => "description",
            CommonKey::Publisher => "publisher",
            CommonKey::Contributor => "contributor",
            CommonKey::CreationDate => "creationDate",
            CommonKey::LastModifiedDate => "lastModifiedDate",
            CommonKey::Type => "type",
            CommonKey::Format => "format",
            CommonKey::Identifier => "identifier",
            CommonKey::Source => "source",
            CommonKey::Language => "language",
            CommonKey::Relation => "relation",
            CommonKey::Location => "location",
            CommonKey::Copyrights => "copyrights",
            CommonKey::AlbumName => "albumName",
            CommonKey::Author => "author",
            CommonKey::Artist => "artist",
            CommonKey::Artwork => "artwork",
            CommonKey::Make => "make",
            CommonKey::Model => "model",
            CommonKey::Software => "software",
        }
    }

    /// Look up a raw key; unrecognized keys yield `None`
    pub fn from_raw(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == raw)
    }
}

impl FromStr for CommonKey {
    type Err = UnknownCommonKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommonKey::from_raw(s).ok_or_else(|| UnknownCommonKey(s.to_string()))
    }
}

impl fmt::Display for CommonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw key that is not part of the common-key vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized metadata common key: {0}")]
pub struct UnknownCommonKey(pub String);

/// Decoded metadata payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Data(Vec<u8>),
    Date(DateTime<Utc>),
}

impl MetadataValue {
    /// The value as text, if it is string-valued
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A single metadata entry inside a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataItem {
    /// Format-specific key, e.g. `"StreamTitle"` or `"TIT2"`
    pub key: String,
    pub common_key: Option<CommonKey>,
    pub value: MetadataValue,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>, common_key: Option<CommonKey>, value: MetadataValue) -> Self {
        Self {
            key: key.into(),
            common_key,
            value,
        }
    }

    /// Build an item whose raw key maps onto the common-key vocabulary
    pub fn common(key: impl Into<String>, value: MetadataValue) -> Self {
        let key = key.into();
        let common_key = CommonKey::from_raw(&key);
        Self {
            key,
            common_key,
            value,
        }
    }
}

/// Metadata items that apply to one span of the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedMetadataGroup {
    pub time_range: Option<TimeRange>,
    pub items: Vec<MetadataItem>,
}

impl TimedMetadataGroup {
    pub fn new(items: Vec<MetadataItem>) -> Self {
        Self {
            time_range: None,
            items,
        }
    }
}

/// Push-delegate that receives metadata batches as the engine decodes them
///
/// The engine calls `timed_metadata` from its own delivery thread; one call
/// carries one batch, which may contain any number of groups.
pub trait MetadataOutput: Send + Sync {
    fn timed_metadata(&self, groups: &[TimedMetadataGroup]);
}
