//! Note model

use std::collections::BTreeSet;
use std::time::SystemTime;

use serde::{Deserialize, Deserializer, Serialize};

use crate::timestamp;
use crate::Result;

/// A note as exchanged with the remote store.
///
/// Field names on the wire are the store's lowercase names (`modifydate`,
/// `syncnum`, ...). Timestamps stay in their fixed-point string form; use
/// [`Note::modified_at`] to get an instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Opaque store-assigned key; empty until the note exists remotely
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// UTF-8 text body
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub content: String,
    /// User tags
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub tags: Vec<String>,
    /// Store-managed tags (pinned, markdown, ...)
    #[serde(
        rename = "systemtags",
        default,
        deserialize_with = "wire::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub system_tags: Vec<String>,
    /// Creation instant, fixed-point Unix seconds
    #[serde(
        rename = "createdate",
        default,
        deserialize_with = "wire::fixed_point",
        skip_serializing_if = "String::is_empty"
    )]
    pub create_date: String,
    /// Last modification instant known to the store, fixed-point Unix seconds
    #[serde(
        rename = "modifydate",
        default,
        deserialize_with = "wire::fixed_point",
        skip_serializing_if = "String::is_empty"
    )]
    pub modify_date: String,
    /// Tombstone flag; nonzero once trashed remotely
    #[serde(default, deserialize_with = "wire::flag")]
    pub deleted: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: u64,
    #[serde(rename = "syncnum", default, skip_serializing_if = "is_zero")]
    pub sync_num: u64,
    #[serde(rename = "minversion", default, skip_serializing_if = "is_zero")]
    pub min_version: u64,
}

impl Note {
    /// Create a note that does not exist remotely yet.
    #[must_use]
    pub fn new(content: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            content: content.into(),
            tags,
            ..Self::default()
        }
    }

    /// True when the remote copy has been trashed.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted != 0
    }

    /// Parsed `modifydate`.
    pub fn modified_at(&self) -> Result<SystemTime> {
        timestamp::parse(&self.modify_date)
    }

    /// First non-blank line of the content.
    #[must_use]
    pub fn title(&self) -> &str {
        self.content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }

    /// Tag equality ignoring order and duplicates.
    #[must_use]
    pub fn same_tags(&self, other: &[String]) -> bool {
        tag_set(&self.tags) == tag_set(other)
    }
}

fn tag_set(tags: &[String]) -> BTreeSet<&str> {
    tags.iter().map(String::as_str).collect()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Lenient decoders for fields the store has been seen to encode loosely.
mod wire {
    use super::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FixedPoint {
        Text(String),
        Number(serde_json::Number),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Int(i64),
        Bool(bool),
    }

    pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub fn fixed_point<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(
            match Option::<FixedPoint>::deserialize(deserializer)? {
                None => String::new(),
                Some(FixedPoint::Text(text)) => text,
                Some(FixedPoint::Number(number)) => number.to_string(),
            },
        )
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Flag>::deserialize(deserializer)? {
            None => 0,
            Some(Flag::Int(value)) => value,
            Some(Flag::Bool(value)) => i64::from(value),
        })
    }
}

/// One page of the remote index, or several pages folded together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Number of summaries the store reported
    #[serde(default)]
    pub count: u64,
    /// Note summaries, usually without `content`
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub data: Vec<Note>,
    /// Server time of the listing
    #[serde(default, deserialize_with = "wire::fixed_point")]
    pub time: String,
    /// Paging cursor; empty on the last page
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub mark: String,
}

impl Index {
    /// Cursor for the following page, if any.
    #[must_use]
    pub fn next_mark(&self) -> Option<&str> {
        let mark = self.mark.trim();
        if mark.is_empty() {
            None
        } else {
            Some(mark)
        }
    }

    /// Fold a freshly fetched page into this accumulated index.
    pub fn absorb(&mut self, page: Self) {
        self.count += page.count;
        self.time = page.time;
        self.mark = page.mark;
        self.data.extend(page.data);
    }
}
