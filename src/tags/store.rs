//! File entry tags stored in the `0x00` optional-data slot
//!
//! Reading is forgiving: elements that fail to parse are dropped and
//! reported, and the slot is rewritten with whatever survived so a broken
//! element is only ever reported once.

use super::{FromTagValue, Tag, TagMap, TagValue, TypedTag};
use crate::error::{EntryError, FieldContext, Result};
use crate::file_entry::FileEntry;
use crate::optional_data::{OptionalDataEntry, TAGS_DATA_TYPE};
use serde_json::Value as JsonValue;
use tracing::warn;

/// Outcome of reading a tag slot
///
/// `tags` holds every tag that could be recovered. `corruption` is set
/// when the slot, or some of its elements, could not be parsed.
#[derive(Debug, Default)]
pub struct TagRead {
    pub tags: TagMap,
    pub corruption: Option<EntryError>,
}

impl TagRead {
    pub fn is_clean(&self) -> bool {
        self.corruption.is_none()
    }

    /// Turn a partial read into an error.
    pub fn into_result(self) -> Result<TagMap> {
        match self.corruption {
            Some(err) => Err(err),
            None => Ok(self.tags),
        }
    }
}

enum SlotState {
    Missing,
    Unparseable,
    Parsed,
}

impl FileEntry {
    fn tag_slot(&self) -> Option<usize> {
        self.optional_data.iter().position(|o| o.data_type == TAGS_DATA_TYPE)
    }

    fn parse_tag_slot(&self) -> (TagRead, SlotState) {
        let Some(index) = self.tag_slot() else {
            return (TagRead::default(), SlotState::Missing);
        };
        let data = &self.optional_data[index].data;

        let elements: Vec<JsonValue> = match serde_json::from_slice(data) {
            Ok(elements) => elements,
            Err(e) => {
                let err = EntryError::corruption(
                    "failed to parse tags JSON",
                    FieldContext::new("tags_data", format!("{} bytes", data.len()), "JSON array of tags"),
                )
                .with_source(e);
                let read = TagRead {
                    tags: TagMap::new(),
                    corruption: Some(err),
                };
                return (read, SlotState::Unparseable);
            }
        };

        let mut tags = TagMap::new();
        let mut dropped = 0usize;
        let mut first_error = None;
        for (i, element) in elements.into_iter().enumerate() {
            match serde_json::from_value::<Tag>(element) {
                Ok(tag) => {
                    tags.insert(tag);
                }
                Err(e) => {
                    dropped += 1;
                    first_error.get_or_insert_with(|| {
                        EntryError::corruption(
                            format!("failed to parse tag element {}", i),
                            FieldContext::new("tags", i, "object with Key, ValueType and Value"),
                        )
                        .with_source(e)
                    });
                }
            }
        }

        let corruption = first_error.map(|err| {
            err.wrap(
                "encountered corrupted tags during parsing",
                FieldContext::new("corrupted_tags", dropped, "all tags valid"),
            )
        });
        (TagRead { tags, corruption }, SlotState::Parsed)
    }

    /// Parse the tag slot without touching the entry.
    pub fn peek_tags(&self) -> TagRead {
        self.parse_tag_slot().0
    }

    /// Parse the tag slot and heal it.
    ///
    /// An unparseable slot is removed and reported with an empty map.
    /// Otherwise the recovered tags are written back, or the slot is
    /// removed when nothing survived. A failed write-back is reported in
    /// `corruption` and leaves the slot as it was.
    pub fn read_tags(&mut self) -> TagRead {
        let (mut read, state) = self.parse_tag_slot();
        match state {
            SlotState::Missing => {}
            SlotState::Unparseable => {
                warn!(file_id = self.file_id(), "removing unparseable tag slot");
                self.remove_tag_slot();
            }
            SlotState::Parsed if read.tags.is_empty() => {
                if read.corruption.is_some() {
                    warn!(file_id = self.file_id(), "no tags survived parsing, removing tag slot");
                }
                self.remove_tag_slot();
            }
            SlotState::Parsed => {
                if let Some(err) = &read.corruption {
                    warn!(file_id = self.file_id(), error = %err, kept = read.tags.len(), "dropping corrupted tags");
                }
                if let Err(e) = self.write_tags(&read.tags) {
                    warn!(file_id = self.file_id(), error = %e, "failed to rewrite recovered tags");
                    let context = FieldContext::new("tags_data", read.tags.len(), "tag slot rewritten");
                    read.corruption = Some(match read.corruption.take() {
                        Some(prior) => prior.wrap("failed to rewrite recovered tags", context),
                        None => e.wrap("failed to rewrite recovered tags", context),
                    });
                }
            }
        }
        read
    }

    /// Serialize `tags` into the tag slot, creating it when absent.
    pub fn write_tags(&mut self, tags: &TagMap) -> Result<()> {
        let list: Vec<&Tag> = tags.iter().collect();
        let bytes = serde_json::to_vec(&list).map_err(|e| {
            EntryError::validation(
                "failed to serialize tags",
                FieldContext::new("tags", tags.len(), "serializable tags"),
            )
            .with_source(e)
        })?;

        match self.tag_slot() {
            Some(index) => self.optional_data[index].set_data(bytes)?,
            None => {
                let mut slot = OptionalDataEntry::new(TAGS_DATA_TYPE, Vec::new());
                slot.set_data(bytes)?;
                self.optional_data.push(slot);
            }
        }
        self.refresh_optional_data_len();
        Ok(())
    }

    fn remove_tag_slot(&mut self) {
        if let Some(index) = self.tag_slot() {
            self.optional_data.remove(index);
            self.refresh_optional_data_len();
        }
    }

    /// Read tags for a mutation; corruption fails the call after healing.
    fn load_tags(&mut self) -> Result<TagMap> {
        self.read_tags().into_result()
    }

    fn update_tags(&mut self, change: impl FnOnce(&mut TagMap) -> Result<()>) -> Result<()> {
        let mut tags = self.load_tags()?;
        change(&mut tags)?;
        self.write_tags(&tags)
    }

    /// All tags in key order.
    pub fn tags(&mut self) -> Result<Vec<Tag>> {
        Ok(self.load_tags()?.into_vec())
    }

    /// Tags whose value converts to `T`.
    pub fn tags_by_type<T: FromTagValue>(&mut self) -> Result<Vec<TypedTag<T>>> {
        Ok(self.load_tags()?.by_type())
    }

    pub fn tag(&mut self, key: &str) -> Result<Tag> {
        self.load_tags()?.remove(key)
    }

    /// Tag `key` with its value as `T`; a stored value of another type is a
    /// validation error.
    pub fn tag_as<T: FromTagValue>(&mut self, key: &str) -> Result<TypedTag<T>> {
        self.load_tags()?.typed(key)
    }

    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Result<()> {
        let tag = Tag::new(key, value);
        self.update_tags(|tags| tags.add(tag))
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Result<()> {
        let tag = Tag::new(key, value);
        self.update_tags(|tags| tags.set(tag))
    }

    pub fn add_tags(&mut self, batch: Vec<Tag>) -> Result<()> {
        self.update_tags(|tags| tags.add_many(batch))
    }

    pub fn set_tags(&mut self, batch: Vec<Tag>) -> Result<()> {
        self.update_tags(|tags| tags.set_many(batch))
    }

    pub fn remove_tag(&mut self, key: &str) -> Result<()> {
        self.update_tags(|tags| tags.remove(key).map(drop))
    }

    /// `false` when the key is absent or the slot cannot be read.
    pub fn has_tag(&self, key: &str) -> bool {
        self.peek_tags().into_result().map(|t| t.contains(key)).unwrap_or(false)
    }

    /// `false` when there are no tags or the slot cannot be read.
    pub fn has_tags(&self) -> bool {
        self.peek_tags().into_result().map(|t| !t.is_empty()).unwrap_or(false)
    }

    /// Read and rewrite the tag slot.
    pub fn sync_tags(&mut self) -> Result<()> {
        let tags = self.load_tags()?;
        if tags.is_empty() {
            return Ok(());
        }
        self.write_tags(&tags)
    }
}
