//! Typed key/value tags
//!
//! File entries keep their tags as a JSON array inside the optional-data
//! slot of type `0x00` (see [`store`]); path metadata entries keep them as
//! a plain list. Both sides share the contracts enforced by [`TagMap`]:
//! `add` refuses existing keys, `set` and `remove` refuse missing keys,
//! and batch variants check every key before changing anything.

mod store;
mod value;

pub use store::TagRead;
pub use value::{FromTagValue, Tag, TagValue, TagValueType, TypedTag};

use crate::error::{EntryError, FieldContext, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Tags keyed by tag key, iterated in key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMap {
    tags: BTreeMap<String, Tag>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.tags.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<Tag> {
        self.tags.into_values().collect()
    }

    /// Insert or replace without any contract checks; returns the old tag.
    pub fn insert(&mut self, tag: Tag) -> Option<Tag> {
        self.tags.insert(tag.key.clone(), tag)
    }

    /// Insert only when the key is not present yet.
    pub fn insert_missing(&mut self, tag: Tag) -> bool {
        if self.tags.contains_key(&tag.key) {
            return false;
        }
        self.tags.insert(tag.key.clone(), tag);
        true
    }

    /// Fill keys not present yet from `other`.
    pub fn merge_missing<'a>(&mut self, other: impl IntoIterator<Item = &'a Tag>) {
        for tag in other {
            self.insert_missing(tag.clone());
        }
    }

    pub fn add(&mut self, tag: Tag) -> Result<()> {
        tag.validate()?;
        if self.contains(&tag.key) {
            return Err(tag_exists(&tag.key));
        }
        self.insert(tag);
        Ok(())
    }

    pub fn set(&mut self, tag: Tag) -> Result<()> {
        tag.validate()?;
        if !self.contains(&tag.key) {
            return Err(tag_missing(&tag.key));
        }
        self.insert(tag);
        Ok(())
    }

    /// Add every tag or none of them.
    pub fn add_many(&mut self, tags: Vec<Tag>) -> Result<()> {
        check_batch(&tags)?;
        if let Some(tag) = tags.iter().find(|t| self.contains(&t.key)) {
            return Err(tag_exists(&tag.key));
        }
        for tag in tags {
            self.insert(tag);
        }
        Ok(())
    }

    /// Replace every tag or none of them.
    pub fn set_many(&mut self, tags: Vec<Tag>) -> Result<()> {
        check_batch(&tags)?;
        if let Some(tag) = tags.iter().find(|t| !self.contains(&t.key)) {
            return Err(tag_missing(&tag.key));
        }
        for tag in tags {
            self.insert(tag);
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<Tag> {
        self.tags.remove(key).ok_or_else(|| tag_missing(key))
    }

    pub fn require(&self, key: &str) -> Result<&Tag> {
        self.get(key).ok_or_else(|| tag_missing(key))
    }

    /// Tag `key` with its value extracted as `T`.
    pub fn typed<T: FromTagValue>(&self, key: &str) -> Result<TypedTag<T>> {
        TypedTag::try_from_tag(self.require(key)?)
    }

    /// Every tag whose value converts to `T`, in key order.
    pub fn by_type<T: FromTagValue>(&self) -> Vec<TypedTag<T>> {
        self.iter().filter_map(TypedTag::from_tag).collect()
    }
}

/// Later tags win on duplicate keys.
impl FromIterator<Tag> for TagMap {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut map = TagMap::new();
        for tag in iter {
            map.insert(tag);
        }
        map
    }
}

impl<'a> IntoIterator for &'a TagMap {
    type Item = &'a Tag;
    type IntoIter = std::collections::btree_map::Values<'a, String, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.values()
    }
}

/// Validate each tag of a batch and reject keys repeated inside it.
pub(crate) fn check_batch(tags: &[Tag]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for tag in tags {
        tag.validate()?;
        if !seen.insert(tag.key.as_str()) {
            return Err(EntryError::validation(
                "duplicate tag key in input",
                FieldContext::new("key", tag.key.as_str(), "unique keys"),
            ));
        }
    }
    Ok(())
}

pub(crate) fn tag_exists(key: &str) -> EntryError {
    EntryError::validation("tag already exists", FieldContext::new("key", key, "key not present"))
}

pub(crate) fn tag_missing(key: &str) -> EntryError {
    EntryError::validation("tag does not exist", FieldContext::new("key", key, "existing tag key"))
}
