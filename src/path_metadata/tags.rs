//! Direct tags of a path metadata entry
//!
//! Tags are kept in `properties` in insertion order.

use super::PathMetadataEntry;
use crate::error::Result;
use crate::tags::{self, FromTagValue, Tag, TagMap, TagValue, TypedTag};

impl PathMetadataEntry {
    fn tag_index(&self, key: &str) -> Option<usize> {
        self.properties.iter().rposition(|t| t.key == key)
    }

    /// Direct tags keyed by key; a later duplicate replaces an earlier one.
    pub fn tag_map(&self) -> TagMap {
        self.properties.iter().cloned().collect()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.properties
    }

    pub fn tag(&self, key: &str) -> Option<&Tag> {
        self.properties.iter().rev().find(|t| t.key == key)
    }

    /// Tag `key` with its value as `T`; missing keys and other value types
    /// are validation errors.
    pub fn tag_as<T: FromTagValue>(&self, key: &str) -> Result<TypedTag<T>> {
        let tag = self.tag(key).ok_or_else(|| tags::tag_missing(key))?;
        TypedTag::try_from_tag(tag)
    }

    pub fn tags_by_type<T: FromTagValue>(&self) -> Vec<TypedTag<T>> {
        self.properties.iter().filter_map(TypedTag::from_tag).collect()
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tag_index(key).is_some()
    }

    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Result<()> {
        let tag = Tag::new(key, value);
        tag.validate()?;
        if self.has_tag(&tag.key) {
            return Err(tags::tag_exists(&tag.key));
        }
        self.properties.push(tag);
        Ok(())
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Result<()> {
        let tag = Tag::new(key, value);
        tag.validate()?;
        let index = self.tag_index(&tag.key).ok_or_else(|| tags::tag_missing(&tag.key))?;
        self.properties[index] = tag;
        Ok(())
    }

    /// Append every tag of `batch` or none of them.
    pub fn add_tags(&mut self, batch: Vec<Tag>) -> Result<()> {
        tags::check_batch(&batch)?;
        if let Some(tag) = batch.iter().find(|t| self.has_tag(&t.key)) {
            return Err(tags::tag_exists(&tag.key));
        }
        self.properties.extend(batch);
        Ok(())
    }

    /// Replace every tag of `batch` or none of them.
    pub fn set_tags(&mut self, batch: Vec<Tag>) -> Result<()> {
        tags::check_batch(&batch)?;
        let mut indices = Vec::with_capacity(batch.len());
        for tag in &batch {
            indices.push(self.tag_index(&tag.key).ok_or_else(|| tags::tag_missing(&tag.key))?);
        }
        for (index, tag) in indices.into_iter().zip(batch) {
            self.properties[index] = tag;
        }
        Ok(())
    }

    /// Remove every property stored under `key`, returning the one that
    /// was in effect.
    pub fn remove_tag(&mut self, key: &str) -> Result<Tag> {
        let index = self.tag_index(key).ok_or_else(|| tags::tag_missing(key))?;
        let removed = self.properties.remove(index);
        self.properties.retain(|t| t.key != key);
        Ok(removed)
    }
}
