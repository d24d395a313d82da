//! Typed tag values
//!
//! A tag travels on the wire as `{"Key": str, "ValueType": u8, "Value": any}`.
//! In memory the value is a closed enum, so a tag's type id is always
//! derived from its value and can never disagree with it.

use crate::error::{EntryError, FieldContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Value type identifiers, 0x00 through 0x10
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TagValueType {
    String = 0x00,
    Integer = 0x01,
    Float = 0x02,
    Boolean = 0x03,
    Json = 0x04,
    Yaml = 0x05,
    StringList = 0x06,
    Uuid = 0x07,
    Hash = 0x08,
    Version = 0x09,
    Timestamp = 0x0a,
    Url = 0x0b,
    Email = 0x0c,
    Path = 0x0d,
    MimeType = 0x0e,
    Language = 0x0f,
    SpecialMetadata = 0x10,
}

impl TagValueType {
    pub fn from_u8(value: u8) -> Option<Self> {
        use TagValueType::*;
        let ty = match value {
            0x00 => String,
            0x01 => Integer,
            0x02 => Float,
            0x03 => Boolean,
            0x04 => Json,
            0x05 => Yaml,
            0x06 => StringList,
            0x07 => Uuid,
            0x08 => Hash,
            0x09 => Version,
            0x0a => Timestamp,
            0x0b => Url,
            0x0c => Email,
            0x0d => Path,
            0x0e => MimeType,
            0x0f => Language,
            0x10 => SpecialMetadata,
            _ => return None,
        };
        Some(ty)
    }

    pub fn name(self) -> &'static str {
        use TagValueType::*;
        match self {
            String => "string",
            Integer => "integer",
            Float => "float",
            Boolean => "boolean",
            Json => "json",
            Yaml => "yaml",
            StringList => "string-list",
            Uuid => "uuid",
            Hash => "hash",
            Version => "version",
            Timestamp => "timestamp",
            Url => "url",
            Email => "email",
            Path => "path",
            MimeType => "mime-type",
            Language => "language",
            SpecialMetadata => "special-metadata",
        }
    }
}

/// A tag value; the variant determines the [`TagValueType`]
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Json(JsonValue),
    Yaml(String),
    StringList(Vec<String>),
    Uuid(String),
    Hash(String),
    Version(String),
    /// ISO 8601 / RFC 3339 timestamp text
    Timestamp(String),
    Url(String),
    Email(String),
    Path(String),
    MimeType(String),
    /// ISO 639-1 language code
    Language(String),
    /// Reference to a special metadata file inside the package
    SpecialMetadata(String),
}

impl TagValue {
    pub fn value_type(&self) -> TagValueType {
        match self {
            TagValue::String(_) => TagValueType::String,
            TagValue::Integer(_) => TagValueType::Integer,
            TagValue::Float(_) => TagValueType::Float,
            TagValue::Boolean(_) => TagValueType::Boolean,
            TagValue::Json(_) => TagValueType::Json,
            TagValue::Yaml(_) => TagValueType::Yaml,
            TagValue::StringList(_) => TagValueType::StringList,
            TagValue::Uuid(_) => TagValueType::Uuid,
            TagValue::Hash(_) => TagValueType::Hash,
            TagValue::Version(_) => TagValueType::Version,
            TagValue::Timestamp(_) => TagValueType::Timestamp,
            TagValue::Url(_) => TagValueType::Url,
            TagValue::Email(_) => TagValueType::Email,
            TagValue::Path(_) => TagValueType::Path,
            TagValue::MimeType(_) => TagValueType::MimeType,
            TagValue::Language(_) => TagValueType::Language,
            TagValue::SpecialMetadata(_) => TagValueType::SpecialMetadata,
        }
    }

    /// Text payload of every string-carrying variant
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::String(s)
            | TagValue::Yaml(s)
            | TagValue::Uuid(s)
            | TagValue::Hash(s)
            | TagValue::Version(s)
            | TagValue::Timestamp(s)
            | TagValue::Url(s)
            | TagValue::Email(s)
            | TagValue::Path(s)
            | TagValue::MimeType(s)
            | TagValue::Language(s)
            | TagValue::SpecialMetadata(s) => Some(s),
            _ => None,
        }
    }

    /// Build a value of type `ty` from its JSON wire form.
    pub fn from_json(ty: TagValueType, value: JsonValue) -> Result<Self> {
        let mismatch = |value: &JsonValue| {
            EntryError::corruption(
                "tag value does not match its value type",
                FieldContext::new("Value", value, format!("{} value", ty.name())),
            )
        };
        let text = |value: JsonValue| match value {
            JsonValue::String(s) => Ok(s),
            other => Err(mismatch(&other)),
        };
        let parsed = match ty {
            TagValueType::Integer => match &value {
                JsonValue::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.2e18).map(|f| f as i64))
                    .map(TagValue::Integer)
                    .ok_or_else(|| mismatch(&value))?,
                _ => return Err(mismatch(&value)),
            },
            TagValueType::Float => value.as_f64().map(TagValue::Float).ok_or_else(|| mismatch(&value))?,
            TagValueType::Boolean => value.as_bool().map(TagValue::Boolean).ok_or_else(|| mismatch(&value))?,
            TagValueType::Json => TagValue::Json(value),
            TagValueType::StringList => match value {
                JsonValue::Array(items) => {
                    let mut list = Vec::with_capacity(items.len());
                    for item in items {
                        list.push(text(item)?);
                    }
                    TagValue::StringList(list)
                }
                JsonValue::String(s) if s.is_empty() => TagValue::StringList(Vec::new()),
                JsonValue::String(s) => {
                    TagValue::StringList(s.split(',').map(|p| p.trim().to_string()).collect())
                }
                other => return Err(mismatch(&other)),
            },
            TagValueType::String => TagValue::String(text(value)?),
            TagValueType::Yaml => TagValue::Yaml(text(value)?),
            TagValueType::Uuid => TagValue::Uuid(text(value)?),
            TagValueType::Hash => TagValue::Hash(text(value)?),
            TagValueType::Version => TagValue::Version(text(value)?),
            TagValueType::Timestamp => TagValue::Timestamp(text(value)?),
            TagValueType::Url => TagValue::Url(text(value)?),
            TagValueType::Email => TagValue::Email(text(value)?),
            TagValueType::Path => TagValue::Path(text(value)?),
            TagValueType::MimeType => TagValue::MimeType(text(value)?),
            TagValueType::Language => TagValue::Language(text(value)?),
            TagValueType::SpecialMetadata => TagValue::SpecialMetadata(text(value)?),
        };
        Ok(parsed)
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            TagValue::Integer(i) => JsonValue::from(*i),
            TagValue::Float(f) => JsonValue::from(*f),
            TagValue::Boolean(b) => JsonValue::Bool(*b),
            TagValue::Json(v) => v.clone(),
            TagValue::StringList(list) => JsonValue::from(list.clone()),
            other => JsonValue::String(other.as_str().unwrap_or_default().to_string()),
        }
    }

    /// Semantic version carried by a `Version` value
    pub fn as_semver(&self) -> Option<semver::Version> {
        match self {
            TagValue::Version(v) => semver::Version::parse(v.trim_start_matches('v')).ok(),
            _ => None,
        }
    }

    /// Parsed RFC 3339 timestamp carried by a `Timestamp` value
    pub fn as_timestamp(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        match self {
            TagValue::Timestamp(t) => chrono::DateTime::parse_from_rfc3339(t).ok(),
            _ => None,
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::String(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::String(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Integer(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Float(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Boolean(value)
    }
}

impl From<Vec<String>> for TagValue {
    fn from(value: Vec<String>) -> Self {
        TagValue::StringList(value)
    }
}

impl From<JsonValue> for TagValue {
    fn from(value: JsonValue) -> Self {
        TagValue::Json(value)
    }
}

/// A key/value tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireTag", into = "WireTag")]
pub struct Tag {
    pub key: String,
    pub value: TagValue,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a tag from an explicit type id and a JSON value.
    pub fn with_type(key: impl Into<String>, ty: TagValueType, value: JsonValue) -> Result<Self> {
        let value = TagValue::from_json(ty, value).map_err(|e| {
            EntryError::validation(e.message().to_string(), e.context().clone())
        })?;
        Ok(Tag {
            key: key.into(),
            value,
        })
    }

    pub fn value_type(&self) -> TagValueType {
        self.value.value_type()
    }

    /// Reject tags that could not survive serialization
    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(EntryError::validation(
                "tag key cannot be empty",
                FieldContext::new("key", format!("{:?}", self.key), "non-empty tag key"),
            ));
        }
        if let TagValue::Float(f) = self.value {
            if !f.is_finite() {
                return Err(EntryError::validation(
                    "tag float value must be finite",
                    FieldContext::new(self.key.as_str(), f, "finite number"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct WireTag {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "ValueType")]
    value_type: u8,
    #[serde(rename = "Value", default)]
    value: JsonValue,
}

impl TryFrom<WireTag> for Tag {
    type Error = EntryError;

    fn try_from(wire: WireTag) -> Result<Self> {
        let ty = TagValueType::from_u8(wire.value_type).ok_or_else(|| {
            EntryError::corruption(
                "invalid tag value type",
                FieldContext::new("ValueType", wire.value_type, "valid tag value type (0x00-0x10)"),
            )
        })?;
        Ok(Tag {
            key: wire.key,
            value: TagValue::from_json(ty, wire.value)?,
        })
    }
}

impl From<Tag> for WireTag {
    fn from(tag: Tag) -> Self {
        WireTag {
            value_type: tag.value_type() as u8,
            value: tag.value.to_json(),
            key: tag.key,
        }
    }
}

/// Extraction of a concrete Rust type from a [`TagValue`]
pub trait FromTagValue: Sized {
    /// Name used in type-mismatch errors
    const TYPE_NAME: &'static str;

    fn from_tag_value(value: &TagValue) -> Option<Self>;
}

impl FromTagValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_tag_value(value: &TagValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromTagValue for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn from_tag_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromTagValue for f64 {
    const TYPE_NAME: &'static str = "float";

    fn from_tag_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl FromTagValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_tag_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromTagValue for Vec<String> {
    const TYPE_NAME: &'static str = "string-list";

    fn from_tag_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::StringList(list) => Some(list.clone()),
            _ => None,
        }
    }
}

impl FromTagValue for JsonValue {
    const TYPE_NAME: &'static str = "json";

    fn from_tag_value(value: &TagValue) -> Option<Self> {
        match value {
            TagValue::Json(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// A tag whose value was extracted as `T`
#[derive(Debug, Clone, PartialEq)]
pub struct TypedTag<T> {
    pub key: String,
    pub value: T,
    pub value_type: TagValueType,
}

impl<T: FromTagValue> TypedTag<T> {
    pub fn from_tag(tag: &Tag) -> Option<Self> {
        T::from_tag_value(&tag.value).map(|value| TypedTag {
            key: tag.key.clone(),
            value,
            value_type: tag.value_type(),
        })
    }

    /// Like [`TypedTag::from_tag`], failing with a type-mismatch error.
    pub fn try_from_tag(tag: &Tag) -> Result<Self> {
        Self::from_tag(tag).ok_or_else(|| {
            EntryError::validation(
                "tag value type mismatch",
                FieldContext::new(tag.key.as_str(), tag.value_type().name(), T::TYPE_NAME),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_type_range() {
        assert_eq!(TagValueType::from_u8(0x10), Some(TagValueType::SpecialMetadata));
        assert_eq!(TagValueType::from_u8(0x11), None);
        for id in 0u8..=0x10 {
            assert_eq!(TagValueType::from_u8(id).map(|t| t as u8), Some(id));
        }
    }

    #[test]
    fn test_wire_shape() {
        let tag = Tag::new("count", 42i64);
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json, json!({"Key": "count", "ValueType": 1, "Value": 42}));
    }

    #[test]
    fn test_parse_each_type() {
        let cases = vec![
            (json!({"Key": "s", "ValueType": 0, "Value": "x"}), TagValue::String("x".into())),
            (json!({"Key": "i", "ValueType": 1, "Value": 3.0}), TagValue::Integer(3)),
            (json!({"Key": "f", "ValueType": 2, "Value": 1.5}), TagValue::Float(1.5)),
            (json!({"Key": "b", "ValueType": 3, "Value": true}), TagValue::Boolean(true)),
            (json!({"Key": "j", "ValueType": 4, "Value": {"a": 1}}), TagValue::Json(json!({"a": 1}))),
            (
                json!({"Key": "l", "ValueType": 6, "Value": "a, b"}),
                TagValue::StringList(vec!["a".into(), "b".into()]),
            ),
            (json!({"Key": "e", "ValueType": 12, "Value": "a@b.c"}), TagValue::Email("a@b.c".into())),
        ];
        for (wire, expected) in cases {
            let tag: Tag = serde_json::from_value(wire).unwrap();
            assert_eq!(tag.value, expected);
        }
    }

    #[test]
    fn test_parse_rejects_mismatched_value() {
        let bad = json!({"Key": "i", "ValueType": 1, "Value": "seven"});
        assert!(serde_json::from_value::<Tag>(bad).is_err());
        let bad = json!({"Key": "x", "ValueType": 17, "Value": "y"});
        assert!(serde_json::from_value::<Tag>(bad).is_err());
        let bad = json!({"ValueType": 0, "Value": "y"});
        assert!(serde_json::from_value::<Tag>(bad).is_err());
    }

    #[test]
    fn test_typed_extraction() {
        let tag = Tag::new("author", "Jane");
        assert_eq!(TypedTag::<String>::from_tag(&tag).unwrap().value, "Jane");
        let err = TypedTag::<i64>::try_from_tag(&tag).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.context().value, "string");
        assert_eq!(err.context().expected, "integer");

        let email = Tag::new("contact", TagValue::Email("j@x.org".into()));
        assert_eq!(TypedTag::<String>::from_tag(&email).unwrap().value_type, TagValueType::Email);
    }

    #[test]
    fn test_with_type() {
        let tag = Tag::with_type("v", TagValueType::Version, json!("1.2.3")).unwrap();
        assert_eq!(tag.value.as_semver(), Some(semver::Version::new(1, 2, 3)));
        assert!(Tag::with_type("v", TagValueType::Boolean, json!("yes")).unwrap_err().is_validation());
    }

    #[test]
    fn test_timestamp_accessor() {
        let value = TagValue::Timestamp("2024-05-01T10:00:00+02:00".into());
        let ts = value.as_timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1714550400);
        assert!(TagValue::Timestamp("yesterday".into()).as_timestamp().is_none());
    }

    #[test]
    fn test_validate() {
        assert!(Tag::new(" ", "x").validate().is_err());
        assert!(Tag::new("f", f64::NAN).validate().is_err());
        assert!(Tag::new("f", 0.5).validate().is_ok());
    }
}
