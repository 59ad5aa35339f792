//! # Record types
//!
//! A [`Record`] is the catalog entry served by the crate: a store-assigned
//! [`RecordId`] plus a title and a description. Identifier `0` is reserved as
//! the "not found" sentinel and is never issued by the allocator nor stored in
//! the cache.
//!
//! Records travel to the store as attribute maps ([`Item`]) using the
//! attribute names [`ID_ATTRIBUTE`], [`TITLE_ATTRIBUTE`] and
//! [`DESCRIPTION_ATTRIBUTE`].

use crate::{
    error::{Error, Result},
    store::{AttributeValue, Item, StoreError},
};
use core::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};

/// Numeric key attribute of the records table.
pub const ID_ATTRIBUTE: &str = "Id";
/// String attribute holding a record's title.
pub const TITLE_ATTRIBUTE: &str = "Title";
/// String attribute holding a record's description.
pub const DESCRIPTION_ATTRIBUTE: &str = "Description";

/// Placeholder text carried by the sentinel record.
pub const NOT_FOUND_TEXT: &str = "Not found";

/// Longest title accepted by [`NewRecord::validate`], in characters.
pub const MAX_TITLE_LEN: usize = 256;
/// Longest description accepted by [`NewRecord::validate`], in characters.
pub const MAX_DESCRIPTION_LEN: usize = 4096;

/// Identifier of a stored record.
///
/// Issued by [`IdAllocator`](crate::IdAllocator) in strictly increasing order.
/// [`RecordId::SENTINEL`] (`0`) never names a stored record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// The reserved "not found" identifier.
    pub const SENTINEL: Self = Self(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_sentinel(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn to_attribute(self) -> AttributeValue {
        AttributeValue::N(self.0.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    /// Parses a decimal identifier such as the `{id}` segment of a request
    /// path.
    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| Error::Parse {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

/// A catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub description: String,
}

impl Record {
    pub fn new(id: RecordId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
        }
    }

    /// The "not found" record: id `0` with placeholder text.
    pub fn sentinel() -> Self {
        Self::new(RecordId::SENTINEL, NOT_FOUND_TEXT, NOT_FOUND_TEXT)
    }

    pub const fn is_sentinel(&self) -> bool {
        self.id.is_sentinel()
    }

    /// The key item addressing `id` in the records table.
    pub fn key_item(id: RecordId) -> Item {
        Item::from([(ID_ATTRIBUTE.to_string(), id.to_attribute())])
    }

    /// Encodes the record as a store item.
    pub fn to_item(&self) -> Item {
        Item::from([
            (ID_ATTRIBUTE.to_string(), self.id.to_attribute()),
            (
                TITLE_ATTRIBUTE.to_string(),
                AttributeValue::S(self.title.clone()),
            ),
            (
                DESCRIPTION_ATTRIBUTE.to_string(),
                AttributeValue::S(self.description.clone()),
            ),
        ])
    }

    /// Decodes a store item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if an attribute is missing, has the
    /// wrong type, or the id is not a positive integer.
    pub fn from_item(item: &Item) -> core::result::Result<Self, StoreError> {
        let id = match item.get(ID_ATTRIBUTE) {
            Some(value) => value.as_u64(ID_ATTRIBUTE)?,
            None => return Err(StoreError::missing(ID_ATTRIBUTE)),
        };
        if id == 0 {
            return Err(StoreError::Malformed {
                reason: "stored record carries the sentinel id 0".to_string(),
            });
        }

        Ok(Self {
            id: RecordId(id),
            title: string_attribute(item, TITLE_ATTRIBUTE)?,
            description: string_attribute(item, DESCRIPTION_ATTRIBUTE)?,
        })
    }
}

fn string_attribute(item: &Item, name: &str) -> core::result::Result<String, StoreError> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Ok(value.clone()),
        Some(AttributeValue::N(_)) => Err(StoreError::Malformed {
            reason: format!("attribute `{name}` must be a string"),
        }),
        None => Err(StoreError::missing(name)),
    }
}

/// Payload of a create request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl NewRecord {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a blank title or for fields longer
    /// than [`MAX_TITLE_LEN`] / [`MAX_DESCRIPTION_LEN`].
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation {
                reason: "title must not be empty".to_string(),
            });
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(Error::Validation {
                reason: format!("title exceeds {MAX_TITLE_LEN} characters"),
            });
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(Error::Validation {
                reason: format!("description exceeds {MAX_DESCRIPTION_LEN} characters"),
            });
        }
        Ok(())
    }

    pub(crate) fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            title: self.title,
            description: self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_ids() {
        assert_eq!("42".parse::<RecordId>().unwrap(), RecordId::new(42));
        assert_eq!(" 7 ".parse::<RecordId>().unwrap(), RecordId::new(7));
    }

    #[test]
    fn rejects_non_numeric_ids() {
        for raw in ["abc", "-1", "", "1.5"] {
            let err = raw.parse::<RecordId>().unwrap_err();
            assert!(matches!(err, Error::Parse { ref input, .. } if input == raw));
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn sentinel_is_reserved() {
        let sentinel = Record::sentinel();
        assert!(sentinel.is_sentinel());
        assert_eq!(sentinel.title, NOT_FOUND_TEXT);
        assert!(!Record::new(RecordId::new(1), "a", "b").is_sentinel());
    }

    #[test]
    fn item_encoding_uses_store_attribute_names() {
        let record = Record::new(RecordId::new(9), "Buy milk", "2%");
        let item = record.to_item();
        assert_eq!(item.get("Id"), Some(&AttributeValue::N("9".to_string())));
        assert_eq!(
            item.get("Title"),
            Some(&AttributeValue::S("Buy milk".to_string()))
        );
        assert_eq!(Record::from_item(&item).unwrap(), record);
    }

    #[test]
    fn decoding_rejects_malformed_items() {
        let mut item = Record::new(RecordId::new(3), "t", "d").to_item();
        item.remove("Title");
        assert!(matches!(
            Record::from_item(&item),
            Err(StoreError::Malformed { .. })
        ));

        let mut item = Record::new(RecordId::new(3), "t", "d").to_item();
        item.insert("Id".to_string(), AttributeValue::N("0".to_string()));
        assert!(Record::from_item(&item).is_err());

        let mut item = Record::new(RecordId::new(3), "t", "d").to_item();
        item.insert("Id".to_string(), AttributeValue::S("3".to_string()));
        assert!(Record::from_item(&item).is_err());
    }

    #[test]
    fn validation_rules() {
        assert!(NewRecord::new("Buy milk", "").validate().is_ok());
        assert!(matches!(
            NewRecord::new("   ", "x").validate(),
            Err(Error::Validation { .. })
        ));
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(NewRecord::new(long, "").validate().is_err());
        let long = "y".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(NewRecord::new("ok", long).validate().is_err());
    }

    #[test]
    fn payload_description_defaults_to_empty() {
        let payload: NewRecord = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(payload, NewRecord::new("t", ""));
    }
}
