//! Serde adapters storing [`Uuid`] values as hyphenated strings.
//!
//! The BSON serializer is not human readable, so a bare `Uuid` would be written
//! as binary while query documents built with `doc!` carry strings. Storing
//! strings keeps both sides identical.

use serde::{Deserialize, Deserializer, Serializer};
use uuid::Uuid;

pub fn serialize<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&id.hyphenated())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Uuid::parse_str(&raw).map_err(serde::de::Error::custom)
}

/// Same encoding for `Option<Uuid>`
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(id: &Option<Uuid>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(&id.hyphenated()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Uuid>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| Uuid::parse_str(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
