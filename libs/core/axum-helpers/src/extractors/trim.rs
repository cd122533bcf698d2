//! `deserialize_with` helpers that trim surrounding whitespace, so length
//! rules run against what will actually be stored.
//!
//! ```ignore
//! #[derive(Deserialize, Validate)]
//! struct CreateCategory {
//!     #[serde(deserialize_with = "trim::string")]
//!     #[validate(length(min = 2, max = 100))]
//!     name: String,
//!     #[serde(default, deserialize_with = "trim::option")]
//!     icon: Option<String>,
//! }
//! ```

use serde::{Deserialize, Deserializer};

pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

/// Blank strings become `None`.
pub fn option<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<String>::deserialize(deserializer).map(|value| {
        value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Input {
        #[serde(deserialize_with = "super::string")]
        name: String,
        #[serde(default, deserialize_with = "super::option")]
        icon: Option<String>,
    }

    #[test]
    fn test_trims_and_blanks_to_none() {
        let input: Input = serde_json::from_str(r#"{"name":"  Shoes ","icon":"   "}"#).unwrap();
        assert_eq!(input.name, "Shoes");
        assert_eq!(input.icon, None);

        let input: Input = serde_json::from_str(r#"{"name":"Shoes"}"#).unwrap();
        assert_eq!(input.icon, None);
    }
}
