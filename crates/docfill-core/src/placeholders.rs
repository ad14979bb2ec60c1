//! Ordered marker-token → replacement map
//!
//! Replacements are applied in the order keys were supplied, so the map keeps
//! insertion order (including when deserialized from a JSON object).

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reserved key that receives the generated reference number
pub const REFERENCE_NUMBER_KEY: &str = "<<Reference Number>>";

/// Marker replaced by the signature image
pub const SIGNATURE_IMAGE_KEY: &str = "<<Signature Image>>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    entries: Vec<(String, String)>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value; an existing key keeps its position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlaceholderMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = PlaceholderMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for PlaceholderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlaceholderMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PlaceholderVisitor;

        impl<'de> Visitor<'de> for PlaceholderVisitor {
            type Value = PlaceholderMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of string placeholders")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = PlaceholderMap::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(PlaceholderVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_keeps_document_order() {
        let json = r#"{"<<Zeta>>":"z","<<Alpha>>":"a","<<Mid>>":"m"}"#;
        let map: PlaceholderMap = serde_json::from_str(json).unwrap();

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["<<Zeta>>", "<<Alpha>>", "<<Mid>>"]);
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut map: PlaceholderMap = [("<<A>>", "1"), ("<<B>>", "2")].into_iter().collect();
        map.insert("<<A>>", "3");

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("<<A>>"), Some("3"));
        assert_eq!(map.keys().next(), Some("<<A>>"));
    }

    #[test]
    fn test_non_string_values_are_rejected() {
        let result = serde_json::from_str::<PlaceholderMap>(r#"{"<<A>>": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_round_trips_through_json() {
        let map: PlaceholderMap = [("<<Name>>", "Jane")].into_iter().collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"<<Name>>":"Jane"}"#);
    }
}
