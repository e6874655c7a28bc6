//! Structured key/value context attached to error nodes.
//!
//! Metadata carries the machine-readable part of an error: for validation
//! failures each entry is a `field -> violation` pair that the status
//! projection turns into a field-violation detail.
//!
//! # Memory Model
//!
//! Keys and values are `Cow<'static, str>` so catalog-style literals cost no
//! allocation. Owned values are zeroized when the collection is dropped or
//! overwritten, because validation context routinely echoes user input.
//!
//! The backing store is a `SmallVec<[_; 4]>`: it allocates nothing until the
//! first insert, and most errors carry at most a couple of entries.

use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use zeroize::Zeroize;

/// Single metadata pair.
#[derive(Clone)]
struct MetadataEntry {
    key: Cow<'static, str>,
    value: Cow<'static, str>,
}

impl Zeroize for MetadataEntry {
    fn zeroize(&mut self) {
        if let Cow::Owned(ref mut s) = self.key {
            s.zeroize();
        }
        if let Cow::Owned(ref mut s) = self.value {
            s.zeroize();
        }
    }
}

impl Drop for MetadataEntry {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// String-to-string map with one value per key.
///
/// Iteration follows insertion order. Order carries no meaning for equality:
/// two collections holding the same pairs compare equal.
#[derive(Clone)]
pub struct Metadata {
    entries: SmallVec<[MetadataEntry; 4]>,
}

impl Metadata {
    /// Empty collection. Usable in `const` contexts.
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: SmallVec::new_const(),
        }
    }

    /// Set `key` to `value`, replacing any previous value for that key.
    ///
    /// Returns the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Option<String> {
        let key = key.into();
        let value = value.into();

        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            let previous = std::mem::replace(&mut entry.value, value);
            return Some(previous.into_owned());
        }

        self.entries.push(MetadataEntry { key, value });
        None
    }

    /// Value stored for `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_ref())
    }

    /// Whether `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Pairs in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_ref(), e.value.as_ref()))
    }

    /// Number of pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no pairs.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the pairs have spilled from inline storage to the heap.
    #[inline]
    pub fn spilled(&self) -> bool {
        self.entries.spilled()
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Metadata {}

impl Zeroize for Metadata {
    fn zeroize(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.zeroize();
        }
        self.entries.clear();
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<Cow<'static, str>>,
    V: Into<Cow<'static, str>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

// ============================================================================
// Serde (JSON object)
// ============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for Metadata {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Metadata {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetadataVisitor;

        impl<'de> serde::de::Visitor<'de> for MetadataVisitor {
            type Value = Metadata;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of string keys to string values, or null")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(self, mut access: A) -> Result<Metadata, A::Error> {
                let mut metadata = Metadata::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    metadata.insert(k, v);
                }
                Ok(metadata)
            }

            // Legacy records serialize an unset map as null.
            fn visit_unit<E: serde::de::Error>(self) -> Result<Metadata, E> {
                Ok(Metadata::new())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Metadata, E> {
                Ok(Metadata::new())
            }
        }

        deserializer.deserialize_any(MetadataVisitor)
    }
}
