//! Typed entity ids.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::memo::{Key, KeyPart, MemoKey};

/// The id of an entity of kind `T`.
///
/// Carries nothing but the id string; `T` only exists at the type level, so an
/// album id cannot be passed where a tag id is expected. Serializes as the bare
/// id string.
pub struct Reference<T> {
    id: String,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Reference<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            _kind: PhantomData,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn into_id(self) -> String {
        self.id
    }
}

pub fn ref_id<T>(reference: &Reference<T>) -> &str {
    reference.id()
}

/// Id equality, where two absent references are equal and absent never equals present.
pub fn ref_is<T>(a: Option<&Reference<T>>, b: Option<&Reference<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.id == b.id,
        (None, None) => true,
        _ => false,
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self::new(self.id.clone())
    }
}

impl<T> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Reference<T> {}

impl<T> PartialOrd for Reference<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Reference<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for Reference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({:?})", self.id)
    }
}

impl<T> fmt::Display for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl<T> From<&str> for Reference<T> {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<T> From<String> for Reference<T> {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl<T> From<&Reference<T>> for Reference<T> {
    fn from(reference: &Reference<T>) -> Self {
        reference.clone()
    }
}

impl<T> Serialize for Reference<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.id)
    }
}

impl<'de, T> Deserialize<'de> for Reference<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl<T> MemoKey for Reference<T> {
    fn memo_key(&self) -> Key {
        Key::value(KeyPart::Str(self.id.as_str().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Album;
    struct Tag;

    #[test]
    fn test_equality_is_id_equality() {
        let a: Reference<Album> = Reference::new("a1");
        let b: Reference<Album> = "a1".into();
        let c: Reference<Album> = Reference::new("a2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ref_id(&a), "a1");
    }

    #[test]
    fn test_ref_is_tolerates_absent() {
        let a: Reference<Tag> = Reference::new("t1");
        assert!(ref_is(Some(&a), Some(&a.clone())));
        assert!(ref_is::<Tag>(None, None));
        assert!(!ref_is(Some(&a), None));
        assert!(!ref_is(None, Some(&a)));
    }

    #[test]
    fn test_serializes_as_bare_string() {
        let a: Reference<Album> = Reference::new("a1");
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"a1\"");
        let back: Reference<Album> = serde_json::from_str("\"a1\"").unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_memo_key_is_value() {
        let a: Reference<Album> = Reference::new("a1");
        assert_eq!(a.memo_key().part(), &KeyPart::Str("a1".into()));
    }

    #[test]
    fn test_ordering_follows_id() {
        let mut refs: Vec<Reference<Album>> = vec!["b".into(), "a".into(), "c".into()];
        refs.sort();
        let ids: Vec<&str> = refs.iter().map(Reference::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
