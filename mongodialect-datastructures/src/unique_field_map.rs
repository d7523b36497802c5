use linked_hash_map::LinkedHashMap;
use std::{fmt::Display, hash::Hash, iter::IntoIterator};
use thiserror::Error;

/// An insertion-ordered map that refuses duplicate keys.
///
/// Document bodies, `$project` specifications, and `$set` assignments all
/// have field order as part of the wire contract, and a duplicate field in
/// any of them indicates a translation bug. Inserting a key that is already
/// present is therefore a typed error rather than a silent overwrite.
#[derive(Debug, Hash, Default, Clone, PartialEq, Eq)]
pub struct UniqueFieldMap<K, V>(LinkedHashMap<K, V>)
where
    K: Hash + Eq + PartialEq + Display;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("duplicate document field: {0}")]
pub struct DuplicateFieldError(pub String);

impl DuplicateFieldError {
    pub fn field_name(self) -> String {
        self.0
    }
}

impl<K, V> UniqueFieldMap<K, V>
where
    K: Hash + PartialEq + Eq + Display,
{
    pub fn new() -> Self {
        Self(LinkedHashMap::new())
    }

    pub fn insert(&mut self, k: K, v: V) -> Result<(), DuplicateFieldError> {
        // Check before inserting so the error can carry the key without
        // cloning the value back out.
        if self.0.contains_key(&k) {
            return Err(DuplicateFieldError(format!("{k}")));
        }
        self.0.insert(k, v);
        Ok(())
    }

    pub fn insert_many(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), DuplicateFieldError> {
        for (k, v) in entries {
            self.insert(k, v)?;
        }
        Ok(())
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        self.0.get(k)
    }

    pub fn contains_key(&self, k: &K) -> bool {
        self.0.contains_key(k)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.0.iter()
    }
}

impl<K, V> IntoIterator for UniqueFieldMap<K, V>
where
    K: Hash + PartialEq + Eq + Display,
{
    type Item = (K, V);
    type IntoIter = linked_hash_map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K, V> From<UniqueFieldMap<K, V>> for LinkedHashMap<K, V>
where
    K: Hash + Eq + PartialEq + Display,
{
    fn from(map: UniqueFieldMap<K, V>) -> Self {
        map.0
    }
}

/// Builds a [`UniqueFieldMap`], returning a `DuplicateFieldError` if any key
/// repeats.
#[macro_export]
macro_rules! unique_field_map {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::UniqueFieldMap::new();
        (|| -> Result<_, $crate::DuplicateFieldError> {
            $(map.insert($key, $value)?;)*
            Ok(map)
        })()
    }};
}

/// Builds a [`UniqueFieldMap`] from keys known to be distinct, panicking
/// otherwise. Intended for tests and statically known field sets.
#[macro_export]
macro_rules! unchecked_unique_field_map {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::UniqueFieldMap::new();
        $(map.insert($key, $value).unwrap();)*
        map
    }};
}

#[cfg(test)]
mod test {
    use super::{DuplicateFieldError, UniqueFieldMap};

    #[test]
    fn insert_preserves_order() {
        let mut map = UniqueFieldMap::new();
        map.insert("z", 1).unwrap();
        map.insert("a", 2).unwrap();
        map.insert("m", 3).unwrap();
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(vec!["z", "a", "m"], keys);
    }

    #[test]
    fn duplicate_insert_is_an_error() {
        let mut map = UniqueFieldMap::new();
        map.insert("title", 1).unwrap();
        assert_eq!(
            Err(DuplicateFieldError("title".to_string())),
            map.insert("title", 2)
        );
        assert_eq!(1, map.len());
    }

    #[test]
    fn macro_forms() {
        let checked: Result<UniqueFieldMap<&str, i32>, _> =
            unique_field_map! {"a" => 1, "b" => 2};
        assert!(checked.is_ok());

        let duped: Result<UniqueFieldMap<&str, i32>, _> =
            unique_field_map! {"a" => 1, "a" => 2};
        assert_eq!(Err(DuplicateFieldError("a".to_string())), duped);

        let unchecked = unchecked_unique_field_map! {"x" => 1};
        assert!(unchecked.contains_key(&"x"));
    }
}
