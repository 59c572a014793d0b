use serde::{Deserialize, Serialize};

use crate::{error::Error, hex::Hex, object_id::ObjectId};

pub mod directory;
pub mod in_memory;

/// A write-once key/value store whose keys are derived from the content
/// they name.
pub trait ObjectStore {
    type Error;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error>;

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stores `object` under `id`. Returns `false` without touching the
    /// existing object when `id` is already present.
    fn insert(&mut self, id: ObjectId, object: &[u8]) -> Result<bool, Self::Error>;

    /// Drops `id`, returning whether it was present.
    fn remove(&mut self, id: ObjectId) -> Result<bool, Self::Error>;

    /// Every id currently stored, in ascending order.
    fn ids(&self) -> Result<Vec<ObjectId>, Self::Error>;

    /// Finds the single stored id whose hex form starts with `prefix`.
    fn resolve_prefix(&self, prefix: &str) -> Result<ObjectId, Error>
    where
        Error: From<Self::Error>,
    {
        let prefix = prefix.to_ascii_lowercase();
        if prefix.is_empty() || prefix.len() > ObjectId::HEX_LEN || !Hex::is_hex(&prefix) {
            return Err(Error::AmbiguousOrNotFound(prefix));
        }
        let mut matches = self
            .ids()?
            .into_iter()
            .filter(|id| id.to_string().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            _ => Err(Error::AmbiguousOrNotFound(prefix)),
        }
    }
}

/// A convenience trait for writing and reading JSON from any [`ObjectStore`].
pub trait JsonStore {
    /// Inserts a pretty JSON encoded version of the thing into the store.
    fn insert_json<A: Serialize>(&mut self, id: ObjectId, thing: &A) -> Result<bool, Error>;

    /// Reads a JSON encoded thing of the given type from the store at that given [`ObjectId`].
    fn read_json<A: for<'de> Deserialize<'de>>(&self, id: ObjectId) -> Result<A, Error>;
}

impl<S> JsonStore for S
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    fn insert_json<A: Serialize>(&mut self, id: ObjectId, thing: &A) -> Result<bool, Error> {
        Ok(self.insert(id, &serde_json::to_vec_pretty(thing)?)?)
    }

    fn read_json<A: for<'de> Deserialize<'de>>(&self, id: ObjectId) -> Result<A, Error> {
        match self.read(id)? {
            None => Err(Error::MissingObject(id)),
            Some(obj) => Ok(serde_json::from_slice(&obj)?),
        }
    }
}

#[test]
fn test_resolve_prefix() {
    let mut store = in_memory::InMemoryObjectStore::new();
    let a = ObjectId::of_parts([b"a".as_slice()]);
    let b = ObjectId::of_parts([b"b".as_slice()]);
    store.insert(a, b"a").unwrap();
    store.insert(b, b"b").unwrap();

    assert_eq!(store.resolve_prefix(&a.to_string()).unwrap(), a);
    assert_eq!(store.resolve_prefix(&b.short(12)).unwrap(), b);
    assert_eq!(
        store.resolve_prefix(&a.short(12).to_ascii_uppercase()).unwrap(),
        a
    );
    assert!(matches!(
        store.resolve_prefix(""),
        Err(Error::AmbiguousOrNotFound(_))
    ));
    assert!(matches!(
        store.resolve_prefix("xyz"),
        Err(Error::AmbiguousOrNotFound(_))
    ));
}

#[test]
fn test_resolve_prefix_ambiguous() {
    let mut store = in_memory::InMemoryObjectStore::new();
    // enough ids that two share a leading hex digit
    let ids: Vec<ObjectId> = (0u8..20)
        .map(|i| ObjectId::of_parts([[i].as_slice()]))
        .collect();
    for id in &ids {
        store.insert(*id, b"x").unwrap();
    }
    let shared = ids
        .iter()
        .map(|id| id.short(1))
        .find(|p| ids.iter().filter(|id| id.short(1) == *p).count() > 1)
        .unwrap();
    assert!(matches!(
        store.resolve_prefix(&shared),
        Err(Error::AmbiguousOrNotFound(_))
    ));
}

#[test]
fn test_json_round_trip_and_missing() {
    let mut store = in_memory::InMemoryObjectStore::new();
    let id = ObjectId::of_parts([b"list".as_slice()]);
    assert!(store.insert_json(id, &vec![1, 2, 3]).unwrap());
    assert!(!store.insert_json(id, &vec![1, 2, 3]).unwrap());
    let back: Vec<i32> = store.read_json(id).unwrap();
    assert_eq!(back, vec![1, 2, 3]);

    let missing = ObjectId::of_parts([b"missing".as_slice()]);
    assert!(matches!(
        store.read_json::<Vec<i32>>(missing),
        Err(Error::MissingObject(_))
    ));
}
