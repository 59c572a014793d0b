use std::{collections::BTreeMap, convert::Infallible};

use crate::object_id::ObjectId;

use super::ObjectStore;

#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    objects: BTreeMap<ObjectId, Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    type Error = Infallible;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error> {
        Ok(self.objects.contains_key(&id))
    }

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.objects.get(&id).cloned())
    }

    fn insert(&mut self, id: ObjectId, object: &[u8]) -> Result<bool, Self::Error> {
        if self.objects.contains_key(&id) {
            return Ok(false);
        }
        self.objects.insert(id, Vec::from(object));
        Ok(true)
    }

    fn remove(&mut self, id: ObjectId) -> Result<bool, Self::Error> {
        Ok(self.objects.remove(&id).is_some())
    }

    fn ids(&self) -> Result<Vec<ObjectId>, Self::Error> {
        Ok(self.objects.keys().copied().collect())
    }
}

#[test]
fn test_in_memory_object_store() {
    let mut store = InMemoryObjectStore::new();
    let id = ObjectId::of_parts([b"hello, world".as_slice()]);
    assert!(store.insert(id, b"hello, world").unwrap());
    assert!(!store.insert(id, b"something else").unwrap());
    assert!(store.has(id).unwrap());
    assert_eq!(store.read(id).unwrap(), Some(Vec::from(b"hello, world".as_slice())));
    assert!(store.remove(id).unwrap());
    assert!(store.ids().unwrap().is_empty());
}
