use std::{convert::Infallible, error::Error};

use hashbrown::HashMap;
use parking_lot::RwLock;

/// Content-addressed storage for encoded trie nodes.
pub trait DB: Send + Sync {
    type Error: Error;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    fn insert(&self, key: &[u8], value: Vec<u8>) -> Result<(), Self::Error>;

    fn insert_batch(&self, entries: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), Self::Error> {
        for (key, value) in entries {
            self.insert(&key, value)?;
        }
        Ok(())
    }

    fn len(&self) -> Result<usize, Self::Error>;

    fn is_empty(&self) -> Result<bool, Self::Error> {
        Ok(self.len()? == 0)
    }
}

/// An in-memory node store. Nothing is ever pruned, so every root that was committed stays readable.
#[derive(Default, Debug)]
pub struct MemoryDB {
    storage: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryDB {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops a node. Only useful for simulating a damaged store.
    pub fn remove(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.storage.write().remove(key)
    }
}

impl DB for MemoryDB {
    type Error = Infallible;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.storage.read().get(key).cloned())
    }

    fn insert(&self, key: &[u8], value: Vec<u8>) -> Result<(), Self::Error> {
        self.storage.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn insert_batch(&self, entries: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), Self::Error> {
        let mut storage = self.storage.write();
        storage.extend(entries);
        Ok(())
    }

    fn len(&self) -> Result<usize, Self::Error> {
        Ok(self.storage.read().len())
    }
}
