use std::collections::{HashMap, VecDeque};

use serde::{de::DeserializeOwned, Serialize};

use super::{Storage, StorageError, StreamedStorage};

/// Key/value store kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: HashMap<String, HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects stored under `name`.
    pub fn len(&self, name: &str) -> usize {
        self.objects.get(name).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.values().all(HashMap::is_empty)
    }
}

impl Storage for MemoryStorage {
    fn put_object<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let bytes = bincode::serialize(value)?;
        self.objects
            .entry(name.to_owned())
            .or_default()
            .insert(key.to_owned(), bytes);
        Ok(())
    }

    fn get_object<T: DeserializeOwned>(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        self.objects
            .get(name)
            .and_then(|objects| objects.get(key))
            .map(|bytes| bincode::deserialize(bytes))
            .transpose()
            .map_err(StorageError::from)
    }

    fn clear(&mut self, name: &str) -> Result<(), StorageError> {
        self.objects.remove(name);
        Ok(())
    }
}

/// Streamed store kept in memory, one queue per key.
#[derive(Debug, Clone, Default)]
pub struct MemoryStreamedStorage {
    streams: HashMap<String, VecDeque<Vec<u8>>>,
}

impl MemoryStreamedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values left to consume under `key`.
    pub fn remaining(&self, key: &str) -> usize {
        self.streams.get(key).map_or(0, VecDeque::len)
    }
}

impl StreamedStorage for MemoryStreamedStorage {
    fn put_next<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let bytes = bincode::serialize(value)?;
        self.streams
            .entry(key.to_owned())
            .or_default()
            .push_back(bytes);
        Ok(())
    }

    fn get_next<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(bytes) = self.streams.get_mut(key).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        Ok(Some(bincode::deserialize(&bytes)?))
    }

    fn peek_next<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, StorageError> {
        self.streams
            .get(key)
            .and_then(VecDeque::front)
            .map(|bytes| bincode::deserialize(bytes))
            .transpose()
            .map_err(StorageError::from)
    }

    fn truncate(&mut self, key: &str) -> Result<(), StorageError> {
        self.streams.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn objects_by_name_and_key() {
        let mut store = MemoryStorage::new();
        assert!(store.is_empty());
        store.put_object("a", "x", &1u32).unwrap();
        store.put_object("b", "x", &2u32).unwrap();
        assert_eq!(store.get_object::<u32>("a", "x").unwrap(), Some(1));
        assert_eq!(store.get_object::<u32>("b", "x").unwrap(), Some(2));
        assert_eq!(store.get_object::<u32>("a", "y").unwrap(), None);
        assert_eq!(store.len("a"), 1);

        store.put_object("a", "x", &3u32).unwrap();
        assert_eq!(store.get_object::<u32>("a", "x").unwrap(), Some(3));
    }

    #[test]
    fn clear_drops_one_namespace() {
        let mut store = MemoryStorage::new();
        store.put_object("a", "x", &1u32).unwrap();
        store.put_object("a", "y", &2u32).unwrap();
        store.put_object("b", "x", &3u32).unwrap();
        store.clear("a").unwrap();
        store.clear("missing").unwrap();
        assert_eq!(store.len("a"), 0);
        assert_eq!(store.get_object::<u32>("a", "y").unwrap(), None);
        assert_eq!(store.get_object::<u32>("b", "x").unwrap(), Some(3));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let mut store = MemoryStorage::new();
        store.put_object("a", "x", &1u8).unwrap();
        assert!(matches!(
            store.get_object::<u64>("a", "x"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn streams_are_fifo() {
        let mut store = MemoryStreamedStorage::new();
        for i in 0..3u32 {
            store.put_next("s", &i).unwrap();
        }
        assert_eq!(store.peek_next::<u32>("s").unwrap(), Some(0));
        assert_eq!(store.remaining("s"), 3);
        assert_eq!(store.get_next::<u32>("s").unwrap(), Some(0));
        assert_eq!(store.get_next::<u32>("s").unwrap(), Some(1));
        assert_eq!(store.get_next::<u32>("s").unwrap(), Some(2));
        assert_eq!(store.get_next::<u32>("s").unwrap(), None);
        assert_eq!(store.get_next::<u32>("other").unwrap(), None);
    }

    #[test]
    fn truncate_drops_stream() {
        let mut store = MemoryStreamedStorage::new();
        store.put_next("s", &1u8).unwrap();
        store.put_next("t", &2u8).unwrap();
        store.truncate("s").unwrap();
        store.truncate("missing").unwrap();
        assert_eq!(store.peek_next::<u8>("s").unwrap(), None);
        assert_eq!(store.peek_next::<u8>("t").unwrap(), Some(2));
    }
}
