use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{self, BufReader, BufWriter, Seek, SeekFrom, Write},
    path::PathBuf,
};

use serde::{de::DeserializeOwned, Serialize};

use super::{StorageError, StreamedStorage};

/// Streamed store backed by a directory.
///
/// Each key is one append-only file holding bincode-framed values. Read
/// positions live in memory, so a fresh handle on the same directory starts
/// every stream from the beginning.
#[derive(Debug)]
pub struct FileStreamedStorage {
    dir: PathBuf,
    cursors: HashMap<String, u64>,
}

impl FileStreamedStorage {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            cursors: HashMap::new(),
        })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Decode the value at the read position of `key` and return it with the
    /// position right after it.
    fn read_at<T: DeserializeOwned>(&self, key: &str) -> Result<Option<(T, u64)>, StorageError> {
        let file = match File::open(self.path(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let cursor = self.cursors.get(key).copied().unwrap_or(0);
        if cursor >= file.metadata()?.len() {
            return Ok(None);
        }
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(cursor))?;
        let value = bincode::deserialize_from(&mut reader)?;
        let next = reader.stream_position()?;
        Ok(Some((value, next)))
    }
}

impl StreamedStorage for FileStreamedStorage {
    fn put_next<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(key))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, value)?;
        writer.flush()?;
        Ok(())
    }

    fn get_next<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, StorageError> {
        let Some((value, next)) = self.read_at(key)? else {
            return Ok(None);
        };
        self.cursors.insert(key.to_owned(), next);
        Ok(Some(value))
    }

    fn peek_next<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, StorageError> {
        Ok(self.read_at(key)?.map(|(value, _)| value))
    }

    fn truncate(&mut self, key: &str) -> Result<(), StorageError> {
        self.cursors.remove(key);
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
