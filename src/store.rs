//! Ready-made [`ByteStore`](crate::traits::ByteStore) implementations
//!
//! [`MemoryStore`] is what tests and previews want; [`FileStore`] persists across restarts the way the target applications do.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::CacheError;
use crate::traits::ByteStore;

/// A volatile store, one `HashMap` behind a mutex. Contents are lost when it is dropped
#[derive(Default, Debug)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.data
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// A store that keeps one file per key inside a directory.
///
/// Keys are persisted under their sanitized form (so a key containing a path separator cannot escape the directory); the keys this crate generates are filename-safe already, so sanitizing is a no-op for them. \
/// Replacing a value goes through a temporary file and a rename, so a concurrent `get` sees either the old bytes or the new ones.
#[derive(Debug)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(sanitize_filename::sanitize(key))
    }
}

impl ByteStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.directory)
            .map_err(|err| CacheError::Store(format!("unable to create {:?}: {}", self.directory, err)))?;

        let path = self.path_for(key);
        // Appended rather than set with `with_extension`, so "group.42" and "group.43" never share a temp file
        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        fs::write(&temp, bytes)
            .map_err(|err| CacheError::Store(format!("unable to write {:?}: {}", temp, err)))?;
        fs::rename(&temp, &path)
            .map_err(|err| CacheError::Store(format!("unable to replace {:?}: {}", path, err)))
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CacheError::Store(format!("unable to remove {}: {}", key, err))),
        }
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            // A directory that does not exist yet simply holds no keys
            Err(_) => return Vec::new(),
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(prefix) && !name.ends_with(".tmp"))
            .collect()
    }
}
