use std::{
    fs::{create_dir, create_dir_all, read_dir, File},
    io::{ErrorKind, Read, Write},
    path::PathBuf,
};

use crate::object_id::ObjectId;

use super::ObjectStore;

/// A persistent [`ObjectStore`] stored in a directory,
/// using the first two hexadecimal characters of the [`ObjectId`]
/// to determine which directory to place the binary object in
/// and creating a file with the rest of the hexadecimal characters
/// as the file name.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        if !root.try_exists()? {
            log::info!("creating directory store root: {:?}", root);
            create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    fn path_of(&self, id: ObjectId) -> (PathBuf, PathBuf) {
        let s: String = format!("{}", id);
        let subdir_path = self.root.join(&s[0..2]);
        let path = subdir_path.join(&s[2..]);
        (subdir_path, path)
    }
}

impl ObjectStore for DirectoryObjectStore {
    type Error = std::io::Error;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error> {
        log::debug!("checking whether {} is contained in {:?}", id, self.root);
        self.path_of(id).1.try_exists()
    }

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error> {
        log::debug!("reading {} from {:?}", id, self.root);
        match File::options().read(true).open(self.path_of(id).1) {
            Ok(mut f) => {
                let mut v = Vec::new();
                f.read_to_end(&mut v)?;
                Ok(Some(v))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn insert(&mut self, id: ObjectId, object: &[u8]) -> Result<bool, Self::Error> {
        log::info!("inserting {} into {:?}", id, self.root);
        let (subdir_path, path) = self.path_of(id);
        if path.try_exists()? {
            log::info!("{:?} already exists", path);
            return Ok(false);
        }
        if !subdir_path.try_exists()? {
            log::info!("creating subdir path {:?} in {:?}", subdir_path, self.root);
            create_dir(&subdir_path)?;
        }
        let mut f = File::options().create_new(true).write(true).open(path)?;
        f.write_all(object)?;
        f.sync_all()?;
        Ok(true)
    }

    fn remove(&mut self, id: ObjectId) -> Result<bool, Self::Error> {
        log::info!("removing {} from {:?}", id, self.root);
        match std::fs::remove_file(self.path_of(id).1) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn ids(&self) -> Result<Vec<ObjectId>, Self::Error> {
        let mut ids = Vec::new();
        for subdir in read_dir(&self.root)? {
            let subdir = subdir?;
            if !subdir.file_type()?.is_dir() {
                continue;
            }
            let prefix = subdir.file_name().to_string_lossy().into_owned();
            for object in read_dir(subdir.path())? {
                let rest = object?.file_name().to_string_lossy().into_owned();
                match format!("{}{}", prefix, rest).parse::<ObjectId>() {
                    Ok(id) => ids.push(id),
                    Err(_) => log::warn!("ignoring stray file {}/{} in {:?}", prefix, rest, self.root),
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[test]
fn test_directory_object_store() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().join("objects")).unwrap();
    let id = ObjectId::of_parts([b"hello, world".as_slice()]);
    assert!(store.insert(id, b"hello, world").unwrap());
    assert!(store.has(id).unwrap());
    assert_eq!(store.read(id).unwrap(), Some(Vec::from(b"hello, world".as_slice())));
    assert_eq!(store.ids().unwrap(), vec![id]);
}

#[test]
fn test_insert_is_write_once() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().into()).unwrap();
    let id = ObjectId::of_parts([b"a.txt".as_slice(), b"hello".as_slice()]);
    assert!(store.insert(id, b"hello").unwrap());
    assert!(!store.insert(id, b"hello").unwrap());
    assert_eq!(store.read(id).unwrap().unwrap(), b"hello");
}

#[test]
fn test_remove_and_missing() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryObjectStore::new(tempdir.path().into()).unwrap();
    let id = ObjectId::of_parts([b"gone".as_slice()]);
    assert_eq!(store.read(id).unwrap(), None);
    assert!(!store.remove(id).unwrap());
    store.insert(id, b"gone").unwrap();
    assert!(store.remove(id).unwrap());
    assert!(!store.has(id).unwrap());
}
