use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use kdio_error::{KdioResult, kdio_bail, kdio_err};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::path::normalize;
use crate::{Attributes, BlockReader, BlockWriter, DataBlock, DatasetAttributes};

/// Name of the attribute file inside each group directory.
pub const ATTRIBUTES_FILE: &str = "attributes.json";
/// Root attribute recording the container version.
pub const N5_VERSION_KEY: &str = "n5";
pub const N5_VERSION: &str = "4.0.0";

/// A block store laid out as an N5 directory tree.
///
/// Each group is a directory holding an `attributes.json`. The block at grid position
/// `(g0, g1, ...)` of a dataset lives in the file `<dataset>/<g0>/<g1>/...`.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Open an existing store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> KdioResult<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            kdio_bail!(StoreRead: "{} is not a directory", root.display());
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Open the store rooted at `root`, creating the directory and the root attributes if
    /// they do not exist yet.
    pub fn open_or_create(root: impl AsRef<Path>) -> KdioResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| {
            kdio_err!(StoreWrite: "cannot create store root {}: {}", root.display(), e)
        })?;
        let store = Self::open(root)?;
        if !store.attributes("")?.contains_key(N5_VERSION_KEY) {
            log::debug!("Initializing store at {}", root.display());
            let mut attributes = Attributes::new();
            attributes.insert(N5_VERSION_KEY.to_string(), Value::from(N5_VERSION));
            store.set_attributes("", attributes)?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn group_dir(&self, path: &str) -> PathBuf {
        let mut dir = self.root.clone();
        dir.extend(normalize(path).split('/').filter(|s| !s.is_empty()));
        dir
    }

    fn block_file(&self, path: &str, grid_position: &[u64]) -> PathBuf {
        let mut file = self.group_dir(path);
        file.extend(grid_position.iter().map(u64::to_string));
        file
    }

    fn read_attributes_file(&self, path: &str) -> KdioResult<Option<Attributes>> {
        let file = self.group_dir(path).join(ATTRIBUTES_FILE);
        let contents = match fs::read(&file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => kdio_bail!(StoreRead: "cannot read {}: {}", file.display(), e),
        };
        match serde_json::from_slice(&contents) {
            Ok(Value::Object(attributes)) => Ok(Some(attributes)),
            Ok(_) => kdio_bail!(CorruptMetadata: "{} is not a JSON object", file.display()),
            Err(e) => kdio_bail!(CorruptMetadata: "{} is not valid JSON: {}", file.display(), e),
        }
    }

    /// Replace the attribute file of `path` by writing a sibling temporary file and renaming
    /// it over the existing one.
    fn write_attributes_file(&self, path: &str, attributes: &Attributes) -> KdioResult<()> {
        let dir = self.group_dir(path);
        let json = serde_json::to_vec_pretty(attributes)?;
        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| kdio_err!(StoreWrite: "cannot stage attributes of {}: {}", path, e))?;
        tmp.write_all(&json)
            .map_err(|e| kdio_err!(StoreWrite: "cannot stage attributes of {}: {}", path, e))?;
        tmp.persist(dir.join(ATTRIBUTES_FILE)).map_err(|e| {
            kdio_err!(StoreWrite: "cannot commit attributes of {}: {}", path, e.error)
        })?;
        Ok(())
    }
}

impl BlockReader for FileSystemStore {
    fn exists(&self, path: &str) -> KdioResult<bool> {
        Ok(self.group_dir(path).is_dir())
    }

    fn list(&self, path: &str) -> KdioResult<Vec<String>> {
        let dir = self.group_dir(path);
        let entries = fs::read_dir(&dir)
            .map_err(|e| kdio_err!(StoreRead: "cannot list group {}: {}", normalize(path), e))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    children.push(name.to_string());
                }
            }
        }
        children.sort();
        Ok(children)
    }

    fn attributes(&self, path: &str) -> KdioResult<Attributes> {
        if !self.exists(path)? {
            kdio_bail!(StoreRead: "Group {} does not exist", normalize(path));
        }
        Ok(self.read_attributes_file(path)?.unwrap_or_default())
    }

    fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[u64],
    ) -> KdioResult<Option<DataBlock>> {
        let path = normalize(path);
        attributes.validate_grid_position(&path, grid_position)?;
        if !self.exists(&path)? {
            kdio_bail!(StoreRead: "Dataset {} does not exist", path);
        }
        let file = self.block_file(&path, grid_position);
        let encoded = match fs::read(&file) {
            Ok(encoded) => encoded,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => kdio_bail!(StoreRead: "cannot read block {}: {}", file.display(), e),
        };
        log::trace!("Read {} bytes from {}", encoded.len(), file.display());
        DataBlock::decode(&path, attributes, grid_position, Bytes::from(encoded)).map(Some)
    }
}

impl BlockWriter for FileSystemStore {
    fn create_group(&self, path: &str) -> KdioResult<()> {
        let dir = self.group_dir(path);
        fs::create_dir_all(&dir)
            .map_err(|e| kdio_err!(StoreWrite: "cannot create group {}: {}", normalize(path), e))
    }

    fn set_attributes(&self, path: &str, attributes: Attributes) -> KdioResult<()> {
        if !self.exists(path)? {
            kdio_bail!(StoreWrite: "Group {} does not exist", normalize(path));
        }
        let mut merged = self.read_attributes_file(path)?.unwrap_or_default();
        merged.extend(attributes);
        self.write_attributes_file(path, &merged)
    }

    fn remove_attribute(&self, path: &str, key: &str) -> KdioResult<bool> {
        let Some(mut attributes) = self.read_attributes_file(path)? else {
            return Ok(false);
        };
        if attributes.remove(key).is_none() {
            return Ok(false);
        }
        self.write_attributes_file(path, &attributes)?;
        Ok(true)
    }

    fn write_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        block: &DataBlock,
    ) -> KdioResult<()> {
        let path = normalize(path);
        attributes.validate_block(&path, block)?;
        if !self.exists(&path)? {
            kdio_bail!(StoreWrite: "Dataset {} does not exist", path);
        }
        let file = self.block_file(&path, block.grid_position());
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                kdio_err!(StoreWrite: "cannot create block directory {}: {}", dir.display(), e)
            })?;
        }
        let encoded = block.encode(&attributes.compression())?;
        log::trace!("Writing {} bytes to {}", encoded.len(), file.display());
        fs::write(&file, &encoded)
            .map_err(|e| kdio_err!(StoreWrite: "cannot write block {}: {}", file.display(), e))
    }

    fn remove(&self, path: &str) -> KdioResult<bool> {
        let path = normalize(path);
        if path.is_empty() {
            kdio_bail!("Refusing to remove the store root {}", self.root.display());
        }
        let dir = self.group_dir(&path);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => kdio_bail!(StoreWrite: "cannot remove {}: {}", path, e),
        }
    }
}
