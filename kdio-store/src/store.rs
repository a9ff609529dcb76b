use std::sync::Arc;

use kdio_error::{KdioResult, kdio_err};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Attributes, DataBlock, DatasetAttributes};

/// Read access to a hierarchical block store.
///
/// Paths are slash-separated and relative to the store root; implementations normalize them
/// with [`crate::path::normalize`].
pub trait BlockReader: Send + Sync {
    /// Whether a group (or dataset) exists at `path`.
    fn exists(&self, path: &str) -> KdioResult<bool>;

    /// Names of the direct children of the group at `path`, sorted.
    fn list(&self, path: &str) -> KdioResult<Vec<String>>;

    /// All attributes of the group at `path`. A group without attributes yields an empty map.
    fn attributes(&self, path: &str) -> KdioResult<Attributes>;

    /// Read the block at `grid_position` of the dataset at `path`.
    ///
    /// Returns `None` if that block was never written.
    fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[u64],
    ) -> KdioResult<Option<DataBlock>>;
}

/// Write access to a hierarchical block store.
pub trait BlockWriter: BlockReader {
    /// Create the group at `path` and any missing ancestors. Creating an existing group is a
    /// no-op.
    fn create_group(&self, path: &str) -> KdioResult<()>;

    /// Merge `attributes` into the attributes of the existing group at `path`.
    ///
    /// The update is all-or-nothing: readers observe either none or all of the new keys.
    fn set_attributes(&self, path: &str, attributes: Attributes) -> KdioResult<()>;

    /// Remove a single attribute, returning whether it was present.
    fn remove_attribute(&self, path: &str, key: &str) -> KdioResult<bool>;

    /// Create a dataset group at `path` described by `attributes`.
    fn create_dataset(&self, path: &str, attributes: &DatasetAttributes) -> KdioResult<()> {
        self.create_group(path)?;
        self.set_attributes(path, attributes.to_attributes()?)
    }

    /// Write `block` into the dataset at `path`, replacing any block at the same grid position.
    fn write_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        block: &DataBlock,
    ) -> KdioResult<()>;

    /// Remove the group at `path` with everything below it, returning whether it existed.
    fn remove(&self, path: &str) -> KdioResult<bool>;
}

/// Typed conveniences over any [`BlockReader`].
pub trait BlockReaderExt: BlockReader {
    /// Read and deserialize a single attribute.
    ///
    /// A missing attribute is `Ok(None)`; one that does not deserialize as `T` is a
    /// `CorruptMetadata` error.
    fn attribute<T: DeserializeOwned>(&self, path: &str, key: &str) -> KdioResult<Option<T>> {
        match self.attributes(path)?.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                kdio_err!(CorruptMetadata: "attribute {} of {} has the wrong type: {}", key, path, e)
            }),
        }
    }

    /// The dataset attributes of `path`, or `None` if `path` is not a dataset.
    fn dataset_attributes(&self, path: &str) -> KdioResult<Option<DatasetAttributes>> {
        if !self.exists(path)? {
            return Ok(None);
        }
        DatasetAttributes::from_attributes(path, &self.attributes(path)?)
    }

    fn dataset_exists(&self, path: &str) -> KdioResult<bool> {
        Ok(self.dataset_attributes(path)?.is_some())
    }
}

impl<R: BlockReader + ?Sized> BlockReaderExt for R {}

/// Typed conveniences over any [`BlockWriter`].
pub trait BlockWriterExt: BlockWriter {
    fn set_attribute<T: Serialize + ?Sized>(
        &self,
        path: &str,
        key: &str,
        value: &T,
    ) -> KdioResult<()> {
        let mut attributes = Attributes::new();
        attributes.insert(key.to_string(), serde_json::to_value(value)?);
        self.set_attributes(path, attributes)
    }
}

impl<W: BlockWriter + ?Sized> BlockWriterExt for W {}

impl<R: BlockReader + ?Sized> BlockReader for Arc<R> {
    fn exists(&self, path: &str) -> KdioResult<bool> {
        R::exists(self, path)
    }

    fn list(&self, path: &str) -> KdioResult<Vec<String>> {
        R::list(self, path)
    }

    fn attributes(&self, path: &str) -> KdioResult<Attributes> {
        R::attributes(self, path)
    }

    fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[u64],
    ) -> KdioResult<Option<DataBlock>> {
        R::read_block(self, path, attributes, grid_position)
    }
}

impl<W: BlockWriter + ?Sized> BlockWriter for Arc<W> {
    fn create_group(&self, path: &str) -> KdioResult<()> {
        W::create_group(self, path)
    }

    fn set_attributes(&self, path: &str, attributes: Attributes) -> KdioResult<()> {
        W::set_attributes(self, path, attributes)
    }

    fn remove_attribute(&self, path: &str, key: &str) -> KdioResult<bool> {
        W::remove_attribute(self, path, key)
    }

    fn create_dataset(&self, path: &str, attributes: &DatasetAttributes) -> KdioResult<()> {
        W::create_dataset(self, path, attributes)
    }

    fn write_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        block: &DataBlock,
    ) -> KdioResult<()> {
        W::write_block(self, path, attributes, block)
    }

    fn remove(&self, path: &str) -> KdioResult<bool> {
        W::remove(self, path)
    }
}
