use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use kdio_error::{KdioResult, kdio_bail};
use parking_lot::RwLock;

use crate::path::{ancestors_and_self, normalize, parent};
use crate::{Attributes, BlockReader, BlockWriter, DataBlock, DatasetAttributes};

#[derive(Debug, Default)]
struct Node {
    attributes: Attributes,
    blocks: HashMap<Vec<u64>, Bytes>,
}

/// A block store held entirely in memory.
///
/// Blocks are kept in their encoded form, so compression behaves exactly as it does on disk.
#[derive(Debug)]
pub struct InMemoryStore {
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(String::new(), Node::default());
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Total number of blocks held, across all datasets.
    pub fn block_count(&self) -> usize {
        self.nodes.read().values().map(|n| n.blocks.len()).sum()
    }

    fn is_descendant(candidate: &str, path: &str) -> bool {
        path.is_empty() || candidate == path || candidate.starts_with(&format!("{path}/"))
    }
}

impl BlockReader for InMemoryStore {
    fn exists(&self, path: &str) -> KdioResult<bool> {
        Ok(self.nodes.read().contains_key(&normalize(path)))
    }

    fn list(&self, path: &str) -> KdioResult<Vec<String>> {
        let path = normalize(path);
        let nodes = self.nodes.read();
        if !nodes.contains_key(&path) {
            kdio_bail!(StoreRead: "Group {} does not exist", path);
        }
        Ok(nodes
            .keys()
            .filter(|key| !key.is_empty() && parent(key) == Some(path.as_str()))
            .map(|key| key.rsplit('/').next().unwrap_or(key).to_string())
            .collect())
    }

    fn attributes(&self, path: &str) -> KdioResult<Attributes> {
        let path = normalize(path);
        match self.nodes.read().get(&path) {
            Some(node) => Ok(node.attributes.clone()),
            None => kdio_bail!(StoreRead: "Group {} does not exist", path),
        }
    }

    fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[u64],
    ) -> KdioResult<Option<DataBlock>> {
        let path = normalize(path);
        attributes.validate_grid_position(&path, grid_position)?;
        let encoded = match self.nodes.read().get(&path) {
            Some(node) => node.blocks.get(grid_position).cloned(),
            None => kdio_bail!(StoreRead: "Dataset {} does not exist", path),
        };
        encoded
            .map(|bytes| DataBlock::decode(&path, attributes, grid_position, bytes))
            .transpose()
    }
}

impl BlockWriter for InMemoryStore {
    fn create_group(&self, path: &str) -> KdioResult<()> {
        let mut nodes = self.nodes.write();
        for ancestor in ancestors_and_self(&normalize(path)) {
            nodes.entry(ancestor).or_default();
        }
        Ok(())
    }

    fn set_attributes(&self, path: &str, attributes: Attributes) -> KdioResult<()> {
        let path = normalize(path);
        match self.nodes.write().get_mut(&path) {
            Some(node) => {
                node.attributes.extend(attributes);
                Ok(())
            }
            None => kdio_bail!(StoreWrite: "Group {} does not exist", path),
        }
    }

    fn remove_attribute(&self, path: &str, key: &str) -> KdioResult<bool> {
        let path = normalize(path);
        match self.nodes.write().get_mut(&path) {
            Some(node) => Ok(node.attributes.remove(key).is_some()),
            None => kdio_bail!(StoreWrite: "Group {} does not exist", path),
        }
    }

    fn write_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        block: &DataBlock,
    ) -> KdioResult<()> {
        let path = normalize(path);
        attributes.validate_block(&path, block)?;
        let encoded = block.encode(&attributes.compression())?;
        match self.nodes.write().get_mut(&path) {
            Some(node) => {
                node.blocks.insert(block.grid_position().to_vec(), encoded);
                Ok(())
            }
            None => kdio_bail!(StoreWrite: "Dataset {} does not exist", path),
        }
    }

    fn remove(&self, path: &str) -> KdioResult<bool> {
        let path = normalize(path);
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|key, _| !Self::is_descendant(key, &path));
        // The root group always exists.
        nodes.entry(String::new()).or_default();
        Ok(nodes.len() != before || path.is_empty())
    }
}
