use itertools::Itertools;
use kdio_error::{KdioResult, kdio_bail, kdio_err};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Compression, DataBlock, DataType};

/// The key/value attributes attached to a group.
pub type Attributes = Map<String, Value>;

pub const DIMENSIONS_KEY: &str = "dimensions";
pub const BLOCK_SIZE_KEY: &str = "blockSize";
pub const DATA_TYPE_KEY: &str = "dataType";
pub const COMPRESSION_KEY: &str = "compression";

/// Shape, blocking, element type and compression of a dataset.
///
/// Stored among the attributes of the dataset's group under the keys `dimensions`,
/// `blockSize`, `dataType` and `compression`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAttributes {
    dimensions: Vec<u64>,
    block_size: Vec<u32>,
    data_type: DataType,
    compression: Compression,
}

impl DatasetAttributes {
    pub fn try_new(
        dimensions: Vec<u64>,
        block_size: Vec<u32>,
        data_type: DataType,
        compression: Compression,
    ) -> KdioResult<Self> {
        if dimensions.is_empty() {
            kdio_bail!("A dataset needs at least one dimension");
        }
        if dimensions.len() != block_size.len() {
            kdio_bail!(
                "Dataset has {} dimensions but its block size has {}",
                dimensions.len(),
                block_size.len()
            );
        }
        Ok(Self {
            dimensions,
            block_size,
            data_type,
            compression,
        })
    }

    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    pub fn block_size(&self) -> &[u32] {
        &self.block_size
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// Number of blocks along each dimension.
    ///
    /// A dimension of extent zero, or with a zero block size, has no blocks.
    pub fn grid_size(&self) -> Vec<u64> {
        self.dimensions
            .iter()
            .zip(&self.block_size)
            .map(|(&dim, &block)| {
                if dim == 0 || block == 0 {
                    0
                } else {
                    dim.div_ceil(u64::from(block))
                }
            })
            .collect()
    }

    /// Number of elements in a full block.
    pub fn block_elements(&self) -> usize {
        self.block_size.iter().map(|&b| b as usize).product()
    }

    /// Check that `block` may be stored in the dataset at `path`.
    pub fn validate_block(&self, path: &str, block: &DataBlock) -> KdioResult<()> {
        if block.data_type() != self.data_type {
            kdio_bail!(
                "Cannot store a {} block in {} dataset {}",
                block.data_type(),
                self.data_type,
                path
            );
        }
        self.validate_grid_position(path, block.grid_position())?;
        if block.size().len() != self.num_dimensions()
            || block
                .size()
                .iter()
                .zip(&self.block_size)
                .any(|(size, max)| size > max)
        {
            kdio_bail!(
                "Block size [{}] does not fit the block size [{}] of dataset {}",
                block.size().iter().join(", "),
                self.block_size.iter().join(", "),
                path
            );
        }
        let expected = block.num_elements();
        if block.len() != expected {
            kdio_bail!(DataShape: path, expected, block.len());
        }
        Ok(())
    }

    pub fn validate_grid_position(&self, path: &str, grid_position: &[u64]) -> KdioResult<()> {
        let grid = self.grid_size();
        if grid_position.len() != grid.len()
            || grid_position.iter().zip(&grid).any(|(pos, max)| pos >= max)
        {
            kdio_bail!(
                "Grid position ({}) is outside the block grid [{}] of dataset {}",
                grid_position.iter().join(", "),
                grid.iter().join(", "),
                path
            );
        }
        Ok(())
    }

    pub fn to_attributes(&self) -> KdioResult<Attributes> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(kdio_err!(
                InvalidArgument: "dataset attributes must serialize to an object"
            )),
        }
    }

    /// Extract dataset attributes from a group's attributes.
    ///
    /// Returns `None` if the group is not a dataset, i.e. has no `dimensions` key.
    pub fn from_attributes(path: &str, attributes: &Attributes) -> KdioResult<Option<Self>> {
        if !attributes.contains_key(DIMENSIONS_KEY) {
            return Ok(None);
        }
        let mut dataset = Map::new();
        for key in [DIMENSIONS_KEY, BLOCK_SIZE_KEY, DATA_TYPE_KEY, COMPRESSION_KEY] {
            let value = attributes.get(key).ok_or_else(|| {
                kdio_err!(CorruptMetadata: "dataset {} has no {} attribute", path, key)
            })?;
            dataset.insert(key.to_string(), value.clone());
        }
        let parsed: Self = serde_json::from_value(Value::Object(dataset)).map_err(|e| {
            kdio_err!(CorruptMetadata: "dataset attributes of {} are malformed: {}", path, e)
        })?;
        Self::try_new(
            parsed.dimensions,
            parsed.block_size,
            parsed.data_type,
            parsed.compression,
        )
        .map(Some)
        .map_err(|e| e.with_context(format!("dataset attributes of {path}")))
    }
}
