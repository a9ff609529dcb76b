use kdio_error::{KdioResult, kdio_bail, kdio_err};
use kdio_store::path::{group_path, normalize};
use kdio_store::{BlockWriter, Compression, DataBlock, DataType, DatasetAttributes};

use crate::{COORDINATES, Layout, PointSet, ValueWriter, structure_attributes};

/// Options for persisting a [`PointSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    layout: Layout,
    compression: Compression,
}

impl WriteOptions {
    /// Store coordinates in `layout` instead of [`Layout::Flat`].
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Compress coordinate blocks with `compression` instead of storing them raw.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }
}

impl WriteOptions {
    /// Write `points` as a new structure at `path`, handing the values to `value_writer`.
    ///
    /// `path` must not hold any attributes or children yet. Coordinates are committed before
    /// the value writer runs; if it fails the structure is left without values.
    pub fn write<V, W: ValueWriter<V> + ?Sized>(
        &self,
        points: &PointSet<V>,
        value_writer: &W,
        store: &dyn BlockWriter,
        path: &str,
    ) -> KdioResult<()> {
        let path = normalize(path);
        let num_dimensions = u32::try_from(points.num_dimensions()).map_err(|_| {
            kdio_err!("Cannot store points with {} dimensions", points.num_dimensions())
        })?;
        let num_points = u32::try_from(points.num_points())
            .map_err(|_| kdio_err!("Cannot store {} points in one block", points.num_points()))?;

        if store.exists(&path)?
            && (!store.attributes(&path)?.is_empty() || !store.list(&path)?.is_empty())
        {
            kdio_bail!(StoreWrite: "Cannot write a structure to {}, it already holds data", path);
        }
        store.create_group(&path)?;
        store.set_attributes(&path, structure_attributes(self.layout))?;
        log::debug!(
            "Writing {} points of {} dimensions to {} ({} layout)",
            num_points,
            num_dimensions,
            path,
            self.layout
        );

        let shape = self.layout.block_shape(num_dimensions, num_points);
        let coordinates_path = group_path(&path, COORDINATES);
        let coordinates = DatasetAttributes::try_new(
            shape.dataset_shape.to_vec(),
            shape.block_shape.to_vec(),
            DataType::Float64,
            self.compression,
        )?;
        store.create_dataset(&coordinates_path, &coordinates)?;

        let blocks = match self.layout {
            Layout::Flat => vec![points.positions().as_flat()],
            Layout::Nested => points.positions().as_nested(),
        };
        for (grid_position, data) in shape.grid_positions().into_iter().zip(blocks) {
            if data.len() != shape.block_elements() {
                kdio_bail!(DataShape: coordinates_path, shape.block_elements(), data.len());
            }
            let block = DataBlock::from_slice(
                shape.block_shape.to_vec(),
                grid_position.to_vec(),
                &data[..],
            );
            store.write_block(&coordinates_path, &coordinates, &block)?;
            log::trace!(
                "Wrote coordinate block ({}, {}) of {}",
                grid_position[0],
                grid_position[1],
                coordinates_path
            );
        }

        value_writer
            .write_values(points.values(), store, &path)
            .map_err(|e| kdio_err!(ValueWrite: path, e))?;
        log::debug!("Wrote structure {}", path);
        Ok(())
    }
}
