use kdio_error::{KdioResult, kdio_bail, kdio_err};
use kdio_store::BlockReader;

use crate::{Layout, PointSet, Positions, StructureInfo, ValueReader};

/// Read the structure at `path`, restoring its values with `value_reader`.
///
/// Positions come back in the representation of the layout the structure was written with.
/// The value count must match the point count recorded on the coordinate dataset.
pub fn read_point_set<V, R: ValueReader<V> + ?Sized>(
    value_reader: &R,
    store: &dyn BlockReader,
    path: &str,
) -> KdioResult<PointSet<V>> {
    let info = StructureInfo::read(store, path)?;
    read_structure(&info, value_reader, store)
}

/// Read the data of a structure whose metadata has already been validated.
pub(crate) fn read_structure<V, R: ValueReader<V> + ?Sized>(
    info: &StructureInfo,
    value_reader: &R,
    store: &dyn BlockReader,
) -> KdioResult<PointSet<V>> {
    let path = info.path();
    log::debug!(
        "Reading {} points of {} dimensions from {} ({} layout)",
        info.num_points(),
        info.num_dimensions(),
        path,
        info.layout()
    );

    let values = value_reader
        .read_values(store, path)
        .map_err(|e| kdio_err!(ValueRead: path, e))?;
    let coordinates_path = info.coordinates_path();
    if values.len() != info.num_points() {
        kdio_bail!(InconsistentSize: coordinates_path, info.num_points(), values.len());
    }

    let shape = info.block_shape();
    let grid_positions = shape.grid_positions();
    let mut blocks = Vec::with_capacity(grid_positions.len());
    for grid_position in grid_positions {
        let block = store
            .read_block(&coordinates_path, info.coordinates(), &grid_position)?
            .ok_or_else(|| {
                kdio_err!(
                    StoreRead: "Coordinate block ({}, {}) of {} is missing",
                    grid_position[0],
                    grid_position[1],
                    coordinates_path
                )
            })?;
        let data = block.to_vec::<f64>()?;
        if data.len() != shape.block_elements() {
            kdio_bail!(DataShape: coordinates_path, shape.block_elements(), data.len());
        }
        log::trace!(
            "Read coordinate block ({}, {}) of {}",
            grid_position[0],
            grid_position[1],
            coordinates_path
        );
        blocks.push(data);
    }

    let positions = match info.layout() {
        Layout::Flat => Positions::flat(
            info.num_dimensions(),
            blocks.into_iter().next().unwrap_or_default(),
        )?,
        Layout::Nested if blocks.is_empty() => {
            Positions::nested(vec![Vec::new(); info.num_dimensions()])?
        }
        Layout::Nested => Positions::nested(blocks)?,
    };
    PointSet::try_new(positions, values)
}
