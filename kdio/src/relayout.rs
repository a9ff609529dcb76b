use kdio_error::KdioResult;
use kdio_store::BlockWriter;

use crate::reader::read_structure;
use crate::{Layout, StructureInfo, ValueReader, ValueWriter, WriteOptions};

/// Copy the structure at `source` to a new structure at `destination` stored in `layout`.
///
/// A structure's layout never changes once written, so the copy always goes to a fresh path.
/// Coordinate compression is carried over from the source.
pub fn relayout<V, R, W>(
    store: &dyn BlockWriter,
    source: &str,
    destination: &str,
    layout: Layout,
    value_reader: &R,
    value_writer: &W,
) -> KdioResult<StructureInfo>
where
    R: ValueReader<V> + ?Sized,
    W: ValueWriter<V> + ?Sized,
{
    let source_info = StructureInfo::read(store, source)?;
    let points = read_structure(&source_info, value_reader, store)?;
    log::debug!(
        "Copying {} ({} layout) to {} ({} layout)",
        source_info.path(),
        source_info.layout(),
        destination,
        layout
    );
    WriteOptions::default()
        .with_layout(layout)
        .with_compression(source_info.coordinates().compression())
        .write(&points, value_writer, store, destination)?;
    StructureInfo::read(store, destination)
}
