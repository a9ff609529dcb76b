#![allow(clippy::cast_possible_truncation)]

use kdio_error::{KdioError, KdioResult, kdio_bail};
use std::sync::atomic::{AtomicUsize, Ordering};

use kdio_store::path::normalize;
use kdio_store::{
    Attributes, BlockReader, BlockReaderExt, BlockWriter, BlockWriterExt, Compression, DataBlock,
    DatasetAttributes, FileSystemStore, InMemoryStore,
};
use rstest::rstest;
use serde_json::json;

use crate::*;

/// `num_points` deterministic points in `num_dimensions` dimensions, valued by index.
fn grid_points(num_dimensions: usize, num_points: usize) -> PointSet<u32> {
    let coordinates = (0..num_points * num_dimensions)
        .map(|i| i as f64 * 0.5 - 3.25)
        .collect();
    let positions = Positions::flat(num_dimensions, coordinates).unwrap();
    PointSet::try_new(positions, (0..num_points as u32).collect()).unwrap()
}

fn three_points() -> PointSet<u32> {
    let positions = Positions::from_points(2, [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
    PointSet::try_new(positions, vec![0xff0000ff, 0xff00ff00, 0xffff0000]).unwrap()
}

fn write(store: &dyn BlockWriter, points: &PointSet<u32>, layout: Layout, path: &str) {
    WriteOptions::default()
        .with_layout(layout)
        .write(points, &PrimitiveValues::<u32>::new(), store, path)
        .unwrap();
}

fn read(store: &dyn BlockReader, path: &str) -> KdioResult<PointSet<u32>> {
    read_point_set(&PrimitiveValues::<u32>::new(), store, path)
}

#[rstest]
fn round_trip(
    #[values(1, 2, 3)] num_dimensions: usize,
    #[values(0, 1, 100)] num_points: usize,
    #[values(Layout::Flat, Layout::Nested)] layout: Layout,
) {
    let store = InMemoryStore::new();
    let points = grid_points(num_dimensions, num_points);
    write(&store, &points, layout, "tree");

    let restored = read(&store, "tree").unwrap();
    assert_eq!(restored.layout(), layout);
    assert_eq!(restored.num_dimensions(), num_dimensions);
    assert_eq!(restored.num_points(), num_points);
    assert_eq!(restored.values(), points.values());
    assert!(restored.positions().same_table(points.positions()));
    assert_eq!(restored, points.into_layout(layout));
}

#[rstest]
fn round_trip_on_disk(
    #[values(Layout::Flat, Layout::Nested)] layout: Layout,
    #[values(Compression::Raw, Compression::bzip2())] compression: Compression,
) {
    let dir = tempfile::tempdir().unwrap();
    let points = grid_points(3, 100);
    {
        let store = FileSystemStore::open_or_create(dir.path()).unwrap();
        WriteOptions::default()
            .with_layout(layout)
            .with_compression(compression)
            .write(&points, &PrimitiveValues::<u32>::new(), &store, "forest/tree")
            .unwrap();
    }

    let store = FileSystemStore::open(dir.path()).unwrap();
    let restored = read(&store, "forest/tree").unwrap();
    assert_eq!(restored, points.into_layout(layout));
    assert_eq!(
        StructureInfo::read(&store, "forest/tree")
            .unwrap()
            .coordinates()
            .compression(),
        compression
    );
    assert!(dir.path().join("forest/tree/attributes.json").is_file());
    assert!(dir.path().join("forest/tree/coordinates/0/0").is_file());
}

#[test]
fn flat_stores_one_point_major_block() {
    let store = InMemoryStore::new();
    write(&store, &three_points(), Layout::Flat, "flat");

    let attributes = store
        .dataset_attributes("flat/coordinates")
        .unwrap()
        .unwrap();
    assert_eq!(attributes.dimensions(), &[2, 3]);
    assert_eq!(attributes.block_size(), &[2, 3]);

    let block = store
        .read_block("flat/coordinates", &attributes, &[0, 0])
        .unwrap()
        .unwrap();
    assert_eq!(block.size(), &[2, 3]);
    assert_eq!(
        block.to_vec::<f64>().unwrap(),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );
    // Coordinates plus values.
    assert_eq!(store.block_count(), 2);
}

#[test]
fn nested_stores_one_block_per_dimension() {
    let store = InMemoryStore::new();
    write(&store, &three_points(), Layout::Nested, "nested");

    let attributes = store
        .dataset_attributes("nested/coordinates")
        .unwrap()
        .unwrap();
    assert_eq!(attributes.dimensions(), &[2, 3]);
    assert_eq!(attributes.block_size(), &[1, 3]);

    let blocks = [[0, 0], [1, 0]].map(|grid_position| {
        store
            .read_block("nested/coordinates", &attributes, &grid_position)
            .unwrap()
            .unwrap()
    });
    assert_eq!(blocks[0].size(), &[1, 3]);
    assert_eq!(blocks[0].to_vec::<f64>().unwrap(), vec![1.0, 3.0, 5.0]);
    assert_eq!(blocks[1].size(), &[1, 3]);
    assert_eq!(blocks[1].to_vec::<f64>().unwrap(), vec![2.0, 4.0, 6.0]);
    assert_eq!(store.block_count(), 3);
}

#[test]
fn layouts_hold_the_same_table() {
    let store = InMemoryStore::new();
    let points = three_points();
    write(&store, &points, Layout::Flat, "a");
    write(&store, &points, Layout::Nested, "b");

    let flat = read(&store, "a").unwrap();
    let nested = read(&store, "b").unwrap();
    assert_eq!(flat.layout(), Layout::Flat);
    assert_eq!(nested.layout(), Layout::Nested);
    assert!(flat.positions().same_table(nested.positions()));
    assert_eq!(
        flat.iter().collect::<Vec<_>>(),
        nested.iter().collect::<Vec<_>>()
    );
}

#[rstest]
#[case(Layout::Flat, true)]
#[case(Layout::Nested, false)]
fn records_the_layout(#[case] layout: Layout, #[case] is_flat: bool) {
    let store = InMemoryStore::new();
    write(&store, &three_points(), layout, "tree");

    let attributes = store.attributes("tree").unwrap();
    assert_eq!(attributes[LAYOUT_IS_FLAT_KEY], json!(is_flat));
    assert_eq!(attributes[FORMAT_NAME_KEY], json!(FORMAT_NAME));
    assert_eq!(attributes[FORMAT_VERSION_KEY], json!(FORMAT_VERSION));
    assert_eq!(attributes[CODEC_VERSION_KEY], json!(CODEC_VERSION));
    assert_eq!(store.list("tree").unwrap(), vec![COORDINATES, VALUES]);
}

#[rstest]
fn empty_sets_create_metadata_only(#[values(Layout::Flat, Layout::Nested)] layout: Layout) {
    let store = InMemoryStore::new();
    write(&store, &grid_points(3, 0), layout, "empty");

    assert_eq!(store.block_count(), 0);
    let info = StructureInfo::read(&store, "empty").unwrap();
    assert_eq!(info.layout(), layout);
    assert_eq!(info.num_dimensions(), 3);
    assert_eq!(info.num_points(), 0);

    let restored = read(&store, "empty").unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.num_dimensions(), 3);
}

#[rstest]
#[case(json!(null))]
#[case(json!("true"))]
#[case(json!(1))]
fn corrupt_layout_flag_is_reported(#[case] flag: serde_json::Value) {
    let store = InMemoryStore::new();
    write(&store, &three_points(), Layout::Flat, "tree");
    store.set_attribute("tree", LAYOUT_IS_FLAT_KEY, &flag).unwrap();

    assert!(matches!(
        read(&store, "tree").unwrap_err(),
        KdioError::CorruptMetadata(..)
    ));
}

#[test]
fn missing_layout_flag_is_reported() {
    let store = InMemoryStore::new();
    write(&store, &three_points(), Layout::Nested, "tree");
    assert!(store.remove_attribute("tree", LAYOUT_IS_FLAT_KEY).unwrap());

    assert!(matches!(
        read(&store, "tree").unwrap_err(),
        KdioError::CorruptMetadata(..)
    ));
}

#[test]
fn flipped_layout_flag_is_not_reinterpreted() {
    let store = InMemoryStore::new();
    write(&store, &three_points(), Layout::Nested, "tree");
    store.set_attribute("tree", LAYOUT_IS_FLAT_KEY, &true).unwrap();

    assert!(matches!(
        read(&store, "tree").unwrap_err(),
        KdioError::CorruptMetadata(..)
    ));
}

#[test]
fn value_count_must_match_points() {
    let store = InMemoryStore::new();
    write(&store, &three_points(), Layout::Flat, "tree");
    PrimitiveValues::<u32>::new()
        .write_values(&[1, 2], &store, "tree")
        .unwrap();

    match read(&store, "tree").unwrap_err() {
        KdioError::InconsistentSize(path, coordinates, values, _) => {
            assert_eq!(path.as_ref(), "tree/coordinates");
            assert_eq!(coordinates, 3);
            assert_eq!(values, 2);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn unsupported_versions_are_reported() {
    let store = InMemoryStore::new();
    write(&store, &three_points(), Layout::Flat, "tree");
    store
        .set_attribute("tree", FORMAT_VERSION_KEY, "2.0.0")
        .unwrap();

    assert!(matches!(
        read(&store, "tree").unwrap_err(),
        KdioError::UnsupportedVersion(..)
    ));
}

#[test]
fn missing_coordinate_block_is_reported() {
    let store = InMemoryStore::new();
    write(&store, &three_points(), Layout::Nested, "tree");
    let attributes = store
        .dataset_attributes("tree/coordinates")
        .unwrap()
        .unwrap();
    // Keep the dataset, lose its blocks.
    assert!(store.remove("tree/coordinates").unwrap());
    store.create_dataset("tree/coordinates", &attributes).unwrap();

    assert!(matches!(
        read(&store, "tree").unwrap_err(),
        KdioError::StoreRead(..)
    ));
}

#[rstest]
fn damaged_block_header_is_reported(#[values(Layout::Flat, Layout::Nested)] layout: Layout) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemStore::open_or_create(dir.path()).unwrap();
    write(&store, &three_points(), layout, "tree");

    let block = dir.path().join("tree/coordinates/0/0");
    let mut encoded = std::fs::read(&block).unwrap();
    encoded[4..12].fill(0xff);
    std::fs::write(&block, encoded).unwrap();

    assert!(matches!(
        read(&store, "tree").unwrap_err(),
        KdioError::CorruptMetadata(..)
    ));
}

#[test]
fn failed_values_leave_coordinates_committed() {
    let store = InMemoryStore::new();
    let failing = |_: &[u32], _: &dyn BlockWriter, _: &str| -> KdioResult<()> {
        kdio_bail!(StoreWrite: "values device is full")
    };
    let err = WriteOptions::default()
        .write(&three_points(), &failing, &store, "tree")
        .unwrap_err();
    assert!(matches!(err, KdioError::ValueWrite(..)));

    let info = StructureInfo::read(&store, "tree").unwrap();
    assert_eq!(info.num_points(), 3);
    assert!(matches!(
        read(&store, "tree").unwrap_err(),
        KdioError::ValueRead(..)
    ));
}

#[test]
fn values_may_use_any_codec() {
    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Colour {
        red: u8,
        green: u8,
        blue: u8,
    }

    let codec = PrimitiveValues::<u32>::with_compression(Compression::bzip2()).mapped(
        |c: &Colour| u32::from_be_bytes([0xff, c.red, c.green, c.blue]),
        |argb| {
            let [_, red, green, blue] = argb.to_be_bytes();
            Colour { red, green, blue }
        },
    );
    let positions = Positions::from_points(1, [[0.5], [1.5]]).unwrap();
    let points = PointSet::try_new(
        positions,
        vec![
            Colour {
                red: 1,
                green: 2,
                blue: 3,
            },
            Colour {
                red: 250,
                green: 0,
                blue: 9,
            },
        ],
    )
    .unwrap();

    let store = InMemoryStore::new();
    WriteOptions::default()
        .write(&points, &codec, &store, "tree")
        .unwrap();
    assert_eq!(read_point_set(&codec, &store, "tree").unwrap(), points);
}

#[rstest]
fn relayout_copies_into_a_new_group(#[values(Layout::Flat, Layout::Nested)] layout: Layout) {
    let store = InMemoryStore::new();
    let points = grid_points(2, 10);
    WriteOptions::default()
        .with_compression(Compression::bzip2())
        .write(&points, &PrimitiveValues::<u32>::new(), &store, "src")
        .unwrap();

    let codec = PrimitiveValues::<u32>::new();
    let info = relayout(&store, "src", "dst", layout, &codec, &codec).unwrap();
    assert_eq!(info.layout(), layout);
    assert_eq!(info.path(), "dst");
    assert_eq!(info.coordinates().compression(), Compression::bzip2());

    assert_eq!(read(&store, "dst").unwrap(), points.clone().into_layout(layout));
    assert_eq!(read(&store, "src").unwrap(), points);
    assert!(relayout(&store, "src", "dst", layout, &codec, &codec).is_err());
}

/// An in-memory store that counts attribute reads of one group.
struct CountingStore {
    inner: InMemoryStore,
    watched: &'static str,
    attribute_reads: AtomicUsize,
}

impl BlockReader for CountingStore {
    fn exists(&self, path: &str) -> KdioResult<bool> {
        self.inner.exists(path)
    }

    fn list(&self, path: &str) -> KdioResult<Vec<String>> {
        self.inner.list(path)
    }

    fn attributes(&self, path: &str) -> KdioResult<Attributes> {
        if normalize(path) == self.watched {
            self.attribute_reads.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.attributes(path)
    }

    fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[u64],
    ) -> KdioResult<Option<DataBlock>> {
        self.inner.read_block(path, attributes, grid_position)
    }
}

impl BlockWriter for CountingStore {
    fn create_group(&self, path: &str) -> KdioResult<()> {
        self.inner.create_group(path)
    }

    fn set_attributes(&self, path: &str, attributes: Attributes) -> KdioResult<()> {
        self.inner.set_attributes(path, attributes)
    }

    fn remove_attribute(&self, path: &str, key: &str) -> KdioResult<bool> {
        self.inner.remove_attribute(path, key)
    }

    fn write_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        block: &DataBlock,
    ) -> KdioResult<()> {
        self.inner.write_block(path, attributes, block)
    }

    fn remove(&self, path: &str) -> KdioResult<bool> {
        self.inner.remove(path)
    }
}

#[test]
fn relayout_reads_source_metadata_once() {
    let store = CountingStore {
        inner: InMemoryStore::new(),
        watched: "src",
        attribute_reads: AtomicUsize::new(0),
    };
    write(&store, &three_points(), Layout::Flat, "src");
    store.attribute_reads.store(0, Ordering::Relaxed);

    let codec = PrimitiveValues::<u32>::new();
    relayout(&store, "src", "dst", Layout::Nested, &codec, &codec).unwrap();
    assert_eq!(store.attribute_reads.load(Ordering::Relaxed), 1);
}
