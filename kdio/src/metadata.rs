use itertools::Itertools;
use kdio_error::{KdioResult, kdio_bail, kdio_err};
use kdio_store::path::{group_path, normalize};
use kdio_store::{Attributes, BlockReader, BlockReaderExt, DataType, DatasetAttributes};
use serde_json::Value;

use crate::{
    BlockShape, CODEC_VERSION, CODEC_VERSION_KEY, COORDINATES, FORMAT_NAME, FORMAT_NAME_KEY,
    FORMAT_VERSION, FORMAT_VERSION_KEY, LAYOUT_IS_FLAT_KEY, Layout, Version,
};

/// The attributes recorded on the group of a structure written with `layout`.
pub fn structure_attributes(layout: Layout) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(FORMAT_NAME_KEY.to_string(), FORMAT_NAME.into());
    attributes.insert(FORMAT_VERSION_KEY.to_string(), FORMAT_VERSION.into());
    attributes.insert(CODEC_VERSION_KEY.to_string(), CODEC_VERSION.into());
    attributes.insert(LAYOUT_IS_FLAT_KEY.to_string(), bool::from(layout).into());
    attributes
}

/// Everything a reader learns about a persisted structure before touching its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureInfo {
    path: String,
    format_version: Version,
    codec_version: Version,
    layout: Layout,
    num_dimensions: u32,
    num_points: u32,
    coordinates: DatasetAttributes,
}

impl StructureInfo {
    /// Read and validate the metadata of the structure at `path`.
    ///
    /// Nothing is inferred: the layout comes from the `layout-is-flat` attribute alone, and
    /// the coordinate dataset must be blocked exactly as that layout prescribes.
    pub fn read(store: &dyn BlockReader, path: &str) -> KdioResult<Self> {
        let path = normalize(path);
        if !store.exists(&path)? {
            kdio_bail!(StoreRead: "No structure at {}", path);
        }
        let attributes = store.attributes(&path)?;

        let format_name: String = required(&attributes, &path, FORMAT_NAME_KEY)?;
        if format_name != FORMAT_NAME {
            kdio_bail!(
                CorruptMetadata: "{} holds a \"{}\" structure, expected \"{}\"",
                path,
                format_name,
                FORMAT_NAME
            );
        }
        let format_version =
            compatible_version(&attributes, &path, FORMAT_VERSION_KEY, FORMAT_VERSION)?;
        let codec_version =
            compatible_version(&attributes, &path, CODEC_VERSION_KEY, CODEC_VERSION)?;
        let layout = Layout::from(required::<bool>(&attributes, &path, LAYOUT_IS_FLAT_KEY)?);

        let coordinates_path = group_path(&path, COORDINATES);
        let coordinates = store.dataset_attributes(&coordinates_path)?.ok_or_else(|| {
            kdio_err!(CorruptMetadata: "Structure {} has no coordinate dataset", path)
        })?;
        if coordinates.data_type() != DataType::Float64 || coordinates.num_dimensions() != 2 {
            kdio_bail!(
                CorruptMetadata: "Coordinate dataset {} is {} [{}], expected two-dimensional {}",
                coordinates_path,
                coordinates.data_type(),
                coordinates.dimensions().iter().join(", "),
                DataType::Float64
            );
        }
        let num_dimensions = u32::try_from(coordinates.dimensions()[0]).map_err(|_| {
            kdio_err!(CorruptMetadata: "Coordinate dataset {} has too many dimensions", coordinates_path)
        })?;
        let num_points = u32::try_from(coordinates.dimensions()[1]).map_err(|_| {
            kdio_err!(CorruptMetadata: "Coordinate dataset {} has too many points", coordinates_path)
        })?;
        if num_dimensions == 0 {
            kdio_bail!(CorruptMetadata: "Coordinate dataset {} has no dimensions", coordinates_path);
        }

        let expected = layout.block_shape(num_dimensions, num_points);
        if coordinates.block_size() != expected.block_shape {
            kdio_bail!(
                CorruptMetadata: "Coordinate dataset {} has block size [{}], but a {} layout of this shape needs [{}]",
                coordinates_path,
                coordinates.block_size().iter().join(", "),
                layout,
                expected.block_shape.iter().join(", ")
            );
        }

        Ok(Self {
            path,
            format_version,
            codec_version,
            layout,
            num_dimensions,
            num_points,
            coordinates,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn format_version(&self) -> Version {
        self.format_version
    }

    pub fn codec_version(&self) -> Version {
        self.codec_version
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn num_dimensions(&self) -> usize {
        self.num_dimensions as usize
    }

    pub fn num_points(&self) -> usize {
        self.num_points as usize
    }

    /// Dataset attributes of the coordinate dataset.
    pub fn coordinates(&self) -> &DatasetAttributes {
        &self.coordinates
    }

    pub fn coordinates_path(&self) -> String {
        group_path(&self.path, COORDINATES)
    }

    pub fn block_shape(&self) -> BlockShape {
        self.layout.block_shape(self.num_dimensions, self.num_points)
    }
}

fn required<T: serde::de::DeserializeOwned>(
    attributes: &Attributes,
    path: &str,
    key: &str,
) -> KdioResult<T> {
    match attributes.get(key) {
        None | Some(Value::Null) => {
            kdio_bail!(CorruptMetadata: "Structure {} has no {} attribute", path, key)
        }
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            kdio_err!(CorruptMetadata: "Attribute {} of {} has the wrong type: {}", key, path, e)
        }),
    }
}

fn compatible_version(
    attributes: &Attributes,
    path: &str,
    key: &str,
    supported: &str,
) -> KdioResult<Version> {
    let found: String = required(attributes, path, key)?;
    let supported_version: Version = supported.parse()?;
    match found.parse::<Version>() {
        Ok(version) if supported_version.is_compatible_with(&version) => Ok(version),
        _ => Err(kdio_err!(UnsupportedVersion: key, found, supported)),
    }
}
