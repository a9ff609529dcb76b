//! Persistence of the per-point values.
//!
//! kdio never interprets values. Callers inject a [`ValueWriter`] when writing and a
//! [`ValueReader`] when reading; both receive the store and the structure's group path and may
//! lay values out below that group however they like. Closures with the matching signature
//! implement both traits.

use std::marker::PhantomData;

use itertools::Itertools;
use kdio_error::{KdioResult, kdio_bail, kdio_err};
use kdio_store::path::group_path;
use kdio_store::{
    BlockReader, BlockReaderExt, BlockWriter, Compression, DataBlock, DatasetAttributes,
    NativeType,
};

use crate::VALUES;

/// Persists the values of a point set below the structure's group.
pub trait ValueWriter<V> {
    fn write_values(&self, values: &[V], store: &dyn BlockWriter, path: &str) -> KdioResult<()>;
}

/// Restores the values written by a matching [`ValueWriter`].
pub trait ValueReader<V> {
    fn read_values(&self, store: &dyn BlockReader, path: &str) -> KdioResult<Vec<V>>;
}

impl<V, F> ValueWriter<V> for F
where
    F: Fn(&[V], &dyn BlockWriter, &str) -> KdioResult<()>,
{
    fn write_values(&self, values: &[V], store: &dyn BlockWriter, path: &str) -> KdioResult<()> {
        self(values, store, path)
    }
}

impl<V, F> ValueReader<V> for F
where
    F: Fn(&dyn BlockReader, &str) -> KdioResult<Vec<V>>,
{
    fn read_values(&self, store: &dyn BlockReader, path: &str) -> KdioResult<Vec<V>> {
        self(store, path)
    }
}

/// Stores primitive values as a one-dimensional dataset at `<path>/values`, in a single
/// block of `num_points` elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveValues<T> {
    compression: Compression,
    _marker: PhantomData<T>,
}

impl<T: NativeType> PrimitiveValues<T> {
    pub fn new() -> Self {
        Self::with_compression(Compression::Raw)
    }

    pub fn with_compression(compression: Compression) -> Self {
        Self {
            compression,
            _marker: PhantomData,
        }
    }

    /// Adapt this codec to values of another type, stored as `T`.
    pub fn mapped<V>(self, to_stored: fn(&V) -> T, from_stored: fn(T) -> V) -> MappedValues<T, V> {
        MappedValues {
            inner: self,
            to_stored,
            from_stored,
        }
    }
}

impl<T: NativeType> ValueWriter<T> for PrimitiveValues<T> {
    fn write_values(&self, values: &[T], store: &dyn BlockWriter, path: &str) -> KdioResult<()> {
        let values_path = group_path(path, VALUES);
        let len = u32::try_from(values.len())
            .map_err(|_| kdio_err!("Cannot store {} values in a single block", values.len()))?;
        let attributes = DatasetAttributes::try_new(
            vec![u64::from(len)],
            vec![len],
            T::DATA_TYPE,
            self.compression,
        )?;
        store.create_dataset(&values_path, &attributes)?;
        if len > 0 {
            let block = DataBlock::from_slice(vec![len], vec![0], values);
            store.write_block(&values_path, &attributes, &block)?;
        }
        log::trace!("Wrote {} {} values to {}", len, T::DATA_TYPE, values_path);
        Ok(())
    }
}

impl<T: NativeType> ValueReader<T> for PrimitiveValues<T> {
    fn read_values(&self, store: &dyn BlockReader, path: &str) -> KdioResult<Vec<T>> {
        let values_path = group_path(path, VALUES);
        let attributes = store
            .dataset_attributes(&values_path)?
            .ok_or_else(|| kdio_err!(StoreRead: "No values dataset at {}", values_path))?;
        if attributes.num_dimensions() != 1 || attributes.data_type() != T::DATA_TYPE {
            kdio_bail!(
                CorruptMetadata: "Values dataset {} is {} [{}], expected a one-dimensional {} dataset",
                values_path,
                attributes.data_type(),
                attributes.dimensions().iter().join(", "),
                T::DATA_TYPE
            );
        }
        let len = usize::try_from(attributes.dimensions()[0])
            .map_err(|_| kdio_err!(CorruptMetadata: "Values dataset {} is too large", values_path))?;

        let mut values = Vec::with_capacity(len);
        for g in 0..attributes.grid_size()[0] {
            let block = store
                .read_block(&values_path, &attributes, &[g])?
                .ok_or_else(|| kdio_err!(StoreRead: "Block {} of {} is missing", g, values_path))?;
            values.extend(block.to_vec::<T>()?);
        }
        if values.len() != len {
            kdio_bail!(DataShape: values_path, len, values.len());
        }
        Ok(values)
    }
}

/// A [`PrimitiveValues`] codec for values that convert to and from a primitive, such as
/// colours packed into a `u32`.
#[derive(Debug, Clone, Copy)]
pub struct MappedValues<T, V> {
    inner: PrimitiveValues<T>,
    to_stored: fn(&V) -> T,
    from_stored: fn(T) -> V,
}

impl<T: NativeType, V> ValueWriter<V> for MappedValues<T, V> {
    fn write_values(&self, values: &[V], store: &dyn BlockWriter, path: &str) -> KdioResult<()> {
        let stored: Vec<T> = values.iter().map(self.to_stored).collect();
        self.inner.write_values(&stored, store, path)
    }
}

impl<T: NativeType, V> ValueReader<V> for MappedValues<T, V> {
    fn read_values(&self, store: &dyn BlockReader, path: &str) -> KdioResult<Vec<V>> {
        Ok(self
            .inner
            .read_values(store, path)?
            .into_iter()
            .map(self.from_stored)
            .collect())
    }
}
