use bytes::{Buf, BufMut, Bytes, BytesMut};
use itertools::Itertools;
use kdio_error::{KdioResult, kdio_bail, kdio_err};

use crate::{Compression, DataType, DatasetAttributes, NativeType};

/// Block mode for a block whose element count is given by its size.
const MODE_DEFAULT: u16 = 0;

/// A rectangular block of a dataset, addressed by its position in the block grid.
///
/// Element data is held big-endian, exactly as it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    size: Vec<u32>,
    grid_position: Vec<u64>,
    data_type: DataType,
    data: Bytes,
}

impl DataBlock {
    pub fn from_slice<T: NativeType>(
        size: Vec<u32>,
        grid_position: Vec<u64>,
        values: &[T],
    ) -> Self {
        let mut data = BytesMut::with_capacity(values.len() * T::DATA_TYPE.byte_width());
        for &v in values {
            v.put_be(&mut data);
        }
        Self {
            size,
            grid_position,
            data_type: T::DATA_TYPE,
            data: data.freeze(),
        }
    }

    pub fn size(&self) -> &[u32] {
        &self.size
    }

    pub fn grid_position(&self) -> &[u64] {
        &self.grid_position
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of elements implied by the block's size.
    pub fn num_elements(&self) -> usize {
        self.size.iter().map(|&s| s as usize).product()
    }

    /// Number of elements actually held.
    pub fn len(&self) -> usize {
        self.data.len() / self.data_type.byte_width()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_vec<T: NativeType>(&self) -> KdioResult<Vec<T>> {
        if T::DATA_TYPE != self.data_type {
            kdio_bail!(
                CorruptMetadata: "Block holds {} elements, cannot read them as {}",
                self.data_type,
                T::DATA_TYPE
            );
        }
        let mut data = self.data.clone();
        let mut values = Vec::with_capacity(self.len());
        while data.has_remaining() {
            values.push(T::get_be(&mut data));
        }
        Ok(values)
    }

    /// Serialize the block: `u16 mode`, `u16 ndim`, `ndim x u32 size`, then the compressed
    /// element bytes. All integers are big-endian.
    pub fn encode(&self, compression: &Compression) -> KdioResult<Bytes> {
        let ndim = u16::try_from(self.size.len())
            .map_err(|_| kdio_err!("Block has too many dimensions: {}", self.size.len()))?;
        let payload = compression.encode(&self.data)?;
        let mut buf = BytesMut::with_capacity(4 + 4 * self.size.len() + payload.len());
        buf.put_u16(MODE_DEFAULT);
        buf.put_u16(ndim);
        for &s in &self.size {
            buf.put_u32(s);
        }
        buf.put_slice(&payload);
        Ok(buf.freeze())
    }

    /// Deserialize a block read from `path` at `grid_position`.
    pub fn decode(
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[u64],
        mut encoded: Bytes,
    ) -> KdioResult<Self> {
        if encoded.remaining() < 4 {
            kdio_bail!(StoreRead: "Block header of {} is truncated", path);
        }
        let mode = encoded.get_u16();
        if mode != MODE_DEFAULT {
            kdio_bail!(CorruptMetadata: "Block of {} has unsupported mode {}", path, mode);
        }
        let ndim = usize::from(encoded.get_u16());
        if ndim != attributes.num_dimensions() {
            kdio_bail!(
                CorruptMetadata: "Block of {} has {} dimensions, dataset has {}",
                path,
                ndim,
                attributes.num_dimensions()
            );
        }
        if encoded.remaining() < 4 * ndim {
            kdio_bail!(StoreRead: "Block header of {} is truncated", path);
        }
        let size: Vec<u32> = (0..ndim).map(|_| encoded.get_u32()).collect();
        if size
            .iter()
            .zip(attributes.block_size())
            .any(|(s, max)| s > max)
        {
            kdio_bail!(
                CorruptMetadata: "Block of {} has size [{}], larger than the block size [{}] of its dataset",
                path,
                size.iter().join(", "),
                attributes.block_size().iter().join(", ")
            );
        }
        let expected_bytes = size
            .iter()
            .try_fold(attributes.data_type().byte_width(), |bytes, &s| {
                bytes.checked_mul(usize::try_from(s).ok()?)
            })
            .ok_or_else(|| {
                kdio_err!(
                    CorruptMetadata: "Block of {} has size [{}], too large to address",
                    path,
                    size.iter().join(", ")
                )
            })?;

        let block = Self {
            data_type: attributes.data_type(),
            grid_position: grid_position.to_vec(),
            data: Bytes::new(),
            size,
        };
        let data = attributes.compression().decode(encoded, expected_bytes)?;
        if data.len() != expected_bytes {
            kdio_bail!(
                DataShape: path,
                block.num_elements(),
                data.len() / block.data_type.byte_width()
            );
        }
        Ok(Self { data, ..block })
    }
}

#[cfg(test)]
mod tests {
    use kdio_error::KdioError;

    use super::*;

    fn attrs(compression: Compression) -> DatasetAttributes {
        DatasetAttributes::try_new(vec![2, 3], vec![2, 3], DataType::Float64, compression).unwrap()
    }

    #[test]
    fn header_layout() {
        let block = DataBlock::from_slice(vec![2, 3], vec![0, 0], &[1.0f64, 2., 3., 4., 5., 6.]);
        let encoded = block.encode(&Compression::Raw).unwrap();
        assert_eq!(&encoded[..12], &[0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 3]);
        assert_eq!(encoded.len(), 12 + 6 * 8);
    }

    #[test]
    fn decode_restores_block() {
        let block = DataBlock::from_slice(vec![2, 3], vec![0, 0], &[1.0f64, 2., 3., 4., 5., 6.]);
        for compression in [Compression::Raw, Compression::bzip2()] {
            let encoded = block.encode(&compression).unwrap();
            let decoded =
                DataBlock::decode("c", &attrs(compression), &[0, 0], encoded).unwrap();
            assert_eq!(decoded, block);
            assert_eq!(
                decoded.to_vec::<f64>().unwrap(),
                vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
            );
        }
    }

    #[test]
    fn short_payload_is_a_shape_error() {
        let block = DataBlock::from_slice(vec![2, 3], vec![0, 0], &[1.0f64, 2., 3., 4., 5., 6.]);
        let encoded = block.encode(&Compression::Raw).unwrap();
        let truncated = encoded.slice(..encoded.len() - 8);
        let err =
            DataBlock::decode("c", &attrs(Compression::Raw), &[0, 0], truncated).unwrap_err();
        assert!(matches!(err, KdioError::DataShape(_, 6, 5, _)));
    }

    fn header(sizes: &[u32]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u16(0);
        buf.put_u16(u16::try_from(sizes.len()).unwrap());
        for &s in sizes {
            buf.put_u32(s);
        }
        buf
    }

    #[test]
    fn oversized_header_is_corrupt() {
        let mut encoded = header(&[u32::MAX, 3]);
        encoded.put_slice(&[0; 48]);
        let err = DataBlock::decode("c", &attrs(Compression::Raw), &[0, 0], encoded.freeze())
            .unwrap_err();
        assert!(matches!(err, KdioError::CorruptMetadata(..)));
    }

    #[test]
    fn unaddressable_block_is_corrupt() {
        let huge = DatasetAttributes::try_new(
            vec![u64::MAX; 3],
            vec![u32::MAX; 3],
            DataType::Float64,
            Compression::Raw,
        )
        .unwrap();
        let encoded = header(&[u32::MAX; 3]).freeze();
        let err = DataBlock::decode("c", &huge, &[0, 0, 0], encoded).unwrap_err();
        assert!(matches!(err, KdioError::CorruptMetadata(..)));
    }

    #[test]
    fn claimed_size_does_not_drive_decompression() {
        let wide = DatasetAttributes::try_new(
            vec![u64::from(u32::MAX)],
            vec![u32::MAX],
            DataType::Float64,
            Compression::bzip2(),
        )
        .unwrap();
        let payload = Compression::bzip2().encode(&[0; 16]).unwrap();
        let mut encoded = header(&[u32::MAX]);
        encoded.put_slice(&payload);
        let err = DataBlock::decode("c", &wide, &[0], encoded.freeze()).unwrap_err();
        assert!(matches!(err, KdioError::DataShape(_, _, 2, _)));
    }

    #[test]
    fn reading_as_wrong_type_fails() {
        let block = DataBlock::from_slice(vec![2], vec![0], &[7u32, 8]);
        assert_eq!(block.to_vec::<u32>().unwrap(), vec![7, 8]);
        assert!(matches!(
            block.to_vec::<f64>().unwrap_err(),
            KdioError::CorruptMetadata(..)
        ));
    }
}
