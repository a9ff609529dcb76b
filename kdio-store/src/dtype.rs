use std::fmt::{Debug, Display, Formatter};

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

/// The element type of a dataset.
///
/// Serialized with the lower-case names used by N5 (`"float64"`, `"uint32"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DataType {
    /// Size in bytes of a single element.
    pub const fn byte_width(&self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::UInt16 | Self::Int16 => 2,
            Self::UInt32 | Self::Int32 | Self::Float32 => 4,
            Self::UInt64 | Self::Int64 | Self::Float64 => 8,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        };
        write!(f, "{name}")
    }
}

/// A Rust primitive that can be stored as the elements of a dataset.
///
/// Elements are always stored big-endian, whatever the host byte order.
pub trait NativeType: Copy + Debug + PartialEq + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn put_be<B: BufMut>(self, buf: &mut B);

    fn get_be<B: Buf>(buf: &mut B) -> Self;
}

macro_rules! native_type {
    ($T:ty, $dtype:ident, $put:ident, $get:ident) => {
        impl NativeType for $T {
            const DATA_TYPE: DataType = DataType::$dtype;

            #[inline]
            fn put_be<B: BufMut>(self, buf: &mut B) {
                buf.$put(self)
            }

            #[inline]
            fn get_be<B: Buf>(buf: &mut B) -> Self {
                buf.$get()
            }
        }
    };
}

native_type!(u8, UInt8, put_u8, get_u8);
native_type!(u16, UInt16, put_u16, get_u16);
native_type!(u32, UInt32, put_u32, get_u32);
native_type!(u64, UInt64, put_u64, get_u64);
native_type!(i8, Int8, put_i8, get_i8);
native_type!(i16, Int16, put_i16, get_i16);
native_type!(i32, Int32, put_i32, get_i32);
native_type!(i64, Int64, put_i64, get_i64);
native_type!(f32, Float32, put_f32, get_f32);
native_type!(f64, Float64, put_f64, get_f64);
