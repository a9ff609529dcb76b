//! Read and write point sets to hierarchical block stores.
//!
//! A point set pairs the coordinates of `n` points in `d` dimensions with one value per point.
//! It is persisted as a group holding four attributes, a `float64` coordinate dataset of shape
//! `[d, n]` and whatever the injected [`ValueWriter`] stores below the group:
//!
//! ```text
//! <path>/attributes.json     format-name, format-version, codec-version, layout-is-flat
//! <path>/coordinates/        dataset [d, n], block [d, n] (flat) or [1, n] (nested)
//! <path>/values/             owned by the value codec
//! ```
//!
//! The [`Layout`] is recorded when the structure is written and honoured by every reader.
//!
//! ```
//! use kdio::{Layout, PointSet, Positions, PrimitiveValues, WriteOptions, read_point_set};
//! use kdio::store::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! let positions = Positions::from_points(2, [[1.0, 2.0], [3.0, 4.0]]).unwrap();
//! let points = PointSet::try_new(positions, vec![10u32, 20]).unwrap();
//!
//! WriteOptions::default()
//!     .with_layout(Layout::Nested)
//!     .write(&points, &PrimitiveValues::<u32>::new(), &store, "trees/oak")
//!     .unwrap();
//!
//! let read: PointSet<u32> = read_point_set(&PrimitiveValues::<u32>::new(), &store, "trees/oak").unwrap();
//! assert_eq!(read.layout(), Layout::Nested);
//! assert!(read.positions().same_table(points.positions()));
//! ```

pub use kdio_error as error;
pub use kdio_store as store;
pub use layout::*;
pub use metadata::*;
pub use point_set::*;
pub use positions::*;
pub use reader::*;
pub use relayout::*;
pub use values::*;
pub use version::*;
pub use writer::*;

mod layout;
mod metadata;
mod point_set;
mod positions;
mod reader;
mod relayout;
#[cfg(test)]
mod tests;
mod values;
mod version;
mod writer;

pub use forever_constant::*;

/// The version of the logical structure written by this crate.
pub const FORMAT_VERSION: &str = "1.0.0";
/// The version of the encoding rules used by this crate's writer.
pub const CODEC_VERSION: &str = "0.1.0";

/// Constants that will never change (i.e., doing so would break every structure already written)
mod forever_constant {
    /// Identifies a group as a persisted point set
    pub const FORMAT_NAME: &str = "kdtree";

    pub const FORMAT_NAME_KEY: &str = "format-name";
    pub const FORMAT_VERSION_KEY: &str = "format-version";
    pub const CODEC_VERSION_KEY: &str = "codec-version";
    /// `true` for [`crate::Layout::Flat`], `false` for [`crate::Layout::Nested`]
    pub const LAYOUT_IS_FLAT_KEY: &str = "layout-is-flat";

    /// Sub-path of the coordinate dataset
    pub const COORDINATES: &str = "coordinates";
    /// Sub-path handed to value codecs by convention
    pub const VALUES: &str = "values";

}
