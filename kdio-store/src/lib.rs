//! Hierarchical block stores.
//!
//! A block store holds named groups arranged in a tree. Every group carries a map of JSON
//! attributes, and a group whose attributes describe a shape, block size, element type and
//! compression is a dataset. Datasets are only ever transferred one rectangular
//! [`DataBlock`] at a time, addressed by the block's position in the dataset's block grid.
//!
//! Two stores ship with this crate:
//!
//! 1. [`InMemoryStore`], for tests and for staging data in memory.
//! 2. [`FileSystemStore`], an N5 directory tree on the local filesystem.
//!
//! Both encode blocks identically (see [`DataBlock::encode`]).

mod attributes;
mod block;
mod compression;
mod dtype;
mod fs;
mod memory;
pub mod path;
mod store;

pub use attributes::*;
pub use block::*;
pub use compression::*;
pub use dtype::*;
pub use fs::*;
pub use memory::*;
pub use store::*;
