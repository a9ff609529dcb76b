use std::fmt::{Display, Formatter};
use std::str::FromStr;

use kdio_error::{KdioError, kdio_err};

/// The physical arrangement of a coordinate table.
///
/// The logical table is always `num_points` rows of `num_dimensions` coordinates; the layout
/// only decides how it is cut into blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Layout {
    /// One block holding every coordinate, point-major.
    #[default]
    Flat,
    /// One block per dimension, each holding that dimension's coordinate for every point.
    Nested,
}

impl Layout {
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }

    /// The dataset shape and block shape used to store `num_points` points of
    /// `num_dimensions` coordinates in this layout.
    ///
    /// The dataset shape is `[num_dimensions, num_points]` whatever the layout.
    pub fn block_shape(&self, num_dimensions: u32, num_points: u32) -> BlockShape {
        let block_shape = match self {
            Self::Flat => [num_dimensions, num_points],
            Self::Nested => [1, num_points],
        };
        BlockShape {
            dataset_shape: [u64::from(num_dimensions), u64::from(num_points)],
            block_shape,
        }
    }
}

impl From<bool> for Layout {
    fn from(is_flat: bool) -> Self {
        if is_flat { Self::Flat } else { Self::Nested }
    }
}

impl From<Layout> for bool {
    fn from(layout: Layout) -> Self {
        layout.is_flat()
    }
}

impl Display for Layout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Nested => write!(f, "nested"),
        }
    }
}

impl FromStr for Layout {
    type Err = KdioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "nested" => Ok(Self::Nested),
            other => Err(kdio_err!("Unknown layout {}, expected flat or nested", other)),
        }
    }
}

/// Dataset and block shape of a coordinate dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockShape {
    pub dataset_shape: [u64; 2],
    pub block_shape: [u32; 2],
}

impl BlockShape {
    /// Number of coordinates in a single block.
    pub fn block_elements(&self) -> usize {
        self.block_shape[0] as usize * self.block_shape[1] as usize
    }

    /// Number of block transfers needed to move the whole dataset.
    ///
    /// An empty dataset needs none.
    pub fn block_count(&self) -> u64 {
        if self.block_elements() == 0 {
            return 0;
        }
        self.dataset_shape[0] / u64::from(self.block_shape[0])
    }

    /// Grid positions of the blocks, in dimension order: `(0, 0)` for a flat table, `(d, 0)`
    /// for every dimension `d` of a nested one.
    pub fn grid_positions(&self) -> Vec<[u64; 2]> {
        (0..self.block_count()).map(|row| [row, 0]).collect()
    }
}
