use std::borrow::Cow;

use kdio_error::{KdioResult, kdio_bail};

use crate::Layout;

/// The coordinates of every point in a point set.
///
/// Logically a table of `num_points` rows by `num_dimensions` columns, held in either of two
/// equivalent representations. Converting between them never reorders points.
#[derive(Debug, Clone, PartialEq)]
pub enum Positions {
    /// Point-major: all of point 0's coordinates, then all of point 1's, and so on.
    Flat {
        num_dimensions: usize,
        coordinates: Vec<f64>,
    },
    /// Dimension-major: one vector per dimension, each holding that coordinate of every point.
    Nested(Vec<Vec<f64>>),
}

impl Positions {
    pub fn flat(num_dimensions: usize, coordinates: Vec<f64>) -> KdioResult<Self> {
        if num_dimensions == 0 {
            kdio_bail!("Positions need at least one dimension");
        }
        if coordinates.len() % num_dimensions != 0 {
            kdio_bail!(
                "{} coordinates do not divide into points of {} dimensions",
                coordinates.len(),
                num_dimensions
            );
        }
        Ok(Self::Flat {
            num_dimensions,
            coordinates,
        })
    }

    pub fn nested(dimensions: Vec<Vec<f64>>) -> KdioResult<Self> {
        let Some(first) = dimensions.first() else {
            kdio_bail!("Positions need at least one dimension");
        };
        let num_points = first.len();
        if let Some((d, column)) = dimensions
            .iter()
            .enumerate()
            .find(|(_, column)| column.len() != num_points)
        {
            kdio_bail!(
                "Dimension {} holds {} coordinates, dimension 0 holds {}",
                d,
                column.len(),
                num_points
            );
        }
        Ok(Self::Nested(dimensions))
    }

    /// Build flat positions from one coordinate slice per point.
    pub fn from_points<P: AsRef<[f64]>>(
        num_dimensions: usize,
        points: impl IntoIterator<Item = P>,
    ) -> KdioResult<Self> {
        let mut coordinates = Vec::new();
        for (i, point) in points.into_iter().enumerate() {
            let point = point.as_ref();
            if point.len() != num_dimensions {
                kdio_bail!(
                    "Point {} has {} coordinates, expected {}",
                    i,
                    point.len(),
                    num_dimensions
                );
            }
            coordinates.extend_from_slice(point);
        }
        Self::flat(num_dimensions, coordinates)
    }

    pub fn layout(&self) -> Layout {
        match self {
            Self::Flat { .. } => Layout::Flat,
            Self::Nested(_) => Layout::Nested,
        }
    }

    pub fn num_dimensions(&self) -> usize {
        match self {
            Self::Flat { num_dimensions, .. } => *num_dimensions,
            Self::Nested(dimensions) => dimensions.len(),
        }
    }

    pub fn num_points(&self) -> usize {
        match self {
            Self::Flat {
                num_dimensions,
                coordinates,
            } => coordinates.len() / num_dimensions,
            Self::Nested(dimensions) => dimensions.first().map_or(0, Vec::len),
        }
    }

    /// Coordinate `dimension` of point `point`.
    pub fn coordinate(&self, point: usize, dimension: usize) -> Option<f64> {
        if point >= self.num_points() || dimension >= self.num_dimensions() {
            return None;
        }
        match self {
            Self::Flat {
                num_dimensions,
                coordinates,
            } => coordinates.get(point * num_dimensions + dimension).copied(),
            Self::Nested(dimensions) => dimensions[dimension].get(point).copied(),
        }
    }

    /// All coordinates of point `point`.
    pub fn point(&self, point: usize) -> Option<Vec<f64>> {
        (0..self.num_dimensions())
            .map(|d| self.coordinate(point, d))
            .collect()
    }

    /// The coordinates in point-major order, borrowed when already flat.
    pub fn as_flat(&self) -> Cow<'_, [f64]> {
        match self {
            Self::Flat { coordinates, .. } => Cow::Borrowed(coordinates),
            Self::Nested(dimensions) => {
                let num_points = self.num_points();
                let mut coordinates = Vec::with_capacity(num_points * dimensions.len());
                for p in 0..num_points {
                    coordinates.extend(dimensions.iter().map(|column| column[p]));
                }
                Cow::Owned(coordinates)
            }
        }
    }

    /// One coordinate vector per dimension, borrowed when already nested.
    pub fn as_nested(&self) -> Vec<Cow<'_, [f64]>> {
        match self {
            Self::Nested(dimensions) => dimensions
                .iter()
                .map(|column| Cow::Borrowed(column.as_slice()))
                .collect(),
            Self::Flat {
                num_dimensions,
                coordinates,
            } => (0..*num_dimensions)
                .map(|d| {
                    Cow::Owned(
                        coordinates
                            .iter()
                            .skip(d)
                            .step_by(*num_dimensions)
                            .copied()
                            .collect(),
                    )
                })
                .collect(),
        }
    }

    /// Convert into the representation matching `layout`.
    pub fn into_layout(self, layout: Layout) -> Self {
        if self.layout() == layout {
            return self;
        }
        match layout {
            Layout::Flat => Self::Flat {
                num_dimensions: self.num_dimensions(),
                coordinates: self.as_flat().into_owned(),
            },
            Layout::Nested => Self::Nested(
                self.as_nested()
                    .into_iter()
                    .map(Cow::into_owned)
                    .collect(),
            ),
        }
    }

    /// Whether both hold the same logical table, regardless of representation.
    pub fn same_table(&self, other: &Positions) -> bool {
        self.num_dimensions() == other.num_dimensions()
            && self.num_points() == other.num_points()
            && self.as_flat() == other.as_flat()
    }
}
