use kdio_error::{KdioResult, kdio_bail};

use crate::{Layout, Positions};

/// Points in n-dimensional space, each paired with a value.
///
/// Point `i`'s coordinates and value `i` always describe the same point; nothing in kdio
/// reorders either.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet<V> {
    positions: Positions,
    values: Vec<V>,
}

impl<V> PointSet<V> {
    pub fn try_new(positions: Positions, values: Vec<V>) -> KdioResult<Self> {
        if positions.num_points() != values.len() {
            kdio_bail!(
                "Point set has {} positions but {} values",
                positions.num_points(),
                values.len()
            );
        }
        Ok(Self { positions, values })
    }

    pub fn num_dimensions(&self) -> usize {
        self.positions.num_dimensions()
    }

    pub fn num_points(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn layout(&self) -> Layout {
        self.positions.layout()
    }

    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn into_parts(self) -> (Positions, Vec<V>) {
        (self.positions, self.values)
    }

    pub fn into_layout(self, layout: Layout) -> Self {
        Self {
            positions: self.positions.into_layout(layout),
            values: self.values,
        }
    }

    /// Iterate over `(coordinates, value)` pairs in point order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec<f64>, &V)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| self.positions.point(i).map(|p| (p, v)))
    }
}
