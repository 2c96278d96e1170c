use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::VertexKey;

/// Largest number of removed edges a published solution may carry.
pub const MAX_SOLUTION_LEN: usize = 8;

/// An edge named by its endpoint keys, meaningful outside the graph that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemovedEdge {
    pub from: VertexKey,
    pub to: VertexKey,
}

impl fmt::Display for RemovedEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// A candidate set of edges whose removal leaves the graph properly 3-colored.
///
/// An empty solution means the coloring that produced it was already proper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    edges: Vec<RemovedEdge>,
}

impl Solution {
    pub fn new(edges: Vec<RemovedEdge>) -> Self {
        Self { edges }
    }

    pub fn edges(&self) -> &[RemovedEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// True when no edge has to be removed.
    pub fn is_colorable(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether the solution fits into a ring buffer slot.
    pub fn fits(&self) -> bool {
        self.edges.len() <= MAX_SOLUTION_LEN
    }

    /// Strictly fewer edges than `best`; anything beats no best at all.
    pub fn improves_on(&self, best: Option<&Solution>) -> bool {
        best.map_or(true, |b| self.len() < b.len())
    }
}

impl FromIterator<RemovedEdge> for Solution {
    fn from_iter<I: IntoIterator<Item = RemovedEdge>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, edge) in self.edges.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{edge}")?;
        }
        Ok(())
    }
}
