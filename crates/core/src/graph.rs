//! Arena-backed undirected graph with a mutable 3-coloring.
//!
//! Vertices live in a `Vec` and are addressed by [`VertexId`]; edges store two
//! handles rather than references, so the arena can grow freely while edges
//! are being added.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::GraphError;
use crate::solution::{RemovedEdge, Solution};

/// Number of colors available to every vertex.
pub const COLORS: u8 = 3;

/// Label of a vertex as written on the command line.
pub type VertexKey = u32;

/// Stable handle of a vertex inside its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexId(usize);

/// Stable handle of an edge inside its [`Graph`], in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub key: VertexKey,
    pub color: u8,
}

/// Unordered pair of vertices. `(a, b)` equals `(b, a)`.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub v1: VertexId,
    pub v2: VertexId,
}

impl Edge {
    pub fn connects(&self, a: VertexId, b: VertexId) -> bool {
        (self.v1 == a && self.v2 == b) || (self.v1 == b && self.v2 == a)
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.connects(other.v1, other.v2)
    }
}

impl Eq for Edge {}

// ── Edge tokens ─────────────────────────────────────────────────────

/// A parsed `<int>-<int>` command-line token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeToken {
    pub from: VertexKey,
    pub to: VertexKey,
}

impl FromStr for EdgeToken {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason| GraphError::MalformedToken {
            token: s.to_string(),
            reason,
        };

        let (left, right) = s
            .split_once('-')
            .ok_or_else(|| malformed("edges must consist of exactly two vertices"))?;
        if right.contains('-') {
            return Err(malformed("edges must consist of exactly two vertices"));
        }

        let from = parse_key(left).ok_or_else(|| malformed("vertex keys must consist of digits only"))?;
        let to = parse_key(right).ok_or_else(|| malformed("vertex keys must consist of digits only"))?;

        Ok(Self { from, to })
    }
}

fn parse_key(s: &str) -> Option<VertexKey> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for EdgeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

// ── Graph ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from edge tokens, deduplicating vertices by key and
    /// edges by endpoint pair.
    pub fn from_tokens(tokens: &[EdgeToken]) -> Result<Self, GraphError> {
        if tokens.is_empty() {
            return Err(GraphError::NoEdges);
        }

        let mut graph = Self::new();
        for token in tokens {
            let v1 = graph.add_or_get_vertex(token.from);
            let v2 = graph.add_or_get_vertex(token.to);
            graph.add_edge_if_absent(v1, v2);
        }
        Ok(graph)
    }

    /// Return the vertex labelled `key`, creating it with color 0 if unseen.
    pub fn add_or_get_vertex(&mut self, key: VertexKey) -> VertexId {
        if let Some(idx) = self.vertices.iter().position(|v| v.key == key) {
            return VertexId(idx);
        }
        self.vertices.push(Vertex { key, color: 0 });
        VertexId(self.vertices.len() - 1)
    }

    /// Append an edge between `v1` and `v2` unless one already exists in
    /// either orientation. Returns whether an edge was added.
    pub fn add_edge_if_absent(&mut self, v1: VertexId, v2: VertexId) -> bool {
        if self.edges.iter().any(|e| e.connects(v1, v2)) {
            return false;
        }
        self.edges.push(Edge { v1, v2 });
        true
    }

    /// Assign every vertex an independent uniform color in `0..COLORS`.
    pub fn randomize_colors<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for vertex in &mut self.vertices {
            vertex.color = rng.gen_range(0..COLORS);
        }
    }

    /// Edges whose endpoints currently share a color, in insertion order.
    pub fn conflicting_edges(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| self.vertex(e.v1).color == self.vertex(e.v2).color)
            .map(|(idx, _)| EdgeId(idx))
            .collect()
    }

    /// Resolve the current conflicts to plain vertex keys.
    pub fn removal_candidates(&self) -> Solution {
        self.conflicting_edges()
            .into_iter()
            .map(|id| {
                let edge = self.edge(id);
                RemovedEdge {
                    from: self.vertex(edge.v1).key,
                    to: self.vertex(edge.v2).key,
                }
            })
            .collect()
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn paint(g: &mut Graph, id: VertexId, color: u8) {
        assert!(color < COLORS);
        g.vertices[id.0].color = color;
    }

    fn tokens(list: &[&str]) -> Vec<EdgeToken> {
        list.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn parses_edge_tokens() {
        let t: EdgeToken = "12-7".parse().unwrap();
        assert_eq!(t, EdgeToken { from: 12, to: 7 });
        assert_eq!(t.to_string(), "12-7");
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["1", "1-2-3", "a-2", "1-", "-2", "1--2", "+1-2", " 1-2", ""] {
            let err = bad.parse::<EdgeToken>().unwrap_err();
            assert!(
                matches!(err, GraphError::MalformedToken { .. }),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn empty_token_list_is_an_error() {
        assert_eq!(Graph::from_tokens(&[]).unwrap_err(), GraphError::NoEdges);
    }

    #[test]
    fn deduplicates_vertices_and_edges() {
        let g = Graph::from_tokens(&tokens(&["0-1", "1-0", "1-2", "0-1", "2-1"])).unwrap();
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert!(g.vertices().iter().all(|v| v.color == 0));
    }

    #[test]
    fn edges_compare_unordered() {
        let mut g = Graph::new();
        let a = g.add_or_get_vertex(1);
        let b = g.add_or_get_vertex(2);
        assert_eq!(Edge { v1: a, v2: b }, Edge { v1: b, v2: a });
        assert!(g.add_edge_if_absent(a, b));
        assert!(!g.add_edge_if_absent(b, a));
    }

    #[test]
    fn uncolored_graph_conflicts_everywhere() {
        let g = Graph::from_tokens(&tokens(&["0-1", "1-2", "2-0"])).unwrap();
        assert_eq!(g.conflicting_edges().len(), 3);
    }

    #[test]
    fn conflicts_follow_insertion_order() {
        let mut g = Graph::from_tokens(&tokens(&["0-1", "0-2", "0-3", "1-2", "1-3", "2-3"])).unwrap();
        let ids: Vec<VertexId> = [0, 1, 2, 3].iter().map(|&k| g.add_or_get_vertex(k)).collect();
        paint(&mut g, ids[0], 0);
        paint(&mut g, ids[1], 1);
        paint(&mut g, ids[2], 2);
        paint(&mut g, ids[3], 0);

        let removed = g.removal_candidates();
        assert_eq!(removed.to_string(), "0-3");

        paint(&mut g, ids[3], 1);
        let removed = g.removal_candidates();
        assert_eq!(removed.to_string(), "1-3");
    }

    #[test]
    fn proper_coloring_has_no_conflicts() {
        let mut g = Graph::from_tokens(&tokens(&["0-1", "1-2", "2-0"])).unwrap();
        for (key, color) in [(0, 0), (1, 1), (2, 2)] {
            let id = g.add_or_get_vertex(key);
            paint(&mut g, id, color);
        }
        assert!(g.conflicting_edges().is_empty());
        assert!(g.removal_candidates().is_colorable());
    }

    #[test]
    fn conflicts_are_stable_for_fixed_coloring() {
        let mut g = Graph::from_tokens(&tokens(&["0-1", "1-2", "2-3", "3-0", "0-2"])).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        g.randomize_colors(&mut rng);
        assert_eq!(g.conflicting_edges(), g.conflicting_edges());
    }

    #[test]
    fn randomized_colors_stay_in_range() {
        let mut g = Graph::from_tokens(&tokens(&["0-1", "2-3", "4-5", "6-7"])).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            g.randomize_colors(&mut rng);
            assert!(g.vertices().iter().all(|v| v.color < COLORS));
        }
    }
}
