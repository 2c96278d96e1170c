pub mod config;
pub mod error;
pub mod graph;
pub mod solution;

pub use config::TricolorConfig;
pub use error::*;
pub use graph::{Edge, EdgeId, EdgeToken, Graph, Vertex, VertexId, VertexKey, COLORS};
pub use solution::{RemovedEdge, Solution, MAX_SOLUTION_LEN};
