//! statedraw - Finite-state automaton sketchpad
//! Draw states and transitions on a canvas and export them as TikZ/automata code

pub mod editor;
pub mod geometry;
pub mod graph;
pub mod tikz;

pub use editor::{Editor, Key, Mode, Selection};
pub use geometry::{edge_geometry, EdgeGeometry, EdgePath};
pub use graph::{Edge, EdgeId, Graph, GraphError, GraphResult, GraphSnapshot, Node, NodeId, Point};
pub use tikz::{generate, ExportParams, ExportPreview};
