//! Automaton Graph Model
//! Nodes (states), edges (transitions) and the id counters that name them

use std::collections::HashSet;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;


const NODE_ID_PREFIX: &str = "node";
const EDGE_ID_PREFIX: &str = "edge";

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(String),
    #[error("Duplicate edge id: {0}")]
    DuplicateEdgeId(String),
    #[error("Edge '{edge}' references missing node '{endpoint}'")]
    DanglingEdge { edge: String, endpoint: String },
    #[error("No ids left after '{0}'")]
    IdsExhausted(String),
    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;

// ============================================================================
// IDS
// ============================================================================

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Integer after the last `_`, for ids shaped like `prefix_<integer>`
            pub fn numeric_suffix(&self) -> Option<u64> {
                let (_, suffix) = self.0.rsplit_once('_')?;
                suffix.parse().ok()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(NodeId);
string_id!(EdgeId);

// ============================================================================
// POINT
// ============================================================================

/// A position on the drawing surface (origin top-left, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector at `radians` (0 points right, positive turns toward +y)
    pub fn from_angle(radians: f32) -> Self {
        Self::new(radians.cos(), radians.sin())
    }

    pub fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, factor: f32) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        self.sub(other).length()
    }

    /// Unit vector in the same direction, or `None` for the zero vector
    pub fn normalized(self) -> Option<Point> {
        let len = self.length();
        (len > 0.0).then(|| self.scale(1.0 / len))
    }

    /// Quarter turn toward -y: `(x, y) -> (y, -x)`
    pub fn perp(self) -> Point {
        Point::new(self.y, -self.x)
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        self.add(other.sub(self).scale(t))
    }
}

// ============================================================================
// NODES AND EDGES
// ============================================================================

/// A state of the automaton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier, never reused within a session
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    /// Free-form label (may be empty)
    #[serde(default)]
    pub label: String,
    /// Accepting (final) state flag
    #[serde(default)]
    pub accept: bool,
}

impl Node {
    pub fn new(id: NodeId, position: Point) -> Self {
        Self {
            id,
            x: position.x,
            y: position.y,
            label: String::new(),
            accept: false,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A directed transition, possibly a self-loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub label: String,
    /// Loop direction in degrees; only meaningful for self-loops, `None` means the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_angle: Option<f32>,
}

impl Edge {
    pub fn new(id: EdgeId, from: NodeId, to: NodeId) -> Self {
        Self {
            id,
            from,
            to,
            label: String::new(),
            loop_angle: None,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    pub fn touches(&self, node: &NodeId) -> bool {
        &self.from == node || &self.to == node
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Persisted form of a [`Graph`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Next node counter value; older snapshots omit it and fall back to id suffixes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_edge_id: Option<u64>,
}

// ============================================================================
// GRAPH
// ============================================================================

/// Ordered node and edge collections plus the counters that mint their ids.
///
/// Every edge's endpoints exist in `nodes`; ids are unique and never handed out twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    next_node: u64,
    next_edge: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    fn edge_mut(&mut self, id: &EdgeId) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|e| &e.id == id)
    }

    // ------------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------------

    /// Append a node with an empty label at `position`
    pub fn add_node(&mut self, position: Point) -> NodeId {
        let id = NodeId::new(format!("{}_{}", NODE_ID_PREFIX, self.next_node));
        self.next_node = self.next_node.saturating_add(1);
        self.nodes.push(Node::new(id.clone(), position));
        id
    }

    pub fn move_node(&mut self, id: &NodeId, position: Point) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.x = position.x;
                node.y = position.y;
                true
            }
            None => false,
        }
    }

    pub fn set_node_label(&mut self, id: &NodeId, label: impl Into<String>) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.label = label.into();
                true
            }
            None => false,
        }
    }

    pub fn toggle_accept(&mut self, id: &NodeId) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.accept = !node.accept;
                true
            }
            None => false,
        }
    }

    /// Remove a node and every edge that starts or ends at it
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let index = self.nodes.iter().position(|n| &n.id == id)?;
        let node = self.nodes.remove(index);
        self.edges.retain(|e| !e.touches(id));
        Some(node)
    }

    // ------------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------------

    /// Append an edge with an empty label; `None` if either endpoint is missing
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) -> Option<EdgeId> {
        if self.node(from).is_none() || self.node(to).is_none() {
            return None;
        }
        let id = EdgeId::new(format!("{}_{}", EDGE_ID_PREFIX, self.next_edge));
        self.next_edge = self.next_edge.saturating_add(1);
        self.edges.push(Edge::new(id.clone(), from.clone(), to.clone()));
        Some(id)
    }

    pub fn set_edge_label(&mut self, id: &EdgeId, label: impl Into<String>) -> bool {
        match self.edge_mut(id) {
            Some(edge) => {
                edge.label = label.into();
                true
            }
            None => false,
        }
    }

    /// Store a loop angle in degrees; refused for edges that are not self-loops
    pub fn set_loop_angle(&mut self, id: &EdgeId, degrees: f32) -> bool {
        match self.edge_mut(id) {
            Some(edge) if edge.is_self_loop() => {
                edge.loop_angle = Some(degrees);
                true
            }
            _ => false,
        }
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let index = self.edges.iter().position(|e| &e.id == id)?;
        Some(self.edges.remove(index))
    }

    // ------------------------------------------------------------------------
    // Bulk replacement / persistence
    // ------------------------------------------------------------------------

    /// Replace both collections at once. On error the graph is left untouched.
    pub fn replace(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> GraphResult<()> {
        *self = Self::from_snapshot(GraphSnapshot {
            nodes,
            edges,
            next_node_id: None,
            next_edge_id: None,
        })?;
        Ok(())
    }

    pub fn from_snapshot(snapshot: GraphSnapshot) -> GraphResult<Self> {
        validate(&snapshot.nodes, &snapshot.edges)?;

        let next_node = next_counter(
            NODE_ID_PREFIX,
            snapshot.next_node_id,
            snapshot.nodes.iter().filter_map(|n| n.id.numeric_suffix()),
        )?;
        let next_edge = next_counter(
            EDGE_ID_PREFIX,
            snapshot.next_edge_id,
            snapshot.edges.iter().filter_map(|e| e.id.numeric_suffix()),
        )?;
        debug!(
            "loaded snapshot: {} nodes, {} edges, next ids {}/{}",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            next_node,
            next_edge
        );

        Ok(Self {
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            next_node,
            next_edge,
        })
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            next_node_id: Some(self.next_node),
            next_edge_id: Some(self.next_edge),
        }
    }

    /// Load from JSON. Blank input is an empty graph.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    pub fn to_json(&self) -> GraphResult<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

fn validate(nodes: &[Node], edges: &[Edge]) -> GraphResult<()> {
    let mut node_ids = HashSet::new();
    for node in nodes {
        if !node_ids.insert(&node.id) {
            return Err(GraphError::DuplicateNodeId(node.id.to_string()));
        }
    }

    let mut edge_ids = HashSet::new();
    for edge in edges {
        if !edge_ids.insert(&edge.id) {
            return Err(GraphError::DuplicateEdgeId(edge.id.to_string()));
        }
        for endpoint in [&edge.from, &edge.to] {
            if !node_ids.contains(endpoint) {
                return Err(GraphError::DanglingEdge {
                    edge: edge.id.to_string(),
                    endpoint: endpoint.to_string(),
                });
            }
        }
    }

    Ok(())
}

/// One past every id already in use, never below the stored counter
/// Counter for the next minted id. Stays below `u64::MAX` so minting can always advance it.
fn next_counter(
    prefix: &str,
    stored: Option<u64>,
    suffixes: impl Iterator<Item = u64>,
) -> GraphResult<u64> {
    let exhausted = |last: u64| GraphError::IdsExhausted(format!("{}_{}", prefix, last));
    let from_ids = match suffixes.max() {
        Some(max) => max.checked_add(1).ok_or_else(|| exhausted(max))?,
        None => 0,
    };
    let next = stored.unwrap_or(0).max(from_ids);
    if next == u64::MAX {
        return Err(exhausted(next));
    }
    Ok(next)
}
