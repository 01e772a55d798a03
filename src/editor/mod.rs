//! Interaction State Machine
//! Turns pointer and keyboard gestures into graph mutations
//!
//! Transient state is one [`Mode`] plus one [`Selection`], so dragging, connecting,
//! loop-dragging and label editing can never be active at the same time.
//! Gestures that reference ids which no longer exist leave everything unchanged.

use log::debug;

use crate::geometry::{self, EdgeGeometry};
use crate::graph::{Edge, EdgeId, Graph, NodeId, Point};

#[cfg(test)]
mod tests;

/// What the pointer (or the label field) is currently doing
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    /// A node follows the pointer
    Dragging(NodeId),
    /// Rubber band from `from` to `preview`, waiting for a target node
    Connecting { from: NodeId, preview: Point },
    /// A self-loop's angle follows the pointer
    DraggingLoop(EdgeId),
    EditingNode { node: NodeId, draft: String },
    EditingEdge { edge: EdgeId, draft: String },
}

impl Mode {
    pub fn is_editing(&self) -> bool {
        matches!(self, Mode::EditingNode { .. } | Mode::EditingEdge { .. })
    }

    pub fn draft(&self) -> Option<&str> {
        match self {
            Mode::EditingNode { draft, .. } | Mode::EditingEdge { draft, .. } => Some(draft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Edge(EdgeId),
}

/// Keys the editor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Delete,
}

/// The graph being edited together with its transient interaction state
#[derive(Debug, Clone, Default)]
pub struct Editor {
    graph: Graph,
    mode: Mode,
    selection: Selection,
}

impl Editor {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            mode: Mode::Idle,
            selection: Selection::None,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Swap in a different graph (e.g. a freshly loaded one) and drop all transient state
    pub fn replace_graph(&mut self, graph: Graph) {
        self.graph = graph;
        self.mode = Mode::Idle;
        self.selection = Selection::None;
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_editing(&self) -> bool {
        self.mode.is_editing()
    }

    /// The label being typed, if an edit is active
    pub fn draft_mut(&mut self) -> Option<&mut String> {
        match &mut self.mode {
            Mode::EditingNode { draft, .. } | Mode::EditingEdge { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Geometry of every edge whose endpoints exist, in edge order
    pub fn geometries(&self) -> Vec<(&Edge, EdgeGeometry)> {
        self.graph
            .edges()
            .iter()
            .filter_map(|e| geometry::edge_geometry(e, self.graph.nodes()).map(|g| (e, g)))
            .collect()
    }

    /// Rubber band to draw while connecting
    pub fn preview_line(&self) -> Option<(Point, Point)> {
        let Mode::Connecting { from, preview } = &self.mode else {
            return None;
        };
        let node = self.graph.node(from)?;
        Some(geometry::connect_preview(node.position(), *preview))
    }

    // ------------------------------------------------------------------------
    // Pointer gestures
    // ------------------------------------------------------------------------

    /// Creation gesture on the surface. Does nothing when `at` lands on an existing node.
    pub fn create_node(&mut self, at: Point) -> Option<NodeId> {
        if geometry::hit_node(self.graph.nodes(), at).is_some() {
            return None;
        }
        self.commit_label();
        let id = self.graph.add_node(at);
        debug!("created {} at ({}, {})", id, at.x, at.y);
        self.mode = Mode::EditingNode {
            node: id.clone(),
            draft: String::new(),
        };
        Some(id)
    }

    /// Press on a node: select it, then drag it or (with `modifier`) start a connection.
    /// While a connection is pending the press completes it instead.
    pub fn press_node(&mut self, id: &NodeId, pointer: Point, modifier: bool) {
        if self.graph.node(id).is_none() {
            return;
        }
        if matches!(self.mode, Mode::Connecting { .. }) {
            self.complete_connection(id);
            return;
        }
        self.commit_label();
        self.selection = Selection::Node(id.clone());
        self.mode = if modifier {
            debug!("connecting from {}", id);
            Mode::Connecting {
                from: id.clone(),
                preview: pointer,
            }
        } else {
            Mode::Dragging(id.clone())
        };
    }

    pub fn pointer_moved(&mut self, pointer: Point) {
        match &mut self.mode {
            Mode::Dragging(id) => {
                self.graph.move_node(id, pointer);
            }
            Mode::Connecting { preview, .. } => *preview = pointer,
            Mode::DraggingLoop(edge_id) => {
                let center = self
                    .graph
                    .edge(edge_id)
                    .filter(|e| e.is_self_loop())
                    .and_then(|e| self.graph.node(&e.from))
                    .map(|n| n.position());
                if let Some(center) = center {
                    let angle = geometry::loop_angle_from_pointer(center, pointer);
                    self.graph.set_loop_angle(edge_id, angle);
                }
            }
            _ => {}
        }
    }

    /// Pointer released, over `over` if it is above a node
    pub fn release(&mut self, over: Option<&NodeId>) {
        match self.mode {
            Mode::Dragging(_) | Mode::DraggingLoop(_) => self.mode = Mode::Idle,
            Mode::Connecting { .. } => {
                if let Some(target) = over {
                    self.complete_connection(target);
                }
            }
            _ => {}
        }
    }

    /// Finish a pending connection at `target`; the same node as the source makes a self-loop.
    /// The new edge goes straight into label editing.
    pub fn complete_connection(&mut self, target: &NodeId) -> Option<EdgeId> {
        let Mode::Connecting { from, .. } = &self.mode else {
            return None;
        };
        if self.graph.node(target).is_none() {
            return None;
        }
        let from = from.clone();
        match self.graph.add_edge(&from, target) {
            Some(id) => {
                debug!("connected {} -> {} as {}", from, target, id);
                self.mode = Mode::EditingEdge {
                    edge: id.clone(),
                    draft: String::new(),
                };
                Some(id)
            }
            None => {
                self.mode = Mode::Idle;
                None
            }
        }
    }

    /// Click on empty surface: deselect and abandon a pending connection
    pub fn click_empty(&mut self) {
        self.selection = Selection::None;
        match self.mode {
            Mode::Connecting { .. } => self.mode = Mode::Idle,
            Mode::EditingNode { .. } | Mode::EditingEdge { .. } => {
                self.commit_label();
            }
            _ => {}
        }
    }

    pub fn select_edge(&mut self, id: &EdgeId) {
        if self.graph.edge(id).is_none() {
            return;
        }
        self.commit_label();
        self.selection = Selection::Edge(id.clone());
    }

    /// Press on a self-loop's stroke or arrowhead: select it and start rotating it
    pub fn press_loop(&mut self, id: &EdgeId) {
        if !self.graph.edge(id).is_some_and(|e| e.is_self_loop()) {
            return;
        }
        self.commit_label();
        self.selection = Selection::Edge(id.clone());
        self.mode = Mode::DraggingLoop(id.clone());
    }

    /// Secondary activation on a node flips its accepting flag
    pub fn toggle_accept(&mut self, id: &NodeId) {
        if self.graph.toggle_accept(id) {
            debug!("toggled accept on {}", id);
        }
    }

    // ------------------------------------------------------------------------
    // Label editing
    // ------------------------------------------------------------------------

    pub fn begin_edit_node(&mut self, id: &NodeId) {
        if self.graph.node(id).is_none() {
            return;
        }
        self.commit_label();
        // The commit above may have relabeled this very node
        let Some(node) = self.graph.node(id) else {
            return;
        };
        self.mode = Mode::EditingNode {
            node: id.clone(),
            draft: node.label.clone(),
        };
    }

    pub fn begin_edit_edge(&mut self, id: &EdgeId) {
        if self.graph.edge(id).is_none() {
            return;
        }
        self.commit_label();
        let Some(edge) = self.graph.edge(id) else {
            return;
        };
        self.mode = Mode::EditingEdge {
            edge: id.clone(),
            draft: edge.label.clone(),
        };
    }

    /// Write the draft into the entity being edited. Returns false when no edit was active.
    pub fn commit_label(&mut self) -> bool {
        match std::mem::take(&mut self.mode) {
            Mode::EditingNode { node, draft } => {
                debug!("label {} = {:?}", node, draft);
                self.graph.set_node_label(&node, draft);
                true
            }
            Mode::EditingEdge { edge, draft } => {
                debug!("label {} = {:?}", edge, draft);
                self.graph.set_edge_label(&edge, draft);
                true
            }
            other => {
                self.mode = other;
                false
            }
        }
    }

    // ------------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------------

    pub fn key(&mut self, key: Key) {
        match key {
            Key::Enter => {
                self.commit_label();
            }
            Key::Escape => {
                if self.is_editing() || matches!(self.mode, Mode::Connecting { .. }) {
                    self.mode = Mode::Idle;
                }
            }
            // While a label is being typed, Delete belongs to the text field
            Key::Delete if self.is_editing() => {}
            Key::Delete => self.delete_selection(),
        }
    }

    fn delete_selection(&mut self) {
        match std::mem::take(&mut self.selection) {
            Selection::Node(id) => {
                if self.graph.remove_node(&id).is_some() {
                    debug!("deleted node {}", id);
                }
            }
            Selection::Edge(id) => {
                if self.graph.remove_edge(&id).is_some() {
                    debug!("deleted edge {}", id);
                }
            }
            Selection::None => return,
        }
        self.drop_stale_mode();
    }

    fn drop_stale_mode(&mut self) {
        let stale = match &self.mode {
            Mode::Idle => false,
            Mode::Dragging(id) | Mode::Connecting { from: id, .. } => self.graph.node(id).is_none(),
            Mode::EditingNode { node, .. } => self.graph.node(node).is_none(),
            Mode::DraggingLoop(id) | Mode::EditingEdge { edge: id, .. } => {
                self.graph.edge(id).is_none()
            }
        };
        if stale {
            self.mode = Mode::Idle;
        }
    }
}
