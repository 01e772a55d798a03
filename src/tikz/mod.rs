//! TikZ Code Generator
//! Renders an automaton graph as a `tikzpicture` using the `automata` library
//!
//! Output is a pure function of its inputs: the export window calls [`generate`] again
//! whenever a parameter changes, and identical inputs must give byte-identical text.

use std::fmt::Write;

use log::info;
use serde::{Deserialize, Serialize};

use crate::graph::{Edge, Node, NodeId};


/// Output for a graph without states
pub const EMPTY_PLACEHOLDER: &str = "% No states to export\n";

/// Author-tunable layout of the exported picture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportParams {
    /// Mark the first state as initial
    pub mark_initial: bool,
    /// Width (cm) the drawing is scaled to fit into
    pub max_width: f64,
    /// Height (cm) the drawing is scaled to fit into
    pub max_height: f64,
    /// `node distance` in cm
    pub node_spacing: f64,
    /// `shorten >` in pt
    pub arrow_shorten: f64,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            mark_initial: true,
            max_width: 12.0,
            max_height: 8.0,
            node_spacing: 2.0,
            arrow_shorten: 1.0,
        }
    }
}

struct Bounds {
    min_x: f64,
    min_y: f64,
    scale: f64,
}

impl Bounds {
    fn fit(nodes: &[Node], params: &ExportParams) -> Self {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for node in nodes {
            let (x, y) = (f64::from(node.x), f64::from(node.y));
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        let axis_scale = |limit: f64, extent: f64| if extent > 0.0 { limit / extent } else { 1.0 };
        let scale_x = axis_scale(params.max_width, max_x - min_x);
        let scale_y = axis_scale(params.max_height, max_y - min_y);

        Self {
            min_x,
            min_y,
            scale: scale_x.min(scale_y),
        }
    }

    /// Surface position to picture coordinates (y flipped: TikZ grows upward)
    fn project(&self, node: &Node) -> (f64, f64) {
        (
            (f64::from(node.x) - self.min_x) * self.scale,
            -(f64::from(node.y) - self.min_y) * self.scale,
        )
    }
}

/// Generate the TikZ block for `nodes` and `edges`.
///
/// Edges are grouped by source node in order of first appearance; edges whose endpoints
/// are not in `nodes` are skipped.
pub fn generate(nodes: &[Node], edges: &[Edge], params: &ExportParams) -> String {
    if nodes.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }

    let bounds = Bounds::fit(nodes, params);
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(
        out,
        "\\begin{{tikzpicture}}[shorten >={}pt, node distance={}cm, on grid, auto]",
        params.arrow_shorten, params.node_spacing
    );

    for (index, node) in nodes.iter().enumerate() {
        let mut markers = vec!["state"];
        if index == 0 && params.mark_initial {
            markers.push("initial");
        }
        if node.accept {
            markers.push("accepting");
        }
        let (x, y) = bounds.project(node);
        let _ = writeln!(
            out,
            "  \\node[{}] ({}) at ({}, {}) {};",
            markers.join(", "),
            node.id,
            coord(x),
            coord(y),
            math_label(&node.label)
        );
    }

    let groups = group_by_source(nodes, edges);
    if !groups.is_empty() {
        out.push('\n');
        out.push_str("  \\path[->]");
        for (source, outgoing) in &groups {
            let head = format!("    ({}) ", source.id);
            let indent = " ".repeat(head.len());
            for (i, edge) in outgoing.iter().enumerate() {
                out.push('\n');
                out.push_str(if i == 0 { &head } else { &indent });
                out.push_str(&edge_clause(source, edge, nodes));
            }
        }
        out.push_str(";\n");
    }

    out.push_str("\\end{tikzpicture}\n");
    out
}

fn group_by_source<'a>(nodes: &'a [Node], edges: &'a [Edge]) -> Vec<(&'a Node, Vec<&'a Edge>)> {
    let find = |id: &NodeId| nodes.iter().find(|n| &n.id == id);
    let mut groups: Vec<(&Node, Vec<&Edge>)> = Vec::new();

    for edge in edges {
        let (Some(source), Some(_)) = (find(&edge.from), find(&edge.to)) else {
            continue;
        };
        match groups.iter_mut().find(|(n, _)| n.id == source.id) {
            Some((_, list)) => list.push(edge),
            None => groups.push((source, vec![edge])),
        }
    }

    groups
}

fn edge_clause(source: &Node, edge: &Edge, nodes: &[Node]) -> String {
    let label = math_label(&edge.label);
    if edge.is_self_loop() {
        return format!("edge [loop above] node {} ()", label);
    }

    let target = nodes.iter().find(|n| n.id == edge.to);
    // Target lower on screen than the source: put the label on the other side
    let swap = target.is_some_and(|t| t.y > source.y);
    if swap {
        format!("edge [swap] node {} ({})", label, edge.to)
    } else {
        format!("edge node {} ({})", label, edge.to)
    }
}

fn math_label(label: &str) -> String {
    if label.is_empty() {
        "{}".to_string()
    } else {
        format!("{{${}$}}", label)
    }
}

/// Two-decimal coordinate. A y of zero flips to `-0.00`; it is printed as `0.00` instead.
fn coord(value: f64) -> String {
    let text = format!("{:.2}", value);
    if text == "-0.00" {
        "0.00".to_string()
    } else {
        text
    }
}

// ============================================================================
// EXPORT PREVIEW
// ============================================================================

/// Live export view: open while `text` is present, regenerated when parameters change
#[derive(Debug, Clone, Default)]
pub struct ExportPreview {
    params: ExportParams,
    text: Option<String>,
}

impl ExportPreview {
    pub fn new(params: ExportParams) -> Self {
        Self { params, text: None }
    }

    pub fn params(&self) -> &ExportParams {
        &self.params
    }

    pub fn is_open(&self) -> bool {
        self.text.is_some()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Open (or refresh) the preview from the current graph
    pub fn request(&mut self, nodes: &[Node], edges: &[Edge]) -> &str {
        info!(
            "exporting {} states, {} transitions",
            nodes.len(),
            edges.len()
        );
        self.text.insert(generate(nodes, edges, &self.params))
    }

    /// Store new parameters; an open preview is regenerated right away
    pub fn set_params(&mut self, params: ExportParams, nodes: &[Node], edges: &[Edge]) {
        if params == self.params {
            return;
        }
        self.params = params;
        if self.is_open() {
            self.text = Some(generate(nodes, edges, &self.params));
        }
    }

    /// Regenerate an open preview after the graph changed; a closed one stays closed
    pub fn refresh(&mut self, nodes: &[Node], edges: &[Edge]) {
        if self.is_open() {
            self.text = Some(generate(nodes, edges, &self.params));
        }
    }

    pub fn dismiss(&mut self) {
        self.text = None;
    }
}
