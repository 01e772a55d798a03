//! Edge Geometry
//! Pure functions that turn node positions and per-edge parameters into drawable paths
//!
//! Everything here is recomputed from the graph on every frame, so none of it keeps state.
//! Angles follow the drawing surface: 0 points right and positive angles turn toward +y
//! (downward on screen), which makes -90° "straight up".

use crate::graph::{Edge, Node, Point};


/// Radius of the state circle; straight edges start and stop this far from the centers
pub const NODE_RADIUS: f32 = 30.0;
/// Perpendicular distance between a straight edge's midpoint and its label anchor
pub const LABEL_OFFSET: f32 = 15.0;
/// Loop direction used when an edge has no stored `loop_angle`
pub const DEFAULT_LOOP_ANGLE: f32 = -90.0;
/// Half-opening of a self-loop, in radians, on each side of the loop angle
pub const LOOP_SPREAD: f32 = 0.7;
/// Distance from the node center to both Bézier control points of a self-loop
pub const LOOP_CONTROL_RADIUS: f32 = 80.0;
/// Distance from the node center to a self-loop's label anchor (beyond the control points)
pub const LOOP_LABEL_RADIUS: f32 = 92.0;
pub const ARROW_SIZE: f32 = 10.0;
/// Width factor of the arrowhead triangle relative to its length
pub const ARROW_WIDTH: f32 = 0.4;
/// Pointer slack when picking strokes
pub const HIT_TOLERANCE: f32 = 6.0;

const CURVE_SAMPLES: usize = 24;

/// Drawable stroke of an edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgePath {
    /// Straight segment between two node boundaries
    Line { start: Point, end: Point },
    /// Cubic Bézier leaving and re-entering the node at the same boundary point
    Loop {
        start: Point,
        control1: Point,
        control2: Point,
        end: Point,
    },
}

impl EdgePath {
    pub fn start(&self) -> Point {
        match *self {
            EdgePath::Line { start, .. } | EdgePath::Loop { start, .. } => start,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            EdgePath::Line { end, .. } | EdgePath::Loop { end, .. } => end,
        }
    }

    /// Point at parameter `t` in `[0, 1]`
    pub fn eval(&self, t: f32) -> Point {
        match *self {
            EdgePath::Line { start, end } => start.lerp(end, t),
            EdgePath::Loop {
                start,
                control1,
                control2,
                end,
            } => {
                let mt = 1.0 - t;
                start
                    .scale(mt * mt * mt)
                    .add(control1.scale(3.0 * mt * mt * t))
                    .add(control2.scale(3.0 * mt * t * t))
                    .add(end.scale(t * t * t))
            }
        }
    }

    /// Polyline approximation. Lines yield their two endpoints.
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        match self {
            EdgePath::Line { start, end } => vec![*start, *end],
            EdgePath::Loop { .. } => {
                let segments = segments.max(1);
                (0..=segments)
                    .map(|i| self.eval(i as f32 / segments as f32))
                    .collect()
            }
        }
    }

    /// Shortest distance from `p` to the stroke
    pub fn distance_to(&self, p: Point) -> f32 {
        self.sample(CURVE_SAMPLES)
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f32::INFINITY, f32::min)
    }
}

/// Arrowhead glyph: `tip` is where it touches the target, `direction` the unit vector it points along
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrowhead {
    pub tip: Point,
    pub direction: Point,
}

impl Arrowhead {
    /// Triangle corners `[tip, left, right]` for an arrow `size` long
    pub fn points(&self, size: f32) -> [Point; 3] {
        let back = self.tip.sub(self.direction.scale(size));
        let side = self.direction.perp().scale(size * ARROW_WIDTH);
        [self.tip, back.add(side), back.sub(side)]
    }

    /// Center of the glyph, used for picking
    pub fn center(&self, size: f32) -> Point {
        self.tip.sub(self.direction.scale(size * 0.5))
    }
}

/// Everything the renderer needs to draw one edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeGeometry {
    pub path: EdgePath,
    pub label_anchor: Point,
    pub arrow: Arrowhead,
    pub is_loop: bool,
}

/// Geometry for `edge`, or `None` if one of its endpoints is not in `nodes`.
///
/// Parallel edges between the same pair of nodes get identical geometry; their labels overlap.
pub fn edge_geometry(edge: &Edge, nodes: &[Node]) -> Option<EdgeGeometry> {
    let from = nodes.iter().find(|n| n.id == edge.from)?;
    if edge.is_self_loop() {
        return Some(loop_geometry(from.position(), edge.loop_angle));
    }
    let to = nodes.iter().find(|n| n.id == edge.to)?;
    Some(line_geometry(from.position(), to.position()))
}

/// Straight edge between two centers, trimmed by [`NODE_RADIUS`] at both ends
pub fn line_geometry(from: Point, to: Point) -> EdgeGeometry {
    let Some(unit) = to.sub(from).normalized() else {
        // Coincident nodes
        return EdgeGeometry {
            path: EdgePath::Line {
                start: from,
                end: from,
            },
            label_anchor: from,
            arrow: Arrowhead {
                tip: from,
                direction: Point::ZERO,
            },
            is_loop: false,
        };
    };

    let start = from.add(unit.scale(NODE_RADIUS));
    let end = to.sub(unit.scale(NODE_RADIUS));
    let mid = start.lerp(end, 0.5);

    EdgeGeometry {
        path: EdgePath::Line { start, end },
        label_anchor: mid.add(unit.perp().scale(LABEL_OFFSET)),
        arrow: Arrowhead {
            tip: end,
            direction: unit,
        },
        is_loop: false,
    }
}

/// Self-loop on the node at `center`, opening toward `loop_angle` degrees
pub fn loop_geometry(center: Point, loop_angle: Option<f32>) -> EdgeGeometry {
    let angle = loop_angle.unwrap_or(DEFAULT_LOOP_ANGLE).to_radians();
    let dir = Point::from_angle(angle);
    let anchor = center.add(dir.scale(NODE_RADIUS));

    EdgeGeometry {
        path: EdgePath::Loop {
            start: anchor,
            control1: center.add(Point::from_angle(angle - LOOP_SPREAD).scale(LOOP_CONTROL_RADIUS)),
            control2: center.add(Point::from_angle(angle + LOOP_SPREAD).scale(LOOP_CONTROL_RADIUS)),
            end: anchor,
        },
        label_anchor: center.add(dir.scale(LOOP_LABEL_RADIUS)),
        arrow: Arrowhead {
            tip: anchor,
            direction: dir.scale(-1.0),
        },
        is_loop: true,
    }
}

/// Loop angle in degrees that points from `center` toward `pointer`
pub fn loop_angle_from_pointer(center: Point, pointer: Point) -> f32 {
    (pointer.y - center.y).atan2(pointer.x - center.x).to_degrees()
}

/// Rubber-band segment from the source node's boundary to the pointer
pub fn connect_preview(from: Point, pointer: Point) -> (Point, Point) {
    let delta = pointer.sub(from);
    match delta.normalized() {
        Some(unit) if delta.length() > NODE_RADIUS => (from.add(unit.scale(NODE_RADIUS)), pointer),
        _ => (from, from),
    }
}

// ============================================================================
// HIT TESTING
// ============================================================================

/// Topmost node (last in order) whose disc contains `p`
pub fn hit_node(nodes: &[Node], p: Point) -> Option<&Node> {
    nodes
        .iter()
        .rev()
        .find(|n| n.position().distance(p) <= NODE_RADIUS)
}

/// Nearest edge stroke within `tolerance` of `p`; later edges win ties
pub fn hit_edge<'a>(edges: &'a [Edge], nodes: &[Node], p: Point, tolerance: f32) -> Option<&'a Edge> {
    nearest(edges.iter(), nodes, p, tolerance, |geom, p| geom.path.distance_to(p))
}

/// Self-loop whose stroke or arrowhead is within `tolerance` of `p`
pub fn hit_loop_handle<'a>(
    edges: &'a [Edge],
    nodes: &[Node],
    p: Point,
    tolerance: f32,
) -> Option<&'a Edge> {
    nearest(
        edges.iter().filter(|e| e.is_self_loop()),
        nodes,
        p,
        tolerance,
        |geom, p| {
            let glyph = (geom.arrow.center(ARROW_SIZE).distance(p) - ARROW_SIZE * 0.5).max(0.0);
            geom.path.distance_to(p).min(glyph)
        },
    )
}

fn nearest<'a>(
    edges: impl DoubleEndedIterator<Item = &'a Edge>,
    nodes: &[Node],
    p: Point,
    tolerance: f32,
    distance: impl Fn(&EdgeGeometry, Point) -> f32,
) -> Option<&'a Edge> {
    let mut best: Option<(&Edge, f32)> = None;
    for edge in edges.rev() {
        let Some(geom) = edge_geometry(edge, nodes) else {
            continue;
        };
        let d = distance(&geom, p);
        if d <= tolerance && best.map_or(true, |(_, bd)| d < bd) {
            best = Some((edge, d));
        }
    }
    best.map(|(edge, _)| edge)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let ab = b.sub(a);
    let len_sq = ab.dot(ab);
    if len_sq < f32::EPSILON {
        return p.distance(a);
    }
    let t = (p.sub(a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a.add(ab.scale(t)))
}
