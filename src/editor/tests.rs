//! Unit tests for the interaction state machine

use crate::editor::{Editor, Key, Mode, Selection};
use crate::geometry::{hit_loop_handle, DEFAULT_LOOP_ANGLE, HIT_TOLERANCE};
use crate::graph::{EdgeId, Graph, NodeId, Point};

fn editor_with_nodes(points: &[(f32, f32)]) -> (Editor, Vec<NodeId>) {
    let mut graph = Graph::new();
    let ids = points
        .iter()
        .map(|&(x, y)| graph.add_node(Point::new(x, y)))
        .collect();
    (Editor::new(graph), ids)
}

/// Shift-press on `from`, move, release over `to`
fn connect(editor: &mut Editor, from: &NodeId, to: &NodeId) -> EdgeId {
    let start = editor.graph().node(from).unwrap().position();
    let end = editor.graph().node(to).unwrap().position();
    editor.press_node(from, start, true);
    editor.pointer_moved(end);
    editor.release(Some(to));
    match editor.mode() {
        Mode::EditingEdge { edge, .. } => edge.clone(),
        other => panic!("expected edge label editing, got {:?}", other),
    }
}

#[test]
fn test_create_node_enters_label_edit() {
    let mut editor = Editor::default();
    let id = editor.create_node(Point::new(50.0, 60.0)).unwrap();

    let node = editor.graph().node(&id).unwrap();
    assert_eq!(node.position(), Point::new(50.0, 60.0));
    assert_eq!(node.label, "");
    assert!(!node.accept);
    assert_eq!(
        editor.mode(),
        &Mode::EditingNode {
            node: id,
            draft: String::new()
        }
    );
}

#[test]
fn test_create_node_on_existing_node_is_ignored() {
    let (mut editor, _) = editor_with_nodes(&[(100.0, 100.0)]);
    assert!(editor.create_node(Point::new(110.0, 95.0)).is_none());
    assert_eq!(editor.graph().nodes().len(), 1);
    assert_eq!(editor.mode(), &Mode::Idle);
}

#[test]
fn test_drag_moves_node_until_release() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0)]);
    editor.press_node(&ids[0], Point::ZERO, false);
    assert_eq!(editor.selection(), &Selection::Node(ids[0].clone()));
    assert_eq!(editor.mode(), &Mode::Dragging(ids[0].clone()));

    editor.pointer_moved(Point::new(40.0, 25.0));
    editor.pointer_moved(Point::new(80.0, -10.0));
    assert_eq!(editor.graph().node(&ids[0]).unwrap().position(), Point::new(80.0, -10.0));

    editor.release(None);
    assert_eq!(editor.mode(), &Mode::Idle);
    editor.pointer_moved(Point::new(500.0, 500.0));
    assert_eq!(editor.graph().node(&ids[0]).unwrap().position(), Point::new(80.0, -10.0));
}

#[test]
fn test_connect_two_nodes() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (200.0, 0.0)]);
    editor.press_node(&ids[0], Point::ZERO, true);
    assert!(matches!(editor.mode(), Mode::Connecting { .. }));

    editor.pointer_moved(Point::new(120.0, 10.0));
    let (start, end) = editor.preview_line().unwrap();
    assert_eq!(end, Point::new(120.0, 10.0));
    assert!(start.distance(Point::ZERO) > 0.0);

    // Releasing over empty space keeps the connection pending
    editor.release(None);
    assert!(matches!(editor.mode(), Mode::Connecting { .. }));
    assert!(editor.graph().edges().is_empty());

    editor.release(Some(&ids[1]));
    let edge = &editor.graph().edges()[0];
    assert_eq!(edge.from, ids[0]);
    assert_eq!(edge.to, ids[1]);
    assert_eq!(edge.label, "");
    assert_eq!(
        editor.mode(),
        &Mode::EditingEdge {
            edge: edge.id.clone(),
            draft: String::new()
        }
    );
    assert!(editor.preview_line().is_none());
}

#[test]
fn test_connect_same_node_makes_self_loop() {
    let (mut editor, ids) = editor_with_nodes(&[(100.0, 100.0)]);
    editor.press_node(&ids[0], Point::new(100.0, 100.0), true);
    editor.release(Some(&ids[0]));

    let edge = &editor.graph().edges()[0];
    assert!(edge.is_self_loop());
    assert_eq!(edge.from, ids[0]);
    assert_eq!(edge.loop_angle, None);

    let geom = crate::geometry::edge_geometry(edge, editor.graph().nodes()).unwrap();
    let expected = crate::geometry::loop_geometry(Point::new(100.0, 100.0), Some(DEFAULT_LOOP_ANGLE));
    assert_eq!(geom, expected);
}

#[test]
fn test_press_node_while_connecting_completes() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (200.0, 0.0)]);
    editor.press_node(&ids[0], Point::ZERO, true);
    editor.press_node(&ids[1], Point::new(200.0, 0.0), false);

    assert_eq!(editor.graph().edges().len(), 1);
    assert!(matches!(editor.mode(), Mode::EditingEdge { .. }));
}

#[test]
fn test_click_empty_cancels_connection_and_selection() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (200.0, 0.0)]);
    editor.press_node(&ids[0], Point::ZERO, true);
    editor.click_empty();

    assert_eq!(editor.mode(), &Mode::Idle);
    assert_eq!(editor.selection(), &Selection::None);
    editor.release(Some(&ids[1]));
    assert!(editor.graph().edges().is_empty());
}

#[test]
fn test_select_edge_replaces_node_selection() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (200.0, 0.0)]);
    let edge = connect(&mut editor, &ids[0], &ids[1]);
    editor.commit_label();
    assert_eq!(editor.selection(), &Selection::Node(ids[0].clone()));

    editor.select_edge(&edge);
    assert_eq!(editor.selection(), &Selection::Edge(edge.clone()));

    editor.press_node(&ids[1], Point::new(200.0, 0.0), false);
    assert_eq!(editor.selection(), &Selection::Node(ids[1].clone()));
}

#[test]
fn test_edit_and_commit_node_label() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0)]);
    editor.graph.set_node_label(&ids[0], "q_0");

    editor.begin_edit_node(&ids[0]);
    assert_eq!(editor.mode().draft(), Some("q_0"));

    editor.draft_mut().unwrap().push_str("'");
    editor.key(Key::Enter);

    assert_eq!(editor.graph().node(&ids[0]).unwrap().label, "q_0'");
    assert_eq!(editor.mode(), &Mode::Idle);
    assert!(editor.draft_mut().is_none());
}

#[test]
fn test_commit_edge_label_on_defocus() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (200.0, 0.0)]);
    let edge = connect(&mut editor, &ids[0], &ids[1]);
    *editor.draft_mut().unwrap() = "a, b".to_string();

    assert!(editor.commit_label());
    assert_eq!(editor.graph().edge(&edge).unwrap().label, "a, b");
    assert!(!editor.commit_label());
}

#[test]
fn test_new_gesture_commits_pending_edit() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (200.0, 0.0)]);
    editor.begin_edit_node(&ids[0]);
    *editor.draft_mut().unwrap() = "start".to_string();

    editor.press_node(&ids[1], Point::new(200.0, 0.0), false);
    assert_eq!(editor.graph().node(&ids[0]).unwrap().label, "start");
    assert_eq!(editor.mode(), &Mode::Dragging(ids[1].clone()));
}

#[test]
fn test_escape_abandons_edge_edit() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (200.0, 0.0)]);
    let edge = connect(&mut editor, &ids[0], &ids[1]);
    *editor.draft_mut().unwrap() = "keep".to_string();
    editor.commit_label();

    editor.begin_edit_edge(&edge);
    *editor.draft_mut().unwrap() = "x".to_string();
    editor.key(Key::Escape);

    assert_eq!(editor.graph().edge(&edge).unwrap().label, "keep");
    assert_eq!(editor.mode(), &Mode::Idle);
    assert!(editor.mode().draft().is_none());
}

#[test]
fn test_escape_cancels_connection() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0)]);
    editor.press_node(&ids[0], Point::ZERO, true);
    editor.key(Key::Escape);
    assert_eq!(editor.mode(), &Mode::Idle);
    assert!(editor.preview_line().is_none());
    assert!(editor.graph().edges().is_empty());
}

#[test]
fn test_toggle_accept_changes_nothing_else() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (100.0, 0.0)]);
    editor.press_node(&ids[1], Point::new(100.0, 0.0), false);
    editor.release(None);
    let selection = editor.selection().clone();

    editor.toggle_accept(&ids[0]);
    assert!(editor.graph().node(&ids[0]).unwrap().accept);
    assert!(!editor.graph().node(&ids[1]).unwrap().accept);
    assert_eq!(editor.selection(), &selection);
    assert_eq!(editor.mode(), &Mode::Idle);

    editor.toggle_accept(&ids[0]);
    assert!(!editor.graph().node(&ids[0]).unwrap().accept);
}

#[test]
fn test_loop_drag_sets_angle() {
    let (mut editor, ids) = editor_with_nodes(&[(100.0, 100.0), (300.0, 100.0)]);
    let looped = connect(&mut editor, &ids[0], &ids[0]);
    let straight = connect(&mut editor, &ids[0], &ids[1]);
    editor.commit_label();

    // Only self-loops can be angle-dragged
    editor.press_loop(&straight);
    assert_eq!(editor.mode(), &Mode::Idle);

    editor.press_loop(&looped);
    assert_eq!(editor.mode(), &Mode::DraggingLoop(looped.clone()));
    editor.pointer_moved(Point::new(200.0, 100.0));
    let angle = editor.graph().edge(&looped).unwrap().loop_angle.unwrap();
    assert!(angle.abs() < 1e-4);

    editor.pointer_moved(Point::new(100.0, 150.0));
    let angle = editor.graph().edge(&looped).unwrap().loop_angle.unwrap();
    assert!((angle - 90.0).abs() < 1e-4);

    editor.release(None);
    assert_eq!(editor.mode(), &Mode::Idle);
    // The node itself never moved
    assert_eq!(editor.graph().node(&ids[0]).unwrap().position(), Point::new(100.0, 100.0));
}

#[test]
fn test_pressed_loop_is_selected_and_deletable() {
    let (mut editor, ids) = editor_with_nodes(&[(100.0, 100.0), (300.0, 100.0)]);
    let looped = connect(&mut editor, &ids[0], &ids[0]);
    let straight = connect(&mut editor, &ids[0], &ids[1]);
    editor.commit_label();

    let on_stroke = editor
        .geometries()
        .into_iter()
        .find(|(e, _)| e.id == looped)
        .map(|(_, geom)| geom.path.eval(0.5))
        .unwrap();
    let graph = editor.graph();
    let hit = hit_loop_handle(graph.edges(), graph.nodes(), on_stroke, HIT_TOLERANCE)
        .map(|e| e.id.clone());
    assert_eq!(hit.as_ref(), Some(&looped));

    editor.press_loop(&looped);
    assert_eq!(editor.selection(), &Selection::Edge(looped.clone()));
    editor.release(None);
    editor.key(Key::Delete);

    assert!(editor.graph().edge(&looped).is_none());
    assert!(editor.graph().edge(&straight).is_some());
    assert_eq!(editor.graph().nodes().len(), 2);
    assert_eq!(editor.selection(), &Selection::None);
    assert_eq!(editor.mode(), &Mode::Idle);
}

#[test]
fn test_delete_selected_node_cascades() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (100.0, 0.0), (0.0, 100.0)]);
    connect(&mut editor, &ids[0], &ids[1]);
    connect(&mut editor, &ids[2], &ids[0]);
    let survivor = connect(&mut editor, &ids[1], &ids[2]);
    editor.commit_label();

    editor.press_node(&ids[0], Point::ZERO, false);
    editor.release(None);
    editor.key(Key::Delete);

    assert!(editor.graph().node(&ids[0]).is_none());
    assert_eq!(editor.graph().edges().len(), 1);
    assert_eq!(editor.graph().edges()[0].id, survivor);
    assert_eq!(editor.selection(), &Selection::None);
}

#[test]
fn test_delete_selected_edge() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (100.0, 0.0)]);
    let edge = connect(&mut editor, &ids[0], &ids[1]);
    editor.commit_label();
    editor.select_edge(&edge);
    editor.key(Key::Delete);

    assert!(editor.graph().edges().is_empty());
    assert_eq!(editor.graph().nodes().len(), 2);
    assert_eq!(editor.selection(), &Selection::None);
}

#[test]
fn test_delete_ignored_while_typing() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0)]);
    editor.press_node(&ids[0], Point::ZERO, false);
    editor.release(None);
    editor.begin_edit_node(&ids[0]);
    editor.key(Key::Delete);

    assert!(editor.graph().node(&ids[0]).is_some());
    assert!(editor.is_editing());
}

#[test]
fn test_malformed_input_is_a_noop() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0)]);
    let before = editor.graph().clone();
    let ghost = NodeId::from("node_77");
    let ghost_edge = EdgeId::from("edge_77");

    editor.key(Key::Enter);
    editor.key(Key::Delete);
    editor.key(Key::Escape);
    editor.release(Some(&ids[0]));
    editor.press_node(&ghost, Point::ZERO, false);
    editor.press_loop(&ghost_edge);
    editor.select_edge(&ghost_edge);
    editor.begin_edit_node(&ghost);
    editor.begin_edit_edge(&ghost_edge);
    editor.toggle_accept(&ghost);
    assert!(editor.complete_connection(&ids[0]).is_none());

    assert_eq!(editor.graph(), &before);
    assert_eq!(editor.mode(), &Mode::Idle);
    assert_eq!(editor.selection(), &Selection::None);
}

#[test]
fn test_drag_of_deleted_node_degrades_to_noop() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (100.0, 0.0)]);
    editor.press_node(&ids[0], Point::ZERO, false);
    editor.graph.remove_node(&ids[0]);

    editor.pointer_moved(Point::new(30.0, 30.0));
    editor.release(None);
    assert_eq!(editor.graph().nodes().len(), 1);
    assert_eq!(editor.graph().nodes()[0].position(), Point::new(100.0, 0.0));
}

#[test]
fn test_replace_graph_resets_transient_state() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0)]);
    editor.press_node(&ids[0], Point::ZERO, true);
    editor.replace_graph(Graph::new());
    assert_eq!(editor.mode(), &Mode::Idle);
    assert_eq!(editor.selection(), &Selection::None);
    assert!(editor.graph().is_empty());
}

#[test]
fn test_geometries_follow_edge_order() {
    let (mut editor, ids) = editor_with_nodes(&[(0.0, 0.0), (100.0, 0.0)]);
    let e1 = connect(&mut editor, &ids[0], &ids[1]);
    let e2 = connect(&mut editor, &ids[1], &ids[1]);
    editor.commit_label();

    let geoms = editor.geometries();
    assert_eq!(geoms.len(), 2);
    assert_eq!(geoms[0].0.id, e1);
    assert!(!geoms[0].1.is_loop);
    assert_eq!(geoms[1].0.id, e2);
    assert!(geoms[1].1.is_loop);
}
