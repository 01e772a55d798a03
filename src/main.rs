//! statedraw - Automaton sketchpad
//! Draw states and transitions, then export them as TikZ

use std::path::Path;

use anyhow::Context;
use eframe::egui;
use log::{info, warn};

use statedraw::editor::{Editor, Key, Mode, Selection};
use statedraw::geometry::{self, Arrowhead, EdgeGeometry, EdgePath, ARROW_SIZE, HIT_TOLERANCE, NODE_RADIUS};
use statedraw::graph::{EdgeId, Graph, Node, NodeId, Point};
use statedraw::tikz::{ExportParams, ExportPreview};

/// Storage keys
const GRAPH_KEY: &str = "statedraw_graph";
const EXPORT_KEY: &str = "statedraw_export";

const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(25, 28, 32);
const STATE_FILL: egui::Color32 = egui::Color32::from_rgb(40, 55, 75);
const STATE_STROKE: egui::Color32 = egui::Color32::from_rgb(100, 120, 145);
const EDGE_COLOR: egui::Color32 = egui::Color32::from_rgb(150, 160, 180);
const LABEL_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 230, 120);
const SELECTED_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 220, 120);
const INITIAL_COLOR: egui::Color32 = egui::Color32::from_rgb(100, 220, 100);

fn main() -> eframe::Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("statedraw - Automaton Sketchpad"),
        ..Default::default()
    };

    eframe::run_native(
        "statedraw",
        options,
        Box::new(|cc| Ok(Box::new(StatedrawApp::new(cc)))),
    )
}

/// Maps between window coordinates and drawing-surface coordinates (origin top-left)
#[derive(Clone, Copy)]
struct Surface {
    origin: egui::Pos2,
}

impl Surface {
    fn to_local(self, pos: egui::Pos2) -> Point {
        Point::new(pos.x - self.origin.x, pos.y - self.origin.y)
    }

    fn to_screen(self, p: Point) -> egui::Pos2 {
        egui::pos2(self.origin.x + p.x, self.origin.y + p.y)
    }
}

/// What lies under the pointer, in picking priority order
enum Hit {
    Node(NodeId),
    Loop(EdgeId),
    Edge(EdgeId),
    Empty,
}

fn hit_test(graph: &Graph, p: Point) -> Hit {
    if let Some(node) = geometry::hit_node(graph.nodes(), p) {
        return Hit::Node(node.id.clone());
    }
    if let Some(edge) = geometry::hit_loop_handle(graph.edges(), graph.nodes(), p, HIT_TOLERANCE) {
        return Hit::Loop(edge.id.clone());
    }
    if let Some(edge) = geometry::hit_edge(graph.edges(), graph.nodes(), p, HIT_TOLERANCE) {
        return Hit::Edge(edge.id.clone());
    }
    Hit::Empty
}

struct StatedrawApp {
    editor: Editor,
    /// TikZ export window (open while it holds text)
    export: ExportPreview,
    /// Entity whose label field has already been given keyboard focus
    focused_label: Option<String>,
    /// Last load/save problem, shown in the info bar
    error_message: Option<String>,
}

impl StatedrawApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut error_message = None;
        let graph = match cc.storage.and_then(|s| s.get_string(GRAPH_KEY)) {
            Some(json) => match Graph::from_json(&json) {
                Ok(graph) => {
                    info!(
                        "restored {} states, {} transitions",
                        graph.nodes().len(),
                        graph.edges().len()
                    );
                    graph
                }
                Err(err) => {
                    warn!("discarding stored graph: {}", err);
                    error_message = Some(format!("Stored graph discarded: {}", err));
                    Graph::new()
                }
            },
            None => Graph::new(),
        };

        let params: ExportParams = cc
            .storage
            .and_then(|s| s.get_string(EXPORT_KEY))
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        Self {
            editor: Editor::new(graph),
            export: ExportPreview::new(params),
            focused_label: None,
            error_message,
        }
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    fn open_graph(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("statedraw graph", &["json"])
            .pick_file()
        else {
            return;
        };
        match load_graph_file(&path) {
            Ok(graph) => {
                info!("opened {}", path.display());
                self.editor.replace_graph(graph);
                self.export.dismiss();
                self.error_message = None;
            }
            Err(err) => {
                warn!("{:#}", err);
                self.error_message = Some(format!("{:#}", err));
            }
        }
    }

    fn save_graph(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("statedraw graph", &["json"])
            .set_file_name("automaton.json")
            .save_file()
        else {
            return;
        };
        let result = self
            .editor
            .graph()
            .to_json()
            .map_err(anyhow::Error::from)
            .and_then(|json| {
                std::fs::write(&path, json)
                    .with_context(|| format!("Could not write '{}'", path.display()))
            });
        self.report(result, &path);
    }

    fn save_tikz(&mut self) {
        let Some(code) = self.export.text().map(str::to_string) else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("TeX", &["tex"])
            .set_file_name("automaton.tex")
            .save_file()
        else {
            return;
        };
        let result = std::fs::write(&path, code)
            .with_context(|| format!("Could not write '{}'", path.display()));
        self.report(result, &path);
    }

    fn report(&mut self, result: anyhow::Result<()>, path: &Path) {
        match result {
            Ok(()) => {
                info!("saved {}", path.display());
                self.error_message = None;
            }
            Err(err) => {
                warn!("{:#}", err);
                self.error_message = Some(format!("{:#}", err));
            }
        }
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (enter, escape, delete) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Enter),
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::Delete),
            )
        });
        // Before the label field is drawn, so Escape never reaches it as a defocus-commit
        if escape {
            self.editor.key(Key::Escape);
        }
        if enter {
            self.editor.key(Key::Enter);
        }
        if delete && !ctx.wants_keyboard_input() {
            self.editor.key(Key::Delete);
        }
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, response: &egui::Response, surface: Surface) {
        let (pos, pressed, released, shift) = ctx.input(|i| {
            (
                i.pointer.latest_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.modifiers.shift,
            )
        });
        let Some(p) = pos.map(|pos| surface.to_local(pos)) else {
            return;
        };

        if pressed && response.hovered() {
            self.focused_label = None;
            match hit_test(self.editor.graph(), p) {
                Hit::Node(id) => self.editor.press_node(&id, p, shift),
                Hit::Loop(id) => self.editor.press_loop(&id),
                Hit::Edge(id) => self.editor.select_edge(&id),
                Hit::Empty => self.editor.click_empty(),
            }
        }

        self.editor.pointer_moved(p);

        if released {
            let over = match hit_test(self.editor.graph(), p) {
                Hit::Node(id) => Some(id),
                _ => None,
            };
            self.editor.release(over.as_ref());
        }

        if response.double_clicked() {
            self.focused_label = None;
            match hit_test(self.editor.graph(), p) {
                Hit::Node(id) => self.editor.begin_edit_node(&id),
                Hit::Loop(id) | Hit::Edge(id) => self.editor.begin_edit_edge(&id),
                Hit::Empty => {
                    self.editor.create_node(p);
                }
            }
        }

        if response.secondary_clicked() {
            if let Hit::Node(id) = hit_test(self.editor.graph(), p) {
                self.editor.toggle_accept(&id);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Label editor
    // ------------------------------------------------------------------------

    /// Key and surface position of the entity whose label is being edited
    fn editing_anchor(&self) -> Option<(String, Point)> {
        let graph = self.editor.graph();
        match self.editor.mode() {
            Mode::EditingNode { node, .. } => {
                let n = graph.node(node)?;
                Some((node.to_string(), n.position()))
            }
            Mode::EditingEdge { edge, .. } => {
                let e = graph.edge(edge)?;
                let geom = geometry::edge_geometry(e, graph.nodes())?;
                Some((edge.to_string(), geom.label_anchor))
            }
            _ => None,
        }
    }

    fn show_label_editor(&mut self, ctx: &egui::Context, surface: Surface) {
        let Some((key, anchor)) = self.editing_anchor() else {
            self.focused_label = None;
            return;
        };
        let needs_focus = self.focused_label.as_deref() != Some(key.as_str());
        let pos = surface.to_screen(anchor) - egui::vec2(64.0, 14.0);

        let mut commit = false;
        if let Some(draft) = self.editor.draft_mut() {
            egui::Area::new(egui::Id::new("label_editor"))
                .fixed_pos(pos)
                .order(egui::Order::Foreground)
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        let response = ui.add(
                            egui::TextEdit::singleline(draft)
                                .desired_width(120.0)
                                .hint_text("label (TeX math)"),
                        );
                        if needs_focus {
                            response.request_focus();
                        }
                        if response.lost_focus() {
                            commit = true;
                        }
                    });
                });
        }
        self.focused_label = Some(key);

        if commit {
            self.editor.commit_label();
        }
    }

    // ------------------------------------------------------------------------
    // Export window
    // ------------------------------------------------------------------------

    fn show_export_window(&mut self, ctx: &egui::Context) {
        if !self.export.is_open() {
            return;
        }
        let graph = self.editor.graph();
        self.export.refresh(graph.nodes(), graph.edges());

        let mut open = true;
        let mut params = *self.export.params();
        let mut copy = false;
        let mut save = false;
        let export = &self.export;

        egui::Window::new("Export TikZ")
            .open(&mut open)
            .default_width(560.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.checkbox(&mut params.mark_initial, "Mark first state initial");
                });
                ui.horizontal(|ui| {
                    ui.add(
                        egui::DragValue::new(&mut params.max_width)
                            .speed(0.1)
                            .range(1.0..=100.0)
                            .prefix("max width ")
                            .suffix(" cm"),
                    );
                    ui.add(
                        egui::DragValue::new(&mut params.max_height)
                            .speed(0.1)
                            .range(1.0..=100.0)
                            .prefix("max height ")
                            .suffix(" cm"),
                    );
                });
                ui.horizontal(|ui| {
                    ui.add(
                        egui::DragValue::new(&mut params.node_spacing)
                            .speed(0.1)
                            .range(0.5..=20.0)
                            .prefix("node distance ")
                            .suffix(" cm"),
                    );
                    ui.add(
                        egui::DragValue::new(&mut params.arrow_shorten)
                            .speed(0.1)
                            .range(0.0..=10.0)
                            .prefix("shorten ")
                            .suffix(" pt"),
                    );
                });
                ui.separator();

                let mut code = export.text().unwrap_or_default();
                egui::ScrollArea::vertical().max_height(360.0).show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut code)
                            .code_editor()
                            .desired_width(f32::INFINITY),
                    );
                });

                ui.horizontal(|ui| {
                    if ui.button("📋 Copy").clicked() {
                        copy = true;
                    }
                    if ui.button("💾 Save...").clicked() {
                        save = true;
                    }
                });
            });

        let graph = self.editor.graph();
        self.export.set_params(params, graph.nodes(), graph.edges());

        if copy {
            if let Some(code) = self.export.text() {
                ctx.copy_text(code.to_string());
            }
        }
        if save {
            self.save_tikz();
        }
        if !open {
            self.export.dismiss();
        }
    }

    // ------------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------------

    fn draw_graph(&self, painter: &egui::Painter, surface: Surface) {
        let graph = self.editor.graph();
        let selection = self.editor.selection();
        let editing_edge = match self.editor.mode() {
            Mode::EditingEdge { edge, .. } => Some(edge),
            _ => None,
        };

        for (edge, geom) in self.editor.geometries() {
            let selected = matches!(selection, Selection::Edge(id) if id == &edge.id);
            let color = if selected { SELECTED_COLOR } else { EDGE_COLOR };
            draw_edge(painter, surface, &geom, color);
            if !edge.label.is_empty() && editing_edge != Some(&edge.id) {
                draw_label(painter, surface.to_screen(geom.label_anchor), &edge.label);
            }
        }

        if let Some((start, end)) = self.editor.preview_line() {
            painter.extend(egui::Shape::dashed_line(
                &[surface.to_screen(start), surface.to_screen(end)],
                egui::Stroke::new(1.5, SELECTED_COLOR),
                6.0,
                4.0,
            ));
        }

        let mark_initial = self.export.params().mark_initial;
        for (index, node) in graph.nodes().iter().enumerate() {
            let selected = matches!(selection, Selection::Node(id) if id == &node.id);
            draw_state(
                painter,
                surface.to_screen(node.position()),
                node,
                index == 0 && mark_initial,
                selected,
            );
        }
    }
}

fn load_graph_file(path: &Path) -> anyhow::Result<Graph> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read '{}'", path.display()))?;
    Graph::from_json(&json).with_context(|| format!("Could not open '{}'", path.display()))
}

impl eframe::App for StatedrawApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("New").clicked() {
                        self.editor.replace_graph(Graph::new());
                        self.export.dismiss();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("📂 Open...").clicked() {
                        self.open_graph();
                        ui.close_menu();
                    }
                    if ui.button("💾 Save...").clicked() {
                        self.save_graph();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("📤 Export TikZ...").clicked() {
                        let graph = self.editor.graph();
                        self.export.request(graph.nodes(), graph.edges());
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        // Bottom panel: hints and status
        egui::TopBottomPanel::bottom("info_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(concat!("statedraw v", env!("CARGO_PKG_VERSION")));
                ui.separator();
                ui.label(
                    "Double-click: new state / rename | Shift+drag: connect | \
                     Right-click: accepting | Del: delete | Esc: cancel",
                );
                ui.separator();
                let graph = self.editor.graph();
                ui.label(format!(
                    "{} states, {} transitions",
                    graph.nodes().len(),
                    graph.edges().len()
                ));
                if let Some(err) = &self.error_message {
                    ui.separator();
                    ui.colored_label(egui::Color32::from_rgb(230, 110, 110), err);
                }
            });
        });

        let mut surface = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let canvas = Surface { origin: rect.min };
            surface = Some(canvas);

            self.handle_pointer(ctx, &response, canvas);

            painter.rect_filled(rect, 0.0, BACKGROUND);
            draw_grid(&painter, rect);
            self.draw_graph(&painter, canvas);

            if self.editor.graph().is_empty() {
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Double-click anywhere to add a state",
                    egui::FontId::proportional(18.0),
                    egui::Color32::GRAY,
                );
            }
        });

        if let Some(surface) = surface {
            self.show_label_editor(ctx, surface);
        }
        self.show_export_window(ctx);
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.editor.graph().to_json() {
            Ok(json) => storage.set_string(GRAPH_KEY, json),
            Err(err) => warn!("could not serialize graph: {}", err),
        }
        match serde_json::to_string(self.export.params()) {
            Ok(json) => storage.set_string(EXPORT_KEY, json),
            Err(err) => warn!("could not serialize export settings: {}", err),
        }
    }
}

fn draw_grid(painter: &egui::Painter, rect: egui::Rect) {
    let grid_size = 50.0;
    let grid_color = egui::Color32::from_rgba_unmultiplied(100, 100, 100, 30);

    let mut x = rect.left() + grid_size;
    while x < rect.right() {
        painter.line_segment(
            [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
            egui::Stroke::new(1.0, grid_color),
        );
        x += grid_size;
    }

    let mut y = rect.top() + grid_size;
    while y < rect.bottom() {
        painter.line_segment(
            [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)],
            egui::Stroke::new(1.0, grid_color),
        );
        y += grid_size;
    }
}

fn draw_arrowhead(painter: &egui::Painter, surface: Surface, arrow: &Arrowhead, color: egui::Color32) {
    let points = arrow
        .points(ARROW_SIZE)
        .iter()
        .map(|p| surface.to_screen(*p))
        .collect();
    painter.add(egui::Shape::convex_polygon(points, color, egui::Stroke::NONE));
}

fn draw_edge(painter: &egui::Painter, surface: Surface, geom: &EdgeGeometry, color: egui::Color32) {
    let stroke = egui::Stroke::new(1.5, color);

    match geom.path {
        EdgePath::Line { start, end } => {
            painter.line_segment([surface.to_screen(start), surface.to_screen(end)], stroke);
        }
        EdgePath::Loop {
            start,
            control1,
            control2,
            end,
        } => {
            let points = [start, control1, control2, end].map(|p| surface.to_screen(p));
            painter.add(egui::epaint::CubicBezierShape::from_points_stroke(
                points,
                false,
                egui::Color32::TRANSPARENT,
                stroke,
            ));
        }
    }

    draw_arrowhead(painter, surface, &geom.arrow, color);
}

/// Draw a transition label
fn draw_label(painter: &egui::Painter, pos: egui::Pos2, text: &str) {
    painter.text(
        pos,
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(13.0),
        LABEL_COLOR,
    );
}

fn draw_state(painter: &egui::Painter, pos: egui::Pos2, node: &Node, is_initial: bool, is_selected: bool) {
    let stroke_color = if is_selected {
        SELECTED_COLOR
    } else if is_initial {
        INITIAL_COLOR
    } else {
        STATE_STROKE
    };
    let stroke_width = if is_selected { 3.0 } else { 1.5 };

    painter.circle(
        pos,
        NODE_RADIUS,
        STATE_FILL,
        egui::Stroke::new(stroke_width, stroke_color),
    );

    // Accepting states get a second ring
    if node.accept {
        painter.circle_stroke(pos, NODE_RADIUS - 5.0, egui::Stroke::new(1.5, stroke_color));
    }

    // Initial marker: short arrow entering from the left
    if is_initial {
        let tip = egui::pos2(pos.x - NODE_RADIUS, pos.y);
        painter.line_segment(
            [egui::pos2(tip.x - 24.0, tip.y), tip],
            egui::Stroke::new(1.5, INITIAL_COLOR),
        );
        let arrow = Arrowhead {
            tip: Point::new(tip.x, tip.y),
            direction: Point::new(1.0, 0.0),
        };
        // Already in window coordinates
        let window = Surface {
            origin: egui::Pos2::ZERO,
        };
        draw_arrowhead(painter, window, &arrow, INITIAL_COLOR);
    }

    if !node.label.is_empty() {
        painter.text(
            pos,
            egui::Align2::CENTER_CENTER,
            &node.label,
            egui::FontId::proportional(14.0),
            egui::Color32::WHITE,
        );
    }
}
