// SPDX-License-Identifier: MIT OR Apache-2.0
//! Diagram canvas rendering and input for egui.
//!
//! Features:
//! - Node boxes with grips
//! - Orthogonal connection paths with arrowheads
//! - Vertex handles on selected connections
//! - Dashed preview while drawing a connection
//! - Pan/zoom navigation
//!
//! Paths are drawn from each connection's cached polyline; nothing is
//! routed here.

use crate::connection::Connection;
use crate::diagram::Diagram;
use crate::interaction::{CanvasEditor, InteractionMode};
use crate::route::collapse_duplicates;
use egui::{Color32, Pos2, Rect, Shape, Stroke, Vec2};

/// Node visual parameters
const NODE_ROUNDING: f32 = 3.0;
const PORT_RADIUS: f32 = 4.0;

/// Connection visual parameters
const CONNECTION_THICKNESS: f32 = 2.0;
const ARROW_LENGTH: f32 = 10.0;
const ARROW_HALF_WIDTH: f32 = 4.0;
const HANDLE_RADIUS: f32 = 3.5;
const DASH_LENGTH: f32 = 6.0;
const DASH_GAP: f32 = 4.0;

/// Grid parameters
const GRID_SPACING: f32 = 20.0;

const CONNECTION_COLOR: Color32 = Color32::from_rgb(200, 200, 210);
const SELECTED_COLOR: Color32 = Color32::from_rgb(100, 150, 255);
const SNAP_COLOR: Color32 = Color32::from_rgb(90, 200, 120);

/// Triangle for an arrowhead pointing from `from` to `tip`
pub fn arrowhead(from: Pos2, tip: Pos2, length: f32, half_width: f32) -> Option<[Pos2; 3]> {
    let dir = (tip - from).normalized();
    if !dir.is_finite() || dir == Vec2::ZERO {
        return None;
    }
    let base = tip - dir * length;
    let perp = dir.rot90() * half_width;
    Some([tip, base + perp, base - perp])
}

/// Diagram canvas view state
pub struct CanvasView {
    /// Current pan offset (canvas space)
    pub pan: Vec2,
    /// Current zoom level
    pub zoom: f32,
    /// Show grid
    pub show_grid: bool,
    /// Pointer state machine
    pub editor: CanvasEditor,
}

impl CanvasView {
    /// Create a new canvas view
    pub fn new() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            show_grid: true,
            editor: CanvasEditor::new(),
        }
    }

    /// Convert screen position to canvas position
    pub fn screen_to_canvas(&self, screen_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (screen_pos.x - center.x) / self.zoom - self.pan.x,
            (screen_pos.y - center.y) / self.zoom - self.pan.y,
        )
    }

    /// Convert canvas position to screen position
    pub fn canvas_to_screen(&self, canvas_pos: Pos2, rect: Rect) -> Pos2 {
        let center = rect.center();
        Pos2::new(
            (canvas_pos.x + self.pan.x) * self.zoom + center.x,
            (canvas_pos.y + self.pan.y) * self.zoom + center.y,
        )
    }

    /// Render the canvas and handle its input
    pub fn ui(&mut self, ui: &mut egui::Ui, diagram: &mut Diagram) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        if self.show_grid {
            self.draw_grid(&painter, rect);
        }

        self.handle_input(ui, &response, rect, diagram);

        // Connections on top of node boxes
        self.draw_nodes(&painter, rect, diagram);
        self.draw_connections(&painter, rect, diagram);

        if let InteractionMode::DrawingConnection(draft) = &self.editor.mode {
            self.draw_draft(&painter, rect, diagram, draft);
        }

        self.draw_status_bar(ui, rect, diagram);
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect) {
        let spacing = GRID_SPACING * self.zoom;
        if spacing < 4.0 {
            return;
        }
        let color = Color32::from_rgba_unmultiplied(60, 60, 60, 100);
        let origin = self.canvas_to_screen(Pos2::ZERO, rect);

        let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(spacing);
        while x < rect.right() {
            painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], Stroke::new(1.0, color));
            x += spacing;
        }

        let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(spacing);
        while y < rect.bottom() {
            painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], Stroke::new(1.0, color));
            y += spacing;
        }
    }

    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect, diagram: &mut Diagram) {
        let hover = ui.input(|i| i.pointer.hover_pos());

        // Zoom with scroll wheel, toward the pointer
        if let Some(mouse_pos) = hover.filter(|p| rect.contains(*p)) {
            let scroll_delta = ui.input(|i| i.raw_scroll_delta.y);
            if scroll_delta != 0.0 {
                let before = self.screen_to_canvas(mouse_pos, rect);
                self.zoom = (self.zoom * (1.0 + scroll_delta * 0.001)).clamp(0.1, 4.0);
                let after = self.screen_to_canvas(mouse_pos, rect);
                self.pan += after - before;
            }
        }

        if response.dragged_by(egui::PointerButton::Middle) {
            self.pan += response.drag_delta() / self.zoom;
        }

        let additive = ui.input(|i| i.modifiers.shift);

        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(origin) = ui.input(|i| i.pointer.press_origin()) {
                let pos = self.screen_to_canvas(origin, rect);
                self.editor.pointer_down(diagram, pos, additive);
            }
        } else if response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let pos = self.screen_to_canvas(pointer, rect);
                self.editor.pointer_down(diagram, pos, additive);
                self.editor.pointer_up(diagram, pos);
            }
        }

        // Plain repaints must not re-route
        let moved = ui.input(|i| i.pointer.delta() != Vec2::ZERO);
        if let Some(pointer) = response.interact_pointer_pos().or(hover) {
            let pos = self.screen_to_canvas(pointer, rect);
            if response.drag_stopped_by(egui::PointerButton::Primary) {
                self.editor.pointer_up(diagram, pos);
            } else if moved && (response.dragged_by(egui::PointerButton::Primary) || response.hovered()) {
                self.editor.pointer_move(diagram, pos);
            }
        }

        let (escape, delete) = ui.input(|i| {
            (
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
            )
        });
        if escape {
            self.editor.cancel(diagram);
        }
        if delete {
            self.editor.delete_selected(diagram);
        }
    }

    fn draw_nodes(&self, painter: &egui::Painter, rect: Rect, diagram: &Diagram) {
        let mapper = &diagram.config().mapper;
        let snap = self.editor.draft().and_then(Connection::snap_target);

        for node in diagram.nodes() {
            let screen_rect = Rect::from_min_max(
                self.canvas_to_screen(node.bounds.min, rect),
                self.canvas_to_screen(node.bounds.max, rect),
            );
            if !screen_rect.intersects(rect) {
                continue;
            }

            let is_selected = self.editor.selected_node == Some(node.id);
            painter.rect_filled(screen_rect, NODE_ROUNDING * self.zoom, Color32::from_rgb(45, 45, 48));
            painter.rect_stroke(
                screen_rect,
                NODE_ROUNDING * self.zoom,
                if is_selected {
                    Stroke::new(2.0, SELECTED_COLOR)
                } else {
                    Stroke::new(1.0, Color32::from_gray(110))
                },
            );
            painter.text(
                screen_rect.center(),
                egui::Align2::CENTER_CENTER,
                &node.symbol,
                egui::FontId::proportional(11.0 * self.zoom),
                Color32::from_gray(220),
            );

            for (index, grip) in node.port_positions(mapper) {
                let pos = self.canvas_to_screen(grip, rect);
                let is_target = snap.is_some_and(|t| t.node == node.id && t.port == index);
                let is_hovered = self
                    .editor
                    .hovered_port
                    .is_some_and(|p| p.node == node.id && p.port == index);

                let (radius, color) = if is_target {
                    (PORT_RADIUS * 1.5, SNAP_COLOR)
                } else if is_hovered {
                    (PORT_RADIUS * 1.3, SELECTED_COLOR)
                } else {
                    (PORT_RADIUS, Color32::from_rgb(180, 140, 80))
                };
                painter.circle_filled(pos, radius * self.zoom, color);
                painter.circle_stroke(pos, radius * self.zoom, Stroke::new(1.0, Color32::from_gray(30)));
            }
        }
    }

    fn draw_connections(&self, painter: &egui::Painter, rect: Rect, diagram: &Diagram) {
        for connection in diagram.connections() {
            let color = if connection.is_selected { SELECTED_COLOR } else { CONNECTION_COLOR };
            let points = self.screen_path(connection, rect);
            self.draw_path(painter, &points, Stroke::new(CONNECTION_THICKNESS * self.zoom, color));

            if connection.is_selected {
                for point in &points {
                    painter.circle(
                        *point,
                        HANDLE_RADIUS * self.zoom,
                        Color32::WHITE,
                        Stroke::new(1.0, SELECTED_COLOR),
                    );
                }
            }
        }
    }

    fn draw_draft(&self, painter: &egui::Painter, rect: Rect, diagram: &Diagram, draft: &Connection) {
        let points = self.screen_path(draft, rect);
        if points.len() < 2 {
            return;
        }
        let color = if draft.snap_target().is_some() { SNAP_COLOR } else { CONNECTION_COLOR };
        let stroke = Stroke::new(CONNECTION_THICKNESS * self.zoom, color);
        painter.extend(Shape::dashed_line(
            &points,
            stroke,
            DASH_LENGTH * self.zoom,
            DASH_GAP * self.zoom,
        ));

        if let Some(start) = diagram.node(draft.start().node) {
            if let Some(grip) = start.port_position(draft.start().port, &diagram.config().mapper) {
                painter.circle_filled(self.canvas_to_screen(grip, rect), PORT_RADIUS * self.zoom, color);
            }
        }
    }

    fn screen_path(&self, connection: &Connection, rect: Rect) -> Vec<Pos2> {
        collapse_duplicates(connection.path())
            .into_iter()
            .map(|p| self.canvas_to_screen(p, rect))
            .collect()
    }

    fn draw_path(&self, painter: &egui::Painter, points: &[Pos2], stroke: Stroke) {
        if points.len() < 2 {
            return;
        }
        painter.add(Shape::line(points.to_vec(), stroke));

        let tip = points[points.len() - 1];
        let from = points[points.len() - 2];
        if let Some(head) = arrowhead(from, tip, ARROW_LENGTH * self.zoom, ARROW_HALF_WIDTH * self.zoom) {
            painter.add(Shape::convex_polygon(head.to_vec(), stroke.color, Stroke::NONE));
        }
    }

    fn draw_status_bar(&self, ui: &mut egui::Ui, rect: Rect, diagram: &Diagram) {
        let mode = match &self.editor.mode {
            InteractionMode::Idle => "Ready",
            InteractionMode::DrawingConnection(_) => "Connecting",
            InteractionMode::AdjustingConnection(session) => session.param().name(),
            InteractionMode::MovingNode { .. } => "Moving",
        };

        ui.painter().text(
            Pos2::new(rect.left() + 5.0, rect.bottom() - 11.0),
            egui::Align2::LEFT_CENTER,
            format!(
                "Nodes: {} | Connections: {} | Zoom: {:.0}% | {}",
                diagram.node_count(),
                diagram.connection_count(),
                self.zoom * 100.0,
                mode,
            ),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );
    }
}

impl Default for CanvasView {
    fn default() -> Self {
        Self::new()
    }
}
