// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer-driven editing of a diagram.
//!
//! [`CanvasEditor`] works in canvas coordinates and knows nothing about
//! the windowing layer; the egui view translates its input into these
//! calls.

use crate::connection::{Connection, ConnectionError, ConnectionId, PortRef};
use crate::diagram::Diagram;
use crate::drag::DragSession;
use crate::hit_test::hit_test;
use crate::node::NodeId;
use egui::Pos2;

/// Editor interaction mode
#[derive(Debug, Clone, Default)]
pub enum InteractionMode {
    /// Nothing in progress
    #[default]
    Idle,
    /// Dragging the free end of a new connection
    DrawingConnection(Connection),
    /// Dragging a segment of an existing connection
    AdjustingConnection(DragSession),
    /// Dragging a node
    MovingNode {
        /// Node being moved
        node: NodeId,
        /// Pointer position at the last move
        last: Pos2,
    },
}

/// Pointer state machine for a diagram canvas
#[derive(Debug, Clone, Default)]
pub struct CanvasEditor {
    /// Current interaction mode
    pub mode: InteractionMode,
    /// Selected node, if any
    pub selected_node: Option<NodeId>,
    /// Port under the pointer while idle
    pub hovered_port: Option<PortRef>,
    /// Last pointer position seen
    last_pointer: Option<Pos2>,
}

impl CanvasEditor {
    /// Create a new editor
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection currently being drawn
    pub fn draft(&self) -> Option<&Connection> {
        match &self.mode {
            InteractionMode::DrawingConnection(draft) => Some(draft),
            _ => None,
        }
    }

    /// Pointer pressed at `pos`.
    ///
    /// A port starts a new connection, a connection segment starts an
    /// adjustment drag, a node body starts a move. Anything else clears
    /// the selection. With `additive` the existing selection is kept.
    pub fn pointer_down(&mut self, diagram: &mut Diagram, pos: Pos2, additive: bool) {
        self.hovered_port = None;
        self.last_pointer = Some(pos);

        if let Some(port) = diagram.port_at(pos) {
            let mut draft = Connection::new(port, pos);
            diagram.route_draft(&mut draft);
            tracing::debug!("Started connection from {:?}[{}]", port.node, port.port);
            self.mode = InteractionMode::DrawingConnection(draft);
            return;
        }

        if let Some((id, segment)) = diagram.hit_connection(pos) {
            if !additive {
                self.clear_selection(diagram);
            }
            diagram.set_selected(id, true);

            // Probing compares against the cached path, which may be stale
            // waypoints from a loaded document
            if let Err(e) = diagram.reroute(id) {
                tracing::warn!("Could not re-route connection before drag: {e}");
            }

            if let Some(connection) = diagram.connection(id) {
                let segment = hit_test(connection.path(), pos, diagram.config().hit_tolerance).unwrap_or(segment);
                let session = DragSession::begin(connection, segment, pos, diagram.config(), |adjust| {
                    diagram.route_with(connection, adjust)
                });
                self.mode = InteractionMode::AdjustingConnection(session);
            }
            return;
        }

        if let Some(node) = diagram.node_at(pos) {
            if !additive {
                self.clear_selection(diagram);
            }
            self.selected_node = Some(node);
            self.mode = InteractionMode::MovingNode { node, last: pos };
            return;
        }

        if !additive {
            self.clear_selection(diagram);
        }
    }

    /// Pointer moved to `pos`.
    ///
    /// Repeating the last position is a no-op, so a repaint never
    /// re-routes anything.
    pub fn pointer_move(&mut self, diagram: &mut Diagram, pos: Pos2) {
        if self.last_pointer.replace(pos) == Some(pos) {
            return;
        }

        match &mut self.mode {
            InteractionMode::Idle => {
                self.hovered_port = diagram.port_at(pos);
            }

            InteractionMode::DrawingConnection(draft) => {
                if draft.set_pointer(pos).is_err() {
                    return;
                }
                match diagram.snap_candidate(pos, draft.start().node) {
                    Some(target) => {
                        if let Err(e) = draft.set_snap_target(target) {
                            tracing::debug!("Snap rejected: {e}");
                            draft.clear_snap_target();
                        }
                    }
                    None => draft.clear_snap_target(),
                }
                diagram.route_draft(draft);
            }

            InteractionMode::AdjustingConnection(session) => {
                if let Err(e) = session.update(pos, diagram) {
                    tracing::warn!("Could not adjust connection: {e}");
                }
            }

            InteractionMode::MovingNode { node, last } => {
                let delta = pos - *last;
                *last = pos;
                if let Err(e) = diagram.move_node(*node, delta) {
                    tracing::warn!("Could not move node: {e}");
                }
            }
        }
    }

    /// Pointer released at `pos`.
    ///
    /// Returns the ID of a connection created by this release.
    pub fn pointer_up(&mut self, diagram: &mut Diagram, pos: Pos2) -> Option<ConnectionId> {
        self.pointer_move(diagram, pos);

        match std::mem::take(&mut self.mode) {
            InteractionMode::DrawingConnection(mut draft) => match draft.finalize() {
                Ok(_) => match diagram.insert_connection(draft) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        tracing::warn!("Could not create connection: {e}");
                        None
                    }
                },
                Err(ConnectionError::NoSnapTarget) => {
                    tracing::debug!("Released without a target, connection discarded");
                    None
                }
                Err(e) => {
                    tracing::warn!("Could not finalize connection: {e}");
                    None
                }
            },
            InteractionMode::AdjustingConnection(session) => {
                if let Some(connection) = diagram.connection(session.connection()) {
                    tracing::debug!(
                        "Adjusted connection {:?}: {:?}",
                        connection.id,
                        connection.adjustments()
                    );
                }
                None
            }
            InteractionMode::Idle | InteractionMode::MovingNode { .. } => None,
        }
    }

    /// Escape: drop the draft if there is one, otherwise clear the selection
    pub fn cancel(&mut self, diagram: &mut Diagram) {
        match std::mem::take(&mut self.mode) {
            InteractionMode::DrawingConnection(_) => {
                tracing::debug!("Connection draft cancelled");
            }
            _ => self.clear_selection(diagram),
        }
    }

    /// Deselect everything
    pub fn clear_selection(&mut self, diagram: &mut Diagram) {
        self.selected_node = None;
        diagram.clear_selection();
    }

    /// Delete selected connections and the selected node, returning how
    /// many connections were removed
    pub fn delete_selected(&mut self, diagram: &mut Diagram) -> usize {
        let before = diagram.connection_count();
        diagram.delete_selected();
        if let Some(node) = self.selected_node.take() {
            diagram.remove_node(node);
        }
        before - diagram.connection_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjust::AdjustParam;
    use crate::config::{MapperConfig, RoutingConfig};
    use crate::document::DiagramDocument;
    use crate::node::Node;
    use egui::{Rect, Vec2};

    fn setup(b_origin: Pos2) -> (Diagram, NodeId, NodeId) {
        let config = RoutingConfig {
            mapper: MapperConfig {
                port_margin: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut diagram = Diagram::with_config("Test", config);
        let size = Vec2::new(100.0, 60.0);
        let a = diagram.add_node(Node::new("Pump", Rect::from_min_size(Pos2::ZERO, size)));
        let b = diagram.add_node(Node::new("Tank", Rect::from_min_size(b_origin, size)));
        (diagram, a, b)
    }

    #[test]
    fn test_draw_and_snap() {
        let (mut diagram, a, b) = setup(Pos2::new(300.0, 0.0));
        let mut editor = CanvasEditor::new();

        editor.pointer_down(&mut diagram, Pos2::new(100.0, 30.0), false);
        assert!(editor.draft().is_some());

        editor.pointer_move(&mut diagram, Pos2::new(200.0, 120.0));
        let draft = editor.draft().unwrap();
        assert_eq!(draft.snap_target(), None);
        assert_eq!(draft.path().last(), Some(&Pos2::new(200.0, 120.0)));

        editor.pointer_move(&mut diagram, Pos2::new(295.0, 32.0));
        let draft = editor.draft().unwrap();
        assert_eq!(draft.snap_target().map(|t| t.node), Some(b));
        assert_eq!(draft.path().last(), Some(&Pos2::new(300.0, 30.0)));

        let id = editor.pointer_up(&mut diagram, Pos2::new(295.0, 32.0)).unwrap();
        assert!(matches!(editor.mode, InteractionMode::Idle));
        let connection = diagram.connection(id).unwrap();
        assert_eq!(connection.start().node, a);
        assert_eq!(connection.end().map(|e| e.node), Some(b));
    }

    #[test]
    fn test_release_without_target_discards() {
        let (mut diagram, _, _) = setup(Pos2::new(300.0, 0.0));
        let mut editor = CanvasEditor::new();
        editor.pointer_down(&mut diagram, Pos2::new(100.0, 30.0), false);
        assert_eq!(editor.pointer_up(&mut diagram, Pos2::new(200.0, 200.0)), None);
        assert_eq!(diagram.connection_count(), 0);
    }

    #[test]
    fn test_escape_cancels_draft_then_deselects() {
        let (mut diagram, a, b) = setup(Pos2::new(300.0, 0.0));
        let id = diagram.connect(a, 1, b, 0).unwrap();
        diagram.set_selected(id, true);
        let mut editor = CanvasEditor::new();

        editor.pointer_down(&mut diagram, Pos2::new(0.0, 30.0), false);
        editor.cancel(&mut diagram);
        assert!(editor.draft().is_none());
        assert_eq!(diagram.selected_connections(), vec![id]);

        editor.cancel(&mut diagram);
        assert!(diagram.selected_connections().is_empty());
        assert_eq!(diagram.connection_count(), 1);
    }

    #[test]
    fn test_segment_drag_adjusts_offset() {
        let (mut diagram, a, b) = setup(Pos2::new(300.0, 100.0));
        let id = diagram.connect(a, 1, b, 0).unwrap();
        let mut editor = CanvasEditor::new();

        editor.pointer_down(&mut diagram, Pos2::new(200.0, 80.0), false);
        match &editor.mode {
            InteractionMode::AdjustingConnection(session) => {
                assert_eq!(session.param(), AdjustParam::PathOffset);
                assert_eq!(session.segment(), 2);
            }
            other => panic!("unexpected mode {other:?}"),
        }
        assert!(diagram.connection(id).unwrap().is_selected);

        editor.pointer_move(&mut diagram, Pos2::new(230.0, 95.0));
        let connection = diagram.connection(id).unwrap();
        assert_eq!(connection.adjustments().path_offset, 30.0);
        assert_eq!(connection.path()[2], Pos2::new(230.0, 30.0));

        assert_eq!(editor.pointer_up(&mut diagram, Pos2::new(230.0, 95.0)), None);
        assert!(matches!(editor.mode, InteractionMode::Idle));
    }

    #[test]
    fn test_straight_line_drag_moves_middle() {
        let (mut diagram, a, b) = setup(Pos2::new(300.0, 0.0));
        let id = diagram.connect(a, 1, b, 0).unwrap();
        let mut editor = CanvasEditor::new();

        editor.pointer_down(&mut diagram, Pos2::new(200.0, 30.0), false);
        match &editor.mode {
            InteractionMode::AdjustingConnection(session) => {
                assert_eq!(session.segment(), 1);
                assert_eq!(session.param(), AdjustParam::PathOffset);
            }
            other => panic!("unexpected mode {other:?}"),
        }

        editor.pointer_move(&mut diagram, Pos2::new(230.0, 30.0));
        let adjust = diagram.connection(id).unwrap().adjustments();
        assert_eq!(adjust.path_offset, 60.0);
        assert_eq!(adjust.start_adjust, 0.0);
    }

    /// Loaded document whose saved waypoints sit 4 units below the route
    fn loaded_with_shifted_waypoints() -> (Diagram, NodeId, ConnectionId) {
        let (mut diagram, a, b) = setup(Pos2::new(300.0, 100.0));
        let id = diagram.connect(a, 1, b, 0).unwrap();
        let mut document = DiagramDocument::from_diagram(&diagram);
        for point in &mut document.connections[0].waypoints {
            point.y += 4.0;
        }
        (document.into_diagram(*diagram.config()), a, id)
    }

    #[test]
    fn test_drag_after_load_ignores_saved_waypoints() {
        let (mut diagram, _, id) = loaded_with_shifted_waypoints();
        assert_eq!(diagram.connection(id).unwrap().path()[2], Pos2::new(200.0, 34.0));
        let mut editor = CanvasEditor::new();

        editor.pointer_down(&mut diagram, Pos2::new(200.0, 80.0), false);
        assert_eq!(diagram.connection(id).unwrap().path()[2], Pos2::new(200.0, 30.0));
        match &editor.mode {
            InteractionMode::AdjustingConnection(session) => {
                assert_eq!(session.param(), AdjustParam::PathOffset);
                assert_eq!(session.sensitivity().vector, Vec2::new(1.0, 0.0));
            }
            other => panic!("unexpected mode {other:?}"),
        }

        editor.pointer_move(&mut diagram, Pos2::new(230.0, 80.0));
        assert_eq!(diagram.connection(id).unwrap().adjustments().path_offset, 30.0);
    }

    #[test]
    fn test_repeated_pointer_position_does_not_reroute() {
        let (mut diagram, a, id) = loaded_with_shifted_waypoints();
        let saved = diagram.connection(id).unwrap().path().to_vec();
        let mut editor = CanvasEditor::new();

        editor.pointer_down(&mut diagram, Pos2::new(50.0, 10.0), false);
        assert!(matches!(editor.mode, InteractionMode::MovingNode { node, .. } if node == a));
        for _ in 0..3 {
            editor.pointer_move(&mut diagram, Pos2::new(50.0, 10.0));
        }
        assert_eq!(diagram.connection(id).unwrap().path(), saved.as_slice());

        editor.pointer_move(&mut diagram, Pos2::new(50.0, 20.0));
        assert_eq!(diagram.connection(id).unwrap().path()[0], Pos2::new(100.0, 40.0));
    }

    #[test]
    fn test_node_move_reroutes_and_delete_cascades() {
        let (mut diagram, a, b) = setup(Pos2::new(300.0, 0.0));
        let id = diagram.connect(a, 1, b, 0).unwrap();
        let mut editor = CanvasEditor::new();

        editor.pointer_down(&mut diagram, Pos2::new(50.0, 10.0), false);
        editor.pointer_move(&mut diagram, Pos2::new(50.0, 60.0));
        editor.pointer_up(&mut diagram, Pos2::new(50.0, 60.0));
        assert_eq!(diagram.connection(id).unwrap().path()[0], Pos2::new(100.0, 80.0));

        assert_eq!(editor.selected_node, Some(a));
        assert_eq!(editor.delete_selected(&mut diagram), 1);
        assert!(diagram.node(a).is_none());
        assert_eq!(diagram.node_count(), 1);
    }

    #[test]
    fn test_hover_tracks_ports() {
        let (mut diagram, a, _) = setup(Pos2::new(300.0, 0.0));
        let mut editor = CanvasEditor::new();
        editor.pointer_move(&mut diagram, Pos2::new(101.0, 31.0));
        assert_eq!(editor.hovered_port.map(|p| (p.node, p.port)), Some((a, 1)));
        editor.pointer_move(&mut diagram, Pos2::new(150.0, 150.0));
        assert_eq!(editor.hovered_port, None);
    }
}
