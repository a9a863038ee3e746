// SPDX-License-Identifier: MIT OR Apache-2.0
//! Diagram store: nodes, connections, and the re-route triggers.
//!
//! Paths are recomputed only when something they depend on changes
//! (endpoint attach, adjustment change, node move/resize), never when the
//! diagram is drawn.

use crate::adjust::Adjustments;
use crate::config::RoutingConfig;
use crate::connection::{Connection, ConnectionError, ConnectionId, LiveEnd, PortRef};
use crate::hit_test::hit_test;
use crate::node::{Node, NodeId};
use crate::route::{RoutePlanner, RouteRequest};
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexMap;

/// Node geometry the router reads.
///
/// The router never looks nodes up on its own; whoever owns the nodes
/// passes itself in through this trait.
pub trait NodeGeometry {
    /// Absolute canvas position of a grip
    fn grip_absolute_position(&self, node: NodeId, port: usize) -> Option<Pos2>;

    /// Bounding box of a node
    fn bounding_box(&self, node: NodeId) -> Option<Rect>;

    /// All node IDs
    fn node_ids(&self) -> Vec<NodeId>;

    /// All connection IDs
    fn connection_ids(&self) -> Vec<ConnectionId>;
}

/// Build the planner input for a connection from node geometry.
///
/// Returns `None` when an attached node or port no longer exists.
pub fn route_request<G: NodeGeometry + ?Sized>(
    planner: &RoutePlanner,
    connection: &Connection,
    geometry: &G,
) -> Option<RouteRequest> {
    let start = connection.start();
    let start_abs = geometry.grip_absolute_position(start.node, start.port)?;
    let start_rect = geometry.bounding_box(start.node)?;

    let (end_abs, end_rect) = match connection.live_end() {
        LiveEnd::Port(end) => (
            geometry.grip_absolute_position(end.node, end.port)?,
            geometry.bounding_box(end.node)?,
        ),
        LiveEnd::Pointer(pointer) => (pointer, planner.free_end_rect(pointer)),
    };

    Some(RouteRequest {
        start_side: start.side,
        end_side: connection.end_side_hint(),
        adjust: connection.adjustments(),
        start_rect,
        end_rect,
        start: start_abs,
        end: end_abs,
    })
}

fn manhattan(a: Pos2, b: Pos2) -> f32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// A process-flow diagram
#[derive(Debug, Clone)]
pub struct Diagram {
    /// Diagram name
    pub name: String,
    /// Nodes in insertion (paint) order
    nodes: IndexMap<NodeId, Node>,
    /// Finalized connections
    connections: IndexMap<ConnectionId, Connection>,
    config: RoutingConfig,
    planner: RoutePlanner,
}

impl Diagram {
    /// Create a new empty diagram with default routing settings
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, RoutingConfig::default())
    }

    /// Create a new empty diagram
    pub fn with_config(name: impl Into<String>, config: RoutingConfig) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            planner: RoutePlanner::new(&config),
            config,
        }
    }

    /// Routing settings
    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Route planner built from the settings
    pub fn planner(&self) -> &RoutePlanner {
        &self.planner
    }

    /// Add a node to the diagram
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let before = self.connections.len();
        self.connections.retain(|_, c| !c.involves_node(node_id));
        let removed = before - self.connections.len();
        if removed > 0 {
            tracing::info!("Removed {removed} connection(s) attached to node {node_id:?}");
        }
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Move a node and re-route its connections.
    ///
    /// A zero delta leaves everything untouched.
    pub fn move_node(&mut self, node_id: NodeId, delta: Vec2) -> Result<(), DiagramError> {
        let bounds = self.node(node_id).ok_or(DiagramError::NodeNotFound(node_id))?.bounds;
        if delta == Vec2::ZERO {
            return Ok(());
        }
        self.set_node_bounds(node_id, bounds.translate(delta))
    }

    /// Move or resize a node and re-route its connections
    pub fn set_node_bounds(&mut self, node_id: NodeId, bounds: Rect) -> Result<(), DiagramError> {
        let node = self.nodes.get_mut(&node_id).ok_or(DiagramError::NodeNotFound(node_id))?;
        node.bounds = bounds;
        self.reroute_node(node_id);
        Ok(())
    }

    /// Resolve a grip into a port reference
    pub fn port_ref(&self, node_id: NodeId, port: usize) -> Result<PortRef, DiagramError> {
        let node = self.node(node_id).ok_or(DiagramError::NodeNotFound(node_id))?;
        let grip = node.port(port).ok_or(DiagramError::PortNotFound(node_id, port))?;
        Ok(PortRef::new(node_id, port, grip.side))
    }

    /// Connect two grips directly
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: usize,
        to_node: NodeId,
        to_port: usize,
    ) -> Result<ConnectionId, DiagramError> {
        let start = self.port_ref(from_node, from_port)?;
        let end = self.port_ref(to_node, to_port)?;
        let connection = Connection::finalized(ConnectionId::new(), start, end, Adjustments::default())?;
        self.insert_connection(connection)
    }

    /// Store a finalized connection and route it
    pub fn insert_connection(&mut self, connection: Connection) -> Result<ConnectionId, DiagramError> {
        let end = connection.end().ok_or(DiagramError::NotFinalized)?;
        let start = connection.start();
        self.port_ref(start.node, start.port)?;
        self.port_ref(end.node, end.port)?;

        let id = connection.id;
        self.connections.insert(id, connection);
        self.reroute(id)?;
        tracing::info!("Connected {:?}[{}] -> {:?}[{}]", start.node, start.port, end.node, end.port);
        Ok(id)
    }

    /// Store a connection with its saved path, without re-routing
    pub(crate) fn insert_loaded(&mut self, connection: Connection) {
        self.connections.insert(connection.id, connection);
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let removed = self.connections.shift_remove(&connection_id);
        if removed.is_some() {
            tracing::info!("Removed connection {connection_id:?}");
        }
        removed
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Change a connection's adjustments and re-route it
    pub fn set_adjustments(&mut self, connection_id: ConnectionId, adjust: Adjustments) -> Result<(), DiagramError> {
        self.connections
            .get_mut(&connection_id)
            .ok_or(DiagramError::ConnectionNotFound(connection_id))?
            .set_adjustments(adjust);
        self.reroute(connection_id)
    }

    /// Recompute one connection's path
    pub fn reroute(&mut self, connection_id: ConnectionId) -> Result<(), DiagramError> {
        let connection = self
            .connections
            .get(&connection_id)
            .ok_or(DiagramError::ConnectionNotFound(connection_id))?;
        let request = route_request(&self.planner, connection, self)
            .ok_or(DiagramError::DanglingConnection(connection_id))?;
        let path = self.planner.route(&request).points;

        if let Some(connection) = self.connections.get_mut(&connection_id) {
            connection.set_path(path);
        }
        Ok(())
    }

    /// Recompute every connection's path
    pub fn reroute_all(&mut self) {
        let ids: Vec<_> = self.connections.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.reroute(id) {
                tracing::warn!("Could not re-route connection: {e}");
            }
        }
    }

    fn reroute_node(&mut self, node_id: NodeId) {
        let ids: Vec<_> = self.connections_for_node(node_id).map(|c| c.id).collect();
        for id in ids {
            if let Err(e) = self.reroute(id) {
                tracing::warn!("Could not re-route connection: {e}");
            }
        }
    }

    /// Route a connection that is not (yet) stored, e.g. the one being drawn
    pub fn route_draft(&self, draft: &mut Connection) {
        match route_request(&self.planner, draft, self) {
            Some(request) => draft.set_path(self.planner.route(&request).points),
            None => draft.set_path(Vec::new()),
        }
    }

    /// Path a connection would take with different adjustments
    pub fn route_with(&self, connection: &Connection, adjust: Adjustments) -> Vec<Pos2> {
        match route_request(&self.planner, connection, self) {
            Some(mut request) => {
                request.adjust = adjust;
                self.planner.route(&request).points
            }
            None => Vec::new(),
        }
    }

    /// Topmost node under the pointer
    pub fn node_at(&self, pos: Pos2) -> Option<NodeId> {
        self.nodes.values().rev().find(|n| n.bounds.contains(pos)).map(|n| n.id)
    }

    /// Grip under the pointer, topmost node first
    pub fn port_at(&self, pos: Pos2) -> Option<PortRef> {
        let mapper = &self.config.mapper;
        self.nodes.values().rev().find_map(|node| {
            node.port_positions(mapper)
                .find(|(_, grip)| manhattan(*grip, pos) < self.config.port_hit_radius)
                .and_then(|(index, _)| node.port(index).map(|p| PortRef::new(node.id, index, p.side)))
        })
    }

    /// Grip a dragged end should snap to, ignoring `exclude`
    pub fn snap_candidate(&self, pos: Pos2, exclude: NodeId) -> Option<PortRef> {
        let mapper = &self.config.mapper;
        self.nodes
            .values()
            .filter(|node| node.id != exclude)
            .filter(|node| node.bounds.expand(self.config.snap_margin).contains(pos))
            .find_map(|node| {
                node.port_positions(mapper)
                    .find(|(_, grip)| manhattan(*grip, pos) < self.config.snap_radius)
                    .and_then(|(index, _)| node.port(index).map(|p| PortRef::new(node.id, index, p.side)))
            })
    }

    /// First connection (and segment) under the pointer
    pub fn hit_connection(&self, pos: Pos2) -> Option<(ConnectionId, usize)> {
        self.connections.values().find_map(|connection| {
            hit_test(connection.path(), pos, self.config.hit_tolerance)
                .map(|segment| (connection.id, segment))
        })
    }

    /// Select or deselect a connection
    pub fn set_selected(&mut self, connection_id: ConnectionId, selected: bool) {
        if let Some(connection) = self.connections.get_mut(&connection_id) {
            connection.is_selected = selected;
        }
    }

    /// Deselect every connection
    pub fn clear_selection(&mut self) {
        for connection in self.connections.values_mut() {
            connection.is_selected = false;
        }
    }

    /// IDs of selected connections
    pub fn selected_connections(&self) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| c.is_selected)
            .map(|c| c.id)
            .collect()
    }

    /// Delete every selected connection, returning how many were removed
    pub fn delete_selected(&mut self) -> usize {
        let before = self.connections.len();
        self.connections.retain(|_, c| !c.is_selected);
        let removed = before - self.connections.len();
        if removed > 0 {
            tracing::info!("Deleted {removed} selected connection(s)");
        }
        removed
    }
}

impl NodeGeometry for Diagram {
    fn grip_absolute_position(&self, node: NodeId, port: usize) -> Option<Pos2> {
        self.node(node)?.port_position(port, &self.config.mapper)
    }

    fn bounding_box(&self, node: NodeId) -> Option<Rect> {
        self.node(node).map(|n| n.bounds)
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when editing a diagram
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port index out of range for the node
    #[error("Port {1} not found on node {0:?}")]
    PortNotFound(NodeId, usize),

    /// Connection not found
    #[error("Connection not found: {0:?}")]
    ConnectionNotFound(ConnectionId),

    /// Connection refers to a node or port that no longer exists
    #[error("Connection {0:?} refers to a missing node or port")]
    DanglingConnection(ConnectionId),

    /// Only finalized connections can be stored
    #[error("Connection has no end port")]
    NotFinalized,

    /// Endpoint rule violated
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapperConfig;
    use crate::port::{Port, Side};

    fn flat_config() -> RoutingConfig {
        RoutingConfig {
            mapper: MapperConfig {
                port_margin: 0.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn node(x: f32, y: f32) -> Node {
        Node::new("Tank", Rect::from_min_size(Pos2::new(x, y), Vec2::new(100.0, 60.0)))
    }

    /// A at (0,0), B at (300,0), default left/right grips, no margin
    fn two_nodes() -> (Diagram, NodeId, NodeId) {
        let mut diagram = Diagram::with_config("Test", flat_config());
        let a = diagram.add_node(node(0.0, 0.0));
        let b = diagram.add_node(node(300.0, 0.0));
        (diagram, a, b)
    }

    #[test]
    fn test_connect_routes_immediately() {
        let (mut diagram, a, b) = two_nodes();
        let id = diagram.connect(a, 1, b, 0).unwrap();
        let path = diagram.connection(id).unwrap().path();
        assert_eq!(path.first(), Some(&Pos2::new(100.0, 30.0)));
        assert_eq!(path[2], Pos2::new(200.0, 30.0));
        assert_eq!(path.last(), Some(&Pos2::new(300.0, 30.0)));
    }

    #[test]
    fn test_connect_validates() {
        let (mut diagram, a, b) = two_nodes();
        assert!(matches!(diagram.connect(a, 5, b, 0), Err(DiagramError::PortNotFound(_, 5))));
        assert!(matches!(
            diagram.connect(a, 1, a, 0),
            Err(DiagramError::Connection(ConnectionError::SelfLoop))
        ));
        assert!(matches!(
            diagram.connect(a, 1, NodeId::new(), 0),
            Err(DiagramError::NodeNotFound(_))
        ));
        let draft = Connection::new(diagram.port_ref(a, 1).unwrap(), Pos2::ZERO);
        assert!(matches!(diagram.insert_connection(draft), Err(DiagramError::NotFinalized)));
    }

    #[test]
    fn test_move_node_reroutes() {
        let (mut diagram, a, b) = two_nodes();
        let id = diagram.connect(a, 1, b, 0).unwrap();
        diagram.move_node(b, Vec2::new(0.0, 100.0)).unwrap();
        let path = diagram.connection(id).unwrap().path();
        assert_eq!(path.last(), Some(&Pos2::new(300.0, 130.0)));
        assert_eq!(path[3], Pos2::new(200.0, 130.0));
    }

    #[test]
    fn test_zero_move_keeps_cached_path() {
        let (mut diagram, a, b) = two_nodes();
        let start = diagram.port_ref(a, 1).unwrap();
        let end = diagram.port_ref(b, 0).unwrap();
        let mut connection = Connection::finalized(ConnectionId::new(), start, end, Adjustments::default()).unwrap();
        let id = connection.id;
        let cached = vec![Pos2::new(1.0, 1.0), Pos2::new(2.0, 1.0)];
        connection.set_path(cached.clone());
        diagram.insert_loaded(connection);

        diagram.move_node(a, Vec2::ZERO).unwrap();
        assert_eq!(diagram.connection(id).unwrap().path(), cached.as_slice());
        assert!(matches!(
            diagram.move_node(NodeId::new(), Vec2::ZERO),
            Err(DiagramError::NodeNotFound(_))
        ));

        diagram.move_node(a, Vec2::new(0.0, 10.0)).unwrap();
        assert_eq!(diagram.connection(id).unwrap().path()[0], Pos2::new(100.0, 40.0));
    }

    #[test]
    fn test_set_adjustments_reroutes() {
        let (mut diagram, a, b) = two_nodes();
        let id = diagram.connect(a, 1, b, 0).unwrap();
        diagram
            .set_adjustments(id, Adjustments { path_offset: -40.0, ..Default::default() })
            .unwrap();
        assert_eq!(diagram.connection(id).unwrap().path()[2], Pos2::new(160.0, 30.0));
    }

    #[test]
    fn test_remove_node_cascades() {
        let (mut diagram, a, b) = two_nodes();
        let c = diagram.add_node(node(0.0, 200.0));
        diagram.connect(a, 1, b, 0).unwrap();
        let kept = diagram.connect(c, 1, b, 0).unwrap();
        assert!(diagram.remove_node(a).is_some());
        assert_eq!(diagram.connection_count(), 1);
        assert!(diagram.connection(kept).is_some());
        assert_eq!(diagram.node_ids(), vec![b, c]);
    }

    #[test]
    fn test_port_lookup_and_snapping() {
        let (diagram, a, b) = two_nodes();
        assert_eq!(diagram.port_at(Pos2::new(104.0, 33.0)), Some(PortRef::new(a, 1, Side::Right)));
        assert_eq!(diagram.port_at(Pos2::new(150.0, 30.0)), None);

        // Within snap radius of B's left grip, but never onto the start node
        assert_eq!(diagram.snap_candidate(Pos2::new(290.0, 35.0), a), Some(PortRef::new(b, 0, Side::Left)));
        assert_eq!(diagram.snap_candidate(Pos2::new(290.0, 35.0), b), None);
        // Outside the grown box
        assert_eq!(diagram.snap_candidate(Pos2::new(250.0, 30.0), a), None);
    }

    #[test]
    fn test_draft_routes_to_pointer() {
        let (diagram, a, _) = two_nodes();
        let mut draft = Connection::new(diagram.port_ref(a, 1).unwrap(), Pos2::new(250.0, 100.0));
        diagram.route_draft(&mut draft);
        assert_eq!(draft.path().last(), Some(&Pos2::new(250.0, 100.0)));
        assert_eq!(draft.path()[0], Pos2::new(100.0, 30.0));
    }

    #[test]
    fn test_selection_and_delete() {
        let (mut diagram, a, b) = two_nodes();
        let id = diagram.connect(a, 1, b, 0).unwrap();
        assert_eq!(diagram.hit_connection(Pos2::new(150.0, 32.0)), Some((id, 1)));
        diagram.set_selected(id, true);
        assert_eq!(diagram.selected_connections(), vec![id]);
        assert_eq!(diagram.delete_selected(), 1);
        assert_eq!(diagram.connection_count(), 0);
    }

    #[test]
    fn test_disconnect() {
        let (mut diagram, a, b) = two_nodes();
        let id = diagram.connect(a, 1, b, 0).unwrap();
        assert!(diagram.disconnect(id).is_some());
        assert!(diagram.disconnect(id).is_none());
        assert!(matches!(
            diagram.set_adjustments(id, Adjustments::default()),
            Err(DiagramError::ConnectionNotFound(_))
        ));
    }

    #[test]
    fn test_geometry_trait() {
        let mut diagram = Diagram::with_config("Test", flat_config());
        let top = diagram.add_node(node(0.0, 0.0).with_ports(vec![Port::new(50.0, 100.0, Side::Top)]));
        assert_eq!(diagram.grip_absolute_position(top, 0), Some(Pos2::new(50.0, 0.0)));
        assert_eq!(diagram.grip_absolute_position(top, 1), None);
        assert_eq!(diagram.bounding_box(top).map(|r| r.width()), Some(100.0));
        assert!(diagram.connection_ids().is_empty());
    }
}
