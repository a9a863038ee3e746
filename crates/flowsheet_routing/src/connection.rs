// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the diagram.

use crate::adjust::Adjustments;
use crate::node::NodeId;
use crate::port::Side;
use egui::Pos2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A port on a specific node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node
    pub node: NodeId,
    /// Index into the node's grip list
    pub port: usize,
    /// Side the port faces
    pub side: Side,
}

impl PortRef {
    /// Create a new port reference
    pub fn new(node: NodeId, port: usize, side: Side) -> Self {
        Self { node, port, side }
    }
}

/// Where the far end of a connection currently is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiveEnd {
    /// Attached, or previewing an attachment, to a port
    Port(PortRef),
    /// Following the pointer
    Pointer(Pos2),
}

/// Error when changing a connection's endpoints
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Endpoints are fixed once the connection is finalized
    #[error("Connection already finalized")]
    AlreadyFinalized,

    /// Released without a port under the pointer
    #[error("No snap target to attach to")]
    NoSnapTarget,

    /// Both ends on the same node
    #[error("Cannot connect a node to itself")]
    SelfLoop,
}

/// A connection between two ports.
///
/// While the user drags the free end, `end` is `None` and the far
/// endpoint is the snap target if there is one, otherwise the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    start: PortRef,
    end: Option<PortRef>,
    snap_target: Option<PortRef>,
    pointer: Pos2,
    adjust: Adjustments,
    path: Vec<Pos2>,
    /// Whether the connection is selected in the editor
    pub is_selected: bool,
}

impl Connection {
    /// Start drawing a connection from `start`
    pub fn new(start: PortRef, pointer: Pos2) -> Self {
        Self {
            id: ConnectionId::new(),
            start,
            end: None,
            snap_target: None,
            pointer,
            adjust: Adjustments::default(),
            path: Vec::new(),
            is_selected: false,
        }
    }

    /// Build an already finalized connection (e.g. when loading)
    pub fn finalized(
        id: ConnectionId,
        start: PortRef,
        end: PortRef,
        adjust: Adjustments,
    ) -> Result<Self, ConnectionError> {
        if start.node == end.node {
            return Err(ConnectionError::SelfLoop);
        }
        Ok(Self {
            id,
            start,
            end: Some(end),
            snap_target: None,
            pointer: Pos2::ZERO,
            adjust,
            path: Vec::new(),
            is_selected: false,
        })
    }

    /// Start port
    pub fn start(&self) -> PortRef {
        self.start
    }

    /// End port, once finalized
    pub fn end(&self) -> Option<PortRef> {
        self.end
    }

    /// Snap preview target
    pub fn snap_target(&self) -> Option<PortRef> {
        self.snap_target
    }

    /// Live pointer position of the free end
    pub fn pointer(&self) -> Pos2 {
        self.pointer
    }

    /// Whether both endpoints are fixed
    pub fn is_finalized(&self) -> bool {
        self.end.is_some()
    }

    /// Current far endpoint: end, else snap target, else pointer
    pub fn live_end(&self) -> LiveEnd {
        match self.end.or(self.snap_target) {
            Some(port) => LiveEnd::Port(port),
            None => LiveEnd::Pointer(self.pointer),
        }
    }

    /// Side of the far end when one is known
    pub fn end_side_hint(&self) -> Option<Side> {
        self.end.or(self.snap_target).map(|port| port.side)
    }

    /// Routing adjustments
    pub fn adjustments(&self) -> Adjustments {
        self.adjust
    }

    /// Replace the routing adjustments. The cached path is not recomputed.
    pub fn set_adjustments(&mut self, adjust: Adjustments) {
        self.adjust = adjust;
    }

    /// Last computed polyline
    pub fn path(&self) -> &[Pos2] {
        &self.path
    }

    /// Replace the cached polyline
    pub fn set_path(&mut self, path: Vec<Pos2>) {
        self.path = path;
    }

    /// Move the free end
    pub fn set_pointer(&mut self, pointer: Pos2) -> Result<(), ConnectionError> {
        if self.is_finalized() {
            return Err(ConnectionError::AlreadyFinalized);
        }
        self.pointer = pointer;
        Ok(())
    }

    /// Preview an attachment to `target`
    pub fn set_snap_target(&mut self, target: PortRef) -> Result<(), ConnectionError> {
        if self.is_finalized() {
            return Err(ConnectionError::AlreadyFinalized);
        }
        if target.node == self.start.node {
            return Err(ConnectionError::SelfLoop);
        }
        self.snap_target = Some(target);
        Ok(())
    }

    /// Drop the snap preview
    pub fn clear_snap_target(&mut self) {
        self.snap_target = None;
    }

    /// Attach the free end to the current snap target
    pub fn finalize(&mut self) -> Result<PortRef, ConnectionError> {
        if self.is_finalized() {
            return Err(ConnectionError::AlreadyFinalized);
        }
        let target = self.snap_target.take().ok_or(ConnectionError::NoSnapTarget)?;
        self.end = Some(target);
        Ok(target)
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.start.node == node_id || self.end.is_some_and(|end| end.node == node_id)
    }

    /// Flat persistence record; `None` while the end is still free
    pub fn to_record(&self) -> Option<ConnectionRecord> {
        let end = self.end?;
        Some(ConnectionRecord {
            id: self.id,
            source_node_id: self.start.node,
            source_grip_index: self.start.port,
            target_node_id: end.node,
            target_grip_index: end.port,
            waypoints: self.path.clone(),
            path_offset: self.adjust.path_offset,
            start_adjust: self.adjust.start_adjust,
            end_adjust: self.adjust.end_adjust,
        })
    }
}

/// Saved form of a finalized connection.
///
/// `waypoints` is only a display cache; grip indices and the three
/// scalars drive every re-route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Connection ID
    pub id: ConnectionId,
    /// Start node
    pub source_node_id: NodeId,
    /// Start grip index
    pub source_grip_index: usize,
    /// End node
    pub target_node_id: NodeId,
    /// End grip index
    pub target_grip_index: usize,
    /// Last computed polyline
    #[serde(default)]
    pub waypoints: Vec<Pos2>,
    /// Middle segment / detour offset
    #[serde(default)]
    pub path_offset: f32,
    /// Start stub adjustment
    #[serde(default)]
    pub start_adjust: f32,
    /// End stub adjustment
    #[serde(default)]
    pub end_adjust: f32,
}

impl ConnectionRecord {
    /// Adjustment scalars stored in this record
    pub fn adjustments(&self) -> Adjustments {
        Adjustments {
            path_offset: self.path_offset,
            start_adjust: self.start_adjust,
            end_adjust: self.end_adjust,
        }
    }
}
