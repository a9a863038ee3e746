// SPDX-License-Identifier: MIT OR Apache-2.0
//! Orthogonal connection routing for process-flow diagrams.
//!
//! This crate provides the connection layer of a flowsheet canvas:
//! - Grip (port) placement on symbol boxes
//! - Orthogonal route planning between grips
//! - Segment hit testing
//! - Drag-to-adjust of stubs and middle segments
//! - Connection lifecycle, persistence and an egui canvas
//!
//! ## Architecture
//!
//! Routing is a pure function of node geometry, the two grips and three
//! adjustment scalars. The [`Diagram`] store caches each connection's
//! polyline and recomputes it when an endpoint, a node or an adjustment
//! changes; rendering only reads the cache.

pub mod adjust;
pub mod config;
pub mod connection;
pub mod diagram;
pub mod document;
pub mod drag;
pub mod interaction;
pub mod mapper;
pub mod node;
pub mod port;
pub mod route;
pub mod ui;

pub use adjust::{AdjustParam, Adjustments};
pub use config::{ConfigError, RoutingConfig};
pub use connection::{Connection, ConnectionId, ConnectionRecord, PortRef};
pub use diagram::{Diagram, DiagramError, NodeGeometry};
pub use document::{DiagramDocument, DocumentError};
pub use drag::DragSession;
pub use hit_test::hit_test;
pub use interaction::CanvasEditor;
pub use node::{CatalogError, Node, NodeId, SymbolCatalog};
pub use port::{Port, Side};
pub use route::{Route, RoutePlanner, RouteShape};
