// SPDX-License-Identifier: MIT OR Apache-2.0
//! Diagram nodes (placed symbols) and the symbol catalog.

use crate::config::MapperConfig;
use crate::mapper;
use crate::port::{self, Port};
use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Default node size in canvas units
pub const DEFAULT_NODE_SIZE: Vec2 = Vec2::new(50.0, 30.0);

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A symbol placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Catalog symbol name
    pub symbol: String,
    /// Bounding box in canvas space
    pub bounds: Rect,
    /// Grips, indexed by position in this list
    pub ports: Vec<Port>,
    /// Natural size of the symbol image, if known
    #[serde(default)]
    pub intrinsic_size: Option<Vec2>,
}

impl Node {
    /// Create a node with the default grips
    pub fn new(symbol: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id: NodeId::new(),
            symbol: symbol.into(),
            bounds,
            ports: port::default_grips(),
            intrinsic_size: None,
        }
    }

    /// Replace the grip list
    pub fn with_ports(mut self, ports: Vec<Port>) -> Self {
        self.ports = ports;
        self
    }

    /// Set the symbol image size
    pub fn with_intrinsic_size(mut self, size: Vec2) -> Self {
        self.intrinsic_size = Some(size);
        self
    }

    /// Get a port by index
    pub fn port(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    /// Rectangle grips are mapped onto
    pub fn content_rect(&self, config: &MapperConfig) -> Rect {
        mapper::content_rect(self.bounds, self.intrinsic_size, config)
    }

    /// Absolute canvas position of a port
    pub fn port_position(&self, index: usize, config: &MapperConfig) -> Option<Pos2> {
        let port = self.port(index)?;
        Some(mapper::map_port_to_absolute(port, self.content_rect(config)))
    }

    /// Absolute positions of every port, in index order
    pub fn port_positions(&self, config: &MapperConfig) -> impl Iterator<Item = (usize, Pos2)> + '_ {
        let rect = self.content_rect(config);
        self.ports
            .iter()
            .enumerate()
            .map(move |(index, port)| (index, mapper::map_port_to_absolute(port, rect)))
    }
}

/// Catalog entry for a symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDef {
    /// Symbol name
    pub name: String,
    /// Validated grips
    pub grips: Vec<Port>,
    /// Natural image size, if the catalog provides one
    pub intrinsic_size: Option<Vec2>,
    /// Size of freshly placed instances
    pub default_size: Vec2,
}

impl SymbolDef {
    /// Build from a catalog JSON object.
    ///
    /// Returns `None` when the entry has no name. Grips go through
    /// [`port::parse_grips`], so bad grip data never rejects the symbol.
    pub fn from_json(entry: &Value) -> Option<Self> {
        let name = entry.get("name").and_then(Value::as_str)?.trim();
        if name.is_empty() {
            return None;
        }

        let dimension = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_f64)
                .map(|v| v as f32)
                .filter(|v| v.is_finite() && *v > 0.0)
        };

        let intrinsic_size = match (dimension("image_width"), dimension("image_height")) {
            (Some(w), Some(h)) => Some(Vec2::new(w, h)),
            _ => None,
        };
        let default_size = Vec2::new(
            dimension("width").unwrap_or(DEFAULT_NODE_SIZE.x),
            dimension("height").unwrap_or(DEFAULT_NODE_SIZE.y),
        );

        Some(Self {
            name: name.to_string(),
            grips: port::parse_grips(entry.get("grips").unwrap_or(&Value::Null)),
            intrinsic_size,
            default_size,
        })
    }
}

/// Symbols available for placement
pub struct SymbolCatalog {
    /// Symbols by name
    symbols: indexmap::IndexMap<String, SymbolDef>,
}

impl SymbolCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            symbols: indexmap::IndexMap::new(),
        }
    }

    /// Parse a catalog given as a JSON array of symbol objects
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(text)?;
        let mut catalog = Self::new();
        for entry in value.as_array().map(Vec::as_slice).unwrap_or_default() {
            match SymbolDef::from_json(entry) {
                Some(symbol) => catalog.register(symbol),
                None => tracing::warn!("Skipping unnamed catalog entry"),
            }
        }
        tracing::debug!("Symbol catalog loaded with {} entries", catalog.len());
        Ok(catalog)
    }

    /// Register a symbol
    pub fn register(&mut self, symbol: SymbolDef) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    /// Get a symbol by name
    pub fn get(&self, name: &str) -> Option<&SymbolDef> {
        self.symbols.get(name)
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Place a symbol with its top-left corner at `position`
    pub fn create_node(&self, name: &str, position: Pos2) -> Option<Node> {
        let symbol = self.get(name)?;
        let node = Node::new(&symbol.name, Rect::from_min_size(position, symbol.default_size))
            .with_ports(symbol.grips.clone());
        Some(match symbol.intrinsic_size {
            Some(size) => node.with_intrinsic_size(size),
            None => node,
        })
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Error when reading a symbol catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog is not valid JSON
    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}
