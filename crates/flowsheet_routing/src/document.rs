// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saved diagram documents.

use crate::config::RoutingConfig;
use crate::connection::{Connection, ConnectionRecord};
use crate::diagram::Diagram;
use crate::node::Node;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current document format version
pub const DOCUMENT_VERSION: u32 = 1;

/// Serializable form of a diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramDocument {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Diagram name
    #[serde(default)]
    pub name: String,
    /// Nodes in paint order
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Finalized connections
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

impl DiagramDocument {
    /// Snapshot a diagram
    pub fn from_diagram(diagram: &Diagram) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            name: diagram.name.clone(),
            nodes: diagram.nodes().cloned().collect(),
            connections: diagram.connections().filter_map(Connection::to_record).collect(),
        }
    }

    /// Rebuild a diagram.
    ///
    /// Saved waypoints are kept as the displayed path until something
    /// triggers a re-route; records without waypoints are routed now.
    /// Records pointing at missing nodes or grips are skipped.
    pub fn into_diagram(self, config: RoutingConfig) -> Diagram {
        let mut diagram = Diagram::with_config(self.name, config);
        for node in self.nodes {
            diagram.add_node(node);
        }

        for record in self.connections {
            let ends = diagram
                .port_ref(record.source_node_id, record.source_grip_index)
                .and_then(|start| Ok((start, diagram.port_ref(record.target_node_id, record.target_grip_index)?)));
            let (start, end) = match ends {
                Ok(ends) => ends,
                Err(e) => {
                    tracing::warn!("Skipping connection {:?}: {e}", record.id);
                    continue;
                }
            };

            let mut connection = match Connection::finalized(record.id, start, end, record.adjustments()) {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!("Skipping connection {:?}: {e}", record.id);
                    continue;
                }
            };

            if record.waypoints.is_empty() {
                diagram.route_draft(&mut connection);
            } else {
                connection.set_path(record.waypoints);
            }
            diagram.insert_loaded(connection);
        }

        tracing::debug!(
            "Loaded diagram '{}' ({} nodes, {} connections)",
            diagram.name,
            diagram.node_count(),
            diagram.connection_count()
        );
        diagram
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, DocumentError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, DocumentError> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(s: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a document, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let format = DocumentFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;
        let document = match format {
            DocumentFormat::Ron => Self::from_ron(&contents)?,
            DocumentFormat::Json => Self::from_json(&contents)?,
        };
        tracing::info!("Loaded document from {:?}", path);
        Ok(document)
    }

    /// Save a document, picking the format from the file extension
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let contents = match DocumentFormat::from_path(path)? {
            DocumentFormat::Ron => self.to_ron()?,
            DocumentFormat::Json => self.to_json()?,
        };
        std::fs::write(path, contents)?;
        tracing::info!("Saved document to {:?}", path);
        Ok(())
    }
}

/// On-disk document encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.ron`
    Ron,
    /// `.json`
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("ron") => Ok(Self::Ron),
            Some("json") => Ok(Self::Json),
            _ => Err(DocumentError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Error reading or writing a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization failed
    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Extension is neither `.ron` nor `.json`
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
}
