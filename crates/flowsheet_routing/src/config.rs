// SPDX-License-Identifier: MIT OR Apache-2.0
//! Routing and interaction tuning.
//!
//! All values are in canvas units. The defaults reproduce the editor's
//! stock behaviour; a RON file can override any subset of them.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a symbol image is placed inside its node's content area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitMode {
    /// Fill the content area, ignoring the image aspect ratio
    #[default]
    Stretch,
    /// Scale uniformly to fit and centre the image
    Contain,
}

/// Coordinate mapper settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Margin reserved around the symbol for port markers
    pub port_margin: f32,
    /// Symbol placement inside the content area
    pub fit: FitMode,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            port_margin: 6.0,
            fit: FitMode::Stretch,
        }
    }
}

/// Route planner and interaction settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Stub length before user adjustment
    pub stub_length: f32,
    /// Shortest stub the planner will emit
    pub min_stub: f32,
    /// Distance kept between a detour and the boxes it avoids
    pub detour_clearance: f32,
    /// Side length of the stand-in box around a free (dragged) end
    pub free_end_size: f32,
    /// Pointer distance that still counts as touching a path segment
    pub hit_tolerance: f32,
    /// Manhattan distance that counts as touching a port
    pub port_hit_radius: f32,
    /// Manhattan distance at which a dragged end snaps to a port
    pub snap_radius: f32,
    /// Growth applied to node boxes when looking for snap candidates
    pub snap_margin: f32,
    /// Perturbation used when probing scalar sensitivity
    pub probe_step: f32,
    /// Squared sensitivity below which a drag is ignored
    pub min_sensitivity_sq: f32,
    /// Coordinate mapper settings
    pub mapper: MapperConfig,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            stub_length: 20.0,
            min_stub: 10.0,
            detour_clearance: 20.0,
            free_end_size: 20.0,
            hit_tolerance: 5.0,
            port_hit_radius: 10.0,
            snap_radius: 20.0,
            snap_margin: 30.0,
            probe_step: 1.0,
            min_sensitivity_sq: 0.001,
            mapper: MapperConfig::default(),
        }
    }
}

impl RoutingConfig {
    /// Parse from RON text; missing fields keep their defaults
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&text)?;
        tracing::info!("Loaded routing config from {}", path.display());
        Ok(config)
    }
}

/// Error when loading or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON syntax or schema error
    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),
}
