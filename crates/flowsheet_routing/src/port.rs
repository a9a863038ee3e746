// SPDX-License-Identifier: MIT OR Apache-2.0
//! Grip (port) definitions for diagram symbols.
//!
//! Grips come from the symbol catalog as loosely typed JSON. They are
//! validated once, here, into [`Port`] values so the router never sees a
//! missing key or an unknown side.

use egui::Vec2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Side of a node a port faces.
///
/// Serialized as its lowercase label. Reading is lenient: an unknown
/// label becomes [`Side::Right`], as in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Visual top edge
    Top,
    /// Right edge
    Right,
    /// Visual bottom edge
    Bottom,
    /// Left edge
    Left,
}

impl Side {
    /// Parse a catalog side label (case-insensitive)
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            _ => None,
        }
    }

    /// Parse a label, falling back to [`Side::Right`] for unknown ones
    pub fn parse_or_right(label: &str) -> Self {
        Self::parse(label).unwrap_or_else(|| {
            tracing::warn!("Unknown side {label:?}, defaulting to right");
            Self::Right
        })
    }

    /// Catalog label for this side
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }

    /// Unit vector pointing away from the node (canvas space, y grows down)
    pub fn outward(&self) -> Vec2 {
        match self {
            Self::Top => Vec2::new(0.0, -1.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::Bottom => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
        }
    }

    /// Whether a stub leaving this side runs horizontally
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Side {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse_or_right(&label))
    }
}

/// A grip on a symbol.
///
/// Positions are percentages of the symbol's render rectangle. `y_percent`
/// counts from the bottom: 100 is the visual top edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Horizontal position, 0 = left edge, 100 = right edge
    #[serde(rename = "x")]
    pub x_percent: f32,
    /// Vertical position, 0 = bottom edge, 100 = top edge
    #[serde(rename = "y")]
    pub y_percent: f32,
    /// Preferred exit side
    pub side: Side,
}

impl Port {
    /// Create a new port
    pub fn new(x_percent: f32, y_percent: f32, side: Side) -> Self {
        Self {
            x_percent,
            y_percent,
            side,
        }
    }
}

/// Grips used when a symbol has none: one on each horizontal edge
pub fn default_grips() -> Vec<Port> {
    vec![
        Port::new(0.0, 50.0, Side::Left),
        Port::new(100.0, 50.0, Side::Right),
    ]
}

/// Error when reading a grip list
#[derive(Debug, thiserror::Error)]
pub enum GripError {
    /// The grip list is not valid JSON
    #[error("Invalid grip JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a grip list given as JSON text.
///
/// Invalid entries are dropped; an empty result falls back to
/// [`default_grips`].
pub fn parse_grips_str(json: &str) -> Result<Vec<Port>, GripError> {
    let value: Value = serde_json::from_str(json)?;
    Ok(parse_grips(&value))
}

/// Validate a catalog grip list.
///
/// Accepts an array of `{x, y, side}` objects or a string holding such an
/// array. Entries without finite in-range coordinates are rejected, unknown
/// side labels default to `right`, and a missing or empty list yields
/// [`default_grips`].
pub fn parse_grips(value: &Value) -> Vec<Port> {
    let entries = match value {
        Value::Array(entries) => entries.as_slice(),
        Value::String(text) => {
            return match serde_json::from_str::<Value>(text) {
                Ok(inner @ Value::Array(_)) => parse_grips(&inner),
                Ok(_) | Err(_) => {
                    tracing::warn!("Grip string is not a JSON array, using default grips");
                    default_grips()
                }
            };
        }
        _ => &[],
    };

    let ports: Vec<Port> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| parse_grip(index, entry))
        .collect();

    if ports.is_empty() {
        default_grips()
    } else {
        ports
    }
}

fn parse_grip(index: usize, entry: &Value) -> Option<Port> {
    let percent = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .filter(|v| v.is_finite() && (0.0..=100.0).contains(v))
    };

    let (Some(x), Some(y)) = (percent("x"), percent("y")) else {
        tracing::warn!("Rejecting grip {index}: coordinates missing or outside 0..=100");
        return None;
    };

    let side = entry
        .get("side")
        .and_then(Value::as_str)
        .map_or(Side::Right, Side::parse_or_right);

    Some(Port::new(x, y, side))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_array() {
        let grips = parse_grips(&json!([
            {"x": 0, "y": 50, "side": "left"},
            {"x": 50, "y": 100, "side": "top"},
        ]));
        assert_eq!(grips.len(), 2);
        assert_eq!(grips[1], Port::new(50.0, 100.0, Side::Top));
    }

    #[test]
    fn test_parse_string_encoded_list() {
        let grips = parse_grips(&json!("[{\"x\": 100, \"y\": 25, \"side\": \"Bottom\"}]"));
        assert_eq!(grips, vec![Port::new(100.0, 25.0, Side::Bottom)]);
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let grips = parse_grips(&json!([
            {"x": 150, "y": 50, "side": "left"},
            {"y": 50, "side": "left"},
            {"x": 20, "y": 0, "side": "diagonal"},
        ]));
        assert_eq!(grips, vec![Port::new(20.0, 0.0, Side::Right)]);
    }

    #[test]
    fn test_defaults_when_empty() {
        assert_eq!(parse_grips(&json!([])), default_grips());
        assert_eq!(parse_grips(&Value::Null), default_grips());
        assert_eq!(parse_grips(&json!("not json")), default_grips());
    }

    #[test]
    fn test_parse_str_reports_bad_json() {
        assert!(parse_grips_str("{").is_err());
        assert_eq!(parse_grips_str("[]").unwrap(), default_grips());
    }

    #[test]
    fn test_side_outward() {
        assert_eq!(Side::Top.outward(), Vec2::new(0.0, -1.0));
        assert!(Side::Left.is_horizontal());
        assert!(!Side::Bottom.is_horizontal());
        assert_eq!(Side::parse(" RIGHT "), Some(Side::Right));
    }

    #[test]
    fn test_side_serde_is_lenient() {
        assert_eq!(serde_json::to_string(&Side::Bottom).unwrap(), "\"bottom\"");
        assert_eq!(serde_json::from_str::<Side>("\"Top\"").unwrap(), Side::Top);
        assert_eq!(serde_json::from_str::<Side>("\"diagonal\"").unwrap(), Side::Right);
        assert!(serde_json::from_str::<Side>("3").is_err());

        let port: Port = ron::from_str("(x: 0.0, y: 50.0, side: \"sideways\")").unwrap();
        assert_eq!(port, Port::new(0.0, 50.0, Side::Right));
        assert_eq!(ron::to_string(&Side::Left).unwrap(), "\"left\"");
    }
}
