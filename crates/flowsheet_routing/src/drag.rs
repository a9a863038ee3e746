// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drag-to-adjust mapping.
//!
//! Which scalar moves a grabbed segment depends on the route shape, so
//! instead of a per-shape table the session measures it: each scalar is
//! nudged once, the route recomputed, and the scalar that moves the
//! segment's midpoint the most becomes the drag axis. That costs three
//! extra routes per drag start, each constant-time.

use crate::adjust::{AdjustParam, Adjustments};
use crate::config::RoutingConfig;
use crate::connection::{Connection, ConnectionId};
use crate::diagram::{Diagram, DiagramError};
use crate::hit_test::segment_midpoint;
use egui::{Pos2, Vec2};

/// Result of probing the scalars for one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensitivity {
    /// Scalar that moves the segment the most
    pub param: AdjustParam,
    /// Midpoint displacement per unit of `param`
    pub vector: Vec2,
}

/// Probe each scalar and pick the one that moves `segment` the most.
///
/// `route` recomputes the path for a set of adjustments. Scalars are
/// tried in [`AdjustParam::ALL`] order; on a tie the earlier one wins.
pub fn probe_sensitivity<F>(
    base_path: &[Pos2],
    segment: usize,
    base: Adjustments,
    step: f32,
    mut route: F,
) -> Sensitivity
where
    F: FnMut(Adjustments) -> Vec<Pos2>,
{
    let base_mid = segment_midpoint(base_path, segment);
    let mut best = Sensitivity {
        param: AdjustParam::PathOffset,
        vector: Vec2::ZERO,
    };
    let mut best_mag_sq = -1.0;

    for param in AdjustParam::ALL {
        let probed = route(base.nudged(param, step));
        let vector = match (base_mid, segment_midpoint(&probed, segment)) {
            (Some(before), Some(after)) => (after - before) / step,
            _ => Vec2::ZERO,
        };

        let mag_sq = vector.length_sq();
        if mag_sq > best_mag_sq {
            best_mag_sq = mag_sq;
            best = Sensitivity { param, vector };
        }
    }

    best
}

/// An in-progress drag of one connection segment
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    connection: ConnectionId,
    segment: usize,
    sensitivity: Sensitivity,
    start_pointer: Pos2,
    start_value: f32,
    min_sensitivity_sq: f32,
}

impl DragSession {
    /// Start dragging `segment` of `connection` from `pointer`.
    ///
    /// The connection's cached path is the baseline; `route` recomputes
    /// the path under perturbed adjustments without touching the
    /// connection itself.
    pub fn begin<F>(
        connection: &Connection,
        segment: usize,
        pointer: Pos2,
        config: &RoutingConfig,
        route: F,
    ) -> Self
    where
        F: FnMut(Adjustments) -> Vec<Pos2>,
    {
        let base = connection.adjustments();
        let sensitivity = probe_sensitivity(connection.path(), segment, base, config.probe_step, route);

        tracing::debug!(
            connection = ?connection.id,
            segment,
            param = sensitivity.param.name(),
            sensitivity = ?sensitivity.vector,
            "drag axis selected"
        );

        Self {
            connection: connection.id,
            segment,
            sensitivity,
            start_pointer: pointer,
            start_value: base.get(sensitivity.param),
            min_sensitivity_sq: config.min_sensitivity_sq,
        }
    }

    /// Connection being dragged
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Grabbed segment index
    pub fn segment(&self) -> usize {
        self.segment
    }

    /// Scalar the drag controls
    pub fn param(&self) -> AdjustParam {
        self.sensitivity.param
    }

    /// Measured sensitivity
    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    /// Value of the active scalar for the current pointer position.
    ///
    /// The pointer offset is projected onto the sensitivity vector.
    /// Returns `None` when the segment does not respond to any scalar.
    pub fn value_for(&self, pointer: Pos2) -> Option<f32> {
        let vector = self.sensitivity.vector;
        let mag_sq = vector.length_sq();
        if mag_sq <= self.min_sensitivity_sq {
            return None;
        }

        let delta = pointer - self.start_pointer;
        Some(self.start_value + delta.dot(vector) / mag_sq)
    }

    /// Adjustments after moving the pointer to `pointer`
    pub fn apply(&self, pointer: Pos2, current: Adjustments) -> Option<Adjustments> {
        let value = self.value_for(pointer)?;
        let mut next = current;
        next.set(self.sensitivity.param, value);
        Some(next)
    }

    /// Follow the pointer: set the active scalar and re-route.
    ///
    /// Returns `Ok(false)` when the grabbed segment does not respond to
    /// any scalar and nothing changed.
    pub fn update(&self, pointer: Pos2, diagram: &mut Diagram) -> Result<bool, DiagramError> {
        let current = diagram
            .connection(self.connection)
            .ok_or(DiagramError::ConnectionNotFound(self.connection))?
            .adjustments();

        match self.apply(pointer, current) {
            Some(next) => {
                diagram.set_adjustments(self.connection, next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
