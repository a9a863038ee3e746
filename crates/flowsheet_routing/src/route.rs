// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rule-based orthogonal routing between two grips.
//!
//! The planner is a pure function of its inputs. It leaves each port
//! through a short stub, then picks one of four shapes from the pair of
//! sides:
//!
//! - **Z-route**: opposite sides facing each other, one perpendicular
//!   mid-segment halfway between the ports
//! - **Detour**: opposite sides whose stubs overlap, routed below (for
//!   horizontal pairs) or right (for vertical pairs) of both boxes
//! - **L-route**: perpendicular sides, one bend
//! - **U-turn**: same side, routed around the union of both boxes
//!
//! The below/right tie-break for overlapping pairs is fixed, not
//! clearance-aware.

use crate::adjust::Adjustments;
use crate::config::RoutingConfig;
use crate::connection::Connection;
use crate::port::Side;
use egui::{Pos2, Rect, Vec2};

/// Shape chosen for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteShape {
    /// Two bends through a perpendicular mid-segment
    ZRoute,
    /// Opposite sides that overlap; three bends around both boxes
    Detour,
    /// Perpendicular sides; one bend
    LRoute,
    /// Same side; three bends around both boxes
    UTurn,
}

/// Everything the planner reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    /// Side the start port faces
    pub start_side: Side,
    /// Side the end port faces, if known; guessed otherwise
    pub end_side: Option<Side>,
    /// User adjustments
    pub adjust: Adjustments,
    /// Start node bounding box
    pub start_rect: Rect,
    /// End node bounding box (or the free-end stand-in)
    pub end_rect: Rect,
    /// Absolute start port position
    pub start: Pos2,
    /// Absolute end position
    pub end: Pos2,
}

/// A computed route
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Shape that was selected
    pub shape: RouteShape,
    /// Side used for the far end
    pub end_side: Side,
    /// Polyline from start to end, possibly with repeated points
    pub points: Vec<Pos2>,
}

/// Guess the side a free end will enter from.
///
/// A target to the right is entered from its left, and so on.
pub fn guess_side(start: Pos2, end: Pos2) -> Side {
    let dx = end.x - start.x;
    let dy = end.y - start.y;

    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            Side::Left
        } else {
            Side::Right
        }
    } else if dy > 0.0 {
        Side::Top
    } else {
        Side::Bottom
    }
}

/// Remove consecutive repeated points
pub fn collapse_duplicates(points: &[Pos2]) -> Vec<Pos2> {
    let mut out: Vec<Pos2> = Vec::with_capacity(points.len());
    for &point in points {
        if out.last() != Some(&point) {
            out.push(point);
        }
    }
    out
}

/// Orthogonal route planner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePlanner {
    stub_length: f32,
    min_stub: f32,
    detour_clearance: f32,
    free_end_size: f32,
}

impl RoutePlanner {
    /// Create a planner from configuration
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            stub_length: config.stub_length,
            min_stub: config.min_stub,
            detour_clearance: config.detour_clearance,
            free_end_size: config.free_end_size,
        }
    }

    /// Stand-in bounding box for an end that follows the pointer
    pub fn free_end_rect(&self, pointer: Pos2) -> Rect {
        Rect::from_center_size(pointer, Vec2::splat(self.free_end_size))
    }

    /// Stub length for a given adjustment, never below the minimum
    pub fn stub_length(&self, adjust: f32) -> f32 {
        (self.stub_length + adjust).max(self.min_stub)
    }

    /// Compute the polyline for a connection.
    ///
    /// `end_abs` is the end port, the snap target, or the pointer,
    /// whichever the connection currently follows.
    pub fn compute_path(
        &self,
        connection: &Connection,
        start_rect: Rect,
        end_rect: Rect,
        start_abs: Pos2,
        end_abs: Pos2,
    ) -> Vec<Pos2> {
        self.route(&RouteRequest {
            start_side: connection.start().side,
            end_side: connection.end_side_hint(),
            adjust: connection.adjustments(),
            start_rect,
            end_rect,
            start: start_abs,
            end: end_abs,
        })
        .points
    }

    /// Run the decision table
    pub fn route(&self, request: &RouteRequest) -> Route {
        let start_side = request.start_side;
        let end_side = request
            .end_side
            .unwrap_or_else(|| guess_side(request.start, request.end));

        let near_start = request.start + start_side.outward() * self.stub_length(request.adjust.start_adjust);
        let near_end = request.end + end_side.outward() * self.stub_length(request.adjust.end_adjust);

        let start_rect = normalized(request.start_rect);
        let end_rect = normalized(request.end_rect);
        let offset = request.adjust.path_offset;
        let off_mid = (self.detour_clearance + offset).max(0.0);

        let below = || start_rect.bottom().max(end_rect.bottom()) + off_mid;
        let above = || start_rect.top().min(end_rect.top()) - off_mid;
        let right_of = || start_rect.right().max(end_rect.right()) + off_mid;
        let left_of = || start_rect.left().min(end_rect.left()) - off_mid;

        // Detours that run along a horizontal / vertical line
        let via_y = |y: f32| vec![Pos2::new(near_start.x, y), Pos2::new(near_end.x, y)];
        let via_x = |x: f32| vec![Pos2::new(x, near_start.y), Pos2::new(x, near_end.y)];

        let (shape, middle) = match (start_side, end_side) {
            (Side::Right, Side::Left) | (Side::Left, Side::Right) => {
                let facing = if start_side == Side::Right {
                    near_start.x < near_end.x
                } else {
                    near_start.x > near_end.x
                };
                if facing {
                    let mid_x = (request.start.x + request.end.x) / 2.0 + offset;
                    (RouteShape::ZRoute, via_x(mid_x))
                } else {
                    (RouteShape::Detour, via_y(below()))
                }
            }
            (Side::Top, Side::Bottom) | (Side::Bottom, Side::Top) => {
                let facing = if start_side == Side::Top {
                    near_start.y > near_end.y
                } else {
                    near_start.y < near_end.y
                };
                if facing {
                    let mid_y = (request.start.y + request.end.y) / 2.0 + offset;
                    (RouteShape::ZRoute, via_y(mid_y))
                } else {
                    (RouteShape::Detour, via_x(right_of()))
                }
            }
            (Side::Right, Side::Right) => (RouteShape::UTurn, via_x(right_of())),
            (Side::Left, Side::Left) => (RouteShape::UTurn, via_x(left_of())),
            (Side::Top, Side::Top) => (RouteShape::UTurn, via_y(above())),
            (Side::Bottom, Side::Bottom) => (RouteShape::UTurn, via_y(below())),
            (Side::Right | Side::Left, Side::Top | Side::Bottom) => {
                (RouteShape::LRoute, vec![Pos2::new(near_start.x, near_end.y)])
            }
            (Side::Top | Side::Bottom, Side::Right | Side::Left) => {
                (RouteShape::LRoute, vec![Pos2::new(near_end.x, near_start.y)])
            }
        };

        tracing::trace!(?shape, %start_side, %end_side, "route planned");

        let mut points = Vec::with_capacity(middle.len() + 4);
        points.push(request.start);
        points.push(near_start);
        points.extend(middle);
        points.push(near_end);
        points.push(request.end);

        Route {
            shape,
            end_side,
            points,
        }
    }
}

impl Default for RoutePlanner {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}

/// Rectangle with `min <= max` on both axes
fn normalized(rect: Rect) -> Rect {
    Rect::from_two_pos(rect.min, rect.max)
}
