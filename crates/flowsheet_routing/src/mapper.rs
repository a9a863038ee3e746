// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port percentage -> canvas coordinate mapping.

use crate::config::{FitMode, MapperConfig};
use crate::port::Port;
use egui::{Pos2, Rect, Vec2};

/// Map a port onto its node's render rectangle.
///
/// Y is inverted: `y_percent = 100` lands on the top edge. Percentages
/// outside `0..=100` extrapolate past the edges.
pub fn map_port_to_absolute(port: &Port, render_rect: Rect) -> Pos2 {
    Pos2::new(
        render_rect.min.x + (port.x_percent / 100.0) * render_rect.width(),
        render_rect.min.y + ((100.0 - port.y_percent) / 100.0) * render_rect.height(),
    )
}

/// Rectangle the symbol is drawn into, and the one grips are mapped onto.
///
/// The node's bounding box loses `port_margin` on every side (keeping at
/// least one unit per axis). With [`FitMode::Contain`] and a known image
/// size the result is further shrunk to the image aspect ratio and centred,
/// so 0% and 100% sit on the visible symbol edges.
pub fn content_rect(bounds: Rect, intrinsic_size: Option<Vec2>, config: &MapperConfig) -> Rect {
    let margin = config.port_margin;
    let size = Vec2::new(
        (bounds.width() - margin * 2.0).max(1.0),
        (bounds.height() - margin * 2.0).max(1.0),
    );
    let area = Rect::from_min_size(bounds.min + Vec2::splat(margin), size);

    match (config.fit, intrinsic_size) {
        (FitMode::Contain, Some(image)) if image.x > 0.0 && image.y > 0.0 => {
            fit_contain(area, image)
        }
        _ => area,
    }
}

fn fit_contain(area: Rect, image: Vec2) -> Rect {
    let aspect = image.x / image.y;
    let container = area.width() / area.height();

    if container > aspect {
        // Wider than the image: full height, centred horizontally
        let width = area.height() * aspect;
        Rect::from_min_size(
            Pos2::new(area.min.x + (area.width() - width) / 2.0, area.min.y),
            Vec2::new(width, area.height()),
        )
    } else {
        let height = area.width() / aspect;
        Rect::from_min_size(
            Pos2::new(area.min.x, area.min.y + (area.height() - height) / 2.0),
            Vec2::new(area.width(), height),
        )
    }
}
