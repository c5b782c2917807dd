//! Pan/zoom state and the externally persisted slice of the interactive
//! state.

use physalia_anim::ViewTransform;
use physalia_graph::geom::{Point, Rect, Size, Transform, point, size, vector};
use serde::{Deserialize, Serialize};

/// Pan/zoom state of the hosting view.
///
/// `center` is the content-space point shown in the middle of the port and
/// `zoom` scales content units to port pixels. `port` is the host window's
/// size in pixels; the fitting helpers need it, the engine never reads it
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f64,
    pub center: Point,
    pub port: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            center: Point::zero(),
            port: size(800.0, 600.0),
        }
    }
}

impl Viewport {
    /// Content-to-port transform.
    pub fn matrix(&self) -> Transform {
        Transform::translation(-self.center.x, -self.center.y)
            .then_scale(self.zoom, self.zoom)
            .then_translate(vector(self.port.width / 2.0, self.port.height / 2.0))
    }

    /// Content-space rectangle currently visible through the port.
    pub fn view_rect(&self) -> Rect {
        let w = self.port.width / self.zoom;
        let h = self.port.height / self.zoom;
        Rect::new(
            point(self.center.x - w / 2.0, self.center.y - h / 2.0),
            size(w, h),
        )
    }

    /// Centers on `bounds` and zooms out just far enough to show all of it.
    /// Never zooms in past 1:1, so small diagrams stay at natural size.
    pub fn fit(&mut self, bounds: Rect) {
        self.center = bounds.center();
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return;
        }
        let zx = self.port.width / bounds.width();
        let zy = self.port.height / bounds.height();
        self.zoom = zx.min(zy).min(1.0);
    }

    /// Pans the smallest distance that brings `rect` fully into view.
    /// Rectangles larger than the view are centered instead.
    pub fn ensure_visible(&mut self, rect: Rect) {
        let view = self.view_rect();
        if rect.width() > view.width() || rect.height() > view.height() {
            self.center = rect.center();
            return;
        }
        let mut dx = 0.0;
        if rect.min_x() < view.min_x() {
            dx = rect.min_x() - view.min_x();
        } else if rect.max_x() > view.max_x() {
            dx = rect.max_x() - view.max_x();
        }
        let mut dy = 0.0;
        if rect.min_y() < view.min_y() {
            dy = rect.min_y() - view.min_y();
        } else if rect.max_y() > view.max_y() {
            dy = rect.max_y() - view.max_y();
        }
        self.center += vector(dx, dy);
    }

    /// The slice of the viewport captured into diagram snapshots.
    pub fn transform(&self) -> ViewTransform {
        ViewTransform {
            zoom: self.zoom,
            center: self.center,
        }
    }
}

/// Externally persisted slice of the interactive state.
///
/// Disclosure is stored as the list of expanded container ids, so restoring
/// collapses every container absent from it. Geometry is flattened to plain
/// floats to keep the serialized form independent of the geometry types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub zoom: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub expanded: Vec<String>,
}
