use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 100.0,
            right: 50.0,
            top: 50.0,
            bottom: 50.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            margins: Margins::default(),
        }
    }

    /// Converts a screen-space point (origin at top-left) to world space
    /// (origin at the viewport centre).
    pub fn to_world(&self, screen: Vec2) -> Vec2 {
        screen - vec2(self.width, self.height) * 0.5
    }

    pub fn drawable_x(&self) -> (f32, f32) {
        (self.margins.left, self.width - self.margins.right)
    }

    pub fn drawable_y(&self) -> (f32, f32) {
        (self.margins.top, self.height - self.margins.bottom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    pub min: GeoPoint,
    pub max: GeoPoint,
}

impl GeoBounds {
    /// Bounding box of the valid points; `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for point in points.into_iter().filter(|point| point.is_valid()) {
            bounds = Some(match bounds {
                None => Self {
                    min: point,
                    max: point,
                },
                Some(current) => Self {
                    min: GeoPoint::new(
                        current.min.latitude.min(point.latitude),
                        current.min.longitude.min(point.longitude),
                    ),
                    max: GeoPoint::new(
                        current.max.latitude.max(point.latitude),
                        current.max.longitude.max(point.longitude),
                    ),
                },
            });
        }
        bounds
    }
}

/// Linear map from `domain` onto `range`; a zero-width domain maps to the
/// middle of the range.
fn scale_linear(value: f64, domain: (f64, f64), range: (f32, f32)) -> f32 {
    let span = domain.1 - domain.0;
    if span.abs() < f64::EPSILON {
        return (range.0 + range.1) * 0.5;
    }
    let t = (value - domain.0) / span;
    range.0 + (range.1 - range.0) * t as f32
}

/// Equirectangular projection of the data bounding box into the drawable
/// area. Longitude grows rightward, latitude grows upward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoProjection {
    bounds: GeoBounds,
    viewport: Viewport,
}

impl GeoProjection {
    pub fn new(bounds: GeoBounds, viewport: Viewport) -> Self {
        Self { bounds, viewport }
    }

    pub fn fit(points: impl IntoIterator<Item = GeoPoint>, viewport: Viewport) -> Option<Self> {
        GeoBounds::from_points(points).map(|bounds| Self::new(bounds, viewport))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Screen-space coordinate, origin at the top-left of the viewport.
    pub fn project_screen(&self, point: GeoPoint) -> Vec2 {
        let (left, right) = self.viewport.drawable_x();
        let (top, bottom) = self.viewport.drawable_y();
        let x = scale_linear(
            point.longitude,
            (self.bounds.min.longitude, self.bounds.max.longitude),
            (left, right),
        );
        let y = scale_linear(
            point.latitude,
            (self.bounds.min.latitude, self.bounds.max.latitude),
            (bottom, top),
        );
        vec2(x, y)
    }

    /// World-space coordinate, origin at the viewport centre.
    pub fn project(&self, point: GeoPoint) -> Vec2 {
        self.viewport.to_world(self.project_screen(point))
    }
}

/// Ring radius for the radial view: linear in `distance / max_distance`
/// between `inner` and `outer`.
pub fn radial_target(distance: f64, max_distance: f64, inner: f32, outer: f32) -> f32 {
    if max_distance.is_nan() || max_distance <= 0.0 || distance.is_nan() {
        return inner;
    }
    let t = (distance / max_distance).clamp(0.0, 1.0) as f32;
    inner + (outer - inner) * t
}
