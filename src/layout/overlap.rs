use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};

use super::projection::Viewport;
use super::spatial::DistanceBucket;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapConfig {
    /// Smallest vertical gap between markers.
    pub min_dist: f32,
    /// How many preceding buckets are checked.
    pub lookback: usize,
    /// Preceding buckets further than this (in distance units) are ignored.
    pub window: f64,
    pub max_attempts: usize,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            min_dist: 55.0,
            lookback: 7,
            window: 140.0,
            max_attempts: 10,
        }
    }
}

/// Screen-space rectangle the distance axis is drawn in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisFrame {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    /// Full height used for the evenly spaced baseline.
    pub height: f32,
}

impl AxisFrame {
    pub fn from_viewport(viewport: &Viewport) -> Self {
        let (left, right) = viewport.drawable_x();
        let (top, bottom) = viewport.drawable_y();
        Self {
            left,
            right,
            top,
            bottom,
            height: viewport.height,
        }
    }

    pub fn x_for(&self, distance: f64, max_distance: f64) -> f32 {
        if max_distance.is_nan() || max_distance <= 0.0 {
            return self.left;
        }
        self.left + (self.right - self.left) * (distance / max_distance) as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedPosition {
    pub index: usize,
    pub position: Vec2,
    /// `false` when the attempt budget ran out and `position` may still
    /// overlap a neighbour.
    pub resolved: bool,
}

/// Offset for attempt `k`: 0, +m, -m, +2m, -2m, ...
fn candidate_offset(attempt: usize, min_dist: f32) -> f32 {
    if attempt == 0 {
        return 0.0;
    }
    let step = attempt.div_ceil(2) as f32 * min_dist;
    if attempt % 2 == 1 { step } else { -step }
}

/// Places every bucket member on the distance axis. Each bucket gets an
/// evenly spaced vertical baseline; a member is moved off it when a marker in
/// a nearby preceding bucket, or an earlier member of its own bucket, is
/// within `min_dist` vertically. Output order follows `buckets`.
pub fn resolve(
    buckets: &[DistanceBucket],
    max_distance: f64,
    frame: &AxisFrame,
    config: &OverlapConfig,
) -> Vec<ResolvedPosition> {
    let mut placed_ys: Vec<Vec<f32>> = Vec::with_capacity(buckets.len());
    let mut resolved = Vec::new();

    for (bucket_index, bucket) in buckets.iter().enumerate() {
        let x = frame.x_for(bucket.distance, max_distance);
        let first_nearby = bucket_index.saturating_sub(config.lookback);
        let mut nearby = Vec::new();
        for previous in first_nearby..bucket_index {
            if (bucket.distance - buckets[previous].distance).abs() < config.window {
                nearby.extend_from_slice(&placed_ys[previous]);
            }
        }

        let spacing = frame.height / (bucket.members.len() + 1) as f32;
        let mut own = Vec::with_capacity(bucket.members.len());
        for (position, &index) in bucket.members.iter().enumerate() {
            let baseline = spacing * (position + 1) as f32;
            let clear = |y: f32| {
                nearby
                    .iter()
                    .chain(own.iter())
                    .all(|other: &f32| (other - y).abs() >= config.min_dist)
            };

            let mut y = baseline.clamp(frame.top, frame.bottom);
            let mut ok = clear(y);
            let mut attempt = 0;
            while !ok && attempt < config.max_attempts {
                attempt += 1;
                y = (baseline + candidate_offset(attempt, config.min_dist))
                    .clamp(frame.top, frame.bottom);
                ok = clear(y);
            }

            own.push(y);
            resolved.push(ResolvedPosition {
                index,
                position: vec2(x, y),
                resolved: ok,
            });
        }
        placed_ys.push(own);
    }

    resolved
}
