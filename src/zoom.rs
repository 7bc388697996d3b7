use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};

use crate::layout::spatial::SpatialItem;

pub const DEFAULT_THRESHOLD: f32 = 2.0;
pub const MEMBER_RING_RADIUS: f32 = 30.0;
pub const ZOOM_EXTENT: (f32, f32) = (1.0, 5.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomTier {
    Clustered,
    Expanded,
}

/// `k >= threshold` expands.
pub fn tier_for(k: f32, threshold: f32) -> ZoomTier {
    if k >= threshold {
        ZoomTier::Expanded
    } else {
        ZoomTier::Clustered
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomSettings {
    pub threshold: f32,
    /// Half-width of the band around `threshold` in which the previous tier
    /// is kept. Zero gives the stateless `k >= threshold` rule.
    pub hysteresis: f32,
}

impl ZoomSettings {
    /// Smallest zoom that expands clusters from either tier, past the
    /// hysteresis band.
    pub fn expanding_zoom(&self) -> f32 {
        (self.threshold + self.hysteresis.max(0.0)).next_up()
    }
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            hysteresis: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ZoomLevelController {
    settings: ZoomSettings,
    tier: Option<ZoomTier>,
}

impl Default for ZoomLevelController {
    fn default() -> Self {
        Self::new(ZoomSettings::default())
    }
}

impl ZoomLevelController {
    pub fn new(settings: ZoomSettings) -> Self {
        Self {
            settings: ZoomSettings {
                threshold: settings.threshold,
                hysteresis: settings.hysteresis.max(0.0),
            },
            tier: None,
        }
    }

    pub fn settings(&self) -> ZoomSettings {
        self.settings
    }

    /// Re-evaluates the tier for a new zoom factor. Returns the tier and
    /// whether it changed.
    pub fn update(&mut self, k: f32) -> (ZoomTier, bool) {
        let ZoomSettings {
            threshold,
            hysteresis,
        } = self.settings;

        let next = match self.tier {
            Some(current) if hysteresis > 0.0 && (k - threshold).abs() < hysteresis => current,
            _ => tier_for(k, threshold),
        };
        let changed = self.tier != Some(next);
        self.tier = Some(next);
        (next, changed)
    }

    pub fn tier(&self) -> ZoomTier {
        self.tier.unwrap_or(ZoomTier::Clustered)
    }
}

/// Offsets of `count` members around a dissolved cluster; member `i` sits at
/// angle `2π·i/count`.
pub fn member_offsets(count: usize, radius: f32) -> Vec<Vec2> {
    (0..count)
        .map(|index| {
            let angle = TAU * index as f32 / count as f32;
            vec2(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Marker {
    Single {
        index: usize,
        position: Vec2,
    },
    /// A cluster drawn as one marker sized by `member_count`.
    Aggregate {
        members: Vec<usize>,
        position: Vec2,
        member_count: usize,
    },
    /// A cluster member drawn on its own after dissolution.
    Member {
        index: usize,
        position: Vec2,
        cluster_position: Vec2,
    },
}

impl Marker {
    pub fn position(&self) -> Vec2 {
        match self {
            Self::Single { position, .. }
            | Self::Aggregate { position, .. }
            | Self::Member { position, .. } => *position,
        }
    }

    pub fn indices(&self) -> &[usize] {
        match self {
            Self::Single { index, .. } | Self::Member { index, .. } => std::slice::from_ref(index),
            Self::Aggregate { members, .. } => members,
        }
    }
}

/// Drawable markers for `items` at the given tier. `positions[i]` is the
/// current coordinate of `items[i]`.
pub fn present(items: &[SpatialItem], positions: &[Vec2], tier: ZoomTier) -> Vec<Marker> {
    let mut markers = Vec::with_capacity(items.len());
    for (item, &position) in items.iter().zip(positions) {
        match item {
            SpatialItem::Single { index, .. } => markers.push(Marker::Single {
                index: *index,
                position,
            }),
            SpatialItem::Cluster(cluster) => match tier {
                ZoomTier::Clustered => markers.push(Marker::Aggregate {
                    members: cluster.members.clone(),
                    position,
                    member_count: cluster.member_count(),
                }),
                ZoomTier::Expanded => {
                    let offsets = member_offsets(cluster.member_count(), MEMBER_RING_RADIUS);
                    markers.extend(cluster.members.iter().zip(offsets).map(
                        |(&index, offset)| Marker::Member {
                            index,
                            position: position + offset,
                            cluster_position: position,
                        },
                    ));
                }
            },
        }
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::layout::spatial::build_clusters;

    const PARIS: GeoPoint = GeoPoint::new(48.8566, 2.3522);

    #[test]
    fn threshold_itself_expands() {
        assert_eq!(tier_for(2.0, 2.0), ZoomTier::Expanded);
        assert_eq!(tier_for(1.999, 2.0), ZoomTier::Clustered);
        assert_eq!(tier_for(5.0, 2.0), ZoomTier::Expanded);
    }

    #[test]
    fn stateless_controller_follows_k_directly() {
        let mut controller = ZoomLevelController::default();
        assert_eq!(controller.tier(), ZoomTier::Clustered);
        assert_eq!(controller.update(1.0), (ZoomTier::Clustered, true));
        assert_eq!(controller.update(2.0), (ZoomTier::Expanded, true));
        assert_eq!(controller.update(1.99), (ZoomTier::Clustered, true));
        assert_eq!(controller.update(1.5), (ZoomTier::Clustered, false));
    }

    #[test]
    fn hysteresis_band_holds_the_previous_tier() {
        let mut controller = ZoomLevelController::new(ZoomSettings {
            threshold: 2.0,
            hysteresis: 0.25,
        });
        assert_eq!(controller.update(1.9).0, ZoomTier::Clustered);
        assert_eq!(controller.update(2.1).0, ZoomTier::Clustered);
        assert_eq!(controller.update(2.3).0, ZoomTier::Expanded);
        assert_eq!(controller.update(1.8).0, ZoomTier::Expanded);
        assert_eq!(controller.update(1.7).0, ZoomTier::Clustered);
    }

    #[test]
    fn expanding_zoom_clears_the_hysteresis_band() {
        for hysteresis in [0.0, 0.25, 0.3, 0.7] {
            let settings = ZoomSettings {
                threshold: 2.0,
                hysteresis,
            };
            let mut controller = ZoomLevelController::new(settings);
            assert_eq!(controller.update(1.0).0, ZoomTier::Clustered);
            assert_eq!(
                controller.update(settings.expanding_zoom()),
                (ZoomTier::Expanded, true),
                "hysteresis {hysteresis}"
            );
        }
    }

    #[test]
    fn two_members_sit_at_zero_and_pi() {
        let offsets = member_offsets(2, MEMBER_RING_RADIUS);
        assert!((offsets[0] - vec2(30.0, 0.0)).length() < 1e-4);
        assert!((offsets[1] - vec2(-30.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn paris_cluster_dissolves_and_reforms() {
        let items = build_clusters(&[(0, PARIS), (1, PARIS)], false);
        let anchor = vec2(12.0, -7.0);
        let positions = vec![anchor];

        let clustered = present(&items, &positions, ZoomTier::Clustered);
        assert_eq!(
            clustered,
            vec![Marker::Aggregate {
                members: vec![0, 1],
                position: anchor,
                member_count: 2,
            }]
        );

        let expanded = present(&items, &positions, tier_for(2.5, DEFAULT_THRESHOLD));
        assert_eq!(expanded.len(), 2);
        for (marker, angle) in expanded.iter().zip([0.0_f32, std::f32::consts::PI]) {
            let Marker::Member {
                position,
                cluster_position,
                ..
            } = marker
            else {
                panic!("expected a dissolved member");
            };
            assert_eq!(*cluster_position, anchor);
            let expected = anchor + vec2(angle.cos(), angle.sin()) * MEMBER_RING_RADIUS;
            assert!((*position - expected).length() < 1e-3);
        }

        let rebuilt = build_clusters(&[(0, PARIS), (1, PARIS)], false);
        assert_eq!(rebuilt, items);
        assert_eq!(present(&rebuilt, &positions, ZoomTier::Clustered), clustered);
    }
}
