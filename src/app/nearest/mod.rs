use std::collections::HashMap;

use eframe::egui::Vec2;
use tracing::{debug, info, warn};

use lauds_landscape::LandscapeError;
use lauds_landscape::dataset::{Dataset, EntityKey, nearest_sites};
use lauds_landscape::geo::{GeoPoint, distance_km};
use lauds_landscape::geolocation::{
    GeolocationProvider, ModeDecision, NearestMode, resolve_nearest_mode,
};
use lauds_landscape::layout::overlap::{self, AxisFrame};
use lauds_landscape::layout::projection::{GeoProjection, Viewport, radial_target};
use lauds_landscape::layout::spatial::{SpatialItem, bucket_by_distance, build_clusters};
use lauds_landscape::layout::{LayoutEngine, NodeSpec, RestartEnergy, Target};
use lauds_landscape::zoom::ZoomLevelController;

use super::{NearestArrangement, ViewModel, ViewSettings};

mod view;

const VIEWPORT_SIZE: (f32, f32) = (1200.0, 760.0);
pub(super) const MARKER_RADIUS: f32 = 12.0;
const RADIAL_INNER: f32 = 40.0;

pub(super) enum NearestState {
    Unresolved,
    AwaitingPermission,
    Ready(Box<NearestLayout>),
    Failed(String),
}

impl NearestState {
    pub(super) fn site_entities(&self) -> Vec<usize> {
        match self {
            Self::Ready(layout) => layout
                .items
                .iter()
                .flat_map(|item| item.members().iter().copied())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub(super) fn layout(&self) -> Option<&NearestLayout> {
        match self {
            Self::Ready(layout) => Some(layout),
            _ => None,
        }
    }
}

/// Everything the nearest view needs for one positioning mode.
pub(super) struct NearestLayout {
    pub(super) mode: NearestMode,
    pub(super) viewport: Viewport,
    pub(super) frame: AxisFrame,
    pub(super) items: Vec<SpatialItem>,
    /// Layout key of `items[i]`.
    pub(super) keys: Vec<EntityKey>,
    pub(super) distances: HashMap<usize, f64>,
    pub(super) max_distance: f64,
    /// Distance-axis placement by entity, in world coordinates.
    pub(super) axis: HashMap<usize, Vec2>,
    pub(super) unresolved: usize,
    pub(super) outer_radius: f32,
    pub(super) engine: LayoutEngine,
    pub(super) zoom: ZoomLevelController,
}

fn aggregate_radius(member_count: usize) -> f32 {
    if member_count <= 1 {
        MARKER_RADIUS
    } else {
        MARKER_RADIUS + 3.0 * (member_count as f32).sqrt()
    }
}

impl NearestLayout {
    pub(super) fn build(
        dataset: &Dataset,
        mode: NearestMode,
        settings: &ViewSettings,
    ) -> Result<Self, LandscapeError> {
        let sites = nearest_sites(dataset)?;
        let viewport = Viewport::new(VIEWPORT_SIZE.0, VIEWPORT_SIZE.1);
        let frame = AxisFrame::from_viewport(&viewport);
        let points = sites
            .iter()
            .map(|site| (site.entity, site.point))
            .collect::<Vec<_>>();
        let items = build_clusters(&points, mode.uses_geolocation());
        let keys = items
            .iter()
            .map(|item| match item {
                SpatialItem::Single { index, .. } => dataset
                    .entity(*index)
                    .map(|entity| entity.key.clone())
                    .unwrap_or_else(|| EntityKey::producer(index.to_string())),
                SpatialItem::Cluster(cluster) => EntityKey::cluster(cluster.label()),
            })
            .collect::<Vec<_>>();

        let mut layout = Self {
            mode,
            viewport,
            frame,
            items,
            keys,
            distances: HashMap::new(),
            max_distance: 0.0,
            axis: HashMap::new(),
            unresolved: 0,
            outer_radius: VIEWPORT_SIZE.0.min(VIEWPORT_SIZE.1) / 2.0 - MARKER_RADIUS * 2.0,
            engine: LayoutEngine::new(settings.projection),
            zoom: ZoomLevelController::new(settings.zoom),
        };

        match mode {
            NearestMode::Geolocated { user } => layout.place_by_distance(user, &points, settings),
            NearestMode::Projected => layout.place_by_projection(&points, settings)?,
        }

        info!(
            sites = points.len(),
            items = layout.items.len(),
            geolocated = mode.uses_geolocation(),
            "nearest view prepared"
        );
        Ok(layout)
    }

    fn place_by_distance(
        &mut self,
        user: GeoPoint,
        points: &[(usize, GeoPoint)],
        settings: &ViewSettings,
    ) {
        let distances = points
            .iter()
            .map(|&(index, point)| (index, distance_km(user, point)))
            .collect::<Vec<_>>();
        self.max_distance = distances
            .iter()
            .map(|&(_, distance)| distance)
            .filter(|distance| distance.is_finite())
            .fold(0.0, f64::max);
        self.distances = distances.iter().copied().collect();

        let buckets = bucket_by_distance(&distances);
        let resolved =
            overlap::resolve(&buckets, self.max_distance, &self.frame, &settings.overlap);
        self.unresolved = resolved.iter().filter(|placed| !placed.resolved).count();
        if self.unresolved > 0 {
            debug!(
                unresolved = self.unresolved,
                "distance axis is crowded; some markers may overlap"
            );
        }
        self.axis = resolved
            .iter()
            .map(|placed| (placed.index, self.viewport.to_world(placed.position)))
            .collect();

        self.engine = LayoutEngine::new(settings.radial);
        let specs = self
            .items
            .iter()
            .zip(&self.keys)
            .map(|(item, key)| {
                let distance = item
                    .members()
                    .first()
                    .and_then(|index| self.distances.get(index))
                    .copied()
                    .unwrap_or(f64::NAN);
                NodeSpec {
                    key: key.clone(),
                    radius: MARKER_RADIUS,
                    target: Target::Radius(radial_target(
                        distance,
                        self.max_distance,
                        RADIAL_INNER,
                        self.outer_radius,
                    )),
                }
            })
            .collect();
        self.engine.set_nodes(specs, &[], RestartEnergy::Structural);
    }

    fn place_by_projection(
        &mut self,
        points: &[(usize, GeoPoint)],
        settings: &ViewSettings,
    ) -> Result<(), LandscapeError> {
        let projection = GeoProjection::fit(points.iter().map(|&(_, point)| point), self.viewport)
            .ok_or_else(|| LandscapeError::DataLoad("no valid coordinates to project".to_owned()))?;

        self.engine = LayoutEngine::new(settings.projection);
        let specs = self
            .items
            .iter()
            .zip(&self.keys)
            .map(|(item, key)| NodeSpec {
                key: key.clone(),
                radius: aggregate_radius(item.members().len()),
                target: Target::Point(projection.project(item.point())),
            })
            .collect();
        self.engine.set_nodes(specs, &[], RestartEnergy::Structural);
        Ok(())
    }

    /// Whether the force engine places the markers, as opposed to the
    /// precomputed distance axis.
    pub(super) fn uses_engine(&self, arrangement: NearestArrangement) -> bool {
        !self.mode.uses_geolocation() || arrangement == NearestArrangement::Radial
    }

    /// Current world position of every item.
    pub(super) fn item_positions(&self, arrangement: NearestArrangement) -> Vec<Vec2> {
        if self.uses_engine(arrangement) {
            self.keys
                .iter()
                .map(|key| self.engine.position_of(key).unwrap_or(Vec2::ZERO))
                .collect()
        } else {
            self.items
                .iter()
                .map(|item| {
                    item.members()
                        .first()
                        .and_then(|index| self.axis.get(index))
                        .copied()
                        .unwrap_or(Vec2::ZERO)
                })
                .collect()
        }
    }

    /// Where the user sits in world coordinates, if geolocated.
    pub(super) fn user_position(&self, arrangement: NearestArrangement) -> Option<Vec2> {
        if !self.mode.uses_geolocation() {
            return None;
        }
        Some(match arrangement {
            NearestArrangement::Radial => Vec2::ZERO,
            NearestArrangement::Axis => self.axis_point(0.0),
        })
    }

    /// World position of `distance` on the horizontal axis.
    pub(super) fn axis_point(&self, distance: f64) -> Vec2 {
        let x = self.frame.x_for(distance, self.max_distance);
        self.viewport.to_world(Vec2::new(x, self.viewport.height / 2.0))
    }

    pub(super) fn ring_radius(&self, distance: f64) -> f32 {
        radial_target(distance, self.max_distance, RADIAL_INNER, self.outer_radius)
    }
}

impl ViewModel {
    /// Decides the positioning mode and builds the layout. `answer` is the
    /// user's reply to the location prompt, once given.
    pub(in crate::app) fn prepare_nearest(
        &mut self,
        geolocation: &mut dyn GeolocationProvider,
        answer: Option<bool>,
    ) {
        self.nearest = match resolve_nearest_mode(geolocation, answer) {
            ModeDecision::NeedsPrompt => NearestState::AwaitingPermission,
            ModeDecision::Ready(mode) => {
                match NearestLayout::build(&self.data.dataset, mode, &self.settings) {
                    Ok(layout) => NearestState::Ready(Box::new(layout)),
                    Err(error) => {
                        warn!("{error}");
                        NearestState::Failed(error.to_string())
                    }
                }
            }
        };
        self.revision = self.revision.wrapping_add(1);
    }

    pub(in crate::app) fn set_nearest_arrangement(&mut self, arrangement: NearestArrangement) {
        if self.settings.arrangement == arrangement {
            return;
        }
        self.settings.arrangement = arrangement;
        if let NearestState::Ready(layout) = &mut self.nearest {
            if layout.uses_engine(arrangement) {
                layout.engine.restart(RestartEnergy::Structural);
            } else {
                layout.engine.stop();
            }
        }
    }

    pub(in crate::app) fn apply_zoom_settings(&mut self) {
        if let NearestState::Ready(layout) = &mut self.nearest {
            layout.zoom = ZoomLevelController::new(self.settings.zoom);
        }
    }

    pub(in crate::app) fn stop_nearest(&mut self) {
        if let NearestState::Ready(layout) = &mut self.nearest {
            layout.engine.stop();
        }
    }
}
