use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{self, Context, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use lauds_landscape::dataset::{EntityKey, LoadedData, Sources, load_sources};
use lauds_landscape::filter::Visibility;
use lauds_landscape::geolocation::GeolocationProvider;
use lauds_landscape::layout::overlap::OverlapConfig;
use lauds_landscape::layout::{LayoutEngine, LayoutParams};
use lauds_landscape::loader::{LoadPoll, Loader};
use lauds_landscape::session::{ViewKind, ViewSelection, ViewSelectionStore, ViewSession};
use lauds_landscape::zoom::{ZOOM_EXTENT, ZoomSettings};

mod graph;
mod highlight;
mod nearest;
mod render_utils;
mod ui;

use nearest::NearestState;

/// How the geolocated nearest view lays producers out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NearestArrangement {
    /// Horizontal distance axis with overlap nudging.
    #[default]
    Axis,
    /// Rings around the user.
    Radial,
}

/// Tunables for the three views. Loadable from a JSON file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub network: LayoutParams,
    pub gallery: LayoutParams,
    pub radial: LayoutParams,
    pub projection: LayoutParams,
    pub overlap: OverlapConfig,
    pub zoom: ZoomSettings,
    pub arrangement: NearestArrangement,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            network: LayoutParams::network(),
            gallery: LayoutParams::gallery(),
            radial: LayoutParams::radial(),
            projection: LayoutParams::projection(),
            overlap: OverlapConfig::default(),
            zoom: ZoomSettings::default(),
            arrangement: NearestArrangement::default(),
        }
    }
}

pub struct LandscapeApp {
    sources: Sources,
    selection: ViewSelection,
    settings: ViewSettings,
    store: Option<ViewSelectionStore>,
    geolocation: Box<dyn GeolocationProvider>,
    state: AppState,
    loader: Loader<LoadedData>,
}

enum AppState {
    Loading,
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    data: LoadedData,
    session: ViewSession,
    settings: ViewSettings,
    store: Option<ViewSelectionStore>,
    visibility: Visibility,
    camera: Camera,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    revision: u64,
    network: ForceView,
    gallery: ForceView,
    gallery_focus: Option<GalleryFocus>,
    nearest: NearestState,
    last_hovered: Option<usize>,
    dragging: Option<EntityKey>,
    show_all_labels: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Camera {
    pan: Vec2,
    zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
}

impl Camera {
    fn for_view(view: ViewKind) -> Self {
        match view {
            ViewKind::Network => Self {
                pan: Vec2::ZERO,
                zoom: 0.6,
                min_zoom: 0.05,
                max_zoom: 6.0,
            },
            ViewKind::Gallery => Self {
                pan: Vec2::ZERO,
                zoom: 0.8,
                min_zoom: 0.2,
                max_zoom: 5.0,
            },
            ViewKind::Nearest => Self {
                pan: Vec2::ZERO,
                zoom: ZOOM_EXTENT.0,
                min_zoom: ZOOM_EXTENT.0,
                max_zoom: ZOOM_EXTENT.1,
            },
        }
    }

    fn center_on(&mut self, world: Vec2) {
        self.pan = -world * self.zoom;
    }
}

struct SearchMatchCache {
    query: String,
    view: ViewKind,
    revision: u64,
    matches: Arc<HashSet<usize>>,
}

/// Entities or gallery concepts related to the highlighted one, as layout
/// slots.
struct HighlightState {
    nodes: HashSet<usize>,
    edges: HashSet<(usize, usize)>,
}

/// A force-laid-out view. Slots are layout node indices; members are the
/// entity (network) or gallery concept (gallery) indices behind them.
struct ForceView {
    engine: LayoutEngine,
    members: Vec<usize>,
    slot_by_member: HashMap<usize, usize>,
    edges: Vec<(usize, usize)>,
    built: bool,
}

impl ForceView {
    fn new(params: LayoutParams) -> Self {
        Self {
            engine: LayoutEngine::new(params),
            members: Vec::new(),
            slot_by_member: HashMap::new(),
            edges: Vec::new(),
            built: false,
        }
    }

    fn slot_of(&self, member: usize) -> Option<usize> {
        self.slot_by_member.get(&member).copied()
    }

    fn position_of_member(&self, member: usize) -> Option<Vec2> {
        self.slot_of(member)
            .and_then(|slot| self.engine.nodes().get(slot))
            .map(|node| node.position)
    }
}

/// The gallery image whose owner drives the popup's related-image rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GalleryFocus {
    concept: usize,
    image: usize,
}

impl LandscapeApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        sources: Sources,
        selection: ViewSelection,
        settings: ViewSettings,
        store: Option<ViewSelectionStore>,
        geolocation: Box<dyn GeolocationProvider>,
    ) -> Self {
        let mut app = Self {
            sources,
            selection,
            settings,
            store,
            geolocation,
            state: AppState::Loading,
            loader: Loader::default(),
        };
        app.request_load();
        app
    }

    fn request_load(&mut self) -> bool {
        let sources = self.sources.clone();
        let started = self.loader.request(move || load_sources(&sources));
        if started {
            info!(producers = %self.sources.producers, "loading dataset");
        }
        started
    }

    fn poll_load(&mut self, ctx: &Context) -> Option<AppState> {
        match self.loader.poll() {
            LoadPoll::Idle => None,
            LoadPoll::Pending => {
                ctx.request_repaint_after(Duration::from_millis(100));
                None
            }
            LoadPoll::Ready(Ok(data)) => Some(AppState::Ready(Box::new(ViewModel::new(
                data,
                self.selection,
                self.settings.clone(),
                self.store.clone(),
            )))),
            LoadPoll::Ready(Err(load_error)) => {
                error!("{load_error}");
                Some(AppState::Error(load_error.to_string()))
            }
        }
    }
}

impl eframe::App for LandscapeApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = self.poll_load(ctx);

        match &mut self.state {
            AppState::Loading => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading the landscape dataset...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(message) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the landscape dataset");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    retry = ui
                        .add_enabled(!self.loader.is_loading(), egui::Button::new("Retry"))
                        .clicked();
                });
                if retry && self.request_load() {
                    transition = Some(AppState::Loading);
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.loader.is_loading();
                model.show(
                    ctx,
                    self.geolocation.as_mut(),
                    &mut reload_requested,
                    is_reloading,
                );

                if reload_requested {
                    self.selection = model.session.selection();
                    self.settings = model.settings.clone();
                    model.teardown();
                    let sources = self.sources.clone();
                    if !self.loader.request(move || load_sources(&sources)) {
                        warn!("reload requested while a load is already running");
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            if let AppState::Ready(model) = &mut self.state {
                model.teardown();
            }
            self.state = next_state;
        }
    }
}
