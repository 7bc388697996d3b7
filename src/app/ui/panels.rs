use std::time::Duration;

use eframe::egui::{self, Align, Context, Layout};
use tracing::{debug, warn};

use lauds_landscape::dataset::{Category, EntityKey, LoadedData};
use lauds_landscape::filter::{ToggleOutcome, Visibility};
use lauds_landscape::geolocation::GeolocationProvider;
use lauds_landscape::layout::RestartEnergy;
use lauds_landscape::session::{ViewKind, ViewSelection, ViewSelectionStore, ViewSession};

use super::super::nearest::NearestState;
use super::super::{Camera, ForceView, ViewModel, ViewSettings};

impl ViewModel {
    pub(in crate::app) fn new(
        data: LoadedData,
        selection: ViewSelection,
        settings: ViewSettings,
        store: Option<ViewSelectionStore>,
    ) -> Self {
        let mut model = Self {
            session: ViewSession::new(selection),
            camera: Camera::for_view(selection.view),
            network: ForceView::new(settings.network),
            gallery: ForceView::new(settings.gallery),
            data,
            settings,
            store,
            visibility: Visibility::default(),
            search: String::new(),
            search_match_cache: None,
            revision: 0,
            gallery_focus: None,
            nearest: NearestState::Unresolved,
            last_hovered: None,
            dragging: None,
            show_all_labels: false,
        };
        model.apply_filters(RestartEnergy::Structural);
        model.ensure_built();
        model
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        geolocation: &mut dyn GeolocationProvider,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.advance_timers(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Urban production landscape");
                    ui.separator();
                    ui.label(format!("view: {}", self.session.view()));
                    ui.label(format!("producers: {}", self.data.dataset.producer_count()));
                    ui.label(format!(
                        "concepts: {}",
                        self.data.dataset.len() - self.data.dataset.producer_count()
                    ));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload data"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_summary());
                        if is_loading {
                            ui.spinner();
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(350.0)
            .show(ctx, |ui| self.draw_controls(ui, geolocation));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| match self.session.view() {
            ViewKind::Network => self.draw_network(ui),
            ViewKind::Gallery => self.draw_gallery(ui),
            ViewKind::Nearest => self.draw_nearest(ui, geolocation),
        });
    }

    fn advance_timers(&mut self, ctx: &Context) {
        let dt = ctx.input(|input| input.stable_dt.min(0.1));
        let interaction = self.session.interaction_mut();
        if let Some(index) = interaction.advance_timers(Duration::from_secs_f32(dt)) {
            debug!(index, "related image rotated");
        }
        if let Some(timer) = interaction.rotation() {
            ctx.request_repaint_after(timer.remaining());
        }
    }

    fn visible_summary(&self) -> String {
        match self.session.view() {
            ViewKind::Network => format!(
                "shown: {} nodes, {} links",
                self.network.members.len(),
                self.network.edges.len()
            ),
            ViewKind::Gallery => format!("shown: {} concepts", self.gallery.members.len()),
            ViewKind::Nearest => self
                .nearest
                .layout()
                .map(|layout| {
                    let producers = layout
                        .items
                        .iter()
                        .map(|item| item.members().len())
                        .sum::<usize>();
                    format!("shown: {producers} producers")
                })
                .unwrap_or_default(),
        }
    }

    /// Stops every simulation and drops popups and timers.
    pub(in crate::app) fn teardown(&mut self) {
        self.network.engine.stop();
        self.gallery.engine.stop();
        self.stop_nearest();
        self.session.interaction_mut().reset();
        self.gallery_focus = None;
        self.last_hovered = None;
        self.dragging = None;
    }

    pub(in crate::app) fn switch_view(&mut self, to: ViewKind) {
        let Some(switch) = self.session.switch_view(to) else {
            return;
        };

        match switch.from {
            ViewKind::Network => self.network.engine.stop(),
            ViewKind::Gallery => self.gallery.engine.stop(),
            ViewKind::Nearest => self.stop_nearest(),
        }
        if switch.filters_changed {
            self.apply_filters(RestartEnergy::Refilter);
        }

        self.camera = Camera::for_view(to);
        self.last_hovered = None;
        self.dragging = None;
        self.gallery_focus = None;
        self.ensure_built();
        match to {
            ViewKind::Network if self.network.built => {
                self.network.engine.restart(RestartEnergy::Nudge);
            }
            ViewKind::Gallery if self.gallery.built => {
                self.gallery.engine.restart(RestartEnergy::Nudge);
            }
            ViewKind::Nearest => {
                if let NearestState::Ready(layout) = &mut self.nearest
                    && layout.uses_engine(self.settings.arrangement)
                {
                    layout.engine.restart(RestartEnergy::Nudge);
                }
            }
            _ => {}
        }
        self.persist_selection();
    }

    pub(in crate::app) fn toggle_category(&mut self, category: Category) {
        match self.session.toggle_filter(category) {
            ToggleOutcome::Applied { active, .. } => {
                debug!(%category, active, "category toggled");
                self.gallery_focus = None;
                self.last_hovered = None;
                self.apply_filters(RestartEnergy::Refilter);
                self.persist_selection();
            }
            ToggleOutcome::Rejected { .. } => {
                debug!(%category, "kept the last active category on");
            }
            ToggleOutcome::Unchanged { .. } => {}
        }
    }

    /// Follows a cross-reference into the network view and centres on it.
    pub(in crate::app) fn jump_to(&mut self, key: &EntityKey) {
        let Ok(jump) = self.session.jump_to(&self.data.dataset, key) else {
            return;
        };

        if jump.filters_changed {
            self.apply_filters(RestartEnergy::Refilter);
            self.persist_selection();
        } else {
            self.network.engine.restart(RestartEnergy::Nudge);
        }
        self.last_hovered = None;
        if let Some(position) = self.network.position_of_member(jump.index) {
            self.camera.center_on(position);
        }
    }

    pub(in crate::app) fn persist_selection(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(error) = store.save(&self.session.selection()) {
            warn!("failed to save view selection to {}: {error:#}", store.path().display());
        }
    }
}
