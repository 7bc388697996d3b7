use eframe::egui::{self, Color32, Key, Response, RichText, Sense, Ui, vec2};
use fuzzy_matcher::skim::SkimMatcherV2;

use lauds_landscape::dataset::{Category, Group};
use lauds_landscape::geolocation::GeolocationProvider;
use lauds_landscape::interaction::InteractionEvent;
use lauds_landscape::layout::RestartEnergy;
use lauds_landscape::session::ViewKind;
use lauds_landscape::util::truncate_label;
use lauds_landscape::zoom::ZOOM_EXTENT;

use super::super::graph::fuzzy_match_score;
use super::super::nearest::NearestState;
use super::super::render_utils::category_color;
use super::super::{NearestArrangement, ViewModel};

const SEARCH_RESULT_ROWS: usize = 40;
const SLIDER_KEY_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;

/// Keyboard nudging for a focused slider, faster the longer an arrow key is
/// held. Returns whether the value changed.
fn nudge_slider_with_arrows(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    min: f32,
    max: f32,
) -> bool {
    let hold_id = response.id.with("arrow_hold_secs");
    if !response.has_focus() {
        ui.ctx().data_mut(|data| data.remove::<f32>(hold_id));
        return false;
    }

    let (dt, up, down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });
    let direction = f32::from(i8::from(up) - i8::from(down));
    if direction == 0.0 {
        ui.ctx().data_mut(|data| data.remove::<f32>(hold_id));
        return false;
    }

    let held = ui.ctx().data(|data| data.get_temp::<f32>(hold_id).unwrap_or(0.0)) + dt;
    ui.ctx().data_mut(|data| data.insert_temp(hold_id, held));

    let ramp = held * SLIDER_KEY_ACCEL_PER_SEC;
    let accel = (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX);
    let step = ((max - min) / 200.0).max(0.0005);

    let old = *value;
    *value = (*value + direction * step * SLIDER_KEY_RATE * accel * dt).clamp(min, max);
    ui.ctx().request_repaint();
    (*value - old).abs() > f32::EPSILON
}

fn color_swatch(ui: &mut Ui, color: Color32) {
    let (rect, _) = ui.allocate_exact_size(vec2(12.0, 12.0), Sense::hover());
    ui.painter().rect_filled(rect, 2.0, color);
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(
        &mut self,
        ui: &mut Ui,
        geolocation: &mut dyn GeolocationProvider,
    ) {
        ui.heading("Landscape Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label(RichText::new("View").strong());
        ui.horizontal_wrapped(|ui| {
            for view in ViewKind::ALL {
                let selected = self.session.view() == view;
                if ui.selectable_label(selected, view.label()).clicked() && !selected {
                    self.switch_view(view);
                }
            }
        });

        ui.separator();
        self.draw_category_filters(ui);

        ui.separator();
        self.draw_search(ui);

        ui.separator();
        match self.session.view() {
            ViewKind::Network => {
                ui.checkbox(&mut self.show_all_labels, "Show all labels")
                    .on_hover_text("Label every node instead of only hovered and related ones.");
                if ui
                    .button("Re-run layout")
                    .on_hover_text("Restart the force layout from the current positions.")
                    .clicked()
                {
                    self.network.engine.restart(RestartEnergy::Structural);
                }
            }
            ViewKind::Gallery => {
                if ui.button("Re-run layout").clicked() {
                    self.gallery.engine.restart(RestartEnergy::Structural);
                }
            }
            ViewKind::Nearest => self.draw_nearest_controls(ui, geolocation),
        }

        ui.add_space(6.0);
        self.draw_layout_status(ui);
    }

    fn draw_category_filters(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Categories").strong())
            .on_hover_text("At least one category always stays on.");

        let view = self.session.view();
        let filters = *self.session.filters();
        let mut toggled = None;
        for category in Category::ALL {
            let count = match view {
                ViewKind::Gallery => self
                    .data
                    .gallery
                    .concepts()
                    .iter()
                    .filter(|concept| concept.category == category)
                    .count(),
                ViewKind::Network | ViewKind::Nearest => self.data.dataset.concept_count(category),
            };

            ui.horizontal(|ui| {
                color_swatch(ui, category_color(category));
                let mut active = filters.is_active(category);
                let last_active = active && filters.active_count() == 1;
                let response = ui
                    .checkbox(&mut active, format!("{}  ({count})", category.label()))
                    .on_hover_text(if last_active {
                        "The last active category cannot be switched off."
                    } else {
                        "Show or hide this category's concepts."
                    });
                if response.changed() {
                    toggled = Some(category);
                }
            });
        }

        if let Some(category) = toggled {
            self.toggle_category(category);
        }
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search")
            .on_hover_text("Fuzzy-highlight matching names without changing what is shown.");
        ui.text_edit_singleline(&mut self.search)
            .on_hover_text("Type to highlight matches, then click a result to open it.");

        let Some(matches) = self.cached_search_matches() else {
            return;
        };

        let query = self.search.trim().to_owned();
        let matcher = SkimMatcherV2::default();
        let mut results = self
            .searchable_members()
            .into_iter()
            .filter(|(member, _)| matches.contains(member))
            .filter_map(|(member, name)| {
                fuzzy_match_score(&matcher, name, &query)
                    .map(|score| (member, name.to_owned(), score))
            })
            .collect::<Vec<_>>();
        results.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));
        results.truncate(SEARCH_RESULT_ROWS);

        ui.small(format!("{} matches", matches.len()));
        let mut opened = None;
        egui::ScrollArea::vertical()
            .id_salt("search_results_scroll")
            .max_height(180.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for (member, name, _) in &results {
                    if ui.link(truncate_label(name, 40)).on_hover_text(name.as_str()).clicked() {
                        opened = Some(*member);
                    }
                }
            });

        if let Some(member) = opened {
            self.open_from_list(member);
        }
    }

    /// Opens a member's popup as if it had been clicked on the canvas.
    pub(in crate::app) fn open_from_list(&mut self, member: usize) {
        match self.session.view() {
            ViewKind::Network => {
                if let Some(entity) = self.data.dataset.entity(member) {
                    let key = entity.key.clone();
                    self.jump_to(&key);
                }
            }
            ViewKind::Gallery => {
                self.open_popup(member);
                self.focus_gallery_image(member, 0);
                if let Some(position) = self.gallery.position_of_member(member) {
                    self.camera.center_on(position);
                }
            }
            ViewKind::Nearest => self.open_popup(member),
        }
    }

    fn open_popup(&mut self, member: usize) {
        let interaction = self.session.interaction_mut();
        interaction.reset();
        interaction.handle(InteractionEvent::Click(member));
        self.session.select(Some(member));
        self.last_hovered = None;
    }

    fn draw_nearest_controls(&mut self, ui: &mut Ui, geolocation: &mut dyn GeolocationProvider) {
        let geolocated = self
            .nearest
            .layout()
            .is_some_and(|layout| layout.mode.uses_geolocation());

        if geolocated {
            ui.label(RichText::new("Arrangement").strong());
            let mut arrangement = self.settings.arrangement;
            ui.horizontal(|ui| {
                ui.radio_value(&mut arrangement, NearestArrangement::Axis, "Distance axis")
                    .on_hover_text("Producers on a line, left to right by distance.");
                ui.radio_value(&mut arrangement, NearestArrangement::Radial, "Rings")
                    .on_hover_text("Producers on rings around you, by distance.");
            });
            self.set_nearest_arrangement(arrangement);
        } else if let Some(layout) = self.nearest.layout() {
            ui.label(format!(
                "Map view: {} markers. Zoom in to split shared locations.",
                layout.items.len()
            ));
        }

        ui.add_space(4.0);
        let (min_zoom, max_zoom) = ZOOM_EXTENT;
        let mut changed = false;
        let threshold_slider = ui
            .add(
                egui::Slider::new(&mut self.settings.zoom.threshold, min_zoom..=max_zoom)
                    .text("Cluster split zoom")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("Zoom level at which producers sharing a location are drawn apart.");
        if threshold_slider.hovered() {
            threshold_slider.request_focus();
        }
        changed |= threshold_slider.changed();
        changed |= nudge_slider_with_arrows(
            ui,
            &threshold_slider,
            &mut self.settings.zoom.threshold,
            min_zoom,
            max_zoom,
        );

        let hysteresis_slider = ui
            .add(
                egui::Slider::new(&mut self.settings.zoom.hysteresis, 0.0..=1.0)
                    .text("Split hysteresis")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text(
                "Keep the current grouping while zoom stays this close to the split level.",
            );
        changed |= hysteresis_slider.changed();

        if changed {
            self.apply_zoom_settings();
        }

        ui.label(format!("Zoom: {:.2}", self.camera.zoom));
        if let Some(layout) = self.nearest.layout()
            && layout.unresolved > 0
        {
            ui.small(format!("{} markers could not be separated", layout.unresolved));
        }

        if ui
            .button("Locate again")
            .on_hover_text("Ask for the location again and rebuild this view.")
            .clicked()
        {
            self.nearest = NearestState::Unresolved;
            self.prepare_nearest(geolocation, None);
        }
    }

    fn draw_layout_status(&self, ui: &mut Ui) {
        let engine = match self.session.view() {
            ViewKind::Network => Some(&self.network.engine),
            ViewKind::Gallery => Some(&self.gallery.engine),
            ViewKind::Nearest => self
                .nearest
                .layout()
                .filter(|layout| layout.uses_engine(self.settings.arrangement))
                .map(|layout| &layout.engine),
        };
        let Some(engine) = engine else {
            return;
        };

        let status = if engine.is_running() {
            format!("Layout settling (alpha {:.3})", engine.alpha())
        } else {
            "Layout settled".to_owned()
        };
        ui.small(status);

        if self.session.view() == ViewKind::Network {
            let producers = self
                .network
                .members
                .iter()
                .filter(|&&member| {
                    self.data
                        .dataset
                        .entity(member)
                        .is_some_and(|entity| entity.group() == Group::Producer)
                })
                .count();
            ui.small(format!(
                "{producers} producers, {} concepts",
                self.network.members.len() - producers
            ));
        }
    }
}
