use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Ui, Vec2, vec2};
use tracing::{debug, info};

use lauds_landscape::geolocation::GeolocationProvider;
use lauds_landscape::util::truncate_label;
use lauds_landscape::zoom::{Marker, ZoomTier, present};

use super::super::graph::PointerFrame;
use super::super::render_utils::{ACCENT, dim_color, draw_background, world_to_screen};
use super::super::{Camera, NearestArrangement, ViewModel};
use super::{MARKER_RADIUS, NearestLayout, NearestState, aggregate_radius};

const TICK_STEP_KM: f64 = 100.0;
const GUIDE_COLOR: Color32 = Color32::from_rgb(99, 99, 99);

impl NearestLayout {
    fn draw_axis_guide(&self, painter: &egui::Painter, rect: egui::Rect, camera: &Camera) {
        let to_screen = |world: Vec2| world_to_screen(rect, camera.pan, camera.zoom, world);
        let start = to_screen(self.axis_point(0.0));
        let end = to_screen(self.axis_point(self.max_distance));
        painter.line_segment([start, end], Stroke::new(1.0, GUIDE_COLOR));

        let mut km = 0.0;
        while km <= self.max_distance {
            let tick = to_screen(self.axis_point(km));
            painter.line_segment(
                [tick - vec2(0.0, 5.0), tick + vec2(0.0, 5.0)],
                Stroke::new(1.0, GUIDE_COLOR),
            );
            painter.text(
                tick + vec2(0.0, 8.0),
                Align2::CENTER_TOP,
                format!("{km:.0}"),
                FontId::proportional(11.0),
                Color32::from_gray(170),
            );
            km += TICK_STEP_KM;
        }
        painter.text(
            start + vec2(-25.0, 8.0),
            Align2::RIGHT_TOP,
            "(km)",
            FontId::proportional(11.0),
            Color32::from_gray(170),
        );
    }

    fn draw_ring_guide(&self, painter: &egui::Painter, rect: egui::Rect, camera: &Camera) {
        let center = world_to_screen(rect, camera.pan, camera.zoom, Vec2::ZERO);
        let mut km = TICK_STEP_KM;
        while km <= self.max_distance {
            let radius = self.ring_radius(km) * camera.zoom;
            painter.circle_stroke(center, radius, Stroke::new(1.0, dim_color(GUIDE_COLOR, 0.7)));
            painter.text(
                center + vec2(radius + 3.0, 0.0),
                Align2::LEFT_CENTER,
                format!("{km:.0} km"),
                FontId::proportional(10.0),
                Color32::from_gray(150),
            );
            km += TICK_STEP_KM;
        }
    }
}

impl ViewModel {
    fn draw_permission_prompt(&mut self, ui: &mut Ui, geolocation: &mut dyn GeolocationProvider) {
        let mut answer = None;
        egui::Window::new("Share your location?")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ui.ctx(), |ui| {
                ui.label("The nearest view can place producers by their distance from you.");
                ui.label("Without your location they are shown on a map instead.");
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Use my location").clicked() {
                        answer = Some(true);
                    }
                    if ui.button("Show the map").clicked() {
                        answer = Some(false);
                    }
                });
            });

        if let Some(answer) = answer {
            info!(granted = answer, "location prompt answered");
            self.prepare_nearest(geolocation, Some(answer));
        }
    }

    pub(in crate::app) fn draw_nearest(
        &mut self,
        ui: &mut Ui,
        geolocation: &mut dyn GeolocationProvider,
    ) {
        if matches!(self.nearest, NearestState::Unresolved) {
            self.prepare_nearest(geolocation, None);
        }

        if matches!(self.nearest, NearestState::AwaitingPermission) {
            self.draw_permission_prompt(ui, geolocation);
            return;
        }
        if let NearestState::Failed(message) = &self.nearest {
            let message = message.clone();
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.heading("The nearest view is unavailable");
                ui.add_space(6.0);
                ui.label(message);
                ui.add_space(10.0);
                if ui.button("Try again").clicked() {
                    self.nearest = NearestState::Unresolved;
                }
            });
            return;
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.camera.pan, self.camera.zoom);
        self.camera.handle_zoom(ui, rect, &response);
        self.camera.handle_pan(&response, true);

        let camera = self.camera;
        let arrangement = self.settings.arrangement;
        let NearestState::Ready(layout) = &mut self.nearest else {
            return;
        };

        let (tier, tier_changed) = layout.zoom.update(camera.zoom);
        if tier_changed {
            debug!(?tier, k = camera.zoom, "nearest zoom tier changed");
        }
        if layout.uses_engine(arrangement) && layout.engine.tick() {
            ui.ctx().request_repaint();
        }

        if layout.mode.uses_geolocation() {
            match arrangement {
                NearestArrangement::Axis => layout.draw_axis_guide(&painter, rect, &camera),
                NearestArrangement::Radial => layout.draw_ring_guide(&painter, rect, &camera),
            }
        }
        let user = layout.user_position(arrangement);
        let markers = present(&layout.items, &layout.item_positions(arrangement), tier);

        let screen_positions = markers
            .iter()
            .map(|marker| world_to_screen(rect, camera.pan, camera.zoom, marker.position()))
            .collect::<Vec<Pos2>>();
        let screen_radii = markers
            .iter()
            .map(|marker| match marker {
                Marker::Aggregate { member_count, .. } => {
                    aggregate_radius(*member_count) * camera.zoom
                }
                Marker::Single { .. } | Marker::Member { .. } => MARKER_RADIUS * camera.zoom,
            })
            .collect::<Vec<f32>>();
        let visible = Self::visible_indices(rect, &screen_positions, &screen_radii);
        let hovered_marker = Self::hovered_index(ui, &visible, &screen_positions, &screen_radii);
        if hovered_marker.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let clicked = response.clicked_by(egui::PointerButton::Primary);
        if clicked
            && let Some(Marker::Aggregate { position, members, .. }) =
                hovered_marker.and_then(|index| markers.get(index))
        {
            let zoom = self.settings.zoom.expanding_zoom();
            self.camera.zoom = zoom.clamp(self.camera.min_zoom, self.camera.max_zoom);
            self.camera.center_on(*position);
            debug!(members = members.len(), "zoomed into cluster");
        } else {
            let hovered = hovered_marker
                .and_then(|index| markers.get(index))
                .and_then(|marker| match marker {
                    Marker::Single { index, .. } | Marker::Member { index, .. } => Some(*index),
                    Marker::Aggregate { .. } => None,
                });
            let pointer = PointerFrame {
                hovered,
                clicked,
                canvas_hovered: response.hovered(),
            };
            self.route_pointer(&pointer, true);
        }

        let search_matches = self.cached_search_matches();
        let highlighted = self.session.interaction().highlighted();
        let selected = self.session.selected();
        let expanded = tier == ZoomTier::Expanded;

        if let Some(user) = user {
            let center = world_to_screen(rect, camera.pan, camera.zoom, user);
            painter.circle_filled(center, MARKER_RADIUS * camera.zoom, ACCENT);
            painter.text(
                center - vec2(0.0, MARKER_RADIUS * camera.zoom + 4.0),
                Align2::CENTER_BOTTOM,
                "You",
                FontId::proportional(12.0),
                Color32::from_gray(238),
            );
        }

        for &marker_index in &visible {
            let marker = &markers[marker_index];
            let position = screen_positions[marker_index];
            let radius = screen_radii[marker_index];
            let is_hovered = hovered_marker == Some(marker_index);

            match marker {
                Marker::Aggregate { member_count, .. } => {
                    let fill = if is_hovered { ACCENT } else { dim_color(ACCENT, 0.8) };
                    painter.circle_filled(position, radius, fill);
                    painter.text(
                        position,
                        Align2::CENTER_CENTER,
                        member_count.to_string(),
                        FontId::proportional(12.0),
                        Color32::WHITE,
                    );
                }
                Marker::Single { index, .. } | Marker::Member { index, .. } => {
                    if let Marker::Member {
                        cluster_position, ..
                    } = marker
                    {
                        let anchor =
                            world_to_screen(rect, camera.pan, camera.zoom, *cluster_position);
                        painter.line_segment(
                            [anchor, position],
                            Stroke::new(1.0, dim_color(ACCENT, 0.5)),
                        );
                    }

                    let is_highlighted = highlighted == Some(*index);
                    let is_match = search_matches
                        .as_ref()
                        .is_some_and(|matches| matches.contains(index));
                    if is_highlighted || is_hovered {
                        painter.circle_filled(position, radius, ACCENT);
                    } else {
                        painter.circle_stroke(position, radius, Stroke::new(2.0, ACCENT));
                    }
                    if is_match {
                        painter.circle_stroke(
                            position,
                            radius + 3.0,
                            Stroke::new(1.5, Color32::from_rgb(103, 196, 255)),
                        );
                    }
                    if selected == Some(*index) {
                        painter.circle_stroke(
                            position,
                            radius + 6.0,
                            Stroke::new(1.2, Color32::from_rgb(245, 206, 93)),
                        );
                    }

                    let show_label = self.show_all_labels
                        || is_hovered
                        || is_highlighted
                        || is_match
                        || expanded
                        || camera.zoom >= 1.5;
                    if show_label && let Some(entity) = self.data.dataset.entity(*index) {
                        painter.text(
                            position - vec2(0.0, radius + 4.0),
                            Align2::CENTER_BOTTOM,
                            truncate_label(entity.name(), 32),
                            FontId::proportional(12.0),
                            Color32::from_gray(236),
                        );
                    }
                }
            }
        }
    }
}
