use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use lauds_landscape::dataset::Group;
use lauds_landscape::session::ViewKind;
use lauds_landscape::util::truncate_label;

use super::super::highlight::{edge_key, network_highlight};
use super::super::render_utils::{
    ACCENT, blend_color, dim_color, draw_background, draw_node_glyph, edge_visible, group_color,
    world_to_screen,
};
use super::super::{SearchMatchCache, ViewModel};
use super::interaction::PointerFrame;

const SEARCH_MATCH_COLOR: Color32 = Color32::from_rgb(103, 196, 255);

pub(in crate::app) fn fuzzy_match_score(
    matcher: &SkimMatcherV2,
    text: &str,
    query: &str,
) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    /// Members of the current view and the names they are searched by.
    pub(in crate::app) fn searchable_members(&self) -> Vec<(usize, &str)> {
        match self.session.view() {
            ViewKind::Network => self
                .network
                .members
                .iter()
                .filter_map(|&index| {
                    self.data
                        .dataset
                        .entity(index)
                        .map(|entity| (index, entity.name()))
                })
                .collect(),
            ViewKind::Gallery => self
                .gallery
                .members
                .iter()
                .filter_map(|&index| {
                    self.data
                        .gallery
                        .concepts()
                        .get(index)
                        .map(|concept| (index, concept.name.as_str()))
                })
                .collect(),
            ViewKind::Nearest => self
                .nearest
                .site_entities()
                .into_iter()
                .filter_map(|index| {
                    self.data
                        .dataset
                        .entity(index)
                        .map(|entity| (index, entity.name()))
                })
                .collect(),
        }
    }

    pub(in crate::app) fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let query = self.search.trim().to_owned();
        if query.is_empty() {
            return None;
        }

        let view = self.session.view();
        if let Some(cached) = &self.search_match_cache
            && cached.view == view
            && cached.revision == self.revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .searchable_members()
            .into_iter()
            .filter(|(_, name)| fuzzy_match_score(&matcher, name, &query).is_some())
            .map(|(member, _)| member)
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query,
            view,
            revision: self.revision,
            matches: Arc::clone(&matches),
        });
        Some(matches)
    }

    pub(in crate::app) fn draw_network(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.camera.pan, self.camera.zoom);
        self.camera.handle_zoom(ui, rect, &response);

        if self.network.members.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No producers or concepts in the active categories.",
                FontId::proportional(14.0),
                Color32::from_gray(200),
            );
            return;
        }

        if self.network.engine.tick() {
            ui.ctx().request_repaint();
        }

        let camera = self.camera;
        let glyph_scale = camera.zoom.powf(0.4).clamp(0.45, 2.4);
        let (screen_positions, screen_radii): (Vec<Pos2>, Vec<f32>) = self
            .network
            .engine
            .nodes()
            .iter()
            .map(|node| {
                (
                    world_to_screen(rect, camera.pan, camera.zoom, node.position),
                    node.radius * glyph_scale + 2.0,
                )
            })
            .unzip();
        let visible = Self::visible_indices(rect, &screen_positions, &screen_radii);
        let hovered_slot = Self::hovered_index(ui, &visible, &screen_positions, &screen_radii);

        let dragging_node = Self::handle_node_drag(
            &mut self.network,
            &mut self.dragging,
            &camera,
            rect,
            &response,
            hovered_slot,
        );
        self.camera.handle_pan(&response, !dragging_node);
        if dragging_node {
            ui.ctx().request_repaint();
        }

        if hovered_slot.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let pointer = PointerFrame {
            hovered: hovered_slot.map(|slot| self.network.members[slot]),
            clicked: response.clicked_by(egui::PointerButton::Primary),
            canvas_hovered: response.hovered(),
        };
        self.route_pointer(&pointer, true);

        let search_matches = self.cached_search_matches();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let highlight = self
            .session
            .interaction()
            .highlighted()
            .map(|entity| network_highlight(&self.data.dataset, &self.network, entity));
        let selected = self.session.selected();

        let zoom_sqrt = camera.zoom.sqrt();
        for &(a, b) in &self.network.edges {
            let start = screen_positions[a];
            let end = screen_positions[b];
            if !edge_visible(rect, start, end, 2.5) {
                continue;
            }

            let related = highlight
                .as_ref()
                .is_some_and(|state| state.edges.contains(&edge_key(a, b)));
            let (width, color) = if related {
                ((1.9 * zoom_sqrt).clamp(1.2, 3.8), ACCENT)
            } else if highlight.is_some() {
                (
                    (0.7 * zoom_sqrt).clamp(0.4, 1.6),
                    Color32::from_rgba_unmultiplied(90, 90, 96, 70),
                )
            } else {
                (
                    (1.0 * zoom_sqrt).clamp(0.5, 2.4),
                    Color32::from_rgba_unmultiplied(140, 140, 148, 150),
                )
            };
            painter.line_segment([start, end], Stroke::new(width, color));
        }

        let mut selection_animating = false;
        for &slot in &visible {
            let member = self.network.members[slot];
            let Some(entity) = self.data.dataset.entity(member) else {
                continue;
            };
            let group = entity.group();
            let position = screen_positions[slot];
            let radius = screen_radii[slot];

            let is_hovered = hovered_slot == Some(slot);
            let is_related = highlight
                .as_ref()
                .is_some_and(|state| state.nodes.contains(&slot));
            let is_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&member));
            let is_selected = selected == Some(member);

            let base = group_color(group);
            let color = if is_hovered || is_related {
                base
            } else if highlight.is_some() {
                dim_color(base, 0.3)
            } else if is_match {
                blend_color(base, SEARCH_MATCH_COLOR, 0.6)
            } else if search_active {
                dim_color(base, 0.38)
            } else {
                base
            };

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("network-selection", member)),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }
            if selection_mix > 0.0 {
                let halo_alpha = (40.0 + selection_mix * 150.0) as u8;
                painter.circle_stroke(
                    position,
                    radius + 4.0 + (1.0 - selection_mix) * 6.0,
                    Stroke::new(
                        1.0 + selection_mix,
                        Color32::from_rgba_unmultiplied(245, 206, 93, halo_alpha),
                    ),
                );
            }

            draw_node_glyph(&painter, group, position, glyph_scale, color);

            let show_label = self.show_all_labels
                || is_hovered
                || is_related
                || is_selected
                || (is_match && camera.zoom > 0.3)
                || camera.zoom > 1.3;
            if show_label {
                let font = if group == Group::Producer { 13.0 } else { 11.0 };
                painter.text(
                    position - vec2(0.0, radius + 4.0),
                    Align2::CENTER_BOTTOM,
                    truncate_label(entity.name(), 36),
                    FontId::proportional(font),
                    if highlight.is_some() && !(is_hovered || is_related) {
                        Color32::from_gray(120)
                    } else {
                        Color32::from_gray(238)
                    },
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if let Some(slot) = hovered_slot
            && let Some(entity) = self.data.dataset.entity(self.network.members[slot])
        {
            let readout = format!(
                "{}  |  {}  |  connections {}",
                entity.name(),
                entity.group().label(),
                self.data.dataset.neighbors(self.network.members[slot]).len()
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                readout,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }
    }
}
