use eframe::egui::epaint::QuadraticBezierShape;
use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, vec2};

use lauds_landscape::dataset::GalleryImage;
use lauds_landscape::interaction::ROTATION_INTERVAL;
use lauds_landscape::util::truncate_label;

use super::super::highlight::gallery_highlight;
use super::super::render_utils::{
    ACCENT, GALLERY_IMAGE_SIZE, category_color, dim_color, draw_background, gallery_image_offset,
    gallery_tile_rect, owner_tint, world_to_screen,
};
use super::super::{GalleryFocus, ViewModel};
use super::interaction::PointerFrame;

struct Tile {
    slot: usize,
    concept: usize,
    rect: Rect,
}

impl ViewModel {
    /// Makes `image` of `concept` the popup's subject and starts cycling the
    /// owner's other images.
    pub(in crate::app) fn focus_gallery_image(&mut self, concept: usize, image: usize) {
        self.gallery_focus = Some(GalleryFocus { concept, image });
        let related = self.gallery_related_images().len();
        self.session
            .interaction_mut()
            .start_rotation(related, ROTATION_INTERVAL);
    }

    pub(in crate::app) fn gallery_focus_image(&self) -> Option<&GalleryImage> {
        let focus = self.gallery_focus?;
        if self.session.interaction().popup_target() != Some(focus.concept) {
            return None;
        }
        self.data
            .gallery
            .concepts()
            .get(focus.concept)?
            .images
            .get(focus.image)
    }

    /// Other images by the focused image's owner, current one excluded.
    pub(in crate::app) fn gallery_related_images(&self) -> Vec<&GalleryImage> {
        let Some(focus) = self.gallery_focus else {
            return Vec::new();
        };
        let Some(image) = self
            .data
            .gallery
            .concepts()
            .get(focus.concept)
            .and_then(|concept| concept.images.get(focus.image))
        else {
            return Vec::new();
        };
        match image.owner.as_deref() {
            Some(owner) => self.data.gallery.related_images(owner, Some(&image.url)),
            None => Vec::new(),
        }
    }

    pub(in crate::app) fn draw_gallery(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.camera.pan, self.camera.zoom);
        self.camera.handle_zoom(ui, rect, &response);

        if self.gallery.members.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No images for the active categories.",
                FontId::proportional(14.0),
                Color32::from_gray(200),
            );
            return;
        }

        if self.gallery.engine.tick() {
            ui.ctx().request_repaint();
        }

        let camera = self.camera;
        let concepts = self.data.gallery.concepts();
        let tiles = self
            .gallery
            .engine
            .nodes()
            .iter()
            .zip(&self.gallery.members)
            .enumerate()
            .filter_map(|(slot, (node, &concept))| {
                let images = concepts.get(concept)?.images.len();
                let center = world_to_screen(rect, camera.pan, camera.zoom, node.position);
                let tile = gallery_tile_rect(center, images, camera.zoom);
                rect.intersects(tile).then_some(Tile {
                    slot,
                    concept,
                    rect: tile,
                })
            })
            .collect::<Vec<_>>();

        let pointer_pos = ui.input(|input| input.pointer.hover_pos());
        let hovered_tile = pointer_pos.and_then(|pointer| {
            tiles
                .iter()
                .rev()
                .find(|tile| tile.rect.contains(pointer))
                .map(|tile| (tile.slot, tile.concept))
        });
        let hovered_image = hovered_tile.zip(pointer_pos).and_then(|((slot, concept), pointer)| {
            let center = tiles.iter().find(|tile| tile.slot == slot)?.rect.center();
            let count = concepts.get(concept)?.images.len();
            (0..count).find(|&image| {
                let offset = gallery_image_offset(image, count);
                Rect::from_min_size(
                    center + offset * camera.zoom,
                    vec2(GALLERY_IMAGE_SIZE, GALLERY_IMAGE_SIZE) * camera.zoom,
                )
                .contains(pointer)
            })
        });

        let dragging_tile = Self::handle_node_drag(
            &mut self.gallery,
            &mut self.dragging,
            &camera,
            rect,
            &response,
            hovered_tile.map(|(slot, _)| slot),
        );
        self.camera.handle_pan(&response, !dragging_tile);
        if dragging_tile {
            ui.ctx().request_repaint();
        }
        if hovered_image.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let pointer = PointerFrame {
            hovered: hovered_tile.map(|(_, concept)| concept),
            clicked: response.clicked_by(egui::PointerButton::Primary),
            canvas_hovered: response.hovered(),
        };
        let opened = self.route_pointer(&pointer, false);
        if let Some(concept) = opened {
            self.focus_gallery_image(concept, hovered_image.unwrap_or(0));
        } else if pointer.clicked
            && let Some((_, concept)) = hovered_tile
            && let Some(image) = hovered_image
            && self
                .gallery_focus
                .is_some_and(|focus| focus.concept == concept && focus.image != image)
        {
            self.focus_gallery_image(concept, image);
        }
        if !self.session.interaction().is_popup_open() {
            self.gallery_focus = None;
        }

        let search_matches = self.cached_search_matches();
        let concepts = self.data.gallery.concepts();
        let highlight = self
            .session
            .interaction()
            .highlighted()
            .map(|concept| gallery_highlight(&self.data.gallery, &self.gallery, concept));
        let focus_owner = self
            .gallery_focus_image()
            .and_then(|image| image.owner.as_deref());

        if let Some(state) = &highlight {
            let stroke_width = (1.5 * camera.zoom.sqrt()).clamp(1.0, 3.0);
            for &(source, target) in &state.edges {
                let (Some(from), Some(to)) = (
                    tiles.iter().find(|tile| tile.slot == source),
                    tiles.iter().find(|tile| tile.slot == target),
                ) else {
                    continue;
                };
                let start = from.rect.center();
                let end = to.rect.center();
                let chord = end - start;
                let control = start + chord * 0.5 + vec2(-chord.y, chord.x) * 0.25;
                let color = concepts
                    .get(to.concept)
                    .map_or(ACCENT, |concept| category_color(concept.category));
                painter.add(QuadraticBezierShape::from_points_stroke(
                    [start, control, end],
                    false,
                    Color32::TRANSPARENT,
                    Stroke::new(stroke_width, color),
                ));
            }
        }

        for tile in &tiles {
            let Some(concept) = concepts.get(tile.concept) else {
                continue;
            };
            let related = highlight
                .as_ref()
                .is_none_or(|state| state.nodes.contains(&tile.slot));
            let matched = search_matches
                .as_ref()
                .is_none_or(|matches| matches.is_empty() || matches.contains(&tile.concept));
            let base = category_color(concept.category);

            painter.text(
                tile.rect.left_top() - vec2(0.0, 4.0),
                Align2::LEFT_BOTTOM,
                truncate_label(&concept.name, 28),
                FontId::proportional(12.0),
                if related && matched {
                    Color32::from_gray(236)
                } else {
                    Color32::from_gray(90)
                },
            );

            let count = concept.images.len();
            for (index, image) in concept.images.iter().enumerate() {
                let offset = gallery_image_offset(index, count);
                let cell = Rect::from_min_size(
                    tile.rect.center() + offset * camera.zoom,
                    vec2(GALLERY_IMAGE_SIZE, GALLERY_IMAGE_SIZE) * camera.zoom,
                );
                let same_owner = focus_owner.is_some() && image.owner.as_deref() == focus_owner;
                let lit = if highlight.is_some() {
                    related && (focus_owner.is_none() || same_owner)
                } else {
                    matched
                };
                let fill = owner_tint(image.owner.as_deref(), base);
                painter.rect_filled(cell, 2.0, if lit { fill } else { dim_color(fill, 0.15) });

                let focused = self.gallery_focus
                    == Some(GalleryFocus {
                        concept: tile.concept,
                        image: index,
                    });
                if focused {
                    painter.rect_stroke(
                        cell,
                        2.0,
                        Stroke::new(2.0, ACCENT),
                        egui::StrokeKind::Outside,
                    );
                }
            }
        }
    }
}
