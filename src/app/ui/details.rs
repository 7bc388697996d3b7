use eframe::egui::{self, RichText, Ui};

use lauds_landscape::dataset::{EntityKey, ExternalLinks, Group};
use lauds_landscape::interaction::InteractionEvent;
use lauds_landscape::session::ViewKind;
use lauds_landscape::util::{format_distance_km, truncate_label};

use super::super::render_utils::{ACCENT, category_color};
use super::super::{GalleryFocus, ViewModel};

fn draw_links(ui: &mut Ui, links: &ExternalLinks) {
    if links.is_empty() {
        return;
    }
    ui.horizontal_wrapped(|ui| {
        if let Some(website) = &links.website {
            ui.hyperlink_to("Website", website);
        }
        if let Some(instagram) = &links.instagram {
            ui.hyperlink_to("Instagram", instagram);
        }
        if let Some(linkedin) = &links.linkedin {
            ui.hyperlink_to("LinkedIn", linkedin);
        }
    });
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        let interaction = self.session.interaction();
        let popup = interaction.popup_target();
        let Some(target) = popup.or_else(|| interaction.highlighted()) else {
            ui.label(match self.session.view() {
                ViewKind::Network => "Hover a node for a preview, click it to keep it here.",
                ViewKind::Gallery => "Click a concept's images to see who made them.",
                ViewKind::Nearest => "Click a producer for details. Click a group to zoom in.",
            });
            return;
        };

        if popup.is_some() && ui.button("Close").clicked() {
            self.session
                .interaction_mut()
                .handle(InteractionEvent::ClosePopup);
            self.session.select(None);
            self.gallery_focus = None;
            return;
        }
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .id_salt("details_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| match self.session.view() {
                ViewKind::Gallery => self.draw_gallery_details(ui, target),
                ViewKind::Network | ViewKind::Nearest => self.draw_entity_details(ui, target),
            });
    }

    fn draw_entity_details(&mut self, ui: &mut Ui, index: usize) {
        let Some(entity) = self.data.dataset.entity(index) else {
            ui.label("This entry is no longer in the dataset.");
            return;
        };
        let in_network = self.session.view() == ViewKind::Network;
        let mut jump = None;

        ui.label(RichText::new(entity.name()).strong().size(16.0));
        match entity.group() {
            Group::Concept(category) => {
                ui.colored_label(category_color(category), category.label());
            }
            group => {
                ui.small(group.label());
            }
        }
        ui.add_space(4.0);

        if let Some(description) = &entity.description {
            ui.label(description);
        }
        if let Some(location) = &entity.location {
            ui.label(format!("Location: {location}"));
        }
        if let Some(distance) = self
            .nearest
            .layout()
            .filter(|layout| layout.mode.uses_geolocation())
            .and_then(|layout| layout.distances.get(&index))
        {
            ui.label(format!("Distance from you: {}", format_distance_km(*distance)));
        }
        draw_links(ui, &entity.links);

        if entity.is_producer() {
            for (category, names) in &entity.concepts {
                if names.is_empty() {
                    continue;
                }
                ui.separator();
                ui.colored_label(
                    category_color(*category),
                    RichText::new(category.label()).strong(),
                );
                ui.horizontal_wrapped(|ui| {
                    for name in names {
                        if in_network {
                            if ui.link(name).clicked() {
                                jump = Some(EntityKey::concept(*category, name.clone()));
                            }
                        } else {
                            ui.label(name);
                        }
                    }
                });
            }
        } else {
            let producers = self.data.dataset.connected_producers(index);
            ui.separator();
            ui.label(RichText::new(format!("Producers ({})", producers.len())).strong());
            for producer in producers {
                let Some(producer) = self.data.dataset.entity(producer) else {
                    continue;
                };
                if in_network {
                    if ui.link(producer.name()).clicked() {
                        jump = Some(producer.key.clone());
                    }
                } else {
                    ui.label(producer.name());
                }
            }
        }

        if let Some(key) = jump {
            self.jump_to(&key);
        }
    }

    fn draw_gallery_details(&mut self, ui: &mut Ui, concept_index: usize) {
        let Some(concept) = self.data.gallery.concepts().get(concept_index) else {
            ui.label("This concept is no longer in the gallery.");
            return;
        };

        ui.label(RichText::new(&concept.name).strong().size(16.0));
        ui.colored_label(category_color(concept.category), concept.category.label());
        if let Some(description) = self
            .data
            .dataset
            .index_of(&concept.key())
            .and_then(|index| self.data.dataset.entity(index))
            .and_then(|entity| entity.description.as_deref())
        {
            ui.add_space(4.0);
            ui.label(description);
        }

        let mut refocus = None;
        if let Some(image) = self.gallery_focus_image() {
            ui.separator();
            if let Some(owner) = &image.owner {
                ui.label(RichText::new(owner).strong());
            }
            ui.hyperlink_to(truncate_label(&image.url, 48), &image.url)
                .on_hover_text(image.url.as_str());
            if let Some(website) = &image.website {
                ui.hyperlink_to("Website", website);
            }
        }

        ui.separator();
        ui.label(RichText::new(format!("Images ({})", concept.images.len())).strong());
        for (index, image) in concept.images.iter().enumerate() {
            let focused = self.gallery_focus
                == Some(GalleryFocus {
                    concept: concept_index,
                    image: index,
                });
            let label = format!(
                "{}. {}",
                index + 1,
                image.owner.as_deref().unwrap_or("Unknown source")
            );
            if ui.selectable_label(focused, label).clicked() && !focused {
                refocus = Some(index);
            }
        }

        let related = self.gallery_related_images();
        if !related.is_empty() {
            let current = self
                .session
                .interaction()
                .rotation()
                .map_or(0, |timer| timer.index());
            ui.separator();
            ui.label(RichText::new("Images from the same source").strong());
            for (index, image) in related.iter().enumerate() {
                let text = truncate_label(&image.url, 44);
                if index == current {
                    ui.colored_label(ACCENT, format!("> {text}"));
                } else {
                    ui.hyperlink_to(text, &image.url);
                }
            }
        }

        if let Some(image) = refocus
            && self.session.interaction().popup_target() == Some(concept_index)
        {
            self.focus_gallery_image(concept_index, image);
        }
    }
}
