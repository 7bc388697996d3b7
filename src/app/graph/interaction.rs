use eframe::egui::{self, Pos2, Rect, Ui};

use lauds_landscape::dataset::EntityKey;
use lauds_landscape::interaction::InteractionEvent;

use super::super::render_utils::{circle_visible, screen_to_world};
use super::super::{Camera, ForceView, ViewModel};

/// What the pointer did to the canvas this frame, in member indices.
pub(in crate::app) struct PointerFrame {
    pub(in crate::app) hovered: Option<usize>,
    pub(in crate::app) clicked: bool,
    pub(in crate::app) canvas_hovered: bool,
}

impl Camera {
    pub(in crate::app) fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(self.min_zoom, self.max_zoom);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    /// Secondary and middle drags always pan; a primary drag pans when it
    /// did not start on a node.
    pub(in crate::app) fn handle_pan(&mut self, response: &egui::Response, primary_pans: bool) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
            || (primary_pans && response.dragged_by(egui::PointerButton::Primary))
        {
            self.pan += response.drag_delta();
        }
    }
}

impl ViewModel {
    pub(in crate::app) fn visible_indices(
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Vec<usize> {
        (0..screen_positions.len())
            .filter(|&index| circle_visible(rect, screen_positions[index], screen_radii[index]))
            .collect()
    }

    pub(in crate::app) fn hovered_index(
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        visible_indices
            .iter()
            .filter_map(|&index| {
                let distance = screen_positions[index].distance(pointer);
                (distance <= screen_radii[index]).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Feeds hover and click changes into the interaction machine. With
    /// `sticky_popup` an open popup survives the pointer leaving its node.
    /// Returns the member whose popup was opened this frame.
    pub(in crate::app) fn route_pointer(
        &mut self,
        pointer: &PointerFrame,
        sticky_popup: bool,
    ) -> Option<usize> {
        if pointer.hovered != self.last_hovered {
            let event = match pointer.hovered {
                Some(member) => InteractionEvent::PointerEnter(member),
                None => InteractionEvent::PointerLeave {
                    onto_popup: sticky_popup || !pointer.canvas_hovered,
                },
            };
            self.session.interaction_mut().handle(event);
            self.last_hovered = pointer.hovered;
        }

        if !pointer.clicked {
            return None;
        }

        match pointer.hovered {
            Some(member) => {
                let opened = self
                    .session
                    .interaction_mut()
                    .handle(InteractionEvent::Click(member));
                self.session.select(Some(member));
                opened.then_some(member)
            }
            None => {
                self.session
                    .interaction_mut()
                    .handle(InteractionEvent::ClickBackground);
                self.session.select(None);
                None
            }
        }
    }

    /// Primary-drag on a node pins it under the pointer until released.
    /// Returns whether a node is being dragged.
    pub(in crate::app) fn handle_node_drag(
        view: &mut ForceView,
        dragging: &mut Option<EntityKey>,
        camera: &Camera,
        rect: Rect,
        response: &egui::Response,
        hovered_slot: Option<usize>,
    ) -> bool {
        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(slot) = hovered_slot
            && let Some(node) = view.engine.nodes().get(slot)
        {
            let key = node.key.clone();
            let position = node.position;
            view.engine.pin(&key, position);
            *dragging = Some(key);
        }

        let Some(key) = dragging.as_ref() else {
            return false;
        };

        if response.drag_stopped() || !response.is_pointer_button_down_on() {
            view.engine.release(key);
            *dragging = None;
            return false;
        }

        if let Some(pointer) = response.interact_pointer_pos() {
            let world = screen_to_world(rect, camera.pan, camera.zoom, pointer);
            view.engine.drag(key, world);
        }
        true
    }
}
