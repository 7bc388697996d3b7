use std::collections::HashSet;

use lauds_landscape::dataset::{Dataset, Gallery};

use super::{ForceView, HighlightState};

/// Order-independent key for an undirected edge between two slots.
pub(super) fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

/// The highlighted entity and its direct neighbours that are in view.
pub(super) fn network_highlight(
    dataset: &Dataset,
    view: &ForceView,
    entity: usize,
) -> HighlightState {
    let mut nodes = HashSet::new();
    let mut edges = HashSet::new();

    let Some(source) = view.slot_of(entity) else {
        return HighlightState { nodes, edges };
    };
    nodes.insert(source);

    for &neighbor in dataset.neighbors(entity) {
        if let Some(target) = view.slot_of(neighbor) {
            nodes.insert(target);
            edges.insert(edge_key(source, target));
        }
    }

    HighlightState { nodes, edges }
}

/// The highlighted gallery concept and every shown concept with an image by
/// the same owner. Edges run from the highlighted tile to each of them.
pub(super) fn gallery_highlight(
    gallery: &Gallery,
    view: &ForceView,
    concept: usize,
) -> HighlightState {
    let mut nodes = HashSet::new();
    let mut edges = HashSet::new();

    let Some(source) = view.slot_of(concept) else {
        return HighlightState { nodes, edges };
    };
    nodes.insert(source);

    for related in gallery.concepts_sharing_owner(concept) {
        if let Some(target) = view.slot_of(related) {
            nodes.insert(target);
            edges.insert((source, target));
        }
    }

    HighlightState { nodes, edges }
}
