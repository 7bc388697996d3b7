use std::collections::HashMap;

use tracing::debug;

use lauds_landscape::layout::{NodeSpec, RestartEnergy};
use lauds_landscape::session::ViewKind;

use super::super::render_utils::{GALLERY_TILE_RADIUS, node_radius};
use super::super::{ForceView, ViewModel};

impl ForceView {
    /// Hands a new node set to the engine and records which member sits in
    /// which slot. `edges` pairs members, not slots.
    fn install(
        &mut self,
        members: Vec<usize>,
        specs: Vec<NodeSpec>,
        member_edges: &[(usize, usize)],
        energy: RestartEnergy,
    ) {
        let slot_by_member = members
            .iter()
            .enumerate()
            .map(|(slot, &member)| (member, slot))
            .collect::<HashMap<_, _>>();
        let edges = member_edges
            .iter()
            .filter_map(|(a, b)| Some((*slot_by_member.get(a)?, *slot_by_member.get(b)?)))
            .collect::<Vec<_>>();

        self.engine.set_nodes(specs, &edges, energy);
        self.members = members;
        self.slot_by_member = slot_by_member;
        self.edges = edges;
        self.built = true;
    }
}

impl ViewModel {
    pub(in crate::app) fn refresh_visibility(&mut self) {
        self.visibility = self.session.compute_visible(&self.data.dataset);
        self.revision = self.revision.wrapping_add(1);
    }

    pub(in crate::app) fn rebuild_network(&mut self, energy: RestartEnergy) {
        let dataset = &self.data.dataset;
        let mut members = Vec::with_capacity(self.visibility.entities.len());
        let mut specs = Vec::with_capacity(self.visibility.entities.len());
        for &index in &self.visibility.entities {
            let Some(entity) = dataset.entity(index) else {
                continue;
            };
            members.push(index);
            specs.push(NodeSpec::free(entity.key.clone(), node_radius(entity.group())));
        }

        let edges = self
            .visibility
            .connections
            .iter()
            .map(|connection| (connection.producer, connection.concept))
            .collect::<Vec<_>>();

        debug!(nodes = specs.len(), edges = edges.len(), ?energy, "network rebuilt");
        self.network.install(members, specs, &edges, energy);
        self.revision = self.revision.wrapping_add(1);
    }

    pub(in crate::app) fn rebuild_gallery(&mut self, energy: RestartEnergy) {
        let filters = *self.session.filters();
        let (members, specs): (Vec<_>, Vec<_>) = self
            .data
            .gallery
            .concepts()
            .iter()
            .enumerate()
            .filter(|(_, concept)| filters.is_active(concept.category))
            .map(|(index, concept)| (index, NodeSpec::free(concept.key(), GALLERY_TILE_RADIUS)))
            .unzip();

        debug!(tiles = specs.len(), ?energy, "gallery rebuilt");
        self.gallery.install(members, specs, &[], energy);
        self.gallery_focus = None;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Brings the force views in line with the current filters. A view that
    /// has never been shown is built from scratch.
    pub(in crate::app) fn apply_filters(&mut self, energy: RestartEnergy) {
        self.refresh_visibility();
        let network_energy = if self.network.built {
            energy
        } else {
            RestartEnergy::Structural
        };
        self.rebuild_network(network_energy);

        if self.gallery.built {
            self.rebuild_gallery(energy);
        }
    }

    pub(in crate::app) fn ensure_built(&mut self) {
        match self.session.view() {
            ViewKind::Network if !self.network.built => {
                self.rebuild_network(RestartEnergy::Structural);
            }
            ViewKind::Gallery if !self.gallery.built => {
                self.rebuild_gallery(RestartEnergy::Structural);
            }
            _ => {}
        }
    }
}
