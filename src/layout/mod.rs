mod forces;
pub mod overlap;
pub mod projection;
mod quadtree;
pub mod spatial;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::EntityKey;
use crate::util::{coincident_direction, phyllotaxis, stable_pair};

use forces::{
    ChargeParams, CollisionParams, accumulate_anchor, accumulate_charge, accumulate_collisions,
    accumulate_links, accumulate_radial,
};
use quadtree::QuadNode;

const BARNES_HUT_THETA: f32 = 0.72;
const DRAG_ALPHA_TARGET: f32 = 0.3;

/// How a view places its nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositioningMode {
    /// Charge, link springs and centring.
    ForceGraph,
    /// Each node is pulled to a ring whose radius encodes its distance from
    /// the user, who sits at the origin.
    RadialDistance,
    /// Each node is pulled toward its projected map coordinate.
    GeoProjection,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    pub mode: PositioningMode,
    pub link_distance: f32,
    /// d3 convention: negative values repel.
    pub charge: f32,
    pub center_strength: f32,
    pub collision_strength: f32,
    pub collision_padding: f32,
    pub radial_strength: f32,
    pub anchor_strength: f32,
    pub velocity_decay: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub seed_spacing: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self::network()
    }
}

impl LayoutParams {
    pub fn default_alpha_decay() -> f32 {
        1.0 - 0.001_f32.powf(1.0 / 300.0)
    }

    pub fn network() -> Self {
        Self {
            mode: PositioningMode::ForceGraph,
            link_distance: 100.0,
            charge: -1000.0,
            center_strength: 1.0,
            collision_strength: 0.0,
            collision_padding: 0.0,
            radial_strength: 0.0,
            anchor_strength: 0.0,
            velocity_decay: 0.4,
            alpha_min: 0.001,
            alpha_decay: Self::default_alpha_decay(),
            seed_spacing: 40.0,
        }
    }

    pub fn gallery() -> Self {
        Self {
            charge: -60.0,
            collision_strength: 1.0,
            ..Self::network()
        }
    }

    pub fn radial() -> Self {
        Self {
            mode: PositioningMode::RadialDistance,
            charge: -30.0,
            center_strength: 0.0,
            collision_strength: 0.7,
            collision_padding: 2.0,
            radial_strength: 0.8,
            ..Self::network()
        }
    }

    pub fn projection() -> Self {
        Self {
            mode: PositioningMode::GeoProjection,
            charge: 0.0,
            center_strength: 0.0,
            collision_strength: 0.7,
            collision_padding: 2.0,
            anchor_strength: 0.2,
            ..Self::network()
        }
    }
}

/// Alpha a restart begins from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartEnergy {
    /// View or topology change.
    Structural,
    /// Same view, different filter selection.
    Refilter,
    /// Small disturbance such as jumping to a node.
    Nudge,
}

impl RestartEnergy {
    pub fn alpha(self) -> f32 {
        match self {
            Self::Structural => 1.0,
            Self::Refilter => 0.6,
            Self::Nudge => 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Target {
    Free,
    Radius(f32),
    Point(Vec2),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeSpec {
    pub key: EntityKey,
    pub radius: f32,
    pub target: Target,
}

impl NodeSpec {
    pub fn free(key: EntityKey, radius: f32) -> Self {
        Self {
            key,
            radius,
            target: Target::Free,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LayoutNode {
    pub key: EntityKey,
    pub position: Vec2,
    pub velocity: Vec2,
    pub pinned: Option<Vec2>,
    pub radius: f32,
    pub target: Target,
}

/// Last settled position of every entity the engine has placed.
#[derive(Clone, Debug, Default)]
pub struct PositionCache {
    positions: HashMap<EntityKey, Vec2>,
}

impl PositionCache {
    pub fn remember(&mut self, key: EntityKey, position: Vec2) {
        if position.x.is_finite() && position.y.is_finite() {
            self.positions.insert(key, position);
        }
    }

    pub fn get(&self, key: &EntityKey) -> Option<Vec2> {
        self.positions.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    fn snapshot(&mut self, nodes: &[LayoutNode]) {
        for node in nodes {
            self.remember(node.key.clone(), node.position);
        }
    }
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    radii: Vec<f32>,
    deltas: Vec<Vec2>,
}

/// Relaxation stepper. Owns node coordinates while running; settled
/// positions are copied into the [`PositionCache`].
pub struct LayoutEngine {
    params: LayoutParams,
    nodes: Vec<LayoutNode>,
    index_by_key: HashMap<EntityKey, usize>,
    edges: Vec<(usize, usize)>,
    degrees: Vec<usize>,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    cache: PositionCache,
    scratch: Scratch,
}

impl LayoutEngine {
    pub fn new(params: LayoutParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            index_by_key: HashMap::new(),
            edges: Vec::new(),
            degrees: Vec::new(),
            alpha: 0.0,
            alpha_target: 0.0,
            running: false,
            cache: PositionCache::default(),
            scratch: Scratch::default(),
        }
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn mode(&self) -> PositioningMode {
        self.params.mode
    }

    /// Switches strategy; callers follow up with a structural `set_nodes`.
    pub fn set_params(&mut self, params: LayoutParams) {
        self.params = params;
    }

    /// Replaces the node and edge set. Nodes that stay keep their state,
    /// re-entering nodes get their cached position back, new nodes are seeded
    /// deterministically. Edges index into `specs`.
    pub fn set_nodes(
        &mut self,
        specs: Vec<NodeSpec>,
        edges: &[(usize, usize)],
        energy: RestartEnergy,
    ) {
        self.cache.snapshot(&self.nodes);

        let mut previous = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| (node.key.clone(), node))
            .collect::<HashMap<_, _>>();

        let mut retained = 0usize;
        let mut restored = 0usize;
        let mut nodes = Vec::with_capacity(specs.len());
        let mut index_by_key = HashMap::with_capacity(specs.len());
        let mut slots = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            if let Some(&existing) = index_by_key.get(&spec.key) {
                warn!(key = %spec.key, "duplicate layout node ignored");
                slots.push(existing);
                continue;
            }
            let target = sanitize_target(&spec.key, spec.target);

            let node = match previous.remove(&spec.key) {
                Some(mut node) => {
                    retained += 1;
                    node.radius = spec.radius;
                    node.target = target;
                    node
                }
                None => {
                    let position = match self.cache.get(&spec.key) {
                        Some(position) => {
                            restored += 1;
                            position
                        }
                        None => self.seed_position(index, &spec.key, target),
                    };
                    LayoutNode {
                        key: spec.key.clone(),
                        position,
                        velocity: Vec2::ZERO,
                        pinned: None,
                        radius: spec.radius,
                        target,
                    }
                }
            };
            slots.push(nodes.len());
            index_by_key.insert(spec.key, nodes.len());
            nodes.push(node);
        }

        // Duplicates collapse onto their first occurrence.
        self.edges = edges
            .iter()
            .filter_map(|&(from, to)| Some((*slots.get(from)?, *slots.get(to)?)))
            .filter(|(from, to)| from != to)
            .collect();
        self.degrees = vec![0; nodes.len()];
        for &(from, to) in &self.edges {
            self.degrees[from] += 1;
            self.degrees[to] += 1;
        }

        self.nodes = nodes;
        self.index_by_key = index_by_key;
        if !self.nodes.iter().any(|node| node.pinned.is_some()) {
            self.alpha_target = 0.0;
        }

        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            retained,
            restored,
            ?energy,
            "layout node set replaced"
        );
        self.restart(energy);
    }

    fn seed_position(&self, index: usize, key: &EntityKey, target: Target) -> Vec2 {
        let (jx, jy) = stable_pair(&key.to_string());
        match target {
            Target::Point(point) => point,
            Target::Radius(radius) => {
                let direction = vec2(jx, jy);
                let direction = if direction.length_sq() > 0.0001 {
                    direction.normalized()
                } else {
                    coincident_direction(index, usize::MAX)
                };
                direction * radius
            }
            Target::Free => {
                phyllotaxis(index, self.params.seed_spacing)
                    + vec2(jx, jy) * (self.params.seed_spacing * 0.25)
            }
        }
    }

    pub fn restart(&mut self, energy: RestartEnergy) {
        self.alpha = energy.alpha();
        self.running = !self.nodes.is_empty();
    }

    /// Halts relaxation and records the current positions.
    pub fn stop(&mut self) {
        self.running = false;
        for node in &mut self.nodes {
            node.velocity = Vec2::ZERO;
        }
        self.cache.snapshot(&self.nodes);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn index_of(&self, key: &EntityKey) -> Option<usize> {
        self.index_by_key.get(key).copied()
    }

    pub fn position_of(&self, key: &EntityKey) -> Option<Vec2> {
        self.index_of(key).map(|index| self.nodes[index].position)
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    /// Holds a node at `position` and keeps the simulation warm until every
    /// pin is released.
    pub fn pin(&mut self, key: &EntityKey, position: Vec2) -> bool {
        let Some(index) = self.index_of(key) else {
            return false;
        };
        let node = &mut self.nodes[index];
        node.pinned = Some(position);
        node.position = position;
        node.velocity = Vec2::ZERO;
        self.alpha_target = DRAG_ALPHA_TARGET;
        if !self.running {
            self.running = true;
            self.alpha = self.alpha.max(DRAG_ALPHA_TARGET);
        }
        true
    }

    pub fn drag(&mut self, key: &EntityKey, position: Vec2) -> bool {
        match self.index_of(key) {
            Some(index) if self.nodes[index].pinned.is_some() => {
                self.nodes[index].pinned = Some(position);
                self.nodes[index].position = position;
                true
            }
            _ => false,
        }
    }

    pub fn release(&mut self, key: &EntityKey) -> bool {
        let Some(index) = self.index_of(key) else {
            return false;
        };
        let was_pinned = self.nodes[index].pinned.take().is_some();
        if !self.nodes.iter().any(|node| node.pinned.is_some()) {
            self.alpha_target = 0.0;
        }
        was_pinned
    }

    /// One integration step over all nodes and edges. Returns whether the
    /// simulation is still running afterwards.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
        self.apply_forces();

        if self.alpha < self.params.alpha_min {
            self.running = false;
            self.cache.snapshot(&self.nodes);
            debug!(nodes = self.nodes.len(), "layout settled");
        }
        self.running
    }

    /// Steps until settled or `max_ticks` is reached; returns the ticks taken.
    pub fn run_until_settled(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick() {
            ticks += 1;
        }
        ticks
    }

    fn apply_forces(&mut self) {
        let count = self.nodes.len();
        if count == 0 {
            return;
        }
        let params = self.params;
        let alpha = self.alpha;

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.radii.clear();
        scratch.deltas.clear();
        scratch.deltas.resize(count, Vec2::ZERO);
        for node in &self.nodes {
            scratch.positions.push(node.position);
            scratch.radii.push(node.radius);
        }

        let positions = &scratch.positions;
        let radii = &scratch.radii;
        let deltas = &mut scratch.deltas;

        if count > 1
            && (params.charge != 0.0 || params.collision_strength > 0.0)
            && let Some(tree) = QuadNode::build(positions, radii)
        {
            if params.charge != 0.0 {
                let charge = ChargeParams {
                    repulsion: -params.charge,
                    theta: BARNES_HUT_THETA,
                    alpha,
                };
                for (index, delta) in deltas.iter_mut().enumerate() {
                    accumulate_charge(&tree, index, positions, charge, delta);
                }
            }
            if params.collision_strength > 0.0 {
                accumulate_collisions(
                    &tree,
                    &tree,
                    true,
                    positions,
                    radii,
                    CollisionParams {
                        strength: params.collision_strength,
                        padding: params.collision_padding,
                    },
                    deltas,
                );
            }
        }

        if !self.edges.is_empty() {
            accumulate_links(
                &self.edges,
                &self.degrees,
                positions,
                params.link_distance,
                alpha,
                deltas,
            );
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node.target {
                Target::Free => {}
                Target::Radius(radius) if params.radial_strength > 0.0 => {
                    deltas[index] += accumulate_radial(
                        index,
                        node.position,
                        Vec2::ZERO,
                        radius,
                        params.radial_strength,
                        alpha,
                    );
                }
                Target::Point(anchor) if params.anchor_strength > 0.0 => {
                    deltas[index] +=
                        accumulate_anchor(node.position, anchor, params.anchor_strength, alpha);
                }
                Target::Radius(_) | Target::Point(_) => {}
            }
        }

        let retain = 1.0 - params.velocity_decay;
        let mut centroid = Vec2::ZERO;
        let mut free_count = 0usize;
        for (node, delta) in self.nodes.iter_mut().zip(deltas.iter()) {
            if let Some(pin) = node.pinned {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }
            node.velocity = (node.velocity + *delta) * retain;
            node.position += node.velocity;
            centroid += node.position;
            free_count += 1;
        }

        if params.center_strength > 0.0 && free_count > 0 {
            let shift = -(centroid / free_count as f32) * params.center_strength;
            for node in self.nodes.iter_mut().filter(|node| node.pinned.is_none()) {
                node.position += shift;
            }
        }
    }
}

fn sanitize_target(key: &EntityKey, target: Target) -> Target {
    let finite = match target {
        Target::Free => true,
        Target::Radius(radius) => radius.is_finite(),
        Target::Point(point) => point.x.is_finite() && point.y.is_finite(),
    };
    if finite {
        target
    } else {
        warn!(%key, "non-finite layout target; placing freely");
        Target::Free
    }
}
