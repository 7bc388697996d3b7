use eframe::egui::Vec2;

use crate::util::coincident_direction;

use super::quadtree::QuadNode;

/// Closest distance used by the charge force so near-coincident bodies do not
/// explode apart.
const MIN_CHARGE_DISTANCE: f32 = 1.0;

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    /// Positive values repel.
    pub(super) repulsion: f32,
    pub(super) theta: f32,
    pub(super) alpha: f32,
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) padding: f32,
}

fn direction_between(from: usize, to: usize, delta: Vec2, distance: f32) -> Vec2 {
    if distance > 0.0001 {
        delta / distance
    } else {
        coincident_direction(from, to)
    }
}

/// Many-body charge on body `index`, approximating distant cells by their
/// centre of mass. Magnitude falls off with `1 / distance`.
pub(super) fn accumulate_charge(
    cell: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    delta: &mut Vec2,
) {
    if cell.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if cell.is_leaf() {
        for &other in &cell.indices {
            if other == index {
                continue;
            }
            let offset = point - positions[other];
            let distance = offset.length();
            let direction = direction_between(index, other, offset, distance);
            *delta += direction * (params.repulsion * params.alpha
                / distance.max(MIN_CHARGE_DISTANCE));
        }
        return;
    }

    let offset = point - cell.center_of_mass;
    let distance = offset.length().max(MIN_CHARGE_DISTANCE);
    let far_enough = !cell.bounds.contains(point)
        && (cell.bounds.side_length() / distance) < params.theta;

    if far_enough {
        *delta += (offset / distance) * (params.repulsion * params.alpha * cell.mass / distance);
        return;
    }

    for child in cell.children() {
        accumulate_charge(child, index, positions, params, delta);
    }
}

fn separate_pair(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    deltas: &mut [Vec2],
) {
    let offset = positions[from] - positions[to];
    let distance = offset.length();
    let min_distance = radii[from] + radii[to] + params.padding;
    if distance >= min_distance {
        return;
    }

    let direction = direction_between(from, to, offset, distance);
    let push = (min_distance - distance) * params.strength * 0.5;
    deltas[from] += direction * push;
    deltas[to] -= direction * push;
}

/// Pairwise overlap removal. Cells are only compared when their boxes are
/// close enough for their largest bodies to touch.
pub(super) fn accumulate_collisions(
    cell_a: &QuadNode,
    cell_b: &QuadNode,
    same_cell: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    deltas: &mut [Vec2],
) {
    let reach = cell_a.max_radius + cell_b.max_radius + params.padding;
    if cell_a.bounds.gap_sq(cell_b.bounds) > reach * reach {
        return;
    }

    if cell_a.is_leaf() && cell_b.is_leaf() {
        if same_cell {
            for (position, &from) in cell_a.indices.iter().enumerate() {
                for &to in &cell_a.indices[position + 1..] {
                    separate_pair(from, to, positions, radii, params, deltas);
                }
            }
        } else {
            for &from in &cell_a.indices {
                for &to in &cell_b.indices {
                    separate_pair(from, to, positions, radii, params, deltas);
                }
            }
        }
        return;
    }

    if same_cell {
        let children = cell_a.children().collect::<Vec<_>>();
        for (position, child) in children.iter().enumerate() {
            accumulate_collisions(child, child, true, positions, radii, params, deltas);
            for other in &children[position + 1..] {
                accumulate_collisions(child, other, false, positions, radii, params, deltas);
            }
        }
        return;
    }

    let split_a = if cell_a.is_leaf() {
        false
    } else if cell_b.is_leaf() {
        true
    } else {
        cell_a.bounds.half_extent >= cell_b.bounds.half_extent
    };

    if split_a {
        for child in cell_a.children() {
            accumulate_collisions(child, cell_b, false, positions, radii, params, deltas);
        }
    } else {
        for child in cell_b.children() {
            accumulate_collisions(cell_a, child, false, positions, radii, params, deltas);
        }
    }
}

/// Spring toward `rest_length` along each edge; the lower-degree endpoint
/// moves more, as in d3's link force.
pub(super) fn accumulate_links(
    edges: &[(usize, usize)],
    degrees: &[usize],
    positions: &[Vec2],
    rest_length: f32,
    alpha: f32,
    deltas: &mut [Vec2],
) {
    let count = positions.len();
    for &(source, target) in edges {
        if source >= count || target >= count || source == target {
            continue;
        }

        let offset = positions[target] - positions[source];
        let distance = offset.length();
        if distance <= 0.0001 {
            continue;
        }

        let source_degree = degrees[source].max(1) as f32;
        let target_degree = degrees[target].max(1) as f32;
        let strength = 1.0 / source_degree.min(target_degree);
        let bias = source_degree / (source_degree + target_degree);

        let stretch = (distance - rest_length) / distance * alpha * strength;
        let correction = offset * stretch;
        deltas[target] -= correction * bias;
        deltas[source] += correction * (1.0 - bias);
    }
}

/// Pulls each anchored body toward its anchor point.
pub(super) fn accumulate_anchor(position: Vec2, anchor: Vec2, strength: f32, alpha: f32) -> Vec2 {
    (anchor - position) * (strength * alpha)
}

/// Pulls a body toward the circle of `radius` around `center`.
pub(super) fn accumulate_radial(
    index: usize,
    position: Vec2,
    center: Vec2,
    radius: f32,
    strength: f32,
    alpha: f32,
) -> Vec2 {
    let offset = position - center;
    let distance = offset.length();
    let direction = direction_between(index, usize::MAX, offset, distance);
    direction * ((radius - distance) * strength * alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;

    #[test]
    fn charge_pushes_bodies_apart() {
        let positions = vec![vec2(-5.0, 0.0), vec2(5.0, 0.0)];
        let radii = vec![1.0, 1.0];
        let tree = QuadNode::build(&positions, &radii).unwrap();
        let params = ChargeParams {
            repulsion: 100.0,
            theta: 0.9,
            alpha: 1.0,
        };
        let mut left = Vec2::ZERO;
        let mut right = Vec2::ZERO;
        accumulate_charge(&tree, 0, &positions, params, &mut left);
        accumulate_charge(&tree, 1, &positions, params, &mut right);
        assert!(left.x < 0.0);
        assert!(right.x > 0.0);
        assert!((left.x + right.x).abs() < 1e-4);
    }

    #[test]
    fn collisions_only_touch_overlapping_pairs() {
        let positions = vec![vec2(0.0, 0.0), vec2(3.0, 0.0), vec2(100.0, 0.0)];
        let radii = vec![2.0, 2.0, 2.0];
        let tree = QuadNode::build(&positions, &radii).unwrap();
        let mut deltas = vec![Vec2::ZERO; 3];
        accumulate_collisions(
            &tree,
            &tree,
            true,
            &positions,
            &radii,
            CollisionParams {
                strength: 1.0,
                padding: 0.0,
            },
            &mut deltas,
        );
        assert!(deltas[0].x < 0.0);
        assert!(deltas[1].x > 0.0);
        assert_eq!(deltas[2], Vec2::ZERO);
    }

    #[test]
    fn links_pull_stretched_edges_together() {
        let positions = vec![vec2(0.0, 0.0), vec2(300.0, 0.0)];
        let mut deltas = vec![Vec2::ZERO; 2];
        accumulate_links(&[(0, 1)], &[1, 1], &positions, 100.0, 1.0, &mut deltas);
        assert!(deltas[0].x > 0.0);
        assert!(deltas[1].x < 0.0);
    }

    #[test]
    fn radial_force_targets_the_ring() {
        let inside = accumulate_radial(0, vec2(10.0, 0.0), Vec2::ZERO, 50.0, 1.0, 1.0);
        let outside = accumulate_radial(0, vec2(90.0, 0.0), Vec2::ZERO, 50.0, 1.0, 1.0);
        assert!(inside.x > 0.0);
        assert!(outside.x < 0.0);
    }
}
