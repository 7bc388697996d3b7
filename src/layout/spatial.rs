use std::collections::HashMap;

use tracing::warn;

use crate::geo::GeoPoint;

/// Two or more entities sharing one exact coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub point: GeoPoint,
    /// Member entity indices in input order.
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Stable label used to key the cluster in the layout. Distinct for every
    /// coordinate that groups separately.
    pub fn label(&self) -> String {
        format!(
            "{},{}",
            self.point.latitude + 0.0,
            self.point.longitude + 0.0
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SpatialItem {
    Single { index: usize, point: GeoPoint },
    Cluster(Cluster),
}

impl SpatialItem {
    pub fn point(&self) -> GeoPoint {
        match self {
            Self::Single { point, .. } => *point,
            Self::Cluster(cluster) => cluster.point,
        }
    }

    pub fn members(&self) -> &[usize] {
        match self {
            Self::Single { index, .. } => std::slice::from_ref(index),
            Self::Cluster(cluster) => &cluster.members,
        }
    }
}

/// Groups entities by exact coordinate unless `use_geolocation` is set, in
/// which case every entity stays on its own. Groups are emitted in the order
/// their first member appears; rebuilding from the same input yields the same
/// items.
pub fn build_clusters(points: &[(usize, GeoPoint)], use_geolocation: bool) -> Vec<SpatialItem> {
    if use_geolocation {
        return points
            .iter()
            .map(|&(index, point)| SpatialItem::Single { index, point })
            .collect();
    }

    let mut slot_by_key: HashMap<(u64, u64), usize> = HashMap::new();
    let mut groups: Vec<(GeoPoint, Vec<usize>)> = Vec::new();
    for &(index, point) in points {
        let slot = *slot_by_key.entry(point.bits_key()).or_insert_with(|| {
            groups.push((point, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(index);
    }

    groups
        .into_iter()
        .map(|(point, members)| match members.as_slice() {
            [index] => SpatialItem::Single {
                index: *index,
                point,
            },
            _ => SpatialItem::Cluster(Cluster { point, members }),
        })
        .collect()
}

/// Entities whose distance rounds to the same tenth.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceBucket {
    pub distance: f64,
    pub members: Vec<usize>,
}

pub fn round_distance(distance: f64) -> f64 {
    (distance * 10.0).round() / 10.0
}

/// Buckets `(index, distance)` pairs by rounded distance, nearest first.
/// Members keep their input order. Non-finite distances are dropped.
pub fn bucket_by_distance(distances: &[(usize, f64)]) -> Vec<DistanceBucket> {
    let mut slot_by_key: HashMap<u64, usize> = HashMap::new();
    let mut buckets: Vec<DistanceBucket> = Vec::new();
    for &(index, distance) in distances {
        if !distance.is_finite() {
            warn!(index, "dropping entity with non-finite distance");
            continue;
        }
        let rounded = round_distance(distance) + 0.0;
        let slot = *slot_by_key.entry(rounded.to_bits()).or_insert_with(|| {
            buckets.push(DistanceBucket {
                distance: rounded,
                members: Vec::new(),
            });
            buckets.len() - 1
        });
        buckets[slot].members.push(index);
    }

    buckets.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: GeoPoint = GeoPoint::new(48.8566, 2.3522);
    const LYON: GeoPoint = GeoPoint::new(45.764, 4.8357);

    #[test]
    fn identical_coordinates_form_one_cluster() {
        let items = build_clusters(&[(0, PARIS), (1, PARIS)], false);
        assert_eq!(items.len(), 1);
        let SpatialItem::Cluster(cluster) = &items[0] else {
            panic!("expected a cluster");
        };
        assert_eq!(cluster.member_count(), 2);
        assert_eq!(cluster.point, PARIS);
        assert_eq!(cluster.members, vec![0, 1]);
    }

    #[test]
    fn geolocation_mode_never_clusters() {
        let items = build_clusters(&[(0, PARIS), (1, PARIS)], true);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| matches!(item, SpatialItem::Single { .. })));
    }

    #[test]
    fn singletons_stay_plain_and_order_is_first_seen() {
        let items = build_clusters(&[(4, LYON), (2, PARIS), (7, LYON)], false);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].point(), LYON);
        assert_eq!(items[0].members(), &[4, 7]);
        assert_eq!(
            items[1],
            SpatialItem::Single {
                index: 2,
                point: PARIS
            }
        );
    }

    #[test]
    fn clusters_apart_past_the_sixth_decimal_keep_distinct_labels() {
        let north = GeoPoint::new(45.4642031, 9.19);
        let south = GeoPoint::new(45.4642034, 9.19);
        let items = build_clusters(&[(0, north), (1, north), (2, south), (3, south)], false);
        let labels = items
            .iter()
            .map(|item| match item {
                SpatialItem::Cluster(cluster) => cluster.label(),
                other => panic!("expected clusters, got {other:?}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(labels.len(), 2);
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let input = [(0, PARIS), (1, LYON), (2, PARIS), (3, LYON), (4, GeoPoint::new(0.0, 0.0))];
        assert_eq!(build_clusters(&input, false), build_clusters(&input, false));
    }

    #[test]
    fn buckets_round_to_a_tenth_and_sort() {
        let buckets =
            bucket_by_distance(&[(0, 12.04), (1, 3.0), (2, 11.96), (3, f64::NAN), (4, 3.04)]);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].distance, 3.0);
        assert_eq!(buckets[0].members, vec![1, 4]);
        assert_eq!(buckets[1].distance, 12.0);
        assert_eq!(buckets[1].members, vec![0, 2]);
    }
}
