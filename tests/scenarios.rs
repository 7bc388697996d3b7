use eframe::egui::vec2;

use lauds_landscape::LandscapeError;
use lauds_landscape::dataset::{
    Category, Dataset, EntityKey, Gallery, build_dataset, nearest_sites, parse_concepts,
    parse_gallery, parse_producers,
};
use lauds_landscape::filter::{FilterState, ToggleOutcome, compute_visible};
use lauds_landscape::geo::{GeoPoint, distance_km};
use lauds_landscape::geolocation::{
    FixedLocation, ModeDecision, NearestMode, Unavailable, resolve_nearest_mode,
};
use lauds_landscape::layout::overlap::{self, AxisFrame, OverlapConfig};
use lauds_landscape::layout::projection::Viewport;
use lauds_landscape::layout::spatial::{SpatialItem, bucket_by_distance, build_clusters};
use lauds_landscape::session::{ViewKind, ViewSelection, ViewSelectionStore, ViewSession};
use lauds_landscape::zoom::{MEMBER_RING_RADIUS, Marker, ZoomLevelController, ZoomTier, present};

const PRODUCERS: &str = "\
Name,Description,Website,Location,Latitude,Longitude,Values,Materials,Processes and Technologies
Acme,Makes things,https://acme.example,Paris,48.8566,2.3522,Reuse,Wood,
Atelier Nord, Bike repair ,,Paris,48.8566,2.3522,\"Reuse, Repair\",,Welding
Nomad,No fixed address,,,,,Repair,Steel,
";

const CONCEPTS: &str = "\
Node,Description,Category
Reuse,Using things again,Values
Wood,,Materials
";

const GALLERY: &str = "\
Materials,Image Link,Owner,Website Link
Wood,https://img.example/wood-1.jpg,Acme,https://acme.example
\"Wood, Steel\",https://img.example/wood-2.jpg,Nomad,
Steel,https://img.example/steel-1.jpg,Acme,
";

fn dataset() -> Dataset {
    let producers = parse_producers(PRODUCERS).expect("producer sheet parses");
    let concepts = parse_concepts(CONCEPTS).expect("concept sheet parses");
    build_dataset(producers, concepts)
}

fn index(dataset: &Dataset, key: EntityKey) -> usize {
    dataset.index_of(&key).expect("entity exists")
}

#[test]
fn sheet_builds_entities_and_connections() {
    let dataset = dataset();

    assert_eq!(dataset.producer_count(), 3);
    assert_eq!(dataset.concept_count(Category::Values), 2);
    assert_eq!(dataset.concept_count(Category::Materials), 2);

    let acme = index(&dataset, EntityKey::producer("Acme"));
    let reuse = index(&dataset, EntityKey::concept(Category::Values, "Reuse"));
    let atelier = index(&dataset, EntityKey::producer("Atelier Nord"));
    assert!(dataset.neighbors(acme).contains(&reuse));
    assert_eq!(dataset.connected_producers(reuse), {
        let mut expected = vec![acme, atelier];
        expected.sort_unstable();
        expected
    });

    let atelier = dataset.entity(atelier).expect("atelier");
    assert_eq!(atelier.description.as_deref(), Some("Bike repair"));
    assert_eq!(
        dataset
            .entity(reuse)
            .and_then(|entity| entity.description.as_deref()),
        Some("Using things again")
    );
}

#[test]
fn acme_stays_visible_through_materials_and_last_filter_is_kept() {
    let dataset = dataset();
    let acme = index(&dataset, EntityKey::producer("Acme"));
    let reuse = index(&dataset, EntityKey::concept(Category::Values, "Reuse"));
    let wood = index(&dataset, EntityKey::concept(Category::Materials, "Wood"));

    let mut filters = FilterState::only(Category::Values);
    filters.set(Category::Materials, true);

    assert!(matches!(
        filters.toggle(Category::Values),
        ToggleOutcome::Applied { active: false, .. }
    ));
    let visible = compute_visible(&filters, &dataset);
    assert!(visible.contains(acme));
    assert!(visible.contains(wood));
    assert!(!visible.contains(reuse));

    assert!(matches!(
        filters.toggle(Category::Materials),
        ToggleOutcome::Rejected { .. }
    ));
    assert_eq!(filters.active_categories(), vec![Category::Materials]);
    assert_eq!(compute_visible(&filters, &dataset), visible);
}

#[test]
fn denied_geolocation_projects_only_located_producers() {
    let dataset = dataset();

    let decision = resolve_nearest_mode(&mut Unavailable, None);
    assert_eq!(decision, ModeDecision::Ready(NearestMode::Projected));

    let sites = nearest_sites(&dataset).expect("two producers have coordinates");
    let nomad = index(&dataset, EntityKey::producer("Nomad"));
    assert_eq!(sites.len(), 2);
    assert!(sites.iter().all(|site| site.entity != nomad));
}

#[test]
fn nearest_view_without_any_coordinates_is_a_load_failure() {
    let producers = parse_producers("Name,Values\nNomad,Repair\n").expect("sheet parses");
    let dataset = build_dataset(producers, Vec::new());

    assert!(matches!(
        nearest_sites(&dataset),
        Err(LandscapeError::DataLoad(_))
    ));
}

#[test]
fn shared_paris_address_clusters_and_splits_at_the_threshold() {
    let dataset = dataset();
    let points = nearest_sites(&dataset)
        .expect("sites")
        .iter()
        .map(|site| (site.entity, site.point))
        .collect::<Vec<_>>();

    let items = build_clusters(&points, false);
    assert_eq!(items.len(), 1);
    let SpatialItem::Cluster(cluster) = &items[0] else {
        panic!("expected a cluster, got {:?}", items[0]);
    };
    assert_eq!(cluster.member_count(), 2);
    assert_eq!(cluster.point, GeoPoint::new(48.8566, 2.3522));

    let mut zoom = ZoomLevelController::default();
    let anchor = vec2(120.0, -40.0);
    let (tier, _) = zoom.update(1.0);
    assert_eq!(tier, ZoomTier::Clustered);
    assert!(matches!(
        present(&items, &[anchor], tier).as_slice(),
        [Marker::Aggregate { member_count: 2, .. }]
    ));

    let (tier, changed) = zoom.update(2.0);
    assert!(changed);
    assert_eq!(tier, ZoomTier::Expanded);
    let markers = present(&items, &[anchor], tier);
    assert_eq!(markers.len(), 2);
    let offsets = markers
        .iter()
        .map(|marker| match marker {
            Marker::Member {
                position,
                cluster_position,
                ..
            } => {
                assert_eq!(*cluster_position, anchor);
                *position - anchor
            }
            other => panic!("expected members, got {other:?}"),
        })
        .collect::<Vec<_>>();
    assert!((offsets[0] - vec2(MEMBER_RING_RADIUS, 0.0)).length() < 1e-3);
    assert!((offsets[1] - vec2(-MEMBER_RING_RADIUS, 0.0)).length() < 1e-3);

    let (tier, _) = zoom.update(1.5);
    let reformed = present(&items, &[anchor], tier);
    let Marker::Aggregate {
        members, position, ..
    } = &reformed[0]
    else {
        panic!("expected the cluster back");
    };
    assert_eq!(members, &cluster.members);
    assert_eq!(*position, anchor);
}

#[test]
fn geolocated_distance_axis_keeps_markers_apart() {
    let user = GeoPoint::new(48.85, 2.35);
    let mut provider = FixedLocation::new(user);
    assert_eq!(
        resolve_nearest_mode(&mut provider, None),
        ModeDecision::Ready(NearestMode::Geolocated { user })
    );

    let points = (0..12)
        .map(|index| {
            let offset = (index % 3) as f64 * 0.01;
            (index, GeoPoint::new(48.9 + offset, 2.4 + offset))
        })
        .collect::<Vec<_>>();
    let distances = points
        .iter()
        .map(|&(index, point)| (index, distance_km(user, point)))
        .collect::<Vec<_>>();
    let max_distance = distances.iter().map(|&(_, d)| d).fold(0.0, f64::max);

    let buckets = bucket_by_distance(&distances);
    let frame = AxisFrame::from_viewport(&Viewport::new(1200.0, 760.0));
    let config = OverlapConfig::default();
    let first = overlap::resolve(&buckets, max_distance, &frame, &config);
    assert_eq!(first, overlap::resolve(&buckets, max_distance, &frame, &config));
    assert_eq!(first.len(), points.len());

    for bucket in &buckets {
        let placed = first
            .iter()
            .filter(|position| bucket.members.contains(&position.index) && position.resolved)
            .collect::<Vec<_>>();
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                assert!((a.position.y - b.position.y).abs() >= config.min_dist - 1e-3);
            }
        }
    }
}

#[test]
fn gallery_groups_images_per_concept() {
    let gallery = Gallery::from_records(parse_gallery(GALLERY).expect("gallery sheet parses"));
    let names = gallery
        .concepts()
        .iter()
        .map(|concept| concept.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Wood", "Steel"]);
    assert_eq!(gallery.concepts()[0].images.len(), 2);

    let related = gallery.related_images("Acme", Some("https://img.example/wood-1.jpg"));
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].url, "https://img.example/steel-1.jpg");
}

#[test]
fn jumping_to_a_hidden_concept_turns_its_category_on() {
    let dataset = dataset();
    let mut session = ViewSession::new(ViewSelection {
        view: ViewKind::Network,
        filters: FilterState::only(Category::Materials),
    });

    let jump = session
        .jump_to(&dataset, &EntityKey::concept(Category::Values, "Reuse"))
        .expect("target exists");
    assert!(jump.filters_changed);
    assert!(session.filters().is_active(Category::Values));
    assert!(session.compute_visible(&dataset).contains(jump.index));
    assert_eq!(session.interaction().popup_target(), Some(jump.index));

    let missing = session.jump_to(&dataset, &EntityKey::producer("Nobody"));
    assert!(matches!(missing, Err(LandscapeError::TargetNotFound(_))));
    assert_eq!(session.selected(), Some(jump.index));
}

#[test]
fn stored_selection_is_handed_over_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = ViewSelectionStore::new(dir.path().join("nested").join("selection.json"));
    let selection = ViewSelection {
        view: ViewKind::Gallery,
        filters: FilterState::only(Category::Materials),
    };

    store.save(&selection).expect("save");
    assert_eq!(store.take().expect("take"), Some(selection));
    assert!(!store.path().exists());
    assert_eq!(store.take().expect("second take"), None);
}
