use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use crate::error::LandscapeError;
use crate::geo::GeoPoint;

use super::category::{Category, EntityKey};
use super::fetch::{DataSource, read_source};
use super::gallery::Gallery;
use super::graph::{Connection, Dataset, Entity};
use super::parse::{
    ConceptRecord, ExternalLinks, ProducerRecord, parse_concepts, parse_gallery, parse_producers,
};

#[derive(Clone, Debug)]
pub struct Sources {
    pub producers: DataSource,
    pub concepts: Option<DataSource>,
    pub gallery: Option<DataSource>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadedData {
    pub dataset: Dataset,
    pub gallery: Gallery,
}

pub fn load_sources(sources: &Sources) -> Result<LoadedData> {
    let raw_producers = read_source(&sources.producers)
        .with_context(|| format!("failed to load producers from {}", sources.producers))?;
    let producers = parse_producers(&raw_producers).context("failed to parse producer sheet")?;

    let concepts = match &sources.concepts {
        Some(source) => {
            let raw = read_source(source)
                .with_context(|| format!("failed to load concepts from {source}"))?;
            parse_concepts(&raw).context("failed to parse concept sheet")?
        }
        None => Vec::new(),
    };

    let gallery = match &sources.gallery {
        Some(source) => {
            let raw = read_source(source)
                .with_context(|| format!("failed to load gallery from {source}"))?;
            Gallery::from_records(parse_gallery(&raw).context("failed to parse gallery sheet")?)
        }
        None => Gallery::default(),
    };

    let dataset = build_dataset(producers, concepts);
    if dataset.producer_count() == 0 {
        return Err(anyhow!("no producers found in {}", sources.producers));
    }

    info!(
        entities = dataset.len(),
        connections = dataset.connections().len(),
        gallery_concepts = gallery.concepts().len(),
        "dataset loaded"
    );
    Ok(LoadedData { dataset, gallery })
}

/// Turns validated rows into the entity/connection model. Concept
/// descriptions come from `concepts`, matched by name and, when the concept
/// row names one, by category.
pub fn build_dataset(producers: Vec<ProducerRecord>, concepts: Vec<ConceptRecord>) -> Dataset {
    let mut descriptions: HashMap<(Option<Category>, String), String> = HashMap::new();
    for concept in concepts {
        if let Some(description) = concept.description {
            descriptions.insert((concept.category, concept.name), description);
        }
    }

    let mut entities: Vec<Entity> = Vec::new();
    let mut index_by_key: HashMap<EntityKey, usize> = HashMap::new();
    let mut connections = Vec::new();

    for producer in producers {
        let key = EntityKey::producer(producer.name.clone());
        if index_by_key.contains_key(&key) {
            warn!(name = %producer.name, "duplicate producer row; keeping the first");
            continue;
        }

        let producer_index = entities.len();
        index_by_key.insert(key.clone(), producer_index);

        let concept_lists = producer.concepts.clone();
        entities.push(Entity {
            key,
            description: producer.description,
            location: producer.location,
            coordinates: producer.coordinates,
            links: producer.links,
            concepts: producer.concepts,
        });

        for (category, names) in concept_lists {
            for name in names {
                let concept_key = EntityKey::concept(category, name.clone());
                let concept_index = match index_by_key.get(&concept_key) {
                    Some(&index) => index,
                    None => {
                        let description = descriptions
                            .get(&(Some(category), name.clone()))
                            .or_else(|| descriptions.get(&(None, name.clone())))
                            .cloned();
                        let index = entities.len();
                        entities.push(Entity {
                            key: concept_key.clone(),
                            description,
                            location: None,
                            coordinates: None,
                            links: ExternalLinks::default(),
                            concepts: BTreeMap::new(),
                        });
                        index_by_key.insert(concept_key, index);
                        index
                    }
                };

                connections.push(Connection {
                    producer: producer_index,
                    concept: concept_index,
                });
            }
        }
    }

    Dataset::new(entities, connections)
}

/// A producer with usable coordinates, as shown in the nearest view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Site {
    pub entity: usize,
    pub point: GeoPoint,
}

/// Producers with valid coordinates. Rows without them are dropped; an empty
/// result is a load failure for the nearest view.
pub fn nearest_sites(dataset: &Dataset) -> Result<Vec<Site>, LandscapeError> {
    let mut sites = Vec::new();
    for (index, entity) in dataset.entities().iter().enumerate() {
        if !entity.is_producer() {
            continue;
        }
        match entity.coordinates.filter(|point| point.is_valid()) {
            Some(point) => sites.push(Site {
                entity: index,
                point,
            }),
            None => {
                let error = LandscapeError::MissingCoordinate {
                    name: entity.name().to_owned(),
                };
                debug!("{error}; excluded from nearest view");
            }
        }
    }

    if sites.is_empty() {
        return Err(LandscapeError::DataLoad(
            "no producer has coordinates for the nearest view".to_owned(),
        ));
    }
    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer(
        name: &str,
        concepts: &[(Category, &[&str])],
        point: Option<GeoPoint>,
    ) -> ProducerRecord {
        ProducerRecord {
            name: name.to_owned(),
            description: None,
            location: None,
            links: ExternalLinks::default(),
            coordinates: point,
            concepts: concepts
                .iter()
                .map(|(category, names)| {
                    (*category, names.iter().map(|name| (*name).to_owned()).collect())
                })
                .collect(),
        }
    }

    #[test]
    fn shared_concepts_become_one_entity() {
        let dataset = build_dataset(
            vec![
                producer("Acme", &[(Category::Values, &["Reuse"])], None),
                producer("Bolt", &[(Category::Values, &["Reuse"])], None),
            ],
            Vec::new(),
        );
        assert_eq!(dataset.len(), 3);
        let reuse = dataset
            .index_of(&EntityKey::concept(Category::Values, "Reuse"))
            .unwrap();
        assert_eq!(dataset.connected_producers(reuse).len(), 2);
    }

    #[test]
    fn producer_and_concept_may_share_a_name() {
        let dataset = build_dataset(
            vec![producer("Commons", &[(Category::Values, &["Commons"])], None)],
            Vec::new(),
        );
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.connections().len(), 1);
    }

    #[test]
    fn concept_descriptions_prefer_matching_category() {
        let dataset = build_dataset(
            vec![producer("Acme", &[(Category::Materials, &["Wood"])], None)],
            vec![
                ConceptRecord {
                    name: "Wood".to_owned(),
                    description: Some("generic".to_owned()),
                    category: None,
                },
                ConceptRecord {
                    name: "Wood".to_owned(),
                    description: Some("material".to_owned()),
                    category: Some(Category::Materials),
                },
            ],
        );
        let wood = dataset
            .index_of(&EntityKey::concept(Category::Materials, "Wood"))
            .and_then(|index| dataset.entity(index))
            .unwrap();
        assert_eq!(wood.description.as_deref(), Some("material"));
    }

    #[test]
    fn nearest_sites_skip_missing_coordinates() {
        let dataset = build_dataset(
            vec![
                producer("Acme", &[], Some(GeoPoint::new(48.8566, 2.3522))),
                producer("Nowhere", &[], None),
            ],
            Vec::new(),
        );
        let sites = nearest_sites(&dataset).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(dataset.entity(sites[0].entity).unwrap().name(), "Acme");
    }

    #[test]
    fn nearest_sites_fail_when_nothing_is_placeable() {
        let dataset = build_dataset(vec![producer("Nowhere", &[], None)], Vec::new());
        assert!(matches!(
            nearest_sites(&dataset),
            Err(LandscapeError::DataLoad(_))
        ));
    }
}
