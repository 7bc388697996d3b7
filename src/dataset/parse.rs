use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::geo::GeoPoint;

use super::category::Category;

#[derive(Debug, Deserialize)]
struct RawProducerRow {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Website", default)]
    website: Option<String>,
    #[serde(rename = "Location", default)]
    location: Option<String>,
    #[serde(rename = "IG Link", default)]
    instagram: Option<String>,
    #[serde(rename = "Linkedin Link", default)]
    linkedin: Option<String>,
    #[serde(rename = "Latitude", default)]
    latitude: Option<String>,
    #[serde(rename = "Longitude", default)]
    longitude: Option<String>,
    #[serde(rename = "Values", default)]
    values: Option<String>,
    #[serde(rename = "Materials", default)]
    materials: Option<String>,
    #[serde(rename = "Processes and Technologies", default)]
    processes: Option<String>,
    #[serde(rename = "Knowledge Sharing", default)]
    knowledge: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConceptRow {
    #[serde(rename = "Node", alias = "Nodes", default)]
    name: Option<String>,
    #[serde(rename = "Description", alias = "nodesDescription", default)]
    description: Option<String>,
    #[serde(rename = "Category", default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGalleryRow {
    #[serde(rename = "Image Link", default)]
    image: Option<String>,
    #[serde(rename = "Owner", default)]
    owner: Option<String>,
    #[serde(rename = "Website Link", default)]
    website: Option<String>,
    #[serde(rename = "Values", default)]
    values: Option<String>,
    #[serde(rename = "Materials", default)]
    materials: Option<String>,
    #[serde(rename = "Processes and Technologies", default)]
    processes: Option<String>,
    #[serde(rename = "Knowledge Sharing", default)]
    knowledge: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExternalLinks {
    pub website: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
}

impl ExternalLinks {
    pub fn is_empty(&self) -> bool {
        self.website.is_none() && self.instagram.is_none() && self.linkedin.is_none()
    }
}

/// One validated producer row.
#[derive(Clone, Debug, PartialEq)]
pub struct ProducerRecord {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub links: ExternalLinks,
    pub coordinates: Option<GeoPoint>,
    pub concepts: BTreeMap<Category, Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConceptRecord {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<Category>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GalleryRecord {
    pub image_url: Option<String>,
    pub owner: Option<String>,
    pub website: Option<String>,
    pub concepts: BTreeMap<Category, Vec<String>>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Splits a cell like `"Reuse, Repair,Wood"` into trimmed, non-empty names.
pub fn split_list(cell: &str) -> Vec<String> {
    let mut names = Vec::new();
    for part in cell.split(',') {
        let part = part.trim();
        if !part.is_empty() && !names.iter().any(|name| name == part) {
            names.push(part.to_owned());
        }
    }
    names
}

fn parse_coordinate(value: Option<&str>) -> Option<f64> {
    value.and_then(|raw| raw.replace(',', ".").parse::<f64>().ok())
}

fn coordinates_for(
    name: &str,
    latitude: Option<String>,
    longitude: Option<String>,
) -> Option<GeoPoint> {
    let latitude = clean(latitude);
    let longitude = clean(longitude);
    if latitude.is_none() && longitude.is_none() {
        return None;
    }

    match (
        parse_coordinate(latitude.as_deref()),
        parse_coordinate(longitude.as_deref()),
    ) {
        (Some(latitude), Some(longitude)) => {
            let point = GeoPoint::new(latitude, longitude);
            if point.is_valid() {
                Some(point)
            } else {
                warn!(name, latitude, longitude, "coordinates out of range; ignoring");
                None
            }
        }
        _ => {
            warn!(name, ?latitude, ?longitude, "unparseable coordinates; ignoring");
            None
        }
    }
}

fn concept_columns(
    values: Option<String>,
    materials: Option<String>,
    processes: Option<String>,
    knowledge: Option<String>,
) -> BTreeMap<Category, Vec<String>> {
    let mut concepts = BTreeMap::new();
    for (category, cell) in [
        (Category::Values, values),
        (Category::Materials, materials),
        (Category::ProcessesAndTechnologies, processes),
        (Category::KnowledgeSharing, knowledge),
    ] {
        if let Some(cell) = clean(cell) {
            let names = split_list(&cell);
            if !names.is_empty() {
                concepts.insert(category, names);
            }
        }
    }
    concepts
}

fn read_rows<T: DeserializeOwned>(raw: &str, what: &str) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(raw.as_bytes());

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<T>().enumerate() {
        let row = record.with_context(|| format!("invalid {what} row {}", line + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn parse_producers(raw: &str) -> Result<Vec<ProducerRecord>> {
    let rows = read_rows::<RawProducerRow>(raw, "producer")?;
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(name) = clean(row.name) else {
            continue;
        };

        let coordinates = coordinates_for(&name, row.latitude, row.longitude);
        records.push(ProducerRecord {
            description: clean(row.description),
            location: clean(row.location),
            links: ExternalLinks {
                website: clean(row.website),
                instagram: clean(row.instagram),
                linkedin: clean(row.linkedin),
            },
            coordinates,
            concepts: concept_columns(row.values, row.materials, row.processes, row.knowledge),
            name,
        });
    }

    Ok(records)
}

pub fn parse_concepts(raw: &str) -> Result<Vec<ConceptRecord>> {
    let rows = read_rows::<RawConceptRow>(raw, "concept")?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let name = clean(row.name)?;
            let category = clean(row.category).and_then(|value| Category::parse(&value));
            Some(ConceptRecord {
                name,
                description: clean(row.description),
                category,
            })
        })
        .collect())
}

pub fn parse_gallery(raw: &str) -> Result<Vec<GalleryRecord>> {
    let rows = read_rows::<RawGalleryRow>(raw, "gallery")?;
    Ok(rows
        .into_iter()
        .map(|row| GalleryRecord {
            image_url: clean(row.image),
            owner: clean(row.owner),
            website: clean(row.website),
            concepts: concept_columns(row.values, row.materials, row.processes, row.knowledge),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_dedups() {
        assert_eq!(
            split_list(" Reuse, Repair,,Reuse ,Wood "),
            vec!["Reuse", "Repair", "Wood"]
        );
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn producers_tolerate_missing_columns_and_blank_cells() {
        let raw = "Name,Values,Latitude,Longitude\n\
                   Acme,\"Reuse, Repair\",48.8566,2.3522\n\
                   Blank,,,\n\
                   ,Reuse,1,1\n";
        let records = parse_producers(raw).unwrap();
        assert_eq!(records.len(), 2);

        let acme = &records[0];
        assert_eq!(acme.name, "Acme");
        assert_eq!(acme.description, None);
        assert_eq!(acme.coordinates, Some(GeoPoint::new(48.8566, 2.3522)));
        assert_eq!(acme.concepts[&Category::Values], vec!["Reuse", "Repair"]);
        assert!(acme.links.is_empty());

        let blank = &records[1];
        assert!(blank.concepts.is_empty());
        assert_eq!(blank.coordinates, None);
    }

    #[test]
    fn bad_coordinates_become_none() {
        let raw = "Name,Latitude,Longitude\nA,abc,2\nB,95,2\nC,45.1,\n";
        let records = parse_producers(raw).unwrap();
        assert!(records.iter().all(|record| record.coordinates.is_none()));
    }

    #[test]
    fn concept_rows_accept_either_header() {
        let raw = "Nodes,Description,Category\nReuse,  Use again ,Values\nWood,,Unknown\n";
        let records = parse_concepts(raw).unwrap();
        assert_eq!(records[0].description.as_deref(), Some("Use again"));
        assert_eq!(records[0].category, Some(Category::Values));
        assert_eq!(records[1].category, None);
    }

    #[test]
    fn gallery_rows_keep_concepts_per_column() {
        let raw = "Image Link,Owner,Website Link,Materials\n\
                   http://img/1.jpg,Acme,,\"Wood, Clay\"\n";
        let records = parse_gallery(raw).unwrap();
        assert_eq!(records[0].owner.as_deref(), Some("Acme"));
        assert_eq!(records[0].website, None);
        assert_eq!(records[0].concepts[&Category::Materials], vec!["Wood", "Clay"]);
    }
}
