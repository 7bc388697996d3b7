use std::collections::{BTreeMap, HashMap, HashSet};

use super::category::{Category, EntityKey};
use super::parse::GalleryRecord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GalleryImage {
    pub url: String,
    pub owner: Option<String>,
    pub website: Option<String>,
}

/// A concept that has at least one image attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GalleryConcept {
    pub name: String,
    pub category: Category,
    pub images: Vec<GalleryImage>,
}

impl GalleryConcept {
    pub fn key(&self) -> EntityKey {
        EntityKey::concept(self.category, self.name.clone())
    }
}

#[derive(Clone, Debug, Default)]
pub struct Gallery {
    concepts: Vec<GalleryConcept>,
}

impl Gallery {
    pub fn from_records(records: Vec<GalleryRecord>) -> Self {
        let mut grouped: BTreeMap<(Category, usize), GalleryConcept> = BTreeMap::new();
        let mut first_seen: HashMap<(Category, String), usize> = HashMap::new();

        for record in records {
            for (category, names) in &record.concepts {
                for name in names {
                    let next = first_seen.len();
                    let position = *first_seen.entry((*category, name.clone())).or_insert(next);

                    let concept = grouped
                        .entry((*category, position))
                        .or_insert_with(|| GalleryConcept {
                            name: name.clone(),
                            category: *category,
                            images: Vec::new(),
                        });

                    if let Some(url) = &record.image_url {
                        concept.images.push(GalleryImage {
                            url: url.clone(),
                            owner: record.owner.clone(),
                            website: record.website.clone(),
                        });
                    }
                }
            }
        }

        let concepts = grouped
            .into_values()
            .filter(|concept| !concept.images.is_empty())
            .collect();
        Self { concepts }
    }

    pub fn concepts(&self) -> &[GalleryConcept] {
        &self.concepts
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Every image by `owner`, deduplicated by URL, excluding `exclude_url`.
    pub fn related_images(&self, owner: &str, exclude_url: Option<&str>) -> Vec<&GalleryImage> {
        let mut seen = HashSet::new();
        self.concepts
            .iter()
            .flat_map(|concept| concept.images.iter())
            .filter(|image| image.owner.as_deref() == Some(owner))
            .filter(|image| Some(image.url.as_str()) != exclude_url)
            .filter(|image| seen.insert(image.url.as_str()))
            .collect()
    }

    /// Indices of other concepts holding an image by any owner of
    /// `concept`'s images.
    pub fn concepts_sharing_owner(&self, concept: usize) -> Vec<usize> {
        let Some(source) = self.concepts.get(concept) else {
            return Vec::new();
        };
        let owners = source
            .images
            .iter()
            .filter_map(|image| image.owner.as_deref())
            .collect::<HashSet<_>>();
        if owners.is_empty() {
            return Vec::new();
        }

        self.concepts
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != concept)
            .filter(|(_, other)| {
                other
                    .images
                    .iter()
                    .any(|image| image.owner.as_deref().is_some_and(|owner| owners.contains(owner)))
            })
            .map(|(index, _)| index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: Option<&str>, owner: &str, category: Category, names: &[&str]) -> GalleryRecord {
        GalleryRecord {
            image_url: url.map(str::to_owned),
            owner: Some(owner.to_owned()),
            website: None,
            concepts: BTreeMap::from([(
                category,
                names.iter().map(|name| (*name).to_owned()).collect(),
            )]),
        }
    }

    #[test]
    fn concepts_without_images_are_dropped() {
        let gallery = Gallery::from_records(vec![
            record(Some("a.jpg"), "Acme", Category::Materials, &["Wood"]),
            record(None, "Acme", Category::Materials, &["Clay"]),
        ]);
        let names = gallery
            .concepts()
            .iter()
            .map(|concept| concept.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Wood"]);
    }

    #[test]
    fn related_images_dedup_and_exclude_current() {
        let gallery = Gallery::from_records(vec![
            record(Some("a.jpg"), "Acme", Category::Materials, &["Wood", "Clay"]),
            record(Some("b.jpg"), "Acme", Category::Values, &["Reuse"]),
            record(Some("c.jpg"), "Other", Category::Values, &["Reuse"]),
        ]);
        let related = gallery
            .related_images("Acme", Some("b.jpg"))
            .into_iter()
            .map(|image| image.url.as_str())
            .collect::<Vec<_>>();
        assert_eq!(related, vec!["a.jpg"]);
    }

    #[test]
    fn owner_links_concepts_across_categories() {
        let gallery = Gallery::from_records(vec![
            record(Some("a.jpg"), "Acme", Category::Materials, &["Wood"]),
            record(Some("b.jpg"), "Acme", Category::Values, &["Reuse"]),
            record(Some("c.jpg"), "Other", Category::Values, &["Care"]),
        ]);
        let index_of = |name: &str| {
            gallery
                .concepts()
                .iter()
                .position(|concept| concept.name == name)
                .unwrap()
        };

        assert_eq!(gallery.concepts_sharing_owner(index_of("Wood")), vec![index_of("Reuse")]);
        assert!(gallery.concepts_sharing_owner(index_of("Care")).is_empty());
        assert!(gallery.concepts_sharing_owner(99).is_empty());
    }
}
