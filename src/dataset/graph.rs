use std::collections::{BTreeMap, HashMap};

use crate::geo::GeoPoint;

use super::category::{Category, EntityKey, Group};
use super::parse::ExternalLinks;

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub key: EntityKey,
    pub description: Option<String>,
    pub location: Option<String>,
    pub coordinates: Option<GeoPoint>,
    pub links: ExternalLinks,
    /// Concept names per category, in sheet order. Empty for concepts.
    pub concepts: BTreeMap<Category, Vec<String>>,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn group(&self) -> Group {
        self.key.group
    }

    pub fn category(&self) -> Option<Category> {
        self.key.group.category()
    }

    pub fn is_producer(&self) -> bool {
        self.key.group == Group::Producer
    }
}

/// "Producer exhibits concept", as indices into [`Dataset::entities`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Connection {
    pub producer: usize,
    pub concept: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Dataset {
    entities: Vec<Entity>,
    connections: Vec<Connection>,
    index_by_key: HashMap<EntityKey, usize>,
    neighbors: Vec<Vec<usize>>,
}

impl Dataset {
    /// Builds the lookup tables. Connections with out-of-range endpoints are
    /// dropped, duplicates are removed.
    pub fn new(entities: Vec<Entity>, mut connections: Vec<Connection>) -> Self {
        let count = entities.len();
        connections.retain(|connection| connection.producer < count && connection.concept < count);
        connections.sort_unstable();
        connections.dedup();

        let mut index_by_key = HashMap::with_capacity(count);
        for (index, entity) in entities.iter().enumerate() {
            index_by_key.insert(entity.key.clone(), index);
        }

        let mut neighbors = vec![Vec::new(); count];
        for connection in &connections {
            neighbors[connection.producer].push(connection.concept);
            neighbors[connection.concept].push(connection.producer);
        }

        Self {
            entities,
            connections,
            index_by_key,
            neighbors,
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn index_of(&self, key: &EntityKey) -> Option<usize> {
        self.index_by_key.get(key).copied()
    }

    /// Resolves a display name, preferring a producer over concepts with the
    /// same name, then concepts in category order.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        std::iter::once(Group::Producer)
            .chain(Category::ALL.into_iter().map(Group::Concept))
            .find_map(|group| {
                self.index_of(&EntityKey {
                    group,
                    name: name.to_owned(),
                })
            })
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.neighbors.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Producers connected to a concept, in entity order.
    pub fn connected_producers(&self, concept: usize) -> Vec<usize> {
        let mut producers = self
            .neighbors(concept)
            .iter()
            .copied()
            .filter(|&index| self.entities[index].is_producer())
            .collect::<Vec<_>>();
        producers.sort_unstable();
        producers
    }

    pub fn producer_count(&self) -> usize {
        self.entities.iter().filter(|entity| entity.is_producer()).count()
    }

    pub fn concept_count(&self, category: Category) -> usize {
        self.entities
            .iter()
            .filter(|entity| entity.category() == Some(category))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(key: EntityKey) -> Entity {
        Entity {
            key,
            description: None,
            location: None,
            coordinates: None,
            links: ExternalLinks::default(),
            concepts: BTreeMap::new(),
        }
    }

    #[test]
    fn drops_invalid_and_duplicate_connections() {
        let dataset = Dataset::new(
            vec![
                entity(EntityKey::producer("Acme")),
                entity(EntityKey::concept(Category::Values, "Reuse")),
            ],
            vec![
                Connection { producer: 0, concept: 1 },
                Connection { producer: 0, concept: 1 },
                Connection { producer: 0, concept: 7 },
            ],
        );
        assert_eq!(dataset.connections().len(), 1);
        assert_eq!(dataset.neighbors(0), &[1]);
        assert_eq!(dataset.connected_producers(1), vec![0]);
    }

    #[test]
    fn find_by_name_prefers_producers() {
        let dataset = Dataset::new(
            vec![
                entity(EntityKey::concept(Category::Values, "Commons")),
                entity(EntityKey::producer("Commons")),
            ],
            Vec::new(),
        );
        assert_eq!(dataset.find_by_name("Commons"), Some(1));
        assert_eq!(dataset.find_by_name("Missing"), None);
    }
}
