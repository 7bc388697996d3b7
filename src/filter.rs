use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Category, Connection, Dataset};
use crate::error::LandscapeError;

/// Active concept categories. At least one category is always active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Category>", into = "Vec<Category>")]
pub struct FilterState {
    flags: [bool; Category::COUNT],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied { category: Category, active: bool },
    /// The change would have left no category active; nothing changed.
    Rejected { category: Category },
    Unchanged { category: Category },
}

impl ToggleOutcome {
    pub fn changed(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::all()
    }
}

impl FilterState {
    pub fn all() -> Self {
        Self {
            flags: [true; Category::COUNT],
        }
    }

    pub fn only(category: Category) -> Self {
        let mut flags = [false; Category::COUNT];
        flags[category.index()] = true;
        Self { flags }
    }

    pub fn is_active(&self, category: Category) -> bool {
        self.flags[category.index()]
    }

    pub fn active_count(&self) -> usize {
        self.flags.iter().filter(|flag| **flag).count()
    }

    pub fn active_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| self.is_active(*category))
            .collect()
    }

    pub fn toggle(&mut self, category: Category) -> ToggleOutcome {
        let next = !self.is_active(category);
        self.set(category, next)
    }

    /// Sets a flag, refusing to switch off the last active category.
    pub fn set(&mut self, category: Category, active: bool) -> ToggleOutcome {
        if self.is_active(category) == active {
            return ToggleOutcome::Unchanged { category };
        }

        if !active && self.active_count() == 1 {
            debug!(%category, "refusing to deactivate the last active filter");
            return ToggleOutcome::Rejected { category };
        }

        self.flags[category.index()] = active;
        ToggleOutcome::Applied { category, active }
    }

    pub fn ensure_active(&mut self, category: Category) -> ToggleOutcome {
        self.set(category, true)
    }
}

impl TryFrom<Vec<Category>> for FilterState {
    type Error = LandscapeError;

    fn try_from(categories: Vec<Category>) -> Result<Self, Self::Error> {
        if categories.is_empty() {
            return Err(LandscapeError::FilterInvariant);
        }
        let mut flags = [false; Category::COUNT];
        for category in categories {
            flags[category.index()] = true;
        }
        Ok(Self { flags })
    }
}

impl From<FilterState> for Vec<Category> {
    fn from(state: FilterState) -> Self {
        state.active_categories()
    }
}

/// Visible subset of a dataset, in dataset order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    pub entities: Vec<usize>,
    pub connections: Vec<Connection>,
}

impl Visibility {
    pub fn contains(&self, entity: usize) -> bool {
        self.entities.binary_search(&entity).is_ok()
    }
}

/// Concepts are visible when their category is active; producers are visible
/// when at least one of their connections survives.
pub fn compute_visible(filters: &FilterState, dataset: &Dataset) -> Visibility {
    let entities = dataset.entities();
    let connections = dataset
        .connections()
        .iter()
        .copied()
        .filter(|connection| {
            entities[connection.concept]
                .category()
                .is_some_and(|category| filters.is_active(category))
        })
        .collect::<Vec<_>>();

    let connected_producers = connections
        .iter()
        .map(|connection| connection.producer)
        .collect::<HashSet<_>>();

    let visible = entities
        .iter()
        .enumerate()
        .filter(|(index, entity)| match entity.category() {
            Some(category) => filters.is_active(category),
            None => entity.is_producer() && connected_producers.contains(index),
        })
        .map(|(index, _)| index)
        .collect();

    Visibility {
        entities: visible,
        connections,
    }
}

/// Owns the filter state so the never-all-off rule is enforced in one place.
#[derive(Clone, Debug, Default)]
pub struct FilterEngine {
    state: FilterState,
}

impl FilterEngine {
    pub fn new(state: FilterState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn toggle(&mut self, category: Category) -> ToggleOutcome {
        self.state.toggle(category)
    }

    pub fn set(&mut self, category: Category, active: bool) -> ToggleOutcome {
        self.state.set(category, active)
    }

    pub fn ensure_active(&mut self, category: Category) -> ToggleOutcome {
        self.state.ensure_active(category)
    }

    pub fn replace(&mut self, state: FilterState) {
        self.state = state;
    }

    pub fn compute_visible(&self, dataset: &Dataset) -> Visibility {
        compute_visible(&self.state, dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{EntityKey, ProducerRecord, build_dataset};
    use std::collections::BTreeMap;

    fn acme_dataset() -> Dataset {
        let concepts = BTreeMap::from([
            (Category::Values, vec!["Reuse".to_owned()]),
            (Category::Materials, vec!["Wood".to_owned()]),
        ]);
        build_dataset(
            vec![ProducerRecord {
                name: "Acme".to_owned(),
                description: None,
                location: None,
                links: Default::default(),
                coordinates: None,
                concepts,
            }],
            Vec::new(),
        )
    }

    fn names(dataset: &Dataset, visibility: &Visibility) -> Vec<String> {
        visibility
            .entities
            .iter()
            .map(|&index| dataset.entities()[index].name().to_owned())
            .collect()
    }

    #[test]
    fn acme_scenario() {
        let dataset = acme_dataset();
        let mut engine = FilterEngine::new(FilterState::all());
        engine.set(Category::ProcessesAndTechnologies, false);
        engine.set(Category::KnowledgeSharing, false);

        let outcome = engine.toggle(Category::Values);
        assert!(outcome.changed());
        let visible = engine.compute_visible(&dataset);
        assert_eq!(names(&dataset, &visible), vec!["Acme", "Wood"]);

        let outcome = engine.toggle(Category::Materials);
        assert_eq!(outcome, ToggleOutcome::Rejected { category: Category::Materials });
        assert!(engine.state().is_active(Category::Materials));
        assert_eq!(engine.compute_visible(&dataset), visible);
    }

    #[test]
    fn producer_without_surviving_connection_is_hidden() {
        let dataset = acme_dataset();
        let visible = compute_visible(&FilterState::only(Category::KnowledgeSharing), &dataset);
        assert!(visible.entities.is_empty());
        assert!(visible.connections.is_empty());
    }

    #[test]
    fn compute_visible_is_idempotent() {
        let dataset = acme_dataset();
        let filters = FilterState::only(Category::Values);
        let first = compute_visible(&filters, &dataset);
        let second = compute_visible(&filters, &dataset);
        assert_eq!(first, second);
        let reuse = dataset
            .index_of(&EntityKey::concept(Category::Values, "Reuse"))
            .unwrap();
        assert!(first.contains(reuse));
    }

    #[test]
    fn toggle_sequences_never_empty_the_state() {
        let mut state = FilterState::all();
        let sequence = [0usize, 1, 2, 3, 0, 0, 1, 3, 2, 2, 1, 0, 3, 3, 1, 2, 0];
        for step in sequence {
            state.toggle(Category::ALL[step]);
            assert!(state.active_count() >= 1);
        }
    }

    #[test]
    fn serde_rejects_empty_filter_lists() {
        let state: FilterState = serde_json::from_str(r#"["values","knowledge"]"#).unwrap();
        assert!(state.is_active(Category::Values));
        assert!(!state.is_active(Category::Materials));
        assert!(serde_json::from_str::<FilterState>("[]").is_err());
        assert_eq!(
            serde_json::to_string(&FilterState::only(Category::Materials)).unwrap(),
            r#"["materials"]"#
        );
    }
}
