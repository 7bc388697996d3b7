use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Values,
    Materials,
    #[serde(rename = "processes")]
    ProcessesAndTechnologies,
    #[serde(rename = "knowledge")]
    KnowledgeSharing,
}

impl Category {
    pub const COUNT: usize = 4;
    pub const ALL: [Category; Self::COUNT] = [
        Self::Values,
        Self::Materials,
        Self::ProcessesAndTechnologies,
        Self::KnowledgeSharing,
    ];

    /// Column header in the source sheets, also used as display text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Values => "Values",
            Self::Materials => "Materials",
            Self::ProcessesAndTechnologies => "Processes and Technologies",
            Self::KnowledgeSharing => "Knowledge Sharing",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Values => "values",
            Self::Materials => "materials",
            Self::ProcessesAndTechnologies => "processes",
            Self::KnowledgeSharing => "knowledge",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Values => 0,
            Self::Materials => 1,
            Self::ProcessesAndTechnologies => 2,
            Self::KnowledgeSharing => 3,
        }
    }

    /// Accepts either the sheet label or the short key, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|category| {
            category.label().eq_ignore_ascii_case(value)
                || category.key().eq_ignore_ascii_case(value)
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether an entity is a producer ("main") or a concept of some category.
/// `Cluster` marks synthetic aggregates created by spatial indexing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    Producer,
    Concept(Category),
    Cluster,
}

impl Group {
    pub fn category(self) -> Option<Category> {
        match self {
            Self::Concept(category) => Some(category),
            Self::Producer | Self::Cluster => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Producer => "Urban Producers",
            Self::Concept(category) => category.label(),
            Self::Cluster => "Cluster",
        }
    }
}

/// Identity of an entity. Names are unique per group only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub group: Group,
    pub name: String,
}

impl EntityKey {
    pub fn producer(name: impl Into<String>) -> Self {
        Self {
            group: Group::Producer,
            name: name.into(),
        }
    }

    pub fn concept(category: Category, name: impl Into<String>) -> Self {
        Self {
            group: Group::Concept(category),
            name: name.into(),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            group: Group::Cluster,
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.group.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_keys() {
        assert_eq!(Category::parse("Values"), Some(Category::Values));
        assert_eq!(
            Category::parse("processes and technologies"),
            Some(Category::ProcessesAndTechnologies)
        );
        assert_eq!(Category::parse("knowledge"), Some(Category::KnowledgeSharing));
        assert_eq!(Category::parse("Colours"), None);
    }

    #[test]
    fn indices_match_declaration_order() {
        for (position, category) in Category::ALL.into_iter().enumerate() {
            assert_eq!(category.index(), position);
        }
    }

    #[test]
    fn producer_and_concept_keys_differ() {
        assert_ne!(
            EntityKey::producer("Reuse"),
            EntityKey::concept(Category::Values, "Reuse")
        );
    }
}
