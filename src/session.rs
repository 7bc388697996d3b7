use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::{Category, Dataset, EntityKey};
use crate::error::LandscapeError;
use crate::filter::{FilterEngine, FilterState, ToggleOutcome, Visibility};
use crate::interaction::{Interaction, InteractionEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Network,
    Gallery,
    Nearest,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [Self::Network, Self::Gallery, Self::Nearest];

    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "Network",
            Self::Gallery => "Gallery",
            Self::Nearest => "Nearest",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|view| view.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown view `{value}` (expected network, gallery or nearest)"))
    }
}

/// Which view to open and with which filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSelection {
    pub view: ViewKind,
    pub filters: FilterState,
}

impl Default for ViewSelection {
    fn default() -> Self {
        Self {
            view: ViewKind::Network,
            filters: FilterState::all(),
        }
    }
}

/// Landing shortcuts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialPreset {
    ValuesNetwork,
    MaterialsNetwork,
    MaterialsGallery,
}

impl InitialPreset {
    pub const ALL: [InitialPreset; 3] = [
        Self::ValuesNetwork,
        Self::MaterialsNetwork,
        Self::MaterialsGallery,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ValuesNetwork => "values-network",
            Self::MaterialsNetwork => "materials-network",
            Self::MaterialsGallery => "materials-gallery",
        }
    }

    pub fn selection(self) -> ViewSelection {
        let (view, category) = match self {
            Self::ValuesNetwork => (ViewKind::Network, Category::Values),
            Self::MaterialsNetwork => (ViewKind::Network, Category::Materials),
            Self::MaterialsGallery => (ViewKind::Gallery, Category::Materials),
        };
        ViewSelection {
            view,
            filters: FilterState::only(category),
        }
    }
}

impl FromStr for InitialPreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == value.trim())
            .ok_or_else(|| format!("unknown preset `{value}`"))
    }
}

/// JSON file holding a [`ViewSelection`] handed from one launch to the next.
#[derive(Clone, Debug)]
pub struct ViewSelectionStore {
    path: PathBuf,
}

impl ViewSelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        std::env::temp_dir()
            .join("lauds-landscape")
            .join("view-selection.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<ViewSelection>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        let selection = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(Some(selection))
    }

    pub fn save(&self, selection: &ViewSelection) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(selection).context("failed to encode selection")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "view selection saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => {
                Err(error).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }

    /// Loads and clears in one go. A corrupt file is discarded.
    pub fn take(&self) -> Result<Option<ViewSelection>> {
        let selection = match self.load() {
            Ok(selection) => selection,
            Err(error) => {
                warn!("{error:#}; ignoring stored view selection");
                None
            }
        };
        self.clear()?;
        Ok(selection)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewSwitch {
    pub from: ViewKind,
    pub to: ViewKind,
    /// Filters were adjusted on the way, e.g. Values swapped for Materials
    /// when the gallery opens.
    pub filters_changed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Jump {
    pub index: usize,
    pub filters_changed: bool,
}

/// Application state shared by the views: current view, filters, selection
/// and the hover/popup machine. Every mutation goes through a method here.
#[derive(Clone, Debug)]
pub struct ViewSession {
    view: ViewKind,
    filters: FilterEngine,
    selected: Option<usize>,
    interaction: Interaction,
}

impl Default for ViewSession {
    fn default() -> Self {
        Self::new(ViewSelection::default())
    }
}

impl ViewSession {
    pub fn new(selection: ViewSelection) -> Self {
        Self {
            view: selection.view,
            filters: FilterEngine::new(selection.filters),
            selected: None,
            interaction: Interaction::default(),
        }
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn filters(&self) -> &FilterState {
        self.filters.state()
    }

    pub fn selection(&self) -> ViewSelection {
        ViewSelection {
            view: self.view,
            filters: *self.filters.state(),
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn interaction_mut(&mut self) -> &mut Interaction {
        &mut self.interaction
    }

    pub fn compute_visible(&self, dataset: &Dataset) -> Visibility {
        self.filters.compute_visible(dataset)
    }

    /// Leaves the current view. Its popup and timers are torn down first.
    pub fn switch_view(&mut self, to: ViewKind) -> Option<ViewSwitch> {
        let from = self.view;
        if from == to {
            return None;
        }

        self.interaction.reset();
        self.selected = None;

        let mut filters_changed = false;
        if from == ViewKind::Network
            && to == ViewKind::Gallery
            && self.filters.state().active_categories() == [Category::Values]
        {
            self.filters.replace(FilterState::only(Category::Materials));
            filters_changed = true;
        }

        self.view = to;
        info!(%from, %to, filters_changed, "view switched");
        Some(ViewSwitch {
            from,
            to,
            filters_changed,
        })
    }

    /// Applied toggles clear the hover/popup state; rejected ones change
    /// nothing.
    pub fn toggle_filter(&mut self, category: Category) -> ToggleOutcome {
        let outcome = self.filters.toggle(category);
        if outcome.changed() {
            self.interaction.reset();
            self.selected = None;
        }
        outcome
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index;
    }

    /// Follows a cross-reference. A hidden concept's category is switched on
    /// so the target becomes visible; the target's popup is opened.
    pub fn jump_to(&mut self, dataset: &Dataset, key: &EntityKey) -> Result<Jump, LandscapeError> {
        let Some(index) = dataset.index_of(key) else {
            let error = LandscapeError::TargetNotFound(key.name.clone());
            warn!("{error}");
            return Err(error);
        };

        let filters_changed = key
            .group
            .category()
            .is_some_and(|category| self.filters.ensure_active(category).changed());

        self.interaction.reset();
        self.interaction.handle(InteractionEvent::Click(index));
        self.selected = Some(index);
        Ok(Jump {
            index,
            filters_changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ProducerRecord, build_dataset};
    use std::collections::BTreeMap;

    fn dataset() -> Dataset {
        build_dataset(
            vec![ProducerRecord {
                name: "Acme".to_owned(),
                description: None,
                location: None,
                links: Default::default(),
                coordinates: None,
                concepts: BTreeMap::from([
                    (Category::Values, vec!["Reuse".to_owned()]),
                    (Category::Materials, vec!["Wood".to_owned()]),
                ]),
            }],
            Vec::new(),
        )
    }

    #[test]
    fn store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = ViewSelectionStore::new(dir.path().join("nested").join("state.json"));
        assert_eq!(store.load().unwrap(), None);

        let selection = InitialPreset::MaterialsGallery.selection();
        store.save(&selection).unwrap();
        assert_eq!(store.load().unwrap(), Some(selection));

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn take_consumes_the_hand_off() {
        let dir = tempfile::tempdir().unwrap();
        let store = ViewSelectionStore::new(dir.path().join("state.json"));
        store.save(&InitialPreset::ValuesNetwork.selection()).unwrap();
        assert_eq!(
            store.take().unwrap(),
            Some(InitialPreset::ValuesNetwork.selection())
        );
        assert_eq!(store.take().unwrap(), None);
    }

    #[test]
    fn corrupt_state_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"view":"network","filters":[]}"#).unwrap();
        let store = ViewSelectionStore::new(&path);
        assert!(store.load().is_err());
        assert_eq!(store.take().unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn presets_parse_by_name() {
        for preset in InitialPreset::ALL {
            assert_eq!(preset.name().parse::<InitialPreset>(), Ok(preset));
        }
        assert!("gallery".parse::<InitialPreset>().is_err());
        assert_eq!("Nearest".parse::<ViewKind>(), Ok(ViewKind::Nearest));
    }

    #[test]
    fn gallery_swaps_values_for_materials() {
        let mut session = ViewSession::new(InitialPreset::ValuesNetwork.selection());
        let switch = session.switch_view(ViewKind::Gallery).unwrap();
        assert!(switch.filters_changed);
        assert_eq!(session.filters(), &FilterState::only(Category::Materials));
        assert_eq!(session.switch_view(ViewKind::Gallery), None);

        let mut session = ViewSession::default();
        assert!(!session.switch_view(ViewKind::Gallery).unwrap().filters_changed);
        assert_eq!(session.filters(), &FilterState::all());
    }

    #[test]
    fn switching_views_tears_down_the_popup() {
        let mut session = ViewSession::default();
        session.interaction_mut().handle(InteractionEvent::Click(0));
        session.interaction_mut().start_rotation(3, crate::interaction::ROTATION_INTERVAL);
        session.switch_view(ViewKind::Nearest);
        assert!(!session.interaction().is_popup_open());
        assert!(session.interaction().rotation().is_none());
    }

    #[test]
    fn rejected_toggle_keeps_interaction() {
        let mut session = ViewSession::new(InitialPreset::MaterialsNetwork.selection());
        session.interaction_mut().handle(InteractionEvent::PointerEnter(1));
        let outcome = session.toggle_filter(Category::Materials);
        assert_eq!(outcome, ToggleOutcome::Rejected { category: Category::Materials });
        assert_eq!(session.interaction().highlighted(), Some(1));

        assert!(session.toggle_filter(Category::Values).changed());
        assert_eq!(session.interaction().highlighted(), None);
    }

    #[test]
    fn jump_enables_the_hidden_category() {
        let dataset = dataset();
        let mut session = ViewSession::new(InitialPreset::MaterialsNetwork.selection());
        let reuse = EntityKey::concept(Category::Values, "Reuse");
        assert!(!session.compute_visible(&dataset).contains(dataset.index_of(&reuse).unwrap()));

        let jump = session.jump_to(&dataset, &reuse).unwrap();
        assert!(jump.filters_changed);
        assert!(session.compute_visible(&dataset).contains(jump.index));
        assert_eq!(session.interaction().popup_target(), Some(jump.index));
        assert_eq!(session.selected(), Some(jump.index));
    }

    #[test]
    fn jump_to_unknown_target_is_a_no_op() {
        let dataset = dataset();
        let mut session = ViewSession::default();
        let before = session.selection();
        let result = session.jump_to(&dataset, &EntityKey::producer("Ghost"));
        assert_eq!(result, Err(LandscapeError::TargetNotFound("Ghost".to_owned())));
        assert_eq!(session.selection(), before);
        assert_eq!(session.selected(), None);
    }
}
