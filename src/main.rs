mod app;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use lauds_landscape::dataset::{DataSource, Sources};
use lauds_landscape::geo::GeoPoint;
use lauds_landscape::geolocation::{FixedLocation, GeolocationProvider, Unavailable};
use lauds_landscape::session::{InitialPreset, ViewKind, ViewSelection, ViewSelectionStore};

use app::{LandscapeApp, ViewSettings};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Producer sheet: a CSV path or an http(s) URL.
    #[arg(long)]
    producers: String,

    /// Concept descriptions sheet.
    #[arg(long)]
    concepts: Option<String>,

    /// Gallery sheet with image links.
    #[arg(long)]
    gallery: Option<String>,

    /// View to open: network, gallery or nearest.
    #[arg(long)]
    view: Option<ViewKind>,

    /// Landing shortcut: values-network, materials-network or materials-gallery.
    #[arg(long)]
    preset: Option<InitialPreset>,

    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Ask before using --lat/--lon in the nearest view.
    #[arg(long, requires = "lat")]
    ask_location: bool,

    /// Ignore --lat/--lon and always use the map fallback.
    #[arg(long)]
    no_geolocation: bool,

    /// Where the view selection is kept between launches.
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Neither read nor write the view selection file.
    #[arg(long)]
    no_remember: bool,

    /// JSON file with layout and zoom tunables.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Zoom level at which co-located producers are drawn apart.
    #[arg(long)]
    zoom_threshold: Option<f32>,

    #[arg(long)]
    zoom_hysteresis: Option<f32>,

    /// Enable debug logging; RUST_LOG overrides the level.
    #[arg(long)]
    debug: bool,
}

fn load_settings(path: &Path) -> Result<ViewSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings {}", path.display()))
}

impl Args {
    fn sources(&self) -> Sources {
        Sources {
            producers: DataSource::parse(&self.producers),
            concepts: self.concepts.as_deref().map(DataSource::parse),
            gallery: self.gallery.as_deref().map(DataSource::parse),
        }
    }

    fn settings(&self) -> ViewSettings {
        let mut settings = match &self.settings {
            Some(path) => load_settings(path).unwrap_or_else(|error| {
                warn!("{error:#}; using default settings");
                ViewSettings::default()
            }),
            None => ViewSettings::default(),
        };
        if let Some(threshold) = self.zoom_threshold {
            settings.zoom.threshold = threshold;
        }
        if let Some(hysteresis) = self.zoom_hysteresis {
            settings.zoom.hysteresis = hysteresis;
        }
        settings
    }

    fn store(&self) -> Option<ViewSelectionStore> {
        if self.no_remember {
            return None;
        }
        let path = self
            .state_file
            .clone()
            .unwrap_or_else(ViewSelectionStore::default_path);
        Some(ViewSelectionStore::new(path))
    }

    /// A preset wins over a stored hand-off, which wins over `--view`.
    fn initial_selection(&self, store: Option<&ViewSelectionStore>) -> ViewSelection {
        let stored = store.and_then(|store| {
            store.take().unwrap_or_else(|error| {
                warn!("{error:#}");
                None
            })
        });

        if let Some(preset) = self.preset {
            info!(preset = preset.name(), "starting from preset");
            return preset.selection();
        }
        if let Some(selection) = stored {
            info!(view = %selection.view, "restored view selection");
            return selection;
        }

        let mut selection = ViewSelection::default();
        if let Some(view) = self.view {
            selection.view = view;
        }
        selection
    }

    fn geolocation(&self) -> Box<dyn GeolocationProvider> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if !self.no_geolocation => {
                let point = GeoPoint::new(lat, lon);
                if self.ask_location {
                    Box::new(FixedLocation::prompting(point))
                } else {
                    Box::new(FixedLocation::new(point))
                }
            }
            _ => Box::new(Unavailable),
        }
    }
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    lauds_landscape::logging::init(args.debug);

    let store = args.store();
    let selection = args.initial_selection(store.as_ref());
    let sources = args.sources();
    let settings = args.settings();
    let geolocation = args.geolocation();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Urban production landscape",
        options,
        Box::new(move |cc| {
            Ok(Box::new(LandscapeApp::new(
                cc,
                sources,
                selection,
                settings,
                store,
                geolocation,
            )))
        }),
    )
}
