use thiserror::Error;

/// Failures the core recovers from at the boundary where they occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LandscapeError {
    #[error("failed to load dataset: {0}")]
    DataLoad(String),
    #[error("geolocation unavailable: {0}")]
    GeolocationUnavailable(String),
    #[error("`{name}` has no usable latitude/longitude")]
    MissingCoordinate { name: String },
    #[error("at least one category filter must stay active")]
    FilterInvariant,
    #[error("no entity named `{0}` in the current dataset")]
    TargetNotFound(String),
}

impl LandscapeError {
    pub fn data_load(error: &anyhow::Error) -> Self {
        Self::DataLoad(format!("{error:#}"))
    }
}
