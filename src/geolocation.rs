use tracing::{debug, info};

use crate::error::LandscapeError;
use crate::geo::GeoPoint;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// The user has to confirm before the position may be read.
    Prompt,
}

pub trait GeolocationProvider: Send {
    fn query(&self) -> PermissionState;
    fn current_position(&mut self) -> Result<GeoPoint, LandscapeError>;
}

/// A location given up front, e.g. on the command line.
#[derive(Clone, Copy, Debug)]
pub struct FixedLocation {
    point: GeoPoint,
    permission: PermissionState,
}

impl FixedLocation {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            point,
            permission: PermissionState::Granted,
        }
    }

    /// Asks for confirmation before revealing the location.
    pub fn prompting(point: GeoPoint) -> Self {
        Self {
            point,
            permission: PermissionState::Prompt,
        }
    }
}

impl GeolocationProvider for FixedLocation {
    fn query(&self) -> PermissionState {
        self.permission
    }

    fn current_position(&mut self) -> Result<GeoPoint, LandscapeError> {
        if self.permission == PermissionState::Denied {
            return Err(LandscapeError::GeolocationUnavailable(
                "permission denied".to_owned(),
            ));
        }
        if !self.point.is_valid() {
            return Err(LandscapeError::GeolocationUnavailable(format!(
                "invalid location {:?}",
                self.point
            )));
        }
        Ok(self.point)
    }
}

/// No positioning source at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unavailable;

impl GeolocationProvider for Unavailable {
    fn query(&self) -> PermissionState {
        PermissionState::Denied
    }

    fn current_position(&mut self) -> Result<GeoPoint, LandscapeError> {
        Err(LandscapeError::GeolocationUnavailable(
            "no geolocation source configured".to_owned(),
        ))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NearestMode {
    /// Distances are measured from `user`, no clustering.
    Geolocated { user: GeoPoint },
    /// Map projection with clustering.
    Projected,
}

impl NearestMode {
    pub fn uses_geolocation(self) -> bool {
        matches!(self, Self::Geolocated { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModeDecision {
    Ready(NearestMode),
    /// The provider wants confirmation; ask, then call again with the answer.
    NeedsPrompt,
}

/// Picks the nearest-view positioning mode. `confirmed` is the user's answer
/// to a prompt, if one was shown. Every failure downgrades to projection.
pub fn resolve_nearest_mode(
    provider: &mut dyn GeolocationProvider,
    confirmed: Option<bool>,
) -> ModeDecision {
    match (provider.query(), confirmed) {
        (PermissionState::Denied, _) | (PermissionState::Prompt, Some(false)) => {
            debug!("geolocation not permitted; using map projection");
            ModeDecision::Ready(NearestMode::Projected)
        }
        (PermissionState::Prompt, None) => ModeDecision::NeedsPrompt,
        (PermissionState::Granted, _) | (PermissionState::Prompt, Some(true)) => {
            match provider.current_position() {
                Ok(user) => {
                    info!(
                        latitude = user.latitude,
                        longitude = user.longitude,
                        "using geolocation for nearest view"
                    );
                    ModeDecision::Ready(NearestMode::Geolocated { user })
                }
                Err(error) => {
                    debug!("{error}; using map projection");
                    ModeDecision::Ready(NearestMode::Projected)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: GeoPoint = GeoPoint::new(48.8566, 2.3522);

    struct Failing;

    impl GeolocationProvider for Failing {
        fn query(&self) -> PermissionState {
            PermissionState::Granted
        }

        fn current_position(&mut self) -> Result<GeoPoint, LandscapeError> {
            Err(LandscapeError::GeolocationUnavailable("timeout".to_owned()))
        }
    }

    #[test]
    fn granted_location_is_used() {
        let mut provider = FixedLocation::new(PARIS);
        assert_eq!(
            resolve_nearest_mode(&mut provider, None),
            ModeDecision::Ready(NearestMode::Geolocated { user: PARIS })
        );
    }

    #[test]
    fn prompt_waits_for_an_answer() {
        let mut provider = FixedLocation::prompting(PARIS);
        assert_eq!(resolve_nearest_mode(&mut provider, None), ModeDecision::NeedsPrompt);
        assert_eq!(
            resolve_nearest_mode(&mut provider, Some(false)),
            ModeDecision::Ready(NearestMode::Projected)
        );
        assert!(matches!(
            resolve_nearest_mode(&mut provider, Some(true)),
            ModeDecision::Ready(NearestMode::Geolocated { .. })
        ));
    }

    #[test]
    fn denial_and_failure_fall_back_to_projection() {
        assert_eq!(
            resolve_nearest_mode(&mut Unavailable, None),
            ModeDecision::Ready(NearestMode::Projected)
        );
        assert_eq!(
            resolve_nearest_mode(&mut Failing, None),
            ModeDecision::Ready(NearestMode::Projected)
        );
        let mut nowhere = FixedLocation::new(GeoPoint::new(f64::NAN, 0.0));
        assert_eq!(
            resolve_nearest_mode(&mut nowhere, None),
            ModeDecision::Ready(NearestMode::Projected)
        );
    }
}
