//! # Location Acquisition
//!
//! The engine only consumes `Option<GeoPosition>` and a permission outcome.
//! Where the fix comes from is a [`LocationSource`]; the crate ships
//! [`FixedLocation`], fed from the `[location]` config section.
//!
//! Acquisition runs on a blocking thread and is bounded by a timeout
//! (15 s by default). A source that never answers ends in
//! [`LocationOutcome::TimedOut`] instead of hanging the caller.
//!
//! [`ModeController`] owns the rotation-mode toggle: switching to true solar
//! requests a fix, and denial or timeout reverts the mode to standard.

use crate::{GeoPosition, RotationMode};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default acquisition timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Permission as reported by the location collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Prompt,
    Granted,
    Denied,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// How an acquisition attempt ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocationOutcome {
    Acquired(GeoPosition),
    Denied,
    Unavailable,
    TimedOut,
}

/// Something that can produce a position fix.
pub trait LocationSource: Send + Sync {
    fn permission(&self) -> PermissionState;

    /// Blocking fix acquisition. May take arbitrarily long; callers bound it
    /// with [`acquire`].
    fn locate(&self) -> Result<GeoPosition, LocationError>;
}

/// A position known up front, such as one read from the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation {
    position: Option<GeoPosition>,
}

impl FixedLocation {
    pub fn new(position: Option<GeoPosition>) -> Self {
        FixedLocation { position }
    }
}

impl LocationSource for FixedLocation {
    fn permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn locate(&self) -> Result<GeoPosition, LocationError> {
        self.position
            .ok_or_else(|| LocationError::Unavailable("no location configured".to_string()))
    }
}

/// Ask `source` for a fix, giving up after `timeout`.
pub async fn acquire(source: Arc<dyn LocationSource>, timeout: Duration) -> LocationOutcome {
    if source.permission() == PermissionState::Denied {
        info!("Location permission denied");
        return LocationOutcome::Denied;
    }

    let task = tokio::task::spawn_blocking(move || source.locate());
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(position))) => {
            info!(
                "Location acquired: {:.4}, {:.4}",
                position.latitude, position.longitude
            );
            LocationOutcome::Acquired(position)
        }
        Ok(Ok(Err(LocationError::PermissionDenied))) => {
            info!("Location permission denied");
            LocationOutcome::Denied
        }
        Ok(Ok(Err(LocationError::Unavailable(reason)))) => {
            warn!("Location unavailable: {}", reason);
            LocationOutcome::Unavailable
        }
        Ok(Err(join_error)) => {
            warn!("Location task failed: {}", join_error);
            LocationOutcome::Unavailable
        }
        Err(_) => {
            warn!("Location request timed out after {:?}", timeout);
            LocationOutcome::TimedOut
        }
    }
}

/// Rotation mode plus the location state it depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeController {
    mode: RotationMode,
    position: Option<GeoPosition>,
    permission: PermissionState,
}

impl ModeController {
    pub fn new(mode: RotationMode) -> Self {
        ModeController {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    pub fn position(&self) -> Option<GeoPosition> {
        self.position
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    /// Fold an acquisition outcome into the state.
    ///
    /// A fix keeps the current mode. Denial clears the position and forces
    /// standard mode; a timeout or missing fix forces standard mode too
    /// unless an earlier fix is still on hand.
    pub fn apply(&mut self, outcome: LocationOutcome) -> RotationMode {
        match outcome {
            LocationOutcome::Acquired(position) => {
                self.position = Some(position);
                self.permission = PermissionState::Granted;
            }
            LocationOutcome::Denied => {
                self.position = None;
                self.permission = PermissionState::Denied;
                self.revert("permission denied");
            }
            LocationOutcome::Unavailable | LocationOutcome::TimedOut => {
                if self.position.is_none() {
                    self.revert("no location fix");
                }
            }
        }
        self.mode
    }

    fn revert(&mut self, reason: &str) {
        if self.mode == RotationMode::TrueSolar {
            info!("Reverting to {} rotation: {}", RotationMode::Standard, reason);
        }
        self.mode = RotationMode::Standard;
    }

    /// Switch to `mode`, requesting a location first when true solar needs one.
    pub async fn request(
        &mut self,
        mode: RotationMode,
        source: Arc<dyn LocationSource>,
        timeout: Duration,
    ) -> RotationMode {
        self.mode = mode;
        if mode == RotationMode::TrueSolar {
            let outcome = acquire(source, timeout).await;
            self.apply(outcome);
        }
        self.mode
    }

    /// Flip between the two conventions.
    pub async fn toggle(&mut self, source: Arc<dyn LocationSource>, timeout: Duration) -> RotationMode {
        let next = match self.mode {
            RotationMode::Standard => RotationMode::TrueSolar,
            RotationMode::TrueSolar => RotationMode::Standard,
        };
        self.request(next, source, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        permission: PermissionState,
        delay: Duration,
        result: Result<GeoPosition, LocationError>,
    }

    impl LocationSource for Scripted {
        fn permission(&self) -> PermissionState {
            self.permission
        }

        fn locate(&self) -> Result<GeoPosition, LocationError> {
            std::thread::sleep(self.delay);
            self.result.clone()
        }
    }

    fn paris() -> GeoPosition {
        GeoPosition::new(48.8566, 2.3522).unwrap()
    }

    fn source(permission: PermissionState, delay_ms: u64, result: Result<GeoPosition, LocationError>) -> Arc<dyn LocationSource> {
        Arc::new(Scripted {
            permission,
            delay: Duration::from_millis(delay_ms),
            result,
        })
    }

    #[tokio::test]
    async fn test_fixed_location_is_acquired() {
        let outcome = acquire(Arc::new(FixedLocation::new(Some(paris()))), DEFAULT_TIMEOUT).await;
        assert_eq!(outcome, LocationOutcome::Acquired(paris()));

        let outcome = acquire(Arc::new(FixedLocation::new(None)), DEFAULT_TIMEOUT).await;
        assert_eq!(outcome, LocationOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let slow = source(PermissionState::Granted, 500, Ok(paris()));
        let outcome = acquire(slow, Duration::from_millis(50)).await;
        assert_eq!(outcome, LocationOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_toggle_to_true_solar_with_fix() {
        let mut controller = ModeController::new(RotationMode::Standard);
        let granted = source(PermissionState::Prompt, 0, Ok(paris()));

        let mode = controller.toggle(granted.clone(), DEFAULT_TIMEOUT).await;
        assert_eq!(mode, RotationMode::TrueSolar);
        assert_eq!(controller.position(), Some(paris()));
        assert_eq!(controller.permission(), PermissionState::Granted);

        let mode = controller.toggle(granted, DEFAULT_TIMEOUT).await;
        assert_eq!(mode, RotationMode::Standard);
        // The fix is kept for the forecaster
        assert_eq!(controller.position(), Some(paris()));
    }

    #[tokio::test]
    async fn test_denial_reverts_to_standard() {
        let mut controller = ModeController::new(RotationMode::Standard);
        let denied = source(PermissionState::Denied, 0, Ok(paris()));

        let mode = controller.toggle(denied, DEFAULT_TIMEOUT).await;
        assert_eq!(mode, RotationMode::Standard);
        assert_eq!(controller.permission(), PermissionState::Denied);
        assert_eq!(controller.position(), None);
    }

    #[tokio::test]
    async fn test_timeout_reverts_to_standard() {
        let mut controller = ModeController::new(RotationMode::Standard);
        let slow = source(PermissionState::Prompt, 500, Ok(paris()));

        let mode = controller.toggle(slow, Duration::from_millis(20)).await;
        assert_eq!(mode, RotationMode::Standard);
    }

    #[test]
    fn test_prompt_denied_during_locate() {
        let mut controller = ModeController::new(RotationMode::TrueSolar);
        controller.apply(LocationOutcome::Acquired(paris()));
        assert_eq!(controller.mode(), RotationMode::TrueSolar);

        controller.apply(LocationOutcome::Denied);
        assert_eq!(controller.mode(), RotationMode::Standard);
        assert_eq!(controller.position(), None);
    }

    #[test]
    fn test_timeout_keeps_mode_when_earlier_fix_exists() {
        let mut controller = ModeController::new(RotationMode::TrueSolar);
        controller.apply(LocationOutcome::Acquired(paris()));
        controller.apply(LocationOutcome::TimedOut);
        assert_eq!(controller.mode(), RotationMode::TrueSolar);
    }
}
