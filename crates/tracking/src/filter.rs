//! Filter selection: Kalman (default) or EMA.

use std::collections::BTreeMap;

use followcam_common::FollowcamResult;
use followcam_model::{Point2D, TrackingInfo};
use serde::{Deserialize, Serialize};

use crate::ema::{EmaSmoother, DEFAULT_EMA_FACTOR};
use crate::kalman::{KalmanConfig, KalmanTracker, Measurement, TrackerState};

/// Which center filter a run uses, with its tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterKind {
    Kalman(KalmanConfig),
    Ema { factor: f64 },
}

impl Default for FilterKind {
    fn default() -> Self {
        FilterKind::Kalman(KalmanConfig::default())
    }
}

impl FilterKind {
    pub fn default_ema() -> Self {
        FilterKind::Ema {
            factor: DEFAULT_EMA_FACTOR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Kalman(_) => "kalman",
            FilterKind::Ema { .. } => "ema",
        }
    }

    /// Name and parameters as stored in the run manifest.
    pub fn tracking_info(&self) -> TrackingInfo {
        let parameters: BTreeMap<String, f64> = match self {
            FilterKind::Kalman(c) => [
                ("initial_position_variance", c.initial_position_variance),
                ("initial_velocity_variance", c.initial_velocity_variance),
                ("process_noise_position", c.process_noise_position),
                ("process_noise_velocity", c.process_noise_velocity),
                ("measurement_noise", c.measurement_noise),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            FilterKind::Ema { factor } => BTreeMap::from([("factor".to_string(), *factor)]),
        };
        TrackingInfo {
            filter: self.name().to_string(),
            parameters,
        }
    }
}

/// A built, validated center filter.
#[derive(Debug, Clone)]
pub enum CenterFilter {
    Kalman(KalmanTracker),
    Ema(EmaSmoother),
}

impl CenterFilter {
    pub fn new(kind: FilterKind) -> FollowcamResult<Self> {
        Ok(match kind {
            FilterKind::Kalman(config) => CenterFilter::Kalman(KalmanTracker::new(config)?),
            FilterKind::Ema { factor } => CenterFilter::Ema(EmaSmoother::new(factor)?),
        })
    }

    pub fn initialize(&self, point: Point2D) -> TrackerState {
        match self {
            CenterFilter::Kalman(k) => k.initialize(point),
            CenterFilter::Ema(e) => e.initialize(point),
        }
    }

    pub fn step(
        &self,
        state: TrackerState,
        measurement: Measurement,
    ) -> FollowcamResult<TrackerState> {
        match self {
            CenterFilter::Kalman(k) => k.step(state, measurement),
            CenterFilter::Ema(e) => Ok(e.step(state, measurement)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_kind_serde_tagging() {
        let json = serde_json::to_string(&FilterKind::default_ema()).unwrap();
        assert_eq!(json, r#"{"kind":"ema","factor":0.3}"#);

        let parsed: FilterKind =
            serde_json::from_str(r#"{"kind":"kalman","measurement_noise":50.0}"#).unwrap();
        match parsed {
            FilterKind::Kalman(config) => {
                assert_eq!(config.measurement_noise, 50.0);
                assert_eq!(config.process_noise_position, 0.01);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_tracking_info() {
        let info = FilterKind::default().tracking_info();
        assert_eq!(info.filter, "kalman");
        assert_eq!(info.parameters["measurement_noise"], 500.0);
        assert_eq!(info.parameters.len(), 5);

        let info = FilterKind::Ema { factor: 0.5 }.tracking_info();
        assert_eq!(info.filter, "ema");
        assert_eq!(info.parameters["factor"], 0.5);
    }

    #[test]
    fn test_invalid_kind_fails_to_build() {
        assert!(CenterFilter::new(FilterKind::Ema { factor: 2.0 }).is_err());
        assert!(CenterFilter::new(FilterKind::Kalman(KalmanConfig {
            measurement_noise: -1.0,
            ..KalmanConfig::default()
        }))
        .is_err());
    }
}
