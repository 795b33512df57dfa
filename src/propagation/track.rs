//! Ground track generation

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Propagator;
use crate::data::ElementSet;
use crate::frames::{offset_seconds, seconds_between, GeodeticPosition};

/// One sample of a ground track
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub geodetic: GeodeticPosition,
    /// Inertial speed (km/s)
    pub speed_km_s: f64,
}

/// Sample an object's sub-satellite point from `start` to `end` every `step_s` seconds.
///
/// Instants the propagator cannot produce are skipped, so the track may
/// contain gaps. A non-positive step or an empty window yields no points.
pub fn ground_track<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &ElementSet,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step_s: f64,
) -> Vec<TrackPoint> {
    let span = seconds_between(start, end);
    if !step_s.is_finite() || step_s <= 0.0 || span < 0.0 {
        return Vec::new();
    }

    let steps = (span / step_s).floor() as usize;
    let mut points = Vec::with_capacity(steps + 1);
    let mut skipped = 0usize;

    for i in 0..=steps {
        let time = offset_seconds(start, step_s * i as f64);
        match propagator.propagate(elements, time) {
            Ok(state) => points.push(TrackPoint {
                time,
                geodetic: state.geodetic(),
                speed_km_s: state.speed(),
            }),
            Err(e) => {
                log::trace!("{}", e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::debug!(
            "Ground track for {}: {} of {} samples failed",
            elements.catalog_id,
            skipped,
            steps + 1
        );
    }
    points
}
