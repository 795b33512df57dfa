//! Ground-station visibility and pass prediction
//!
//! Passes are found by scanning elevation at a fixed step and refining each
//! mask crossing by bisection between the two samples that straddle it.
//!
//! A sample the propagator cannot produce is treated as loss of signal: an
//! in-progress pass is closed at the last good sample, and the next good
//! sample starts from scratch with no previous elevation to bisect against.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::ElementSet;
use crate::frames::{
    earth_fixed_to_look_angles, geodetic_to_earth_fixed, offset_seconds, seconds_between,
    sidereal_angle, LookAngles,
};
use crate::propagation::{PropagationError, Propagator};

/// Fixed observing site on the WGS-84 ellipsoid
///
/// When deserialized, latitude and longitude are required; a missing
/// altitude means sea level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default = "custom_site_name")]
    pub name: String,
    pub lat_deg: f64,
    pub lon_deg: f64,
    #[serde(default)]
    pub alt_m: f64,
}

fn custom_site_name() -> String {
    "Custom".to_string()
}

impl Default for Site {
    /// Ankara ground station
    fn default() -> Self {
        Self {
            name: "Ankara GS".to_string(),
            lat_deg: 39.9334,
            lon_deg: 32.8597,
            alt_m: 938.0,
        }
    }
}

/// A site with its Earth-fixed position precomputed
#[derive(Debug, Clone)]
pub struct GroundStation {
    site: Site,
    ecef: Vector3<f64>,
    lat_rad: f64,
    lon_rad: f64,
}

/// Pass scan parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    /// Elevation mask (deg)
    pub min_elevation_deg: f64,
    /// Scan step (s)
    pub step_s: f64,
    /// Bisection halvings per crossing
    pub bisection_iterations: u32,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            min_elevation_deg: 10.0,
            step_s: 30.0,
            bisection_iterations: 10,
        }
    }
}

/// How a pass boundary was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingKind {
    /// Bisected to the mask crossing
    Refined,
    /// Object was already above the mask at the window start, or still above it at the end
    WindowEdge,
    /// Adjacent to a sample that could not be propagated
    DataGap,
}

/// One visibility window of an object over the station
///
/// `aos <= max_elevation_time <= los`. The first inequality is strict when
/// `aos_kind` is `Refined`; a pass opened at the window start or after a
/// data gap begins at a sample that may itself be the highest one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pass {
    pub object_id: u32,
    pub aos: DateTime<Utc>,
    pub los: DateTime<Utc>,
    pub duration_s: f64,
    pub max_elevation_deg: f64,
    /// Sample time of the highest elevation, bounded by AOS and LOS
    pub max_elevation_time: DateTime<Utc>,
    pub aos_kind: CrossingKind,
    pub los_kind: CrossingKind,
}

/// An object above the mask at one instant
#[derive(Debug, Clone, Serialize)]
pub struct VisibleObject {
    pub catalog_id: u32,
    pub name: Option<String>,
    #[serde(flatten)]
    pub look: LookAngles,
}

impl GroundStation {
    pub fn new(site: Site) -> Self {
        let ecef = geodetic_to_earth_fixed(site.lat_deg, site.lon_deg, site.alt_m / 1000.0);
        Self {
            lat_rad: site.lat_deg.to_radians(),
            lon_rad: site.lon_deg.to_radians(),
            ecef,
            site,
        }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Earth-fixed site position (km)
    pub fn earth_fixed(&self) -> Vector3<f64> {
        self.ecef
    }

    /// Look angles to an Earth-fixed target position (km)
    pub fn look_angles_to(&self, target_ecef: &Vector3<f64>) -> LookAngles {
        earth_fixed_to_look_angles(&self.ecef, self.lat_rad, self.lon_rad, target_ecef)
    }

    /// Look angles to an object at `time`
    pub fn look_angles<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        elements: &ElementSet,
        time: DateTime<Utc>,
    ) -> Result<LookAngles, PropagationError> {
        let state = propagator.propagate(elements, time)?;
        Ok(self.look_angles_to(&state.earth_fixed(sidereal_angle(time))))
    }

    pub fn elevation_at<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        elements: &ElementSet,
        time: DateTime<Utc>,
    ) -> Result<f64, PropagationError> {
        Ok(self.look_angles(propagator, elements, time)?.elevation_deg)
    }

    /// Whether the object is at or above `min_elevation_deg` at `time`
    pub fn is_visible<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        elements: &ElementSet,
        time: DateTime<Utc>,
        min_elevation_deg: f64,
    ) -> Result<bool, PropagationError> {
        Ok(self.elevation_at(propagator, elements, time)? >= min_elevation_deg)
    }
}

/// A pass that has started but not yet ended
struct OpenPass {
    aos: DateTime<Utc>,
    aos_kind: CrossingKind,
    max_elevation_deg: f64,
    max_elevation_time: DateTime<Utc>,
}

impl OpenPass {
    fn close(self, object_id: u32, los: DateTime<Utc>, los_kind: CrossingKind) -> Pass {
        Pass {
            object_id,
            aos: self.aos,
            los,
            duration_s: seconds_between(self.aos, los).max(0.0),
            max_elevation_deg: self.max_elevation_deg,
            max_elevation_time: self.max_elevation_time,
            aos_kind: self.aos_kind,
            los_kind,
        }
    }
}

/// Predict the passes of one object between `start` and `end`.
pub fn predict_passes<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &ElementSet,
    station: &GroundStation,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: &PassConfig,
) -> Vec<Pass> {
    let span = seconds_between(start, end);
    if !config.step_s.is_finite() || config.step_s <= 0.0 || span < 0.0 {
        log::warn!(
            "Invalid pass window for {} ({} s, step {} s)",
            elements.catalog_id,
            span,
            config.step_s
        );
        return Vec::new();
    }

    let id = elements.catalog_id;
    let mask = config.min_elevation_deg;
    let elevation = |time: DateTime<Utc>| station.elevation_at(propagator, elements, time);
    let refine = |below: DateTime<Utc>, above: DateTime<Utc>| {
        refine_crossing(&elevation, below, above, mask, config.bisection_iterations)
    };

    let mut passes = Vec::new();
    let mut open: Option<OpenPass> = None;
    // Last good sample; None at the window start and after a gap
    let mut previous: Option<(DateTime<Utc>, f64)> = None;

    let samples = (span / config.step_s).floor() as usize;
    for i in 0..=samples {
        let time = offset_seconds(start, config.step_s * i as f64);

        let el = match elevation(time) {
            Ok(el) => el,
            Err(e) => {
                log::trace!("{}", e);
                if let (Some(pass), Some((last_time, _))) = (open.take(), previous) {
                    passes.push(pass.close(id, last_time, CrossingKind::DataGap));
                }
                previous = None;
                continue;
            }
        };

        match open {
            None => {
                if el >= mask {
                    let (aos, aos_kind) = match previous {
                        Some((below, _)) => (refine(below, time), CrossingKind::Refined),
                        None if i == 0 => (time, CrossingKind::WindowEdge),
                        None => (time, CrossingKind::DataGap),
                    };
                    open = Some(OpenPass {
                        aos,
                        aos_kind,
                        max_elevation_deg: el,
                        max_elevation_time: time,
                    });
                }
            }
            Some(ref mut pass) if el >= mask => {
                if el > pass.max_elevation_deg {
                    pass.max_elevation_deg = el;
                    pass.max_elevation_time = time;
                }
            }
            Some(_) => {
                // An open pass always has a good previous sample
                if let (Some(pass), Some((above, _))) = (open.take(), previous) {
                    passes.push(pass.close(id, refine(time, above), CrossingKind::Refined));
                }
            }
        }

        previous = Some((time, el));
    }

    if let Some(pass) = open {
        passes.push(pass.close(id, end, CrossingKind::WindowEdge));
    }

    passes
}

/// Passes for many objects, sorted by AOS.
pub fn predict_passes_batch<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &[ElementSet],
    station: &GroundStation,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: &PassConfig,
) -> Vec<Pass> {
    let mut passes: Vec<Pass> = elements
        .par_iter()
        .flat_map_iter(|set| predict_passes(propagator, set, station, start, end, config))
        .collect();

    passes.sort_by(|a, b| a.aos.cmp(&b.aos).then(a.object_id.cmp(&b.object_id)));
    log::info!(
        "Predicted {} passes for {} objects over {}",
        passes.len(),
        elements.len(),
        station.site().name
    );
    passes
}

/// Objects at or above the mask at `time`, highest first.
pub fn visible_objects<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &[ElementSet],
    station: &GroundStation,
    time: DateTime<Utc>,
    config: &PassConfig,
) -> Vec<VisibleObject> {
    let batch = propagator.propagate_batch(elements, time);

    let mut visible: Vec<VisibleObject> = batch
        .objects
        .iter()
        .filter_map(|object| {
            let look = station.look_angles_to(&object.earth_fixed);
            (look.elevation_deg >= config.min_elevation_deg).then(|| VisibleObject {
                catalog_id: object.catalog_id,
                name: elements[object.index].name.clone(),
                look,
            })
        })
        .collect();

    visible.sort_by(|a, b| b.look.elevation_deg.total_cmp(&a.look.elevation_deg));
    visible
}

/// Bisect the mask crossing between a sample below it and one at or above it.
///
/// `below` may come after `above` (a setting object). A midpoint that cannot
/// be propagated is returned as the crossing.
fn refine_crossing<F>(
    elevation: F,
    below: DateTime<Utc>,
    above: DateTime<Utc>,
    mask: f64,
    iterations: u32,
) -> DateTime<Utc>
where
    F: Fn(DateTime<Utc>) -> Result<f64, PropagationError>,
{
    let mut lo = 0.0;
    let mut hi = seconds_between(below, above);

    for _ in 0..iterations {
        let mid = 0.5 * (lo + hi);
        let time = offset_seconds(below, mid);
        match elevation(time) {
            Ok(el) if el >= mask => hi = mid,
            Ok(_) => lo = mid,
            Err(_) => return time,
        }
    }
    offset_seconds(below, 0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{rotate_earth_fixed_to_inertial, WGS84_A_KM};
    use crate::propagation::testing::{CircularOrbitPropagator, LinearPropagator};
    use chrono::{Duration, TimeZone};

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap()
    }

    fn equator_station() -> GroundStation {
        GroundStation::new(Site {
            name: "equator".into(),
            lat_deg: 0.0,
            lon_deg: 0.0,
            alt_m: 0.0,
        })
    }

    /// Equatorial prograde orbit, passes straight over the equator station
    fn overhead_orbit() -> CircularOrbitPropagator {
        CircularOrbitPropagator::new(epoch(), 7000.0, 0.0)
    }

    fn day_of_passes(propagator: &CircularOrbitPropagator) -> Vec<Pass> {
        predict_passes(
            propagator,
            &ElementSet::default(),
            &equator_station(),
            epoch(),
            epoch() + Duration::hours(24),
            &PassConfig::default(),
        )
    }

    #[test]
    fn test_default_site() {
        let station = GroundStation::new(Site::default());
        assert_eq!(station.site().name, "Ankara GS");
        let geo = crate::frames::earth_fixed_to_geodetic(
            station.earth_fixed().x,
            station.earth_fixed().y,
            station.earth_fixed().z,
        );
        assert!((geo.latitude_deg - 39.9334).abs() < 1e-9);
        assert!((geo.altitude_km - 0.938).abs() < 1e-6);
    }

    #[test]
    fn test_passes_found_and_ordered() {
        let passes = day_of_passes(&overhead_orbit());
        assert!(passes.len() >= 10, "only {} passes", passes.len());

        for pair in passes.windows(2) {
            assert!(pair[0].los < pair[1].aos);
        }
        for pass in &passes {
            assert!(pass.max_elevation_deg >= 10.0);
            assert!(pass.max_elevation_deg > 60.0);
            assert!(pass.aos <= pass.max_elevation_time);
            assert!(pass.max_elevation_time <= pass.los);
            assert!((pass.duration_s - seconds_between(pass.aos, pass.los)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_refined_crossings_straddle_mask() {
        let propagator = overhead_orbit();
        let station = equator_station();
        let set = ElementSet::default();
        let eps = 0.5;

        let passes = day_of_passes(&propagator);
        let refined: Vec<&Pass> = passes
            .iter()
            .filter(|p| p.aos_kind == CrossingKind::Refined && p.los_kind == CrossingKind::Refined)
            .collect();
        assert!(!refined.is_empty());

        for pass in refined {
            assert!(pass.aos < pass.max_elevation_time);
            let el = |t| station.elevation_at(&propagator, &set, t).unwrap();
            assert!(el(offset_seconds(pass.aos, eps)) >= 10.0);
            assert!(el(offset_seconds(pass.aos, -eps)) < 10.0);
            assert!(el(offset_seconds(pass.los, -eps)) >= 10.0);
            assert!(el(offset_seconds(pass.los, eps)) < 10.0);
        }
    }

    #[test]
    fn test_truncated_pass_ends_at_window() {
        let propagator = overhead_orbit();
        let first = day_of_passes(&propagator)
            .into_iter()
            .find(|p| p.aos_kind == CrossingKind::Refined)
            .unwrap();

        let start = first.max_elevation_time;
        let end = start + Duration::seconds(60);
        let passes = predict_passes(
            &propagator,
            &ElementSet::default(),
            &equator_station(),
            start,
            end,
            &PassConfig::default(),
        );

        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].aos, start);
        assert_eq!(passes[0].aos_kind, CrossingKind::WindowEdge);
        // Opened at the window start, which is also the culmination
        assert_eq!(passes[0].max_elevation_time, passes[0].aos);
        assert_eq!(passes[0].los, end);
        assert_eq!(passes[0].los_kind, CrossingKind::WindowEdge);
        assert!((passes[0].duration_s - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_splits_pass() {
        let clean = day_of_passes(&overhead_orbit());
        let target = clean
            .iter()
            .filter(|p| p.aos_kind == CrossingKind::Refined)
            .max_by(|a, b| a.max_elevation_deg.total_cmp(&b.max_elevation_deg))
            .unwrap()
            .clone();

        let mut propagator = overhead_orbit();
        propagator.gap = Some((
            target.max_elevation_time - Duration::seconds(5),
            target.max_elevation_time + Duration::seconds(5),
        ));
        let passes = day_of_passes(&propagator);
        assert_eq!(passes.len(), clean.len() + 1);

        let closed = passes
            .iter()
            .find(|p| p.los_kind == CrossingKind::DataGap)
            .unwrap();
        assert_eq!(closed.aos, target.aos);
        assert_eq!(closed.los, target.max_elevation_time - Duration::seconds(30));

        let resumed = passes
            .iter()
            .find(|p| p.aos_kind == CrossingKind::DataGap)
            .unwrap();
        assert_eq!(resumed.aos, target.max_elevation_time + Duration::seconds(30));
        assert_eq!(resumed.los, target.los);
    }

    #[test]
    fn test_invalid_step_gives_nothing() {
        let config = PassConfig {
            step_s: 0.0,
            ..Default::default()
        };
        let passes = predict_passes(
            &overhead_orbit(),
            &ElementSet::default(),
            &equator_station(),
            epoch(),
            epoch() + Duration::hours(1),
            &config,
        );
        assert!(passes.is_empty());
    }

    #[test]
    fn test_visible_objects_sorted_by_elevation() {
        let station = equator_station();
        let theta = sidereal_angle(epoch());
        let inertial = |x: f64, y: f64| rotate_earth_fixed_to_inertial(&Vector3::new(x, y, 0.0), theta);

        let mut propagator = LinearPropagator::new(epoch());
        // Low over the eastern horizon (~26.6 deg), overhead, and behind the Earth
        propagator.insert(1, inertial(WGS84_A_KM + 500.0, 1000.0), Vector3::zeros());
        propagator.insert(2, inertial(WGS84_A_KM + 500.0, 0.0), Vector3::zeros());
        propagator.insert(3, inertial(-7000.0, 0.0), Vector3::zeros());
        let sets: Vec<ElementSet> = (1..=3).map(LinearPropagator::elements).collect();

        let visible = visible_objects(&propagator, &sets, &station, epoch(), &PassConfig::default());
        let ids: Vec<u32> = visible.iter().map(|v| v.catalog_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!((visible[0].look.elevation_deg - 90.0).abs() < 1e-6);
        assert!((visible[1].look.elevation_deg - 26.565).abs() < 0.01);
        assert!((visible[1].look.azimuth_deg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_batch_sorted_by_aos() {
        let mut early = overhead_orbit();
        early.phase_rad = 0.0;
        let mut late = overhead_orbit();
        late.phase_rad = 1.0;

        // Two objects from one propagator: key the orbit by catalog ID
        struct Pair(CircularOrbitPropagator, CircularOrbitPropagator);
        impl Propagator for Pair {
            fn propagate(
                &self,
                elements: &ElementSet,
                time: DateTime<Utc>,
            ) -> Result<crate::propagation::StateVector, PropagationError> {
                if elements.catalog_id == 1 {
                    self.0.propagate(elements, time)
                } else {
                    self.1.propagate(elements, time)
                }
            }
        }

        let sets: Vec<ElementSet> = (1..=2).map(LinearPropagator::elements).collect();
        let passes = predict_passes_batch(
            &Pair(early, late),
            &sets,
            &equator_station(),
            epoch(),
            epoch() + Duration::hours(12),
            &PassConfig::default(),
        );

        assert!(passes.iter().any(|p| p.object_id == 1));
        assert!(passes.iter().any(|p| p.object_id == 2));
        for pair in passes.windows(2) {
            assert!(pair[0].aos <= pair[1].aos);
        }
    }

    #[test]
    fn test_is_visible_matches_elevation() {
        let propagator = overhead_orbit();
        let station = equator_station();
        let set = ElementSet::default();
        let pass = day_of_passes(&propagator)[0].clone();

        assert!(station
            .is_visible(&propagator, &set, pass.max_elevation_time, 10.0)
            .unwrap());
        let angles = station
            .look_angles(&propagator, &set, pass.max_elevation_time)
            .unwrap();
        assert!(angles.range_km >= 7000.0 - WGS84_A_KM - 1.0);
    }
}
