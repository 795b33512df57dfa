//! Conjunction screening and time-of-closest-approach refinement
//!
//! Two phases: every object is propagated to one reference instant and all
//! pairs closer than a threshold become candidates; each candidate pair then
//! has its closest approach located by golden-section search over a window
//! around the reference instant.
//!
//! The search assumes the inter-object distance has a single minimum inside
//! the window. Widely separated or highly eccentric pairs can violate that,
//! in which case the reported minimum is a local one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::ElementSet;
use crate::frames::offset_seconds;
use crate::propagation::{Propagator, StateVector};

/// (√5 - 1) / 2, the golden-section shrink factor
const INV_GOLDEN_RATIO: f64 = 0.618_033_988_749_894_9;

/// Screening and refinement parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// Candidate and acceptance distance (km)
    pub threshold_km: f64,
    /// Half-width of the TCA search window (s)
    pub window_s: f64,
    /// Bracket width at which the search stops (s)
    pub tolerance_s: f64,
    /// Iteration budget for the golden-section search
    pub max_iterations: usize,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            threshold_km: 50.0,
            window_s: 900.0,
            tolerance_s: 0.1,
            max_iterations: 200,
        }
    }
}

impl ScreeningConfig {
    /// Coarser tolerance for quick catalog-wide sweeps
    pub fn fast() -> Self {
        Self {
            tolerance_s: 1.0,
            max_iterations: 50,
            ..Default::default()
        }
    }

    pub fn high_precision() -> Self {
        Self {
            tolerance_s: 0.001,
            max_iterations: 500,
            ..Default::default()
        }
    }
}

/// Severity band of a close approach
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Critical,
    High,
    Moderate,
    Low,
}

impl RiskLevel {
    /// Band for a miss distance; each band includes its lower bound.
    pub fn from_distance(distance_km: f64) -> Self {
        if distance_km < 1.0 {
            Self::Critical
        } else if distance_km < 5.0 {
            Self::High
        } else if distance_km < 25.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Moderate => "MODERATE",
            Self::Low => "LOW",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refined close approach between two objects
#[derive(Debug, Clone, Serialize)]
pub struct ConjunctionEvent {
    pub object_a_id: u32,
    pub object_b_id: u32,
    pub tca: DateTime<Utc>,
    pub min_distance_km: f64,
    pub risk_level: RiskLevel,
    pub state_a: StateVector,
    pub state_b: StateVector,
    /// Relative speed at TCA (km/s)
    pub relative_speed_km_s: f64,
    /// Separation at the screening instant (km)
    pub screening_distance_km: f64,
}

impl ConjunctionEvent {
    fn pair_key(&self) -> (u32, u32) {
        if self.object_a_id <= self.object_b_id {
            (self.object_a_id, self.object_b_id)
        } else {
            (self.object_b_id, self.object_a_id)
        }
    }
}

/// Outcome of a one-dimensional golden-section minimisation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoldenSectionResult {
    /// Midpoint of the final bracket
    pub x: f64,
    /// Width of the final bracket
    pub bracket: f64,
    pub iterations: usize,
    /// False if the iteration budget ran out before the tolerance was met
    pub converged: bool,
}

/// Minimise `f` over `[lo, hi]` by golden-section search.
///
/// Non-finite objective values are treated as +∞. When the budget runs out
/// the midpoint of the current bracket is returned with `converged = false`.
pub fn golden_section_minimize<F>(
    mut f: F,
    lo: f64,
    hi: f64,
    tolerance: f64,
    max_iterations: usize,
) -> GoldenSectionResult
where
    F: FnMut(f64) -> f64,
{
    let mut eval = |x: f64| {
        let value = f(x);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    };

    let (mut a, mut b) = (lo.min(hi), lo.max(hi));
    let mut c = b - INV_GOLDEN_RATIO * (b - a);
    let mut d = a + INV_GOLDEN_RATIO * (b - a);
    let mut fc = eval(c);
    let mut fd = eval(d);

    let mut iterations = 0;
    while (b - a) > tolerance {
        if iterations >= max_iterations {
            return GoldenSectionResult {
                x: 0.5 * (a + b),
                bracket: b - a,
                iterations,
                converged: false,
            };
        }
        iterations += 1;

        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_GOLDEN_RATIO * (b - a);
            fc = eval(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_GOLDEN_RATIO * (b - a);
            fd = eval(d);
        }
    }

    GoldenSectionResult {
        x: 0.5 * (a + b),
        bracket: b - a,
        iterations,
        converged: true,
    }
}

/// All index pairs `(i, j)`, `i < j`, closer than `threshold_km`, with their distance.
///
/// Each row compares one position against the rest of the shared table.
pub fn coarse_candidates(positions: &[Vector3<f64>], threshold_km: f64) -> Vec<(usize, usize, f64)> {
    let threshold_sq = threshold_km * threshold_km;

    positions
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, pos_i)| {
            positions[i + 1..]
                .iter()
                .enumerate()
                .filter_map(move |(offset, pos_j)| {
                    let dist_sq = (pos_i - pos_j).norm_squared();
                    (dist_sq < threshold_sq).then(|| (i, i + 1 + offset, dist_sq.sqrt()))
                })
        })
        .collect()
}

/// Locate the closest approach of two objects around `reference`.
///
/// Returns the bracket-midpoint TCA with both states there, or `None` if
/// either object cannot be propagated at that instant. Search points that fail to
/// propagate count as infinitely distant.
pub fn refine_tca<P: Propagator + ?Sized>(
    propagator: &P,
    a: &ElementSet,
    b: &ElementSet,
    reference: DateTime<Utc>,
    config: &ScreeningConfig,
) -> Option<(DateTime<Utc>, StateVector, StateVector)> {
    let distance = |offset_s: f64| {
        let time = offset_seconds(reference, offset_s);
        match (propagator.propagate(a, time), propagator.propagate(b, time)) {
            (Ok(sa), Ok(sb)) => sa.distance_to(&sb),
            _ => f64::INFINITY,
        }
    };

    let result = golden_section_minimize(
        distance,
        -config.window_s,
        config.window_s,
        config.tolerance_s,
        config.max_iterations,
    );
    if !result.converged {
        log::debug!(
            "TCA search for {}-{} stopped at bracket {:.3} s after {} iterations",
            a.catalog_id,
            b.catalog_id,
            result.bracket,
            result.iterations
        );
    }

    let tca = offset_seconds(reference, result.x);
    match (propagator.propagate(a, tca), propagator.propagate(b, tca)) {
        (Ok(sa), Ok(sb)) => Some((tca, sa, sb)),
        (Err(e), _) | (_, Err(e)) => {
            log::debug!("Dropping pair {}-{}: {}", a.catalog_id, b.catalog_id, e);
            None
        }
    }
}

/// Screen every pair of objects at `time` and refine the close ones.
///
/// Objects that fail to propagate are left out; fewer than two propagated
/// objects gives an empty result. Events are sorted by ascending miss
/// distance.
pub fn screen_conjunctions<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &[ElementSet],
    time: DateTime<Utc>,
    config: &ScreeningConfig,
) -> Vec<ConjunctionEvent> {
    let batch = propagator.propagate_batch(elements, time);
    if batch.objects.len() < 2 {
        log::debug!(
            "Screening at {}: {} propagated objects, nothing to compare",
            time,
            batch.objects.len()
        );
        return Vec::new();
    }

    let positions: Vec<Vector3<f64>> = batch.objects.iter().map(|o| o.state.position).collect();
    let candidates = coarse_candidates(&positions, config.threshold_km);

    let mut events: Vec<ConjunctionEvent> = candidates
        .par_iter()
        .filter_map(|&(i, j, screening_distance_km)| {
            let a = &elements[batch.objects[i].index];
            let b = &elements[batch.objects[j].index];
            let (tca, state_a, state_b) = refine_tca(propagator, a, b, time, config)?;

            let min_distance_km = state_a.distance_to(&state_b);
            if min_distance_km >= config.threshold_km {
                return None;
            }
            Some(ConjunctionEvent {
                object_a_id: a.catalog_id,
                object_b_id: b.catalog_id,
                tca,
                min_distance_km,
                risk_level: RiskLevel::from_distance(min_distance_km),
                relative_speed_km_s: (state_a.velocity - state_b.velocity).norm(),
                state_a,
                state_b,
                screening_distance_km,
            })
        })
        .collect();

    sort_by_distance(&mut events);

    log::debug!(
        "Screening at {}: {} objects, {} candidates, {} events",
        time,
        positions.len(),
        candidates.len(),
        events.len()
    );
    events
}

/// Screen repeatedly across a horizon, keeping the closest event per pair.
pub fn screen_horizon<P: Propagator + ?Sized>(
    propagator: &P,
    elements: &[ElementSet],
    start: DateTime<Utc>,
    hours: f64,
    step_s: f64,
    config: &ScreeningConfig,
) -> Vec<ConjunctionEvent> {
    screen_horizon_with_progress(propagator, elements, start, hours, step_s, config, |_, _| {})
}

/// [`screen_horizon`], calling `on_step(done, total)` after every screening instant.
pub fn screen_horizon_with_progress<P, F>(
    propagator: &P,
    elements: &[ElementSet],
    start: DateTime<Utc>,
    hours: f64,
    step_s: f64,
    config: &ScreeningConfig,
    mut on_step: F,
) -> Vec<ConjunctionEvent>
where
    P: Propagator + ?Sized,
    F: FnMut(usize, usize),
{
    if !step_s.is_finite() || step_s <= 0.0 || !hours.is_finite() || hours < 0.0 {
        log::warn!("Invalid horizon ({} h, step {} s)", hours, step_s);
        return Vec::new();
    }

    let steps = ((hours * 3600.0) / step_s).ceil() as usize;
    let total = steps + 1;
    let mut closest: HashMap<(u32, u32), ConjunctionEvent> = HashMap::new();

    for step in 0..=steps {
        let time = offset_seconds(start, step as f64 * step_s);
        for event in screen_conjunctions(propagator, elements, time, config) {
            match closest.get(&event.pair_key()) {
                Some(existing) if existing.min_distance_km <= event.min_distance_km => {}
                _ => {
                    closest.insert(event.pair_key(), event);
                }
            }
        }
        on_step(step + 1, total);
    }

    let mut events: Vec<ConjunctionEvent> = closest.into_values().collect();
    sort_by_distance(&mut events);
    log::info!(
        "Horizon screening: {} steps, {} unique pairs",
        total,
        events.len()
    );
    events
}

fn sort_by_distance(events: &mut [ConjunctionEvent]) {
    events.sort_by(|a, b| {
        a.min_distance_km
            .total_cmp(&b.min_distance_km)
            .then_with(|| a.pair_key().cmp(&b.pair_key()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::seconds_between;
    use crate::propagation::testing::LinearPropagator;
    use crate::propagation::PropagationError;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 6, 0, 0).unwrap()
    }

    /// Objects 1/2 close to 0.5 km at +300 s; objects 3/4 hold 10 km apart.
    fn scenario() -> (LinearPropagator, Vec<ElementSet>) {
        let common = Vector3::new(0.0, 7.5, 0.0);
        let mut propagator = LinearPropagator::new(epoch());

        let p1 = Vector3::new(7000.0, 0.0, 0.0);
        propagator.insert(1, p1, common);
        propagator.insert(
            2,
            p1 + Vector3::new(0.3, 0.0, 0.5),
            common + Vector3::new(-0.001, 0.0, 0.0),
        );

        let p3 = Vector3::new(-7000.0, 0.0, 0.0);
        propagator.insert(3, p3, -common);
        propagator.insert(4, p3 + Vector3::new(10.0, 0.0, 0.0), -common);

        let sets = (1..=4).map(LinearPropagator::elements).collect();
        (propagator, sets)
    }

    #[test]
    fn test_risk_level_boundaries() {
        let cases = [
            (0.999, RiskLevel::Critical),
            (1.0, RiskLevel::High),
            (4.999, RiskLevel::High),
            (5.0, RiskLevel::Moderate),
            (24.999, RiskLevel::Moderate),
            (25.0, RiskLevel::Low),
        ];
        for (distance, expected) in cases {
            assert_eq!(RiskLevel::from_distance(distance), expected, "{}", distance);
        }
    }

    #[test]
    fn test_golden_section_parabola() {
        let result = golden_section_minimize(|x| (x - 3.3).powi(2), -900.0, 900.0, 0.1, 200);
        assert!(result.converged);
        assert!(result.bracket <= 0.1);
        assert!((result.x - 3.3).abs() < 0.1);
    }

    #[test]
    fn test_golden_section_budget_returns_midpoint() {
        let result = golden_section_minimize(|x| (x - 3.3).powi(2), -900.0, 900.0, 0.1, 3);
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
        assert!(result.bracket > 0.1);
        assert!(result.x > -900.0 && result.x < 900.0);
    }

    #[test]
    fn test_golden_section_ignores_failed_evaluations() {
        let result = golden_section_minimize(
            |x| if x < -100.0 { f64::NAN } else { (x - 50.0).abs() },
            -900.0,
            900.0,
            0.1,
            200,
        );
        assert!((result.x - 50.0).abs() < 0.1);
    }

    #[test]
    fn test_coarse_candidates() {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(100.0, 0.0, 0.0),
            Vector3::new(0.0, 4.0, 0.0),
        ];
        let mut pairs = coarse_candidates(&positions, 6.0);
        pairs.sort_by_key(|&(i, j, _)| (i, j));

        let ids: Vec<(usize, usize)> = pairs.iter().map(|&(i, j, _)| (i, j)).collect();
        assert_eq!(ids, vec![(0, 1), (0, 3), (1, 3)]);
        assert!((pairs[2].2 - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_static_pair_never_exceeds_coarse_distance() {
        let mut propagator = LinearPropagator::new(epoch());
        propagator.insert(10, Vector3::new(6800.0, 0.0, 0.0), Vector3::zeros());
        propagator.insert(11, Vector3::new(6800.0, 3.0, 1.0), Vector3::zeros());
        let sets = vec![LinearPropagator::elements(10), LinearPropagator::elements(11)];

        let events = screen_conjunctions(&propagator, &sets, epoch(), &ScreeningConfig::default());
        assert_eq!(events.len(), 1);
        assert!(events[0].min_distance_km <= events[0].screening_distance_km + 1e-12);
    }

    #[test]
    fn test_moving_pair_refines_below_coarse_distance() {
        let (propagator, sets) = scenario();
        let events =
            screen_conjunctions(&propagator, &sets[..2], epoch(), &ScreeningConfig::default());
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert!(event.min_distance_km <= event.screening_distance_km);
        assert!((seconds_between(epoch(), event.tca) - 300.0).abs() < 0.1);
        assert!((event.relative_speed_km_s - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_end_to_end_ordering() {
        let (propagator, sets) = scenario();

        let tight = ScreeningConfig {
            threshold_km: 1.0,
            ..Default::default()
        };
        let close = screen_conjunctions(&propagator, &sets, epoch(), &tight);
        assert_eq!(close.len(), 1);
        assert_eq!(close[0].risk_level, RiskLevel::Critical);

        let events = screen_conjunctions(&propagator, &sets, epoch(), &ScreeningConfig::default());
        assert_eq!(events.len(), 2);

        assert_eq!((events[0].object_a_id, events[0].object_b_id), (1, 2));
        assert_eq!(events[0].risk_level, RiskLevel::Critical);
        assert!((events[0].min_distance_km - 0.5).abs() < 1e-3);

        assert_eq!((events[1].object_a_id, events[1].object_b_id), (3, 4));
        assert_eq!(events[1].risk_level, RiskLevel::Moderate);
        assert!((events[1].min_distance_km - 10.0).abs() < 1e-9);
    }

    /// Object 2 sits 5 km above object 1, except at `epoch` where it is 0.9 km away.
    struct MomentaryDip {
        epoch: DateTime<Utc>,
    }

    impl Propagator for MomentaryDip {
        fn propagate(
            &self,
            elements: &ElementSet,
            time: DateTime<Utc>,
        ) -> Result<StateVector, PropagationError> {
            let base = Vector3::new(7000.0, 0.0, 0.0);
            let position = match elements.catalog_id {
                1 => base,
                _ if time == self.epoch => base + Vector3::new(0.0, 0.0, 0.9),
                _ => base + Vector3::new(0.0, 0.0, 5.0),
            };
            Ok(StateVector::new(position, Vector3::zeros(), time))
        }
    }

    #[test]
    fn test_refined_above_threshold_is_dropped() {
        let propagator = MomentaryDip { epoch: epoch() };
        let sets = vec![LinearPropagator::elements(1), LinearPropagator::elements(2)];
        let config = ScreeningConfig {
            threshold_km: 1.0,
            ..Default::default()
        };

        let batch = propagator.propagate_batch(&sets, epoch());
        let positions: Vec<Vector3<f64>> = batch.objects.iter().map(|o| o.state.position).collect();
        let candidates = coarse_candidates(&positions, config.threshold_km);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].2 - 0.9).abs() < 1e-9);

        let (_, state_a, state_b) = refine_tca(&propagator, &sets[0], &sets[1], epoch(), &config).unwrap();
        assert!(state_a.distance_to(&state_b) >= config.threshold_km);

        assert!(screen_conjunctions(&propagator, &sets, epoch(), &config).is_empty());
    }

    #[test]
    fn test_failed_object_is_isolated() {
        let (mut propagator, mut sets) = scenario();
        propagator.insert(5, Vector3::new(7000.0, 0.1, 0.0), Vector3::new(0.0, 7.5, 0.0));
        propagator.fail(5);
        sets.push(LinearPropagator::elements(5));

        let events = screen_conjunctions(&propagator, &sets, epoch(), &ScreeningConfig::default());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.object_a_id != 5 && e.object_b_id != 5));
    }

    #[test]
    fn test_single_object_gives_no_events() {
        let (propagator, sets) = scenario();
        let events =
            screen_conjunctions(&propagator, &sets[..1], epoch(), &ScreeningConfig::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_horizon_keeps_closest_per_pair() {
        let (propagator, sets) = scenario();
        let mut calls = 0;
        let events = screen_horizon_with_progress(
            &propagator,
            &sets,
            epoch(),
            0.1,
            120.0,
            &ScreeningConfig::default(),
            |done, total| {
                calls += 1;
                assert!(done <= total);
            },
        );

        // 360 s horizon at 120 s: 4 screening instants
        assert_eq!(calls, 4);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].object_a_id, 1);
        assert!((events[0].min_distance_km - 0.5).abs() < 1e-3);
    }
}
