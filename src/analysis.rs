use std::fs::{create_dir_all, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use spacewatch::collision::estimate_collision_probability;
use spacewatch::conjunction::{screen_conjunctions, screen_horizon_with_progress, ConjunctionEvent};
use spacewatch::data::{load_catalog, ElementSet};
use spacewatch::propagation::hifi::{propagate_high_fidelity, GravityModel};
use spacewatch::propagation::{ground_track, Sgp4Propagator};
use spacewatch::reentry::{estimate_lifetime, reentry_candidates, LifetimeEstimate};
use spacewatch::visibility::{predict_passes_batch, visible_objects, GroundStation, Site};
use spacewatch::AnalyticsConfig;

/// Inputs shared by every analysis command
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Element catalog (JSON records, optionally .gz, or TLE text)
    #[arg(long)]
    pub catalog: PathBuf,
    /// Analysis epoch, RFC 3339 (defaults to now)
    #[arg(long)]
    pub time: Option<DateTime<Utc>>,
    /// Output JSON file path (defaults to stdout)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl CatalogArgs {
    fn epoch(&self) -> DateTime<Utc> {
        self.time.unwrap_or_else(Utc::now)
    }
}

/// Ground station overrides on top of the configured site
#[derive(Args, Debug, Clone)]
pub struct SiteArgs {
    /// Station latitude (deg)
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,
    /// Station longitude (deg)
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,
    /// Station altitude (m)
    #[arg(long)]
    pub alt: Option<f64>,
    /// Elevation mask (deg)
    #[arg(long)]
    pub min_elevation: Option<f64>,
}

impl SiteArgs {
    fn apply(&self, config: &mut AnalyticsConfig) {
        if self.lat.is_some() || self.lon.is_some() || self.alt.is_some() {
            config.site = Site {
                name: "Custom".to_string(),
                lat_deg: self.lat.unwrap_or(config.site.lat_deg),
                lon_deg: self.lon.unwrap_or(config.site.lon_deg),
                alt_m: self.alt.unwrap_or(config.site.alt_m),
            };
        }
        if let Some(mask) = self.min_elevation {
            config.passes.min_elevation_deg = mask;
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScreenArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    /// Distance threshold in kilometers
    #[arg(long)]
    pub threshold_km: Option<f64>,
    /// Time horizon in hours (single instant when omitted)
    #[arg(long)]
    pub hours: Option<f64>,
    /// Screening step in seconds
    #[arg(long, default_value_t = 60.0)]
    pub step_seconds: f64,
    /// Max number of events to keep in output
    #[arg(long, default_value_t = 50000)]
    pub max_events: usize,
}

#[derive(Args, Debug, Clone)]
pub struct PassesArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    #[command(flatten)]
    pub site: SiteArgs,
    /// Catalog IDs to predict (all objects when omitted)
    #[arg(long = "id")]
    pub ids: Vec<u32>,
    /// Prediction window in hours
    #[arg(long, default_value_t = 24.0)]
    pub hours: f64,
}

#[derive(Args, Debug, Clone)]
pub struct VisibleArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    #[command(flatten)]
    pub site: SiteArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PocArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    /// First object's catalog ID
    #[arg(long)]
    pub a: u32,
    /// Second object's catalog ID
    #[arg(long)]
    pub b: u32,
    /// Time of closest approach (defaults to --time)
    #[arg(long)]
    pub tca: Option<DateTime<Utc>>,
    #[arg(long)]
    pub samples: Option<usize>,
    /// 1-sigma position uncertainty per axis (km)
    #[arg(long)]
    pub sigma_km: Option<f64>,
    /// Combined hard-body radius (km)
    #[arg(long)]
    pub radius_km: Option<f64>,
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct HifiArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    #[arg(long)]
    pub id: u32,
    /// Propagation time in seconds
    #[arg(long)]
    pub duration: Option<f64>,
    /// Integration step in seconds
    #[arg(long)]
    pub step: Option<f64>,
    #[arg(long)]
    pub no_drag: bool,
    /// Two-body gravity only
    #[arg(long)]
    pub point_mass: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrackArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    #[arg(long)]
    pub id: u32,
    /// Track length in minutes
    #[arg(long, default_value_t = 90.0)]
    pub minutes: f64,
    /// Sample step in seconds
    #[arg(long, default_value_t = 60.0)]
    pub step_seconds: f64,
}

#[derive(Args, Debug, Clone)]
pub struct LifetimeArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,
    /// Single object (re-entry candidates when omitted)
    #[arg(long)]
    pub id: Option<u32>,
    /// Candidate perigee ceiling (km)
    #[arg(long, default_value_t = 400.0)]
    pub max_perigee_km: f64,
    /// Max number of candidates
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
struct ScreeningReport {
    generated_at: String,
    start_time_utc: String,
    hours: f64,
    step_seconds: f64,
    threshold_km: f64,
    total_objects: usize,
    total_events: usize,
    events: Vec<ConjunctionEvent>,
}

#[derive(Debug, Serialize)]
struct LifetimeReport {
    generated_at: String,
    max_perigee_km: f64,
    candidates: Vec<LifetimeEstimate>,
}

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    match path {
        Some(path) => AnalyticsConfig::load(path),
        None => Ok(AnalyticsConfig::default()),
    }
}

fn find_object(catalog: &[ElementSet], id: u32) -> Result<&ElementSet> {
    catalog
        .iter()
        .find(|set| set.catalog_id == id)
        .ok_or_else(|| anyhow!("object {} not found in catalog", id))
}

/// Truncate to `max` items, returning the count before truncation
fn keep_first<T>(items: &mut Vec<T>, max: usize) -> usize {
    let total = items.len();
    if total > max {
        log::info!("Keeping the first {} of {} results", max, total);
        items.truncate(max);
    }
    total
}

fn write_json<T: Serialize>(output: Option<&Path>, value: &T) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            serde_json::to_writer_pretty(BufWriter::new(file), value)?;
            log::info!("Wrote {:?}", path);
        }
        None => {
            let stdout = io::stdout();
            serde_json::to_writer_pretty(stdout.lock(), value)?;
            println!();
        }
    }
    Ok(())
}

pub fn run_screen(args: ScreenArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(threshold) = args.threshold_km {
        config.screening.threshold_km = threshold;
    }
    if config.screening.threshold_km <= 0.0 {
        return Err(anyhow!("threshold-km must be > 0"));
    }
    if args.step_seconds <= 0.0 {
        return Err(anyhow!("step-seconds must be > 0"));
    }

    let catalog = load_catalog(&args.catalog.catalog)?;
    let start = args.catalog.epoch();
    let propagator = Sgp4Propagator::new();

    let hours = args.hours.unwrap_or(0.0);
    let mut events: Vec<ConjunctionEvent> = match args.hours {
        Some(hours) => {
            let total = ((hours * 3600.0) / args.step_seconds).ceil() as u64 + 1;
            log::info!(
                "Screening {} objects for {} hours ({} samples)...",
                catalog.len(),
                hours,
                total
            );

            let progress = ProgressBar::new(total);
            progress.set_style(
                ProgressStyle::with_template(
                    "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {percent}% ETA {eta_precise}",
                )?
                .progress_chars("##-"),
            );
            let events = screen_horizon_with_progress(
                &propagator,
                &catalog,
                start,
                hours,
                args.step_seconds,
                &config.screening,
                |done, _| progress.set_position(done as u64),
            );
            progress.finish_and_clear();
            events
        }
        None => {
            log::info!("Screening {} objects at {}...", catalog.len(), start);
            screen_conjunctions(&propagator, &catalog, start, &config.screening)
        }
    };
    let total_events = keep_first(&mut events, args.max_events);

    let report = ScreeningReport {
        generated_at: Utc::now().to_rfc3339(),
        start_time_utc: start.to_rfc3339(),
        hours,
        step_seconds: args.step_seconds,
        threshold_km: config.screening.threshold_km,
        total_objects: catalog.len(),
        total_events,
        events,
    };
    write_json(args.catalog.output.as_deref(), &report)
}

pub fn run_passes(args: PassesArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.site.apply(&mut config);
    if args.hours <= 0.0 {
        return Err(anyhow!("hours must be > 0"));
    }

    let catalog = load_catalog(&args.catalog.catalog)?;
    let selected: Vec<ElementSet> = if args.ids.is_empty() {
        catalog
    } else {
        args.ids
            .iter()
            .map(|&id| find_object(&catalog, id).cloned())
            .collect::<Result<_>>()?
    };

    let start = args.catalog.epoch();
    let end = start + Duration::milliseconds((args.hours * 3_600_000.0).round() as i64);
    let station = GroundStation::new(config.site.clone());

    let passes = predict_passes_batch(
        &Sgp4Propagator::new(),
        &selected,
        &station,
        start,
        end,
        &config.passes,
    );
    write_json(args.catalog.output.as_deref(), &passes)
}

pub fn run_visible(args: VisibleArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.site.apply(&mut config);

    let catalog = load_catalog(&args.catalog.catalog)?;
    let time = args.catalog.epoch();
    let station = GroundStation::new(config.site.clone());

    let visible = visible_objects(&Sgp4Propagator::new(), &catalog, &station, time, &config.passes);
    log::info!(
        "{} of {} objects above {}° from {} at {}",
        visible.len(),
        catalog.len(),
        config.passes.min_elevation_deg,
        config.site.name,
        time
    );
    write_json(args.catalog.output.as_deref(), &visible)
}

pub fn run_poc(args: PocArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(samples) = args.samples {
        config.collision.num_samples = samples;
    }
    if let Some(sigma) = args.sigma_km {
        config.collision.position_sigma_km = sigma;
    }
    if let Some(radius) = args.radius_km {
        config.collision.hard_body_radius_km = radius;
    }
    if let Some(seed) = args.seed {
        config.collision.seed = seed;
    }

    let catalog = load_catalog(&args.catalog.catalog)?;
    let a = find_object(&catalog, args.a)?;
    let b = find_object(&catalog, args.b)?;
    let tca = args.tca.unwrap_or_else(|| args.catalog.epoch());

    let estimate = estimate_collision_probability(&Sgp4Propagator::new(), a, b, tca, &config.collision)?;
    log::info!(
        "Pc {:.3e} ({:?}, {}/{} hits) for {} / {}",
        estimate.poc,
        estimate.risk,
        estimate.hits,
        estimate.samples,
        args.a,
        args.b
    );
    write_json(args.catalog.output.as_deref(), &estimate)
}

pub fn run_hifi(args: HifiArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(duration) = args.duration {
        config.hifi.duration_s = duration;
    }
    if let Some(step) = args.step {
        config.hifi.step_s = step;
    }
    if args.no_drag {
        config.hifi.include_drag = false;
    }
    if args.point_mass {
        config.hifi.gravity = GravityModel::PointMass;
    }

    let catalog = load_catalog(&args.catalog.catalog)?;
    let elements = find_object(&catalog, args.id)?;
    let start = args.catalog.epoch();

    let trajectory = propagate_high_fidelity(&Sgp4Propagator::new(), elements, start, &config.hifi)?;
    if let Some(event) = &trajectory.reentry {
        log::warn!(
            "Object {} re-entered at {} ({:.1} km)",
            args.id,
            event.time,
            event.altitude_km
        );
    }
    write_json(args.catalog.output.as_deref(), &trajectory)
}

pub fn run_track(args: TrackArgs) -> Result<()> {
    if args.step_seconds <= 0.0 {
        return Err(anyhow!("step-seconds must be > 0"));
    }
    let catalog = load_catalog(&args.catalog.catalog)?;
    let elements = find_object(&catalog, args.id)?;
    let start = args.catalog.epoch();
    let end = start + Duration::milliseconds((args.minutes * 60_000.0).round() as i64);

    let track = ground_track(&Sgp4Propagator::new(), elements, start, end, args.step_seconds);
    write_json(args.catalog.output.as_deref(), &track)
}

pub fn run_lifetime(args: LifetimeArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog.catalog)?;
    let now = args.catalog.epoch();
    let propagator = Sgp4Propagator::new();

    match args.id {
        Some(id) => {
            let estimate = estimate_lifetime(&propagator, find_object(&catalog, id)?, now)?;
            write_json(args.catalog.output.as_deref(), &estimate)
        }
        None => {
            let candidates =
                reentry_candidates(&propagator, &catalog, now, args.max_perigee_km, args.limit);
            log::info!(
                "{} re-entry candidates below {} km perigee",
                candidates.len(),
                args.max_perigee_km
            );
            let report = LifetimeReport {
                generated_at: Utc::now().to_rfc3339(),
                max_perigee_km: args.max_perigee_km,
                candidates,
            };
            write_json(args.catalog.output.as_deref(), &report)
        }
    }
}
