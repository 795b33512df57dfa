//! Element catalog loading from local files
//!
//! Accepts a JSON array of records (optionally gzip-compressed) or plain
//! two/three-line element text. Records that fail to parse are logged and
//! skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;

use super::ElementSet;

/// JSON catalog record
#[derive(Debug, Clone, Deserialize)]
pub struct ElementRecord {
    #[serde(default)]
    pub catalog_id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
}

/// Load a catalog file, keeping the latest-epoch element set per object.
///
/// The result is sorted by catalog ID.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<ElementSet>> {
    let path = path.as_ref();
    log::info!("Loading element catalog from {:?}", path);

    let file = File::open(path).with_context(|| format!("Failed to open catalog: {:?}", path))?;
    let mut reader: Box<dyn Read> = if has_extension(path, "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .with_context(|| format!("Failed to read catalog: {:?}", path))?;

    let sets = if text.trim_start().starts_with('[') {
        let records: Vec<ElementRecord> =
            serde_json::from_str(&text).with_context(|| "Failed to parse catalog JSON")?;
        parse_records(&records)
    } else {
        parse_tle_text(&text)
    };

    let latest = latest_per_object(sets);
    log::info!("Loaded {} element sets", latest.len());
    Ok(latest)
}

/// Parse JSON records, skipping invalid ones
pub fn parse_records(records: &[ElementRecord]) -> Vec<ElementSet> {
    let mut sets = Vec::with_capacity(records.len());
    for record in records {
        match ElementSet::from_tle(record.name.as_deref(), &record.line1, &record.line2) {
            Ok(set) => {
                if let Some(id) = record.catalog_id {
                    if id != set.catalog_id {
                        log::warn!(
                            "Record catalog_id {} disagrees with element lines ({}), using lines",
                            id,
                            set.catalog_id
                        );
                    }
                }
                sets.push(set);
            }
            Err(e) => log::warn!("Skipping element record {:?}: {}", record.name, e),
        }
    }
    sets
}

/// Parse two-line or three-line element text
pub fn parse_tle_text(text: &str) -> Vec<ElementSet> {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut sets = Vec::new();
    let mut pending_name: Option<&str> = None;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            match ElementSet::from_tle(pending_name, line, lines[i + 1]) {
                Ok(set) => sets.push(set),
                Err(e) => log::warn!("Skipping element set near line {}: {}", i + 1, e),
            }
            pending_name = None;
            i += 2;
        } else {
            pending_name = Some(line);
            i += 1;
        }
    }
    sets
}

/// Keep only the most recent epoch for each catalog ID
pub fn latest_per_object(sets: Vec<ElementSet>) -> Vec<ElementSet> {
    let mut latest: HashMap<u32, ElementSet> = HashMap::with_capacity(sets.len());
    for set in sets {
        match latest.get(&set.catalog_id) {
            Some(existing) if existing.epoch >= set.epoch => {}
            _ => {
                latest.insert(set.catalog_id, set);
            }
        }
    }

    let mut result: Vec<ElementSet> = latest.into_values().collect();
    result.sort_by_key(|s| s.catalog_id);
    result
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}
