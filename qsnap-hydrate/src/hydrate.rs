//! Snapshot consumption.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use qsnap_core::error::Result;
use qsnap_core::traits::{CachedQuery, QueryCache};
use qsnap_core::types::{HydrationConfig, ParsedSnapshot, QueryConfig, Snapshot, SnapshotRecord};

/// What [`hydrate`] did with a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HydrationReport {
    /// Records that built a new entry
    pub created: usize,
    /// Records that overwrote an older entry
    pub updated: usize,
    /// Records ignored because the local entry was as fresh or fresher,
    /// or because they carried no data for an existing entry
    pub skipped: usize,
    /// Records dropped because they did not decode
    pub rejected: usize,
    /// The input was not a snapshot and was treated as empty
    pub malformed: bool,
}

impl HydrationReport {
    /// Number of records that changed the cache.
    pub fn applied(&self) -> usize {
        self.created + self.updated
    }
}

enum Outcome {
    Created,
    Updated,
    Skipped,
}

/// Merges `snapshot` into `cache`, record by record.
///
/// - Existing entry: overwritten only if strictly older than the record.
///   Equal timestamps keep the local entry. A record without data never
///   touches an existing entry.
/// - Missing entry: built with the record's retention override, falling back
///   to `config`, then populated with the record's data and timestamp. If the
///   entry was written concurrently between lookup and build, the record
///   lands only when it carries strictly newer data.
///
/// # Errors
/// The first cache error aborts the merge and is returned. Records applied
/// before it stay applied.
#[instrument(skip_all, fields(records = snapshot.len()))]
pub fn hydrate<C>(cache: &C, snapshot: &Snapshot, config: &HydrationConfig) -> Result<HydrationReport>
where
    C: QueryCache + ?Sized,
{
    let mut report = HydrationReport::default();

    for record in snapshot {
        match apply_record(cache, record, config)? {
            Outcome::Created => report.created += 1,
            Outcome::Updated => report.updated += 1,
            Outcome::Skipped => report.skipped += 1,
        }
    }

    info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        "Hydrated snapshot"
    );
    Ok(report)
}

fn apply_record<C>(cache: &C, record: &SnapshotRecord, config: &HydrationConfig) -> Result<Outcome>
where
    C: QueryCache + ?Sized,
{
    if let Some(existing) = cache.find(&record.key) {
        let Some(data) = &record.data else {
            debug!(key = %record.key, "Record has no data, keeping local entry");
            return Ok(Outcome::Skipped);
        };

        return if existing.set_data_if_newer(data.clone(), record.updated_at)? {
            debug!(key = %record.key, updated_at = record.updated_at, "Updated entry");
            Ok(Outcome::Updated)
        } else {
            debug!(key = %record.key, updated_at = record.updated_at, "Local entry is as fresh, skipping");
            Ok(Outcome::Skipped)
        };
    }

    let cache_time_ms = record
        .overrides
        .cache_time_ms
        .unwrap_or(config.default_cache_time_ms);
    let query = cache.build(
        &record.key,
        QueryConfig::with_cache_time(Duration::from_millis(cache_time_ms)),
    )?;

    // `build` may hand back an entry another writer populated after `find`
    if !query.set_initial_data(record.data.clone(), record.updated_at)? {
        debug!(key = %record.key, updated_at = record.updated_at, "Entry written concurrently is as fresh, skipping");
        return Ok(Outcome::Skipped);
    }

    debug!(key = %record.key, updated_at = record.updated_at, cache_time_ms, "Created entry");
    Ok(Outcome::Created)
}

/// Hydrates from a value of unknown shape.
///
/// Anything that is not an object with a record list is logged and treated
/// as an empty snapshot. Records that do not decode are skipped.
pub fn hydrate_value<C>(cache: &C, value: &Value, config: &HydrationConfig) -> Result<HydrationReport>
where
    C: QueryCache + ?Sized,
{
    match Snapshot::parse(value) {
        ParsedSnapshot::Malformed(reason) => {
            warn!(%reason, "Ignoring malformed snapshot");
            Ok(HydrationReport {
                malformed: true,
                ..Default::default()
            })
        }
        ParsedSnapshot::Valid { snapshot, rejected } => {
            if rejected > 0 {
                warn!(rejected, "Dropped records that did not decode");
            }
            let mut report = hydrate(cache, &snapshot, config)?;
            report.rejected = rejected;
            Ok(report)
        }
    }
}

/// Hydrates from JSON text. Text that is not JSON counts as malformed.
pub fn hydrate_json<C>(cache: &C, json: &str, config: &HydrationConfig) -> Result<HydrationReport>
where
    C: QueryCache + ?Sized,
{
    match serde_json::from_str::<Value>(json) {
        Ok(value) => hydrate_value(cache, &value, config),
        Err(e) => {
            warn!(error = %e, "Ignoring snapshot that is not JSON");
            Ok(HydrationReport {
                malformed: true,
                ..Default::default()
            })
        }
    }
}
