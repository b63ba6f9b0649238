//! Constants shared by producers and consumers of snapshots.

// ═══════════════════════════════════════════════════════════════════════════════
// RETENTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Default retention duration for an idle query, in milliseconds (5 minutes).
///
/// Records only carry a `cacheTime` override when a query's retention differs
/// from the default both sides agreed on.
pub const DEFAULT_CACHE_TIME_MS: u64 = 5 * 60 * 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Field name of the record list in the wire format.
pub const RECORDS_FIELD: &str = "records";

/// Legacy field name accepted in place of [`RECORDS_FIELD`].
pub const LEGACY_RECORDS_FIELD: &str = "queries";
