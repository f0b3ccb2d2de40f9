//! Compatibility-version validation and normalization.
//!
//! Requested versions collapse onto a small, ordered table of equivalence
//! classes. Two requests that normalize to the same class get identical
//! adapter behavior, which is what lets the registry share instances.

use modelwrap_types::CompatibilityVersion;

use crate::error::AdapterError;

/// Oldest behavior this adapter family implements.
pub const V2_3_0: CompatibilityVersion = CompatibilityVersion::new(2, 3, 0);

/// First version whose behavior differs from `2.3.0`.
pub const V2_3_21: CompatibilityVersion = CompatibilityVersion::new(2, 3, 21);

/// Newest version a caller may request.
pub const CURRENT_VERSION: CompatibilityVersion = CompatibilityVersion::new(2, 3, 23);

/// Equivalence classes, ascending. Each entry is the lowest version of its class.
pub const EQUIVALENCE_CLASSES: [CompatibilityVersion; 2] = [V2_3_0, V2_3_21];

/// Number of registry slots, one per equivalence class.
pub const CLASS_COUNT: usize = EQUIVALENCE_CLASSES.len();

/// Rejects versions outside `[2.3.0, CURRENT_VERSION]`.
pub fn check_version(requested: CompatibilityVersion) -> Result<(), AdapterError> {
    if requested < V2_3_0 {
        return Err(AdapterError::rejected(format!(
            "compatibility version {requested} is older than the oldest supported version {V2_3_0}"
        )));
    }
    if requested > CURRENT_VERSION {
        return Err(AdapterError::rejected(format!(
            "compatibility version {requested} is newer than the current version {CURRENT_VERSION}"
        )));
    }
    Ok(())
}

/// Maps `requested` to the lowest behaviorally equivalent version.
///
/// Idempotent: normalizing a class version returns it unchanged.
///
/// Run [`check_version`] first. For a version it accepted this never fails;
/// an [`AdapterError::InvariantViolation`] here is a bug in the caller, not a
/// condition to recover from or retry.
pub fn normalize(requested: CompatibilityVersion) -> Result<CompatibilityVersion, AdapterError> {
    EQUIVALENCE_CLASSES
        .iter()
        .rev()
        .find(|class| **class <= requested)
        .copied()
        .ok_or_else(|| AdapterError::invariant(format!("compatibility version {requested} matches no equivalence class")))
}

/// Registry slot for an already normalized version.
pub fn slot_index(normalized: CompatibilityVersion) -> Result<usize, AdapterError> {
    EQUIVALENCE_CLASSES
        .iter()
        .position(|class| *class == normalized)
        .ok_or_else(|| AdapterError::invariant(format!("{normalized} is not a normalized compatibility version")))
}
