//! One-time normalization of legacy enum spellings in persisted assets.
//!
//! Runs over the raw JSON at load time, before typed decoding, so records
//! written by older versions still round-trip through the closed enums in
//! [`crate::types`]. Idempotent: a second pass reports zero changes.

use serde_json::Value;
use tracing::debug;

/// Legacy → current status spellings.
pub const STATUS_ALIASES: &[(&str, &str)] = &[("Assigned", "In Use"), ("Maintenance", "Resign")];

/// Legacy → current department codes.
pub const DEPARTMENT_ALIASES: &[(&str, &str)] = &[("OMD", "OD"), ("PUR", "PU")];

/// Rewrite legacy spellings in a raw asset array.
///
/// Returns the number of records that changed. Non-array input and non-object
/// elements are left untouched.
pub fn normalize_assets(raw: &mut Value) -> usize {
    let Some(records) = raw.as_array_mut() else {
        return 0;
    };

    let mut changed = 0;
    for record in records {
        let Some(object) = record.as_object_mut() else {
            continue;
        };

        let mut touched = false;
        if let Some(status) = object.get_mut("status") {
            touched |= rewrite_alias(status, STATUS_ALIASES);
        }
        if let Some(department) = object.get_mut("department") {
            touched |= rewrite_alias(department, DEPARTMENT_ALIASES);
        }

        if touched {
            changed += 1;
        }
    }

    if changed > 0 {
        debug!(changed, "normalized legacy asset spellings");
    }
    changed
}

/// Replace a string value if it matches a legacy alias. Returns true if the
/// value was rewritten.
fn rewrite_alias(value: &mut Value, aliases: &[(&str, &str)]) -> bool {
    let Some(current) = value.as_str() else {
        return false;
    };

    for (legacy, replacement) in aliases {
        if current == *legacy {
            *value = Value::String((*replacement).to_string());
            return true;
        }
    }
    false
}
