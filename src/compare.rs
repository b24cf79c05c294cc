//! Structural comparison of metadata records under a field policy.
//!
//! A verdict hinges on `compare`: the ordered list of fields whose values
//! differ between a stored expectation and a fresh parser run. The policy
//! decides which top-level fields participate and which sequence fields are
//! compared as multisets instead of in order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::model::{FieldDiff, MetadataRecord};

/// Fields whose values are inherently non-reproducible across runs. Excluded
/// from comparison unless a caller overrides the exclusion list.
pub const DEFAULT_EXCLUDED_FIELDS: [&str; 3] = ["debug", "inputfilename", "timestamp"];

/// Which fields participate in comparison and how sequences are compared.
///
/// Empty `include` means every field except the excluded ones. `exclude`
/// always wins over `include`. Fields named in `unordered` have their
/// sequences compared as multisets, the flag holding through that field's
/// whole subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
    pub unordered: BTreeSet<String>,
}

impl FieldPolicy {
    #[must_use]
    pub fn from_lists(include: &[String], exclude: &[String], unordered: &[String]) -> Self {
        fn clean(list: &[String]) -> BTreeSet<String> {
            list.iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        }
        Self {
            include: clean(include),
            exclude: clean(exclude),
            unordered: clean(unordered),
        }
    }

    /// The process default: empty include, the non-reproducible fields
    /// excluded, everything order-sensitive.
    #[must_use]
    pub fn with_default_exclusions() -> Self {
        Self {
            include: BTreeSet::new(),
            exclude: DEFAULT_EXCLUDED_FIELDS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            unordered: BTreeSet::new(),
        }
    }

    /// Whether a field participates in comparison under this policy.
    #[must_use]
    pub fn selects(&self, field: &str) -> bool {
        !self.exclude.contains(field) && (self.include.is_empty() || self.include.contains(field))
    }

    #[must_use]
    pub fn is_unordered(&self, field: &str) -> bool {
        self.unordered.contains(field)
    }
}

/// Compare two metadata records under `policy`.
///
/// Walks the union of both field-name sets in sorted order, so the returned
/// diff sequence is deterministic for a given pair of records. The result is
/// empty iff the records are equivalent under the policy; an empty record
/// on either side still goes through the full walk, so an intentionally
/// empty expectation passes against empty output.
#[must_use]
pub fn compare(
    expected: &MetadataRecord,
    actual: &MetadataRecord,
    policy: &FieldPolicy,
) -> Vec<FieldDiff> {
    let mut names: BTreeSet<&str> = expected.keys().map(String::as_str).collect();
    names.extend(actual.keys().map(String::as_str));

    let mut diffs = Vec::new();
    for name in names {
        if !policy.selects(name) {
            continue;
        }
        match (expected.get(name), actual.get(name)) {
            (Some(e), Some(a)) => {
                if !values_equal(e, a, policy.is_unordered(name)) {
                    diffs.push(FieldDiff {
                        field: name.to_owned(),
                        expected: Some(e.clone()),
                        actual: Some(a.clone()),
                    });
                }
            }
            (Some(e), None) => diffs.push(FieldDiff {
                field: name.to_owned(),
                expected: Some(e.clone()),
                actual: None,
            }),
            (None, Some(a)) => diffs.push(FieldDiff {
                field: name.to_owned(),
                expected: None,
                actual: Some(a.clone()),
            }),
            (None, None) => {}
        }
    }
    diffs
}

/// Structural equality over the full JSON value space.
#[must_use]
pub fn values_equal(expected: &Value, actual: &Value, unordered: bool) -> bool {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => {
            e.len() == a.len()
                && e.iter()
                    .all(|(k, ev)| a.get(k).is_some_and(|av| values_equal(ev, av, unordered)))
        }
        (Value::Array(e), Value::Array(a)) => {
            if e.len() != a.len() {
                return false;
            }
            if unordered {
                multiset_equal(e, a)
            } else {
                e.iter().zip(a).all(|(ev, av)| values_equal(ev, av, unordered))
            }
        }
        _ => scalar_equal(expected, actual),
    }
}

/// Scalar equality after representation normalization: integer forms compare
/// exactly, `80` matches `80.0` across the integer/float split, and a string
/// equal to a number's canonical rendering equals that number ("80" == 80,
/// "080" != 80).
fn scalar_equal(expected: &Value, actual: &Value) -> bool {
    if expected == actual {
        return true;
    }
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) => numbers_equal(e, a),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s == &n.to_string()
        }
        _ => false,
    }
}

/// Integer pairs compare exactly; `as_f64` bridges only pairs with a float
/// side, so adjacent 64-bit values (hashes, addresses) never collapse.
fn numbers_equal(expected: &Number, actual: &Number) -> bool {
    if let (Some(e), Some(a)) = (expected.as_u64(), actual.as_u64()) {
        e == a
    } else if let (Some(e), Some(a)) = (expected.as_i64(), actual.as_i64()) {
        e == a
    } else if expected.is_f64() || actual.is_f64() {
        match (expected.as_f64(), actual.as_f64()) {
            (Some(e), Some(a)) => e == a,
            _ => false,
        }
    } else {
        // Opposite-sign extremes: one side only fits u64, the other is
        // negative.
        false
    }
}

/// Order-insensitive sequence equality: every expected element consumes the
/// first remaining actual element it matches under full normalization, so
/// mixed scalar renderings pair up across sides and duplicate counts hold.
fn multiset_equal(expected: &[Value], actual: &[Value]) -> bool {
    let mut remaining: Vec<&Value> = actual.iter().collect();
    for item in expected {
        let Some(found) = remaining.iter().position(|cand| values_equal(item, cand, true))
        else {
            return false;
        };
        remaining.swap_remove(found);
    }
    remaining.is_empty()
}
