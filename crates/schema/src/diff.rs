//! Locating the first point where two trees differ.
//!
//! Equality itself is plain `PartialEq`; these functions only answer
//! "where". Both walk depth first and report the first divergence in
//! declaration order.

use crate::error::Path;
use crate::model::Value;
use crate::node::Raw;

/// Location of the first difference between two trees.
pub type DivergencePath = Path;

/// First divergence between two parse results, or `None` when equal.
pub fn diff(a: Option<&Value>, b: Option<&Value>) -> Option<DivergencePath> {
    diff_at(a, b, Path::root())
}

fn diff_at(a: Option<&Value>, b: Option<&Value>, path: Path) -> Option<Path> {
    match (a, b) {
        (None, None) => None,
        (Some(Value::List(x)), Some(Value::List(y))) => {
            let len = x.len().max(y.len());
            (0..len).find_map(|i| {
                let left = x.get(i).and_then(Option::as_ref);
                let right = y.get(i).and_then(Option::as_ref);
                diff_at(left, right, path.index(i))
            })
        }
        (Some(Value::Map(x)), Some(Value::Map(y))) => x
            .keys()
            .chain(y.keys().filter(|k| !x.contains_key(*k)))
            .find_map(|k| diff_at(x.get(k), y.get(k), path.key(k))),
        (Some(Value::Model(x)), Some(Value::Model(y))) => {
            if !x.is(y.model_type()) {
                return Some(path);
            }
            x.fields()
                .zip(y.fields())
                .find_map(|((name, left), (_, right))| diff_at(left, right, path.key(name)))
        }
        (Some(x), Some(y)) if x == y => None,
        _ => Some(path),
    }
}

/// First divergence between two raw trees. Mappings must also agree on key
/// order, so a round trip that reorders keys is reported at the first key
/// out of place.
pub fn diff_raw(a: &Raw, b: &Raw) -> Option<DivergencePath> {
    diff_raw_at(a, b, Path::root())
}

fn diff_raw_at(a: &Raw, b: &Raw, path: Path) -> Option<Path> {
    match (a, b) {
        (Raw::Object(x), Raw::Object(y)) => {
            let mut left = x.iter();
            let mut right = y.iter();
            loop {
                match (left.next(), right.next()) {
                    (None, None) => return None,
                    (Some((k, v)), Some((k2, v2))) if k == k2 => {
                        if let Some(found) = diff_raw_at(v, v2, path.key(k)) {
                            return Some(found);
                        }
                    }
                    (Some((k, _)), _) | (None, Some((k, _))) => return Some(path.key(k)),
                }
            }
        }
        (Raw::Array(x), Raw::Array(y)) => {
            let len = x.len().max(y.len());
            (0..len).find_map(|i| match (x.get(i), y.get(i)) {
                (Some(l), Some(r)) => diff_raw_at(l, r, path.index(i)),
                _ => Some(path.index(i)),
            })
        }
        _ if a == b => None,
        _ => Some(path),
    }
}
