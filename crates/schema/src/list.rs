//! Normalization of sparse lists.
//!
//! The two operations are not interchangeable. [`prune`] treats `None` as
//! "this slot holds its default" and only drops the trailing run, so every
//! surviving element keeps its index. [`compact`] treats `None` as "this
//! element was deleted" and closes every gap.

/// Removes the trailing run of `None` entries. Interior `None`s are kept.
pub fn prune<T>(items: &mut Vec<Option<T>>) {
    let keep = items.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    items.truncate(keep);
}

/// Removes every `None`, shifting the remaining entries left in order.
pub fn compact<T>(items: &mut Vec<Option<T>>) {
    items.retain(Option::is_some);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_drops_only_the_trailing_run() {
        let mut items = vec![Some(1), None, Some(3), None, None];
        prune(&mut items);
        assert_eq!(items, vec![Some(1), None, Some(3)]);
    }

    #[test]
    fn prune_is_idempotent() {
        let mut items = vec![None, Some(2), None];
        prune(&mut items);
        let once = items.clone();
        prune(&mut items);
        assert_eq!(items, once);
        assert_eq!(items, vec![None, Some(2)]);
    }

    #[test]
    fn prune_all_none_yields_empty() {
        let mut items: Vec<Option<u8>> = vec![None, None];
        prune(&mut items);
        assert!(items.is_empty());
    }

    #[test]
    fn compact_closes_interior_gaps() {
        let mut items = vec![None, Some('a'), None, Some('b'), None];
        compact(&mut items);
        assert_eq!(items, vec![Some('a'), Some('b')]);
    }

    #[test]
    fn compact_and_prune_differ_on_interior_none() {
        let mut pruned = vec![Some(1), None, Some(2)];
        let mut compacted = pruned.clone();
        prune(&mut pruned);
        compact(&mut compacted);
        assert_eq!(pruned.len(), 3);
        assert_eq!(compacted.len(), 2);
    }
}
