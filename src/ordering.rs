//! Manual ordering.
//!
//! Positions are plain integers picked by the caller. Ties and gaps are legal;
//! the only thing the board guarantees is where a task without an explicit
//! position lands (after everything else) and how positions sort.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::PositionUpdate;

/// Position for a new record created without one: one past the current
/// maximum, or 1 when nothing is ordered yet. Saturates at `i64::MAX`, where
/// the new row ties with the current last one.
pub fn next_position<I>(existing: I) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    max_position(existing).unwrap_or(0).saturating_add(1)
}

pub fn max_position<I>(existing: I) -> Option<i64>
where
    I: IntoIterator<Item = Option<i64>>,
{
    existing.into_iter().flatten().max()
}

/// Position order: ordered rows ascending, unordered rows last, id breaks ties.
pub fn by_position(a: (Option<i64>, u64), b: (Option<i64>, u64)) -> Ordering {
    match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(a.1.cmp(&b.1))
}

/// Collapse a reorder batch so each id appears once with its last requested
/// position, keeping first-seen order.
pub fn dedup_batch(items: &[PositionUpdate]) -> Vec<PositionUpdate> {
    let mut out: Vec<PositionUpdate> = Vec::with_capacity(items.len());
    let mut slots: HashMap<u64, usize> = HashMap::with_capacity(items.len());
    for item in items {
        match slots.get(&item.id) {
            Some(&slot) => out[slot].position = item.position,
            None => {
                slots.insert(item.id, out.len());
                out.push(*item);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_position_is_one() {
        assert_eq!(next_position(Vec::<Option<i64>>::new()), 1);
        assert_eq!(next_position(vec![None::<i64>, None]), 1);
    }

    #[test]
    fn next_position_follows_max() {
        assert_eq!(next_position(vec![Some(3), None, Some(7), Some(2)]), 8);
        assert_eq!(next_position(vec![Some(-4)]), -3);
    }

    #[test]
    fn next_position_saturates_at_max() {
        assert_eq!(next_position(vec![Some(i64::MAX), Some(2)]), i64::MAX);
    }

    #[test]
    fn unordered_sort_last() {
        let mut rows = vec![(None, 1), (Some(5), 2), (Some(1), 3), (None, 4), (Some(1), 0)];
        rows.sort_by(|a, b| by_position(*a, *b));
        assert_eq!(rows, vec![(Some(1), 0), (Some(1), 3), (Some(5), 2), (None, 1), (None, 4)]);
    }

    #[test]
    fn batch_keeps_last_position_per_id() {
        let items = [
            PositionUpdate { id: 1, position: Some(3) },
            PositionUpdate { id: 2, position: Some(1) },
            PositionUpdate { id: 1, position: None },
        ];
        let merged = dedup_batch(&items);
        assert_eq!(
            merged,
            vec![
                PositionUpdate { id: 1, position: None },
                PositionUpdate { id: 2, position: Some(1) },
            ]
        );
    }

    #[test]
    fn large_batch_dedups_in_first_seen_order() {
        let items: Vec<PositionUpdate> = (0..10_000u64)
            .map(|i| PositionUpdate { id: i % 100, position: Some(i as i64) })
            .collect();
        let merged = dedup_batch(&items);
        assert_eq!(merged.len(), 100);
        assert_eq!(merged[0], PositionUpdate { id: 0, position: Some(9_900) });
        assert_eq!(merged[99], PositionUpdate { id: 99, position: Some(9_999) });
    }
}
