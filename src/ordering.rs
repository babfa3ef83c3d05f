// src/ordering.rs
use thiserror::Error;

/// A record that lives in a dense, zero-based order among its siblings.
pub trait Ordered {
    fn id(&self) -> i64;
    fn order_index(&self) -> i64;
    fn set_order_index(&mut self, index: i64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderUpdate {
    pub id: i64,
    pub order_index: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("Position {index} is out of range for {len} item(s)")]
    IndexOutOfRange { index: usize, len: usize },
}

fn check_index(index: usize, len: usize) -> Result<(), OrderError> {
    if index >= len {
        Err(OrderError::IndexOutOfRange { index, len })
    } else {
        Ok(())
    }
}

/// Assigns order indices 0..N-1 by position.
pub fn reindex<T: Ordered>(items: &mut [T]) {
    for (i, item) in items.iter_mut().enumerate() {
        item.set_order_index(i64::try_from(i).unwrap_or(i64::MAX));
    }
}

/// Moves the item at `from` to `to`, shifting the ones in between, then reindexes.
/// # Errors
/// Returns `OrderError::IndexOutOfRange` if either position is past the end.
pub fn reorder<T: Ordered + Clone>(
    items: &[T],
    from: usize,
    to: usize,
) -> Result<Vec<T>, OrderError> {
    check_index(from, items.len())?;
    check_index(to, items.len())?;
    let mut moved = items.to_vec();
    let item = moved.remove(from);
    moved.insert(to, item);
    reindex(&mut moved);
    Ok(moved)
}

/// Swaps the item at `index` with the one after it, then reindexes.
/// # Errors
/// Returns `OrderError::IndexOutOfRange` if `index` is the last position or beyond.
pub fn swap_adjacent<T: Ordered + Clone>(items: &[T], index: usize) -> Result<Vec<T>, OrderError> {
    check_index(index.saturating_add(1), items.len())?;
    let mut swapped = items.to_vec();
    swapped.swap(index, index + 1);
    reindex(&mut swapped);
    Ok(swapped)
}

pub fn order_updates<T: Ordered>(items: &[T]) -> Vec<OrderUpdate> {
    items
        .iter()
        .map(|item| OrderUpdate {
            id: item.id(),
            order_index: item.order_index(),
        })
        .collect()
}

/// True when order indices are exactly 0..N-1 in sequence.
pub fn is_dense<T: Ordered>(items: &[T]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(i, item)| i64::try_from(i).is_ok_and(|i| i == item.order_index()))
}

/// Local state for an optimistic write: `current` is shown immediately,
/// `last_good` is what gets restored if the write fails.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimistic<T: Clone> {
    last_good: T,
    current: T,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(value: T) -> Self {
        Self {
            last_good: value.clone(),
            current: value,
        }
    }

    pub const fn current(&self) -> &T {
        &self.current
    }

    /// Replaces the current value with `f(current)`. `last_good` is untouched.
    /// # Errors
    /// Propagates the error from `f`, leaving `current` unchanged.
    pub fn apply<E>(&mut self, f: impl FnOnce(&T) -> Result<T, E>) -> Result<&T, E> {
        self.current = f(&self.current)?;
        Ok(&self.current)
    }

    /// The write succeeded.
    pub fn commit(&mut self) {
        self.last_good = self.current.clone();
    }

    /// The write failed; show the last known-good value again.
    pub fn rollback(&mut self) {
        self.current = self.last_good.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        order_index: i64,
    }

    impl Ordered for Row {
        fn id(&self) -> i64 {
            self.id
        }
        fn order_index(&self) -> i64 {
            self.order_index
        }
        fn set_order_index(&mut self, index: i64) {
            self.order_index = index;
        }
    }

    fn rows(ids: &[i64]) -> Vec<Row> {
        ids.iter()
            .enumerate()
            .map(|(i, &id)| Row {
                id,
                order_index: i as i64,
            })
            .collect()
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn reorder_moves_forward_and_back() {
        let items = rows(&[10, 20, 30, 40]);
        let moved = reorder(&items, 0, 2).unwrap();
        assert_eq!(ids(&moved), vec![20, 30, 10, 40]);
        assert!(is_dense(&moved));

        let moved = reorder(&items, 3, 1).unwrap();
        assert_eq!(ids(&moved), vec![10, 40, 20, 30]);
        assert!(is_dense(&moved));
    }

    #[test]
    fn swap_adjacent_rejects_last_position() {
        let items = rows(&[1, 2, 3]);
        let swapped = swap_adjacent(&items, 1).unwrap();
        assert_eq!(ids(&swapped), vec![1, 3, 2]);
        assert_eq!(
            swap_adjacent(&items, 2),
            Err(OrderError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn reorder_out_of_range() {
        let items = rows(&[1, 2]);
        assert!(reorder(&items, 0, 5).is_err());
        assert!(reorder(&items, 2, 0).is_err());
    }

    #[test]
    fn optimistic_rollback_restores_previous_sequence() {
        let mut state = Optimistic::new(rows(&[1, 2, 3]));
        state.apply(|items| reorder(items, 2, 0)).unwrap();
        assert_eq!(ids(state.current()), vec![3, 1, 2]);
        state.rollback();
        assert_eq!(state.current(), &rows(&[1, 2, 3]));

        state.apply(|items| swap_adjacent(items, 0)).unwrap();
        state.commit();
        state.rollback();
        assert_eq!(ids(state.current()), vec![2, 1, 3]);
    }
}
