//! Busy tracking
//!
//! A [`BusyCounter`] counts outstanding operations of one kind and hands out
//! RAII [`BusyGuard`]s. The `on_change` callback fires with `true` when the
//! count leaves zero and with `false` when it returns to zero, under the
//! counter's lock, so a flag mirrored from it can never be left set by an
//! operation that failed, returned early, or had its future dropped.

use parking_lot::Mutex;

/// Counts outstanding operations of one kind
#[derive(Debug, Default)]
pub struct BusyCounter {
    count: Mutex<usize>,
}

impl BusyCounter {
    /// Create an idle counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any operation is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        *self.count.lock() > 0
    }

    /// Number of outstanding operations
    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self.count.lock()
    }

    /// Start an operation unconditionally
    pub fn enter<F: Fn(bool)>(&self, on_change: F) -> BusyGuard<'_, F> {
        let mut count = self.count.lock();
        *count += 1;
        if *count == 1 {
            on_change(true);
        }
        BusyGuard {
            counter: self,
            on_change,
        }
    }

    /// Start an operation only if none is outstanding
    pub fn try_enter<F: Fn(bool)>(&self, on_change: F) -> Option<BusyGuard<'_, F>> {
        let mut count = self.count.lock();
        if *count > 0 {
            return None;
        }
        *count = 1;
        on_change(true);
        Some(BusyGuard {
            counter: self,
            on_change,
        })
    }
}

/// Marks one outstanding operation; dropping it ends the operation
pub struct BusyGuard<'a, F: Fn(bool)> {
    counter: &'a BusyCounter,
    on_change: F,
}

impl<F: Fn(bool)> Drop for BusyGuard<'_, F> {
    fn drop(&mut self) {
        let mut count = self.counter.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            (self.on_change)(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_single_operation_toggles_once() {
        let counter = BusyCounter::new();
        let changes = RefCell::new(Vec::new());

        {
            let _guard = counter.enter(|busy| changes.borrow_mut().push(busy));
            assert!(counter.is_busy());
        }

        assert!(!counter.is_busy());
        assert_eq!(*changes.borrow(), vec![true, false]);
    }

    #[test]
    fn test_overlapping_operations_clear_on_last() {
        let counter = BusyCounter::new();
        let changes = RefCell::new(Vec::new());
        let record = |busy: bool| changes.borrow_mut().push(busy);

        let first = counter.enter(record);
        let second = counter.enter(record);
        assert_eq!(counter.outstanding(), 2);

        drop(first);
        assert!(counter.is_busy());
        drop(second);
        assert!(!counter.is_busy());

        assert_eq!(*changes.borrow(), vec![true, false]);
    }

    #[test]
    fn test_try_enter_refuses_while_busy() {
        let counter = BusyCounter::new();
        let guard = counter.try_enter(|_| {});
        assert!(guard.is_some());
        assert!(counter.try_enter(|_| {}).is_none());
        drop(guard);
        assert!(counter.try_enter(|_| {}).is_some());
    }
}
