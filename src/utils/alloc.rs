// src/utils/alloc.rs
//! Fallible allocation for buffers whose size comes from untrusted headers.

use crate::utils::error::{FriedError, Result};

/// Default working-memory budget for one decode (1 GiB).
pub const DEFAULT_MAX_MEMORY: usize = 1 << 30;

/// Allocates `count` default-valued elements, returning an error instead of
/// aborting when the allocator refuses.
pub fn try_alloc_vec<T: Default + Clone>(count: usize, context: &'static str) -> Result<Vec<T>> {
    let bytes = count
        .checked_mul(std::mem::size_of::<T>())
        .ok_or(FriedError::AllocationFailed { bytes: usize::MAX, context })?;
    let mut v = Vec::new();
    v.try_reserve_exact(count)
        .map_err(|_| FriedError::AllocationFailed { bytes, context })?;
    v.resize(count, T::default());
    Ok(v)
}

/// Adds up buffer sizes in bytes and checks the total against a limit.
#[derive(Debug, Clone)]
pub struct MemoryBudget {
    total: usize,
    limit: usize,
}

impl MemoryBudget {
    pub fn new(limit: usize) -> Self {
        Self { total: 0, limit }
    }

    /// Accounts for `count` elements of `T`; saturates instead of wrapping.
    pub fn add<T>(&mut self, count: usize) -> &mut Self {
        let bytes = count.saturating_mul(std::mem::size_of::<T>());
        self.total = self.total.saturating_add(bytes);
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn check(&self) -> Result<()> {
        if self.total > self.limit {
            return Err(FriedError::ImageTooLarge { bytes: self.total, limit: self.limit });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_alloc_vec() {
        let v: Vec<i16> = try_alloc_vec(100, "test").unwrap();
        assert_eq!(v.len(), 100);
        assert!(v.iter().all(|&x| x == 0));
    }

    #[test]
    fn test_impossible_allocation_is_an_error() {
        let result = try_alloc_vec::<u64>(usize::MAX / 4, "huge");
        assert!(matches!(result, Err(FriedError::AllocationFailed { context: "huge", .. })));
    }

    #[test]
    fn test_budget() {
        let mut budget = MemoryBudget::new(1000);
        budget.add::<i16>(300).add::<u8>(400);
        assert_eq!(budget.total(), 1000);
        assert!(budget.check().is_ok());

        budget.add::<u8>(1);
        assert!(matches!(budget.check(), Err(FriedError::ImageTooLarge { bytes: 1001, limit: 1000 })));

        budget.add::<u64>(usize::MAX);
        assert_eq!(budget.total(), usize::MAX);
    }
}
