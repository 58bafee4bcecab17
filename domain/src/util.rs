//! Small shared helpers

use chrono::TimeDelta;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// All guarded collections in this crate are left consistent between
/// statements, so a poisoned lock still protects valid data.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Format a duration as "H hours, M minutes"
///
/// # Example
///
/// ```
/// use chrono::TimeDelta;
/// use kindergarten_domain::util::format_hours_minutes;
///
/// assert_eq!(format_hours_minutes(TimeDelta::minutes(150)), "2 hours, 30 minutes");
/// ```
pub fn format_hours_minutes(duration: TimeDelta) -> String {
    format!(
        "{} hours, {} minutes",
        duration.num_hours(),
        duration.num_minutes() % 60
    )
}

/// Whole minutes left until a deadline, never negative.
pub fn whole_minutes(duration: TimeDelta) -> i64 {
    duration.num_minutes().max(0)
}
