//! "At most one flagged row per owner" bookkeeping shared by the address
//! book, the shop roster and the subscription ledger.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait ExclusiveFlag {
    fn key(&self) -> Uuid;
    fn flagged(&self) -> bool;
    fn set_flagged(&mut self, on: bool, now: DateTime<Utc>);
}

/// Raises the flag on `target` and lowers it on every other row.
/// Returns the keys of the rows that actually changed.
pub fn raise_exclusive<T: ExclusiveFlag>(rows: &mut [T], target: Uuid, now: DateTime<Utc>) -> Vec<Uuid> {
    let mut changed = Vec::new();
    for row in rows.iter_mut() {
        let wanted = row.key() == target;
        if row.flagged() != wanted {
            row.set_flagged(wanted, now);
            changed.push(row.key());
        }
    }
    changed
}

/// Lowered flags first: a partial unique index must never observe two raised
/// rows between statements of the same transaction.
pub fn sort_for_write<T: ExclusiveFlag>(rows: &mut [T]) {
    rows.sort_by_key(|r| r.flagged());
}
