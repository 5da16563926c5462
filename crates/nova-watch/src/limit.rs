use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Outcome of asking the governor to emit one more record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Emit the record.
    Emit,
    /// First emission past the limit: emit the end sentinel and abort the session.
    Trip,
    /// Already tripped; drop silently.
    Refuse,
}

/// Counts emitted records against the session's invocation limit.
///
/// The counter never exceeds the limit and the limit is crossed at most once.
#[derive(Debug)]
pub struct LimitGovernor {
    limit: u64,
    emitted: AtomicU64,
    tripped: AtomicBool,
}

impl LimitGovernor {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            emitted: AtomicU64::new(0),
            tripped: AtomicBool::new(false),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn admit(&self) -> Admission {
        if self.tripped.load(Ordering::Acquire) {
            return Admission::Refuse;
        }
        let admitted = self
            .emitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok();
        if admitted {
            return Admission::Emit;
        }
        if self.tripped.swap(true, Ordering::AcqRel) {
            Admission::Refuse
        } else {
            Admission::Trip
        }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Acquire)
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}
