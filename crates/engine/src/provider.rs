// ============================
// crates/engine/src/provider.rs
// ============================
//! Injectable external collaborators: time source and uuid generation.
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Time source for windowed ledger queries and purge cutoffs.
///
/// Injectable so tests can pin "now" and get deterministic window counts.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to an explicit instant, movable by hand.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.write();
        *now += Duration::seconds(secs);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Supplier of client-generated unique identifiers for new users.
pub trait UuidSource: Send + Sync {
    fn next_uuid(&self) -> String;
}

/// Random v4 uuids.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUuidSource;

impl UuidSource for RandomUuidSource {
    fn next_uuid(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
