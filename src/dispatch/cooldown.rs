use anyhow::Result;
use uuid::Uuid;

use crate::db::Database;

/// Keyed `resident id -> last notified` timestamps backing the
/// notification cooldown.
///
/// Mutated only by the dispatcher's decision table. Backed by its own
/// table rather than process memory so cooldown correctness does not
/// depend on process lifetime or instance count; each operation touches
/// a single row, so concurrent per-resident evaluations within one
/// dispatch cannot lose updates to distinct keys.
#[derive(Clone)]
pub struct CooldownTracker {
    db: Database,
}

impl CooldownTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Millisecond timestamp of the resident's last notification, if a
    /// cooldown entry exists.
    pub fn last_notified(&self, resident_id: Uuid) -> Result<Option<i64>> {
        self.db.get_cooldown(resident_id)
    }

    pub fn mark_notified(&self, resident_id: Uuid, at_ms: i64) -> Result<()> {
        self.db.set_cooldown(resident_id, at_ms)
    }

    /// Drop the entry once the collector leaves range, so the next
    /// approach notifies immediately.
    pub fn reset(&self, resident_id: Uuid) -> Result<bool> {
        self.db.clear_cooldown(resident_id)
    }
}
