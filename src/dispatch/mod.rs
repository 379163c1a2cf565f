//! Proximity notification engine.
//!
//! Reacts to collector location writes: computes the distance to every
//! resident with a known location, and per resident either notifies,
//! suppresses (cooldown), resets the cooldown, or does nothing.

mod cooldown;

pub use cooldown::CooldownTracker;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::db::Database;
use crate::delivery::{PushMessage, PushSink};
use crate::geo::haversine_distance_m;
use crate::models::CollectorLocationEvent;

/// Fixed body of the nearby push notification.
const PUSH_BODY: &str =
    "Your garbage collector is within 50 meters. Please prepare your garbage.";

/// Tunables for the proximity scan. Production uses the defaults; tests
/// override them through [`ProximityDispatcher::new`].
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Notification range in meters.
    pub radius_m: f64,
    /// Minimum gap between notifications to the same resident while the
    /// collector stays in range.
    pub cooldown: Duration,
    /// Narrow the scan to one username, for targeted test/debug runs.
    pub target_username: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            radius_m: 50.0,
            cooldown: Duration::from_secs(5 * 60),
            target_username: None,
        }
    }
}

/// Per-invocation outcome counts, for logging and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Residents whose distance was computed (eligible: location and
    /// push token on file).
    pub evaluated: usize,
    pub notified: usize,
    pub suppressed: usize,
    pub cooldowns_reset: usize,
}

/// Decides, per resident, whether a collector location write warrants a
/// push notification.
///
/// Delivery failures are per-resident: they are logged and never abort
/// the rest of the batch, and a failed send still counts against the
/// cooldown (at-most-one send wins over guaranteed delivery).
pub struct ProximityDispatcher {
    db: Database,
    cooldowns: CooldownTracker,
    push: Arc<dyn PushSink>,
    config: DispatchConfig,
}

impl ProximityDispatcher {
    pub fn new(
        db: Database,
        cooldowns: CooldownTracker,
        push: Arc<dyn PushSink>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            db,
            cooldowns,
            push,
            config,
        }
    }

    /// Handle one collector location write.
    ///
    /// Returns only after every push send and record write of this
    /// invocation has resolved, success or failure.
    pub async fn handle_location_write(
        &self,
        event: CollectorLocationEvent,
    ) -> Result<DispatchSummary> {
        let mut summary = DispatchSummary::default();

        let Some(after) = &event.after else {
            return Ok(summary);
        };
        let Some(collector_location) = after.location() else {
            tracing::debug!(
                collector_id = %event.collector_id,
                "location write without usable coordinates, skipping"
            );
            return Ok(summary);
        };
        if event.position_unchanged() {
            tracing::debug!(
                collector_id = %event.collector_id,
                "no location change, skipping scan"
            );
            return Ok(summary);
        }

        let collector_name = after.display_name().to_string();
        tracing::info!(
            collector_id = %event.collector_id,
            collector = %collector_name,
            latitude = collector_location.latitude,
            longitude = collector_location.longitude,
            "collector moved, scanning residents"
        );

        let residents = self
            .db
            .list_residents(self.config.target_username.as_deref())?;
        let now_ms = Utc::now().timestamp_millis();
        let cooldown_ms = self.config.cooldown.as_millis() as i64;
        let mut sends: JoinSet<()> = JoinSet::new();

        for resident in residents {
            let Some(resident_location) = resident.location() else {
                tracing::debug!(username = %resident.username, "skipping resident without location");
                continue;
            };
            let Some(token) = resident.push_token.clone() else {
                tracing::debug!(username = %resident.username, "skipping resident without push token");
                continue;
            };

            summary.evaluated += 1;
            let distance = haversine_distance_m(collector_location, resident_location);
            tracing::debug!(username = %resident.username, distance_m = distance, "evaluated resident");

            let last_notified = match self.cooldowns.last_notified(resident.id) {
                Ok(last) => last.unwrap_or(0),
                Err(err) => {
                    tracing::error!(username = %resident.username, error = %err, "cooldown lookup failed");
                    continue;
                }
            };
            let in_cooldown = now_ms - last_notified < cooldown_ms;

            if distance <= self.config.radius_m {
                if in_cooldown {
                    summary.suppressed += 1;
                    tracing::debug!(username = %resident.username, "still in cooldown, suppressing");
                    continue;
                }

                // Cooldown is claimed before the send and is not rolled
                // back on failure: a failed send still counts.
                if let Err(err) = self.cooldowns.mark_notified(resident.id, now_ms) {
                    tracing::error!(username = %resident.username, error = %err, "cooldown update failed");
                    continue;
                }
                summary.notified += 1;

                let message = PushMessage {
                    token,
                    title: format!("{collector_name} is nearby"),
                    body: PUSH_BODY.to_string(),
                };
                let push = Arc::clone(&self.push);
                let username = resident.username.clone();
                sends.spawn(async move {
                    match push.send(&message).await {
                        Ok(()) => tracing::info!(username = %username, "push sent"),
                        Err(err) => {
                            tracing::warn!(username = %username, error = %err, "push delivery failed")
                        }
                    }
                });

                // In-app history row, independent of push success.
                let db = self.db.clone();
                let resident_id = resident.id;
                let username = resident.username.clone();
                let record_message = format!("{collector_name} is nearby, please prepare your garbage.");
                sends.spawn(async move {
                    if let Err(err) =
                        db.insert_notification(resident_id, &username, &record_message)
                    {
                        tracing::error!(username = %username, error = %err, "notification record write failed");
                    }
                });
            } else if in_cooldown {
                // Collector left range; drop the entry so the next
                // approach notifies immediately.
                match self.cooldowns.reset(resident.id) {
                    Ok(_) => {
                        summary.cooldowns_reset += 1;
                        tracing::debug!(username = %resident.username, "out of range, cooldown reset");
                    }
                    Err(err) => {
                        tracing::error!(username = %resident.username, error = %err, "cooldown reset failed")
                    }
                }
            }
        }

        // Fan-in: the invocation completes only once every send/write
        // attempt has resolved.
        while let Some(joined) = sends.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "send task panicked");
            }
        }

        tracing::info!(
            collector_id = %event.collector_id,
            evaluated = summary.evaluated,
            notified = summary.notified,
            suppressed = summary.suppressed,
            cooldowns_reset = summary.cooldowns_reset,
            "scan complete"
        );
        Ok(summary)
    }
}
