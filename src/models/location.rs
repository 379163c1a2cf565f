use serde::{Deserialize, Serialize};

/// A point on the Earth's surface. Both coordinates must be finite;
/// entities with a missing or non-finite coordinate are excluded from
/// distance computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Raw field snapshot of a collector document, as carried by the
/// document-change feed. Every field is optional: a write may touch a
/// document that never had a location, and older documents identify the
/// collector by truck number instead of name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorSnapshot {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: Option<String>,
    pub truck_number: Option<String>,
}

impl CollectorSnapshot {
    /// The snapshot's location, if both coordinates are present and finite.
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                let point = GeoPoint::new(lat, lon);
                point.is_valid().then_some(point)
            }
            _ => None,
        }
    }

    /// Display name resolution: `name`, else `truck_number`, else a
    /// generic fallback.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.truck_number.as_deref())
            .unwrap_or("Collector")
    }
}

/// One collector location write: before/after snapshots keyed by
/// collector identity. Ephemeral; constructed per invocation from the
/// change feed and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorLocationEvent {
    pub collector_id: String,
    #[serde(default)]
    pub before: Option<CollectorSnapshot>,
    #[serde(default)]
    pub after: Option<CollectorSnapshot>,
}

impl CollectorLocationEvent {
    /// True when the write did not change the collector's position.
    /// Exact equality is intentional: it suppresses redundant scans on
    /// writes that only touched other fields.
    pub fn position_unchanged(&self) -> bool {
        match (&self.before, &self.after) {
            (Some(before), Some(after)) => {
                before.latitude.is_some()
                    && before.latitude == after.latitude
                    && before.longitude == after.longitude
            }
            _ => false,
        }
    }
}
