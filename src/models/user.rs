use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GeoPoint;

/// Directory partition a user document lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Resident,
    Collector,
}

impl UserType {
    /// Name of the backing directory partition (table).
    pub fn partition(&self) -> &'static str {
        match self {
            UserType::Resident => "residents",
            UserType::Collector => "collectors",
        }
    }
}

/// One document in a directory partition.
///
/// `username` is not declared unique; lookups take the first match.
/// `reset_code` and `reset_timestamp_ms` are either both present (an
/// OTP is outstanding) or both absent, set and cleared together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Stored as entered at registration. Compared by equality at login.
    #[serde(skip_serializing, default)]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_address: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub barangay: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub push_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub reset_code: Option<String>,
    #[serde(skip_serializing, default)]
    pub reset_timestamp_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Last-known location, if both coordinates are on file and finite.
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                let point = GeoPoint::new(lat, lon);
                point.is_valid().then_some(point)
            }
            _ => None,
        }
    }

    /// Eligible for proximity notification: needs both a location and a
    /// push token.
    pub fn notifiable(&self) -> bool {
        self.location().is_some() && self.push_token.is_some()
    }
}

/// Input for creating a directory document. Location, push token and
/// most profile fields are optional; the app fills them in over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_address: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub barangay: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub push_token: Option<String>,
}

/// Denormalized projection returned on successful login, for client
/// display. Deliberately omits the password and reset fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentProfile {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub barangay: Option<String>,
}

impl From<User> for ResidentProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            region: user.region,
            city: user.city,
            barangay: user.barangay,
        }
    }
}
