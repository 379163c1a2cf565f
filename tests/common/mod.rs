#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use gtrack_functions::db::Database;
use gtrack_functions::delivery::{PushMessage, PushSink, SmsSink};
use gtrack_functions::models::*;

/// Push sink that records every message instead of delivering it.
/// Flip `fail` to make every send return a transport error.
#[derive(Default)]
pub struct RecordingPush {
    pub sent: Mutex<Vec<PushMessage>>,
    pub fail: AtomicBool,
}

impl RecordingPush {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PushSink for RecordingPush {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("simulated push transport failure");
        }
        Ok(())
    }
}

/// SMS sink that records every message instead of delivering it.
#[derive(Default)]
pub struct RecordingSms {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingSms {
    pub fn last_body(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, body)| body.clone())
    }

    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SmsSink for RecordingSms {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("simulated SMS transport failure");
        }
        self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(())
    }
}

/// First 6 digits in an SMS body, i.e. the OTP code.
pub fn extract_code(body: &str) -> String {
    body.chars().filter(|c| c.is_ascii_digit()).take(6).collect()
}

pub fn open_db() -> Database {
    let db = Database::open_memory().expect("Failed to create in-memory database");
    db.migrate().expect("Failed to migrate");
    db
}

pub fn resident_input(username: &str) -> CreateUserInput {
    CreateUserInput {
        username: username.to_string(),
        password: "hunter2".to_string(),
        first_name: Some("Maria".to_string()),
        last_name: Some("Santos".to_string()),
        email: Some(format!("{username}@example.com")),
        phone: Some("+639170000001".to_string()),
        full_address: None,
        region: Some("NCR".to_string()),
        city: Some("Manila".to_string()),
        barangay: Some("Barangay 123".to_string()),
        latitude: None,
        longitude: None,
        push_token: None,
    }
}

/// A resident parked at a location with a push token, ready to be
/// notified.
pub fn notifiable_resident(username: &str, latitude: f64, longitude: f64) -> CreateUserInput {
    CreateUserInput {
        latitude: Some(latitude),
        longitude: Some(longitude),
        push_token: Some(format!("token-{username}")),
        ..resident_input(username)
    }
}

/// A collector location write carrying only an `after` snapshot.
pub fn location_event(collector: &str, latitude: f64, longitude: f64) -> CollectorLocationEvent {
    CollectorLocationEvent {
        collector_id: collector.to_string(),
        before: None,
        after: Some(CollectorSnapshot {
            latitude: Some(latitude),
            longitude: Some(longitude),
            name: Some("Truck 7".to_string()),
            truck_number: None,
        }),
    }
}

/// Roughly `meters` north of the given latitude.
pub fn offset_north(latitude: f64, meters: f64) -> f64 {
    latitude + meters * 0.00045 / 50.0
}
