//! Backend function layer for the G-Track waste-collection app.
//!
//! Two independent components share a user directory:
//!
//! - [`dispatch::ProximityDispatcher`] reacts to collector location
//!   writes and alerts nearby residents over push, with a per-resident
//!   notification cooldown.
//! - [`recovery::RecoveryService`] implements the OTP reset flow
//!   (locate user, issue code over SMS, verify and update password)
//!   plus the resident login check.
//!
//! [`api`] exposes both over HTTP: a callable request/response surface
//! for recovery and login, and an event endpoint consuming the
//! collector document-change feed.

pub mod api;
pub mod db;
pub mod delivery;
pub mod dispatch;
pub mod geo;
pub mod models;
pub mod recovery;
