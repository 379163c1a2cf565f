//! Domain models for the G-Track backend.
//!
//! # Core Concepts
//!
//! ## Directory entities
//!
//! - [`User`]: One document in a directory partition (`residents` or
//!   `collectors`), selected by [`UserType`]. Carries profile fields,
//!   an optional last-known location and push token, and the transient
//!   OTP reset pair (`reset_code` + `reset_timestamp_ms`).
//! - [`ResidentProfile`]: The denormalized projection returned on a
//!   successful login. Never carries the password or reset fields.
//!
//! ## Ephemeral entities
//!
//! - [`CollectorLocationEvent`]: Before/after snapshot of a collector
//!   document write. Constructed per invocation, never persisted.
//! - [`NotificationRecord`]: Write-once in-app notification history row;
//!   only the later "mark read" action mutates it.

mod location;
mod notification;
mod user;

pub use location::*;
pub use notification::*;
pub use user::*;
