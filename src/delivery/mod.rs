//! Outbound delivery channels: push notifications and SMS.
//!
//! Both channels are best-effort, at-most-once as seen by this system.
//! They sit behind traits so the dispatcher and recovery service can be
//! tested with recording fakes, and so a deployment without gateway
//! credentials degrades to logged failures instead of refusing to start.

mod push;
mod sms;

pub use push::*;
pub use sms::*;
