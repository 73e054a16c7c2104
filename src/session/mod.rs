//! Acquisition Session
//!
//! A single UI-facing state machine,
//! `idle -> probing|scanning -> tunneling -> ready|fallback`.
//! A new request resets the session wholesale and cancels the flow it
//! replaces; events from that older flow are rejected as superseded.

mod acquire;
mod controller;
mod state;

pub use acquire::Acquirer;
pub use controller::{SessionController, SessionError, SessionTicket};
pub use state::{AcquiredMedia, AcquisitionSession, SessionResults, SessionStatus};
