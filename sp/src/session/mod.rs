//! Session - one request from first draft to the last served day
//!
//! The session runs the refinement loop once, then serves day selections
//! from the content cache until the user exits. All state lives in the
//! [`Session`] value.

mod controller;

pub use controller::{DaySelection, Session, SessionIo, SessionSummary};
