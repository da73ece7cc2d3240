//! Client-side synchronisation of a learner's roadmap with the server of record.
//!
//! [`ToggleService`] owns the optimistic resource toggles; [`LearnerSession`]
//! wraps it together with the snapshot, assessments and interview context.

pub mod error;
pub mod session;
pub mod toggle;

#[cfg(test)]
pub(crate) mod mock;

pub use error::SyncError;
pub use session::LearnerSession;
pub use toggle::{ToggleOutcome, ToggleService, ToggleState};
