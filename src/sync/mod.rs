//! Multi-device synchronization of the per-period planning state.
//!
//! Each (user, period) pair maps to one whole-document snapshot in a
//! [`DocumentStore`](crate::store::DocumentStore). The coordinator owns the
//! working state, debounces saves after edits, loads on navigation and
//! refuses to overwrite newer local work with an older shared copy.

mod coordinator;
mod scheduler;
mod types;


pub use coordinator::SyncCoordinator;
pub use types::{LoadOutcome, ResyncOutcome, SaveOutcome, SyncStatus};
