//! In-memory state shared by every call handler.
//!
//! - [`feature_store`] - The immutable feature dataset, loaded once at
//!   startup and read without locking.
//! - [`note_log`] - The route note history, appended by every `RouteChat`
//!   call under a single lock.

pub mod feature_store;
pub mod note_log;

pub use feature_store::FeatureStore;
pub use note_log::RouteNoteLog;
