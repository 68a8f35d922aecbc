//! Durable relay state: the processed-activity cursor and the avatar URL cache.

mod file_state_store;

pub use file_state_store::{FileStateStore, HERALD_STATE_SCHEMA_VERSION};
