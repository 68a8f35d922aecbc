//! Foundational types shared across herald crates.
//!
//! Holds the activity/issue domain model, the collaborator contracts the relay
//! pipeline depends on, and small transport and filesystem helpers used by the
//! concrete collaborator crates.

pub mod atomic_io;
pub mod collaborators;
pub mod error;
pub mod model;
pub mod text_helpers;
pub mod transport_helpers;

pub use atomic_io::write_text_atomic;
pub use collaborators::{BlobStore, ChatTransport, FeedReader, IssueLookup, StateStore};
pub use error::LookupError;
pub use model::{
    is_issue_key, ActivityEntry, ActivityIssue, Author, FieldValue, Issue, Message,
    SenderIdentity, UserImage,
};
