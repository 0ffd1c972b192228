//! Persistence for the shared state document consumed by every stage.

mod error;
mod store;

pub use error::StoreError;
pub use store::{Snapshot, StateStore};
