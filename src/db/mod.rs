pub mod entities;
pub mod loader;
pub mod store;

pub use store::{EntryStore, StoreError};
