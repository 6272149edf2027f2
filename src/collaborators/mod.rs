//! External collaborators consumed by the gateway core.
//!
//! Each boundary is a trait so deployments and tests can swap the backing
//! implementation. Route loading lives in `routing::loader` and the not-found
//! handler in `routing::fallback`, next to the dispatcher they feed.

pub mod catalog;
pub mod storage;

pub use catalog::{CatalogGenerator, DailyCatalog, FileCatalog};
pub use storage::{StorageConnector, StorageError, StorageHandle, TcpStorageConnector};
