//! CSW dispatch server: service selection, schema processors, and the operation pipeline.

pub mod service;
pub mod storage;
pub mod traits;

pub use service::{resolve, Dispatcher, DispatchError, Resolution};
pub use storage::InMemoryRepository;
pub use traits::RepositoryLookup;
