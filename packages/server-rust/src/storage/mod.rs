//! Record storage backends for catalogue operation handlers.

pub mod memory;

pub use memory::InMemoryRepository;
