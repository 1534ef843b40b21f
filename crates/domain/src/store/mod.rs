//! Store implementations that live in the domain crate.

pub mod memory;

pub use memory::MemoryStore;
