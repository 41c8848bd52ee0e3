pub mod collection;
pub mod engine;
pub mod filter;
pub mod fixture;
pub mod instrumented;
pub mod memory;

pub use collection::Collection;
pub use engine::Store;
pub use filter::{Filter, FindOptions, IndexSpec};
pub use fixture::Fixture;
pub use instrumented::{InstrumentedStore, StoreOp};
pub use memory::InMemoryStore;
