pub mod lookup;
pub mod memory;

pub use lookup::DirectoryLookup;
pub use memory::InMemoryDirectory;
