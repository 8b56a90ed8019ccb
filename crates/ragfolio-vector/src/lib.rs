//! Vector index clients: the LanceDB chunk table and an in-memory cosine index.

pub mod memory;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use memory::MemoryIndex;
pub use search::LanceChunkIndex;
pub use writer::LanceChunkWriter;
