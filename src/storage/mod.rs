pub mod engine;
pub mod memory;
pub mod table;

pub use engine::StorageEngine;
pub use memory::MemoryStore;
pub use table::{Column, ColumnType, Table, TableSchema};
