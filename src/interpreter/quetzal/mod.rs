//! Quetzal save file format implementation
//!
//! Quetzal is the standard save game format for Z-Machine interpreters.
//! It uses the IFF (Interchange File Format) chunk structure.

pub mod chunks;
pub mod compressed_memory;
pub mod iff;
pub mod save_bytes;
pub mod save_store;
pub mod undo;

pub use save_bytes::{restore_from_bytes, save_to_bytes, PortableGameState};
pub use save_store::{FileSaveStore, MemorySaveStore, SaveStore};
pub use undo::UndoRing;
