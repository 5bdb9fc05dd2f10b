// Opcode tables drive instruction decoding
pub mod opcode_tables;
pub use self::opcode_tables::*;

// Opcode implementations, each an `impl Interpreter` block
pub mod opcodes_display;
pub mod opcodes_io;
pub mod opcodes_math;
pub mod opcodes_memory;
pub mod opcodes_object;
pub mod opcodes_stack;
