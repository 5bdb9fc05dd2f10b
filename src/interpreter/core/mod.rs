pub mod game;
pub mod instruction;
pub mod interpreter;
pub mod vm;

pub use self::game::*;
pub use self::instruction::*;
pub use self::interpreter::*;
pub use self::vm::*;

#[cfg(test)]
mod call_tests;
#[cfg(test)]
mod instruction_tests;
