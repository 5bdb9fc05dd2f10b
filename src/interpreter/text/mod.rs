pub mod dictionary;
pub mod text;

pub use self::dictionary::*;
pub use self::text::*;

#[cfg(test)]
mod dictionary_tests;
