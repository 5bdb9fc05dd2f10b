pub mod zobject;

pub use self::zobject::*;

#[cfg(test)]
mod property_tests;
