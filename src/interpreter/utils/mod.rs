pub mod header;
pub mod zrand;

pub use self::header::*;
pub use self::zrand::*;

// Synthetic story images for unit and integration tests
#[doc(hidden)]
pub mod test_utils;
