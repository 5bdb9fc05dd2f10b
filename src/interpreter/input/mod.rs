// Line and key input for hosts that read from a byte stream
pub mod input_line;

pub use self::input_line::*;
