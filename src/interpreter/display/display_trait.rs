//! Screen trait consumed by the interpreter
//!
//! Window layout, styling and sound live on the host side. The interpreter
//! only marshals opcode arguments into these calls.

use std::fmt;

/// Output side of the machine: streams 1, 2 and 4 plus the screen model
pub trait Screen {
    /// Print text to the current window (output stream 1)
    fn print(&mut self, text: &str) -> Result<(), DisplayError>;

    /// Print a single character to the current window
    fn print_char(&mut self, ch: char) -> Result<(), DisplayError> {
        let mut buf = [0u8; 4];
        self.print(ch.encode_utf8(&mut buf))
    }

    /// Split the screen so the upper window has `lines` lines
    fn split_window(&mut self, lines: u16) -> Result<(), DisplayError>;

    /// Set the current window (0 = lower/main, 1 = upper)
    fn set_window(&mut self, window: u16) -> Result<(), DisplayError>;

    /// Erase a window (-1 = whole screen and unsplit, -2 = whole screen)
    fn erase_window(&mut self, window: i16) -> Result<(), DisplayError>;

    /// Erase from cursor to end of line
    fn erase_line(&mut self, _value: u16) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Set cursor position (1-based coordinates)
    fn set_cursor(&mut self, line: i16, column: u16, window: Option<u16>)
        -> Result<(), DisplayError>;

    /// Current cursor position as (line, column)
    fn get_cursor(&mut self) -> Result<(u16, u16), DisplayError> {
        Ok((1, 1))
    }

    /// Set text style (0 = roman, 1 = reverse, 2 = bold, 4 = italic, 8 = fixed)
    fn set_text_style(&mut self, style: u16) -> Result<(), DisplayError>;

    fn set_buffer_mode(&mut self, _buffered: bool) -> Result<(), DisplayError> {
        Ok(())
    }

    fn set_colour(&mut self, _fg: u16, _bg: u16, _window: Option<u16>) -> Result<(), DisplayError> {
        Ok(())
    }

    fn set_true_colour(
        &mut self,
        _fg: u16,
        _bg: u16,
        _window: Option<u16>,
    ) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Select a font, returning the previous font or 0 when unavailable
    fn set_font(&mut self, font: u16) -> Result<u16, DisplayError> {
        Ok(if font == 1 || font == 0 { 1 } else { 0 })
    }

    fn sound_effect(
        &mut self,
        _number: u16,
        _effect: u16,
        _volume: u16,
        _routine: u16,
    ) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Status line for v1-3 stories
    fn show_status(
        &mut self,
        location: &str,
        score_or_hours: i16,
        moves_or_minutes: u16,
        time_game: bool,
    ) -> Result<(), DisplayError>;

    /// Output stream 2
    fn transcript(&mut self, _text: &str) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Output stream 4: the player's commands
    fn script_command(&mut self, _text: &str) -> Result<(), DisplayError> {
        Ok(())
    }

    /// v6 window, picture, mouse and menu opcodes, forwarded by name.
    /// The returned value is stored by opcodes that store.
    fn extended(&mut self, _name: &str, _args: &[u16]) -> Result<u16, DisplayError> {
        Ok(0)
    }

    /// Screen size as (width, height) in characters
    fn screen_size(&self) -> (u16, u16);
}

/// Display error type
#[derive(Debug, Clone)]
pub struct DisplayError {
    pub message: String,
}

impl DisplayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Display error: {}", self.message)
    }
}

impl std::error::Error for DisplayError {}

impl From<std::io::Error> for DisplayError {
    fn from(error: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", error))
    }
}

impl From<DisplayError> for String {
    fn from(error: DisplayError) -> String {
        error.message
    }
}
