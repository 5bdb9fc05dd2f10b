//! Plain stdout screen used by the command-line runner
//!
//! Only the lower window is shown. Upper-window text is dropped, and the
//! v1-3 status line is printed as a bracketed line when it changes.

use crate::interpreter::display::display_trait::{DisplayError, Screen};
use log::debug;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub struct TerminalScreen {
    current_window: u16,
    width: u16,
    height: u16,
    last_status: Option<String>,
    transcript: Option<File>,
}

impl TerminalScreen {
    pub fn new(width: u16, height: u16) -> Self {
        TerminalScreen {
            current_window: 0,
            width,
            height,
            last_status: None,
            transcript: None,
        }
    }

    /// Send output stream 2 to a file
    pub fn with_transcript(mut self, path: &Path) -> Result<Self, DisplayError> {
        self.transcript = Some(File::create(path)?);
        Ok(self)
    }
}

impl Screen for TerminalScreen {
    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        if self.current_window != 0 {
            debug!("Terminal: upper window text dropped: {:?}", text);
            return Ok(());
        }
        let mut stdout = io::stdout();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn split_window(&mut self, lines: u16) -> Result<(), DisplayError> {
        debug!("Terminal: split_window({})", lines);
        Ok(())
    }

    fn set_window(&mut self, window: u16) -> Result<(), DisplayError> {
        self.current_window = window;
        Ok(())
    }

    fn erase_window(&mut self, window: i16) -> Result<(), DisplayError> {
        debug!("Terminal: erase_window({})", window);
        Ok(())
    }

    fn set_cursor(
        &mut self,
        line: i16,
        column: u16,
        _window: Option<u16>,
    ) -> Result<(), DisplayError> {
        debug!("Terminal: set_cursor({}, {})", line, column);
        Ok(())
    }

    fn set_text_style(&mut self, _style: u16) -> Result<(), DisplayError> {
        Ok(())
    }

    fn show_status(
        &mut self,
        location: &str,
        score_or_hours: i16,
        moves_or_minutes: u16,
        time_game: bool,
    ) -> Result<(), DisplayError> {
        let right = if time_game {
            format!("Time: {score_or_hours}:{moves_or_minutes:02}")
        } else {
            format!("Score: {score_or_hours}  Moves: {moves_or_minutes}")
        };
        let status = format!("[{location}  {right}]");
        if self.last_status.as_deref() != Some(status.as_str()) {
            let mut stdout = io::stdout();
            writeln!(stdout, "{status}")?;
            self.last_status = Some(status);
        }
        Ok(())
    }

    fn transcript(&mut self, text: &str) -> Result<(), DisplayError> {
        if let Some(file) = self.transcript.as_mut() {
            file.write_all(text.as_bytes())?;
        }
        Ok(())
    }

    fn screen_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }
}
