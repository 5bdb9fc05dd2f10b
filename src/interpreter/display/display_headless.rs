//! Headless screen for tests and non-interactive runs
//!
//! Collects everything printed, plus a log of screen-model calls, without
//! displaying anything.

use crate::interpreter::display::display_trait::{DisplayError, Screen};
use log::debug;

#[derive(Debug, Default)]
pub struct HeadlessScreen {
    output: String,
    transcript: String,
    commands: Vec<String>,
    calls: Vec<String>,
    status: Option<String>,
    cursor: (u16, u16),
    upper_window_lines: u16,
    current_window: u16,
    width: u16,
    height: u16,
}

impl HeadlessScreen {
    pub fn new() -> Self {
        HeadlessScreen {
            cursor: (1, 1),
            width: 80,
            height: 24,
            ..Default::default()
        }
    }

    pub fn with_size(width: u16, height: u16) -> Self {
        HeadlessScreen {
            width,
            height,
            ..Self::new()
        }
    }

    /// Everything printed to output stream 1
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Return and clear the printed output
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn transcript_text(&self) -> &str {
        &self.transcript
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Screen-model calls in order, e.g. `split_window 2`
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn current_window(&self) -> u16 {
        self.current_window
    }

    fn record(&mut self, call: String) {
        debug!("Headless: {}", call);
        self.calls.push(call);
    }
}

impl Screen for HeadlessScreen {
    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        self.output.push_str(text);
        Ok(())
    }

    fn split_window(&mut self, lines: u16) -> Result<(), DisplayError> {
        self.upper_window_lines = lines;
        self.record(format!("split_window {lines}"));
        Ok(())
    }

    fn set_window(&mut self, window: u16) -> Result<(), DisplayError> {
        self.current_window = window;
        self.record(format!("set_window {window}"));
        Ok(())
    }

    fn erase_window(&mut self, window: i16) -> Result<(), DisplayError> {
        if window == -1 {
            self.upper_window_lines = 0;
        }
        self.record(format!("erase_window {window}"));
        Ok(())
    }

    fn erase_line(&mut self, value: u16) -> Result<(), DisplayError> {
        self.record(format!("erase_line {value}"));
        Ok(())
    }

    fn set_cursor(
        &mut self,
        line: i16,
        column: u16,
        _window: Option<u16>,
    ) -> Result<(), DisplayError> {
        if line > 0 {
            self.cursor = (line as u16, column);
        }
        self.record(format!("set_cursor {line} {column}"));
        Ok(())
    }

    fn get_cursor(&mut self) -> Result<(u16, u16), DisplayError> {
        Ok(self.cursor)
    }

    fn set_text_style(&mut self, style: u16) -> Result<(), DisplayError> {
        self.record(format!("set_text_style {style}"));
        Ok(())
    }

    fn set_buffer_mode(&mut self, buffered: bool) -> Result<(), DisplayError> {
        self.record(format!("buffer_mode {}", buffered as u8));
        Ok(())
    }

    fn set_colour(&mut self, fg: u16, bg: u16, _window: Option<u16>) -> Result<(), DisplayError> {
        self.record(format!("set_colour {fg} {bg}"));
        Ok(())
    }

    fn sound_effect(
        &mut self,
        number: u16,
        effect: u16,
        volume: u16,
        _routine: u16,
    ) -> Result<(), DisplayError> {
        self.record(format!("sound_effect {number} {effect} {volume}"));
        Ok(())
    }

    fn show_status(
        &mut self,
        location: &str,
        score_or_hours: i16,
        moves_or_minutes: u16,
        time_game: bool,
    ) -> Result<(), DisplayError> {
        let status = if time_game {
            format!("{location} {score_or_hours}:{moves_or_minutes:02}")
        } else {
            format!("{location} {score_or_hours}/{moves_or_minutes}")
        };
        self.status = Some(status);
        Ok(())
    }

    fn transcript(&mut self, text: &str) -> Result<(), DisplayError> {
        self.transcript.push_str(text);
        Ok(())
    }

    fn script_command(&mut self, text: &str) -> Result<(), DisplayError> {
        self.commands.push(text.to_string());
        Ok(())
    }

    fn extended(&mut self, name: &str, args: &[u16]) -> Result<u16, DisplayError> {
        self.record(format!("{name} {args:?}"));
        Ok(0)
    }

    fn screen_size(&self) -> (u16, u16) {
        (self.width, self.height)
    }
}
