//! Line-based input for console hosts
//!
//! The engine never blocks on input itself. When `run` reports a pending
//! read, the host pulls a line or a key from a `LineInput` and hands it back
//! through `provide_line` / `provide_char`.
//!
//! A key read on a line-buffered stream takes the first character of the
//! next line; the remaining characters are served to later key reads, then a
//! newline.

use log::debug;
use std::collections::VecDeque;
use std::io::{self, BufRead, StdinLock};

pub struct LineInput<R: BufRead> {
    reader: R,
    /// Characters left over from a line consumed by key reads
    pending: VecDeque<char>,
}

impl LineInput<StdinLock<'static>> {
    pub fn stdin() -> Self {
        LineInput::new(io::stdin().lock())
    }
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R) -> Self {
        LineInput {
            reader,
            pending: VecDeque::new(),
        }
    }

    /// Read one line without its terminator. `Ok(None)` at end of input.
    ///
    /// Without the end-of-input check a piped session would feed empty lines
    /// to the story forever.
    pub fn read_line(&mut self) -> Result<Option<String>, String> {
        if !self.pending.is_empty() {
            let rest: String = self.pending.drain(..).filter(|&c| c != '\n').collect();
            debug!("input: using buffered '{}'", rest);
            return Ok(Some(rest));
        }

        let mut buffer = String::new();
        let bytes_read = self
            .reader
            .read_line(&mut buffer)
            .map_err(|e| format!("Failed to read line: {e}"))?;
        if bytes_read == 0 {
            debug!("input: end of input");
            return Ok(None);
        }

        if buffer.ends_with('\n') {
            buffer.pop();
            if buffer.ends_with('\r') {
                buffer.pop();
            }
        }
        debug!("input: line '{}'", buffer);
        Ok(Some(buffer))
    }

    /// Read one key. An empty line reads as Enter.
    pub fn read_char(&mut self) -> Result<Option<char>, String> {
        if self.pending.is_empty() {
            match self.read_line()? {
                Some(line) => {
                    self.pending.extend(line.chars());
                    self.pending.push_back('\n');
                }
                None => return Ok(None),
            }
        }
        Ok(self.pending.pop_front())
    }
}
