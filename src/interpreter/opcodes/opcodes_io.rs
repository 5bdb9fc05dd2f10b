/// Input/Output operations for Z-Machine interpreter
///
/// This module handles all I/O-related operations including:
/// - Text output (print, print_ret, print_addr, print_paddr, print_char, print_num,
///   print_table, print_unicode, new_line)
/// - Text input (sread/aread, read_char) with optional timer routines
/// - Stream management (input_stream, output_stream)
/// - Lexical analysis (tokenise, encode_text)
///
/// Input never blocks inside the interpreter. A read records what it is
/// waiting for and returns `WaitForInput`; the host answers with
/// `provide_line`, `provide_char` or `fire_timer` and resumes `run`.
use crate::interpreter::core::instruction::{Instruction, OperandCount};
use crate::interpreter::core::interpreter::{
    CharRequest, ExecutionResult, Interpreter, LineRequest, RunState,
};
use crate::interpreter::display::Screen;
use crate::interpreter::utils::header::FLAGS2_TRANSCRIPT;
use crate::interpreter::text::text::ZSCII_NEWLINE;
use log::{debug, info, warn};

impl<S: Screen> Interpreter<S> {
    /// Check if an opcode is an I/O operation
    pub fn is_io_opcode(opcode: u8, operand_count: OperandCount) -> bool {
        match operand_count {
            OperandCount::OP0 => matches!(opcode, 0x02 | 0x03 | 0x0B),
            OperandCount::OP1 => matches!(opcode, 0x07 | 0x0D),
            OperandCount::VAR => matches!(
                opcode,
                0x04 | 0x05 | 0x06 | 0x13 | 0x14 | 0x16 | 0x1B | 0x1C | 0x1E
            ),
            OperandCount::EXT => matches!(opcode, 0x0B | 0x0C),
            OperandCount::OP2 => false,
        }
    }

    /// Handle I/O system opcodes
    pub fn execute_io_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        let operand = |i: usize| operands.get(i).copied().unwrap_or(0);

        match (inst.opcode, inst.operand_count) {
            // ---- OUTPUT ----

            // 0OP:0x02 - print, 0OP:0x03 - print_ret
            (0x02, OperandCount::OP0) | (0x03, OperandCount::OP0) => {
                let words = inst
                    .text
                    .as_deref()
                    .ok_or_else(|| "print without inline text".to_string())?;
                let text = self.text().decode_words(words)?;
                self.output_text(&text)?;
                if inst.opcode == 0x03 {
                    self.output_text("\n")?;
                    return self.do_return(1);
                }
                Ok(ExecutionResult::Continue)
            }

            // 0OP:0x0B - new_line
            (0x0B, OperandCount::OP0) => {
                self.output_text("\n")?;
                Ok(ExecutionResult::Continue)
            }

            // 1OP:0x07 - print_addr
            (0x07, OperandCount::OP1) => {
                let (text, _) = self.text().decode_at(operand(0) as usize)?;
                self.output_text(&text)?;
                Ok(ExecutionResult::Continue)
            }

            // 1OP:0x0D - print_paddr
            (0x0D, OperandCount::OP1) => {
                let addr = self.vm.unpack_string_address(operand(0))?;
                let (text, _) = self.text().decode_at(addr as usize)?;
                self.output_text(&text)?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x05 - print_char
            (0x05, OperandCount::VAR) => {
                let ch = self.text().zscii_to_char(operand(0));
                self.output_char(ch)?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x06 - print_num
            (0x06, OperandCount::VAR) => {
                self.output_text(&(operand(0) as i16).to_string())?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x1E - print_table zscii-text width height skip
            (0x1E, OperandCount::VAR) => {
                let height = if operands.len() > 2 { operand(2) } else { 1 };
                self.print_table(operand(0), operand(1), height, operand(3))?;
                Ok(ExecutionResult::Continue)
            }

            // EXT:0x0B - print_unicode
            (0x0B, OperandCount::EXT) => {
                let ch = char::from_u32(operand(0) as u32).unwrap_or('?');
                self.output_char(ch)?;
                Ok(ExecutionResult::Continue)
            }

            // EXT:0x0C - check_unicode: bit 0 printable, bit 1 readable
            (0x0C, OperandCount::EXT) => {
                let supported = match char::from_u32(operand(0) as u32) {
                    Some(ch) if !ch.is_control() => 3,
                    _ => 0,
                };
                self.store_result(inst, supported)?;
                Ok(ExecutionResult::Continue)
            }

            // ---- STREAMS ----

            // VAR:0x13 - output_stream number table
            (0x13, OperandCount::VAR) => {
                self.select_output_stream(operand(0) as i16, operand(1))?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x14 - input_stream
            (0x14, OperandCount::VAR) => {
                debug!("input_stream {}", operand(0));
                self.input_stream = operand(0);
                Ok(ExecutionResult::Continue)
            }

            // ---- INPUT ----

            // VAR:0x04 - sread (v1-4) / aread (v5+)
            (0x04, OperandCount::VAR) => {
                let text_buffer = operand(0) as u32;
                if self.vm.version() <= 3 {
                    self.update_status_line()?;
                }
                let capacity = self.vm.read_byte(text_buffer)? as usize;
                let max_len = if self.vm.version() <= 4 {
                    capacity.saturating_sub(1)
                } else {
                    capacity
                };
                let request = LineRequest {
                    text_buffer,
                    parse_buffer: operand(1) as u32,
                    store_var: inst.store_var,
                    max_len,
                    timeout: operand(2),
                    routine: operand(3),
                };
                debug!("read line: {:?}", request);
                self.set_state(RunState::WaitingForLine(request));
                Ok(ExecutionResult::WaitForInput)
            }

            // VAR:0x16 - read_char 1 time routine
            (0x16, OperandCount::VAR) => {
                if operands.first().is_some_and(|&device| device != 1) {
                    warn!("read_char from device {}", operand(0));
                }
                let request = CharRequest {
                    store_var: inst.store_var,
                    timeout: operand(1),
                    routine: operand(2),
                };
                self.set_state(RunState::WaitingForChar(request));
                Ok(ExecutionResult::WaitForInput)
            }

            // VAR:0x1B - tokenise text parse dictionary flag
            (0x1B, OperandCount::VAR) => {
                let dictionary = match operand(2) {
                    0 => None,
                    addr => Some(addr as u32),
                };
                self.vm.tokenise(
                    operand(0) as u32,
                    operand(1) as u32,
                    dictionary,
                    operand(3) != 0,
                )?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x1C - encode_text zscii-text length from coded-text
            (0x1C, OperandCount::VAR) => {
                let start = operand(0) as u32 + operand(2) as u32;
                let zscii = (0..operand(1) as u32)
                    .map(|i| self.vm.read_byte(start + i))
                    .collect::<Result<Vec<u8>, String>>()?;
                let encoded = self.text().encode_zscii(&zscii);
                for (i, word) in encoded.iter().enumerate() {
                    self.vm.write_word(operand(3) as u32 + 2 * i as u32, *word)?;
                }
                Ok(ExecutionResult::Continue)
            }

            _ => Err(self.unknown_opcode(inst)),
        }
    }

    fn select_output_stream(&mut self, stream: i16, table: u16) -> Result<(), String> {
        debug!("output_stream {} {:04x}", stream, table);
        match stream {
            0 => {}
            1 | -1 => self.output_streams.screen = stream > 0,
            2 | -2 => {
                let flags2 = self.vm.game.flags2();
                let flags2 = if stream > 0 {
                    flags2 | FLAGS2_TRANSCRIPT
                } else {
                    flags2 & !FLAGS2_TRANSCRIPT
                };
                self.vm.game.set_flags2(flags2);
            }
            3 => self.enable_stream3(table as u32)?,
            -3 => self.disable_stream3(),
            4 | -4 => self.output_streams.commands = stream > 0,
            _ => warn!("output_stream: no stream {}", stream),
        }
        Ok(())
    }

    /// Print a rectangle of ZSCII text, one row per line
    fn print_table(&mut self, table: u16, width: u16, height: u16, skip: u16) -> Result<(), String> {
        let mut addr = table as u32;
        for row in 0..height {
            if row > 0 {
                self.output_text("\n")?;
            }
            let line: String = {
                let codec = self.text();
                (0..width as u32)
                    .map(|i| {
                        self.vm
                            .read_byte(addr + i)
                            .map(|z| codec.zscii_to_char(z as u16))
                    })
                    .collect::<Result<String, String>>()?
            };
            self.output_text(&line)?;
            addr += width as u32 + skip as u32;
        }
        Ok(())
    }

    /// Answer a pending line read. The text is lower-cased, truncated to the
    /// buffer, echoed to the transcript and tokenised.
    pub fn provide_line(&mut self, input: &str) -> Result<(), String> {
        let RunState::WaitingForLine(request) = self.state().clone() else {
            return Err("provide_line: no line read is pending".to_string());
        };
        let lowered = input.to_lowercase();
        let zscii: Vec<u8> = {
            let codec = self.text();
            lowered
                .chars()
                .filter_map(|ch| codec.char_to_zscii(ch))
                .filter(|&z| z != ZSCII_NEWLINE)
                .take(request.max_len)
                .collect()
        };
        info!("Input: {:?}", lowered);

        self.write_line(&request, &zscii)?;

        if self.transcript_enabled() {
            self.screen.transcript(&format!("{lowered}\n"))?;
        }
        if self.output_streams.commands {
            self.screen.script_command(&lowered)?;
        }
        self.finish_line(&request, ZSCII_NEWLINE as u16)
    }

    /// Answer a pending read_char
    pub fn provide_char(&mut self, ch: char) -> Result<(), String> {
        let RunState::WaitingForChar(request) = self.state().clone() else {
            return Err("provide_char: no character read is pending".to_string());
        };
        let zscii = self.text().char_to_zscii(ch).unwrap_or(b'?') as u16;
        debug!("read_char -> {}", zscii);
        if let Some(var) = request.store_var {
            self.vm.write_variable(var, zscii)?;
        }
        self.instruction_count = 0;
        self.set_state(RunState::Running);
        Ok(())
    }

    /// Run the pending read's timer routine. Returns true when the routine
    /// asked for the read to end, in which case it ends with terminator 0.
    pub fn fire_timer(&mut self) -> Result<bool, String> {
        let routine = match self.state() {
            RunState::WaitingForLine(request) => request.routine,
            RunState::WaitingForChar(request) => request.routine,
            _ => return Err("fire_timer: no read is pending".to_string()),
        };
        if routine == 0 {
            return Ok(false);
        }
        let waiting = self.state().clone();
        let result = self.call_timer_routine(routine)?;
        if *self.state() == RunState::Quit {
            return Ok(true);
        }
        if result == 0 {
            return Ok(false);
        }

        info!("Read ended by timer routine");
        match waiting {
            RunState::WaitingForLine(request) => {
                self.write_line(&request, &[])?;
                self.finish_line(&request, 0)?;
            }
            RunState::WaitingForChar(request) => {
                if let Some(var) = request.store_var {
                    self.vm.write_variable(var, 0)?;
                }
                self.set_state(RunState::Running);
            }
            _ => {}
        }
        Ok(true)
    }

    fn write_line(&mut self, request: &LineRequest, zscii: &[u8]) -> Result<(), String> {
        let tb = request.text_buffer;
        if self.vm.version() <= 4 {
            for (i, &z) in zscii.iter().enumerate() {
                self.vm.write_byte(tb + 1 + i as u32, z)?;
            }
            self.vm.write_byte(tb + 1 + zscii.len() as u32, 0)?;
        } else {
            self.vm.write_byte(tb + 1, zscii.len() as u8)?;
            for (i, &z) in zscii.iter().enumerate() {
                self.vm.write_byte(tb + 2 + i as u32, z)?;
            }
        }
        Ok(())
    }

    fn finish_line(&mut self, request: &LineRequest, terminator: u16) -> Result<(), String> {
        if request.parse_buffer != 0 {
            self.vm
                .tokenise(request.text_buffer, request.parse_buffer, None, false)?;
        }
        if self.vm.version() >= 5 {
            if let Some(var) = request.store_var {
                self.vm.write_variable(var, terminator)?;
            }
        }
        self.instruction_count = 0;
        self.set_state(RunState::Running);
        Ok(())
    }
}
