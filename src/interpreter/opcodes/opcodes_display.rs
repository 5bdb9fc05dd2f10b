/// Display operations for Z-Machine interpreter
///
/// This module handles all screen-model operations including:
/// - Window management (split_window, set_window, erase_window, erase_line)
/// - Cursor control (set_cursor, get_cursor)
/// - Text styling (set_text_style, set_colour, set_true_colour, set_font, buffer_mode)
/// - The v1-3 status line (show_status)
/// - Audio feedback (sound_effect)
/// - The v6 window, picture, mouse and menu opcodes
///
/// The interpreter keeps no screen state of its own; every opcode here
/// marshals its operands into a `Screen` call.
use crate::interpreter::core::instruction::{Instruction, OperandCount};
use crate::interpreter::core::interpreter::{ExecutionResult, Interpreter};
use crate::interpreter::display::Screen;
use crate::interpreter::objects::zobject::ZObjectSystem;
use crate::interpreter::utils::header::FLAGS1_TIME_GAME;
use log::debug;

impl<S: Screen> Interpreter<S> {
    /// Check if an opcode is a display operation
    pub fn is_display_opcode(opcode: u8, operand_count: OperandCount, version: u8) -> bool {
        match operand_count {
            OperandCount::OP0 => opcode == 0x0C && version <= 3,
            OperandCount::OP1 => false,
            OperandCount::OP2 => opcode == 0x1B,
            OperandCount::VAR => matches!(opcode, 0x0A | 0x0B | 0x0D..=0x12 | 0x15),
            OperandCount::EXT => matches!(
                opcode,
                0x04..=0x08 | 0x0D | 0x10..=0x14 | 0x16 | 0x17 | 0x19..=0x1D
            ),
        }
    }

    /// Handle display opcodes
    pub fn execute_display_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        let operand = |i: usize| operands.get(i).copied().unwrap_or(0);
        let window = operands.get(2).copied();

        match (inst.opcode, inst.operand_count) {
            // 0OP:0x0C - show_status
            (0x0C, OperandCount::OP0) => {
                self.update_status_line()?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x0A - split_window
            (0x0A, OperandCount::VAR) => {
                self.screen.split_window(operand(0))?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x0B - set_window
            (0x0B, OperandCount::VAR) => {
                self.screen.set_window(operand(0))?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x0D - erase_window
            (0x0D, OperandCount::VAR) => {
                self.screen.erase_window(operand(0) as i16)?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x0E - erase_line
            (0x0E, OperandCount::VAR) => {
                self.screen.erase_line(operand(0))?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x0F - set_cursor line column (window in v6)
            (0x0F, OperandCount::VAR) => {
                self.screen
                    .set_cursor(operand(0) as i16, operand(1), window)?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x10 - get_cursor array
            (0x10, OperandCount::VAR) => {
                let (line, column) = self.screen.get_cursor()?;
                let array = operand(0) as u32;
                self.vm.write_word(array, line)?;
                self.vm.write_word(array + 2, column)?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x11 - set_text_style
            (0x11, OperandCount::VAR) => {
                self.screen.set_text_style(operand(0))?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x12 - buffer_mode
            (0x12, OperandCount::VAR) => {
                self.screen.set_buffer_mode(operand(0) != 0)?;
                Ok(ExecutionResult::Continue)
            }

            // 2OP:0x1B - set_colour foreground background (window in v6)
            (0x1B, OperandCount::OP2) => {
                self.screen.set_colour(operand(0), operand(1), window)?;
                Ok(ExecutionResult::Continue)
            }

            // EXT:0x0D - set_true_colour
            (0x0D, OperandCount::EXT) => {
                self.screen
                    .set_true_colour(operand(0), operand(1), window)?;
                Ok(ExecutionResult::Continue)
            }

            // EXT:0x04 - set_font
            (0x04, OperandCount::EXT) => {
                let previous = self.screen.set_font(operand(0))?;
                self.store_result(inst, previous)?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x15 - sound_effect number effect volume routine
            (0x15, OperandCount::VAR) => {
                let number = if operands.is_empty() { 1 } else { operand(0) };
                self.screen
                    .sound_effect(number, operand(1), operand(2), operand(3))?;
                Ok(ExecutionResult::Continue)
            }

            // v6 pictures, windows, mouse and menus
            (_, OperandCount::EXT) => {
                let name = inst.name(self.vm.version());
                let value = self.screen.extended(name, operands)?;
                debug!("{} {:?} -> {}", name, operands, value);
                self.store_result(inst, value)?;
                self.do_branch(inst, value != 0)
            }

            _ => Err(self.unknown_opcode(inst)),
        }
    }

    /// Redraw the v1-3 status line from globals 0 (location), 1 and 2
    pub(crate) fn update_status_line(&mut self) -> Result<(), String> {
        let location = self.vm.read_global(0x10)?;
        let name = if location == 0 {
            String::new()
        } else {
            self.vm.object_name(location)?
        };
        let first = self.vm.read_global(0x11)? as i16;
        let second = self.vm.read_global(0x12)?;
        let time_game = self.vm.read_byte(1)? & FLAGS1_TIME_GAME != 0;
        self.screen.show_status(&name, first, second, time_game)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::utils::test_utils::{run_code, ObjectSpec, SCRATCH_ADDR};

    #[test]
    fn test_window_calls_reach_screen() {
        let interp = run_code(5, |b| {
            // split_window 3 ; set_window 1 ; set_cursor 2 5 ; erase_window -1 ; set_window 0
            b.code(&[0xEA, 0x7F, 0x03]);
            b.code(&[0xEB, 0x7F, 0x01]);
            b.code(&[0xEF, 0x5F, 0x02, 0x05]);
            b.code(&[0xED, 0x3F, 0xFF, 0xFF]);
            b.code(&[0xEB, 0x7F, 0x00]);
        })
        .unwrap();
        assert_eq!(
            interp.screen.calls(),
            &[
                "split_window 3",
                "set_window 1",
                "set_cursor 2 5",
                "erase_window -1",
                "set_window 0",
            ]
        );
        assert_eq!(interp.screen.current_window(), 0);
    }

    #[test]
    fn test_get_cursor_writes_array() {
        let interp = run_code(5, |b| {
            // set_cursor 4 9 ; get_cursor 0x0C00
            b.code(&[0xEF, 0x5F, 0x04, 0x09]);
            b.code(&[0xF0, 0x3F, 0x0C, 0x00]);
        })
        .unwrap();
        let array = SCRATCH_ADDR as u32;
        assert_eq!(interp.vm.read_word(array).unwrap(), 4);
        assert_eq!(interp.vm.read_word(array + 2).unwrap(), 9);
    }

    #[test]
    fn test_show_status_time_game() {
        let interp = run_code(3, |b| {
            let room = b.add_object(ObjectSpec::named("Lobby"));
            b.set_byte(0x01, 0x02);
            b.set_global(0, room).set_global(1, 9).set_global(2, 5);
            b.code(&[0xBC]);
        })
        .unwrap();
        assert_eq!(interp.screen.status(), Some("Lobby 9:05"));
    }

    #[test]
    fn test_set_font_stores_previous() {
        let interp = run_code(5, |b| {
            // set_font 4 -> G00 ; set_font 1 -> G01
            b.code(&[0xBE, 0x04, 0x7F, 0x04, 0x10]);
            b.code(&[0xBE, 0x04, 0x7F, 0x01, 0x11]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 0);
        assert_eq!(interp.vm.read_global(0x11).unwrap(), 1);
    }

    #[test]
    fn test_v6_extended_forwarded_by_name() {
        let interp = run_code(6, |b| {
            // draw_picture 1 ; picture_data 1 0x0C00 ?(rtrue) never taken
            b.code(&[0xBE, 0x05, 0x7F, 0x01]);
            b.code(&[0xBE, 0x06, 0x4F, 0x01, 0x0C, 0x00, 0xC1]);
        })
        .unwrap();
        assert_eq!(interp.screen.calls(), &["draw_picture [1]", "picture_data [1, 3072]"]);
    }
}
