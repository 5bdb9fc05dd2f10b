/// Arithmetic, bitwise and comparison operations
///
/// All arithmetic is signed 16-bit and wraps. Division and remainder
/// truncate toward zero; a zero divisor halts the machine.
use crate::interpreter::core::instruction::{Instruction, OperandCount};
use crate::interpreter::core::interpreter::{ExecutionResult, Interpreter};
use crate::interpreter::display::Screen;
use log::debug;

impl<S: Screen> Interpreter<S> {
    /// Check if an opcode is handled here
    pub fn is_math_opcode(opcode: u8, operand_count: OperandCount, version: u8) -> bool {
        match operand_count {
            OperandCount::OP2 => matches!(opcode, 0x01..=0x03 | 0x07..=0x09 | 0x14..=0x18),
            OperandCount::OP1 => opcode == 0x00 || (opcode == 0x0F && version <= 4),
            OperandCount::VAR => opcode == 0x18,
            OperandCount::EXT => matches!(opcode, 0x02 | 0x03),
            OperandCount::OP0 => false,
        }
    }

    /// Handle mathematical and logical opcodes
    pub fn execute_math_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        let a = operands.first().copied().unwrap_or(0);
        let b = operands.get(1).copied().unwrap_or(0);

        match (inst.opcode, inst.operand_count) {
            // ---- COMPARISONS ----

            // je: a against up to three others
            (0x01, OperandCount::OP2) => {
                let matched = operands.iter().skip(1).any(|&other| other == a);
                debug!("je {} {:?} -> {}", a, &operands[1.min(operands.len())..], matched);
                self.do_branch(inst, matched)
            }
            (0x02, OperandCount::OP2) => self.do_branch(inst, (a as i16) < (b as i16)),
            (0x03, OperandCount::OP2) => self.do_branch(inst, (a as i16) > (b as i16)),
            // test: all flags in b set in a
            (0x07, OperandCount::OP2) => self.do_branch(inst, a & b == b),
            (0x00, OperandCount::OP1) => self.do_branch(inst, a == 0),

            // ---- BITWISE ----
            (0x08, OperandCount::OP2) => self.store_math(inst, a | b),
            (0x09, OperandCount::OP2) => self.store_math(inst, a & b),
            (0x0F, OperandCount::OP1) | (0x18, OperandCount::VAR) => self.store_math(inst, !a),

            // ---- ARITHMETIC ----
            (0x14, OperandCount::OP2) => {
                self.store_math(inst, (a as i16).wrapping_add(b as i16) as u16)
            }
            (0x15, OperandCount::OP2) => {
                self.store_math(inst, (a as i16).wrapping_sub(b as i16) as u16)
            }
            (0x16, OperandCount::OP2) => {
                self.store_math(inst, (a as i16).wrapping_mul(b as i16) as u16)
            }
            (0x17, OperandCount::OP2) => {
                if b == 0 {
                    return Err(format!("Division by zero at PC {:05x}", self.vm.pc));
                }
                self.store_math(inst, (a as i16).wrapping_div(b as i16) as u16)
            }
            (0x18, OperandCount::OP2) => {
                if b == 0 {
                    return Err(format!("Modulo by zero at PC {:05x}", self.vm.pc));
                }
                self.store_math(inst, (a as i16).wrapping_rem(b as i16) as u16)
            }

            // ---- SHIFTS ----
            (0x02, OperandCount::EXT) => {
                let places = b as i16;
                let result = match places {
                    0..=15 => a << places,
                    -15..=-1 => a >> -places,
                    _ => 0,
                };
                self.store_math(inst, result)
            }
            (0x03, OperandCount::EXT) => {
                let places = b as i16;
                let value = a as i16;
                let result = match places {
                    0..=15 => (value << places) as u16,
                    -15..=-1 => (value >> -places) as u16,
                    p if p < 0 => (value >> 15) as u16,
                    _ => 0,
                };
                self.store_math(inst, result)
            }

            _ => Err(self.unknown_opcode(inst)),
        }
    }

    fn store_math(&mut self, inst: &Instruction, value: u16) -> Result<ExecutionResult, String> {
        debug!("{} -> {}", inst.name(self.vm.version()), value as i16);
        self.store_result(inst, value)?;
        Ok(ExecutionResult::Continue)
    }
}
