/// Memory operations for Z-Machine interpreter
///
/// This module handles all memory access operations including:
/// - Variable operations (load, store, inc, dec, inc_chk, dec_chk)
/// - Word and byte arrays (loadw, storew, loadb, storeb)
/// - Table operations (copy_table, scan_table)
///
/// Variable operands of load, store, inc and dec name a variable rather than
/// supply a value, so variable 0 means the top of stack in place.
use crate::interpreter::core::instruction::{Instruction, OperandCount};
use crate::interpreter::core::interpreter::{ExecutionResult, Interpreter};
use crate::interpreter::display::Screen;
use log::debug;

impl<S: Screen> Interpreter<S> {
    /// Check if an opcode is handled here
    pub fn is_memory_opcode(opcode: u8, operand_count: OperandCount) -> bool {
        match operand_count {
            OperandCount::OP1 => matches!(opcode, 0x05 | 0x06 | 0x0E),
            OperandCount::OP2 => matches!(opcode, 0x04 | 0x05 | 0x0D | 0x0F | 0x10),
            OperandCount::VAR => matches!(opcode, 0x01 | 0x02 | 0x17 | 0x1D),
            _ => false,
        }
    }

    /// Handle memory access opcodes
    pub fn execute_memory_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        let operand = |i: usize| operands.get(i).copied().unwrap_or(0);

        match (inst.opcode, inst.operand_count) {
            // 1OP:0x0E - load
            (0x0E, OperandCount::OP1) => {
                let value = self.vm.read_variable_indirect(operand(0) as u8)?;
                self.store_result(inst, value)?;
                Ok(ExecutionResult::Continue)
            }

            // 2OP:0x0D - store
            (0x0D, OperandCount::OP2) => {
                debug!("store: var={:02x}, value={}", operand(0), operand(1));
                self.vm
                    .write_variable_indirect(operand(0) as u8, operand(1))?;
                Ok(ExecutionResult::Continue)
            }

            // 1OP:0x05 - inc, 1OP:0x06 - dec
            (0x05, OperandCount::OP1) => {
                self.adjust_variable(operand(0) as u8, 1)?;
                Ok(ExecutionResult::Continue)
            }
            (0x06, OperandCount::OP1) => {
                self.adjust_variable(operand(0) as u8, -1)?;
                Ok(ExecutionResult::Continue)
            }

            // 2OP:0x04 - dec_chk, 2OP:0x05 - inc_chk
            (0x04, OperandCount::OP2) => {
                let value = self.adjust_variable(operand(0) as u8, -1)?;
                self.do_branch(inst, value < operand(1) as i16)
            }
            (0x05, OperandCount::OP2) => {
                let value = self.adjust_variable(operand(0) as u8, 1)?;
                self.do_branch(inst, value > operand(1) as i16)
            }

            // 2OP:0x0F - loadw, 2OP:0x10 - loadb
            (0x0F, OperandCount::OP2) => {
                let addr = operand(0).wrapping_add(operand(1).wrapping_mul(2));
                let value = self.vm.read_word(addr as u32)?;
                self.store_result(inst, value)?;
                Ok(ExecutionResult::Continue)
            }
            (0x10, OperandCount::OP2) => {
                let addr = operand(0).wrapping_add(operand(1));
                let value = self.vm.read_byte(addr as u32)? as u16;
                self.store_result(inst, value)?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x01 - storew, VAR:0x02 - storeb
            (0x01, OperandCount::VAR) => {
                let addr = operand(0).wrapping_add(operand(1).wrapping_mul(2));
                self.vm.write_word(addr as u32, operand(2))?;
                Ok(ExecutionResult::Continue)
            }
            (0x02, OperandCount::VAR) => {
                let addr = operand(0).wrapping_add(operand(1));
                self.vm.write_byte(addr as u32, operand(2) as u8)?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x17 - scan_table x table len form
            (0x17, OperandCount::VAR) => {
                let form = if operands.len() > 3 { operand(3) } else { 0x82 };
                let found = self.scan_table(operand(0), operand(1), operand(2), form)?;
                self.store_result(inst, found)?;
                self.do_branch(inst, found != 0)
            }

            // VAR:0x1D - copy_table first second size
            (0x1D, OperandCount::VAR) => {
                self.copy_table(operand(0), operand(1), operand(2) as i16)?;
                Ok(ExecutionResult::Continue)
            }

            _ => Err(self.unknown_opcode(inst)),
        }
    }

    /// Add `delta` to a variable in place, returning the new signed value
    fn adjust_variable(&mut self, var: u8, delta: i16) -> Result<i16, String> {
        let value = (self.vm.read_variable_indirect(var)? as i16).wrapping_add(delta);
        self.vm.write_variable_indirect(var, value as u16)?;
        Ok(value)
    }

    /// Address of the first entry equal to `x`, or 0. Bit 7 of `form` selects
    /// word entries, the low bits give the entry length.
    pub(crate) fn scan_table(&self, x: u16, table: u16, len: u16, form: u16) -> Result<u16, String> {
        let entry_len = (form & 0x7F).max(1) as u32;
        let words = form & 0x80 != 0;
        let mut addr = table as u32;
        for _ in 0..len {
            let entry = if words {
                self.vm.read_word(addr)?
            } else {
                self.vm.read_byte(addr)? as u16
            };
            if entry == x {
                debug!("scan_table: {:04x} found at {:04x}", x, addr);
                return Ok(addr as u16);
            }
            addr += entry_len;
        }
        Ok(0)
    }

    /// copy_table: zero `first` when `second` is 0; a negative size forces a
    /// forward byte copy, a positive size copies as if through a buffer.
    pub(crate) fn copy_table(&mut self, first: u16, second: u16, size: i16) -> Result<(), String> {
        let len = size.unsigned_abs() as usize;
        debug!("copy_table {:04x} -> {:04x}, size {}", first, second, size);
        if second == 0 {
            for i in 0..len as u32 {
                self.vm.write_byte(first as u32 + i, 0)?;
            }
            return Ok(());
        }
        if size < 0 {
            return self.vm.copy_bytes(first as u32, second as u32, len);
        }
        let buffer = (0..len as u32)
            .map(|i| self.vm.read_byte(first as u32 + i))
            .collect::<Result<Vec<u8>, String>>()?;
        for (i, byte) in buffer.into_iter().enumerate() {
            self.vm.write_byte(second as u32 + i as u32, byte)?;
        }
        Ok(())
    }
}
