/// Stack and routine call operations for Z-Machine interpreter
///
/// This module handles all stack-related opcodes including:
/// - Stack manipulation (push, pull, pop, and the v6 user stacks)
/// - Routine calls and returns (the call family, ret, rtrue, rfalse, ret_popped)
/// - Non-local exits (catch, throw) and jump
///
/// These operations are fundamental to Z-Machine execution as they manage
/// the call stack, local/global variable access, and routine execution flow.
use crate::interpreter::core::instruction::{Instruction, OperandCount, OperandType};
use crate::interpreter::core::interpreter::{ExecutionResult, Interpreter};
use crate::interpreter::display::Screen;
use log::debug;

impl<S: Screen> Interpreter<S> {
    /// Check if an opcode is a stack operation
    pub fn is_stack_opcode(opcode: u8, operand_count: OperandCount, version: u8) -> bool {
        match operand_count {
            OperandCount::OP0 => matches!(opcode, 0x00 | 0x01 | 0x08 | 0x09),
            OperandCount::OP1 => {
                matches!(opcode, 0x08 | 0x0B | 0x0C) || (opcode == 0x0F && version >= 5)
            }
            OperandCount::OP2 => matches!(opcode, 0x19 | 0x1A | 0x1C),
            OperandCount::VAR => {
                matches!(opcode, 0x00 | 0x08 | 0x09 | 0x0C | 0x19 | 0x1A | 0x1F)
            }
            OperandCount::EXT => matches!(opcode, 0x15 | 0x18),
        }
    }

    /// Handle stack and call-related opcodes
    pub fn execute_stack_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        let operand = |i: usize| operands.get(i).copied().unwrap_or(0);

        match (inst.opcode, inst.operand_count) {
            // ---- RETURNS ----

            // 0OP:0x00 - rtrue, 0OP:0x01 - rfalse
            (0x00, OperandCount::OP0) => self.do_return(1),
            (0x01, OperandCount::OP0) => self.do_return(0),

            // 0OP:0x08 - ret_popped
            (0x08, OperandCount::OP0) => {
                let value = self.vm.pop()?;
                debug!("ret_popped {}", value);
                self.do_return(value)
            }

            // 1OP:0x0B - ret
            (0x0B, OperandCount::OP1) => self.do_return(operand(0)),

            // 0OP:0x09 - pop (V1-4) / catch (V5+)
            (0x09, OperandCount::OP0) => {
                if self.vm.version() <= 4 {
                    self.vm.pop()?;
                } else {
                    let frame = self.vm.call_depth() as u16;
                    debug!("catch -> frame {}", frame);
                    self.store_result(inst, frame)?;
                }
                Ok(ExecutionResult::Continue)
            }

            // 2OP:0x1C - throw value frame
            (0x1C, OperandCount::OP2) => {
                debug!("throw {} to frame {}", operand(0), operand(1));
                self.vm.throw(operand(0), operand(1))?;
                Ok(ExecutionResult::Returned(operand(0)))
            }

            // 1OP:0x0C - jump (not a branch instruction; the operand is the offset)
            (0x0C, OperandCount::OP1) => {
                let offset = operand(0) as i16;
                let new_pc = (self.vm.pc as i64 + offset as i64 - 2) as u32;
                debug!("jump {:05x} -> {:05x}", self.vm.pc, new_pc);
                self.vm.pc = new_pc;
                Ok(ExecutionResult::Branched)
            }

            // ---- CALLS ----

            // 1OP:0x08 - call_1s, 1OP:0x0F - call_1n
            (0x08, OperandCount::OP1) | (0x0F, OperandCount::OP1) => {
                self.do_call(operand(0), &[], inst.store_var)
            }

            // 2OP:0x19 - call_2s, 2OP:0x1A - call_2n
            (0x19, OperandCount::OP2) | (0x1A, OperandCount::OP2) => {
                self.do_call(operand(0), operands.get(1..).unwrap_or(&[]), inst.store_var)
            }

            // VAR:0x00 call_vs, VAR:0x0C call_vs2, VAR:0x19 call_vn, VAR:0x1A call_vn2
            (0x00, OperandCount::VAR)
            | (0x0C, OperandCount::VAR)
            | (0x19, OperandCount::VAR)
            | (0x1A, OperandCount::VAR) => {
                let args = operands.get(1..).unwrap_or(&[]);
                self.do_call(operand(0), args, inst.store_var)
            }

            // VAR:0x1F - check_arg_count
            (0x1F, OperandCount::VAR) => {
                let supplied = self.vm.arg_count() as u16;
                self.do_branch(inst, operand(0) <= supplied)
            }

            // ---- STACK ----

            // VAR:0x08 - push
            (0x08, OperandCount::VAR) => {
                self.vm.push(operand(0))?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x09 - pull (v6 stores, optionally from a user stack)
            (0x09, OperandCount::VAR) => {
                if self.vm.version() == 6 {
                    let value = if operands.is_empty() {
                        self.vm.pop()?
                    } else {
                        self.pop_user_stack(operand(0), 1)?
                    };
                    self.store_result(inst, value)?;
                } else {
                    let value = self.vm.pop()?;
                    // The operand names the destination; a variable operand is indirect
                    let var = match inst.operand_types.first() {
                        Some(OperandType::Variable) => operand(0),
                        _ => inst.operands.first().copied().unwrap_or(0),
                    };
                    self.vm.write_variable_indirect(var as u8, value)?;
                }
                Ok(ExecutionResult::Continue)
            }

            // EXT:0x15 - pop_stack items stack
            (0x15, OperandCount::EXT) => {
                if operands.len() > 1 {
                    self.pop_user_stack(operand(1), operand(0))?;
                } else {
                    for _ in 0..operand(0) {
                        self.vm.pop()?;
                    }
                }
                Ok(ExecutionResult::Continue)
            }

            // EXT:0x18 - push_stack value stack
            (0x18, OperandCount::EXT) => {
                let table = operand(1) as u32;
                let free = self.vm.read_word(table)?;
                if free == 0 {
                    debug!("push_stack: user stack at {:04x} is full", table);
                    return self.do_branch(inst, false);
                }
                self.vm.write_word(table + 2 * free as u32, operand(0))?;
                self.vm.write_word(table, free - 1)?;
                self.do_branch(inst, true)
            }

            _ => Err(self.unknown_opcode(inst)),
        }
    }

    /// Discard `count` values from a user stack, returning the last one removed.
    /// The table's first word counts free slots; values grow downward from the end.
    fn pop_user_stack(&mut self, table: u16, count: u16) -> Result<u16, String> {
        let table = table as u32;
        let mut free = self.vm.read_word(table)?;
        let mut value = 0;
        for _ in 0..count {
            free = free.wrapping_add(1);
            value = self.vm.read_word(table + 2 * free as u32)?;
        }
        self.vm.write_word(table, free)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::core::interpreter::RunState;
    use crate::interpreter::utils::test_utils::run_code;

    #[test]
    fn test_call_and_store_return() {
        let interp = run_code(3, |b| {
            // routine(a, b): add a b -> sp ; ret_popped
            let routine = b.routine(0x3000, 2, &[0, 0], &[0x74, 0x01, 0x02, 0x00, 0xB8]);
            let [hi, lo] = routine.to_be_bytes();
            // call routine 7 9 -> G00
            b.code(&[0xE0, 0x17, hi, lo, 0x07, 0x09, 0x10]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 16);
        assert!(interp.vm.call_stack.is_empty());
        assert!(interp.vm.stack.is_empty());
    }

    #[test]
    fn test_call_address_zero_stores_false() {
        let interp = run_code(3, |b| {
            // store G00 9 ; call 0 -> G00
            b.code(&[0x0D, 0x10, 0x09]);
            b.code(&[0xE0, 0x3F, 0x00, 0x00, 0x10]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 0);
        assert_eq!(interp.state(), &RunState::Quit);
    }

    #[test]
    fn test_default_locals_and_arg_count() {
        let interp = run_code(5, |b| {
            // routine with 3 locals: check_arg_count 2 ?rtrue ; rfalse
            let routine = b.routine(0x3000, 3, &[], &[0xFF, 0x7F, 0x02, 0xC1, 0xB1]);
            let [hi, lo] = routine.to_be_bytes();
            // call_vs routine 1 -> G00 ; call_vs routine 1 2 -> G01
            b.code(&[0xE0, 0x1F, hi, lo, 0x01, 0x10]);
            b.code(&[0xE0, 0x17, hi, lo, 0x01, 0x02, 0x11]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 0);
        assert_eq!(interp.vm.read_global(0x11).unwrap(), 1);
    }

    #[test]
    fn test_pull_into_stack_top_replaces() {
        let interp = run_code(3, |b| {
            // push 1 ; push 2 ; pull sp
            b.code(&[0xE8, 0x7F, 0x01]);
            b.code(&[0xE8, 0x7F, 0x02]);
            b.code(&[0xE9, 0x7F, 0x00]);
        })
        .unwrap();
        assert_eq!(interp.vm.stack, vec![2]);
    }

    #[test]
    fn test_catch_and_throw() {
        let interp = run_code(5, |b| {
            // inner(frame): throw 42 frame
            let inner = b.routine(0x3100, 1, &[], &[0x3C, 0x2A, 0x01]);
            let [ihi, ilo] = inner.to_be_bytes();
            // outer: catch -> L01 ; call_vs inner L01 -> sp ; rtrue
            let outer = b.routine(
                0x3000,
                1,
                &[],
                &[0xB9, 0x01, 0xE0, 0x2F, ihi, ilo, 0x01, 0x00, 0xB0],
            );
            let [ohi, olo] = outer.to_be_bytes();
            // call_vs outer -> G00
            b.code(&[0xE0, 0x3F, ohi, olo, 0x10]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 42);
        assert!(interp.vm.call_stack.is_empty());
    }

    #[test]
    fn test_throw_to_stale_frame_halts() {
        let result = run_code(5, |b| {
            // throw 1 5 at top level
            b.code(&[0x1C, 0x01, 0x05]);
        });
        assert!(result.unwrap_err().contains("stale frame"));
    }

    #[test]
    fn test_underflow_halts() {
        let result = run_code(3, |b| {
            // ret_popped inside a routine with an empty frame stack
            let routine = b.routine(0x3000, 0, &[], &[0xB8]);
            let [hi, lo] = routine.to_be_bytes();
            b.code(&[0xE8, 0x7F, 0x05]);
            b.code(&[0xE0, 0x3F, hi, lo, 0x10]);
        });
        assert!(result.unwrap_err().contains("Stack underflow"));
    }

    #[test]
    fn test_user_stack_push_and_pull() {
        let interp = run_code(6, |b| {
            // user stack with two free slots
            b.set_word(0x0C00, 2);
            // push_stack 7 0x0C00 ; push_stack 8 0x0C00 (branches on failure are no-ops)
            b.code(&[0xBE, 0x18, 0x4F, 0x07, 0x0C, 0x00, 0x42]);
            b.code(&[0xBE, 0x18, 0x4F, 0x08, 0x0C, 0x00, 0x42]);
            // push_stack 9 0x0C00 overflows
            b.code(&[0xBE, 0x18, 0x4F, 0x09, 0x0C, 0x00, 0xC2]);
            // pull 0x0C00 -> G00
            b.code(&[0xE9, 0x3F, 0x0C, 0x00, 0x10]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 8);
        assert_eq!(interp.vm.read_word(0x0C00).unwrap(), 1);
        assert_eq!(interp.vm.read_word(0x0C02).unwrap(), 8);
        assert_eq!(interp.vm.read_word(0x0C04).unwrap(), 7);
    }
}
