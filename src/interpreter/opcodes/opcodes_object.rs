/// Object system operations for Z-Machine interpreter
///
/// This module handles all object-related operations including:
/// - Object hierarchy operations (get_sibling, get_child, get_parent, insert_obj, remove_obj)
/// - Object properties (get_prop, put_prop, get_prop_addr, get_next_prop, get_prop_len)
/// - Object attributes (test_attr, set_attr, clear_attr)
/// - Object relationships (jin - test if object is inside another)
/// - Object display (print_obj - print object's short name)
///
/// Object 0 is "nothing". Stories do pass it by mistake, so it gets a
/// warning and a harmless result instead of halting the machine.
use crate::interpreter::core::instruction::{Instruction, OperandCount};
use crate::interpreter::core::interpreter::{ExecutionResult, Interpreter};
use crate::interpreter::display::Screen;
use crate::interpreter::objects::zobject::ZObjectSystem;
use log::{debug, warn};

impl<S: Screen> Interpreter<S> {
    /// Check if an opcode is handled here
    pub fn is_object_opcode(opcode: u8, operand_count: OperandCount) -> bool {
        match operand_count {
            OperandCount::OP1 => matches!(opcode, 0x01..=0x04 | 0x09 | 0x0A),
            OperandCount::OP2 => matches!(opcode, 0x06 | 0x0A..=0x0C | 0x0E | 0x11..=0x13),
            OperandCount::VAR => opcode == 0x03,
            _ => false,
        }
    }

    /// Log a use of object 0 and report whether the operation should be skipped
    fn is_nothing(&self, inst: &Instruction, obj_num: u16) -> bool {
        if obj_num == 0 {
            warn!(
                "{} on object 0 at PC {:05x}",
                inst.name(self.vm.version()),
                self.vm.pc.saturating_sub(inst.size as u32)
            );
            true
        } else {
            false
        }
    }

    /// Handle object system opcodes
    pub fn execute_object_op(
        &mut self,
        inst: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, String> {
        let obj_num = operands.first().copied().unwrap_or(0);
        let second = operands.get(1).copied().unwrap_or(0);

        match (inst.opcode, inst.operand_count) {
            // ---- 1OP OBJECT OPERATIONS ----

            // 1OP:0x01 - get_sibling, 1OP:0x02 - get_child
            (0x01, OperandCount::OP1) | (0x02, OperandCount::OP1) => {
                let related = if self.is_nothing(inst, obj_num) {
                    0
                } else if inst.opcode == 0x01 {
                    self.vm.get_sibling(obj_num)?
                } else {
                    self.vm.get_child(obj_num)?
                };
                self.store_result(inst, related)?;
                self.do_branch(inst, related != 0)
            }

            // 1OP:0x03 - get_parent
            (0x03, OperandCount::OP1) => {
                let parent = if self.is_nothing(inst, obj_num) {
                    0
                } else {
                    self.vm.get_parent(obj_num)?
                };
                self.store_result(inst, parent)?;
                Ok(ExecutionResult::Continue)
            }

            // 1OP:0x04 - get_prop_len (operand is a property data address)
            (0x04, OperandCount::OP1) => {
                let len = self.vm.get_property_len(obj_num)?;
                self.store_result(inst, len)?;
                Ok(ExecutionResult::Continue)
            }

            // 1OP:0x09 - remove_obj
            (0x09, OperandCount::OP1) => {
                if !self.is_nothing(inst, obj_num) {
                    debug!("remove_obj {}", obj_num);
                    self.vm.remove_object(obj_num)?;
                }
                Ok(ExecutionResult::Continue)
            }

            // 1OP:0x0A - print_obj
            (0x0A, OperandCount::OP1) => {
                if !self.is_nothing(inst, obj_num) {
                    let name = self.vm.object_name(obj_num)?;
                    self.output_text(&name)?;
                }
                Ok(ExecutionResult::Continue)
            }

            // ---- 2OP OBJECT OPERATIONS ----

            // 2OP:0x06 - jin
            (0x06, OperandCount::OP2) => {
                let inside = if self.is_nothing(inst, obj_num) {
                    false
                } else {
                    self.vm.get_parent(obj_num)? == second
                };
                self.do_branch(inst, inside)
            }

            // 2OP:0x0A - test_attr
            (0x0A, OperandCount::OP2) => {
                let set = if self.is_nothing(inst, obj_num) {
                    false
                } else {
                    self.vm.test_attribute(obj_num, second)?
                };
                self.do_branch(inst, set)
            }

            // 2OP:0x0B - set_attr, 2OP:0x0C - clear_attr
            (0x0B, OperandCount::OP2) | (0x0C, OperandCount::OP2) => {
                if !self.is_nothing(inst, obj_num) {
                    self.vm
                        .set_attribute(obj_num, second, inst.opcode == 0x0B)?;
                }
                Ok(ExecutionResult::Continue)
            }

            // 2OP:0x0E - insert_obj
            (0x0E, OperandCount::OP2) => {
                if !self.is_nothing(inst, obj_num) && !self.is_nothing(inst, second) {
                    debug!("insert_obj {} into {}", obj_num, second);
                    self.vm.insert_object(obj_num, second)?;
                }
                Ok(ExecutionResult::Continue)
            }

            // 2OP:0x11 - get_prop
            (0x11, OperandCount::OP2) => {
                let value = if self.is_nothing(inst, obj_num) {
                    0
                } else {
                    self.vm.get_property(obj_num, second)?
                };
                self.store_result(inst, value)?;
                Ok(ExecutionResult::Continue)
            }

            // 2OP:0x12 - get_prop_addr
            (0x12, OperandCount::OP2) => {
                let addr = if self.is_nothing(inst, obj_num) {
                    0
                } else {
                    self.vm.get_property_addr(obj_num, second)?
                };
                self.store_result(inst, addr)?;
                Ok(ExecutionResult::Continue)
            }

            // 2OP:0x13 - get_next_prop
            (0x13, OperandCount::OP2) => {
                let next = if self.is_nothing(inst, obj_num) {
                    0
                } else {
                    self.vm.get_next_property(obj_num, second)?
                };
                self.store_result(inst, next)?;
                Ok(ExecutionResult::Continue)
            }

            // VAR:0x03 - put_prop
            (0x03, OperandCount::VAR) => {
                if !self.is_nothing(inst, obj_num) {
                    let value = operands.get(2).copied().unwrap_or(0);
                    self.vm.put_property(obj_num, second, value)?;
                }
                Ok(ExecutionResult::Continue)
            }

            _ => Err(self.unknown_opcode(inst)),
        }
    }
}
