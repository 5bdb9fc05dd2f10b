use crate::interpreter::core::game::Game;
use crate::interpreter::objects::zobject::ObjectLayout;
use log::{debug, trace};
use std::fmt;

/// Maximum size of the VM stack
pub const STACK_SIZE: usize = 1024;

/// Maximum number of local variables per routine
pub const MAX_LOCALS: usize = 15;

/// Represents a call frame on the VM call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Return address (PC to return to)
    pub return_pc: u32,
    /// Where to store the return value (None = discard, Some(n) = variable n)
    pub return_store: Option<u8>,
    /// Number of local variables in this frame
    pub num_locals: u8,
    /// Local variable values
    pub locals: [u16; MAX_LOCALS],
    /// Stack pointer when this routine was called
    pub stack_base: usize,
    /// Number of arguments actually supplied by the caller
    pub arg_count: u8,
}

/// The Z-Machine virtual machine state
pub struct VM {
    /// The game being executed
    pub game: Game,
    /// Program counter - current instruction address
    pub pc: u32,
    /// Main evaluation stack
    pub stack: Vec<u16>,
    /// Call stack for routine invocations
    pub call_stack: Vec<CallFrame>,
    /// Object table geometry for this story's version
    pub object_layout: ObjectLayout,
    globals_addr: u32,
}

impl VM {
    /// Create a new VM instance with the given game
    pub fn new(game: Game) -> Result<Self, String> {
        let globals_addr = game.header.global_variables as u32;
        let object_layout = ObjectLayout::for_version(game.header.version);

        let mut vm = VM {
            game,
            pc: 0,
            stack: Vec::with_capacity(STACK_SIZE),
            call_stack: Vec::new(),
            object_layout,
            globals_addr,
        };
        vm.reset()?;
        Ok(vm)
    }

    /// Reset the execution state to the story's entry point
    pub fn reset(&mut self) -> Result<(), String> {
        self.stack.clear();
        self.call_stack.clear();
        self.globals_addr = self.game.header.global_variables as u32;

        if self.game.header.version == 6 {
            // v6 enters through a packed main routine; returning from it ends the game
            self.pc = 0;
            let main = self.game.header.initial_pc as u16;
            self.call_routine(main, &[], None)?;
        } else {
            self.pc = self.game.header.initial_pc as u32;
        }
        Ok(())
    }

    pub fn version(&self) -> u8 {
        self.game.header.version
    }

    /// Lowest stack index the current routine may pop
    fn stack_floor(&self) -> usize {
        self.call_stack.last().map(|f| f.stack_base).unwrap_or(0)
    }

    /// Push a value onto the evaluation stack
    pub fn push(&mut self, value: u16) -> Result<(), String> {
        if self.stack.len() >= STACK_SIZE {
            return Err(format!("Stack overflow at PC {:05x}", self.pc));
        }
        trace!("push {:04x} depth {}", value, self.stack.len());
        self.stack.push(value);
        Ok(())
    }

    /// Pop a value from the evaluation stack
    pub fn pop(&mut self) -> Result<u16, String> {
        if self.stack.len() <= self.stack_floor() {
            debug!(
                "Stack underflow at PC {:05x}: depth={}, frame base={}, call depth={}",
                self.pc,
                self.stack.len(),
                self.stack_floor(),
                self.call_stack.len()
            );
            return Err(format!("Stack underflow at PC {:05x}", self.pc));
        }
        self.stack
            .pop()
            .ok_or_else(|| format!("Stack underflow at PC {:05x}", self.pc))
    }

    /// Peek at the top of the stack without removing it
    pub fn peek(&self) -> Result<u16, String> {
        if self.stack.len() <= self.stack_floor() {
            return Err(format!("Stack is empty at PC {:05x}", self.pc));
        }
        self.stack
            .last()
            .copied()
            .ok_or_else(|| "Stack is empty".to_string())
    }

    /// Replace the top of the stack in place
    fn replace_top(&mut self, value: u16) -> Result<(), String> {
        let floor = self.stack_floor();
        if self.stack.len() <= floor {
            return Err(format!("Stack is empty at PC {:05x}", self.pc));
        }
        if let Some(top) = self.stack.last_mut() {
            *top = value;
        }
        Ok(())
    }

    /// Read a byte from memory
    pub fn read_byte(&self, addr: u32) -> Result<u8, String> {
        self.game
            .memory
            .get(addr as usize)
            .copied()
            .ok_or_else(|| format!("Memory read out of bounds: {addr:05x}"))
    }

    /// Read a word (2 bytes, big-endian) from memory
    pub fn read_word(&self, addr: u32) -> Result<u16, String> {
        let high = self.read_byte(addr)? as u16;
        let low = self.read_byte(addr + 1)? as u16;
        Ok((high << 8) | low)
    }

    /// Write a byte to memory (only in dynamic memory)
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), String> {
        let dynamic_limit = self.game.header.base_static_mem as u32;
        if addr >= dynamic_limit {
            return Err(format!(
                "Attempt to write to non-dynamic memory at {addr:05x} (static base {dynamic_limit:05x})"
            ));
        }
        match self.game.memory.get_mut(addr as usize) {
            Some(byte) => {
                *byte = value;
                Ok(())
            }
            None => Err(format!("Memory address out of bounds: {addr:05x}")),
        }
    }

    /// Write a word to memory (only in dynamic memory)
    pub fn write_word(&mut self, addr: u32, value: u16) -> Result<(), String> {
        self.write_byte(addr, (value >> 8) as u8)?;
        self.write_byte(addr + 1, (value & 0xFF) as u8)?;
        Ok(())
    }

    /// Byte-wise forward copy; overlapping ranges behave like the plain loop
    pub fn copy_bytes(&mut self, src: u32, dst: u32, len: usize) -> Result<(), String> {
        for i in 0..len as u32 {
            let byte = self.read_byte(src + i)?;
            self.write_byte(dst + i, byte)?;
        }
        Ok(())
    }

    /// Read a global variable (0x10-0xFF)
    pub fn read_global(&self, var: u8) -> Result<u16, String> {
        if var < 0x10 {
            return Err(format!("Invalid global variable number: {var:02x}"));
        }
        let offset = ((var - 0x10) as u32) * 2;
        self.read_word(self.globals_addr + offset)
    }

    /// Write a global variable (0x10-0xFF)
    pub fn write_global(&mut self, var: u8, value: u16) -> Result<(), String> {
        if var < 0x10 {
            return Err(format!("Invalid global variable number: {var:02x}"));
        }
        let offset = ((var - 0x10) as u32) * 2;
        self.write_word(self.globals_addr + offset, value)
    }

    fn local_slot(&self, var: u8) -> Result<usize, String> {
        let frame = self
            .call_stack
            .last()
            .ok_or_else(|| format!("Local variable {var} read with no active routine"))?;
        let index = var as usize - 1;
        if index >= frame.num_locals as usize {
            return Err(format!(
                "Local variable {var} out of range, routine has {} locals (PC {:05x})",
                frame.num_locals, self.pc
            ));
        }
        Ok(index)
    }

    /// Read a variable (0x00 = stack, 0x01-0x0F = local, 0x10-0xFF = global).
    /// Variable 0 pops.
    pub fn read_variable(&mut self, var: u8) -> Result<u16, String> {
        match var {
            0x00 => self.pop(),
            0x01..=0x0F => {
                let index = self.local_slot(var)?;
                Ok(self.call_stack[self.call_stack.len() - 1].locals[index])
            }
            _ => self.read_global(var),
        }
    }

    /// Write a variable. Variable 0 pushes.
    pub fn write_variable(&mut self, var: u8, value: u16) -> Result<(), String> {
        match var {
            0x00 => self.push(value),
            0x01..=0x0F => {
                let index = self.local_slot(var)?;
                let top = self.call_stack.len() - 1;
                self.call_stack[top].locals[index] = value;
                Ok(())
            }
            _ => self.write_global(var, value),
        }
    }

    /// Read a variable named by an operand (inc, dec, load...): variable 0 peeks
    pub fn read_variable_indirect(&mut self, var: u8) -> Result<u16, String> {
        if var == 0 {
            self.peek()
        } else {
            self.read_variable(var)
        }
    }

    /// Write a variable named by an operand: variable 0 replaces the top of stack
    pub fn write_variable_indirect(&mut self, var: u8, value: u16) -> Result<(), String> {
        if var == 0 {
            self.replace_top(value)
        } else {
            self.write_variable(var, value)
        }
    }

    /// Unpack a routine address based on version
    pub fn unpack_routine_address(&self, packed: u16) -> Result<u32, String> {
        let header = &self.game.header;
        let unpacked = match header.version {
            1..=3 => packed as usize * 2,
            4 | 5 => packed as usize * 4,
            6 | 7 => packed as usize * 4 + 8 * header.routine_offset,
            _ => packed as usize * 8,
        };
        if unpacked >= self.game.memory.len() {
            return Err(format!(
                "Packed routine address {packed:04x} unpacks to {unpacked:05x}, beyond story size {:05x}",
                self.game.memory.len()
            ));
        }
        Ok(unpacked as u32)
    }

    /// Unpack a string address based on version
    pub fn unpack_string_address(&self, packed: u16) -> Result<u32, String> {
        let header = &self.game.header;
        let unpacked = match header.version {
            1..=3 => packed as usize * 2,
            4 | 5 => packed as usize * 4,
            6 | 7 => packed as usize * 4 + 8 * header.string_offset,
            _ => packed as usize * 8,
        };
        if unpacked >= self.game.memory.len() {
            return Err(format!(
                "Packed string address {packed:04x} unpacks to {unpacked:05x}, beyond story size"
            ));
        }
        Ok(unpacked as u32)
    }

    /// Enter a routine. Returns false when the packed address is 0, in which case
    /// false has been stored and no frame was created.
    pub fn call_routine(
        &mut self,
        packed_addr: u16,
        args: &[u16],
        return_store: Option<u8>,
    ) -> Result<bool, String> {
        if packed_addr == 0 {
            if let Some(var) = return_store {
                self.write_variable(var, 0)?;
            }
            return Ok(false);
        }

        let addr = self.unpack_routine_address(packed_addr)?;
        let num_locals = self.read_byte(addr)? as usize;
        if num_locals > MAX_LOCALS {
            return Err(format!(
                "Routine at {addr:05x} declares {num_locals} locals (maximum {MAX_LOCALS})"
            ));
        }
        if self.call_stack.len() >= STACK_SIZE {
            return Err(format!("Call stack overflow at PC {:05x}", self.pc));
        }

        let mut frame = CallFrame {
            return_pc: self.pc,
            return_store,
            num_locals: num_locals as u8,
            locals: [0; MAX_LOCALS],
            stack_base: self.stack.len(),
            arg_count: args.len().min(7) as u8,
        };

        let mut pc = addr + 1;
        if self.version() <= 4 {
            // Default values follow the local count
            for i in 0..num_locals {
                frame.locals[i] = self.read_word(pc)?;
                pc += 2;
            }
        }
        let supplied = num_locals.min(args.len());
        frame.locals[..supplied].copy_from_slice(&args[..supplied]);

        debug!(
            "call {:05x} args={:?} store={:?} depth={}",
            addr,
            args,
            return_store,
            self.call_stack.len() + 1
        );

        self.call_stack.push(frame);
        self.pc = pc;
        Ok(true)
    }

    /// Leave the current routine, storing `value` unless the caller discards it
    pub fn return_with(&mut self, value: u16) -> Result<CallFrame, String> {
        let frame = self
            .call_stack
            .pop()
            .ok_or_else(|| format!("Return with empty call stack at PC {:05x}", self.pc))?;

        self.stack.truncate(frame.stack_base);
        self.pc = frame.return_pc;
        debug!(
            "return {} to {:05x} depth={}",
            value,
            frame.return_pc,
            self.call_stack.len()
        );

        if let Some(var) = frame.return_store {
            self.write_variable(var, value)?;
        }
        Ok(frame)
    }

    /// Number of active routine frames
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Arguments supplied to the current routine (0 with no routine)
    pub fn arg_count(&self) -> u8 {
        self.call_stack.last().map(|f| f.arg_count).unwrap_or(0)
    }

    /// Unwind to the frame count recorded by `catch`, then return from it
    pub fn throw(&mut self, value: u16, frame_count: u16) -> Result<CallFrame, String> {
        let target = frame_count as usize;
        if target == 0 || target > self.call_stack.len() {
            return Err(format!(
                "throw to stale frame {target} (depth {})",
                self.call_stack.len()
            ));
        }
        self.call_stack.truncate(target);
        self.return_with(value)
    }
}

impl fmt::Display for VM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VM State:")?;
        writeln!(f, " PC: {:05x}", self.pc)?;
        writeln!(f, " Stack depth: {}", self.stack.len())?;
        writeln!(f, " Call depth: {}", self.call_stack.len())?;
        if let Some(top) = self.stack.last() {
            writeln!(f, " Stack top: {:04x}", top)?;
        }
        Ok(())
    }
}
