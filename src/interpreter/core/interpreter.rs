use crate::config::Config;
use crate::interpreter::core::instruction::{
    BranchInfo, Instruction, InstructionForm, OperandCount, OperandType,
};
use crate::interpreter::core::vm::VM;
use crate::interpreter::display::Screen;
use crate::interpreter::quetzal::{
    restore_from_bytes, save_to_bytes, PortableGameState, SaveStore, UndoRing,
};
use crate::interpreter::text::ZText;
use crate::interpreter::utils::header::FLAGS2_TRANSCRIPT;
use crate::interpreter::utils::zrand::ZRand;
use log::{debug, error, info, warn};

/// Output stream 3 tables may nest this deep
pub const MAX_STREAM3_DEPTH: usize = 16;

/// Save name used when the story does not supply one
pub const DEFAULT_SAVE_NAME: &str = "save";

/// Result of executing an instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Continue execution normally
    Continue,
    /// Branch taken, PC already updated
    Branched,
    /// Routine called, PC updated
    Called,
    /// Routine returned
    Returned(u16),
    /// Game should quit
    Quit,
    /// A read opcode is waiting for the host
    WaitForInput,
}

/// A pending line read (sread / aread)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    pub text_buffer: u32,
    pub parse_buffer: u32,
    pub store_var: Option<u8>,
    /// Characters the text buffer can take
    pub max_len: usize,
    /// Tenths of a second between timer interrupts, 0 for none
    pub timeout: u16,
    /// Packed address of the interrupt routine
    pub routine: u16,
}

/// A pending read_char
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharRequest {
    pub store_var: Option<u8>,
    pub timeout: u16,
    pub routine: u16,
}

/// What the run loop is doing, as seen by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    WaitingForLine(LineRequest),
    WaitingForChar(CharRequest),
    Quit,
    Halted(String),
}

/// State for managing output stream redirection
#[derive(Debug)]
pub(crate) struct OutputStreamState {
    /// Stream 1 (the screen) selected
    pub(crate) screen: bool,
    /// Stream 4 (player commands) selected
    pub(crate) commands: bool,
    /// Open stream 3 tables, innermost last
    pub(crate) stream3_tables: Vec<u32>,
}

impl OutputStreamState {
    fn new() -> Self {
        OutputStreamState {
            screen: true,
            commands: false,
            stream3_tables: Vec::new(),
        }
    }
}

/// The main Z-Machine interpreter
pub struct Interpreter<S: Screen> {
    /// The VM state
    pub vm: VM,
    /// Output collaborator
    pub screen: S,
    pub(crate) save_store: Box<dyn SaveStore>,
    pub(crate) rng: ZRand,
    pub(crate) undo: UndoRing,
    pub(crate) config: Config,
    pub(crate) output_streams: OutputStreamState,
    /// Selected input stream: 0 keyboard, 1 command file
    pub input_stream: u16,
    pub(crate) save_name: String,
    state: RunState,
    /// Instructions executed since the last input
    pub(crate) instruction_count: u64,
}

impl<S: Screen> std::fmt::Debug for Interpreter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("input_stream", &self.input_stream)
            .field("instruction_count", &self.instruction_count)
            .finish_non_exhaustive()
    }
}

impl<S: Screen> Interpreter<S> {
    /// Create a new interpreter; writes the configured header capability fields
    pub fn new(mut vm: VM, screen: S, save_store: Box<dyn SaveStore>, config: Config) -> Self {
        vm.game.apply_config(&config);
        let rng = match config.random_seed {
            Some(seed) => ZRand::new_predictable(seed),
            None => ZRand::new_uniform(),
        };
        info!(
            "Interpreter ready: v{} story, {} undo slots",
            vm.version(),
            config.undo_slots
        );

        Interpreter {
            vm,
            screen,
            save_store,
            rng,
            undo: UndoRing::new(config.undo_slots),
            config,
            output_streams: OutputStreamState::new(),
            input_stream: 0,
            save_name: DEFAULT_SAVE_NAME.to_string(),
            state: RunState::Running,
            instruction_count: 0,
        }
    }

    /// Name under which save / restore store their blob
    pub fn set_save_name(&mut self, name: &str) {
        self.save_name = name.to_string();
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn set_state(&mut self, state: RunState) {
        self.state = state;
    }

    /// Run until the story waits for input, quits or halts
    pub fn run(&mut self) -> Result<RunState, String> {
        while self.state == RunState::Running {
            if let Some(limit) = self.config.instruction_limit {
                if self.instruction_count >= limit {
                    let message = format!("Instruction limit of {limit} exceeded");
                    error!("{}", message);
                    self.state = RunState::Halted(message.clone());
                    return Err(message);
                }
            }
            if let Err(e) = self.step() {
                error!("Halted at PC {:05x}: {}", self.vm.pc, e);
                self.state = RunState::Halted(e.clone());
                return Err(e);
            }
        }
        Ok(self.state.clone())
    }

    /// Fetch, decode and execute one instruction
    pub fn step(&mut self) -> Result<ExecutionResult, String> {
        let pc = self.vm.pc;
        let version = self.vm.version();
        let inst = Instruction::decode(&self.vm.game.memory, pc as usize, version)
            .map_err(|e| format!("Error decoding instruction at {pc:05x}: {e}"))?;
        debug!("{:05x}: {}", pc, inst.format_with_version(version));

        self.vm.pc += inst.size as u32;
        self.instruction_count += 1;

        let result = self.execute_instruction(&inst)?;
        match result {
            ExecutionResult::Quit => {
                info!("Story quit");
                self.state = RunState::Quit;
            }
            ExecutionResult::Returned(_) if version == 6 && self.vm.call_stack.is_empty() => {
                info!("Main routine returned");
                self.state = RunState::Quit;
            }
            _ => {}
        }
        Ok(result)
    }

    /// Execute a single instruction
    pub fn execute_instruction(&mut self, inst: &Instruction) -> Result<ExecutionResult, String> {
        // Get operand values
        let operands = self.resolve_operands(inst)?;
        let version = self.vm.version();

        if Self::is_stack_opcode(inst.opcode, inst.operand_count, version) {
            return self.execute_stack_op(inst, &operands);
        }
        if Self::is_math_opcode(inst.opcode, inst.operand_count, version) {
            return self.execute_math_op(inst, &operands);
        }
        if Self::is_memory_opcode(inst.opcode, inst.operand_count) {
            return self.execute_memory_op(inst, &operands);
        }
        if Self::is_object_opcode(inst.opcode, inst.operand_count) {
            return self.execute_object_op(inst, &operands);
        }
        if Self::is_io_opcode(inst.opcode, inst.operand_count) {
            return self.execute_io_op(inst, &operands);
        }
        if Self::is_display_opcode(inst.opcode, inst.operand_count, version) {
            return self.execute_display_op(inst, &operands);
        }

        match inst.form {
            InstructionForm::Extended => self.execute_ext(inst, &operands),
            _ => match inst.operand_count {
                OperandCount::OP0 => self.execute_0op(inst),
                OperandCount::VAR => self.execute_var(inst, &operands),
                _ => Err(self.unknown_opcode(inst)),
            },
        }
    }

    /// Resolve operand values (handle variables vs constants)
    pub fn resolve_operands(&mut self, inst: &Instruction) -> Result<Vec<u16>, String> {
        let mut values = Vec::with_capacity(inst.operands.len());
        for (i, &operand) in inst.operands.iter().enumerate() {
            let value = match inst.operand_types[i] {
                // Variable 0 pops when used as an operand
                OperandType::Variable => self.vm.read_variable(operand as u8)?,
                _ => operand,
            };
            values.push(value);
        }
        Ok(values)
    }

    pub(crate) fn unknown_opcode(&self, inst: &Instruction) -> String {
        format!(
            "Unknown opcode {}:{} (0x{:02x}) for version {} at {:05x}",
            inst.operand_count,
            inst.opcode,
            inst.opcode,
            self.vm.version(),
            self.vm.pc.saturating_sub(inst.size as u32)
        )
    }

    /// Write the instruction's result, if it stores one
    pub(crate) fn store_result(&mut self, inst: &Instruction, value: u16) -> Result<(), String> {
        if let Some(store_var) = inst.store_var {
            self.vm.write_variable(store_var, value)?;
        }
        Ok(())
    }

    /// 0OP system instructions not claimed by a category module
    fn execute_0op(&mut self, inst: &Instruction) -> Result<ExecutionResult, String> {
        match inst.opcode {
            0x04 => Ok(ExecutionResult::Continue), // nop
            0x05 => self.do_save(inst, None),
            0x06 => self.do_restore(inst, None),
            0x07 => self.do_restart(),
            0x0A => Ok(ExecutionResult::Quit),
            0x0D => {
                let expected = self.vm.game.header.checksum_file;
                let actual = self.vm.game.checksum();
                debug!("verify: expected {:04x}, actual {:04x}", expected, actual);
                self.do_branch(inst, expected == actual)
            }
            0x0F => self.do_branch(inst, true), // piracy
            _ => Err(self.unknown_opcode(inst)),
        }
    }

    /// VAR system instructions not claimed by a category module
    fn execute_var(&mut self, inst: &Instruction, operands: &[u16]) -> Result<ExecutionResult, String> {
        match inst.opcode {
            0x07 => {
                let range = operands.first().copied().unwrap_or(0) as i16;
                let value = if range > 0 {
                    self.rng.gen_range(range as u16)
                } else if range < 0 {
                    self.rng.seed(range.unsigned_abs());
                    0
                } else {
                    self.rng.reseed_random();
                    0
                };
                debug!("random {} -> {}", range, value);
                self.store_result(inst, value)?;
                Ok(ExecutionResult::Continue)
            }
            _ => Err(self.unknown_opcode(inst)),
        }
    }

    /// EXT system instructions not claimed by a category module
    fn execute_ext(&mut self, inst: &Instruction, operands: &[u16]) -> Result<ExecutionResult, String> {
        match inst.opcode {
            0x00 => self.do_save(inst, Some(operands)),
            0x01 => self.do_restore(inst, Some(operands)),
            0x09 => self.do_save_undo(inst),
            0x0A => self.do_restore_undo(inst),
            _ => Err(self.unknown_opcode(inst)),
        }
    }

    /// Handle branching
    pub(crate) fn do_branch(
        &mut self,
        inst: &Instruction,
        condition: bool,
    ) -> Result<ExecutionResult, String> {
        match inst.branch {
            Some(ref branch) => self.take_branch(branch, condition),
            None => Ok(ExecutionResult::Continue),
        }
    }

    /// Apply decoded branch data; the PC must already be past it
    pub(crate) fn take_branch(
        &mut self,
        branch: &BranchInfo,
        condition: bool,
    ) -> Result<ExecutionResult, String> {
        if condition != branch.on_true {
            return Ok(ExecutionResult::Continue);
        }
        match branch.offset {
            0 => self.do_return(0), // rfalse
            1 => self.do_return(1), // rtrue
            offset => {
                // Jump is relative to the address after the branch data
                let new_pc = (self.vm.pc as i64 + offset as i64 - 2) as u32;
                debug!("branch {:05x} -> {:05x}", self.vm.pc, new_pc);
                self.vm.pc = new_pc;
                Ok(ExecutionResult::Branched)
            }
        }
    }

    /// Enter a routine; packed address 0 stores false and continues
    pub(crate) fn do_call(
        &mut self,
        packed_addr: u16,
        args: &[u16],
        store_var: Option<u8>,
    ) -> Result<ExecutionResult, String> {
        if self.vm.call_routine(packed_addr, args, store_var)? {
            Ok(ExecutionResult::Called)
        } else {
            Ok(ExecutionResult::Continue)
        }
    }

    pub(crate) fn do_return(&mut self, value: u16) -> Result<ExecutionResult, String> {
        self.vm.return_with(value)?;
        Ok(ExecutionResult::Returned(value))
    }

    /// Call a timer routine and execute it to completion
    pub(crate) fn call_timer_routine(&mut self, routine_addr: u16) -> Result<u16, String> {
        debug!("Calling timer routine at 0x{:04x}", routine_addr);

        let saved_pc = self.vm.pc;
        let saved_call_depth = self.vm.call_depth();

        if !self.vm.call_routine(routine_addr, &[], None)? {
            return Ok(0);
        }

        let mut return_value = 0;
        while self.vm.call_depth() > saved_call_depth {
            let pc = self.vm.pc;
            let version = self.vm.version();
            let inst = Instruction::decode(&self.vm.game.memory, pc as usize, version)
                .map_err(|e| format!("Error decoding instruction at {pc:05x}: {e}"))?;
            self.vm.pc += inst.size as u32;

            match self.execute_instruction(&inst)? {
                ExecutionResult::Returned(value) => return_value = value,
                ExecutionResult::Quit => {
                    self.state = RunState::Quit;
                    return Ok(1);
                }
                ExecutionResult::WaitForInput => {
                    return Err("Timer routine tried to read input".to_string());
                }
                _ => {}
            }
        }

        debug!("Timer routine returned: {}", return_value);
        self.vm.pc = saved_pc;
        Ok(return_value)
    }

    /// Reload the story and start again, keeping transcript settings
    fn do_restart(&mut self) -> Result<ExecutionResult, String> {
        info!("Restarting story");
        self.vm.game.restart_image();
        self.vm.game.apply_config(&self.config);
        self.vm.reset()?;
        self.output_streams.stream3_tables.clear();
        self.undo.clear();
        self.instruction_count = 0;
        Ok(ExecutionResult::Continue)
    }

    /// Where a restored game resumes: the save instruction's branch data in
    /// v1-3, its store byte in v4+
    fn resume_pc(&self, inst: &Instruction) -> u32 {
        match inst.branch {
            Some(ref branch) => self.vm.pc - branch.len as u32,
            None => self.vm.pc - 1,
        }
    }

    /// Report the outcome of a save or restore: branch in v1-3, store otherwise
    fn finish_save_op(&mut self, inst: &Instruction, value: u16) -> Result<ExecutionResult, String> {
        if inst.branch.is_some() {
            self.do_branch(inst, value != 0)
        } else {
            self.store_result(inst, value)?;
            Ok(ExecutionResult::Continue)
        }
    }

    /// Continue a restored game from its resume PC as if the save succeeded
    /// with result 2
    fn resume_restored(&mut self) -> Result<ExecutionResult, String> {
        if self.vm.version() <= 3 {
            let branch = BranchInfo::decode(&self.vm.game.memory, self.vm.pc as usize)?;
            self.vm.pc = branch.next_addr as u32;
            self.take_branch(&branch, true)
        } else {
            let var = self.vm.read_byte(self.vm.pc)?;
            self.vm.pc += 1;
            self.vm.write_variable(var, 2)?;
            Ok(ExecutionResult::Continue)
        }
    }

    /// Name of the auxiliary file in a v5 save/restore table form
    fn aux_name(&self, name_addr: u16) -> Result<String, String> {
        if name_addr == 0 {
            return Ok(format!("{}.aux", self.save_name));
        }
        let len = self.vm.read_byte(name_addr as u32)? as u32;
        (1..=len)
            .map(|i| self.vm.read_byte(name_addr as u32 + i).map(|b| b as char))
            .collect()
    }

    /// save (0OP v1-4, EXT v5+). With a table operand only that table is written.
    fn do_save(&mut self, inst: &Instruction, ext: Option<&[u16]>) -> Result<ExecutionResult, String> {
        if let Some([table, bytes, rest @ ..]) = ext {
            let (table, bytes) = (*table, *bytes);
            if table != 0 {
                let name = self.aux_name(rest.first().copied().unwrap_or(0))?;
                let data = (0..bytes as u32)
                    .map(|i| self.vm.read_byte(table as u32 + i))
                    .collect::<Result<Vec<u8>, String>>()?;
                let ok = self.save_store.save_blob(&name, &data);
                info!("Saved {} bytes of table {:04x} as '{}': {}", bytes, table, name, ok);
                return self.finish_save_op(inst, ok as u16);
            }
        }

        let data = save_to_bytes(&self.vm, self.resume_pc(inst));
        let ok = self.save_store.save_blob(&self.save_name, &data);
        info!("Saved game as '{}' ({} bytes): {}", self.save_name, data.len(), ok);
        self.finish_save_op(inst, ok as u16)
    }

    /// restore (0OP v1-4, EXT v5+). A failed restore leaves the machine untouched.
    fn do_restore(
        &mut self,
        inst: &Instruction,
        ext: Option<&[u16]>,
    ) -> Result<ExecutionResult, String> {
        if let Some([table, bytes, rest @ ..]) = ext {
            let (table, bytes) = (*table, *bytes);
            if table != 0 {
                let name = self.aux_name(rest.first().copied().unwrap_or(0))?;
                let Some(data) = self.save_store.load_blob(&name) else {
                    return self.finish_save_op(inst, 0);
                };
                let count = data.len().min(bytes as usize);
                for (i, &byte) in data[..count].iter().enumerate() {
                    self.vm.write_byte(table as u32 + i as u32, byte)?;
                }
                return self.finish_save_op(inst, count as u16);
            }
        }

        let Some(data) = self.save_store.load_blob(&self.save_name) else {
            warn!("No saved game named '{}'", self.save_name);
            return self.finish_save_op(inst, 0);
        };
        if let Err(e) = restore_from_bytes(&mut self.vm, &data) {
            warn!("Restore failed: {}", e);
            return self.finish_save_op(inst, 0);
        }
        self.vm.game.apply_config(&self.config);
        self.output_streams.stream3_tables.clear();
        // snapshots taken before the restore belong to another timeline
        self.undo.clear();
        self.resume_restored()
    }

    /// save_undo: 1 on success, -1 when undo is switched off
    fn do_save_undo(&mut self, inst: &Instruction) -> Result<ExecutionResult, String> {
        if !self.undo.is_enabled() {
            self.store_result(inst, 0xFFFF)?;
            return Ok(ExecutionResult::Continue);
        }
        let state = PortableGameState::capture(&self.vm, self.resume_pc(inst));
        self.undo.push(state);
        self.store_result(inst, 1)?;
        Ok(ExecutionResult::Continue)
    }

    /// restore_undo: 0 when nothing can be undone
    fn do_restore_undo(&mut self, inst: &Instruction) -> Result<ExecutionResult, String> {
        let Some(state) = self.undo.pop() else {
            self.store_result(inst, 0)?;
            return Ok(ExecutionResult::Continue);
        };
        if let Err(e) = state.apply(&mut self.vm) {
            warn!("Undo failed: {}", e);
            self.store_result(inst, 0)?;
            return Ok(ExecutionResult::Continue);
        }
        self.output_streams.stream3_tables.clear();
        self.resume_restored()
    }

    /// Text codec for the current story image
    pub(crate) fn text(&self) -> ZText<'_> {
        ZText::new(&self.vm.game.memory, &self.vm.game.header)
    }

    /// Whether output stream 2 is on (tracked in flags 2)
    pub(crate) fn transcript_enabled(&self) -> bool {
        self.vm.game.flags2() & FLAGS2_TRANSCRIPT != 0
    }

    /// Select or deselect output stream 3
    pub(crate) fn enable_stream3(&mut self, table_addr: u32) -> Result<(), String> {
        if self.output_streams.stream3_tables.len() >= MAX_STREAM3_DEPTH {
            return Err(format!(
                "Output stream 3 nested deeper than {MAX_STREAM3_DEPTH}"
            ));
        }
        debug!("enable_stream3: redirecting to table at 0x{:04x}", table_addr);
        self.vm.write_word(table_addr, 0)?;
        self.output_streams.stream3_tables.push(table_addr);
        Ok(())
    }

    pub(crate) fn disable_stream3(&mut self) {
        if self.output_streams.stream3_tables.pop().is_none() {
            debug!("disable_stream3: no active stream 3 to disable");
        }
    }

    /// Output text to whichever streams are selected
    pub(crate) fn output_text(&mut self, text: &str) -> Result<(), String> {
        if text.is_empty() {
            return Ok(());
        }
        // Stream 3 captures exclusively
        if let Some(&table_addr) = self.output_streams.stream3_tables.last() {
            let zscii: Vec<u8> = {
                let codec = self.text();
                text.chars()
                    .map(|ch| match ch {
                        '\n' => 13,
                        _ => codec.char_to_zscii(ch).unwrap_or(b'?'),
                    })
                    .collect()
            };
            let count = self.vm.read_word(table_addr)?;
            for (i, byte) in zscii.iter().enumerate() {
                let addr = table_addr + 2 + count as u32 + i as u32;
                self.vm.write_byte(addr, *byte)?;
            }
            self.vm
                .write_word(table_addr, count.wrapping_add(zscii.len() as u16))?;
            return Ok(());
        }

        if self.output_streams.screen {
            self.screen.print(text)?;
        }
        if self.transcript_enabled() {
            self.screen.transcript(text)?;
        }
        Ok(())
    }

    /// Output a single character
    pub(crate) fn output_char(&mut self, ch: char) -> Result<(), String> {
        let mut buf = [0u8; 4];
        self.output_text(ch.encode_utf8(&mut buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::display::HeadlessScreen;
    use crate::interpreter::quetzal::MemorySaveStore;
    use crate::interpreter::utils::test_utils::{run_code, StoryBuilder, CODE_ADDR};

    fn create_test_interpreter(code: &[u8]) -> Interpreter<HeadlessScreen> {
        let mut builder = StoryBuilder::new(3);
        builder.code(code);
        let vm = VM::new(builder.build_game().unwrap()).unwrap();
        Interpreter::new(
            vm,
            HeadlessScreen::new(),
            Box::new(MemorySaveStore::new()),
            Config::default(),
        )
    }

    #[test]
    fn test_simple_execution() {
        // push 42, pop, quit
        let mut interp = create_test_interpreter(&[0xE8, 0x7F, 0x2A, 0xB9, 0xBA]);

        assert_eq!(interp.step().unwrap(), ExecutionResult::Continue);
        assert_eq!(interp.vm.stack, vec![42]);

        assert_eq!(interp.step().unwrap(), ExecutionResult::Continue);
        assert!(interp.vm.stack.is_empty());

        assert_eq!(interp.step().unwrap(), ExecutionResult::Quit);
        assert_eq!(interp.state(), &RunState::Quit);
    }

    #[test]
    fn test_arithmetic() {
        // add 10 32 -> G00, quit
        let mut interp = create_test_interpreter(&[0x14, 0x0A, 0x20, 0x10, 0xBA]);
        assert_eq!(interp.run().unwrap(), RunState::Quit);
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 42);
        assert_eq!(interp.vm.pc, CODE_ADDR as u32 + 5);
    }

    #[test]
    fn test_unknown_opcode_halts() {
        // 2OP:0 has no meaning in any version
        let mut interp = create_test_interpreter(&[0x00, 0x01, 0x02]);
        let err = interp.run().unwrap_err();
        assert!(err.contains("Unknown opcode"), "{err}");
        assert!(matches!(interp.state(), RunState::Halted(_)));
    }

    #[test]
    fn test_instruction_limit() {
        // jump to itself
        let mut builder = StoryBuilder::new(3);
        builder.code(&[0x8C, 0xFF, 0xFF]);
        let vm = VM::new(builder.build_game().unwrap()).unwrap();
        let config = Config {
            instruction_limit: Some(50),
            ..Config::default()
        };
        let mut interp = Interpreter::new(
            vm,
            HeadlessScreen::new(),
            Box::new(MemorySaveStore::new()),
            config,
        );
        assert!(interp.run().is_err());
    }

    #[test]
    fn test_random_counting_sequence() {
        let interp = run_code(5, |b| {
            // random -2 -> G00 ; random 10 -> G01, G02, G03
            b.code(&[0xE7, 0x3F, 0xFF, 0xFE, 0x10]);
            for var in 0x11..=0x13 {
                b.code(&[0xE7, 0x7F, 0x0A, var]);
            }
        })
        .unwrap();
        let values: Vec<u16> = (0x10..=0x13)
            .map(|g| interp.vm.read_global(g).unwrap())
            .collect();
        assert_eq!(values, vec![0, 1, 2, 1]);
    }

    #[test]
    fn test_verify_checks_original_image() {
        let interp = run_code(3, |b| {
            // verify ?+5 ; store G00 1
            b.code(&[0xBD, 0xC5, 0x0D, 0x10, 0x01]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 0);
    }

    #[test]
    fn test_restart_keeps_transcript_bit() {
        let interp = run_code(3, |b| {
            // loadb 0 0x11 -> G00 ; jz G00 ?~+6 ; output_stream 2 ; restart
            b.code(&[0x10, 0x00, 0x11, 0x10]);
            b.code(&[0xA0, 0x10, 0x46]);
            b.code(&[0xF3, 0x7F, 0x02]);
            b.code(&[0xB7]);
        })
        .unwrap();
        assert_eq!(interp.state(), &RunState::Quit);
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 1);
        assert_eq!(interp.vm.game.flags2() & FLAGS2_TRANSCRIPT, FLAGS2_TRANSCRIPT);
    }

    #[test]
    fn test_save_and_restore_v3_branch() {
        let mut restore_at = 0;
        let mut interp = run_code(3, |b| {
            // save ?+5 ; store G01 7 ; quit
            b.code(&[0xB5, 0xC5, 0x0D, 0x11, 0x07, 0xBA]);
            // restore ?+2
            restore_at = b.code(&[0xB6, 0xC2]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x11).unwrap(), 0);

        interp.vm.write_global(0x12, 99).unwrap();
        interp.vm.pc = restore_at as u32;
        interp.set_state(RunState::Running);
        assert_eq!(interp.run().unwrap(), RunState::Quit);
        assert_eq!(interp.vm.read_global(0x12).unwrap(), 0);
        assert_eq!(interp.vm.read_global(0x11).unwrap(), 0);
    }

    #[test]
    fn test_restore_without_save_fails_softly() {
        let interp = run_code(3, |b| {
            // restore ?+5 ; store G00 1
            b.code(&[0xB6, 0xC5, 0x0D, 0x10, 0x01]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x10).unwrap(), 1);
    }

    #[test]
    fn test_save_and_restore_v5_store() {
        let interp = run_code(5, |b| {
            // save -> G01 ; inc G03 ; je G01 2 ?+6 ; restore -> G02
            b.code(&[0xBE, 0x00, 0xFF, 0x11]);
            b.code(&[0x95, 0x13]);
            b.code(&[0x41, 0x11, 0x02, 0xC6]);
            b.code(&[0xBE, 0x01, 0xFF, 0x12]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x11).unwrap(), 2);
        assert_eq!(interp.vm.read_global(0x12).unwrap(), 0);
        assert_eq!(interp.vm.read_global(0x13).unwrap(), 1);
    }

    #[test]
    fn test_undo_round_trip() {
        let interp = run_code(5, |b| {
            // save_undo -> G01 ; inc G03 ; je G01 2 ?+6 ; restore_undo -> G02
            b.code(&[0xBE, 0x09, 0xFF, 0x11]);
            b.code(&[0x95, 0x13]);
            b.code(&[0x41, 0x11, 0x02, 0xC6]);
            b.code(&[0xBE, 0x0A, 0xFF, 0x12]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x11).unwrap(), 2);
        assert_eq!(interp.vm.read_global(0x13).unwrap(), 1);
    }

    #[test]
    fn test_restart_and_restore_forget_undo() {
        let mut interp = run_code(5, |b| {
            // save -> G01 ; je G01 2 ?+10 ; save_undo -> G04 ; restore -> G02
            b.code(&[0xBE, 0x00, 0xFF, 0x11]);
            b.code(&[0x41, 0x11, 0x02, 0xCA]);
            b.code(&[0xBE, 0x09, 0xFF, 0x14]);
            b.code(&[0xBE, 0x01, 0xFF, 0x12]);
        })
        .unwrap();
        assert_eq!(interp.vm.read_global(0x11).unwrap(), 2);
        assert_eq!(interp.vm.read_global(0x14).unwrap(), 0);
        assert!(interp.undo.is_empty());

        let resume = interp.vm.pc;
        let state = PortableGameState::capture(&interp.vm, resume);
        interp.undo.push(state);
        assert_eq!(interp.undo.len(), 1);
        interp.do_restart().unwrap();
        assert!(interp.undo.is_empty());
    }

    #[test]
    fn test_undo_disabled_and_empty() {
        let mut builder = StoryBuilder::new(5);
        // restore_undo -> G02 ; save_undo -> G01 ; quit
        builder.code(&[0xBE, 0x0A, 0xFF, 0x12, 0xBE, 0x09, 0xFF, 0x11, 0xBA]);
        let vm = VM::new(builder.build_game().unwrap()).unwrap();
        let config = Config {
            undo_slots: 0,
            ..Config::default()
        };
        let mut interp = Interpreter::new(
            vm,
            HeadlessScreen::new(),
            Box::new(MemorySaveStore::new()),
            config,
        );
        interp.vm.write_global(0x12, 7).unwrap();
        assert_eq!(interp.run().unwrap(), RunState::Quit);
        assert_eq!(interp.vm.read_global(0x11).unwrap(), 0xFFFF);
        assert_eq!(interp.vm.read_global(0x12).unwrap(), 0);
    }
}
