//! Machine state capture and restore, and its Quetzal byte form
//!
//! A `PortableGameState` is the unit shared by save files and the undo ring.
//! Restoring checks that the snapshot belongs to the loaded story before
//! anything in the VM is touched.

use crate::interpreter::core::vm::{CallFrame, MAX_LOCALS, STACK_SIZE, VM};
use crate::interpreter::quetzal::chunks::{FrameSnapshot, IFhdChunk, IntDChunk, StksChunk};
use crate::interpreter::quetzal::compressed_memory::{compress_memory, decompress_memory};
use crate::interpreter::quetzal::iff::IffForm;
use log::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortableGameState {
    pub release: u16,
    pub serial: [u8; 6],
    pub checksum: u16,
    /// Where execution resumes after restore
    pub pc: u32,
    pub dynamic_memory: Vec<u8>,
    pub frames: Vec<FrameSnapshot>,
}

impl PortableGameState {
    /// Snapshot the VM, to resume at `resume_pc`
    pub fn capture(vm: &VM, resume_pc: u32) -> Self {
        let header = &vm.game.header;
        let dynamic_size = vm.game.dynamic_size();

        let mut frames = Vec::with_capacity(vm.call_stack.len() + 1);
        if vm.version() != 6 {
            // Values pushed before any routine was called
            let base = vm
                .call_stack
                .first()
                .map(|f| f.stack_base)
                .unwrap_or(vm.stack.len());
            frames.push(FrameSnapshot {
                stack: vm.stack[..base].to_vec(),
                ..Default::default()
            });
        }

        for (i, frame) in vm.call_stack.iter().enumerate() {
            let end = vm
                .call_stack
                .get(i + 1)
                .map(|next| next.stack_base)
                .unwrap_or(vm.stack.len());
            frames.push(FrameSnapshot {
                return_pc: frame.return_pc,
                discard: frame.return_store.is_none(),
                result_var: frame.return_store.unwrap_or(0),
                args_mask: ((1u16 << frame.arg_count) - 1) as u8,
                locals: frame.locals[..frame.num_locals as usize].to_vec(),
                stack: vm.stack[frame.stack_base..end].to_vec(),
            });
        }

        debug!(
            "Captured state: pc {:05x}, {} frames, {} stack values",
            resume_pc,
            frames.len(),
            vm.stack.len()
        );

        PortableGameState {
            release: header.release,
            serial: header.serial,
            checksum: header.checksum_file,
            pc: resume_pc,
            dynamic_memory: vm.game.memory[..dynamic_size].to_vec(),
            frames,
        }
    }

    /// Check that this snapshot can be applied to the VM's story
    pub fn validate(&self, vm: &VM) -> Result<(), String> {
        let header = &vm.game.header;
        if self.release != header.release {
            return Err(format!(
                "Save is for release {}, story is release {}",
                self.release, header.release
            ));
        }
        if self.serial != header.serial {
            return Err(format!(
                "Save is for serial {}, story is serial {}",
                String::from_utf8_lossy(&self.serial),
                header.serial_string()
            ));
        }
        if self.checksum != header.checksum_file {
            return Err(format!(
                "Save checksum {:04x} does not match story checksum {:04x}",
                self.checksum, header.checksum_file
            ));
        }
        if self.dynamic_memory.len() != vm.game.dynamic_size() {
            return Err(format!(
                "Save holds {} bytes of dynamic memory, story has {}",
                self.dynamic_memory.len(),
                vm.game.dynamic_size()
            ));
        }
        if self.pc as usize >= vm.game.memory.len() {
            return Err(format!("Resume PC {:05x} outside story", self.pc));
        }
        let total_stack: usize = self.frames.iter().map(|f| f.stack.len()).sum();
        if total_stack > STACK_SIZE {
            return Err(format!("Saved evaluation stack of {total_stack} values too deep"));
        }
        if self.frames.iter().any(|f| f.locals.len() > MAX_LOCALS) {
            return Err("Saved frame has too many locals".to_string());
        }
        if self.frames.is_empty() {
            return Err("Save has no stack frames".to_string());
        }
        Ok(())
    }

    /// Replace the VM's memory and stacks. Nothing changes unless validation passes.
    pub fn apply(&self, vm: &mut VM) -> Result<(), String> {
        self.validate(vm)?;

        let flags2 = vm.game.flags2();
        vm.game.memory[..self.dynamic_memory.len()].copy_from_slice(&self.dynamic_memory);
        // transcript and fixed-pitch bits belong to the player, not the save
        let kept = flags2 & 0x0003;
        let restored = (vm.game.flags2() & !0x0003) | kept;
        vm.game.set_flags2(restored);

        let mut frames = self.frames.iter();
        vm.stack.clear();
        vm.call_stack.clear();
        if vm.version() != 6 {
            if let Some(dummy) = frames.next() {
                vm.stack.extend_from_slice(&dummy.stack);
            }
        }

        for snapshot in frames {
            let mut locals = [0u16; MAX_LOCALS];
            locals[..snapshot.locals.len()].copy_from_slice(&snapshot.locals);
            vm.call_stack.push(CallFrame {
                return_pc: snapshot.return_pc,
                return_store: if snapshot.discard {
                    None
                } else {
                    Some(snapshot.result_var)
                },
                num_locals: snapshot.locals.len() as u8,
                locals,
                stack_base: vm.stack.len(),
                arg_count: snapshot.arg_count(),
            });
            vm.stack.extend_from_slice(&snapshot.stack);
        }

        vm.pc = self.pc;
        info!(
            "Restored state: pc {:05x}, call depth {}",
            self.pc,
            vm.call_stack.len()
        );
        Ok(())
    }

    /// Encode as a Quetzal file. With `compress`, memory is stored as CMem
    /// against `original_dynamic`, otherwise as UMem.
    pub fn to_bytes(&self, original_dynamic: &[u8], compress: bool) -> Vec<u8> {
        let mut form = IffForm::new();
        let ifhd = IFhdChunk {
            release: self.release,
            serial: self.serial,
            checksum: self.checksum,
            pc: self.pc,
        };
        form.add_chunk(*b"IFhd", ifhd.to_bytes());
        if compress {
            form.add_chunk(
                *b"CMem",
                compress_memory(&self.dynamic_memory, original_dynamic),
            );
        } else {
            form.add_chunk(*b"UMem", self.dynamic_memory.clone());
        }
        let stks = StksChunk {
            frames: self.frames.clone(),
        };
        form.add_chunk(*b"Stks", stks.to_bytes());
        form.add_chunk(*b"IntD", IntDChunk::default().to_bytes());
        form.to_bytes()
    }

    /// Decode a Quetzal file
    pub fn from_bytes(data: &[u8], original_dynamic: &[u8]) -> Result<Self, String> {
        let form = IffForm::from_bytes(data)?;
        if &form.form_type != b"IFZS" {
            return Err(format!(
                "Not a Quetzal save (form type {})",
                String::from_utf8_lossy(&form.form_type)
            ));
        }

        let ifhd = IFhdChunk::from_bytes(form.chunk(b"IFhd").ok_or("Missing IFhd chunk")?)?;
        let dynamic_memory = if let Some(cmem) = form.chunk(b"CMem") {
            decompress_memory(cmem, original_dynamic)?
        } else if let Some(umem) = form.chunk(b"UMem") {
            umem.to_vec()
        } else {
            return Err("Missing CMem or UMem chunk".to_string());
        };
        let stks = StksChunk::from_bytes(form.chunk(b"Stks").ok_or("Missing Stks chunk")?)?;

        Ok(PortableGameState {
            release: ifhd.release,
            serial: ifhd.serial,
            checksum: ifhd.checksum,
            pc: ifhd.pc,
            dynamic_memory,
            frames: stks.frames,
        })
    }
}

/// Save the VM to Quetzal bytes, resuming at `resume_pc`
pub fn save_to_bytes(vm: &VM, resume_pc: u32) -> Vec<u8> {
    let state = PortableGameState::capture(vm, resume_pc);
    let original = &vm.game.original_memory[..vm.game.dynamic_size()];
    state.to_bytes(original, true)
}

/// Restore the VM from Quetzal bytes; the VM is untouched on error
pub fn restore_from_bytes(vm: &mut VM, data: &[u8]) -> Result<(), String> {
    let original = &vm.game.original_memory[..vm.game.dynamic_size()];
    let state = PortableGameState::from_bytes(data, original)?;
    state.apply(vm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::utils::test_utils::{StoryBuilder, SCRATCH_ADDR};

    const SCRATCH: u32 = SCRATCH_ADDR as u32;

    fn vm_in_routine(version: u8) -> VM {
        let mut builder = StoryBuilder::new(version);
        let routine = builder.routine(builder.here(), 3, &[0, 0, 0], &[0xB0]);
        let mut vm = VM::new(builder.build_game().unwrap()).unwrap();
        vm.push(0x0AAA).unwrap();
        vm.call_routine(routine, &[5, 6], Some(0x10)).unwrap();
        vm.push(0x0BBB).unwrap();
        vm
    }

    #[test]
    fn test_round_trip_after_corruption() {
        let mut vm = vm_in_routine(3);
        vm.write_byte(SCRATCH, 0x42).unwrap();
        let frames = vm.call_stack.clone();
        let stack = vm.stack.clone();

        let bytes = save_to_bytes(&vm, 0x2345);

        vm.write_byte(SCRATCH, 0x00).unwrap();
        vm.write_byte(SCRATCH + 1, 0x99).unwrap();
        vm.return_with(0).unwrap();
        vm.pc = 0;

        restore_from_bytes(&mut vm, &bytes).unwrap();
        assert_eq!(vm.pc, 0x2345);
        assert_eq!(vm.read_byte(SCRATCH).unwrap(), 0x42);
        assert_eq!(vm.read_byte(SCRATCH + 1).unwrap(), 0x00);
        assert_eq!(vm.call_stack, frames);
        assert_eq!(vm.stack, stack);
    }

    #[test]
    fn test_capture_has_dummy_frame() {
        let vm = vm_in_routine(5);
        let state = PortableGameState::capture(&vm, 0x100);
        assert_eq!(state.frames.len(), 2);
        assert_eq!(state.frames[0].stack, vec![0x0AAA]);
        assert_eq!(state.frames[1].locals, vec![5, 6, 0]);
        assert_eq!(state.frames[1].args_mask, 0b11);
        assert_eq!(state.frames[1].result_var, 0x10);
        assert_eq!(state.frames[1].stack, vec![0x0BBB]);
    }

    #[test]
    fn test_mismatched_story_leaves_vm_untouched() {
        let mut vm = vm_in_routine(3);
        let mut state = PortableGameState::capture(&vm, 0x2345);
        state.dynamic_memory[SCRATCH_ADDR] = 0x77;

        for corrupt in 0..3 {
            let mut bad = state.clone();
            match corrupt {
                0 => bad.release += 1,
                1 => bad.serial[0] = b'9',
                _ => bad.checksum ^= 0xFFFF,
            }
            let pc = vm.pc;
            assert!(bad.apply(&mut vm).is_err());
            assert_eq!(vm.pc, pc);
            assert_eq!(vm.read_byte(SCRATCH).unwrap(), 0);
            assert_eq!(vm.call_depth(), 1);
        }
    }

    #[test]
    fn test_uncompressed_form() {
        let vm = vm_in_routine(5);
        let state = PortableGameState::capture(&vm, 0x100);
        let original = vm.game.original_memory[..vm.game.dynamic_size()].to_vec();
        let bytes = state.to_bytes(&original, false);
        let form = IffForm::from_bytes(&bytes).unwrap();
        assert!(form.chunk(b"UMem").is_some());
        assert!(form.chunk(b"IntD").is_some());
        assert_eq!(PortableGameState::from_bytes(&bytes, &original).unwrap(), state);
    }

    #[test]
    fn test_rejects_garbage() {
        let mut vm = vm_in_routine(3);
        assert!(restore_from_bytes(&mut vm, b"FORM\0\0\0\x04IFZS").is_err());
        assert!(restore_from_bytes(&mut vm, b"not a save file").is_err());
        assert_eq!(vm.call_depth(), 1);
    }
}
